// src/config/file.rs

use crate::{
    config::ExternalConfig,
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{fs, path::{Path, PathBuf}};

/// `~/.course-editor/config.json`
pub fn config_path() -> AppResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?;
    Ok(home.join(constants::CONFIG_DIR_NAME).join(constants::CONFIG_FILE_NAME))
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    load_or_create_at(&config_path()?)
}

/// 文件存在时读取；不存在时写入一份完整的默认配置再返回它
pub(crate) fn load_or_create_at(path: &Path) -> AppResult<ExternalConfig> {
    if !path.is_file() {
        info!("未找到配置文件 {}，写入默认配置", path.display());
        let config = ExternalConfig::default_app_config();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(&config)?)
            .with_context(|| format!("写入配置文件 '{}' 失败", path.display()))?;
        return Ok(config);
    }

    debug!("读取配置文件 {}", path.display());
    let raw = fs::read_to_string(path)
        .with_context(|| format!("读取配置文件 '{}' 失败", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("配置文件 '{}' 格式错误", path.display()))?;
    Ok(config)
}
