// src/symbols.rs

use crate::models::UnitType;
use colored::{ColoredString, Colorize};
use std::sync::LazyLock;

pub static OK: LazyLock<ColoredString> = LazyLock::new(|| "[OK]".green());
pub static ERROR: LazyLock<ColoredString> = LazyLock::new(|| "[X]".red());
pub static INFO: LazyLock<ColoredString> = LazyLock::new(|| "[i]".cyan());
pub static WARN: LazyLock<ColoredString> = LazyLock::new(|| "[!]".yellow());
pub static CTRL_C: LazyLock<ColoredString> = LazyLock::new(|| "Ctrl+C".yellow());
/// 未通过校验的字段
pub static FLAG: LazyLock<ColoredString> = LazyLock::new(|| "[-]".red());
pub static MODULE: LazyLock<ColoredString> = LazyLock::new(|| "[M]".bold());

/// 大纲中单元前的类型标记
pub fn unit_badge(unit_type: UnitType) -> ColoredString {
    match unit_type {
        UnitType::Video => "[video]".magenta(),
        UnitType::Text => "[text]".normal(),
        UnitType::Quiz => "[quiz]".cyan(),
        UnitType::Assignment => "[assignment]".yellow(),
        UnitType::Audio => "[audio]".magenta(),
        UnitType::Document => "[document]".blue(),
    }
}
