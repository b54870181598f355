// src/media/mod.rs

pub mod handle;

pub use handle::{MediaStats, MediaStore, ResourceHandle};

use crate::{error::AppResult, utils};
use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// 用户选择的原始文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: data.len() as u64,
            data,
        }
    }

    /// 读取本地文件；未声明 MIME 类型时按扩展名猜测
    pub fn from_path(path: &Path, mime_type: Option<&str>) -> AppResult<Self> {
        let data =
            fs::read(path).with_context(|| format!("读取附件 '{}' 失败", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| utils::guess_mime_type(&name).to_string());
        Ok(Self::new(name, mime_type, data))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub mime_type: String,
    pub(crate) resource_handle: ResourceHandle,
    pub size_bytes: u64,
}

impl MediaAttachment {
    pub fn resource_handle(&self) -> &ResourceHandle {
        &self.resource_handle
    }
}

/// 模块或单元上的附件列表。条目持有句柄的所有权，只能通过管理器增删
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaList(Vec<MediaAttachment>);

impl MediaList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaAttachment> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaAttachment> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut MediaAttachment> {
        self.0.iter_mut()
    }
}

/// 附件挂载的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaTarget {
    Module { module: usize },
    Unit { module: usize, unit: usize },
}

impl MediaTarget {
    pub fn module_index(&self) -> usize {
        match *self {
            MediaTarget::Module { module } | MediaTarget::Unit { module, .. } => module,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaResourceManager {
    store: MediaStore,
}

impl MediaResourceManager {
    pub fn new(store: MediaStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// 为上传数据生成新句柄并追加到列表末尾，返回新条目的下标
    pub fn attach(&self, list: &mut MediaList, upload: FileUpload) -> usize {
        let FileUpload {
            name,
            mime_type,
            size_bytes,
            data,
        } = upload;
        let resource_handle = self.store.acquire(data, size_bytes);
        debug!("附加 '{}' ({}, {} 字节)", name, mime_type, size_bytes);
        list.0.push(MediaAttachment {
            id: None,
            name,
            mime_type,
            resource_handle,
            size_bytes,
        });
        list.0.len() - 1
    }

    /// 先释放句柄，再移除条目。下标越界时什么也不做
    pub fn detach(&self, list: &mut MediaList, index: usize) -> bool {
        let Some(entry) = list.0.get_mut(index) else {
            debug!("附件下标 {} 越界，忽略", index);
            return false;
        };
        entry.resource_handle.release();
        let removed = list.0.remove(index);
        debug!("移除附件 '{}'", removed.name);
        true
    }

    /// 释放列表中的所有句柄并清空列表，返回实际释放的数量
    pub fn release_all(&self, list: &mut MediaList) -> usize {
        let released = list
            .0
            .iter_mut()
            .map(|m| m.resource_handle.release())
            .filter(|&released| released)
            .count();
        list.0.clear();
        released
    }
}
