// src/media/handle.rs

use crate::{
    constants,
    error::{AppError, AppResult},
};
use dashmap::DashMap;
use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};
use url::Url;
use uuid::Uuid;

const BLOB_SCHEME: &str = "blob";

struct Blob {
    data: Vec<u8>,
    size_bytes: u64,
}

#[derive(Default)]
struct StoreInner {
    blobs: DashMap<Uuid, Blob>,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// 会话级的临时二进制数据登记表
#[derive(Clone, Default)]
pub struct MediaStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaStats {
    pub acquired: u64,
    pub released: u64,
    pub live: usize,
    pub live_bytes: u64,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一段上传数据，返回唯一拥有它的句柄
    pub fn acquire(&self, data: Vec<u8>, size_bytes: u64) -> ResourceHandle {
        let id = Uuid::new_v4();
        self.inner.blobs.insert(id, Blob { data, size_bytes });
        self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        trace!("获取资源句柄 {}", id);
        ResourceHandle {
            id,
            store: Some(Arc::downgrade(&self.inner)),
            released: false,
        }
    }

    pub fn stats(&self) -> MediaStats {
        MediaStats {
            acquired: self.inner.acquired.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
            live: self.inner.blobs.len(),
            live_bytes: self.inner.blobs.iter().map(|b| b.size_bytes).sum(),
        }
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.inner.blobs.contains_key(&handle.id)
    }

    pub fn read(&self, handle: &ResourceHandle) -> Option<Vec<u8>> {
        self.inner.blobs.get(&handle.id).map(|b| b.data.clone())
    }
}

impl fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStore").field("stats", &self.stats()).finish()
    }
}

/// 对一段临时数据的独占引用。不可复制，只能移动。
///
/// `release` 可以重复调用，只有第一次生效。被丢弃时若尚未释放会自动释放。
/// 从课程文件中解析出的句柄不属于当前会话，释放它们不做任何事。
pub struct ResourceHandle {
    id: Uuid,
    store: Option<Weak<StoreInner>>,
    released: bool,
}

impl ResourceHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_managed(&self) -> bool {
        self.store.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn url(&self) -> String {
        format!("{}:{}/{}", BLOB_SCHEME, constants::BLOB_ORIGIN, self.id)
    }

    /// 返回本次调用是否真正释放了数据
    pub fn release(&mut self) -> bool {
        if self.released {
            trace!("资源句柄 {} 已释放，忽略重复释放", self.id);
            return false;
        }
        self.released = true;
        let Some(inner) = self.store.as_ref().and_then(Weak::upgrade) else {
            return false;
        };
        if inner.blobs.remove(&self.id).is_some() {
            inner.released.fetch_add(1, Ordering::Relaxed);
            debug!("释放资源句柄 {}", self.id);
            true
        } else {
            false
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        let url = Url::parse(s)?;
        if url.scheme() != BLOB_SCHEME {
            return Err(AppError::InvalidDocument(format!("资源句柄必须是 blob 地址: {}", s)));
        }
        let id = url
            .path()
            .rsplit('/')
            .next()
            .and_then(|last| Uuid::parse_str(last).ok())
            .ok_or_else(|| AppError::InvalidDocument(format!("无法从 '{}' 中识别句柄 ID", s)))?;
        Ok(Self {
            id,
            store: None,
            released: false,
        })
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("url", &self.url())
            .field("managed", &self.is_managed())
            .field("released", &self.released)
            .finish()
    }
}

impl Serialize for ResourceHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.url())
    }
}

impl<'de> Deserialize<'de> for ResourceHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ResourceHandle::parse(&s).map_err(serde::de::Error::custom)
    }
}
