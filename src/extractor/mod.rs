// src/extractor/mod.rs

pub mod merge;
pub mod pipeline;
pub mod simulated;

use crate::{error::*, media::FileUpload};
use async_trait::async_trait;

pub use merge::{CancellableDecider, FixedDecider, MergeDecider, MergeDecision, MergePrompt, MergeSummary};
pub use pipeline::{ExtractionJob, ExtractionPipeline, JobTarget, PipelineEvent, PipelineState};
pub use simulated::SimulatedExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLevel {
    Module,
    Unit,
}

/// 提取任务所需的文件元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl From<&FileUpload> for SourceFile {
    fn from(upload: &FileUpload) -> Self {
        Self {
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            size_bytes: upload.size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDraft {
    pub title: String,
    pub units: Vec<UnitDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedContent {
    Unit(UnitDraft),
    Module(ModuleDraft),
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, source: &SourceFile, level: TargetLevel) -> AppResult<ExtractedContent>;
}
