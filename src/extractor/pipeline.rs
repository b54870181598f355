// src/extractor/pipeline.rs

use super::{ContentExtractor, ExtractedContent, SourceFile, TargetLevel, merge::PendingMerge};
use crate::{
    config::ExtractionConfig,
    error::{AppError, AppResult},
    models::NodeKey,
};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::{
    runtime::Handle,
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

const EVENT_BUFFER: usize = 16;

/// 提取任务的目标，按节点键而不是下标定位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTarget {
    Module { module: NodeKey },
    Unit { module: NodeKey, unit: NodeKey },
}

impl JobTarget {
    pub fn level(&self) -> TargetLevel {
        match self {
            JobTarget::Module { .. } => TargetLevel::Module,
            JobTarget::Unit { .. } => TargetLevel::Unit,
        }
    }

    pub fn module_key(&self) -> NodeKey {
        match *self {
            JobTarget::Module { module } | JobTarget::Unit { module, .. } => module,
        }
    }

    /// 对 `module`（以及可选的 `unit`）的编辑是否落在目标子树内
    pub fn covers(&self, module: NodeKey, unit: Option<NodeKey>) -> bool {
        match *self {
            JobTarget::Module { module: target } => target == module,
            JobTarget::Unit { unit: target, .. } => unit == Some(target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub target: JobTarget,
    pub module_index: usize,
    pub unit_index: Option<usize>,
    pub progress: u8,
    pub source: SourceFile,
}

impl ExtractionJob {
    pub fn level(&self) -> TargetLevel {
        self.target.level()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running { progress: u8 },
    /// 已完成提取，正在等待合并决定
    Completed,
}

#[derive(Debug)]
pub enum PipelineEvent {
    Progress(u8),
    Finished(AppResult<ExtractedContent>),
}

struct ActiveJob {
    job: ExtractionJob,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    events: mpsc::Receiver<PipelineEvent>,
    pending: Option<PendingMerge>,
    completed: bool,
}

/// 同一时刻最多一个提取任务。进度由后台任务按固定间隔推进，
/// 通过通道回报给持有课程树的一方。
pub struct ExtractionPipeline {
    extractor: Arc<dyn ContentExtractor>,
    config: ExtractionConfig,
    active: Option<ActiveJob>,
}

impl ExtractionPipeline {
    pub fn new(extractor: Arc<dyn ContentExtractor>, config: ExtractionConfig) -> Self {
        Self {
            extractor,
            config,
            active: None,
        }
    }

    pub(crate) fn set_extractor(&mut self, extractor: Arc<dyn ContentExtractor>) {
        self.extractor = extractor;
    }

    pub fn state(&self) -> PipelineState {
        match &self.active {
            None => PipelineState::Idle,
            Some(active) if active.completed => PipelineState::Completed,
            Some(active) => PipelineState::Running {
                progress: active.job.progress,
            },
        }
    }

    pub fn job(&self) -> Option<&ExtractionJob> {
        self.active.as_ref().map(|a| &a.job)
    }

    /// 运行中或等待决定时，目标子树内的编辑被锁定
    pub fn locks(&self, module: NodeKey, unit: Option<NodeKey>) -> bool {
        self.job().is_some_and(|job| job.target.covers(module, unit))
    }

    pub fn locks_module_removal(&self, module: NodeKey) -> bool {
        self.job().is_some_and(|job| job.target.module_key() == module)
    }

    /// 能否立即启动新任务：不能有进行中的任务，且当前线程须在 tokio 运行时内
    pub fn ensure_can_start(&self) -> AppResult<()> {
        self.runtime().map(|_| ())
    }

    fn runtime(&self) -> AppResult<Handle> {
        if self.active.is_some() {
            return Err(AppError::JobInProgress);
        }
        Handle::try_current().map_err(|_| AppError::NoRuntime)
    }

    /// 启动新任务
    pub fn start(&mut self, mut job: ExtractionJob) -> AppResult<()> {
        let runtime = self.runtime()?;
        job.progress = 0;
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = runtime.spawn(drive(
            self.extractor.clone(),
            job.source.clone(),
            job.level(),
            self.config.clone(),
            cancel.clone(),
            tx,
        ));
        info!("开始提取 '{}' ({:?})", job.source.name, job.level());
        self.active = Some(ActiveJob {
            job,
            cancel,
            task,
            events: rx,
            pending: None,
            completed: false,
        });
        Ok(())
    }

    /// 等待下一个事件。空闲、已完成或后台任务已退出时返回 `None`
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        let active = self.active.as_mut().filter(|a| !a.completed)?;
        let event = active.events.recv().await?;
        match &event {
            PipelineEvent::Progress(p) => active.job.progress = *p,
            PipelineEvent::Finished(_) => {
                active.job.progress = 100;
                active.completed = true;
            }
        }
        Some(event)
    }

    pub(crate) fn park(&mut self, pending: PendingMerge) {
        if let Some(active) = self.active.as_mut() {
            active.completed = true;
            active.pending = Some(pending);
        }
    }

    pub fn pending(&self) -> Option<&PendingMerge> {
        self.active.as_ref().and_then(|a| a.pending.as_ref())
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingMerge> {
        self.active.as_mut().and_then(|a| a.pending.take())
    }

    /// 任务结束，回到空闲
    pub(crate) fn finish(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("提取任务 '{}' 结束", active.job.source.name);
        }
    }

    /// 停止计时器、终止后台任务并丢弃未应用的结果
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        active.task.abort();
        if active.pending.is_some() {
            warn!("丢弃 '{}' 尚未决定的合并", active.job.source.name);
        }
        info!("已取消提取任务 '{}'", active.job.source.name);
        true
    }
}

impl Drop for ExtractionPipeline {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive(
    extractor: Arc<dyn ContentExtractor>,
    source: SourceFile,
    level: TargetLevel,
    config: ExtractionConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<PipelineEvent>,
) {
    let mut ticker = time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 第一次 tick 立即返回
    ticker.tick().await;

    let mut progress: u8 = 0;
    while progress < 100 {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                progress = progress.saturating_add(config.progress_step).min(100);
                if tx.send(PipelineEvent::Progress(progress)).await.is_err() {
                    return;
                }
            }
        }
    }

    let result = tokio::select! {
        _ = cancel.cancelled() => return,
        result = extractor.extract(&source, level) => result,
    };
    if tx.send(PipelineEvent::Finished(result)).await.is_err() {
        debug!("提取结果无人接收，已丢弃");
    }
}
