// src/editor/form.rs

use crate::{
    config::AppConfig,
    constants,
    editor::{
        quiz::QuizEngine,
        tree::ContentTree,
        validation::{self, ValidationReport},
    },
    error::{AppError, AppResult},
    extractor::{
        ContentExtractor, ExtractionJob, ExtractionPipeline, JobTarget, MergeDecider,
        MergeDecision, MergePrompt, MergeSummary, PipelineEvent, PipelineState, SimulatedExtractor,
        SourceFile,
        merge::{self, MergePlan},
    },
    media::{FileUpload, MediaResourceManager, MediaStore, MediaTarget},
    models::{Course, FieldPath, UnitType},
};
use log::{debug, info, warn};
use std::{fmt, sync::Arc};

pub type SubmitHandler = Box<dyn FnOnce(Course) + Send>;
pub type CancelHandler = Box<dyn FnOnce() + Send>;

#[derive(Debug)]
pub enum SubmitOutcome {
    /// 校验未通过，表单保持打开
    Blocked(ValidationReport),
    Submitted { ids_minted: usize },
}

/// `pump` 返回给调用方的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Progress(u8),
    Merged(MergeSummary),
    DecisionRequired(MergePrompt),
    /// 目标在提取期间被删除，结果已丢弃
    MergeDropped,
    Failed(String),
}

/// 编辑表单的总控。所有编辑都经过这里，以便检查表单是否已关闭、
/// 以及目标节点是否被提取任务锁定。
pub struct FormController {
    tree: ContentTree,
    pipeline: ExtractionPipeline,
    on_submit: Option<SubmitHandler>,
    on_cancel: Option<CancelHandler>,
    is_edit_mode: bool,
    closed: bool,
}

impl FormController {
    pub fn new(
        initial: Option<Course>,
        on_submit: impl FnOnce(Course) + Send + 'static,
        on_cancel: impl FnOnce() + Send + 'static,
        is_edit_mode: bool,
        config: &AppConfig,
    ) -> Self {
        let media = MediaResourceManager::new(MediaStore::new());
        let extractor = Arc::new(SimulatedExtractor::new(&config.extraction));
        Self {
            tree: ContentTree::new(initial, media, config.quiz_defaults.clone()),
            pipeline: ExtractionPipeline::new(extractor, config.extraction.clone()),
            on_submit: Some(Box::new(on_submit)),
            on_cancel: Some(Box::new(on_cancel)),
            is_edit_mode,
            closed: false,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.pipeline.set_extractor(extractor);
        self
    }

    pub fn course(&self) -> &Course {
        self.tree.course()
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn media_store(&self) -> MediaStore {
        self.tree.media().store().clone()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.is_edit_mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_edit_mode {
            constants::SUBMIT_LABEL_UPDATE
        } else {
            constants::SUBMIT_LABEL_CREATE
        }
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    pub fn job(&self) -> Option<&ExtractionJob> {
        self.pipeline.job()
    }

    pub fn pending_merge(&self) -> Option<&MergePrompt> {
        self.pipeline.pending().map(|p| p.prompt())
    }

    pub fn validate(&self) -> ValidationReport {
        validation::validate(self.tree.course())
    }

    // --- 结构编辑 ---

    pub fn add_module(&mut self) -> AppResult<usize> {
        self.ensure_open()?;
        Ok(self.tree.add_module())
    }

    pub fn remove_module(&mut self, module: usize) -> AppResult<bool> {
        self.ensure_open()?;
        if let Some(key) = self.tree.module_key(module)
            && self.pipeline.locks_module_removal(key)
        {
            return Err(AppError::TargetLocked);
        }
        Ok(self.tree.remove_module(module))
    }

    pub fn add_unit(&mut self, module: usize) -> AppResult<Option<usize>> {
        self.ensure_unlocked(module, None)?;
        Ok(self.tree.add_unit(module))
    }

    pub fn remove_unit(&mut self, module: usize, unit: usize) -> AppResult<bool> {
        self.ensure_unlocked(module, Some(unit))?;
        Ok(self.tree.remove_unit(module, unit))
    }

    pub fn change_unit_type(&mut self, module: usize, unit: usize, unit_type: UnitType) -> AppResult<bool> {
        self.ensure_unlocked(module, Some(unit))?;
        Ok(self.tree.change_unit_type(module, unit, unit_type))
    }

    pub fn edit_field(&mut self, path: FieldPath, value: impl Into<String>) -> AppResult<bool> {
        match path.module_index() {
            Some(module) => self.ensure_unlocked(module, path.unit_index())?,
            None => self.ensure_open()?,
        }
        Ok(self.tree.edit_field(path, value))
    }

    /// 在测验编辑器上执行一次编辑。单元不是测验类型时返回 `None`
    pub fn with_quiz<R>(
        &mut self,
        module: usize,
        unit: usize,
        edit: impl FnOnce(&mut QuizEngine<'_>) -> R,
    ) -> AppResult<Option<R>> {
        self.ensure_unlocked(module, Some(unit))?;
        Ok(self.tree.quiz(module, unit).map(|mut engine| edit(&mut engine)))
    }

    pub fn detach_media(&mut self, target: MediaTarget, index: usize) -> AppResult<bool> {
        self.ensure_media_unlocked(target)?;
        Ok(self.tree.detach_media(target, index))
    }

    // --- 附件与提取 ---

    /// 附加文件并启动提取任务。任务无法启动时整个请求被拒绝，不附加任何东西
    pub fn attach_file(&mut self, target: MediaTarget, upload: FileUpload) -> AppResult<usize> {
        self.ensure_open()?;
        self.pipeline.ensure_can_start()?;
        let (job_target, unit_index) = self.resolve_target(target)?;
        let source = SourceFile::from(&upload);
        let index = self
            .tree
            .attach_media(target, upload)
            .ok_or_else(|| AppError::TargetNotFound(format!("{:?}", target)))?;
        self.pipeline.start(ExtractionJob {
            target: job_target,
            module_index: target.module_index(),
            unit_index,
            progress: 0,
            source,
        })?;
        Ok(index)
    }

    /// 等待提取任务的下一个事件并在课程树上处理它。没有运行中的任务时返回 `None`
    pub async fn pump(&mut self) -> AppResult<Option<FormEvent>> {
        self.ensure_open()?;
        let Some(job) = self.pipeline.job().cloned() else {
            return Ok(None);
        };
        let Some(event) = self.pipeline.next_event().await else {
            if self.pipeline.state() == PipelineState::Completed {
                return Ok(None);
            }
            warn!("提取任务 '{}' 意外终止", job.source.name);
            self.pipeline.finish();
            return Ok(Some(FormEvent::Failed("提取任务意外终止".to_string())));
        };

        let content = match event {
            PipelineEvent::Progress(p) => return Ok(Some(FormEvent::Progress(p))),
            PipelineEvent::Finished(Err(e)) => {
                warn!("提取 '{}' 失败: {}", job.source.name, e);
                self.pipeline.finish();
                return Ok(Some(FormEvent::Failed(e.to_string())));
            }
            PipelineEvent::Finished(Ok(content)) => content,
        };

        let event = match merge::prepare(&mut self.tree, job.target, &job.source.name, content) {
            MergePlan::Applied(summary) => {
                self.pipeline.finish();
                FormEvent::Merged(summary)
            }
            MergePlan::Pending(pending) => {
                let prompt = pending.prompt().clone();
                info!("等待合并决定: {}", prompt.message());
                self.pipeline.park(pending);
                FormEvent::DecisionRequired(prompt)
            }
            MergePlan::TargetGone => {
                warn!("提取目标已被删除，丢弃 '{}' 的提取结果", job.source.name);
                self.pipeline.finish();
                FormEvent::MergeDropped
            }
        };
        Ok(Some(event))
    }

    pub fn resolve_merge(&mut self, decision: MergeDecision) -> AppResult<Option<MergeSummary>> {
        self.ensure_open()?;
        let pending = self.pipeline.take_pending().ok_or(AppError::NoPendingMerge)?;
        let summary = merge::resolve(&mut self.tree, pending, decision);
        if summary.is_none() {
            warn!("提取目标已被删除，决定 '{}' 未生效", decision);
        }
        self.pipeline.finish();
        Ok(summary)
    }

    /// 把当前任务驱动到结束，需要决定时询问 `decider`
    pub async fn run_extraction(
        &mut self,
        decider: &dyn MergeDecider,
        mut on_progress: impl FnMut(u8),
    ) -> AppResult<Option<MergeSummary>> {
        if let Some(prompt) = self.pending_merge().cloned() {
            let decision = decider.decide(&prompt).await?;
            return self.resolve_merge(decision);
        }
        while let Some(event) = self.pump().await? {
            match event {
                FormEvent::Progress(p) => on_progress(p),
                FormEvent::Merged(summary) => return Ok(Some(summary)),
                FormEvent::DecisionRequired(prompt) => {
                    let decision = decider.decide(&prompt).await?;
                    debug!("合并决定: {}", decision);
                    return self.resolve_merge(decision);
                }
                FormEvent::MergeDropped => return Ok(None),
                FormEvent::Failed(msg) => return Err(AppError::Extraction(msg)),
            }
        }
        Ok(None)
    }

    pub fn cancel_extraction(&mut self) -> bool {
        self.pipeline.cancel()
    }

    // --- 提交与取消 ---

    pub fn submit(&mut self) -> AppResult<SubmitOutcome> {
        self.ensure_open()?;
        if self.pipeline.pending().is_some() {
            return Err(AppError::MergePending);
        }
        let report = self.validate();
        if !report.is_valid() {
            debug!("提交被阻止，{} 个字段未通过校验", report.errors.len());
            return Ok(SubmitOutcome::Blocked(report));
        }

        self.pipeline.cancel();
        let mut course = self.tree.take_course();
        let stripped = course.strip_parked_quizzes();
        let ids_minted = course.assign_missing_ids();
        self.closed = true;
        info!(
            "提交课程 '{}'：{} 个模块，{} 个单元，新生成 {} 个 ID，丢弃 {} 份暂存测验",
            course.title,
            course.module_count(),
            course.unit_count(),
            ids_minted,
            stripped
        );
        if let Some(on_submit) = self.on_submit.take() {
            on_submit(course);
        }
        Ok(SubmitOutcome::Submitted { ids_minted })
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        self.ensure_open()?;
        self.teardown();
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.pipeline.cancel();
        let released = self.tree.release_all_media();
        self.closed = true;
        debug!("表单关闭，释放 {} 个附件", released);
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.closed {
            Err(AppError::FormClosed)
        } else {
            Ok(())
        }
    }

    fn ensure_unlocked(&self, module: usize, unit: Option<usize>) -> AppResult<()> {
        self.ensure_open()?;
        let Some(module_key) = self.tree.module_key(module) else {
            return Ok(());
        };
        let unit_key = unit.and_then(|u| self.tree.unit_key(module, u));
        if self.pipeline.locks(module_key, unit_key) {
            return Err(AppError::TargetLocked);
        }
        Ok(())
    }

    fn ensure_media_unlocked(&self, target: MediaTarget) -> AppResult<()> {
        match target {
            MediaTarget::Module { module } => self.ensure_unlocked(module, None),
            MediaTarget::Unit { module, unit } => self.ensure_unlocked(module, Some(unit)),
        }
    }

    fn resolve_target(&self, target: MediaTarget) -> AppResult<(JobTarget, Option<usize>)> {
        let missing = || AppError::TargetNotFound(format!("{:?}", target));
        match target {
            MediaTarget::Module { module } => {
                let module = self.tree.module_key(module).ok_or_else(missing)?;
                Ok((JobTarget::Module { module }, None))
            }
            MediaTarget::Unit { module: mi, unit: ui } => {
                let module = self.tree.module_key(mi).ok_or_else(missing)?;
                let unit = self.tree.unit_key(mi, ui).ok_or_else(missing)?;
                Ok((JobTarget::Unit { module, unit }, Some(ui)))
            }
        }
    }
}

impl Drop for FormController {
    fn drop(&mut self) {
        if !self.closed {
            self.teardown();
        }
    }
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("is_edit_mode", &self.is_edit_mode)
            .field("closed", &self.closed)
            .field("pipeline", &self.pipeline.state())
            .field("media", &self.tree.media().store().stats())
            .finish()
    }
}
