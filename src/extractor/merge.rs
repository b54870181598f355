// src/extractor/merge.rs

use super::{ExtractedContent, JobTarget, ModuleDraft, TargetLevel, UnitDraft};
use crate::{
    editor::tree::ContentTree,
    error::{AppError, AppResult},
    models::Unit,
    utils::is_blank,
};
use async_trait::async_trait;
use log::{debug, info};
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// 单元：替换正文；模块：替换全部单元
    Replace,
    /// 单元：追加到正文之后；模块：追加到现有单元之后
    Append,
    Keep,
}

impl fmt::Display for MergeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeDecision::Replace => "replace",
            MergeDecision::Append => "append",
            MergeDecision::Keep => "keep",
        };
        f.write_str(s)
    }
}

/// 需要用户决定时展示的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePrompt {
    pub level: TargetLevel,
    pub source_name: String,
    pub target_title: String,
    /// 模块级：现有单元数；单元级：1
    pub existing_units: usize,
    pub proposed_units: usize,
}

impl MergePrompt {
    pub fn message(&self) -> String {
        match self.level {
            TargetLevel::Unit => format!(
                "单元 '{}' 已有正文，如何处理从 '{}' 提取的内容？",
                self.target_title, self.source_name
            ),
            TargetLevel::Module => format!(
                "模块 '{}' 已有 {} 个单元，如何处理从 '{}' 提取的 {} 个单元？",
                self.target_title, self.existing_units, self.source_name, self.proposed_units
            ),
        }
    }

    /// 选项文字与 `MergeDecision` 的对应关系
    pub fn choices(&self) -> Vec<(MergeDecision, &'static str)> {
        match self.level {
            TargetLevel::Unit => vec![
                (MergeDecision::Replace, "替换现有正文"),
                (MergeDecision::Append, "追加到现有正文之后"),
                (MergeDecision::Keep, "保留现有内容"),
            ],
            TargetLevel::Module => vec![
                (MergeDecision::Replace, "替换全部单元"),
                (MergeDecision::Append, "追加到现有单元之后"),
                (MergeDecision::Keep, "保留现有内容"),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// 直接应用时为 `None`
    pub decision: Option<MergeDecision>,
    pub title_set: bool,
    pub content_changed: bool,
    pub units_added: usize,
    pub units_removed: usize,
    pub media_released: usize,
}

/// 已完成但尚未决定如何合并的提取结果
#[derive(Debug)]
pub struct PendingMerge {
    pub(crate) target: JobTarget,
    pub(crate) content: ExtractedContent,
    pub(crate) prompt: MergePrompt,
}

impl PendingMerge {
    pub fn prompt(&self) -> &MergePrompt {
        &self.prompt
    }
}

#[derive(Debug)]
pub enum MergePlan {
    Applied(MergeSummary),
    Pending(PendingMerge),
    /// 目标节点在任务运行期间被删除
    TargetGone,
}

#[async_trait]
pub trait MergeDecider: Send + Sync {
    async fn decide(&self, prompt: &MergePrompt) -> AppResult<MergeDecision>;
}

/// 总是给出同一个决定
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub MergeDecision);

#[async_trait]
impl MergeDecider for FixedDecider {
    async fn decide(&self, _prompt: &MergePrompt) -> AppResult<MergeDecision> {
        Ok(self.0)
    }
}

/// 在取消令牌触发时放弃等待。令牌已触发时，即使内层已给出决定也视为中断
pub struct CancellableDecider<'a> {
    inner: &'a dyn MergeDecider,
    token: CancellationToken,
}

impl<'a> CancellableDecider<'a> {
    pub fn new(inner: &'a dyn MergeDecider, token: CancellationToken) -> Self {
        Self { inner, token }
    }
}

#[async_trait]
impl MergeDecider for CancellableDecider<'_> {
    async fn decide(&self, prompt: &MergePrompt) -> AppResult<MergeDecision> {
        let decision = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(AppError::UserInterrupt),
            decision = self.inner.decide(prompt) => decision?,
        };
        if self.token.is_cancelled() {
            debug!("合并决定 '{}' 在中断后到达，已忽略", decision);
            return Err(AppError::UserInterrupt);
        }
        Ok(decision)
    }
}

/// 目标为空时直接应用，否则挂起等待决定
pub(crate) fn prepare(
    tree: &mut ContentTree,
    target: JobTarget,
    source_name: &str,
    content: ExtractedContent,
) -> MergePlan {
    match (target, content) {
        (JobTarget::Unit { unit, .. }, ExtractedContent::Unit(draft)) => {
            let Some((mi, ui)) = tree.locate_unit(unit) else {
                return MergePlan::TargetGone;
            };
            let Some(existing) = tree.unit(mi, ui) else {
                return MergePlan::TargetGone;
            };
            if is_blank(&existing.content) {
                return MergePlan::Applied(merge_unit(tree, mi, ui, draft, None));
            }
            let prompt = MergePrompt {
                level: TargetLevel::Unit,
                source_name: source_name.to_string(),
                target_title: existing.title.clone(),
                existing_units: 1,
                proposed_units: 1,
            };
            MergePlan::Pending(PendingMerge {
                target,
                content: ExtractedContent::Unit(draft),
                prompt,
            })
        }
        (JobTarget::Module { module }, ExtractedContent::Module(draft)) => {
            let Some(mi) = tree.locate_module(module) else {
                return MergePlan::TargetGone;
            };
            let Some(existing) = tree.module(mi) else {
                return MergePlan::TargetGone;
            };
            if existing.has_only_default_unit() {
                return MergePlan::Applied(merge_module(tree, mi, draft, None));
            }
            let prompt = MergePrompt {
                level: TargetLevel::Module,
                source_name: source_name.to_string(),
                target_title: existing.title.clone(),
                existing_units: existing.units.len(),
                proposed_units: draft.units.len(),
            };
            MergePlan::Pending(PendingMerge {
                target,
                content: ExtractedContent::Module(draft),
                prompt,
            })
        }
        (target, _) => {
            debug!("提取结果与目标 {:?} 的层级不一致，忽略", target);
            MergePlan::TargetGone
        }
    }
}

/// 按用户的决定应用挂起的结果。目标已不存在时返回 `None`
pub(crate) fn resolve(
    tree: &mut ContentTree,
    pending: PendingMerge,
    decision: MergeDecision,
) -> Option<MergeSummary> {
    match (pending.target, pending.content) {
        (JobTarget::Unit { unit, .. }, ExtractedContent::Unit(draft)) => {
            let (mi, ui) = tree.locate_unit(unit)?;
            Some(merge_unit(tree, mi, ui, draft, Some(decision)))
        }
        (JobTarget::Module { module }, ExtractedContent::Module(draft)) => {
            let mi = tree.locate_module(module)?;
            Some(merge_module(tree, mi, draft, Some(decision)))
        }
        _ => None,
    }
}

fn merge_unit(
    tree: &mut ContentTree,
    module: usize,
    unit: usize,
    draft: UnitDraft,
    decision: Option<MergeDecision>,
) -> MergeSummary {
    let mut summary = MergeSummary {
        decision,
        ..Default::default()
    };
    if decision == Some(MergeDecision::Keep) {
        info!("保留单元 #{}.{} 的现有内容", module + 1, unit + 1);
        return summary;
    }
    let Some(target) = tree.unit_mut(module, unit) else {
        return summary;
    };
    if is_blank(&target.title) {
        target.title = draft.title;
        summary.title_set = true;
    }
    target.content = match decision {
        Some(MergeDecision::Append) => format!("{}\n\n{}", target.content.trim_end(), draft.content),
        _ => draft.content,
    };
    summary.content_changed = true;
    info!("单元 #{}.{} 已合并提取内容 ({:?})", module + 1, unit + 1, decision);
    summary
}

fn merge_module(
    tree: &mut ContentTree,
    module: usize,
    draft: ModuleDraft,
    decision: Option<MergeDecision>,
) -> MergeSummary {
    let mut summary = MergeSummary {
        decision,
        ..Default::default()
    };
    if decision == Some(MergeDecision::Keep) || draft.units.is_empty() {
        info!("保留模块 #{} 的现有内容", module + 1);
        return summary;
    }
    let units: Vec<Unit> = draft
        .units
        .into_iter()
        .map(|d| Unit::from_draft(d.title, d.content))
        .collect();
    summary.units_added = units.len();

    match decision {
        Some(MergeDecision::Append) => {
            if let Some(target) = tree.module_mut(module) {
                target.units.extend(units);
            }
        }
        _ => {
            summary.units_removed = tree.module(module).map_or(0, |m| m.units.len());
            summary.media_released = tree.replace_units(module, units);
        }
    }
    if let Some(target) = tree.module_mut(module)
        && is_blank(&target.title)
    {
        target.title = draft.title;
        summary.title_set = true;
    }
    info!(
        "模块 #{} 已合并 {} 个提取单元 ({:?})",
        module + 1,
        summary.units_added,
        decision
    );
    summary
}
