// tests/extraction_pipeline_test.rs

use async_trait::async_trait;
use course_editor::{
    AppConfig, AppError, FieldPath, FileUpload, FormController, FormEvent, MediaTarget,
    constants::mime,
    error::AppResult,
    extractor::{
        CancellableDecider, ContentExtractor, ExtractedContent, FixedDecider, MergeDecider,
        MergeDecision, MergePrompt, PipelineState, SourceFile, TargetLevel,
    },
    models::Course,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

fn controller(initial: Option<Course>) -> FormController {
    FormController::new(initial, |_| {}, || {}, false, &AppConfig::default())
}

fn pdf(name: &str) -> FileUpload {
    FileUpload::new(name, mime::PDF, vec![7; 64])
}

fn text(name: &str) -> FileUpload {
    FileUpload::new(name, mime::TEXT, b"lecture notes".to_vec())
}

const UNIT: MediaTarget = MediaTarget::Unit { module: 0, unit: 0 };
const MODULE: MediaTarget = MediaTarget::Module { module: 0 };

#[tokio::test(start_paused = true)]
async fn test_pdf_fills_empty_module() -> AppResult<()> {
    // --- Arrange ---
    let mut form = controller(None);

    // --- Act ---
    form.attach_file(MODULE, pdf("Rust Basics.pdf"))?;
    assert_eq!(form.pipeline_state(), PipelineState::Running { progress: 0 });
    let mut seen = Vec::new();
    let summary = form
        .run_extraction(&FixedDecider(MergeDecision::Keep), |p| seen.push(p))
        .await?
        .expect("空模块应直接应用");

    // --- Assert ---
    assert_eq!(seen, (1..=10).map(|i| i * 10).collect::<Vec<u8>>());
    assert_eq!(summary.decision, None);
    assert!(summary.title_set);
    assert_eq!(form.pipeline_state(), PipelineState::Idle);

    let module = &form.course().modules[0];
    assert_eq!(module.title, "Rust Basics");
    // 1 个导言 + 4 个正文小节 + 1 个总结
    assert_eq!(module.units.len(), 6);
    assert!(module.units[0].title.starts_with("Introduction"));
    assert!(module.units[5].title.starts_with("Summary"));
    assert_eq!(module.media.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_non_pdf_module_gets_two_body_sections() -> AppResult<()> {
    let mut form = controller(None);
    form.edit_field(FieldPath::ModuleTitle { module: 0 }, "Week 1")?;
    form.attach_file(MODULE, FileUpload::new("deck.pptx", mime::PPTX, vec![1]))?;
    form.run_extraction(&FixedDecider(MergeDecision::Keep), |_| {}).await?;

    let module = &form.course().modules[0];
    assert_eq!(module.units.len(), 4);
    // 已有标题不被覆盖
    assert_eq!(module.title, "Week 1");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_empty_unit_receives_content_without_decision() -> AppResult<()> {
    let mut form = controller(None);
    form.attach_file(UNIT, text("intro.txt"))?;

    let mut decision_asked = false;
    while let Some(event) = form.pump().await? {
        if matches!(event, FormEvent::DecisionRequired(_)) {
            decision_asked = true;
        }
    }

    assert!(!decision_asked);
    let unit = &form.course().modules[0].units[0];
    assert_eq!(unit.title, "intro");
    assert!(!unit.content.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_non_empty_unit_waits_for_decision() -> AppResult<()> {
    // --- Arrange ---
    let mut form = controller(None);
    form.edit_field(FieldPath::UnitTitle { module: 0, unit: 0 }, "Ownership")?;
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Hand-written notes.")?;

    // --- Act: 运行到完成 ---
    form.attach_file(UNIT, text("second.txt"))?;
    let prompt = loop {
        match form.pump().await?.expect("任务应产生事件") {
            FormEvent::Progress(_) => continue,
            FormEvent::DecisionRequired(prompt) => break prompt,
            other => panic!("意外事件: {:?}", other),
        }
    };

    // --- Assert: 决定之前内容不变，目标被锁定 ---
    assert_eq!(prompt.level, TargetLevel::Unit);
    assert_eq!(prompt.source_name, "second.txt");
    assert_eq!(form.pipeline_state(), PipelineState::Completed);
    assert!(form.pending_merge().is_some());
    assert_eq!(form.course().modules[0].units[0].content, "Hand-written notes.");
    assert!(matches!(
        form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "x"),
        Err(AppError::TargetLocked)
    ));
    assert!(matches!(form.submit(), Err(AppError::MergePending)));
    assert!(matches!(form.attach_file(MODULE, pdf("other.pdf")), Err(AppError::JobInProgress)));
    // pump 不会再产生事件
    assert!(form.pump().await?.is_none());

    // --- Act: 给出决定 ---
    let summary = form.resolve_merge(MergeDecision::Append)?.unwrap();

    // --- Assert ---
    assert_eq!(summary.decision, Some(MergeDecision::Append));
    assert!(!summary.title_set);
    let unit = &form.course().modules[0].units[0];
    assert_eq!(unit.title, "Ownership");
    assert!(unit.content.starts_with("Hand-written notes.\n\n"));
    assert!(unit.content.len() > "Hand-written notes.\n\n".len());
    assert_eq!(form.pipeline_state(), PipelineState::Idle);
    assert!(matches!(form.resolve_merge(MergeDecision::Keep), Err(AppError::NoPendingMerge)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_non_empty_module_waits_for_decision() -> AppResult<()> {
    // --- Arrange: 模块已有标题和两个单元 ---
    let mut form = controller(None);
    form.edit_field(FieldPath::ModuleTitle { module: 0 }, "Ownership")?;
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Moves")?;
    form.add_unit(0)?;

    // --- Act: 运行到完成 ---
    form.attach_file(MODULE, pdf("Rust Basics.pdf"))?;
    let prompt = loop {
        match form.pump().await?.expect("任务应产生事件") {
            FormEvent::Progress(_) => continue,
            FormEvent::DecisionRequired(prompt) => break prompt,
            other => panic!("意外事件: {:?}", other),
        }
    };

    // --- Assert: 决定之前模块不变 ---
    assert_eq!(prompt.level, TargetLevel::Module);
    assert_eq!(prompt.target_title, "Ownership");
    assert_eq!((prompt.existing_units, prompt.proposed_units), (2, 6));
    assert_eq!(form.pipeline_state(), PipelineState::Completed);
    let module = &form.course().modules[0];
    assert_eq!(module.title, "Ownership");
    assert_eq!(module.units.len(), 2);
    assert_eq!(module.units[0].content, "Moves");
    assert!(matches!(form.add_unit(0), Err(AppError::TargetLocked)));

    // --- Act: 保留 ---
    let summary = form.resolve_merge(MergeDecision::Keep)?.unwrap();

    // --- Assert ---
    assert_eq!(summary.decision, Some(MergeDecision::Keep));
    assert_eq!((summary.units_added, summary.units_removed), (0, 0));
    assert!(!summary.title_set);
    let module = &form.course().modules[0];
    assert_eq!(module.title, "Ownership");
    assert_eq!(module.units.len(), 2);
    assert_eq!(module.units[0].content, "Moves");
    assert_eq!(module.media.len(), 1);
    assert_eq!(form.pipeline_state(), PipelineState::Idle);
    Ok(())
}

/// 永远不给出决定，模拟一直停在终端菜单上的用户
struct SilentDecider;

#[async_trait]
impl MergeDecider for SilentDecider {
    async fn decide(&self, _prompt: &MergePrompt) -> AppResult<MergeDecision> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_waiting_for_decision_applies_nothing() -> AppResult<()> {
    // --- Arrange ---
    let mut form = controller(None);
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Hand-written notes.")?;
    form.attach_file(UNIT, text("second.txt"))?;
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        // 提取本身约 2 秒，之后停在决定上
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    // --- Act ---
    let decider = CancellableDecider::new(&SilentDecider, token);
    let result = form.run_extraction(&decider, |_| {}).await;

    // --- Assert: 中断返回错误，正文不变，结果仍挂起 ---
    assert!(matches!(result, Err(AppError::UserInterrupt)));
    assert_eq!(form.course().modules[0].units[0].content, "Hand-written notes.");
    assert!(form.pending_merge().is_some());
    assert!(form.cancel_extraction());
    assert_eq!(form.pipeline_state(), PipelineState::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_decision_after_interrupt_is_ignored() -> AppResult<()> {
    let mut form = controller(None);
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Old")?;
    form.attach_file(UNIT, text("fresh.txt"))?;
    let token = CancellationToken::new();
    token.cancel();

    let replace = FixedDecider(MergeDecision::Replace);
    let result = form
        .run_extraction(&CancellableDecider::new(&replace, token), |_| {})
        .await;

    assert!(matches!(result, Err(AppError::UserInterrupt)));
    assert_eq!(form.course().modules[0].units[0].content, "Old");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancellable_decider_passes_decision_through() -> AppResult<()> {
    let mut form = controller(None);
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Old")?;
    form.attach_file(UNIT, text("fresh.txt"))?;

    let replace = FixedDecider(MergeDecision::Replace);
    let summary = form
        .run_extraction(&CancellableDecider::new(&replace, CancellationToken::new()), |_| {})
        .await?
        .unwrap();

    assert_eq!(summary.decision, Some(MergeDecision::Replace));
    assert!(!form.course().modules[0].units[0].content.contains("Old"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_keep_changes_nothing_not_even_empty_title() -> AppResult<()> {
    let mut form = controller(None);
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Existing body")?;
    form.attach_file(UNIT, text("notes.txt"))?;

    let summary = form
        .run_extraction(&FixedDecider(MergeDecision::Keep), |_| {})
        .await?
        .unwrap();

    assert_eq!(summary.decision, Some(MergeDecision::Keep));
    assert!(!summary.content_changed);
    let unit = &form.course().modules[0].units[0];
    assert_eq!(unit.title, "");
    assert_eq!(unit.content, "Existing body");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_replace_body_on_unit() -> AppResult<()> {
    let mut form = controller(None);
    form.edit_field(FieldPath::UnitContent { module: 0, unit: 0 }, "Old")?;
    form.attach_file(UNIT, text("fresh.txt"))?;
    form.run_extraction(&FixedDecider(MergeDecision::Replace), |_| {}).await?;

    let unit = &form.course().modules[0].units[0];
    assert_eq!(unit.title, "fresh");
    assert!(!unit.content.contains("Old"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_module_merge_decisions() -> AppResult<()> {
    // --- Arrange: 第一个单元通过提取获得内容和附件，再加一个单元 ---
    let mut form = controller(None);
    form.attach_file(UNIT, text("first.txt"))?;
    form.run_extraction(&FixedDecider(MergeDecision::Keep), |_| {}).await?;
    form.add_unit(0)?;
    let store = form.media_store();
    assert_eq!(store.stats().live, 1);

    // --- Append ---
    form.attach_file(MODULE, pdf("Part A.pdf"))?;
    let summary = form
        .run_extraction(&FixedDecider(MergeDecision::Append), |_| {})
        .await?
        .unwrap();
    assert_eq!(summary.units_added, 6);
    assert_eq!(form.course().modules[0].units.len(), 8);
    assert_eq!(form.course().modules[0].title, "Part A");

    // --- Replace: 被替换单元上的附件全部释放 ---
    form.attach_file(MODULE, pdf("Part B.pdf"))?;
    let summary = form
        .run_extraction(&FixedDecider(MergeDecision::Replace), |_| {})
        .await?
        .unwrap();
    assert_eq!(summary.units_removed, 8);
    assert_eq!(summary.media_released, 1);
    assert!(!summary.title_set, "模块已有标题");
    let module = &form.course().modules[0];
    assert_eq!(module.units.len(), 6);
    assert_eq!(module.title, "Part A");
    // 模块自身的两个 PDF 附件保留
    assert_eq!(module.media.len(), 2);
    assert_eq!(store.stats().live, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_attach_while_running_is_rejected_without_attaching() -> AppResult<()> {
    let mut form = controller(None);
    form.add_module()?;
    form.attach_file(MODULE, pdf("a.pdf"))?;
    let store = form.media_store();

    let result = form.attach_file(MediaTarget::Module { module: 1 }, pdf("b.pdf"));

    assert!(matches!(result, Err(AppError::JobInProgress)));
    assert_eq!(store.stats().acquired, 1);
    assert!(form.course().modules[1].media.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_locks_cover_only_the_target_subtree() -> AppResult<()> {
    let mut form = controller(None);
    form.add_module()?;
    form.add_unit(0)?;
    form.attach_file(UNIT, text("a.txt"))?;

    // 目标单元及其所在模块的删除被锁定
    assert!(matches!(
        form.edit_field(FieldPath::UnitTitle { module: 0, unit: 0 }, "x"),
        Err(AppError::TargetLocked)
    ));
    assert!(matches!(form.remove_unit(0, 0), Err(AppError::TargetLocked)));
    assert!(matches!(form.remove_module(0), Err(AppError::TargetLocked)));
    assert!(matches!(
        form.detach_media(UNIT, 0),
        Err(AppError::TargetLocked)
    ));
    // 其他节点照常编辑
    assert!(form.edit_field(FieldPath::CourseTitle, "Course")?);
    assert!(form.edit_field(FieldPath::ModuleTitle { module: 0 }, "Module")?);
    assert!(form.edit_field(FieldPath::UnitTitle { module: 0, unit: 1 }, "Other")?);
    assert!(form.remove_module(1)?);

    form.run_extraction(&FixedDecider(MergeDecision::Keep), |_| {}).await?;
    assert!(form.edit_field(FieldPath::UnitTitle { module: 0, unit: 0 }, "x")?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_module_target_locks_its_units() -> AppResult<()> {
    let mut form = controller(None);
    form.attach_file(MODULE, pdf("a.pdf"))?;
    assert!(matches!(form.add_unit(0), Err(AppError::TargetLocked)));
    assert!(matches!(
        form.change_unit_type(0, 0, course_editor::UnitType::Quiz),
        Err(AppError::TargetLocked)
    ));
    assert!(matches!(
        form.with_quiz(0, 0, |q| q.add_question()),
        Err(AppError::TargetLocked)
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_merge_follows_target_after_sibling_removal() -> AppResult<()> {
    // --- Arrange ---
    let mut form = controller(None);
    let second = form.add_module()?;
    form.attach_file(MediaTarget::Unit { module: second, unit: 0 }, text("moved.txt"))?;

    // --- Act: 任务运行期间删除前面的模块，目标下标随之移动 ---
    form.pump().await?;
    assert!(form.remove_module(0)?);
    form.run_extraction(&FixedDecider(MergeDecision::Keep), |_| {}).await?;

    // --- Assert ---
    assert_eq!(form.course().module_count(), 1);
    let unit = &form.course().modules[0].units[0];
    assert_eq!(unit.title, "moved");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_progress_and_applies_nothing() -> AppResult<()> {
    // --- Arrange ---
    let mut form = controller(None);
    form.attach_file(MODULE, pdf("Rust Basics.pdf"))?;
    assert_eq!(form.pump().await?, Some(FormEvent::Progress(10)));
    assert_eq!(form.pump().await?, Some(FormEvent::Progress(20)));

    // --- Act ---
    assert!(form.cancel_extraction());
    tokio::time::sleep(Duration::from_secs(30)).await;

    // --- Assert ---
    assert_eq!(form.pipeline_state(), PipelineState::Idle);
    assert!(form.pump().await?.is_none());
    let module = &form.course().modules[0];
    assert_eq!(module.title, "");
    assert_eq!(module.units.len(), 1);
    // 附件本身保留在模块上
    assert_eq!(module.media.len(), 1);
    assert!(!form.cancel_extraction());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_form_mid_job_releases_everything() -> AppResult<()> {
    let store;
    {
        let mut form = controller(None);
        store = form.media_store();
        form.attach_file(UNIT, text("a.txt"))?;
        form.pump().await?;
    }
    tokio::time::sleep(Duration::from_secs(5)).await;

    let stats = store.stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.live, 0);
    Ok(())
}

struct BrokenExtractor;

#[async_trait]
impl ContentExtractor for BrokenExtractor {
    async fn extract(&self, source: &SourceFile, _level: TargetLevel) -> AppResult<ExtractedContent> {
        Err(AppError::Extraction(format!("无法解析 {}", source.name)))
    }
}

#[tokio::test(start_paused = true)]
async fn test_extractor_failure_returns_pipeline_to_idle() -> AppResult<()> {
    let mut form = controller(None).with_extractor(Arc::new(BrokenExtractor));
    form.attach_file(UNIT, text("bad.txt"))?;

    let result = form.run_extraction(&FixedDecider(MergeDecision::Keep), |_| {}).await;

    assert!(matches!(result, Err(AppError::Extraction(msg)) if msg.contains("bad.txt")));
    assert_eq!(form.pipeline_state(), PipelineState::Idle);
    assert!(form.course().modules[0].units[0].content.is_empty());
    // 失败后可以开始新任务
    form.attach_file(UNIT, text("retry.txt"))?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_step_comes_from_configuration() -> AppResult<()> {
    let mut config = AppConfig::default();
    config.extraction.progress_step = 25;
    config.extraction.tick_interval = Duration::from_millis(50);
    let mut form = FormController::new(None, |_| {}, || {}, false, &config);
    form.attach_file(UNIT, text("a.txt"))?;

    let mut seen = Vec::new();
    form.run_extraction(&FixedDecider(MergeDecision::Keep), |p| seen.push(p)).await?;
    assert_eq!(seen, vec![25, 50, 75, 100]);
    Ok(())
}
