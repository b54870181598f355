// src/workflows.rs

use crate::{
    cli::Cli,
    config::AppConfig,
    editor::{FormController, SubmitOutcome, ValidationReport},
    error::{AppError, AppResult},
    extractor::{CancellableDecider, FixedDecider, MergeDecider, MergeSummary},
    media::{FileUpload, MediaTarget},
    models::Course,
    symbols, ui, utils,
};
use anyhow::Context;
use colored::*;
use log::{debug, info, warn};
use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tokio_util::sync::CancellationToken;

type SubmittedSlot = Arc<Mutex<Option<Course>>>;

fn load_course(path: Option<&Path>) -> AppResult<Option<Course>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("读取课程文件 '{}' 失败", path.display()))?;
    let course: Course = serde_json::from_str(&content)
        .map_err(|e| AppError::InvalidDocument(format!("'{}': {}", path.display(), e)))?;
    debug!("已加载课程 '{}' ({} 个模块)", course.title, course.module_count());
    Ok(Some(course))
}

fn write_output(course: &Course, output: Option<&Path>) -> AppResult<()> {
    let json = serde_json::to_string_pretty(course)?;
    match output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            fs::write(path, json).with_context(|| format!("写入 '{}' 失败", path.display()))?;
            info!("课程已写入 {}", path.display());
            eprintln!("{} 课程已写入: {}", *symbols::OK, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    eprintln!(
        "\n{} {}",
        *symbols::WARN,
        format!("{} 个字段未通过校验:", report.errors.len()).yellow()
    );
    for error in &report.errors {
        eprintln!("  {} {:<32} {}", *symbols::FLAG, error.path.to_string(), error.message);
    }
}

fn open_form(args: &Cli, config: &AppConfig, initial: Option<Course>) -> (FormController, SubmittedSlot) {
    let slot: SubmittedSlot = Arc::new(Mutex::new(None));
    let sink = slot.clone();
    let controller = FormController::new(
        initial,
        move |course| {
            if let Ok(mut guard) = sink.lock() {
                *guard = Some(course);
            }
        },
        || debug!("表单已取消"),
        args.edit,
        config,
    );
    (controller, slot)
}

/// 写出前按需提交。`--submit` 时未通过校验视为失败
fn finish(args: &Cli, mut controller: FormController, slot: SubmittedSlot) -> AppResult<()> {
    if !args.submit {
        return write_output(controller.course(), args.output.as_deref());
    }
    match controller.submit()? {
        SubmitOutcome::Blocked(report) => {
            print_report(&report);
            Err(AppError::UserInputError(format!(
                "{} 被阻止: {} 个字段未通过校验",
                controller.submit_label(),
                report.errors.len()
            )))
        }
        SubmitOutcome::Submitted { ids_minted } => {
            debug!("提交完成，新生成 {} 个 ID", ids_minted);
            let course = slot
                .lock()
                .ok()
                .and_then(|mut guard| guard.take())
                .ok_or_else(|| AppError::Other(anyhow::anyhow!("提交回调未收到课程数据")))?;
            write_output(&course, args.output.as_deref())
        }
    }
}

/// 生成新的默认课程
pub(crate) fn run_scaffold(args: &Cli, config: &AppConfig) -> AppResult<()> {
    let (controller, slot) = open_form(args, config, None);
    ui::print_sub_header(controller.submit_label());
    finish(args, controller, slot)
}

/// 只校验，不写出
pub(crate) fn run_check(args: &Cli, config: &AppConfig) -> AppResult<()> {
    let initial = load_course(args.course.as_deref())?;
    let (controller, _slot) = open_form(args, config, initial);
    let report = controller.validate();
    if report.is_valid() {
        eprintln!("{} 课程 '{}' 通过校验。", *symbols::OK, controller.course().title);
        return Ok(());
    }
    print_report(&report);
    Err(AppError::UserInputError(format!(
        "{} 个字段未通过校验: {}",
        report.errors.len(),
        report.flagged_paths()
    )))
}

/// 附加文件、运行提取并合并结果
pub(crate) async fn run_attach(
    args: &Cli,
    config: &AppConfig,
    file: &Path,
    cancellation_token: CancellationToken,
) -> AppResult<()> {
    let initial = load_course(args.course.as_deref())?;
    let (mut controller, slot) = open_form(args, config, initial);

    let module = args.module as usize - 1;
    let target = match args.unit {
        Some(unit) => MediaTarget::Unit {
            module,
            unit: unit as usize - 1,
        },
        None => MediaTarget::Module { module },
    };
    let upload = FileUpload::from_path(file, args.mime.as_deref())?;
    let source_name = upload.name.clone();
    ui::print_header(&format!(
        "提取 '{}' 到 {} (按 {} 可取消)",
        utils::truncate_text(&source_name, crate::constants::TITLE_TRUNCATE_LENGTH),
        describe_target(target),
        *symbols::CTRL_C
    ));
    controller.attach_file(target, upload)?;

    let inner: Box<dyn MergeDecider> = match args.decision {
        Some(decision) => Box::new(FixedDecider(decision.into())),
        None => Box::new(ui::TerminalDecider),
    };
    let decider = CancellableDecider::new(inner.as_ref(), cancellation_token.clone());
    let pbar = ui::extraction_progress_bar(&source_name);
    let outcome = tokio::select! {
        result = controller.run_extraction(&decider, |p| pbar.set_position(u64::from(p))) => Some(result),
        _ = cancellation_token.cancelled() => None,
    };
    pbar.finish_and_clear();

    // 中断可能发生在进度阶段，也可能发生在等待合并决定时
    let result = match outcome {
        Some(Err(AppError::UserInterrupt)) | None => {
            warn!("用户中断了 '{}' 的提取", source_name);
            controller.cancel()?;
            return Err(AppError::UserInterrupt);
        }
        Some(result) => result,
    };
    match result? {
        Some(summary) => print_summary(&summary),
        None => eprintln!("{} 提取结果未被应用。", *symbols::WARN),
    }
    print_outline(controller.course());
    finish(args, controller, slot)
}

fn describe_target(target: MediaTarget) -> String {
    match target {
        MediaTarget::Module { module } => format!("模块 {}", module + 1),
        MediaTarget::Unit { module, unit } => format!("模块 {} 单元 {}", module + 1, unit + 1),
    }
}

fn print_summary(summary: &MergeSummary) {
    let how = summary
        .decision
        .map_or_else(|| "直接应用".to_string(), |d| d.to_string());
    eprintln!(
        "{} 合并完成 ({}): 新增 {} 个单元，移除 {} 个单元，正文{}更新，标题{}设置",
        *symbols::OK,
        how,
        summary.units_added,
        summary.units_removed,
        if summary.content_changed { "已" } else { "未" },
        if summary.title_set { "已" } else { "未" },
    );
    if summary.media_released > 0 {
        eprintln!("{} 释放了 {} 个附件。", *symbols::INFO, summary.media_released);
    }
}

/// 在标准错误上打印课程大纲
fn print_outline(course: &Course) {
    ui::print_sub_header("课程大纲");
    for (mi, module) in course.modules.iter().enumerate() {
        let title = if utils::is_blank(&module.title) { "(未命名)" } else { module.title.as_str() };
        eprintln!(
            "{} {}. {} ({} 个附件)",
            *symbols::MODULE,
            mi + 1,
            utils::truncate_text(title, crate::constants::TITLE_TRUNCATE_LENGTH),
            module.media.len()
        );
        for (ux, unit) in module.units.iter().enumerate() {
            let title = if utils::is_blank(&unit.title) { "(未命名)" } else { unit.title.as_str() };
            eprintln!(
                "    {}.{} {} {}",
                mi + 1,
                ux + 1,
                symbols::unit_badge(unit.unit_type()),
                utils::truncate_text(title, crate::constants::TITLE_TRUNCATE_LENGTH)
            );
        }
    }
}
