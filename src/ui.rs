// src/ui.rs

use crate::{
    constants,
    error::{AppError, AppResult},
    extractor::{MergeDecider, MergeDecision, MergePrompt},
    symbols,
};
use async_trait::async_trait;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    io::{self, Write},
    time::Duration,
};

pub fn print_header(title: &str) {
    eprintln!("\n{}", "═".repeat(constants::UI_WIDTH));
    eprintln!(" {}", title.cyan().bold());
    eprintln!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    eprintln!("\n--- {} ---", title.bold());
}

pub fn prompt(message: &str, default: Option<&str>) -> io::Result<String> {
    let default_str = default.map_or("".to_string(), |d| format!(" (默认: {})", d));
    eprint!("\n>>> {}{}: ", message, default_str);
    io::stderr().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "标准输入已关闭"));
    }
    let input = input.trim().to_string();
    if input.is_empty() {
        Ok(default.unwrap_or("").to_string())
    } else {
        Ok(input)
    }
}

pub fn selection_menu(
    options: &[String],
    title: &str,
    instructions: &str,
    default_choice: &str,
) -> io::Result<String> {
    eprintln!("\n┌{}┐", "─".repeat(constants::UI_WIDTH - 2));
    eprintln!("  {}", title.cyan().bold());
    eprintln!("├{}┤", "─".repeat(constants::UI_WIDTH - 2));

    let pad = options.len().to_string().len();
    for (i, option) in options.iter().enumerate() {
        eprintln!(
            "  [{}] {}",
            format!("{:<pad$}", i + 1, pad = pad).yellow(),
            option
        );
    }

    eprintln!("├{}┤", "─".repeat(constants::UI_WIDTH - 2));
    eprintln!("  {} (按 {} 可取消)", instructions, *symbols::CTRL_C);
    eprintln!("└{}┘", "─".repeat(constants::UI_WIDTH - 2));

    prompt("请输入你的选择", Some(default_choice))
}

/// 提取进度条，按百分比推进
pub fn extraction_progress_bar(source_name: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{prefix:.bold.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    let pbar = ProgressBar::new(100);
    pbar.set_style(style);
    pbar.set_prefix("提取中");
    pbar.set_message(crate::utils::truncate_text(source_name, constants::TITLE_TRUNCATE_LENGTH));
    pbar.enable_steady_tick(Duration::from_millis(100));
    pbar
}

/// 在终端菜单中询问合并决定。读取标准输入在阻塞线程上进行，
/// 等待期间运行时仍能响应取消。
pub struct TerminalDecider;

#[async_trait]
impl MergeDecider for TerminalDecider {
    async fn decide(&self, prompt: &MergePrompt) -> AppResult<MergeDecision> {
        let choices = prompt.choices();
        let labels: Vec<String> = choices.iter().map(|(_, label)| label.to_string()).collect();
        let keep_index = choices
            .iter()
            .position(|(d, _)| *d == MergeDecision::Keep)
            .map_or(1, |i| i + 1)
            .to_string();
        let title = prompt.message();
        let count = choices.len();

        let picked = tokio::task::spawn_blocking(move || -> io::Result<usize> {
            loop {
                let input = selection_menu(&labels, &title, "请输入数字选择处理方式", &keep_index)?;
                match input.trim().parse::<usize>() {
                    Ok(idx) if (1..=count).contains(&idx) => return Ok(idx - 1),
                    _ => eprintln!("\n{} 无效的选择 '{}'。", *symbols::ERROR, input),
                }
            }
        })
        .await
        .map_err(|e| AppError::Other(e.into()))?
        .map_err(|_| AppError::UserInterrupt)?;
        Ok(choices[picked].0)
    }
}
