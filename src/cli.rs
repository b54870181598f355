// src/cli.rs

use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

use crate::extractor::MergeDecision;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// 合并冲突时的处理方式
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecisionArg {
    Replace,
    Append,
    Keep,
}

impl From<DecisionArg> for MergeDecision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Replace => MergeDecision::Replace,
            DecisionArg::Append => MergeDecision::Append,
            DecisionArg::Keep => MergeDecision::Keep,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["scaffold", "check", "attach"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 生成一份新的默认课程文件
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub scaffold: bool,
    /// 校验课程文件并列出未通过的字段 (需配合 --course 使用)
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode", requires = "course")]
    pub check: bool,
    /// 附加文件并从中提取内容到指定模块或单元
    #[arg(long, value_name = "FILE", help_heading = "Mode")]
    pub attach: Option<PathBuf>,

    // --- 编辑选项 (Options) ---
    /// 要读取的课程文件 (JSON)；省略时从空白课程开始
    #[arg(short, long, value_name = "FILE", help_heading = "Options")]
    pub course: Option<PathBuf>,
    /// [附加模式] 目标模块序号，从 1 开始
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..), help_heading = "Options")]
    pub module: u32,
    /// [附加模式] 目标单元序号，从 1 开始；省略时以整个模块为目标
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..), help_heading = "Options")]
    pub unit: Option<u32>,
    /// [附加模式] 声明附件的 MIME 类型；省略时按扩展名推断
    #[arg(long, value_name = "TYPE", help_heading = "Options")]
    pub mime: Option<String>,
    /// [附加模式] 内容冲突时的处理方式；省略时交互式询问
    #[arg(long, value_enum, help_heading = "Options")]
    pub decision: Option<DecisionArg>,
    /// 写出前先校验，未通过时不写出并以失败退出
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub submit: bool,
    /// 以编辑模式打开已有课程
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub edit: bool,
    /// 输出文件；省略时写到标准输出
    #[arg(short, long, value_name = "FILE", help_heading = "Options")]
    pub output: Option<PathBuf>,
    /// 覆盖提取进度的推进间隔 (毫秒)
    #[arg(long, value_name = "MS", help_heading = "Options")]
    pub tick_ms: Option<u64>,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
