// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("资源句柄地址无效: {0}")]
    HandleUrl(#[from] url::ParseError),
    #[error("课程数据无效: {0}")]
    InvalidDocument(String),
    #[error("目标节点不存在: {0}")]
    TargetNotFound(String),
    #[error("已有内容提取任务正在进行，请等待其完成")]
    JobInProgress,
    #[error("目标节点正在进行内容提取或等待合并决定，暂时无法编辑")]
    TargetLocked,
    #[error("当前线程不在 tokio 运行时内，无法启动提取任务")]
    NoRuntime,
    #[error("存在尚未处理的合并决定")]
    MergePending,
    #[error("当前没有待处理的合并决定")]
    NoPendingMerge,
    #[error("表单已关闭")]
    FormClosed,
    #[error("内容提取失败: {0}")]
    Extraction(String),
    #[error("用户中断")]
    UserInterrupt,
    #[error("{0}")] // 只打印内部信息，不加任何前缀
    UserInputError(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
