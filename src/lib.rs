// src/lib.rs

pub mod cli;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod extractor;
pub mod media;
pub mod models;
pub mod symbols;
pub mod ui;
pub mod utils;
mod workflows;

pub use crate::{
    config::AppConfig,
    editor::{ContentTree, FormController, FormEvent, QuizEngine, SubmitOutcome, ValidationReport},
    error::{AppError, AppResult},
    media::{FileUpload, MediaStore, MediaTarget, ResourceHandle},
    models::{Course, FieldPath, Module, Unit, UnitType},
};

use crate::cli::Cli;
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>, cancellation_token: CancellationToken) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);
    let config = AppConfig::new(&args)?;
    debug!("加载的应用配置: {:?}", config);

    if args.scaffold {
        workflows::run_scaffold(&args, &config)
    } else if args.check {
        workflows::run_check(&args, &config)
    } else if let Some(file) = &args.attach {
        workflows::run_attach(&args, &config, file, cancellation_token).await
    } else {
        Ok(())
    }
}
