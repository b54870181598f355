// src/config.rs

pub mod file;

use self::file::load_or_create_external_config;
use crate::{cli::Cli, constants::defaults, error::AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_step: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_sections: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sections: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefaultsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_questions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_feedback_after_submit: Option<bool>,
}

/// 磁盘上的配置文件，所有字段都可以省略
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExternalConfig {
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub quiz_defaults: QuizDefaultsSection,
}

impl ExternalConfig {
    /// 首次运行时写入磁盘的完整默认配置
    pub(crate) fn default_app_config() -> Self {
        Self {
            extraction: ExtractionSection {
                tick_interval_ms: Some(defaults::EXTRACTION_TICK_INTERVAL_MS),
                progress_step: Some(defaults::EXTRACTION_PROGRESS_STEP),
                pdf_sections: Some(defaults::EXTRACTION_PDF_SECTIONS),
                default_sections: Some(defaults::EXTRACTION_DEFAULT_SECTIONS),
            },
            quiz_defaults: QuizDefaultsSection {
                time_limit_minutes: Some(defaults::QUIZ_TIME_LIMIT_MINUTES),
                passing_score_percent: Some(defaults::QUIZ_PASSING_SCORE_PERCENT),
                shuffle_questions: Some(false),
                show_feedback_after_submit: Some(true),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub tick_interval: Duration,
    /// 每次推进的百分比，取值 1..=100
    pub progress_step: u8,
    pub pdf_sections: usize,
    pub default_sections: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(defaults::EXTRACTION_TICK_INTERVAL_MS),
            progress_step: defaults::EXTRACTION_PROGRESS_STEP,
            pdf_sections: defaults::EXTRACTION_PDF_SECTIONS,
            default_sections: defaults::EXTRACTION_DEFAULT_SECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDefaults {
    pub time_limit_minutes: u32,
    pub passing_score_percent: u8,
    pub shuffle_questions: bool,
    pub show_feedback_after_submit: bool,
}

impl Default for QuizDefaults {
    fn default() -> Self {
        Self {
            time_limit_minutes: defaults::QUIZ_TIME_LIMIT_MINUTES,
            passing_score_percent: defaults::QUIZ_PASSING_SCORE_PERCENT,
            shuffle_questions: false,
            show_feedback_after_submit: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub quiz_defaults: QuizDefaults,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        let mut config = Self::from_external(external_config);
        if let Some(ms) = args.tick_ms {
            config.extraction.tick_interval = Duration::from_millis(ms.max(1));
        }
        Ok(config)
    }

    /// 用默认值补全配置文件中缺省的字段，并把越界值收回合法范围
    pub fn from_external(external: ExternalConfig) -> Self {
        let base = Self::default();
        let ext = external.extraction;
        let quiz = external.quiz_defaults;
        Self {
            extraction: ExtractionConfig {
                tick_interval: ext
                    .tick_interval_ms
                    .map(|ms| Duration::from_millis(ms.max(1)))
                    .unwrap_or(base.extraction.tick_interval),
                progress_step: ext
                    .progress_step
                    .unwrap_or(base.extraction.progress_step)
                    .clamp(1, 100),
                pdf_sections: ext.pdf_sections.unwrap_or(base.extraction.pdf_sections),
                default_sections: ext
                    .default_sections
                    .unwrap_or(base.extraction.default_sections),
            },
            quiz_defaults: QuizDefaults {
                time_limit_minutes: quiz
                    .time_limit_minutes
                    .unwrap_or(base.quiz_defaults.time_limit_minutes),
                passing_score_percent: quiz
                    .passing_score_percent
                    .unwrap_or(base.quiz_defaults.passing_score_percent)
                    .min(100),
                shuffle_questions: quiz
                    .shuffle_questions
                    .unwrap_or(base.quiz_defaults.shuffle_questions),
                show_feedback_after_submit: quiz
                    .show_feedback_after_submit
                    .unwrap_or(base.quiz_defaults.show_feedback_after_submit),
            },
        }
    }
}
