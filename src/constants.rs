// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const TITLE_TRUNCATE_LENGTH: usize = 60;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";

/// `blob:` 句柄地址的来源部分
pub const BLOB_ORIGIN: &str = clap::crate_name!();

pub const SUBMIT_LABEL_CREATE: &str = "Create Course";
pub const SUBMIT_LABEL_UPDATE: &str = "Update Course";

pub mod defaults {
    pub const TRUE_LABEL: &str = "True";
    pub const FALSE_LABEL: &str = "False";
    pub const QUESTION_POINTS: u32 = 1;

    pub const QUIZ_TIME_LIMIT_MINUTES: u32 = 30;
    pub const QUIZ_PASSING_SCORE_PERCENT: u8 = 70;

    pub const EXTRACTION_TICK_INTERVAL_MS: u64 = 200;
    pub const EXTRACTION_PROGRESS_STEP: u8 = 10;
    pub const EXTRACTION_PDF_SECTIONS: usize = 4;
    pub const EXTRACTION_DEFAULT_SECTIONS: usize = 2;
}

pub mod mime {
    pub const PDF: &str = "application/pdf";
    pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
    pub const TEXT: &str = "text/plain";
    pub const MARKDOWN: &str = "text/markdown";
    pub const MP4: &str = "video/mp4";
    pub const MP3: &str = "audio/mpeg";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}
