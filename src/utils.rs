// src/utils.rs

use crate::constants::mime;
use regex::Regex;
use std::{path::Path, sync::LazyLock};

static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[^./\\]+$").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// 去掉文件名最后一个扩展名，得到用于标题的基础名
pub fn file_base_name(name: &str) -> String {
    let name = name.trim();
    let file_name = Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let base = EXTENSION_RE.replace(&file_name, "");
    let base = WHITESPACE_RE.replace_all(base.trim(), " ").into_owned();
    if base.is_empty() { file_name } else { base }
}

/// 根据扩展名猜测 MIME 类型，未知时返回 `application/octet-stream`
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => mime::PDF,
        "docx" => mime::DOCX,
        "pptx" => mime::PPTX,
        "txt" => mime::TEXT,
        "md" | "markdown" => mime::MARKDOWN,
        "mp4" => mime::MP4,
        "mp3" => mime::MP3,
        "png" => mime::PNG,
        "jpg" | "jpeg" => mime::JPEG,
        _ => mime::OCTET_STREAM,
    }
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}
