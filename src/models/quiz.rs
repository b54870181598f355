// src/models/quiz.rs

use super::NodeKey;
use crate::{
    config::QuizDefaults,
    constants::defaults,
    error::{AppError, AppResult},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    MultipleSelect,
    ShortAnswer,
    TrueFalse,
    Matching,
    FillBlank,
    Code,
    FileUpload,
    Essay,
}

impl QuestionType {
    pub fn open_format(self) -> Option<OpenFormat> {
        match self {
            QuestionType::Matching => Some(OpenFormat::Matching),
            QuestionType::FillBlank => Some(OpenFormat::FillBlank),
            QuestionType::Code => Some(OpenFormat::Code),
            QuestionType::FileUpload => Some(OpenFormat::FileUpload),
            QuestionType::Essay => Some(OpenFormat::Essay),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::MultipleSelect => "multiple-select",
            QuestionType::ShortAnswer => "short-answer",
            QuestionType::TrueFalse => "true-false",
            QuestionType::Matching => "matching",
            QuestionType::FillBlank => "fill-blank",
            QuestionType::Code => "code",
            QuestionType::FileUpload => "file-upload",
            QuestionType::Essay => "essay",
        };
        f.write_str(s)
    }
}

/// 不带选项的开放式题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenFormat {
    Matching,
    FillBlank,
    Code,
    FileUpload,
    Essay,
}

impl From<OpenFormat> for QuestionType {
    fn from(format: OpenFormat) -> Self {
        match format {
            OpenFormat::Matching => QuestionType::Matching,
            OpenFormat::FillBlank => QuestionType::FillBlank,
            OpenFormat::Code => QuestionType::Code,
            OpenFormat::FileUpload => QuestionType::FileUpload,
            OpenFormat::Essay => QuestionType::Essay,
        }
    }
}

/// 题型与答案的组合。每个变体只携带该题型合法的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct: Option<usize>,
    },
    TrueFalse {
        options: Vec<String>,
        correct: Option<usize>,
    },
    MultipleSelect {
        options: Vec<String>,
        correct: BTreeSet<usize>,
    },
    ShortAnswer {
        reference: String,
    },
    Open {
        format: OpenFormat,
        reference: Option<String>,
    },
}

/// 正确答案在线上格式中的表示：选项下标或参考文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerRef {
    Index(usize),
    Text(String),
}

pub const MIN_OPTIONS: usize = 2;

impl QuestionKind {
    /// 切换题型时的固定重置表，原有选项和答案一律丢弃
    pub fn reset_for(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice {
                options: vec![String::new(); MIN_OPTIONS],
                correct: Some(0),
            },
            QuestionType::MultipleSelect => QuestionKind::MultipleSelect {
                options: vec![String::new(); MIN_OPTIONS],
                correct: BTreeSet::new(),
            },
            QuestionType::TrueFalse => QuestionKind::TrueFalse {
                options: vec![
                    defaults::TRUE_LABEL.to_string(),
                    defaults::FALSE_LABEL.to_string(),
                ],
                correct: Some(0),
            },
            QuestionType::ShortAnswer => QuestionKind::ShortAnswer {
                reference: String::new(),
            },
            other => QuestionKind::Open {
                // 其余题型都是开放式
                format: other.open_format().unwrap_or(OpenFormat::Essay),
                reference: None,
            },
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::MultipleSelect { .. } => QuestionType::MultipleSelect,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionKind::Open { format, .. } => (*format).into(),
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::TrueFalse { options, .. }
            | QuestionKind::MultipleSelect { options, .. } => Some(options),
            _ => None,
        }
    }

    /// 以线上格式返回正确答案
    pub fn correct_answers(&self) -> Vec<AnswerRef> {
        match self {
            QuestionKind::MultipleChoice { correct, .. } | QuestionKind::TrueFalse { correct, .. } => {
                correct.iter().map(|&i| AnswerRef::Index(i)).collect()
            }
            QuestionKind::MultipleSelect { correct, .. } => {
                correct.iter().map(|&i| AnswerRef::Index(i)).collect()
            }
            QuestionKind::ShortAnswer { reference } => vec![AnswerRef::Text(reference.clone())],
            QuestionKind::Open { reference, .. } => {
                reference.iter().cloned().map(AnswerRef::Text).collect()
            }
        }
    }

    pub fn correct_indices(&self) -> BTreeSet<usize> {
        match self {
            QuestionKind::MultipleChoice { correct, .. } | QuestionKind::TrueFalse { correct, .. } => {
                correct.iter().copied().collect()
            }
            QuestionKind::MultipleSelect { correct, .. } => correct.clone(),
            _ => BTreeSet::new(),
        }
    }

    /// 只有单选和多选题的选项列表可以增删
    pub(crate) fn editable_options_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::MultipleSelect { options, .. } => Some(options),
            _ => None,
        }
    }

    pub(crate) fn options_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::TrueFalse { options, .. }
            | QuestionKind::MultipleSelect { options, .. } => Some(options),
            _ => None,
        }
    }

    pub(crate) fn add_option(&mut self) -> bool {
        match self.editable_options_mut() {
            Some(options) => {
                options.push(String::new());
                true
            }
            None => false,
        }
    }

    /// 删除选项并重映射正确答案下标；选项数不得低于下限
    pub(crate) fn remove_option(&mut self, index: usize) -> bool {
        let Some(options) = self.editable_options_mut() else {
            return false;
        };
        if options.len() <= MIN_OPTIONS || index >= options.len() {
            return false;
        }
        options.remove(index);
        match self {
            QuestionKind::MultipleChoice { correct, .. } => {
                *correct = correct.and_then(|i| shift_after_removal(i, index));
            }
            QuestionKind::MultipleSelect { correct, .. } => {
                *correct = remap_after_removal(correct.iter().copied(), index);
            }
            _ => {}
        }
        true
    }

    pub(crate) fn toggle_correct(&mut self, index: usize) -> bool {
        let in_range = self.options().is_some_and(|o| index < o.len());
        if !in_range {
            return false;
        }
        match self {
            QuestionKind::MultipleChoice { correct, .. } | QuestionKind::TrueFalse { correct, .. } => {
                *correct = Some(index);
                true
            }
            QuestionKind::MultipleSelect { correct, .. } => {
                if !correct.remove(&index) {
                    correct.insert(index);
                }
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_reference(&mut self, text: &str) -> bool {
        match self {
            QuestionKind::ShortAnswer { reference } => {
                *reference = text.to_string();
                true
            }
            _ => false,
        }
    }
}

fn shift_after_removal(index: usize, removed: usize) -> Option<usize> {
    match index.cmp(&removed) {
        std::cmp::Ordering::Less => Some(index),
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(index - 1),
    }
}

/// 删除下标 `removed` 后的正确答案集合：去掉被删下标，更大的下标减一
pub fn remap_after_removal(
    indices: impl IntoIterator<Item = usize>,
    removed: usize,
) -> BTreeSet<usize> {
    indices
        .into_iter()
        .filter_map(|i| shift_after_removal(i, removed))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "QuestionRecord", try_from = "QuestionRecord")]
pub struct QuizQuestion {
    pub(crate) key: NodeKey,
    pub id: Option<String>,
    pub text: String,
    pub(crate) points: u32,
    pub(crate) kind: QuestionKind,
    pub explanation: Option<String>,
}

impl Default for QuizQuestion {
    fn default() -> Self {
        Self::new(QuestionType::MultipleChoice)
    }
}

impl QuizQuestion {
    pub fn new(question_type: QuestionType) -> Self {
        Self {
            key: NodeKey::mint(),
            id: None,
            text: String::new(),
            points: defaults::QUESTION_POINTS,
            kind: QuestionKind::reset_for(question_type),
            explanation: None,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn options(&self) -> Option<&[String]> {
        self.kind.options()
    }

    pub fn correct_answers(&self) -> Vec<AnswerRef> {
        self.kind.correct_answers()
    }
}

/// 题目的线上格式：`{ type, options?, correctAnswers }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(rename = "type")]
    question_type: QuestionType,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    #[serde(default)]
    correct_answers: Vec<AnswerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

fn default_points() -> u32 {
    defaults::QUESTION_POINTS
}

impl From<QuizQuestion> for QuestionRecord {
    fn from(q: QuizQuestion) -> Self {
        Self {
            id: q.id,
            text: q.text,
            question_type: q.kind.question_type(),
            points: q.points,
            options: q.kind.options().map(<[String]>::to_vec),
            correct_answers: q.kind.correct_answers(),
            explanation: q.explanation,
        }
    }
}

impl TryFrom<QuestionRecord> for QuizQuestion {
    type Error = AppError;

    fn try_from(record: QuestionRecord) -> AppResult<Self> {
        let kind = parse_kind(&record)?;
        Ok(Self {
            key: NodeKey::mint(),
            id: record.id,
            text: record.text,
            points: record.points.max(1),
            kind,
            explanation: record.explanation,
        })
    }
}

fn parse_kind(record: &QuestionRecord) -> AppResult<QuestionKind> {
    let invalid = |msg: String| AppError::InvalidDocument(format!("题型 {}: {}", record.question_type, msg));

    let indices = || -> AppResult<BTreeSet<usize>> {
        record
            .correct_answers
            .iter()
            .map(|a| match a {
                AnswerRef::Index(i) => Ok(*i),
                AnswerRef::Text(t) => Err(invalid(format!("选择题答案必须是选项下标，而不是 '{}'", t))),
            })
            .collect()
    };
    let checked_options = |min: usize| -> AppResult<Vec<String>> {
        let options = record.options.clone().unwrap_or_default();
        if options.len() < min {
            return Err(invalid(format!("至少需要 {} 个选项，实际 {} 个", min, options.len())));
        }
        Ok(options)
    };
    let single = |options: &[String]| -> AppResult<Option<usize>> {
        let set = indices()?;
        if set.len() > 1 {
            return Err(invalid(format!("只能有一个正确答案，实际 {} 个", set.len())));
        }
        match set.into_iter().next() {
            Some(i) if i >= options.len() => Err(invalid(format!("答案下标 {} 超出选项范围", i))),
            other => Ok(other),
        }
    };
    let first_text = || {
        record.correct_answers.iter().find_map(|a| match a {
            AnswerRef::Text(t) => Some(t.clone()),
            AnswerRef::Index(_) => None,
        })
    };

    let kind = match record.question_type {
        QuestionType::MultipleChoice => {
            let options = checked_options(MIN_OPTIONS)?;
            let correct = single(&options)?;
            QuestionKind::MultipleChoice { options, correct }
        }
        QuestionType::TrueFalse => {
            let options = match &record.options {
                Some(_) => checked_options(MIN_OPTIONS)?,
                None => vec![defaults::TRUE_LABEL.to_string(), defaults::FALSE_LABEL.to_string()],
            };
            let correct = single(&options)?;
            QuestionKind::TrueFalse { options, correct }
        }
        QuestionType::MultipleSelect => {
            let options = checked_options(MIN_OPTIONS)?;
            let correct = indices()?;
            if let Some(i) = correct.iter().find(|&&i| i >= options.len()) {
                return Err(invalid(format!("答案下标 {} 超出选项范围", i)));
            }
            QuestionKind::MultipleSelect { options, correct }
        }
        QuestionType::ShortAnswer => QuestionKind::ShortAnswer {
            reference: first_text().unwrap_or_default(),
        },
        other => QuestionKind::Open {
            format: other.open_format().unwrap_or(OpenFormat::Essay),
            reference: first_text(),
        },
    };
    Ok(kind)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    #[serde(default = "default_time_limit")]
    pub(crate) time_limit_minutes: u32,
    #[serde(default = "default_passing_score")]
    pub(crate) passing_score_percent: u8,
    #[serde(default)]
    pub(crate) shuffle_questions: bool,
    #[serde(default = "default_show_feedback")]
    pub(crate) show_feedback_after_submit: bool,
    #[serde(default)]
    pub(crate) questions: Vec<QuizQuestion>,
}

fn default_time_limit() -> u32 {
    defaults::QUIZ_TIME_LIMIT_MINUTES
}

fn default_passing_score() -> u8 {
    defaults::QUIZ_PASSING_SCORE_PERCENT
}

fn default_show_feedback() -> bool {
    true
}

impl QuizConfig {
    /// 新建测验配置：带一道默认的单选题
    pub fn with_defaults(defaults: &QuizDefaults) -> Self {
        Self {
            time_limit_minutes: defaults.time_limit_minutes,
            passing_score_percent: defaults.passing_score_percent.min(100),
            shuffle_questions: defaults.shuffle_questions,
            show_feedback_after_submit: defaults.show_feedback_after_submit,
            questions: vec![QuizQuestion::default()],
        }
    }

    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    pub fn passing_score_percent(&self) -> u8 {
        self.passing_score_percent
    }

    pub fn shuffle_questions(&self) -> bool {
        self.shuffle_questions
    }

    pub fn show_feedback_after_submit(&self) -> bool {
        self.show_feedback_after_submit
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_after_removal() {
        // 被删下标消失，更大的下标减一，更小的不变
        let remapped = remap_after_removal([0, 2, 3], 2);
        assert_eq!(remapped, BTreeSet::from([0, 2]));

        assert_eq!(remap_after_removal([1], 0), BTreeSet::from([0]));
        assert_eq!(remap_after_removal([0], 0), BTreeSet::new());
        assert_eq!(remap_after_removal(Vec::<usize>::new(), 1), BTreeSet::new());
    }

    #[test]
    fn test_remap_matches_definition_for_all_small_sets() {
        // 对 4 个选项的所有子集和所有删除位置逐一核对
        for mask in 0u8..16 {
            let set: BTreeSet<usize> = (0..4).filter(|i| mask & (1 << i) != 0).collect();
            for k in 0..4 {
                let expected: BTreeSet<usize> = set
                    .iter()
                    .filter(|&&i| i != k)
                    .map(|&i| if i > k { i - 1 } else { i })
                    .collect();
                assert_eq!(remap_after_removal(set.iter().copied(), k), expected);
            }
        }
    }

    #[test]
    fn test_reset_table() {
        assert_eq!(
            QuestionKind::reset_for(QuestionType::MultipleChoice).correct_answers(),
            vec![AnswerRef::Index(0)]
        );
        assert!(
            QuestionKind::reset_for(QuestionType::MultipleSelect)
                .correct_answers()
                .is_empty()
        );
        assert_eq!(
            QuestionKind::reset_for(QuestionType::TrueFalse).options(),
            Some(&["True".to_string(), "False".to_string()][..])
        );
        assert_eq!(
            QuestionKind::reset_for(QuestionType::ShortAnswer).correct_answers(),
            vec![AnswerRef::Text(String::new())]
        );
        let code = QuestionKind::reset_for(QuestionType::Code);
        assert!(code.options().is_none());
        assert!(code.correct_answers().is_empty());
        assert_eq!(code.question_type(), QuestionType::Code);
    }

    #[test]
    fn test_multiple_choice_loses_answer_when_correct_option_removed() {
        let mut kind = QuestionKind::MultipleChoice {
            options: vec!["a".into(), "b".into(), "c".into()],
            correct: Some(1),
        };
        assert!(kind.remove_option(1));
        assert!(kind.correct_answers().is_empty());
        assert_eq!(kind.options().map(|o| o.len()), Some(2));
        // 已到下限，不能再删
        assert!(!kind.remove_option(0));
    }

    #[test]
    fn test_true_false_options_are_fixed() {
        let mut kind = QuestionKind::reset_for(QuestionType::TrueFalse);
        assert!(!kind.add_option());
        assert!(!kind.remove_option(0));
        assert!(kind.toggle_correct(1));
        assert_eq!(kind.correct_answers(), vec![AnswerRef::Index(1)]);
    }

    #[test]
    fn test_question_wire_format() {
        let question = QuizQuestion::new(QuestionType::MultipleChoice);
        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["type"], "multiple-choice");
        assert_eq!(json["options"], serde_json::json!(["", ""]));
        assert_eq!(json["correctAnswers"], serde_json::json!([0]));
        assert_eq!(json["points"], 1);

        let short = QuizQuestion::new(QuestionType::ShortAnswer);
        let json = serde_json::to_value(&short).unwrap();
        assert!(json.get("options").is_none());
        assert_eq!(json["correctAnswers"], serde_json::json!([""]));
    }

    #[test]
    fn test_question_parse_rejects_invalid_records() {
        let too_few = serde_json::json!({
            "type": "multiple-choice", "text": "q", "options": ["only"], "correctAnswers": [0]
        });
        assert!(serde_json::from_value::<QuizQuestion>(too_few).is_err());

        let two_correct = serde_json::json!({
            "type": "multiple-choice", "options": ["a", "b"], "correctAnswers": [0, 1]
        });
        assert!(serde_json::from_value::<QuizQuestion>(two_correct).is_err());

        let out_of_range = serde_json::json!({
            "type": "multiple-select", "options": ["a", "b"], "correctAnswers": [5]
        });
        assert!(serde_json::from_value::<QuizQuestion>(out_of_range).is_err());
    }

    #[test]
    fn test_question_parse_accepts_valid_records() {
        let select = serde_json::json!({
            "type": "multiple-select", "text": "pick", "points": 3,
            "options": ["a", "b", "c"], "correctAnswers": [2, 0]
        });
        let q: QuizQuestion = serde_json::from_value(select).unwrap();
        assert_eq!(q.question_type(), QuestionType::MultipleSelect);
        assert_eq!(q.kind().correct_indices(), BTreeSet::from([0, 2]));
        assert_eq!(q.points(), 3);

        // 判断题缺省选项时补全 True/False
        let tf = serde_json::json!({ "type": "true-false", "correctAnswers": [1] });
        let q: QuizQuestion = serde_json::from_value(tf).unwrap();
        assert_eq!(q.options().map(|o| o.len()), Some(2));

        // 分值至少为 1
        let zero = serde_json::json!({ "type": "essay", "points": 0, "correctAnswers": ["model"] });
        let q: QuizQuestion = serde_json::from_value(zero).unwrap();
        assert_eq!(q.points(), 1);
        assert_eq!(q.correct_answers(), vec![AnswerRef::Text("model".into())]);
    }
}
