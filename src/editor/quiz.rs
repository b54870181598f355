// src/editor/quiz.rs

use crate::models::{QuestionKind, QuestionType, QuizConfig, QuizQuestion};
use log::debug;

/// 单个测验配置的编辑视图。题目至少一道，选项题至少两个选项；
/// 违反下限的操作什么也不做并返回 `false`。
pub struct QuizEngine<'a> {
    config: &'a mut QuizConfig,
}

impl<'a> QuizEngine<'a> {
    pub fn new(config: &'a mut QuizConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QuizConfig {
        &*self.config
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.config.questions
    }

    pub fn question(&self, index: usize) -> Option<&QuizQuestion> {
        self.config.questions.get(index)
    }

    /// 追加一道默认单选题，返回其下标
    pub fn add_question(&mut self) -> usize {
        self.config.questions.push(QuizQuestion::default());
        self.config.questions.len() - 1
    }

    pub fn remove_question(&mut self, index: usize) -> bool {
        if self.config.questions.len() <= 1 || index >= self.config.questions.len() {
            debug!("无法删除题目 {}：至少保留一道题", index);
            return false;
        }
        self.config.questions.remove(index);
        true
    }

    /// 切换题型并无条件重置选项和答案
    pub fn change_question_type(&mut self, index: usize, question_type: QuestionType) -> bool {
        let Some(question) = self.config.questions.get_mut(index) else {
            return false;
        };
        question.kind = QuestionKind::reset_for(question_type);
        debug!("题目 {} 题型改为 {}", index, question_type);
        true
    }

    pub fn add_option(&mut self, question: usize) -> bool {
        self.with_question(question, |q| q.kind.add_option())
    }

    pub fn remove_option(&mut self, question: usize, option: usize) -> bool {
        self.with_question(question, |q| q.kind.remove_option(option))
    }

    /// 单选和判断题设为唯一答案，多选题切换该选项的选中状态
    pub fn toggle_correct_answer(&mut self, question: usize, option: usize) -> bool {
        self.with_question(question, |q| q.kind.toggle_correct(option))
    }

    /// 只对简答题有效
    pub fn set_free_text_answer(&mut self, question: usize, text: &str) -> bool {
        self.with_question(question, |q| q.kind.set_reference(text))
    }

    pub fn set_question_text(&mut self, question: usize, text: &str) -> bool {
        self.with_question(question, |q| {
            q.text = text.to_string();
            true
        })
    }

    pub fn set_option_text(&mut self, question: usize, option: usize, text: &str) -> bool {
        self.with_question(question, |q| {
            match q.kind.options_mut().and_then(|o| o.get_mut(option)) {
                Some(slot) => {
                    *slot = text.to_string();
                    true
                }
                None => false,
            }
        })
    }

    /// 分值至少为 1
    pub fn set_points(&mut self, question: usize, points: u32) -> bool {
        self.with_question(question, |q| {
            q.points = points.max(1);
            true
        })
    }

    pub fn set_explanation(&mut self, question: usize, explanation: Option<String>) -> bool {
        self.with_question(question, |q| {
            q.explanation = explanation.filter(|e| !e.trim().is_empty());
            true
        })
    }

    pub fn set_time_limit(&mut self, minutes: u32) {
        self.config.time_limit_minutes = minutes;
    }

    pub fn set_passing_score(&mut self, percent: u8) {
        self.config.passing_score_percent = percent.min(100);
    }

    pub fn set_shuffle_questions(&mut self, shuffle: bool) {
        self.config.shuffle_questions = shuffle;
    }

    pub fn set_show_feedback(&mut self, show: bool) {
        self.config.show_feedback_after_submit = show;
    }

    fn with_question(&mut self, index: usize, edit: impl FnOnce(&mut QuizQuestion) -> bool) -> bool {
        match self.config.questions.get_mut(index) {
            Some(question) => {
                let changed = edit(question);
                if !changed {
                    debug!("题目 {} 的编辑被忽略", index);
                }
                changed
            }
            None => {
                debug!("题目下标 {} 越界", index);
                false
            }
        }
    }
}
