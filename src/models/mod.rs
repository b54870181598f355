// src/models/mod.rs

pub mod quiz;

use crate::{media::MediaList, utils};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use quiz::{OpenFormat, QuestionKind, QuestionType, QuizConfig, QuizQuestion};

/// 编辑器内部使用的节点键。下标会随增删而移动，键不会
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(Uuid);

impl NodeKey {
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::mint()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 为新节点生成持久化 ID
pub fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Video,
    #[default]
    Text,
    Quiz,
    Assignment,
    Audio,
    Document,
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitType::Video => "video",
            UnitType::Text => "text",
            UnitType::Quiz => "quiz",
            UnitType::Assignment => "assignment",
            UnitType::Audio => "audio",
            UnitType::Document => "document",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Course {
    /// 新建课程：一个模块，模块内一个默认的文本单元
    pub fn blank() -> Self {
        Self {
            modules: vec![Module::new()],
            ..Default::default()
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn unit_count(&self) -> usize {
        self.modules.iter().map(|m| m.units.len()).sum()
    }

    /// 为所有缺少 ID 的节点生成新 ID
    pub(crate) fn assign_missing_ids(&mut self) -> usize {
        let mut minted = 0;
        let mut fill = |id: &mut Option<String>| {
            if id.is_none() {
                *id = Some(mint_id());
                minted += 1;
            }
        };
        fill(&mut self.id);
        for module in &mut self.modules {
            fill(&mut module.id);
            for media in module.media.iter_mut() {
                fill(&mut media.id);
            }
            for unit in &mut module.units {
                fill(&mut unit.id);
                for media in unit.media.iter_mut() {
                    fill(&mut media.id);
                }
                if let Some(quiz) = unit.quiz_config.as_mut() {
                    for question in &mut quiz.questions {
                        fill(&mut question.id);
                    }
                }
            }
        }
        minted
    }

    /// 丢弃非测验单元上暂存的测验配置
    pub(crate) fn strip_parked_quizzes(&mut self) -> usize {
        let mut stripped = 0;
        for unit in self.modules.iter_mut().flat_map(|m| m.units.iter_mut()) {
            if unit.unit_type != UnitType::Quiz && unit.quiz_config.take().is_some() {
                stripped += 1;
            }
        }
        stripped
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[serde(skip)]
    pub(crate) key: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub media: MediaList,
}

impl Module {
    pub fn new() -> Self {
        Self {
            units: vec![Unit::new(UnitType::Text)],
            ..Default::default()
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// 只含一个空白默认单元时，可以直接用提取结果替换
    pub fn has_only_default_unit(&self) -> bool {
        match self.units.as_slice() {
            [] => true,
            [unit] => unit.is_blank(),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(skip)]
    pub(crate) key: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub(crate) unit_type: UnitType,
    #[serde(default)]
    pub media: MediaList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) quiz_config: Option<QuizConfig>,
}

impl Unit {
    pub fn new(unit_type: UnitType) -> Self {
        Self {
            unit_type,
            ..Default::default()
        }
    }

    pub(crate) fn from_draft(title: String, content: String) -> Self {
        Self {
            title,
            content,
            ..Self::new(UnitType::Text)
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// 仅当单元类型为测验时返回测验配置
    pub fn quiz(&self) -> Option<&QuizConfig> {
        match self.unit_type {
            UnitType::Quiz => self.quiz_config.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn quiz_mut(&mut self) -> Option<&mut QuizConfig> {
        match self.unit_type {
            UnitType::Quiz => self.quiz_config.as_mut(),
            _ => None,
        }
    }

    /// 类型切换离开测验后仍保留的配置
    pub fn parked_quiz(&self) -> Option<&QuizConfig> {
        match self.unit_type {
            UnitType::Quiz => None,
            _ => self.quiz_config.as_ref(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.unit_type == UnitType::Text
            && utils::is_blank(&self.title)
            && utils::is_blank(&self.content)
            && self.media.is_empty()
    }
}

/// 可编辑字符串字段的路径，同时用于校验结果的定位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    CourseTitle,
    CourseDescription,
    CourseThumbnail,
    CourseModules,
    ModuleTitle { module: usize },
    ModuleDescription { module: usize },
    ModuleContent { module: usize },
    UnitTitle { module: usize, unit: usize },
    UnitContent { module: usize, unit: usize },
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::CourseTitle => write!(f, "title"),
            FieldPath::CourseDescription => write!(f, "description"),
            FieldPath::CourseThumbnail => write!(f, "thumbnailUrl"),
            FieldPath::CourseModules => write!(f, "modules"),
            FieldPath::ModuleTitle { module } => write!(f, "modules[{}].title", module),
            FieldPath::ModuleDescription { module } => {
                write!(f, "modules[{}].description", module)
            }
            FieldPath::ModuleContent { module } => write!(f, "modules[{}].content", module),
            FieldPath::UnitTitle { module, unit } => {
                write!(f, "modules[{}].units[{}].title", module, unit)
            }
            FieldPath::UnitContent { module, unit } => {
                write!(f, "modules[{}].units[{}].content", module, unit)
            }
        }
    }
}

impl FieldPath {
    /// 字段所属的模块下标（课程级字段返回 None）
    pub fn module_index(&self) -> Option<usize> {
        match *self {
            FieldPath::ModuleTitle { module }
            | FieldPath::ModuleDescription { module }
            | FieldPath::ModuleContent { module }
            | FieldPath::UnitTitle { module, .. }
            | FieldPath::UnitContent { module, .. } => Some(module),
            _ => None,
        }
    }

    pub fn unit_index(&self) -> Option<usize> {
        match *self {
            FieldPath::UnitTitle { unit, .. } | FieldPath::UnitContent { unit, .. } => Some(unit),
            _ => None,
        }
    }
}
