// src/editor/tree.rs

use crate::{
    config::QuizDefaults,
    editor::quiz::QuizEngine,
    media::{FileUpload, MediaList, MediaResourceManager, MediaTarget},
    models::{Course, FieldPath, Module, NodeKey, QuizConfig, QuizQuestion, Unit, UnitType},
};
use log::{debug, info};

/// 课程树。所有结构性修改都经过这里，保证各级最小数量不被破坏，
/// 删除节点前先释放其拥有的全部附件。
#[derive(Debug)]
pub struct ContentTree {
    course: Course,
    media: MediaResourceManager,
    quiz_defaults: QuizDefaults,
}

impl ContentTree {
    pub fn new(initial: Option<Course>, media: MediaResourceManager, quiz_defaults: QuizDefaults) -> Self {
        let mut course = initial.unwrap_or_else(Course::blank);
        let repaired = normalize(&mut course, &quiz_defaults);
        if repaired > 0 {
            info!("初始课程数据已补全 {} 处缺失的默认节点", repaired);
        }
        Self {
            course,
            media,
            quiz_defaults,
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn media(&self) -> &MediaResourceManager {
        &self.media
    }

    pub fn quiz_defaults(&self) -> &QuizDefaults {
        &self.quiz_defaults
    }

    pub fn module(&self, module: usize) -> Option<&Module> {
        self.course.modules.get(module)
    }

    pub fn unit(&self, module: usize, unit: usize) -> Option<&Unit> {
        self.module(module).and_then(|m| m.units.get(unit))
    }

    pub fn module_key(&self, module: usize) -> Option<NodeKey> {
        self.module(module).map(Module::key)
    }

    pub fn unit_key(&self, module: usize, unit: usize) -> Option<NodeKey> {
        self.unit(module, unit).map(Unit::key)
    }

    pub fn locate_module(&self, key: NodeKey) -> Option<usize> {
        self.course.modules.iter().position(|m| m.key == key)
    }

    pub fn locate_unit(&self, key: NodeKey) -> Option<(usize, usize)> {
        self.course.modules.iter().enumerate().find_map(|(mi, m)| {
            m.units.iter().position(|u| u.key == key).map(|ui| (mi, ui))
        })
    }

    /// 追加一个带默认文本单元的模块，返回其下标
    pub fn add_module(&mut self) -> usize {
        self.course.modules.push(Module::new());
        debug!("新增模块 #{}", self.course.modules.len());
        self.course.modules.len() - 1
    }

    pub fn remove_module(&mut self, module: usize) -> bool {
        if self.course.modules.len() <= 1 {
            debug!("课程至少保留一个模块，忽略删除");
            return false;
        }
        let Some(target) = self.course.modules.get_mut(module) else {
            debug!("模块下标 {} 越界，忽略删除", module);
            return false;
        };
        let released = release_module_media(&self.media, target);
        self.course.modules.remove(module);
        debug!("删除模块 #{}，释放 {} 个附件", module + 1, released);
        true
    }

    pub fn add_unit(&mut self, module: usize) -> Option<usize> {
        let Some(target) = self.course.modules.get_mut(module) else {
            debug!("模块下标 {} 越界，无法新增单元", module);
            return None;
        };
        target.units.push(Unit::new(UnitType::Text));
        Some(target.units.len() - 1)
    }

    pub fn remove_unit(&mut self, module: usize, unit: usize) -> bool {
        let Some(target) = self.course.modules.get_mut(module) else {
            return false;
        };
        if target.units.len() <= 1 {
            debug!("模块 #{} 至少保留一个单元，忽略删除", module + 1);
            return false;
        }
        let Some(doomed) = target.units.get_mut(unit) else {
            debug!("单元下标 {} 越界，忽略删除", unit);
            return false;
        };
        let released = self.media.release_all(&mut doomed.media);
        target.units.remove(unit);
        debug!("删除单元 #{}.{}，释放 {} 个附件", module + 1, unit + 1, released);
        true
    }

    /// 切换单元类型。首次切换到测验时按默认值创建配置；
    /// 切换离开测验时配置被暂存，切回时恢复。
    pub fn change_unit_type(&mut self, module: usize, unit: usize, unit_type: UnitType) -> bool {
        let Some(target) = self
            .course
            .modules
            .get_mut(module)
            .and_then(|m| m.units.get_mut(unit))
        else {
            return false;
        };
        if target.unit_type == unit_type {
            return false;
        }
        target.unit_type = unit_type;
        if unit_type == UnitType::Quiz && target.quiz_config.is_none() {
            target.quiz_config = Some(QuizConfig::with_defaults(&self.quiz_defaults));
        }
        debug!("单元 #{}.{} 类型改为 {}", module + 1, unit + 1, unit_type);
        true
    }

    /// 整体替换一个字符串字段
    pub fn edit_field(&mut self, path: FieldPath, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match path {
            FieldPath::CourseTitle => Some(&mut self.course.title),
            FieldPath::CourseDescription => Some(&mut self.course.description),
            FieldPath::CourseThumbnail => Some(&mut self.course.thumbnail_url),
            FieldPath::CourseModules => None,
            FieldPath::ModuleTitle { module } => self.module_mut(module).map(|m| &mut m.title),
            FieldPath::ModuleDescription { module } => {
                self.module_mut(module).map(|m| &mut m.description)
            }
            FieldPath::ModuleContent { module } => self.module_mut(module).map(|m| &mut m.content),
            FieldPath::UnitTitle { module, unit } => self.unit_mut(module, unit).map(|u| &mut u.title),
            FieldPath::UnitContent { module, unit } => {
                self.unit_mut(module, unit).map(|u| &mut u.content)
            }
        };
        match slot {
            Some(field) => {
                *field = value;
                true
            }
            None => {
                debug!("字段 {} 不存在或不可编辑", path);
                false
            }
        }
    }

    /// 测验类型单元的题目编辑器
    pub fn quiz(&mut self, module: usize, unit: usize) -> Option<QuizEngine<'_>> {
        self.unit_mut(module, unit)
            .and_then(Unit::quiz_mut)
            .map(QuizEngine::new)
    }

    pub fn attach_media(&mut self, target: MediaTarget, upload: FileUpload) -> Option<usize> {
        let media = self.media.clone();
        let list = self.media_list_mut(target)?;
        Some(media.attach(list, upload))
    }

    pub fn detach_media(&mut self, target: MediaTarget, index: usize) -> bool {
        let media = self.media.clone();
        match self.media_list_mut(target) {
            Some(list) => media.detach(list, index),
            None => false,
        }
    }

    /// 释放整棵树上的全部附件
    pub fn release_all_media(&mut self) -> usize {
        let media = &self.media;
        self.course
            .modules
            .iter_mut()
            .map(|m| release_module_media(media, m))
            .sum()
    }

    pub(crate) fn module_mut(&mut self, module: usize) -> Option<&mut Module> {
        self.course.modules.get_mut(module)
    }

    pub(crate) fn unit_mut(&mut self, module: usize, unit: usize) -> Option<&mut Unit> {
        self.module_mut(module).and_then(|m| m.units.get_mut(unit))
    }

    /// 用新单元替换模块内全部单元，返回释放的附件数
    pub(crate) fn replace_units(&mut self, module: usize, units: Vec<Unit>) -> usize {
        if units.is_empty() {
            return 0;
        }
        let media = self.media.clone();
        let Some(target) = self.module_mut(module) else {
            return 0;
        };
        let released = target
            .units
            .iter_mut()
            .map(|u| media.release_all(&mut u.media))
            .sum();
        target.units = units;
        released
    }

    pub(crate) fn take_course(&mut self) -> Course {
        std::mem::take(&mut self.course)
    }

    fn media_list_mut(&mut self, target: MediaTarget) -> Option<&mut MediaList> {
        match target {
            MediaTarget::Module { module } => self.module_mut(module).map(|m| &mut m.media),
            MediaTarget::Unit { module, unit } => self.unit_mut(module, unit).map(|u| &mut u.media),
        }
    }
}

fn release_module_media(media: &MediaResourceManager, module: &mut Module) -> usize {
    let mut released = media.release_all(&mut module.media);
    for unit in &mut module.units {
        released += media.release_all(&mut unit.media);
    }
    released
}

/// 补全初始数据中缺失的默认节点，返回修补的数量
fn normalize(course: &mut Course, quiz_defaults: &QuizDefaults) -> usize {
    let mut repaired = 0;
    if course.modules.is_empty() {
        course.modules.push(Module::new());
        repaired += 1;
    }
    for module in &mut course.modules {
        if module.units.is_empty() {
            module.units.push(Unit::new(UnitType::Text));
            repaired += 1;
        }
        for unit in &mut module.units {
            if unit.unit_type != UnitType::Quiz {
                continue;
            }
            let quiz = unit.quiz_config.get_or_insert_with(|| {
                repaired += 1;
                QuizConfig::with_defaults(quiz_defaults)
            });
            if quiz.questions.is_empty() {
                quiz.questions.push(QuizQuestion::default());
                repaired += 1;
            }
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_from(json: serde_json::Value) -> ContentTree {
        let course: Course = serde_json::from_value(json).unwrap();
        ContentTree::new(Some(course), MediaResourceManager::default(), QuizDefaults::default())
    }

    #[test]
    fn test_normalize_fills_missing_defaults() {
        let tree = tree_from(serde_json::json!({ "title": "Empty" }));
        assert_eq!(tree.course().module_count(), 1);
        assert_eq!(tree.course().unit_count(), 1);

        let tree = tree_from(serde_json::json!({
            "modules": [
                { "title": "A", "units": [] },
                { "title": "B", "units": [{ "title": "Q", "type": "quiz" }] },
                { "title": "C", "units": [{ "type": "quiz", "quizConfig": { "questions": [] } }] }
            ]
        }));
        assert_eq!(tree.module(0).map(|m| m.units.len()), Some(1));
        let quiz = tree.unit(1, 0).and_then(Unit::quiz).unwrap();
        assert_eq!(quiz.questions().len(), 1);
        assert_eq!(quiz.time_limit_minutes(), 30);
        let quiz = tree.unit(2, 0).and_then(Unit::quiz).unwrap();
        assert_eq!(quiz.questions().len(), 1);
    }

    #[test]
    fn test_keys_survive_sibling_removal() {
        let mut tree = ContentTree::new(None, MediaResourceManager::default(), QuizDefaults::default());
        tree.add_module();
        tree.add_module();
        let key = tree.module_key(2).unwrap();
        assert!(tree.remove_module(0));
        assert_eq!(tree.locate_module(key), Some(1));
    }
}
