// src/editor/validation.rs

use crate::{
    models::{Course, FieldPath, UnitType},
    utils::is_blank,
};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: FieldPath,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_flagged(&self, path: FieldPath) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }

    /// 以逗号分隔的未通过字段路径
    pub fn flagged_paths(&self) -> String {
        self.errors.iter().map(|e| e.path).unique().join(", ")
    }

    fn require(&mut self, path: FieldPath, value: &str, label: &str) {
        if is_blank(value) {
            self.errors.push(FieldError {
                path,
                message: format!("{}不能为空", label),
            });
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}: {}", error.path, error.message)?;
        }
        Ok(())
    }
}

/// 提交前的必填项检查
pub fn validate(course: &Course) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.require(FieldPath::CourseTitle, &course.title, "课程标题");
    report.require(FieldPath::CourseDescription, &course.description, "课程简介");
    report.require(FieldPath::CourseThumbnail, &course.thumbnail_url, "课程封面");
    if course.modules.is_empty() {
        report.errors.push(FieldError {
            path: FieldPath::CourseModules,
            message: "课程至少需要一个模块".to_string(),
        });
    }

    for (mi, module) in course.modules.iter().enumerate() {
        report.require(FieldPath::ModuleTitle { module: mi }, &module.title, "模块标题");
        report.require(
            FieldPath::ModuleDescription { module: mi },
            &module.description,
            "模块简介",
        );
        report.require(FieldPath::ModuleContent { module: mi }, &module.content, "模块内容");

        for (ui, unit) in module.units.iter().enumerate() {
            report.require(FieldPath::UnitTitle { module: mi, unit: ui }, &unit.title, "单元标题");
            if unit.unit_type() != UnitType::Quiz {
                report.require(
                    FieldPath::UnitContent { module: mi, unit: ui },
                    &unit.content,
                    "单元内容",
                );
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;

    #[test]
    fn test_blank_course_flags_every_required_field() {
        let report = validate(&Course::blank());
        assert!(!report.is_valid());
        for path in [
            FieldPath::CourseTitle,
            FieldPath::CourseDescription,
            FieldPath::CourseThumbnail,
            FieldPath::ModuleTitle { module: 0 },
            FieldPath::ModuleDescription { module: 0 },
            FieldPath::ModuleContent { module: 0 },
            FieldPath::UnitTitle { module: 0, unit: 0 },
            FieldPath::UnitContent { module: 0, unit: 0 },
        ] {
            assert!(report.is_flagged(path), "{} 应被标记", path);
        }
    }

    #[test]
    fn test_quiz_units_do_not_need_content() {
        let course: Course = serde_json::from_value(serde_json::json!({
            "title": "T", "description": "D", "thumbnailUrl": "https://img/x.png",
            "modules": [{
                "title": "M", "description": "MD", "content": "MC",
                "units": [{ "title": "Quiz", "type": "quiz" }]
            }]
        }))
        .unwrap();
        assert!(validate(&course).is_valid());
    }

    #[test]
    fn test_course_without_modules_is_flagged() {
        let course = Course::default();
        assert!(validate(&course).is_flagged(FieldPath::CourseModules));
    }
}
