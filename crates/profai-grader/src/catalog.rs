//! Built-in lesson catalog
//!
//! Courses group lessons; each lesson carries a runnable sample and an
//! assignment graded by the sandbox. The catalog ships inside the binary.

use crate::case::{Submission, TestCase};
use crate::grader::Grader;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;

const BUILTIN_CATALOG: &str = include_str!("../data/lessons.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown course '{0}'")]
    CourseNotFound(String),

    #[error("Unknown lesson '{slug}' in course '{course}'")]
    LessonNotFound { course: String, slug: String },

    #[error("Lesson path must look like <course>/<lesson>, got '{0}'")]
    InvalidPath(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Ai,
    Algorithms,
    Ml,
    Ds,
    Systems,
    General,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::Ai => "AI",
            Topic::Algorithms => "Algorithms",
            Topic::Ml => "Machine Learning",
            Topic::Ds => "Data Structures",
            Topic::Systems => "Systems",
            Topic::General => "General",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub title: String,
    pub description: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub function_name: String,
    pub starter_code: String,
    pub tests: Vec<TestCase>,
}

fn default_language() -> String {
    "javascript".to_string()
}

impl Assignment {
    /// Pair learner source with this assignment's entry point
    pub fn submission(&self, source: impl Into<String>) -> Submission {
        Submission::new(source, self.function_name.clone())
    }

    /// Editor session starting from the starter code
    pub fn session(&self, grader: Grader) -> Session {
        Session::new(
            grader,
            self.starter_code.clone(),
            self.function_name.clone(),
            self.tests.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub sample_language: Option<String>,
    #[serde(default)]
    pub sample_code: Option<String>,
    pub assignment: Assignment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub topic: Topic,
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn lesson(&self, slug: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.slug == slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub courses: Vec<Course>,
}

impl Catalog {
    /// The catalog compiled into the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn course(&self, slug: &str) -> Result<&Course, CatalogError> {
        self.courses
            .iter()
            .find(|course| course.slug == slug)
            .ok_or_else(|| CatalogError::CourseNotFound(slug.to_string()))
    }

    pub fn lesson(&self, course: &str, slug: &str) -> Result<&Lesson, CatalogError> {
        self.course(course)?
            .lesson(slug)
            .ok_or_else(|| CatalogError::LessonNotFound {
                course: course.to_string(),
                slug: slug.to_string(),
            })
    }

    /// Look up `<course>/<lesson>`
    pub fn find(&self, path: &str) -> Result<&Lesson, CatalogError> {
        match path.split_once('/') {
            Some((course, slug)) if !course.is_empty() && !slug.is_empty() => {
                self.lesson(course, slug)
            }
            _ => Err(CatalogError::InvalidPath(path.to_string())),
        }
    }

    /// Every lesson with its course, in catalog order
    pub fn lessons(&self) -> impl Iterator<Item = (&Course, &Lesson)> {
        self.courses
            .iter()
            .flat_map(|course| course.lessons.iter().map(move |lesson| (course, lesson)))
    }
}
