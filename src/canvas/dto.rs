use serde::Deserialize;

use crate::models::{Assignment, Course};

/// Canvas ids are integers, but some deployments (and ids past 2^53) come
/// back as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Str(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Int(n) => write!(f, "{}", n),
            RawId::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CanvasCourse {
    pub id: RawId,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<CanvasCourse> for Course {
    fn from(c: CanvasCourse) -> Self {
        let id = c.id.to_string();
        match c.name {
            Some(name) if !name.trim().is_empty() => Course::new(id, name),
            _ => Course::unnamed(id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CanvasAssignment {
    pub id: RawId,
    pub name: String,
    #[serde(default)]
    pub course_id: Option<RawId>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
}

impl CanvasAssignment {
    pub fn into_assignment(self, scope: &str) -> Assignment {
        Assignment {
            id: self.id.to_string(),
            course_id: self
                .course_id
                .map(|c| c.to_string())
                .unwrap_or_else(|| scope.to_string()),
            name: self.name,
            due_at: self.due_at.filter(|d| !d.is_empty()),
            points_possible: self.points_possible,
            description: self.description.filter(|d| !d.is_empty()),
            html_url: self.html_url,
        }
    }
}
