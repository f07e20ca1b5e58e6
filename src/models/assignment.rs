use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Canvas assignment id, stringified. Unique within a course.
    pub id: String,
    pub course_id: String,
    pub name: String,
    /// Raw `due_at` as Canvas sent it.
    pub due_at: Option<String>,
    pub points_possible: Option<f64>,
    pub description: Option<String>,
    pub html_url: String,
}
