use serde::{Deserialize, Serialize};

/// A Canvas course. Every assignment belongs to exactly one course, and a
/// course is the unit a sync run skips when Canvas refuses to list it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
}

impl Course {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Placeholder used when the course record itself could not be fetched.
    pub fn unnamed(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = format!("Course {}", id);
        Self { id, name }
    }
}
