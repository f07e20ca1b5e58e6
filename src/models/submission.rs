use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Unsubmitted,
    Submitted,
    PendingReview,
    Graded,
    #[default]
    #[serde(other)]
    Unknown,
}

/// The current user's submission for one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub workflow_state: WorkflowState,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub late: bool,
}
