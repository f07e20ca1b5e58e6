use std::fmt;

use serde::Serialize;

use crate::models::{Submission, WorkflowState};

/// Progress of one assignment as shown in the `Status` select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignmentStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Submitted - Pending Review")]
    PendingReview,
    #[serde(rename = "Late Submission")]
    Late,
}

impl AssignmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AssignmentStatus::NotStarted => "Not Started",
            AssignmentStatus::InProgress => "In Progress",
            AssignmentStatus::Completed => "Completed",
            AssignmentStatus::PendingReview => "Submitted - Pending Review",
            AssignmentStatus::Late => "Late Submission",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rules are checked in order; pending review wins over late.
pub fn resolve_status(submission: Option<&Submission>) -> AssignmentStatus {
    let Some(submission) = submission else {
        return AssignmentStatus::NotStarted;
    };

    let has_timestamp = submission
        .submitted_at
        .as_deref()
        .is_some_and(|ts| !ts.is_empty());

    if has_timestamp && submission.workflow_state == WorkflowState::Submitted {
        AssignmentStatus::Completed
    } else if submission.workflow_state == WorkflowState::PendingReview {
        AssignmentStatus::PendingReview
    } else if submission.late {
        AssignmentStatus::Late
    } else {
        AssignmentStatus::InProgress
    }
}
