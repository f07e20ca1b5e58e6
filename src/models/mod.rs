pub mod assignment;
pub mod course;
pub mod submission;

pub use assignment::Assignment;
pub use course::Course;
pub use submission::{Submission, WorkflowState};
