pub mod sync_service;
pub mod scheduler;

pub use sync_service::{SyncService, SyncSummary};
pub use scheduler::SyncScheduler;
