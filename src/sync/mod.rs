//! Pure pieces of reconciliation: status derivation, property mapping, and
//! the identity index. Network calls live in `services`.

pub mod index;
pub mod mapper;
pub mod status;

pub use index::IdentityIndex;
pub use mapper::{fields, map_assignment, normalize_timestamp};
pub use status::{AssignmentStatus, resolve_status};
