//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods suffixed `_tx`
//! take the caller's open transaction so the engine can span a review,
//! phase-instance, and project write atomically.

pub mod archive_repo;
pub mod expert_group_repo;
pub mod notification_repo;
pub mod phase_instance_repo;
pub mod project_repo;
pub mod review_repo;
pub mod setting_repo;
pub mod user_repo;
pub mod workflow_repo;

pub use archive_repo::ArchiveRepo;
pub use expert_group_repo::ExpertGroupRepo;
pub use notification_repo::NotificationRepo;
pub use phase_instance_repo::PhaseInstanceRepo;
pub use project_repo::ProjectRepo;
pub use review_repo::{ReviewListFilter, ReviewRepo};
pub use setting_repo::SettingRepo;
pub use user_repo::UserRepo;
pub use workflow_repo::WorkflowRepo;
