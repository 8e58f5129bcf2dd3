//! Row structs and create/update DTOs, one module per table family.

pub mod archive;
pub mod expert_group;
pub mod notification;
pub mod phase_instance;
pub mod project;
pub mod review;
pub mod setting;
pub mod user;
pub mod workflow;
