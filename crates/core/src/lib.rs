//! Domain logic for the innovation project review workflow.
//!
//! Everything in this crate is pure: node-chain lookups, transition
//! planning, score normalization, and eligibility rules operate on
//! in-memory values and return [`error::CoreError`] on invalid input.
//! Persistence lives in `ipms-db`, orchestration in `ipms-api`.

pub mod assignment;
pub mod error;
pub mod review_level;
pub mod scoring;
pub mod status;
pub mod transition;
pub mod types;
pub mod window;
pub mod workflow;
