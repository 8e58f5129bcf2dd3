//! The workflow engine: transition execution, expert assignment, and
//! notification fan-out.
//!
//! Handlers validate request shapes and delegate here; everything that
//! mutates a project's review state goes through [`transition`] so the
//! review, phase instance, and project status always change in one
//! database transaction.

pub mod assignment;
pub mod notify;
pub mod transition;
