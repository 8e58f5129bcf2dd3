//! HTTP handlers, grouped by resource.

pub mod assignment;
pub mod notification;
pub mod phase;
pub mod review;
pub mod workflow;
