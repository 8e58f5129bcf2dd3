//! Authentication primitives (JWT tokens).

pub mod jwt;
