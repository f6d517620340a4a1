//! Route handlers

pub mod predictions;
pub mod schema;
