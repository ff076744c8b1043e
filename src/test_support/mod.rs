//! Helpers shared by unit and integration tests.

pub mod broker;
pub mod common;
