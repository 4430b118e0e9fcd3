//! Shared value types, pixel math and the crate error taxonomy.

pub mod core;
pub mod error;
pub(crate) mod math;
