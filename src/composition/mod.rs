//! The animation rendering collaborator and a bundled flipbook implementation.

pub mod flipbook;
pub mod model;
