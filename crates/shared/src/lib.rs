//! Entity model and action protocol for the retrospective target board.

pub mod domain;
pub mod error;
pub mod protocol;
