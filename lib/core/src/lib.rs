//! Core types shared by every sqlscout crate.
//!
//! This crate provides the run/session/message identifiers and the
//! `Result` alias used at the layer boundaries.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{MessageId, ParseIdError, RunId, SessionId};
