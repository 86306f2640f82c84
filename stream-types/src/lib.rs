//! # stream-types
//!
//! Event and flag types for the flagstream synchronization engine.
//!
//! This crate provides the foundational types used across all flagstream crates:
//! - [`EventKind`], [`RawEvent`], [`StreamEvent`] - What the event stream delivers
//! - [`FlagDefinition`], [`FlagSet`], [`FlagPatch`], [`DeleteInstruction`] - What gets stored
//! - [`StreamError`] - The single reportable error value

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod flag;

pub use error::{ErrorKind, StreamError, UNEXPECTED_PAYLOAD};
pub use event::{EventKind, RawEvent, StreamEvent};
pub use flag::{key_from_path, DeleteInstruction, FlagDefinition, FlagPatch, FlagSet};
