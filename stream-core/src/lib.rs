//! # stream-core
//!
//! Pure logic for flagstream (no I/O, instant tests).
//!
//! This crate implements the event-protocol state machine that keeps a
//! local flag store in step with a server-pushed event stream, without
//! any network or store I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`dispatch`] turns a received event into exactly one [`Action`]
//! - [`decode`] parses payload text into typed records
//! - [`lifecycle`] decides what `start`/`stop` mean in the current state
//! - [`fence`] decides whether an out-of-band full fetch may still be applied
//! - [`sse`] splits a byte stream into named events
//!
//! The actual I/O (stream connection, secondary fetches, store writes) is
//! performed by `stream-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decode;
pub mod dispatch;
pub mod fence;
pub mod lifecycle;
pub mod sse;

pub use dispatch::{on_all_fetched, on_event, on_flag_fetched, Action, FLAG_REQUEST_FAILED};
pub use fence::{FenceDecision, Mutation, ReplaceFence};
pub use lifecycle::{Command, Effect, ProcessorState};
pub use sse::{SseEvent, SseParser};
