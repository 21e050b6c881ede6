//! Realtime list synchronization
//!
//! - [`events`]: decoding raw change payloads into [`ChangeEvent`]s
//! - [`mirror`]: the ordered in-memory item sequence and its update rules
//! - [`synchronizer`]: the worker that drives a mirror from a backend

pub mod events;
pub mod mirror;
pub mod synchronizer;

pub use events::{ChangeEvent, PayloadError};
pub use mirror::ItemMirror;
pub use synchronizer::{ListSnapshot, ListSynchronizer};
