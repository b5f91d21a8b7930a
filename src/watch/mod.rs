// src/watch/mod.rs

//! Watch subscriptions over the filesystem.
//!
//! This module is responsible for:
//! - The [`WatchBackend`] capability seam hiding platform watch APIs, with a
//!   `notify`-based production adapter.
//! - [`WatcherManager`], which reconciles the set of active OS watches
//!   against the targets derived from the last committed compile pass and
//!   owns every watch-handle lifetime.
//!
//! It does **not** decide *when* to compile; watch callbacks only ever
//! schedule work by sending change notifications into the session loop.

pub mod backend;
pub mod manager;

pub use backend::{ChangeCallback, NotifyBackend, WatchBackend, WatchHandle};
pub use manager::WatcherManager;
