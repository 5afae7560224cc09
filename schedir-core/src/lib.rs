//! Core of the schedir ecosystem.
//!
//! This crate keeps a local, user-annotated copy of academic timetables in
//! sync with their authoritative source:
//! - `model` and `recurrence` describe schedules and their multi-week cycles
//! - `projection` turns event templates into per-date occurrences
//! - `reconcile` merges fresh fetches without losing user annotations
//! - `store`, `remote` and `sync` persist, fetch and orchestrate
//! - `schedir` and `view` are what a front end talks to

pub mod annotation;
pub mod config;
pub mod error;
pub mod model;
pub mod projection;
pub mod reconcile;
pub mod recurrence;
pub mod remote;
pub mod schedir;
pub mod store;
pub mod sync;
pub mod view;

pub use error::{FetchError, SchedirError, SchedirResult};
pub use schedir::Schedir;
