//! Application Services
//!
//! - `LocalWatcherAdapter`: local backend with fillability simulation and
//!   shadow-order expiry

pub mod local_watcher;

pub use local_watcher::{LocalBook, LocalWatcherAdapter, NOT_FILLABLE_CODE, WATCHER_REJECTED_CODE};
