//! Client-side queue mirror: HTTP client and sync glue for the playback
//! controller.

pub mod http;
pub mod sync;

pub use http::{ClientError, QueueClient, QueueSnapshot};
pub use sync::{COMPLETION_POLL_INTERVAL, CompletionWatcher, QueueSync, pump_events};
