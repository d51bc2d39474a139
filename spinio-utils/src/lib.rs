//! Helper library to provide utilities to be used with the
//! spinio runtime
//!
//! Currently provides channel-backed completion handles as a
//! non-blocking alternative to the mutex/condvar adapters in
//! `spinio::sync`

pub mod handle;

pub use handle::{HandleError, TaskHandle, submit_with_handle};
