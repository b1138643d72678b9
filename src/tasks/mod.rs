//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: Removes expired local store entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
