//! Shared data model and wire format for `taskbell`.

pub mod codec;
pub mod task;

pub use task::{ParseEnumError, Priority, Task, TaskId, TaskStatus};
