pub mod common;
pub mod completions;
pub mod enqueue;
pub mod list;
pub mod purge;
pub mod push;
pub mod status;
pub mod sync;
