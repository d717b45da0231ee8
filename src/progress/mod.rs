//! Read-progress resolution and its worker pool

pub mod pool;
pub mod resolver;

pub use pool::{ProgressCompletion, ReadProgressPool};
pub use resolver::{ReadProgress, ReadProgressResolver};
