/// Background GPU readbacks

pub mod scheduler;

pub use scheduler::{ReadbackJob, ReadbackScheduler};
