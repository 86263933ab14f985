//! Lock-free transport between pipeline workers

pub mod spsc;

pub use spsc::{channel, Consumer, Producer, MIN_CAPACITY};
