//! Performance utilities: time sources and CPU placement

pub mod clock;
pub mod cpu;

pub use clock::{monotonic_ns, rdtsc, realtime_ns, TscCalibrator};
pub use cpu::{num_cores, optimize_worker, pin_to_core, set_realtime_priority};
