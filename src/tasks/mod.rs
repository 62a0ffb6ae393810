pub mod guardian_sweep;

pub use guardian_sweep::{GuardianSweeper, SweepReport};
