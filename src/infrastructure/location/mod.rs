//! Location stream adapters

pub mod gpsd;
pub mod replay;

pub use gpsd::GpsdLocationStream;
pub use replay::{ReplayError, ReplayLocationStream};
