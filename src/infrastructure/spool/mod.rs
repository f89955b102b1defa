//! Artifact spool adapters

pub mod fs;
pub mod memory;

pub use fs::FsArtifactSpool;
pub use memory::MemorySpool;
