//! Session backend adapters

pub mod http;
pub mod memory;

pub use http::HttpSessionBackend;
pub use memory::MemoryBackend;
