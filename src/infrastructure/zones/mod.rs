//! Zone directory adapters

pub mod http;

pub use http::HttpZoneDirectory;
