//! HTTP client for the e24cloud v2 API.

mod client;
mod error;
mod transport;
mod types;

pub use client::E24Client;
pub use error::ApiError;
pub use transport::ApiTransport;
pub use types::{RegionInfo, Template};
