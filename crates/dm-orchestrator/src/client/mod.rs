//! Remote Job API clients

mod http;

pub use http::HttpJobClient;
