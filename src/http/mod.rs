//! HTTP client module
//!
//! Provides the HTTP client used to download source archives.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Backoff Strategies**: Constant, linear, and exponential backoff

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
