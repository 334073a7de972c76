//! HTTP transport with retry for transient failures

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};
