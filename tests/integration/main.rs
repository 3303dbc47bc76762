//! Integration tests for the venue client.
//!
//! Both suites run against in-process servers bound to an ephemeral port:
//! an axum app standing in for the REST API and a tokio-tungstenite server
//! standing in for the odds stream. No network access is needed.
//!
//! Run with: cargo test --test integration

mod stream;
mod venue;
