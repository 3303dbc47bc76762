//! Client module for the venue's REST API.
//!
//! This module handles:
//! - Authentication, advice, status, confirmation and settlement calls
//! - The transport trait the bet lifecycle is written against
//! - A scripted in-memory venue for tests

pub mod http;
pub mod mock;
pub mod traits;
pub mod types;

pub use http::StsClient;
pub use mock::{MockStsClient, RecordedConfirmation};
pub use traits::BettingApi;
pub use types::{AuthRequest, AuthResponse, ErrorResponse};
