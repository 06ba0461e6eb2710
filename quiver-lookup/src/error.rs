use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("The request did not complete within {0:?}.")]
    /// The request did not complete within the request timeout.
    Timeout(Duration),

    #[error("Invalid request URI: {0}")]
    /// The endpoint address could not be turned into a valid URI.
    InvalidUri(#[from] hyper::http::uri::InvalidUri),

    #[error("HTTP Error: {0}")]
    /// A transport level error occurred while talking to the endpoint.
    Http(#[from] hyper::Error),

    #[error("Failed to build request: {0}")]
    /// The request could not be assembled, usually due to an invalid header.
    Request(#[from] hyper::http::Error),

    #[error("Unexpected response status: {0}")]
    /// The endpoint responded with a non-success status.
    Status(StatusCode),

    #[error("Failed to decode response body: {0}")]
    /// The response body was not valid JSON or did not match the expected shape.
    Decode(#[from] serde_json::Error),
}
