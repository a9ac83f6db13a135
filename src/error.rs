// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use thiserror::Error;

/// Failures talking to an upstream HTTP API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing API key: set {0} in the environment or config file")]
    MissingCredential(&'static str),

    #[error("Rate limited by upstream (429)")]
    RateLimited,

    #[error("Upstream request failed with status {status}")]
    Upstream { status: u16 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Parse(String),

    #[error("Response is missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ApiError::RateLimited
        } else {
            ApiError::Upstream {
                status: status.as_u16(),
            }
        }
    }
}

/// Failures from a key-value store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage quota exceeded ({used} of {quota} bytes)")]
    QuotaExceeded { used: usize, quota: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_maps_to_rate_limited() {
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY),
            ApiError::Upstream { status: 502 }
        ));
    }
}
