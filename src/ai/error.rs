use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {details}")]
    AuthenticationFailed { provider: String, details: String },

    #[error("Rate limited by {provider}: {details}")]
    RateLimited { provider: String, details: String },

    #[error("Invalid request to {provider}: {details}")]
    InvalidRequest { provider: String, details: String },

    #[error("{provider} server error (Status: {status_code}): {details}")]
    ServerError {
        provider: String,
        status_code: u16,
        details: String,
    },

    #[error("Request timed out for {provider}")]
    Timeout { provider: String },

    #[error("Failed to parse response from {provider}: {details}")]
    ResponseParsingError { provider: String, details: String },

    #[error("API returned no candidates for {provider}")]
    NoChoices { provider: String },

    #[error("Unknown API error from {provider}: {details}")]
    Unknown { provider: String, details: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Map a non-success HTTP status to the matching error.
    pub fn from_status(provider: &str, status: u16, details: String) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => ApiError::AuthenticationFailed { provider, details },
            408 => ApiError::Timeout { provider },
            429 => ApiError::RateLimited { provider, details },
            400 | 404 => ApiError::InvalidRequest { provider, details }, // 404 usually means an unknown model
            500..=599 => ApiError::ServerError {
                provider,
                status_code: status,
                details,
            },
            _ => ApiError::Unknown { provider, details },
        }
    }
}
