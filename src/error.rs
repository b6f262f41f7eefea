use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{provider} rate limit exceeded: {status_text}")]
    RateLimited {
        provider: &'static str,
        status_text: String,
    },
    #[error("{provider} http {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} returned invalid json: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} is not configured")]
    NotConfigured { provider: &'static str },
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    pub fn provider(&self) -> &'static str {
        match self {
            FetchError::RateLimited { provider, .. }
            | FetchError::Status { provider, .. }
            | FetchError::Transport { provider, .. }
            | FetchError::Decode { provider, .. }
            | FetchError::NotConfigured { provider } => provider,
        }
    }
}
