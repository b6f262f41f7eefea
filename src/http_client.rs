use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::FetchError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Maps non-2xx responses onto the typed error, 429 kept distinct.
    pub fn into_checked(self, provider: &'static str) -> Result<Self, FetchError> {
        if self.is_success() {
            return Ok(self);
        }
        if self.status == 429 {
            return Err(FetchError::RateLimited {
                provider,
                status_text: self.status_text,
            });
        }
        Err(FetchError::Status {
            provider,
            status: self.status,
            body: self.text(),
        })
    }

    pub fn json(&self, provider: &'static str) -> Result<Value, FetchError> {
        let text = self.text();
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|err| FetchError::Decode {
            provider,
            message: err.to_string(),
        })
    }
}

/// Outbound HTTP seam. Production uses reqwest; tests route urls to fixtures.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse, String>;

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<RawResponse, String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestTransport;

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse, String> {
        let client = http_client().map_err(|err| err.to_string())?;
        let mut req = client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().map_err(|err| err.to_string())?;
        read_response(resp)
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<RawResponse, String> {
        let client = http_client().map_err(|err| err.to_string())?;
        let mut req = client.post(url).json(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().map_err(|err| err.to_string())?;
        read_response(resp)
    }
}

fn read_response(resp: reqwest::blocking::Response) -> Result<RawResponse, String> {
    let status = resp.status();
    let status_text = status.canonical_reason().unwrap_or("").to_string();
    let body = resp.bytes().map_err(|err| err.to_string())?.to_vec();
    Ok(RawResponse {
        status: status.as_u16(),
        status_text,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::RawResponse;

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let resp = RawResponse {
            status: 429,
            status_text: "Too Many Requests".to_string(),
            body: Vec::new(),
        };
        let err = resp.into_checked("tank01").unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn empty_body_decodes_to_null() {
        let resp = RawResponse::ok("  ");
        assert!(resp.json("nws").unwrap().is_null());
    }
}
