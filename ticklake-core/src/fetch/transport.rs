use crate::error::DataError;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;

/// One GET against the provider. Implementations classify failures:
/// server-busy statuses become [`DataError::ServerBusy`], anything else is
/// returned as-is and is not retried.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Bytes, DataError>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ticklake/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn is_busy(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Bytes, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if is_busy(status) {
            return Err(DataError::ServerBusy(format!("HTTP {status} for {url}")));
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.bytes()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading body of {url}: {e}")))
    }
}
