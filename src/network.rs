use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{PlotSeries, SignatureReport};

/// HTTP access to the signature backend. No request timeout is set; the
/// dashboard's watchdog bounds staleness instead.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    signatures_url: Url,
    plot_url: Url,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            signatures_url: config.signatures_url.clone(),
            plot_url: config.plot_url.clone(),
        })
    }

    pub async fn fetch_signatures(&self) -> Result<SignatureReport> {
        self.get_json(&self.signatures_url).await
    }

    pub async fn fetch_plot(&self) -> Result<PlotSeries> {
        self.get_json(&self.plot_url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_payload(status.as_u16(), status.is_success(), &body)
    }
}

/// Turns a raw response into a payload or one of the two error classes.
///
/// Non-success statuses become `Http` (keeping the body's `error` text when
/// there is one); a success body with a non-null `error` field becomes `Api`.
pub fn decode_payload<T: DeserializeOwned>(status: u16, success: bool, body: &str) -> Result<T> {
    if !success {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .as_ref()
            .and_then(error_field);
        return Err(AppError::Http { status, message });
    }

    let value: Value = serde_json::from_str(body)?;
    if let Some(message) = error_field(&value) {
        return Err(AppError::api(message));
    }
    Ok(serde_json::from_value(value)?)
}

fn error_field(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
