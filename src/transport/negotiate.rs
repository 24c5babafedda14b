use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};

use crate::client::config::Config;
use crate::client::consts::SDP_CONTENT_TYPE;
use crate::error::TransportError;
use crate::transport::SessionDescription;

/// Single offer/answer exchange with the remote voice endpoint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn negotiate(&self, offer: &SessionDescription, credential: &SecretString) -> Result<SessionDescription, TransportError>;
}

/// Posts the SDP offer over HTTP and reads the answer from the body.
pub struct HttpNegotiator {
    client: reqwest::Client,
    url: String,
}

impl HttpNegotiator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.realtime_url())
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Negotiator for HttpNegotiator {
    async fn negotiate(&self, offer: &SessionDescription, credential: &SecretString) -> Result<SessionDescription, TransportError> {
        tracing::debug!("posting offer to {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(credential.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer.sdp.clone())
            .send()
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("negotiation rejected: {} {}", status, body);
            return Err(TransportError::Negotiation(format!("remote endpoint answered {}", status)));
        }

        let sdp = response
            .text()
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;
        if sdp.trim().is_empty() {
            return Err(TransportError::Negotiation("empty answer".to_string()));
        }
        Ok(SessionDescription::answer(sdp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_config() {
        let config = Config::builder().with_base_url("http://localhost:9000/v1").with_model("m").build();
        assert_eq!(HttpNegotiator::from_config(&config).url(), "http://localhost:9000/v1/realtime?model=m");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_negotiation_error() {
        let negotiator = HttpNegotiator::new("http://127.0.0.1:9/realtime");
        let credential = SecretString::from("ek_test".to_string());
        let err = negotiator
            .negotiate(&SessionDescription::offer("v=0"), &credential)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Negotiation(_)));
    }
}
