//! Short-lived credentials for the remote voice endpoint.
//!
//! A client normally fetches one from the token-issuing backend. The backend
//! itself (or a trusted native client) mints one with the long-lived API key.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};
use script_rehearsal_types::session::{EphemeralSession, EphemeralSessionRequest};

use crate::client::config::Config;
use crate::error::TransportError;
use crate::instructions;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> Result<SecretString, TransportError>;
}

/// Reads `client_secret.value` from a session document.
pub fn secret_from(session: &EphemeralSession) -> Result<SecretString, TransportError> {
    let value = session.client_secret().value();
    if value.trim().is_empty() {
        return Err(TransportError::Credential("empty client secret".to_string()));
    }
    if let Some(expires_at) = session.client_secret().expires_at() {
        tracing::debug!("credential expires at {}", expires_at);
    }
    Ok(SecretString::from(value.to_string()))
}

/// Fetches a session document from the token-issuing backend with a GET.
pub struct HttpCredentialProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpCredentialProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn fetch(&self) -> Result<SecretString, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TransportError::Credential(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Credential(format!("token backend answered {}", status)));
        }
        let session = response
            .json::<EphemeralSession>()
            .await
            .map_err(|e| TransportError::Credential(e.to_string()))?;
        tracing::info!("fetched credential for session {}", session.id().unwrap_or("unknown"));
        secret_from(&session)
    }
}

/// Mints a credential scoped to the rehearsal instructions for the configured script.
pub async fn mint(client: &reqwest::Client, config: &Config) -> Result<EphemeralSession, TransportError> {
    let api_key = config
        .require_api_key()
        .map_err(|e| TransportError::Credential(e.to_string()))?;
    let request = EphemeralSessionRequest::new(config.model())
        .with_voice(config.voice().clone())
        .with_instructions(&instructions::system_prompt(config.script_title(), config.characters()));

    let response = client
        .post(config.sessions_url())
        .bearer_auth(api_key.expose_secret())
        .json(&request)
        .send()
        .await
        .map_err(|e| TransportError::Credential(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("credential minting rejected: {} {}", status, body);
        return Err(TransportError::Credential(format!("session endpoint answered {}", status)));
    }
    response
        .json::<EphemeralSession>()
        .await
        .map_err(|e| TransportError::Credential(e.to_string()))
}

/// Mints directly instead of asking a backend. Needs `OPENAI_API_KEY`.
pub struct MintingProvider {
    client: reqwest::Client,
    config: Config,
}

impl MintingProvider {
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CredentialProvider for MintingProvider {
    async fn fetch(&self) -> Result<SecretString, TransportError> {
        let session = mint(&self.client, &self.config).await?;
        secret_from(&session)
    }
}
