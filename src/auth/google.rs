use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::config::GoogleConfig;

/// Identity asserted by an external provider after verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> anyhow::Result<ExternalIdentity>;
}

/// Verifies Google ID tokens against the public tokeninfo endpoint.
pub struct GoogleVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    email_verified: bool,
}

// tokeninfo encodes booleans as strings
fn bool_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

impl GoogleVerifier {
    pub fn new(cfg: &GoogleConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build identity http client")?;
        Ok(Self {
            client,
            tokeninfo_url: cfg.tokeninfo_url.clone(),
            client_id: cfg.client_id.clone(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> anyhow::Result<ExternalIdentity> {
        let client_id = self
            .client_id
            .as_deref()
            .context("GOOGLE_CLIENT_ID is not configured")?;

        let info: TokenInfo = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .context("tokeninfo request")?
            .error_for_status()
            .context("tokeninfo rejected token")?
            .json()
            .await
            .context("tokeninfo response")?;

        anyhow::ensure!(info.aud == client_id, "token audience mismatch");
        let email = info.email.context("token carries no email")?;
        debug!(subject = %info.sub, "identity token verified");

        Ok(ExternalIdentity {
            subject: info.sub,
            email: email.trim().to_lowercase(),
            email_verified: info.email_verified,
        })
    }
}
