use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::util::is_local_endpoint_url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const API_URL_ENV: &str = "SMARTSQL_API_URL";
const ACCESS_TOKEN_ENV: &str = "SMARTSQL_ACCESS_TOKEN";
const USER_EMAIL_ENV: &str = "SMARTSQL_USER_EMAIL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub user_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = non_blank_env(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_url,
            access_token: non_blank_env(ACCESS_TOKEN_ENV),
            user_email: non_blank_env(USER_EMAIL_ENV),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        Url::parse(&self.api_url)
            .with_context(|| format!("Invalid {API_URL_ENV} '{}'", self.api_url))?;

        if !self.is_local_endpoint() && self.api_url.starts_with("http://") {
            tracing::warn!(
                api_url = %self.api_url,
                "bearer token will be sent over plain http to a non-local endpoint"
            );
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
