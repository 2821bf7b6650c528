pub mod client;

pub use client::{CloudflareClient, DnsRecordRequest, TOKEN_ENV, UpsertOutcome};

use crate::config::CloudflareConfig;
use crate::error::{FleetError, Result};

/// Token from the environment, falling back to the config file.
pub fn resolve_token(config: &CloudflareConfig) -> Result<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| config.api_token.clone())
        .ok_or_else(|| {
            FleetError::Config(format!(
                "no Cloudflare API token; set {TOKEN_ENV} or [cloudflare].api_token"
            ))
        })
}
