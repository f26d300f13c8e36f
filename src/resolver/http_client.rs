//! Shared HTTP client construction for lookup and screenshot requests.
//!
//! Both the metadata lookup and screenshot fetches go through a client built
//! here so they agree on user-agent, timeout, compression and proxy handling.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use super::LookupError;

/// Upper bound on the TCP connect phase; the overall request timeout still applies.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client with the given identity and request timeout.
///
/// # Errors
///
/// Returns [`LookupError::ClientBuild`] when client construction fails.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, LookupError> {
    match try_build_client(user_agent, timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; retry with environment proxies only.
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            try_build_client(user_agent, timeout, true).map_err(BuildClientFailure::into_lookup_error)
        }
        Err(failure) => Err(failure.into_lookup_error()),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

impl BuildClientFailure {
    fn into_lookup_error(self) -> LookupError {
        let reason = match self {
            Self::Panic => "client construction panicked while reading proxy settings".to_string(),
            Self::Build(error) => error.to_string(),
        };
        LookupError::ClientBuild { reason }
    }
}

fn try_build_client(
    user_agent: &str,
    timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String, timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .timeout(timeout)
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = first_env_value(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = first_env_value(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn first_env_value(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
