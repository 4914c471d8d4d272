use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use url::Url;

use scilit_common::error::NetworkError;
use scilit_config::BackendConfig;

/// HTTP client capped to the hosts the backend is served from.
/// Requests to any other host are refused before they leave the process.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl BackendClient {
    /// Client allowed to talk to the host of `config.base_url` only.
    pub fn new(config: &BackendConfig) -> Result<Self, NetworkError> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            NetworkError::Blocked(format!("invalid backend address {}: {e}", config.base_url))
        })?;
        let host = base.host_str().ok_or_else(|| {
            NetworkError::Blocked(format!("backend address {} has no host", config.base_url))
        })?;

        let client = ClientBuilder::new()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| NetworkError::Transport {
                endpoint: "client".to_string(),
                source,
            })?;

        let mut allowlist = HashSet::new();
        allowlist.insert(host.to_string());
        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_host(&mut self, host: &str) {
        self.allowlist.insert(host.to_string());
    }

    /// Exact host match or a subdomain of an allowed host.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}")))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, NetworkError> {
        if !self.is_allowed(url) {
            return Err(NetworkError::Blocked(format!(
                "host not in backend allowlist for URL {url}"
            )));
        }
        Ok(self.client.post(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> BackendConfig {
        BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        }
    }

    #[test]
    fn test_only_backend_host_is_allowed() {
        let client = BackendClient::new(&config("http://nlp.scilit.example:8060")).unwrap();
        assert!(client.is_allowed("http://nlp.scilit.example:8060/ml-api/doc-search/v1.0"));
        assert!(client.is_allowed("https://eu.nlp.scilit.example/ml-api/process/v1.0"));
        assert!(!client.is_allowed("http://evil.example/ml-api/process/v1.0"));
        assert!(!client.is_allowed("not a url"));
    }

    #[test]
    fn test_blocked_post_is_reported() {
        let client = BackendClient::new(&config("http://localhost:8060")).unwrap();
        let err = client.post("http://example.org/").unwrap_err();
        assert!(matches!(err, NetworkError::Blocked(_)));
    }

    #[test]
    fn test_allow_host_extends_list() {
        let mut client = BackendClient::new(&config("http://localhost:8060")).unwrap();
        assert!(!client.is_allowed("http://127.0.0.1:8060/"));
        client.allow_host("127.0.0.1");
        assert!(client.is_allowed("http://127.0.0.1:8060/"));
    }

    #[test]
    fn test_rejects_unparseable_base() {
        assert!(BackendClient::new(&config("::nope::")).is_err());
    }
}
