use crate::error::{Result, UpdateError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// Base URL used when none is supplied at construction.
pub const DEFAULT_BASE_URL: &str = "https://www01-388cc.firebaseapp.com/hotUpdate/";

/// Request timeout applied to the default HTTP client so a check can never
/// hang indefinitely.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over fetching bytes from the update server.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full response body for the given URL.
    ///
    /// On any non-2xx status or transport-level failure the whole request
    /// fails; no retries are performed here. Retry policy belongs to the
    /// caller.
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Builder for [`HttpFetcher`].
#[derive(Default)]
pub struct HttpFetcherBuilder {
    base: Option<Url>,
    client: Option<Client>,
}

impl HttpFetcherBuilder {
    /// Set the base update URL (e.g. `https://updates.example.com/hotUpdate/`).
    pub fn base_url(mut self, url: Url) -> Self {
        self.base = Some(url);
        self
    }

    /// Provide a custom reqwest client instance.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the fetcher.
    pub fn build(self) -> Result<HttpFetcher> {
        let base = self
            .base
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("default update base URL"));
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .map_err(UpdateError::Network)?,
        };

        Ok(HttpFetcher { base, client })
    }
}

/// HTTP GET fetcher for manifests and script payloads.
#[derive(Clone)]
pub struct HttpFetcher {
    base: Url,
    client: Client,
}

impl HttpFetcher {
    /// Create a new builder.
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a relative path against the configured base URL.
    pub fn resolve(&self, relative: &str) -> Result<Url> {
        resolve_against(&self.base, relative)
    }
}

/// Join a relative path onto a base URL. Pure string/URL composition.
pub fn resolve_against(base: &Url, relative: &str) -> Result<Url> {
    let trimmed = relative.trim_start_matches('/');
    base.join(trimmed)
        .map_err(|err| UpdateError::InvalidUrl(format!("{base}{trimmed}: {err}")))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        tracing::debug!(%url, "fetching");
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_falls_back_to_default_base() {
        let fetcher = HttpFetcher::builder().build().unwrap();
        assert_eq!(fetcher.base_url().as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let base = Url::parse("https://updates.example.com/hotUpdate/").unwrap();
        let fetcher = HttpFetcher::builder().base_url(base).build().unwrap();

        let url = fetcher.resolve("main.js").unwrap();
        assert_eq!(
            url.as_str(),
            "https://updates.example.com/hotUpdate/main.js"
        );

        // A leading slash must not escape the base path.
        let url = fetcher.resolve("/img/logo.png").unwrap();
        assert_eq!(
            url.as_str(),
            "https://updates.example.com/hotUpdate/img/logo.png"
        );
    }
}
