//! Existence probing and page fetching against the remote service
//!
//! The service exposes no listing API. The only contract is the per-page
//! resource locator: a GET returns the page's PDF bytes or 404, and a HEAD
//! on the same locator returns the same status codes without a body. All
//! requests go through the retry layer in [`crate::retry`].
//!
//! [`PageService`] is the seam the boundary search and the fetch pool work
//! against, so tests can substitute a scripted fake for the real client.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::{RequestOutcome, request_with_retry};
use crate::types::{EditionId, ExistenceOutcome, PageIndex};
use async_trait::async_trait;
use url::Url;

/// First bytes of every well-formed page payload.
///
/// The server sometimes answers 200 with an HTML error page; the signature
/// check is the only defense against persisting those.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Probe-and-fetch interface for one (edition, page) pair
#[async_trait]
pub trait PageService: Send + Sync {
    /// Lightweight existence check (HEAD, metadata only).
    ///
    /// Returns [`ExistenceOutcome::Present`] only on an explicit 200 from
    /// the service. Redirects are not followed and never count as presence.
    async fn probe(&self, edition: EditionId, page: PageIndex) -> ExistenceOutcome;

    /// Full content fetch (GET), classified through the retry layer
    async fn fetch(&self, edition: EditionId, page: PageIndex) -> RequestOutcome<Vec<u8>>;
}

/// HTTP client for the fixed page-locator contract
#[derive(Clone, Debug)]
pub struct PageClient {
    client: reqwest::Client,
    pdf_root: String,
    retry: RetryConfig,
}

impl PageClient {
    /// Build a client from the configuration.
    ///
    /// Validates the base URL and configures the per-request timeout, the
    /// User-Agent header, and a no-follow redirect policy.
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid base URL: {e}"), "base_url"))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("unsupported URL scheme: {}", base.scheme()),
                "base_url",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let trimmed = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            pdf_root: format!("{trimmed}/apifront/portal/edicoes/pdf_diario"),
            retry: config.retry.clone(),
        })
    }

    /// Canonical resource locator for one (edition, page) pair
    pub fn page_url(&self, edition: EditionId, page: PageIndex) -> String {
        format!("{}/{}/{}", self.pdf_root, edition, page)
    }

    /// The underlying HTTP client, shared with landing-page discovery
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Map a response status onto the tri-state contract.
///
/// 200 is the only success signal; 404 is definitive absence; everything
/// else (including redirects and partial responses) is an error for the
/// retry layer to classify.
fn classify_status(status: reqwest::StatusCode) -> Result<Option<()>> {
    match status {
        reqwest::StatusCode::OK => Ok(Some(())),
        reqwest::StatusCode::NOT_FOUND => Ok(None),
        other => Err(Error::UnexpectedStatus(other.as_u16())),
    }
}

#[async_trait]
impl PageService for PageClient {
    async fn probe(&self, edition: EditionId, page: PageIndex) -> ExistenceOutcome {
        let url = self.page_url(edition, page);
        let outcome = request_with_retry(&self.retry, || {
            let client = self.client.clone();
            let url = url.clone();
            async move {
                let resp = client.head(&url).send().await?;
                classify_status(resp.status())
            }
        })
        .await;
        outcome.to_existence()
    }

    async fn fetch(&self, edition: EditionId, page: PageIndex) -> RequestOutcome<Vec<u8>> {
        let url = self.page_url(edition, page);
        request_with_retry(&self.retry, || {
            let client = self.client.clone();
            let url = url.clone();
            async move {
                let resp = client.get(&url).send().await?;
                match classify_status(resp.status())? {
                    Some(()) => Ok(Some(resp.bytes().await?.to_vec())),
                    None => Ok(None),
                }
            }
        })
        .await
    }
}
