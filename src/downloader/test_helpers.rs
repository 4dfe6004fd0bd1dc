//! Shared helpers for downloader tests: a scripted gazette portal mounted
//! on a wiremock server, plus a ready-to-use test configuration.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::assembly::ConcatAssembler;
use crate::config::{Config, DiscoveryConfig, RetryConfig, SearchBounds};
use crate::probe::PageClient;
use crate::types::Event;

use super::edition::EditionContext;

/// One observed portal request: (method, edition, page)
pub(crate) type SeenRequest = (String, u32, u32);

#[derive(Default)]
struct PortalState {
    /// edition id -> page count
    page_counts: HashMap<u32, u32>,
    /// (edition, page) pairs served as 200 + HTML instead of PDF bytes
    corrupt: HashSet<(u32, u32)>,
    /// (edition, page) pairs served as persistent 500
    broken: HashSet<(u32, u32)>,
    requests: Mutex<Vec<SeenRequest>>,
}

/// Scripted stand-in for the remote portal.
///
/// Answers the fixed page-locator contract (HEAD and GET) from a page-count
/// table and records every request it sees, so tests can assert on network
/// activity per edition.
#[derive(Clone, Default)]
pub(crate) struct GazettePortal {
    state: Arc<PortalState>,
}

impl GazettePortal {
    pub(crate) fn new(page_counts: &[(u32, u32)]) -> Self {
        Self {
            state: Arc::new(PortalState {
                page_counts: page_counts.iter().copied().collect(),
                ..PortalState::default()
            }),
        }
    }

    /// Serve this page as 200 with an HTML error body
    pub(crate) fn with_corrupt_page(self, edition: u32, page: u32) -> Self {
        let mut state = PortalState {
            page_counts: self.state.page_counts.clone(),
            corrupt: self.state.corrupt.clone(),
            broken: self.state.broken.clone(),
            requests: Mutex::new(Vec::new()),
        };
        state.corrupt.insert((edition, page));
        Self {
            state: Arc::new(state),
        }
    }

    /// Serve this page as a persistent 500
    pub(crate) fn with_broken_page(self, edition: u32, page: u32) -> Self {
        let mut state = PortalState {
            page_counts: self.state.page_counts.clone(),
            corrupt: self.state.corrupt.clone(),
            broken: self.state.broken.clone(),
            requests: Mutex::new(Vec::new()),
        };
        state.broken.insert((edition, page));
        Self {
            state: Arc::new(state),
        }
    }

    /// All requests the portal has seen so far
    pub(crate) fn requests(&self) -> Vec<SeenRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Whether any request touched the given edition
    pub(crate) fn saw_edition(&self, edition: u32) -> bool {
        self.requests().iter().any(|(_, e, _)| *e == edition)
    }
}

impl Respond for GazettePortal {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let segments: Vec<&str> = request
            .url
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();
        // /apifront/portal/edicoes/pdf_diario/{edition}/{page}
        let parsed = match (segments.get(4), segments.get(5)) {
            (Some(e), Some(p)) => e.parse::<u32>().ok().zip(p.parse::<u32>().ok()),
            _ => None,
        };
        let Some((edition, page)) = parsed else {
            return ResponseTemplate::new(404);
        };

        let verb = request.method.to_string().to_ascii_uppercase();
        self.state
            .requests
            .lock()
            .unwrap()
            .push((verb.clone(), edition, page));

        if self.state.broken.contains(&(edition, page)) {
            return ResponseTemplate::new(500);
        }
        let exists = self
            .state
            .page_counts
            .get(&edition)
            .is_some_and(|&count| page >= 1 && page <= count);
        if !exists {
            return ResponseTemplate::new(404);
        }
        if verb == "HEAD" {
            return ResponseTemplate::new(200);
        }
        if self.state.corrupt.contains(&(edition, page)) {
            return ResponseTemplate::new(200).set_body_string("<html>internal error</html>");
        }
        ResponseTemplate::new(200).set_body_bytes(page_body(edition, page))
    }
}

/// Deterministic PDF-signed body for one page, comfortably above the
/// test configuration's minimum artifact size
pub(crate) fn page_body(edition: u32, page: u32) -> Vec<u8> {
    format!("%PDF-1.4\n% edition {edition} page {page}\n{}\n%%EOF\n", "0".repeat(48)).into_bytes()
}

/// Mount the portal responder for all page-locator paths
pub(crate) async fn mount_portal(server: &MockServer, portal: &GazettePortal) {
    Mock::given(path_regex(r"^/apifront/portal/edicoes/pdf_diario/\d+/\d+$"))
        .respond_with(portal.clone())
        .mount(server)
        .await;
}

/// Mount a landing page advertising `latest` as the newest regular edition,
/// plus a newer supplement that must not win
pub(crate) async fn mount_landing(server: &MockServer, latest: u32) {
    let html = format!(
        r#"<html><script>var ultimasEdicoes = {{"erro":false,"itens":[
            {{"id":{latest},"suplemento":0}},
            {{"id":{},"suplemento":1}}
        ]}};</script></html>"#,
        latest + 1
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

/// Everything a downloader test needs: a mock portal and a config rooted
/// in a temp directory. Editions in tests live around id 100.
pub(crate) struct TestEnv {
    pub(crate) server: MockServer,
    pub(crate) portal: GazettePortal,
    pub(crate) dir: tempfile::TempDir,
    pub(crate) config: Config,
}

pub(crate) async fn test_env(portal: GazettePortal) -> TestEnv {
    let server = MockServer::start().await;
    mount_portal(&server, &portal).await;
    let dir = tempfile::tempdir().unwrap();

    let config = Config {
        base_url: server.uri(),
        output_dir: dir.path().join("out"),
        temp_dir: dir.path().join("tmp"),
        ledger_path: dir.path().join("historico.json"),
        max_concurrent_pages: 8,
        request_timeout: Duration::from_secs(5),
        min_artifact_bytes: 32,
        retry: RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(2),
            jitter: false,
        },
        discovery: DiscoveryConfig {
            edition_bounds: SearchBounds::new(95, 110),
            page_bounds: SearchBounds::new(1, 64),
            editions_per_run: 10,
            floor_edition: 100,
            ..DiscoveryConfig::default()
        },
        ..Config::default()
    };
    config.validate().unwrap();

    TestEnv {
        server,
        portal,
        dir,
        config,
    }
}

/// Build an [`EditionContext`] wired to the real HTTP client (pointed at the
/// mock server) and the default assembler. The receiver keeps the broadcast
/// channel open for the duration of a test.
pub(crate) fn edition_ctx(
    config: &Config,
) -> (EditionContext, tokio::sync::broadcast::Receiver<Event>) {
    let (event_tx, event_rx) = tokio::sync::broadcast::channel(256);
    let ctx = EditionContext {
        config: Arc::new(config.clone()),
        service: Arc::new(PageClient::new(config).unwrap()),
        assembler: Arc::new(ConcatAssembler),
        event_tx,
        cancel_token: tokio_util::sync::CancellationToken::new(),
    };
    (ctx, event_rx)
}
