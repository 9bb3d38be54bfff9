//! Stylesheet acquisition: local vendor files and remote stylesheets.
//!
//! Each source is read or fetched at most once per run; later requests for
//! the same source are served from memory. There are no retries: a failed
//! read or fetch is returned to the caller, which aborts the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, info, instrument, warn};
use vendorcss_shared::{Result, StylesheetSource, SourceKind, VendorCssError};

/// User-Agent string for stylesheet requests.
const USER_AGENT: &str = concat!("vendorcss/", env!("CARGO_PKG_VERSION"));

/// `Accept` header sent with every remote fetch.
const ACCEPT_CSS: &str = "text/css,*/*;q=0.8";

/// Maximum number of redirects followed for a remote stylesheet.
const MAX_REDIRECTS: usize = 5;

const BOM: char = '\u{feff}';

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for source acquisition.
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Directory local source paths are relative to.
    pub source_root: PathBuf,
    /// Per-request timeout for remote fetches. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// SourceAcquirer
// ---------------------------------------------------------------------------

/// Loads stylesheet text, memoized per source for the lifetime of a run.
pub struct SourceAcquirer {
    source_root: PathBuf,
    client: Client,
    cache: HashMap<StylesheetSource, Arc<str>>,
}

impl SourceAcquirer {
    /// Create an acquirer with its own HTTP client.
    pub fn new(opts: &AcquireOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(timeout) = opts.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| VendorCssError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            source_root: opts.source_root.clone(),
            client,
            cache: HashMap::new(),
        })
    }

    /// Text of `source` with any leading byte-order mark removed.
    #[instrument(skip_all, fields(source = %source))]
    pub async fn acquire(&mut self, source: &StylesheetSource) -> Result<Arc<str>> {
        if let Some(text) = self.cache.get(source) {
            debug!("source served from cache");
            return Ok(Arc::clone(text));
        }

        let text = match source.kind() {
            SourceKind::LocalFile => read_local(&self.source_root.join(source.locator())).await?,
            SourceKind::RemoteUrl => fetch_remote(&self.client, source.locator()).await?,
        };

        let text: Arc<str> = Arc::from(strip_bom(&text));
        info!(bytes = text.len(), "source acquired");
        self.cache.insert(source.clone(), Arc::clone(&text));
        Ok(text)
    }

    /// Number of distinct sources loaded so far.
    pub fn loaded(&self) -> usize {
        self.cache.len()
    }
}

/// Drop a leading U+FEFF.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

/// Read a local stylesheet, decoding invalid UTF-8 lossily.
async fn read_local(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| VendorCssError::io(path, e))?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(path = %path.display(), "stylesheet is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Fetch a remote stylesheet. Any transport failure or non-2xx status is fatal.
async fn fetch_remote(client: &Client, url: &str) -> Result<String> {
    debug!(%url, "fetching remote stylesheet");

    let response = client
        .get(url)
        .header(ACCEPT, ACCEPT_CSS)
        .send()
        .await
        .map_err(|e| VendorCssError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(VendorCssError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| VendorCssError::Network(format!("{url}: body read failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("vendorcss-sources-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn acquirer(root: &Path) -> SourceAcquirer {
        SourceAcquirer::new(&AcquireOptions {
            source_root: root.to_path_buf(),
            fetch_timeout: Some(Duration::from_secs(10)),
        })
        .unwrap()
    }

    #[test]
    fn strip_bom_only_removes_leading_mark() {
        assert_eq!(strip_bom("\u{feff}a{}"), "a{}");
        assert_eq!(strip_bom("a{}\u{feff}"), "a{}\u{feff}");
        assert_eq!(strip_bom(""), "");
    }

    #[tokio::test]
    async fn reads_local_source_and_strips_bom() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("vendor/css")).unwrap();
        std::fs::write(tmp.join("vendor/css/lib.css"), "\u{feff}.a{color:red}").unwrap();

        let mut acq = acquirer(&tmp);
        let text = acq
            .acquire(&StylesheetSource::local("vendor/css/lib.css"))
            .await
            .unwrap();
        assert_eq!(&*text, ".a{color:red}");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_local_source_is_io_error() {
        let tmp = temp_dir();
        let mut acq = acquirer(&tmp);
        let err = acq
            .acquire(&StylesheetSource::local("nope.css"))
            .await
            .unwrap_err();
        assert!(matches!(err, VendorCssError::Io { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn local_source_is_read_once() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("lib.css"), ".a{}").unwrap();

        let mut acq = acquirer(&tmp);
        let source = StylesheetSource::local("lib.css");
        let first = acq.acquire(&source).await.unwrap();

        // later changes on disk are not observed within the same run
        std::fs::write(tmp.join("lib.css"), ".b{}").unwrap();
        let second = acq.acquire(&source).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(acq.loaded(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn fetches_remote_with_identifying_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lib/css/all.css"))
            .and(headers("accept", vec!["text/css", "*/*;q=0.8"]))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("\u{feff}.fa{display:inline-block}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut acq = acquirer(&std::env::temp_dir());
        let source = StylesheetSource::remote(&format!("{}/lib/css/all.css", server.uri())).unwrap();

        let text = acq.acquire(&source).await.unwrap();
        assert_eq!(&*text, ".fa{display:inline-block}");

        // served from cache; the mock's expect(1) is verified on drop
        let again = acq.acquire(&source).await.unwrap();
        assert_eq!(text, again);
    }

    #[tokio::test]
    async fn non_success_status_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.css"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut acq = acquirer(&std::env::temp_dir());
        let source = StylesheetSource::remote(&format!("{}/missing.css", server.uri())).unwrap();
        let err = acq.acquire(&source).await.unwrap_err();

        assert!(matches!(err, VendorCssError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // bind then drop a server so the port is closed
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let mut acq = acquirer(&std::env::temp_dir());
        let source = StylesheetSource::remote(&format!("{uri}/a.css")).unwrap();
        let err = acq.acquire(&source).await.unwrap_err();
        assert!(matches!(err, VendorCssError::Network(_)));
    }
}
