//! Rendering through a remote document-processing service.
//!
//! The exchange is a short OAuth-style sequence over HTTPS:
//!
//! 1. `POST {endpoint}/token` with `client_id` / `client_secret` as a form,
//!    answered by `{"access_token": "..."}`.
//! 2. `POST {endpoint}/jobs?renditions=figures` with the PDF as the body and
//!    a bearer token, answered by `{"id": "..."}`.
//! 3. `GET {endpoint}/jobs/{id}` until `status` is `done` or `failed`.
//! 4. `GET` the job's `bundle_url`, a gzip-compressed tar archive of figure
//!    renditions, which is unpacked flat into the workspace.
//!
//! The whole exchange is bounded by `remote_timeout_secs`.
//!
//! The service only returns figure renditions of the whole document, so
//! this strategy reports itself unavailable for [`RenderTarget::Pages`] and
//! for runs that select a subset of pages. Labels from a page range zipped
//! with figures from every page would pair the wrong images.

use super::{Probe, RenderBackend, RenderOutcome, RenderRequest};
use crate::config::{BackendKind, RemoteConfig, RenderTarget, RendererConfig};
use crate::error::ExtractError;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Ceiling on the bytes one bundle may unpack to (1 GiB).
pub const MAX_BUNDLE_BYTES: u64 = 1 << 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct JobCreated {
    id: String,
}

/// Lifecycle of a remote render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[serde(alias = "queued", alias = "pending", alias = "in_progress")]
    Running,
    #[serde(alias = "succeeded", alias = "completed")]
    Done,
    Failed,
}

/// Body of `GET {endpoint}/jobs/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    #[serde(default)]
    pub bundle_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Render strategy backed by an HTTP rendering service.
pub struct RemoteBackend {
    config: RemoteConfig,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteBackend {
    pub fn probe(
        config: &RendererConfig,
        target: RenderTarget,
        whole_document: bool,
    ) -> Probe<Arc<dyn RenderBackend>> {
        let Some(remote) = &config.remote else {
            return Probe::Unavailable("no remote endpoint configured".into());
        };
        if !remote.has_credentials() {
            return Probe::Unavailable("remote client id or secret is missing".into());
        }
        if target == RenderTarget::Pages {
            return Probe::Unavailable(
                "remote service renders embedded figures only (use --target images)".into(),
            );
        }
        if !whole_document {
            return Probe::Unavailable(
                "remote service renders the whole document; a page selection cannot be honoured"
                    .into(),
            );
        }

        let timeout = Duration::from_secs(config.remote_timeout_secs);
        match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => Probe::Ready(Arc::new(RemoteBackend {
                config: remote.clone(),
                timeout,
                client,
            })),
            Err(e) => Probe::Unavailable(format!("cannot build HTTP client: {e}")),
        }
    }

    async fn exchange(&self, request: &RenderRequest<'_>) -> Result<RenderOutcome, ExtractError> {
        let token = self.authenticate().await?;

        let body = tokio::fs::read(request.source)
            .await
            .map_err(|e| failed(format!("cannot read '{}': {}", request.source.display(), e)))?;
        let job_id = self.submit(&token, body).await?;
        info!("Remote job {} submitted", job_id);

        let bundle_url = self.wait_for_bundle(&token, &job_id).await?;
        let bundle = self.download(&token, &bundle_url).await?;
        debug!("Downloaded bundle: {} bytes", bundle.len());

        let workspace = request.workspace.to_path_buf();
        let files_written = tokio::task::spawn_blocking(move || unpack_bundle(&bundle, &workspace))
            .await
            .map_err(|e| ExtractError::Internal(format!("Unpack task panicked: {}", e)))?
            .map_err(|e| failed(format!("cannot unpack bundle: {}", e)))?;

        Ok(RenderOutcome { files_written })
    }

    async fn authenticate(&self) -> Result<String, ExtractError> {
        let response = self
            .client
            .post(format!("{}/token", self.config.endpoint))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;
        let token: TokenResponse = check(response).await?.json().await.map_err(transport)?;
        Ok(token.access_token)
    }

    async fn submit(&self, token: &str, pdf: Vec<u8>) -> Result<String, ExtractError> {
        let response = self
            .client
            .post(format!("{}/jobs", self.config.endpoint))
            .query(&[("renditions", "figures")])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf)
            .send()
            .await
            .map_err(transport)?;
        let job: JobCreated = check(response).await?.json().await.map_err(transport)?;
        Ok(job.id)
    }

    async fn wait_for_bundle(&self, token: &str, job_id: &str) -> Result<String, ExtractError> {
        let url = format!("{}/jobs/{}", self.config.endpoint, job_id);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(transport)?;
            let status: JobStatus = check(response).await?.json().await.map_err(transport)?;

            match status.status {
                JobState::Running => {
                    debug!("Remote job {} still running", job_id);
                    tokio::time::sleep(interval).await;
                }
                JobState::Done => {
                    let bundle = status
                        .bundle_url
                        .ok_or_else(|| failed("job finished without a bundle_url"))?;
                    return Ok(resolve_url(&self.config.endpoint, &bundle));
                }
                JobState::Failed => {
                    return Err(failed(format!(
                        "job {} failed: {}",
                        job_id,
                        status.error.as_deref().unwrap_or("no reason given")
                    )));
                }
            }
        }
    }

    async fn download(&self, token: &str, url: &str) -> Result<Vec<u8>, ExtractError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let bytes = check(response).await?.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RenderBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutcome, ExtractError> {
        if !request.covers_whole_document() {
            return Err(ExtractError::InvalidConfig(format!(
                "remote service renders the whole document; pages {}-{} of {} cannot be selected",
                request.first_page, request.last_page, request.page_count
            )));
        }

        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::RenderTimeout {
                backend: BackendKind::Remote.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// Map non-success responses to errors. Rejected credentials are called out.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ExtractError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(failed(format!(
            "authentication rejected (HTTP {})",
            status.as_u16()
        )));
    }

    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(failed(format!("HTTP {}: {}", status.as_u16(), snippet.trim())))
}

fn transport(e: reqwest::Error) -> ExtractError {
    failed(format!("request failed: {}", e))
}

fn failed(detail: impl Into<String>) -> ExtractError {
    ExtractError::RenderFailed {
        backend: BackendKind::Remote.to_string(),
        detail: detail.into(),
    }
}

/// Absolute bundle URLs are used as-is; relative ones hang off the endpoint.
fn resolve_url(endpoint: &str, bundle: &str) -> String {
    if bundle.starts_with("http://") || bundle.starts_with("https://") {
        bundle.to_string()
    } else {
        format!("{}/{}", endpoint, bundle.trim_start_matches('/'))
    }
}

/// Unpack a `.tar.gz` bundle flat into `dest`, returning the file count.
///
/// Nested paths are flattened by joining their components with `-`
/// (`figures/fig-1.png` → `figures-fig-1.png`) so natural ordering still
/// follows the service's numbering. Entries that try to escape `dest`,
/// hidden files and non-regular entries are skipped.
///
/// # Errors
/// A corrupt archive, two entries that flatten to the same name, or a
/// bundle expanding past [`MAX_BUNDLE_BYTES`].
pub fn unpack_bundle(bundle: &[u8], dest: &Path) -> io::Result<usize> {
    unpack_bundle_limited(bundle, dest, MAX_BUNDLE_BYTES)
}

fn unpack_bundle_limited(bundle: &[u8], dest: &Path, limit: u64) -> io::Result<usize> {
    let mut archive = tar::Archive::new(GzDecoder::new(bundle));
    let mut unpacked: HashMap<String, PathBuf> = HashMap::new();
    let mut remaining = limit;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.into_owned();
        let Some(flat) = flatten_entry_name(&path) else {
            debug!("Skipping bundle entry {}", path.display());
            continue;
        };
        if let Some(first) = unpacked.get(&flat) {
            return Err(invalid_bundle(format!(
                "entries '{}' and '{}' both unpack to '{}'",
                first.display(),
                path.display(),
                flat
            )));
        }

        // The header size is untrusted; check it before touching the data.
        if entry.size() > remaining {
            return Err(invalid_bundle(format!(
                "bundle expands past {} bytes at '{}'",
                limit,
                path.display()
            )));
        }

        let mut file = std::fs::File::create(dest.join(&flat))?;
        let copied = io::copy(&mut entry.by_ref().take(remaining), &mut file)?;
        remaining -= copied;
        unpacked.insert(flat, path);
    }

    Ok(unpacked.len())
}

fn invalid_bundle(detail: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, detail)
}

fn flatten_entry_name(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    let file = parts.last()?;
    if file.starts_with('.') {
        return None;
    }
    Some(parts.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn bundle(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn remote_config() -> RendererConfig {
        RendererConfig {
            backend_order: vec![BackendKind::Remote],
            remote: Some(RemoteConfig::new("https://render.example.com/", "id", "secret")),
            ..RendererConfig::default()
        }
    }

    fn backend_for(endpoint: &str, timeout_secs: u64) -> Arc<dyn RenderBackend> {
        let config = RendererConfig {
            remote: Some(RemoteConfig::new(endpoint, "id", "secret").poll_interval_ms(20)),
            remote_timeout_secs: timeout_secs,
            ..RendererConfig::default()
        };
        match RemoteBackend::probe(&config, RenderTarget::EmbeddedImages, true) {
            Probe::Ready(b) => b,
            Probe::Unavailable(reason) => panic!("unavailable: {reason}"),
        }
    }

    fn request<'a>(source: &'a Path, workspace: &'a Path) -> RenderRequest<'a> {
        RenderRequest {
            source,
            workspace,
            first_page: 1,
            last_page: 2,
            page_count: 2,
            target: RenderTarget::EmbeddedImages,
            dpi: 150,
            max_rendered_pixels: 2000,
        }
    }

    fn source_pdf(dir: &Path) -> PathBuf {
        let source = dir.join("catalog.pdf");
        std::fs::write(&source, b"%PDF-1.7").unwrap();
        source
    }

    // ── Canned HTTP service ──────────────────────────────────────────────

    struct Reply {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    }

    impl Reply {
        fn json(body: &str) -> Self {
            Reply {
                status: 200,
                content_type: "application/json",
                body: body.as_bytes().to_vec(),
            }
        }

        fn status(status: u16) -> Self {
            Reply {
                status,
                content_type: "text/plain",
                body: Vec::new(),
            }
        }
    }

    /// `(method, request target, raw request head)` → reply.
    type Handler = Arc<dyn Fn(&str, &str, &str) -> Reply + Send + Sync>;

    async fn serve(handler: Handler) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let Some(head) = read_request(&mut socket).await else {
                        return;
                    };
                    let mut line = head.lines().next().unwrap_or_default().split_whitespace();
                    let method = line.next().unwrap_or_default().to_string();
                    let target = line.next().unwrap_or_default().to_string();

                    let reply = handler(&method, &target, &head);
                    let preamble = format!(
                        "HTTP/1.1 {} Canned\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        reply.status,
                        reply.content_type,
                        reply.body.len()
                    );
                    let _ = socket.write_all(preamble.as_bytes()).await;
                    let _ = socket.write_all(&reply.body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    /// Read one request, draining its body. Returns the head.
    async fn read_request(socket: &mut TcpStream) -> Option<String> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        Some(head)
    }

    fn has_bearer(head: &str, token: &str) -> bool {
        head.to_ascii_lowercase()
            .contains(&format!("authorization: bearer {}", token.to_ascii_lowercase()))
    }

    // ── Bundles ──────────────────────────────────────────────────────────

    #[test]
    fn bundle_is_unpacked_flat() {
        let dest = tempfile::tempdir().unwrap();
        let data = bundle(&[
            ("figures/fileoutpart0.png", b"zero"),
            ("figures/fileoutpart1.png", b"one"),
            ("structuredData.json", b"{}"),
            ("figures/.DS_Store", b"junk"),
        ]);

        let count = unpack_bundle(&data, dest.path()).unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            std::fs::read(dest.path().join("figures-fileoutpart1.png")).unwrap(),
            b"one"
        );
        assert!(dest.path().join("structuredData.json").is_file());
        assert!(!dest.path().join("figures-.DS_Store").exists());
    }

    #[test]
    fn escaping_entry_names_are_rejected() {
        assert_eq!(flatten_entry_name(Path::new("../evil.png")), None);
        assert_eq!(flatten_entry_name(Path::new("/etc/passwd")), None);
        assert_eq!(
            flatten_entry_name(Path::new("./a/b.png")),
            Some("a-b.png".to_string())
        );
    }

    #[test]
    fn corrupt_bundle_is_an_error() {
        let dest = tempfile::tempdir().unwrap();
        assert!(unpack_bundle(b"definitely not gzip", dest.path()).is_err());
    }

    #[test]
    fn oversized_header_is_rejected_before_reading() {
        let mut header = tar::Header::new_gnu();
        header.set_path("fig-1.png").unwrap();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(1 << 40);
        header.set_cksum();

        // Header only: the claimed terabyte of data never follows.
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(header.as_bytes()).unwrap();
        gz.write_all(&[0u8; 1024]).unwrap();
        let data = gz.finish().unwrap();

        let dest = tempfile::tempdir().unwrap();
        let err = unpack_bundle(&data, dest.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("expands past"), "got: {err}");
        assert!(!dest.path().join("fig-1.png").exists());
    }

    #[test]
    fn total_unpacked_size_is_capped() {
        let dest = tempfile::tempdir().unwrap();
        let data = bundle(&[("fig-1.png", b"0123456789"), ("fig-2.png", b"0123456789")]);

        let err = unpack_bundle_limited(&data, dest.path(), 15).unwrap_err();
        assert!(err.to_string().contains("fig-2.png"), "got: {err}");
        assert!(unpack_bundle_limited(&data, dest.path(), 20).is_ok());
    }

    #[test]
    fn colliding_flattened_names_are_an_error() {
        let dest = tempfile::tempdir().unwrap();
        let data = bundle(&[("a/b.png", b"one"), ("a-b.png", b"two")]);

        let err = unpack_bundle(&data, dest.path()).unwrap_err();
        assert!(err.to_string().contains("both unpack to 'a-b.png'"), "got: {err}");
        assert_eq!(std::fs::read(dest.path().join("a-b.png")).unwrap(), b"one");
    }

    // ── Job protocol ─────────────────────────────────────────────────────

    #[test]
    fn job_status_parses_known_states() {
        let running: JobStatus = serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(running.status, JobState::Running);

        let done: JobStatus =
            serde_json::from_str(r#"{"status":"done","bundle_url":"bundles/42.tar.gz"}"#).unwrap();
        assert_eq!(done.status, JobState::Done);
        assert_eq!(done.bundle_url.as_deref(), Some("bundles/42.tar.gz"));

        let failed: JobStatus =
            serde_json::from_str(r#"{"status":"failed","error":"encrypted document"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("encrypted document"));
    }

    #[test]
    fn relative_bundle_urls_hang_off_the_endpoint() {
        assert_eq!(
            resolve_url("https://render.example.com", "/bundles/42.tar.gz"),
            "https://render.example.com/bundles/42.tar.gz"
        );
        assert_eq!(
            resolve_url("https://render.example.com", "https://cdn.example.com/42.tar.gz"),
            "https://cdn.example.com/42.tar.gz"
        );
    }

    #[test]
    fn probe_requires_endpoint_and_figure_target() {
        let unconfigured = RendererConfig::default();
        assert!(matches!(
            RemoteBackend::probe(&unconfigured, RenderTarget::EmbeddedImages, true),
            Probe::Unavailable(_)
        ));

        match RemoteBackend::probe(&remote_config(), RenderTarget::Pages, true) {
            Probe::Unavailable(reason) => assert!(reason.contains("figures")),
            Probe::Ready(_) => panic!("pages are not a remote rendition"),
        }

        assert!(matches!(
            RemoteBackend::probe(&remote_config(), RenderTarget::EmbeddedImages, true),
            Probe::Ready(_)
        ));
    }

    #[test]
    fn page_selection_makes_remote_unavailable() {
        match RemoteBackend::probe(&remote_config(), RenderTarget::EmbeddedImages, false) {
            Probe::Unavailable(reason) => assert!(reason.contains("whole document")),
            Probe::Ready(_) => panic!("a page range cannot be rendered remotely"),
        }
    }

    #[test]
    fn missing_credentials_make_remote_unavailable() {
        let config = RendererConfig {
            remote: Some(RemoteConfig::new("https://render.example.com", "", "")),
            ..RendererConfig::default()
        };
        assert!(matches!(
            RemoteBackend::probe(&config, RenderTarget::EmbeddedImages, true),
            Probe::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn partial_range_is_refused_without_contacting_the_service() {
        let backend = backend_for("http://127.0.0.1:9", 5);
        let dir = tempfile::tempdir().unwrap();
        let source = source_pdf(dir.path());
        let mut req = request(&source, dir.path());
        req.page_count = 10;
        req.last_page = 3;

        let err = backend.render(&req).await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)), "got: {err}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_render_failure() {
        let backend = backend_for("http://127.0.0.1:9", 5);
        let dir = tempfile::tempdir().unwrap();
        let source = source_pdf(dir.path());

        let err = backend.render(&request(&source, dir.path())).await.unwrap_err();
        assert!(
            matches!(
                err,
                ExtractError::RenderFailed { .. } | ExtractError::RenderTimeout { .. }
            ),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn full_exchange_unpacks_the_bundle() {
        let polls = Arc::new(AtomicUsize::new(0));
        let figures = bundle(&[("figures/fig-1.png", b"one"), ("figures/fig-2.png", b"two")]);
        let handler: Handler = {
            let polls = Arc::clone(&polls);
            Arc::new(move |method: &str, target: &str, head: &str| match (method, target) {
                ("POST", "/token") if head.contains("x-www-form-urlencoded") => {
                    Reply::json(r#"{"access_token":"tok"}"#)
                }
                ("POST", "/jobs?renditions=figures") if has_bearer(head, "tok") => {
                    Reply::json(r#"{"id":"42"}"#)
                }
                ("GET", "/jobs/42") if has_bearer(head, "tok") => {
                    if polls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Reply::json(r#"{"status":"queued"}"#)
                    } else {
                        Reply::json(r#"{"status":"done","bundle_url":"/bundles/42.tar.gz"}"#)
                    }
                }
                ("GET", "/bundles/42.tar.gz") => Reply {
                    status: 200,
                    content_type: "application/gzip",
                    body: figures.clone(),
                },
                _ => Reply::status(404),
            })
        };
        let endpoint = serve(handler).await;

        let backend = backend_for(&endpoint, 10);
        let workspace = tempfile::tempdir().unwrap();
        let inputs = tempfile::tempdir().unwrap();
        let source = source_pdf(inputs.path());

        let outcome = backend
            .render(&request(&source, workspace.path()))
            .await
            .unwrap();

        assert_eq!(outcome.files_written, 2);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert_eq!(
            std::fs::read(workspace.path().join("figures-fig-1.png")).unwrap(),
            b"one"
        );
        assert_eq!(
            std::fs::read(workspace.path().join("figures-fig-2.png")).unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn rejected_credentials_are_called_out() {
        let endpoint = serve(Arc::new(|_: &str, _: &str, _: &str| Reply::status(401))).await;
        let backend = backend_for(&endpoint, 10);
        let dir = tempfile::tempdir().unwrap();
        let source = source_pdf(dir.path());

        match backend.render(&request(&source, dir.path())).await.unwrap_err() {
            ExtractError::RenderFailed { backend, detail } => {
                assert_eq!(backend, "remote");
                assert!(detail.contains("authentication rejected (HTTP 401)"), "got: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_job_reports_the_service_reason() {
        let endpoint = serve(Arc::new(|method: &str, target: &str, _: &str| match (method, target) {
            ("POST", "/token") => Reply::json(r#"{"access_token":"tok"}"#),
            ("POST", "/jobs?renditions=figures") => Reply::json(r#"{"id":"7"}"#),
            ("GET", "/jobs/7") => {
                Reply::json(r#"{"status":"failed","error":"encrypted document"}"#)
            }
            _ => Reply::status(404),
        }))
        .await;
        let backend = backend_for(&endpoint, 10);
        let dir = tempfile::tempdir().unwrap();
        let source = source_pdf(dir.path());

        match backend.render(&request(&source, dir.path())).await.unwrap_err() {
            ExtractError::RenderFailed { detail, .. } => {
                assert!(detail.contains("job 7 failed: encrypted document"), "got: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn job_that_never_finishes_times_out() {
        let endpoint = serve(Arc::new(|method: &str, target: &str, _: &str| match (method, target) {
            ("POST", "/token") => Reply::json(r#"{"access_token":"tok"}"#),
            ("POST", "/jobs?renditions=figures") => Reply::json(r#"{"id":"9"}"#),
            ("GET", "/jobs/9") => Reply::json(r#"{"status":"running"}"#),
            _ => Reply::status(404),
        }))
        .await;
        let backend = backend_for(&endpoint, 1);
        let dir = tempfile::tempdir().unwrap();
        let source = source_pdf(dir.path());

        let err = backend.render(&request(&source, dir.path())).await.unwrap_err();
        assert!(
            matches!(err, ExtractError::RenderTimeout { secs: 1, .. }),
            "unexpected error: {err}"
        );
    }
}
