//! Rendering through poppler's command-line tools, run as child processes.
//!
//! - [`RenderTarget::Pages`] runs `pdftoppm -png -r <dpi> -f <first> -l <last>`
//!   and produces `page-<n>.png` (poppler zero-pads `<n>` to the width of the
//!   page count).
//! - [`RenderTarget::EmbeddedImages`] runs `pdfimages -png -f <first> -l <last>`
//!   and produces `img-<nnn>.png`.
//!
//! Children are spawned with `kill_on_drop`, so when the wall-clock timeout
//! drops the wait future the child goes with it.

use super::{Probe, RenderBackend, RenderOutcome, RenderRequest};
use crate::config::{BackendKind, RenderTarget, RendererConfig};
use crate::error::ExtractError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Locate `name` in `dir` when given, else on the system search path.
pub fn find_executable(name: &str, dir: Option<&Path>) -> Option<PathBuf> {
    let file = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    match dir {
        Some(dir) => {
            let candidate = dir.join(&file);
            is_executable(&candidate).then_some(candidate)
        }
        None => {
            let paths = std::env::var_os("PATH")?;
            std::env::split_paths(&paths)
                .map(|d| d.join(&file))
                .find(|p| is_executable(p))
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run a tool to completion, bounded by `limit`.
///
/// Returns the captured output on a zero exit. A non-zero exit becomes
/// [`ExtractError::RenderFailed`] carrying the tool's stderr.
pub(crate) async fn run_tool(
    backend: &str,
    executable: &Path,
    args: &[&std::ffi::OsStr],
    limit: Duration,
) -> Result<Output, ExtractError> {
    let tool = executable
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| executable.display().to_string());

    debug!("Running {} {:?}", executable.display(), args);

    let child = Command::new(executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExtractError::RenderFailed {
            backend: backend.to_string(),
            detail: format!("could not start {}: {}", tool, e),
        })?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ExtractError::RenderFailed {
            backend: backend.to_string(),
            detail: format!("waiting for {}: {}", tool, e),
        })?,
        Err(_) => {
            return Err(ExtractError::RenderTimeout {
                backend: backend.to_string(),
                secs: limit.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("{} exited with {}", tool, output.status)
        } else {
            format!("{} exited with {}: {}", tool, output.status, stderr)
        };
        return Err(ExtractError::RenderFailed {
            backend: backend.to_string(),
            detail,
        });
    }

    Ok(output)
}

/// Number of entries the tool left in `dir`. Unreadable means zero.
async fn count_entries(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}

/// Render strategy backed by poppler executables.
#[derive(Debug)]
pub struct PopplerBackend {
    executable: PathBuf,
    timeout: Duration,
}

impl PopplerBackend {
    /// The tool this strategy needs for `target`.
    pub fn tool_for(target: RenderTarget) -> &'static str {
        match target {
            RenderTarget::Pages => "pdftoppm",
            RenderTarget::EmbeddedImages => "pdfimages",
        }
    }

    pub fn probe(config: &RendererConfig, target: RenderTarget) -> Probe<Arc<dyn RenderBackend>> {
        let tool = Self::tool_for(target);
        match find_executable(tool, config.poppler_dir.as_deref()) {
            Some(executable) => {
                debug!("Found {} at {}", tool, executable.display());
                Probe::Ready(Arc::new(PopplerBackend {
                    executable,
                    timeout: Duration::from_secs(config.process_timeout_secs),
                }))
            }
            None => Probe::Unavailable(match &config.poppler_dir {
                Some(dir) => format!("{} not found in {}", tool, dir.display()),
                None => format!("{} not found on PATH (install poppler-utils)", tool),
            }),
        }
    }

    fn arguments(&self, request: &RenderRequest<'_>) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec!["-png".into()];
        let prefix = match request.target {
            RenderTarget::Pages => {
                args.push("-r".into());
                args.push(request.dpi.to_string().into());
                "page"
            }
            RenderTarget::EmbeddedImages => "img",
        };
        args.push("-f".into());
        args.push(request.first_page.to_string().into());
        args.push("-l".into());
        args.push(request.last_page.to_string().into());
        args.push(request.source.as_os_str().to_owned());
        args.push(request.workspace.join(prefix).into_os_string());
        args
    }
}

#[async_trait]
impl RenderBackend for PopplerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutcome, ExtractError> {
        let args = self.arguments(request);
        let arg_refs: Vec<&std::ffi::OsStr> = args.iter().map(|a| a.as_os_str()).collect();

        run_tool(
            BackendKind::Process.as_str(),
            &self.executable,
            &arg_refs,
            self.timeout,
        )
        .await?;

        let files_written = count_entries(request.workspace).await;
        info!(
            "{} wrote {} files",
            Self::tool_for(request.target),
            files_written
        );

        Ok(RenderOutcome { files_written })
    }
}
