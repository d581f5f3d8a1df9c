//! In-process rendering through the pdfium library.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not be driven from async contexts. Each render call binds
//! pdfium on a blocking-pool thread, writes its files, and drops the binding
//! before returning.
//!
//! ## Availability
//!
//! The strategy is available when pdfium binds: from the configured library
//! file (or the platform library name inside a configured directory), or
//! from the system library search path when nothing is configured. A missing
//! library, or one whose exported symbols `pdfium-render` does not recognise,
//! makes the strategy unavailable rather than failed.

use super::{Probe, RenderBackend, RenderOutcome, RenderRequest};
use crate::config::{BackendKind, RenderTarget, RendererConfig};
use crate::error::ExtractError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where to load pdfium from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumLocation {
    Path(PathBuf),
    System,
}

impl PdfiumLocation {
    /// Resolve the configured library path, which may name a directory.
    pub fn from_config(configured: Option<&Path>) -> Self {
        match configured {
            Some(p) if p.is_dir() => {
                PdfiumLocation::Path(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(p)))
            }
            Some(p) => PdfiumLocation::Path(p.to_path_buf()),
            None => PdfiumLocation::System,
        }
    }
}

/// Bind pdfium at `location`. The error string describes why binding failed.
pub fn bind_pdfium(location: &PdfiumLocation) -> Result<Pdfium, String> {
    let bindings = match location {
        PdfiumLocation::Path(p) => Pdfium::bind_to_library(p),
        PdfiumLocation::System => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| match location {
        PdfiumLocation::Path(p) => format!("cannot bind '{}': {:?}", p.display(), e),
        PdfiumLocation::System => format!("no system libpdfium: {:?}", e),
    })?;

    Ok(Pdfium::new(bindings))
}

/// Check that pdfium binds at the configured location.
pub fn probe_pdfium(configured: Option<&Path>) -> Probe<PdfiumLocation> {
    let location = PdfiumLocation::from_config(configured);
    match bind_pdfium(&location) {
        Ok(_pdfium) => Probe::Ready(location),
        Err(reason) => Probe::Unavailable(reason),
    }
}

/// Render strategy backed by an in-process pdfium binding.
#[derive(Debug)]
pub struct PdfiumBackend {
    location: PdfiumLocation,
}

impl PdfiumBackend {
    pub fn probe(config: &RendererConfig) -> Probe<Arc<dyn RenderBackend>> {
        match probe_pdfium(config.pdfium_library.as_deref()) {
            Probe::Ready(location) => Probe::Ready(Arc::new(PdfiumBackend { location })),
            Probe::Unavailable(reason) => Probe::Unavailable(reason),
        }
    }
}

#[async_trait]
impl RenderBackend for PdfiumBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Library
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutcome, ExtractError> {
        let job = RenderJob {
            location: self.location.clone(),
            source: request.source.to_path_buf(),
            workspace: request.workspace.to_path_buf(),
            first_page: request.first_page,
            last_page: request.last_page,
            target: request.target,
            dpi: request.dpi,
            max_pixels: request.max_rendered_pixels,
        };

        let files_written = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))??;

        Ok(RenderOutcome { files_written })
    }
}

/// Owned copy of a render request, movable onto the blocking pool.
struct RenderJob {
    location: PdfiumLocation,
    source: PathBuf,
    workspace: PathBuf,
    first_page: usize,
    last_page: usize,
    target: RenderTarget,
    dpi: u32,
    max_pixels: u32,
}

impl RenderJob {
    fn run(&self) -> Result<usize, ExtractError> {
        let pdfium = bind_pdfium(&self.location).map_err(failed)?;

        let document = pdfium
            .load_pdf_from_file(&self.source, None)
            .map_err(|e| failed(format!("cannot open '{}': {:?}", self.source.display(), e)))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let max_pixels = i32::try_from(self.max_pixels).unwrap_or(i32::MAX);
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(max_pixels)
            .set_maximum_height(max_pixels);

        let mut written = 0;

        for page_num in self.first_page..=self.last_page {
            if page_num == 0 || page_num > total_pages {
                warn!(
                    "Skipping page {} (out of range, total={})",
                    page_num, total_pages
                );
                continue;
            }

            let page = pages
                .get((page_num - 1) as u16)
                .map_err(|e| failed(format!("page {}: {:?}", page_num, e)))?;

            match self.target {
                RenderTarget::Pages => {
                    let bitmap = page
                        .render_with_config(&render_config)
                        .map_err(|e| failed(format!("page {}: {:?}", page_num, e)))?;
                    let image = bitmap.as_image();
                    debug!(
                        "Rendered page {} → {}x{} px",
                        page_num,
                        image.width(),
                        image.height()
                    );
                    let path = self.workspace.join(format!("page-{page_num}.png"));
                    write_png(&image, &path)?;
                    written += 1;
                }
                RenderTarget::EmbeddedImages => {
                    let mut index = 0;
                    for object in page.objects().iter() {
                        let Some(image_object) = object.as_image_object() else {
                            continue;
                        };
                        index += 1;
                        let image = image_object.get_raw_image().map_err(|e| {
                            failed(format!("page {} image {}: {:?}", page_num, index, e))
                        })?;
                        let path = self
                            .workspace
                            .join(format!("page-{page_num}-img-{index}.png"));
                        write_png(&image, &path)?;
                        written += 1;
                    }
                    debug!("Page {}: {} embedded images", page_num, index);
                }
            }
        }

        Ok(written)
    }
}

/// Write an image as PNG, normalising exotic pixel formats first.
fn write_png(image: &DynamicImage, path: &Path) -> Result<(), ExtractError> {
    let result = match image {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_) => image.save_with_format(path, image::ImageFormat::Png),
        other => DynamicImage::ImageRgba8(other.to_rgba8())
            .save_with_format(path, image::ImageFormat::Png),
    };
    result.map_err(|e| failed(format!("cannot write '{}': {}", path.display(), e)))
}

fn failed(detail: impl Into<String>) -> ExtractError {
    ExtractError::RenderFailed {
        backend: BackendKind::Library.to_string(),
        detail: detail.into(),
    }
}
