//! Pipeline stages for catalog extraction.
//!
//! Each submodule implements one step; the orchestrator in
//! [`crate::extract`] drives them in order inside a per-run workspace.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ labels ──┐
//! (%PDF)   (pages)  (regex)   ├──▶ pairing ──▶ artifacts
//!          render ──▶ files ──┘   (natural sort, zip)
//!  (library│process│remote)
//! ```
//!
//! 1. [`input`]    : check the source exists and carries the PDF magic
//! 2. [`workspace`]: allocate the run's scratch directory, remove it on exit
//! 3. [`text`]     : per-page text via pdfium or `pdftotext`
//! 4. [`labels`]   : accession-number labels, de-duplicated in order
//! 5. [`render`]   : pages or embedded pictures into image files
//! 6. [`pairing`]  : i-th label with i-th naturally-sorted file
//! 7. [`encode`]   : base64 for artifacts crossing a JSON boundary

pub mod encode;
pub mod input;
pub mod labels;
pub mod pairing;
pub mod render;
pub mod text;
pub mod workspace;
