//! Output types returned by an extraction run.

use crate::config::BackendKind;
use crate::pipeline::encode;
use serde::{Deserialize, Serialize};

/// One named image paired with a catalog label.
///
/// Created only by the pairing stage and never mutated afterwards. `data`
/// serialises as base64 so a whole [`PipelineResult`] can cross a JSON
/// boundary unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// `<sanitised label>.png`.
    pub name: String,
    /// Raw bytes of the rendered file.
    #[serde(with = "encode::serde_inline")]
    pub data: Vec<u8>,
    /// File name the renderer gave this image inside the run's workspace.
    /// The workspace is deleted when the run ends; this is provenance only.
    pub source_file: String,
}

impl Artifact {
    pub fn new(name: String, data: Vec<u8>, source_file: String) -> Self {
        Self {
            name,
            data,
            source_file,
        }
    }

    /// Base64 form of [`Artifact::data`].
    pub fn inline_data(&self) -> String {
        encode::encode_inline(&self.data)
    }

    /// `data:` URI with a MIME type sniffed from the content.
    pub fn data_uri(&self) -> String {
        encode::data_uri(&self.data)
    }
}

/// Per-run counts reported to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounts {
    pub labels_found: usize,
    pub files_rendered: usize,
    pub paired: usize,
}

/// Timing and document facts for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source document.
    pub page_count: usize,
    /// 1-based inclusive page range that was processed.
    pub first_page: usize,
    pub last_page: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Artifacts in label order.
    pub artifacts: Vec<Artifact>,
    pub counts: RunCounts,
    /// The distinct labels found, in first-seen order.
    pub labels: Vec<String>,
    /// Strategy that rendered the images.
    pub backend: BackendKind,
    pub stats: RunStats,
}

impl PipelineResult {
    /// Labels that did not get an image (cardinality mismatch).
    pub fn unpaired_labels(&self) -> &[String] {
        &self.labels[self.counts.paired.min(self.labels.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_serialise_in_camel_case() {
        let counts = RunCounts {
            labels_found: 1,
            files_rendered: 2,
            paired: 1,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"labelsFound":1,"filesRendered":2,"paired":1}"#);
    }

    #[test]
    fn artifact_json_round_trip_keeps_bytes() {
        let artifact = Artifact::new("2001.3.4 Vase.png".into(), vec![0, 159, 146, 150], "page-1.png".into());
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains(&artifact.inline_data()));
        let back: Artifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
    }

    #[test]
    fn unpaired_labels_are_the_tail() {
        let result = PipelineResult {
            artifacts: vec![],
            counts: RunCounts {
                labels_found: 3,
                files_rendered: 1,
                paired: 1,
            },
            labels: vec!["a".into(), "b".into(), "c".into()],
            backend: BackendKind::Process,
            stats: RunStats::default(),
        };
        assert_eq!(result.unpaired_labels(), &["b".to_string(), "c".to_string()]);
    }
}
