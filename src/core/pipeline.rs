use crate::adapters::{ContainerCodec, Document};
use crate::core::transposer::transpose;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{ExtractedScore, ScorePackage, TransposeStats, TransposedScore};
use crate::utils::error::Result;
use std::path::Path;

/// Uncompressed MusicXML is recognised by extension; anything else is
/// treated as an MXL archive.
pub fn is_plain_document(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("musicxml"))
        .unwrap_or(false)
}

/// Rewrite every pitched note of `doc` in place.
///
/// Notes without `<pitch>` (rests, unpitched percussion) and notes whose
/// pitch cannot be read are left exactly as they are.
pub fn transpose_document(doc: &mut Document, interval: i32) -> TransposeStats {
    let mut stats = TransposeStats::default();

    for note in doc.note_elements() {
        let Some(mut nodes) = doc.pitch_nodes(note) else {
            stats.unpitched_notes += 1;
            continue;
        };

        match doc.read_pitch(&nodes) {
            Ok(pitch) => {
                let moved = transpose(pitch, interval);
                tracing::trace!("{} -> {}", pitch, moved);
                doc.write_pitch(&mut nodes, &moved);
                stats.notes_transposed += 1;
            }
            Err(reason) => {
                tracing::warn!("⚠️ Leaving malformed note unchanged: {}", reason);
                stats.malformed_notes += 1;
            }
        }
    }

    stats
}

/// Parse, transpose and serialize one MusicXML document.
pub fn transpose_xml(document: &[u8], interval: i32) -> Result<(Vec<u8>, TransposeStats)> {
    let mut doc = Document::parse(document)?;
    let stats = transpose_document(&mut doc, interval);
    Ok((doc.serialize(), stats))
}

pub struct TranspositionPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    codec: ContainerCodec,
}

impl<S: Storage, C: ConfigProvider> TranspositionPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let codec = ContainerCodec::new(config.document_suffixes().to_vec());
        Self {
            storage,
            config,
            codec,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for TranspositionPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractedScore> {
        let input = self.config.input_path();
        tracing::debug!("Reading score from: {}", input);
        let bytes = self.storage.read_file(input).await?;

        if is_plain_document(input) {
            tracing::debug!("Plain MusicXML input ({} bytes)", bytes.len());
            return Ok(ExtractedScore {
                package: ScorePackage::Plain,
                document: bytes,
            });
        }

        let (entry_name, document) = self.codec.extract_bytes(&bytes)?;
        Ok(ExtractedScore {
            package: ScorePackage::Archive { bytes, entry_name },
            document,
        })
    }

    async fn transform(&self, score: ExtractedScore) -> Result<TransposedScore> {
        let (document, stats) = transpose_xml(&score.document, self.config.interval())?;
        Ok(TransposedScore {
            package: score.package,
            document,
            stats,
        })
    }

    async fn load(&self, score: TransposedScore) -> Result<String> {
        let output_path = self.config.output_path();

        let data = match &score.package {
            ScorePackage::Archive { bytes, entry_name } => {
                self.codec.repack_bytes(bytes, entry_name, &score.document)?
            }
            ScorePackage::Plain => score.document,
        };

        tracing::debug!("Writing {} bytes to {}", data.len(), output_path);
        self.storage.write_file(&output_path, &data).await?;
        Ok(output_path)
    }
}
