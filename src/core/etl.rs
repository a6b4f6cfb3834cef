use crate::config::cli::LocalStorage;
use crate::config::toml_config::JobConfig;
use crate::core::key::KeyLabel;
use crate::core::pipeline::TranspositionPipeline;
use crate::core::{ConfigProvider, Pipeline};
use crate::domain::model::{ScorePackage, TransposeOutcome, TransposeReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::adapters::container::DEFAULT_DOCUMENT_SUFFIXES;

/// Runs extract → transpose → repack for one score.
///
/// The output is only written in the last stage, so a failure anywhere
/// leaves no output file behind.
pub struct TranspositionEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> TranspositionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<TransposeOutcome> {
        tracing::info!("📦 Extracting score document...");
        let score = self.pipeline.extract().await?;
        let entry_name = match &score.package {
            ScorePackage::Archive { entry_name, .. } => Some(entry_name.clone()),
            ScorePackage::Plain => None,
        };
        tracing::info!(
            "Extracted {} ({} bytes)",
            entry_name.as_deref().unwrap_or("plain document"),
            score.document.len()
        );
        self.monitor.log_stats("Extract");

        tracing::info!("🎼 Transposing notes...");
        let transposed = self.pipeline.transform(score).await?;
        let stats = transposed.stats;
        tracing::info!(
            "Transposed {} of {} notes ({} unpitched, {} malformed left unchanged)",
            stats.notes_transposed,
            stats.total_notes(),
            stats.unpitched_notes,
            stats.malformed_notes
        );
        self.monitor.log_stats("Transform");

        tracing::info!("💾 Writing output...");
        let output_path = self.pipeline.load(transposed).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(TransposeOutcome {
            output_path,
            entry_name,
            stats,
        })
    }
}

/// Transpose the score at `input` by `interval` semitones into `output`.
pub async fn transpose_archive(input: &str, interval: i32, output: &str) -> Result<TransposeOutcome> {
    let config = JobConfig {
        input: input.to_string(),
        output: output.to_string(),
        interval,
        document_suffixes: DEFAULT_DOCUMENT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        from_key: None,
    };
    let pipeline = TranspositionPipeline::new(LocalStorage::default(), config);
    TranspositionEngine::new(pipeline).run().await
}

pub fn build_report<C: ConfigProvider>(
    config: &C,
    from_key: Option<&str>,
    outcome: &TransposeOutcome,
) -> Result<TransposeReport> {
    let (original_key, transposed_key) = match from_key {
        Some(label) => {
            let key: KeyLabel = label.parse()?;
            (
                Some(key.to_string()),
                Some(key.transposed(config.interval()).to_string()),
            )
        }
        None => (None, None),
    };

    Ok(TransposeReport {
        input: config.input_path().to_string(),
        output: outcome.output_path.clone(),
        entry_name: outcome.entry_name.clone(),
        interval: config.interval(),
        stats: outcome.stats,
        original_key,
        transposed_key,
        completed_at: chrono::Utc::now(),
    })
}
