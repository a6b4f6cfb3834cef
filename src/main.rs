use clap::Parser;
use transposex::core::ConfigProvider;
use transposex::utils::{logger, validation::Validate};
use transposex::{build_report, CliConfig, LocalStorage, TranspositionEngine, TranspositionPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.log_json);

    tracing::info!("Starting transposex CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    tracing::info!(
        "🎵 Transposing {} by {} semitone(s) into {}",
        config.input_path(),
        config.interval(),
        config.output_path()
    );

    // 創建存儲和管道
    let pipeline = TranspositionPipeline::new(LocalStorage::default(), config.clone());
    let engine = TranspositionEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Transposition completed successfully!");
            if config.json {
                let report = build_report(&config, config.from_key.as_deref(), &outcome)?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("✅ Transposition completed successfully!");
                println!(
                    "🎼 {} notes transposed, {} unpitched, {} left unchanged",
                    outcome.stats.notes_transposed,
                    outcome.stats.unpitched_notes,
                    outcome.stats.malformed_notes
                );
                println!("📁 Output saved to: {}", outcome.output_path);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Transposition failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}
