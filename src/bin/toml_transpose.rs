use clap::Parser;
use transposex::config::toml_config::{JobConfig, TomlConfig};
use transposex::utils::{logger, validation::Validate};
use transposex::{build_report, LocalStorage, TranspositionEngine, TranspositionPipeline};

#[derive(Parser)]
#[command(name = "toml-transpose")]
#[command(about = "Batch transposition driven by a TOML job file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "transpose.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Print one JSON report per finished job
    #[arg(long)]
    json: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置 (日誌格式由配置決定，因此先載入)
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(e.exit_code());
        }
    };

    // 初始化日誌
    logger::init_logger(args.verbose, config.json_logs());

    tracing::info!("🚀 Starting TOML-based transposition");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let jobs = config.resolve_jobs()?;
    tracing::info!("✅ Configuration validated, {} job(s) queued", jobs.len());

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        display_dry_run(&config, &jobs);
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut failed = 0usize;
    let mut last_exit_code = 0;

    for (index, job) in jobs.into_iter().enumerate() {
        tracing::info!(
            "🎵 Job {}: {} ({:+} semitones) -> {}",
            index + 1,
            job.input,
            job.interval,
            job.output
        );

        let from_key = job.from_key.clone();
        let report_config = job.clone();
        let pipeline = TranspositionPipeline::new(LocalStorage::default(), job);
        let engine = TranspositionEngine::new_with_monitoring(pipeline, monitor_enabled);

        match engine.run().await {
            Ok(outcome) => {
                if args.json {
                    let report = build_report(&report_config, from_key.as_deref(), &outcome)?;
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    println!(
                        "✅ {} -> {} ({} notes)",
                        report_config.input, outcome.output_path, outcome.stats.notes_transposed
                    );
                }
            }
            Err(e) => {
                // 單一作業失敗不中斷其餘作業
                tracing::error!(
                    "❌ Job {} failed: {} (Category: {:?})",
                    index + 1,
                    e,
                    e.category()
                );
                eprintln!("❌ {}: {}", report_config.input, e.user_friendly_message());
                eprintln!("💡 建議: {}", e.recovery_suggestion());
                failed += 1;
                last_exit_code = e.exit_code();
            }
        }
    }

    if failed > 0 {
        tracing::error!("{} job(s) failed", failed);
        std::process::exit(last_exit_code);
    }

    tracing::info!("✅ All jobs completed successfully!");
    Ok(())
}

fn display_dry_run(config: &TomlConfig, jobs: &[JobConfig]) {
    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📦 Archive entry suffixes: {}", config.document_suffixes().join(", "));
    println!();
    println!("🎼 Jobs:");
    for (index, job) in jobs.iter().enumerate() {
        println!(
            "  {}. {} -> {} ({:+} semitones)",
            index + 1,
            job.input,
            job.output,
            job.interval
        );
        if let Some(key) = &job.from_key {
            println!("     Key: {}", key);
        }
    }
    println!();
    println!("✅ Dry run analysis complete.");
}
