// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use script_breakdown::utils::logging::{
    format_error, format_info, format_success, format_warning, init_logger,
};
use script_breakdown::{
    AnalysisOutcome, BatchOrchestrator, Config, HealthReport, ResultCache, ScreenplayAnalyzer,
    ScriptPreview, Validator, models::breakdown::format_eighths,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "script_breakdown")]
#[command(author = "cipher")]
#[command(version)]
#[command(about = "Screenplay analyzer producing production breakdowns", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml",
        env = "SCRIPT_BREAKDOWN_CONFIG"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one screenplay and print its breakdown
    Analyze {
        file: PathBuf,

        /// Print the full breakdown as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Summarize the first scenes without caching or exporting
    Preview {
        file: PathBuf,

        #[arg(long, default_value_t = 3)]
        scenes: usize,
    },

    /// Analyze every supported screenplay under a directory
    Batch {
        dir: PathBuf,

        #[arg(long, value_name = "NUM")]
        limit: Option<usize>,
    },

    Health {
        /// Also check that the working directories are usable
        #[arg(long)]
        ready: bool,
    },

    /// Inspect or clear the persisted result cache
    Cache {
        #[arg(long)]
        list: bool,

        #[arg(long)]
        purge: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    colored::control::set_override(cli.color);
    init_logger(cli.color, cli.verbose);

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Analyze { file, json } => cmd_analyze(&config, &file, json).await?,
        Commands::Preview { file, scenes } => cmd_preview(&config, &file, scenes).await?,
        Commands::Batch { dir, limit } => cmd_batch(&config, &dir, limit, cli.color).await?,
        Commands::Health { ready } => cmd_health(&config, ready)?,
        Commands::Cache { list, purge } => cmd_cache(&config, list, purge).await?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    info!("Loading configuration from: {}", path.display());

    if path.exists() {
        return Config::load(Some(path)).context("Failed to load configuration");
    }

    warn!(
        "Config file {} not found, using default configuration",
        path.display()
    );
    Ok(Config::load(None).unwrap_or_else(|e| {
        warn!("Falling back to built-in defaults: {}", e);
        Config::default_config()
    }))
}

async fn build_analyzer(config: &Config) -> Result<ScreenplayAnalyzer> {
    let cache = ResultCache::open(&config.cache).await;
    if cache.is_persistent() {
        info!("Result cache persisted to {}", config.cache.directory.display());
    }
    ScreenplayAnalyzer::new(config, cache).context("Failed to initialize analyzer")
}

async fn cmd_analyze(config: &Config, file: &Path, json: bool) -> Result<()> {
    Validator::validate_file_path(file)?;

    let analyzer = build_analyzer(config).await?;
    let result = analyzer.analyze_file(file).await;
    analyzer.cache().shutdown().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_user_correctable() => {
            eprintln!("{}", format_error(&format!("{}: {}", file.display(), e)));
            std::process::exit(2);
        }
        Err(e) => return Err(e).context(format!("Failed to analyze {}", file.display())),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

async fn cmd_preview(config: &Config, file: &Path, scenes: usize) -> Result<()> {
    Validator::validate_file_path(file)?;
    Validator::validate_scene_limit(scenes)?;

    let cache = ResultCache::in_memory(1, 0);
    let analyzer =
        ScreenplayAnalyzer::new(config, cache).context("Failed to initialize analyzer")?;

    let preview = analyzer
        .preview_file(file, scenes)
        .await
        .with_context(|| format!("Failed to preview {}", file.display()))?;

    print_preview(&preview);
    Ok(())
}

async fn cmd_batch(config: &Config, dir: &Path, limit: Option<usize>, colored: bool) -> Result<()> {
    Validator::validate_directory(dir)?;

    let analyzer = Arc::new(build_analyzer(config).await?);
    let orchestrator = BatchOrchestrator::new(config.clone(), Arc::clone(&analyzer), colored);

    let report = orchestrator
        .run(dir, limit)
        .await
        .context("Batch analysis failed")?;
    analyzer.cache().shutdown().await;

    println!(
        "{}",
        format_success(&format!(
            "{} analyzed, {} failed ({:.1}% success)",
            report.stats.files_processed,
            report.stats.files_failed,
            report.stats.success_rate()
        ))
    );
    for failure in &report.failures {
        let error = Validator::truncate_text(&failure.error, 120);
        println!("{}", format_warning(&format!("{}: {}", failure.file, error)));
    }
    if let Some(path) = report.manifest_path {
        println!("{}", format_info(&format!("Manifest: {}", path.display())));
    }

    Ok(())
}

fn cmd_health(config: &Config, ready: bool) -> Result<()> {
    let report = if ready {
        HealthReport::readiness(config)
    } else {
        HealthReport::liveness()
    };

    print!("{}", report.format());

    if !report.is_ready() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_cache(config: &Config, list: bool, purge: bool) -> Result<()> {
    let cache = ResultCache::open(&config.cache).await;

    let Some(store) = cache.store() else {
        println!(
            "{}",
            format_warning("Persistent cache is disabled (set cache.persist = true)")
        );
        return Ok(());
    };

    if list || !purge {
        let entries = store.list().await.context("Failed to list cache entries")?;
        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();

        println!(
            "{}",
            format_info(&format!(
                "{} entries in {} ({} bytes)",
                entries.len(),
                store.directory().display(),
                total
            ))
        );
        for entry in &entries {
            println!("  {}  {:>10} bytes", entry.fingerprint, entry.size_bytes);
        }
    }

    if purge {
        let removed = store.purge().await.context("Failed to purge cache")?;
        println!("{}", format_success(&format!("Removed {} cache entries", removed)));
    }

    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let breakdown = &outcome.breakdown;
    let totals = &breakdown.totals;

    println!("\n{}", outcome.filename.bold());
    println!("  Fingerprint: {}", outcome.fingerprint.dimmed());
    println!(
        "  Scenes: {}  Characters: {}  Locations: {}  Dialogue lines: {}",
        totals.scene_count, totals.character_count, totals.location_count, totals.dialogue_line_count
    );
    println!(
        "  Length: {} pages  Runtime: ~{} min",
        format_eighths(totals.page_eighths),
        totals.estimated_runtime_secs.div_ceil(60)
    );

    println!("\n{}", "Characters".cyan().bold());
    for character in &breakdown.characters {
        println!(
            "  {:<24} {:>4} lines  scenes {:?}",
            character.name, character.dialogue_line_count, character.scenes
        );
    }

    println!("\n{}", "Locations".cyan().bold());
    for location in &breakdown.locations {
        println!("  {:<24} scenes {:?}", location.name, location.scenes);
    }

    if !breakdown.production_elements.is_empty() {
        println!("\n{}", "Production elements".cyan().bold());
        for element in &breakdown.production_elements {
            println!(
                "  {:<14} {:<20} scenes {:?}",
                element.category, element.name, element.scenes
            );
        }
    }

    println!();
    match &outcome.output_path {
        Some(path) => println!("{}", format_success(&format!("Exported to {}", path.display()))),
        None => println!("{}", format_info("Export disabled")),
    }
}

fn print_preview(preview: &ScriptPreview) {
    println!(
        "\n{} ({} scenes, ~{} pages)",
        preview.filename.bold(),
        preview.total_scenes,
        preview.estimated_pages
    );

    for scene in &preview.scenes {
        println!(
            "\n{} {}",
            format!("#{}", scene.index).cyan().bold(),
            scene.heading
        );
        println!(
            "  {} | {} | {}",
            scene.setting.label(),
            if scene.location.is_empty() { "-" } else { scene.location.as_str() },
            scene.time_of_day.as_deref().unwrap_or("-")
        );
        if !scene.description.is_empty() {
            println!("  {}", scene.description.dimmed());
        }
        println!(
            "  Characters: {}",
            if scene.characters.is_empty() {
                "-".to_string()
            } else {
                scene.characters.join(", ")
            }
        );
        println!("  Length: {}", scene.page_length_label());
    }
}
