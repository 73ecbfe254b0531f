//! CLI entry point for the release recommender.
//!
//! Provides commands for building an index from exported embeddings and
//! catalog data, and for querying recommendations from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use tracing::{Level, debug};

use discogs_rec::display::{self, THEME};
use discogs_rec::forest::ForestStats;
use discogs_rec::io::{ExitCode, JsonResponse, OutputFormat};
use discogs_rec::recommend::ReleaseQuery;
use discogs_rec::vector::VectorError;
use discogs_rec::{
    EmbeddingMatrix, ForestBuilder, IndexError, IndexHandle, IndexMetadata, IndexPersistence,
    IndexSnapshot, MetadataCatalog, RecommendConfig, RecommendError, Recommender, Settings,
    VectorStore,
};

// JSON output structures
#[derive(Debug, Serialize)]
struct BuildSummary {
    index_path: PathBuf,
    metadata: IndexMetadata,
    stats: ForestStats,
}

#[derive(Debug, Serialize)]
struct IndexInfo {
    index_path: PathBuf,
    metadata: IndexMetadata,
    stats: ForestStats,
}

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Discogs release recommender
#[derive(Parser)]
#[command(
    name = "discogs-rec",
    version = env!("CARGO_PKG_VERSION"),
    about = "Recommend similar Discogs releases",
    long_about = "Build a random-projection forest over release embeddings and query it for similar releases, at most one per artist.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ discogs-rec init\n  $ discogs-rec build embeddings.vec catalog.json --seed 42\n  $ discogs-rec recommend https://www.discogs.com/release/249504 --count 5"
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .discogs-rec directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Build the index from an embedding matrix and a catalog
    #[command(
        about = "Build the recommendation index",
        after_help = "Examples:\n  discogs-rec build embeddings.vec catalog.json\n  discogs-rec build embeddings.vec catalog.json --trees 500 --seed 7 --force"
    )]
    Build {
        /// Embedding matrix file (DVEC format)
        embeddings: PathBuf,

        /// Catalog JSON keyed by row index
        catalog: PathBuf,

        /// Number of trees (overrides config)
        #[arg(short = 'n', long)]
        trees: Option<usize>,

        /// Maximum releases per leaf (overrides config)
        #[arg(short = 'k', long)]
        leaf_capacity: Option<usize>,

        /// Seed for a reproducible build (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of threads to use (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Replace an existing index
        #[arg(short, long)]
        force: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Recommend releases similar to a given one
    #[command(
        about = "Recommend similar releases, one per artist",
        after_help = "Examples:\n  discogs-rec recommend https://www.discogs.com/release/249504\n  discogs-rec recommend 249504 --count 10 --json"
    )]
    Recommend {
        /// Release URL or numeric release id
        release: String,

        /// Number of recommendations (defaults to recommend.default_count)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show raw nearest neighbors without filtering
    #[command(about = "List raw nearest neighbors with distances")]
    Neighbors {
        /// Release URL or numeric release id
        release: String,

        /// Number of neighbors
        #[arg(short, long, default_value_t = 10)]
        k: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    #[command(about = "Show statistics of the built index")]
    Info {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn output_format(&self) -> OutputFormat {
        let json = match self {
            Commands::Build { json, .. }
            | Commands::Recommend { json, .. }
            | Commands::Neighbors { json, .. }
            | Commands::Info { json } => *json,
            Commands::Init { .. } | Commands::Config => false,
        };
        OutputFormat::from_json_flag(json)
    }
}

fn main() {
    let cli = Cli::parse();

    // Load configuration
    let mut settings = if let Some(config_path) = &cli.config {
        Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(ExitCode::ConfigError.into());
        })
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })
    };
    if cli.debug {
        settings.debug = true;
    }

    init_tracing(&settings, cli.quiet);

    let format = cli.command.output_format();
    let started = Instant::now();
    let exit_code = match run(&cli, &mut settings, format, started) {
        Ok(code) => code,
        Err(error) => report_error(&error, format),
    };
    debug!(
        exit = exit_code.description(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Command finished"
    );
    std::process::exit(exit_code.into());
}

fn init_tracing(settings: &Settings, quiet: bool) {
    let level = if quiet {
        Level::WARN
    } else if settings.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(
    cli: &Cli,
    settings: &mut Settings,
    format: OutputFormat,
    started: Instant,
) -> Result<ExitCode> {
    match &cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(*force).map_err(|e| IndexError::ConfigError {
                reason: e.to_string(),
            })?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Created configuration file at: {}",
                    path.display()
                ))
            );
            println!("Edit this file to customize your settings.");
            Ok(ExitCode::Success)
        }

        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&*settings)?);
            Ok(ExitCode::Success)
        }

        Commands::Build {
            embeddings,
            catalog,
            trees,
            leaf_capacity,
            seed,
            threads,
            force,
            ..
        } => {
            // Override config with CLI args
            if let Some(trees) = trees {
                settings.build.tree_count = *trees;
            }
            if let Some(leaf_capacity) = leaf_capacity {
                settings.build.leaf_capacity = *leaf_capacity;
            }
            if seed.is_some() {
                settings.build.seed = *seed;
            }
            if let Some(threads) = threads {
                settings.build.parallel_threads = *threads;
            }
            settings.validate()?;

            let show_progress = !cli.quiet && !format.is_json();
            build_index(settings, embeddings, catalog, *force, show_progress, format, started)
        }

        Commands::Recommend { release, count, .. } => {
            let recommender = open_recommender(settings)?;
            let count = count.unwrap_or(settings.recommend.default_count);
            let items = recommender.recommend_input(release, count)?;

            if format.is_json() {
                let response = JsonResponse::success(&items).with_elapsed(started.elapsed());
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if items.is_empty() {
                println!("{}", THEME.warning_with_icon("No recommendations requested"));
            } else {
                println!("{}", display::create_recommendation_table(&items));
            }
            Ok(ExitCode::Success)
        }

        Commands::Neighbors { release, k, .. } => {
            let recommender = open_recommender(settings)?;
            let query = ReleaseQuery::parse(release)?;
            let neighbors = recommender.neighbors(query, *k)?;

            if format.is_json() {
                let response = JsonResponse::success(&neighbors).with_elapsed(started.elapsed());
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", display::create_neighbor_table(&neighbors));
            }
            Ok(ExitCode::Success)
        }

        Commands::Info { .. } => {
            let persistence = IndexPersistence::new(&settings.index_path);
            let snapshot = persistence.load()?;
            let info = IndexInfo {
                index_path: settings.index_path.clone(),
                metadata: snapshot.metadata().clone(),
                stats: snapshot.forest().stats(),
            };

            if format.is_json() {
                let response = JsonResponse::success(&info).with_elapsed(started.elapsed());
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!(
                    "Index at {}",
                    THEME.apply(&THEME.path, settings.index_path.display())
                );
                println!(
                    "{}",
                    display::create_index_summary_table(&info.metadata, &info.stats)
                );
            }
            Ok(ExitCode::Success)
        }
    }
}

fn build_index(
    settings: &Settings,
    embeddings: &Path,
    catalog_path: &Path,
    force: bool,
    show_progress: bool,
    format: OutputFormat,
    started: Instant,
) -> Result<ExitCode> {
    let persistence = IndexPersistence::new(&settings.index_path);
    if persistence.exists() && !force {
        eprintln!(
            "{}",
            THEME.warning_with_icon(&format!(
                "Index already exists at {}",
                settings.index_path.display()
            ))
        );
        eprintln!("Use --force to rebuild");
        return Ok(ExitCode::GeneralError);
    }

    let open_matrix = || EmbeddingMatrix::open(embeddings);
    let opened = if show_progress {
        display::with_spinner("Loading embeddings", open_matrix)
    } else {
        open_matrix()
    };
    let matrix = opened
        .map_err(IndexError::from)
        .with_context(|| format!("Failed to load embeddings from {}", embeddings.display()))?;
    if let Some(expected) = settings
        .build
        .expected_dimension
        .filter(|&expected| expected != matrix.dimension().get())
    {
        return Err(IndexError::Vector(VectorError::DimensionMismatch {
            expected,
            actual: matrix.dimension().get(),
        })
        .into());
    }

    let load_catalog = || MetadataCatalog::load(catalog_path);
    let loaded = if show_progress {
        display::with_spinner("Loading catalog", load_catalog)
    } else {
        load_catalog()
    };
    let catalog = loaded
        .map_err(IndexError::from)
        .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?;
    let store = VectorStore::new(matrix, catalog.release_ids()).map_err(IndexError::from)?;

    let params = settings.forest_params()?;
    let mut builder = ForestBuilder::new(params).with_threads(settings.build.parallel_threads);
    let progress =
        show_progress.then(|| display::create_progress_bar(params.tree_count as u64, "trees"));
    if let Some(progress) = &progress {
        builder = builder.with_progress(progress.clone());
    }

    let build_started = Instant::now();
    let forest = match settings.build.seed {
        Some(seed) => builder.build_seeded(&store, seed),
        None => builder.build(&store),
    }
    .map_err(IndexError::from)?;
    let build_millis = build_started.elapsed().as_millis() as u64;
    if let Some(progress) = progress {
        progress.finish_with_message("trees built");
    }

    let metadata = IndexMetadata::for_forest(&forest, settings.build.seed, build_millis);
    let stats = forest.stats();
    let snapshot = IndexSnapshot::new(store, forest, catalog, metadata)?;
    persistence.save(&snapshot)?;

    if format.is_json() {
        let summary = BuildSummary {
            index_path: settings.index_path.clone(),
            metadata: snapshot.metadata().clone(),
            stats,
        };
        let response = JsonResponse::success(summary).with_elapsed(started.elapsed());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!(
            "{}",
            THEME.success_with_icon(&format!(
                "Indexed {} releases into {}",
                THEME.apply(&THEME.number, snapshot.store().len()),
                settings.index_path.display()
            ))
        );
        println!(
            "{}",
            display::create_index_summary_table(snapshot.metadata(), &stats)
        );
    }
    Ok(ExitCode::Success)
}

fn open_recommender(settings: &Settings) -> Result<Recommender> {
    let persistence = IndexPersistence::new(&settings.index_path);
    let snapshot = persistence.load()?;
    Ok(Recommender::new(
        Arc::new(IndexHandle::new(snapshot)),
        RecommendConfig::from(settings),
    ))
}

/// Print an error in the requested format and pick the exit code.
fn report_error(error: &anyhow::Error, format: OutputFormat) -> ExitCode {
    let (response, exit_code) = if let Some(e) = error.downcast_ref::<IndexError>() {
        (JsonResponse::from_error(e), ExitCode::from_error(e))
    } else if let Some(e) = error.downcast_ref::<RecommendError>() {
        (
            JsonResponse::from_recommend_error(e),
            ExitCode::from_recommend_error(e),
        )
    } else {
        let response = JsonResponse {
            status: "error".to_string(),
            code: "GENERAL_ERROR".to_string(),
            message: format!("{error:#}"),
            data: None,
            suggestions: Vec::new(),
            exit_code: ExitCode::GeneralError as u8,
            execution_time_ms: None,
        };
        (response, ExitCode::GeneralError)
    };

    if format.is_json() {
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {error:#} ({e})"),
        }
    } else {
        eprintln!("{}", THEME.error_with_icon(&format!("{error:#}")));
        for suggestion in &response.suggestions {
            eprintln!("  {suggestion}");
        }
    }
    exit_code
}
