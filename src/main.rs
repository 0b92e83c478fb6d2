use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use slant::config::Config;
use slant::db::ArticleStore;
use slant::error::EngineError;
use slant::nlp::traits::FeatureAnalyzer;
use slant::output::terminal;
use slant::pipeline::{Pipeline, PipelineSettings};
use slant::scoring::bias::BiasWeights;
use slant::scoring::summary::{self, ReportFilter};
use slant::topics::cluster::AgglomerativeClusterer;

/// Slant: relative sentiment bias across news sources.
///
/// Groups articles into topics and measures how far each source's tone on
/// a topic sits from its peers covering the same story.
#[derive(Parser)]
#[command(name = "slant", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Download the ONNX sentiment and embedding models (~160 MB)
    DownloadModel,

    /// Import articles from a JSON Lines file
    Ingest {
        /// One {"url","source","title","published","text"} object per line
        path: PathBuf,
    },

    /// Run the full batch: features, topic clustering, relative bias
    Run {
        /// Skip feature extraction (no models needed)
        #[arg(long)]
        skip_features: bool,
    },

    /// Re-cluster embedded articles into topics
    Cluster {
        /// Number of topics to request (default: SLANT_TOPIC_COUNT)
        #[arg(long)]
        clusters: Option<usize>,
    },

    /// Recompute relative bias scores
    Bias,

    /// Show the bias report
    Report {
        /// Only include these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Only include these topics (repeatable, -1 = unclustered)
        #[arg(long = "topic", allow_negative_numbers = true)]
        topics: Vec<i64>,

        /// Number of flagged articles to list (default: 20)
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Show one article with its features and bias score
    Show {
        /// Article id (as listed in `report`)
        id: i64,
    },

    /// Show system status (DB stats, models, last run)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slant=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing Slant database...");
            let store = slant::db::initialize_sqlite(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  slant download-model");
            println!("  slant ingest articles.jsonl");
            println!("  slant run");
        }

        Commands::DownloadModel => {
            let model_dir = &config.model_dir;

            println!("Downloading ONNX models...");
            println!("  Destination: {}", model_dir.display());

            slant::nlp::download::download_models(model_dir).await?;

            println!("\n{}", "Models downloaded successfully.".bold());
            println!("You can now run `slant run`.");
        }

        Commands::Ingest { path } => {
            let store = slant::db::open_sqlite(&config.db_path)?;
            let outcome = slant::ingest::ingest_file(store.as_ref(), &path).await?;
            terminal::display_ingest_outcome(&outcome);
        }

        Commands::Run { skip_features } => {
            let store = slant::db::open_sqlite(&config.db_path)?;
            let analyzer = if skip_features {
                None
            } else {
                config.require_models()?;
                Some(load_analyzer(&config)?)
            };
            let pipeline = build_pipeline(&config, store, analyzer);
            let run_summary = pipeline.run().await?;
            terminal::display_run_summary(&run_summary);
        }

        Commands::Cluster { clusters } => {
            let store = slant::db::open_sqlite(&config.db_path)?;
            let pipeline = build_pipeline(&config, store, None);
            let outcome = pipeline.run_clustering(clusters).await?;
            terminal::display_cluster_outcome(&outcome);
        }

        Commands::Bias => {
            let store = slant::db::open_sqlite(&config.db_path)?;
            let pipeline = build_pipeline(&config, store, None);
            let outcome = pipeline.run_bias().await?;
            terminal::display_bias_outcome(&outcome);
        }

        Commands::Report {
            sources,
            topics,
            top,
        } => {
            let store = slant::db::open_sqlite(&config.db_path)?;
            let articles = store.list_articles(config.article_limit).await?;
            let filter = ReportFilter { sources, topics };

            terminal::display_flagged_articles(&summary::top_flagged(&articles, &filter, top));
            terminal::display_source_distribution(&summary::source_distribution(
                &articles, &filter,
            ));
            terminal::display_topic_sentiment(&summary::topic_sentiment_by_source(
                &articles, &filter,
            ));
            terminal::display_sentiment_trend(&summary::sentiment_trend(&articles, &filter));
        }

        Commands::Show { id } => {
            let store = slant::db::open_sqlite(&config.db_path)?;
            let article = store
                .get_article(id)
                .await?
                .ok_or(EngineError::NotFound(id))?;
            terminal::display_article(&article);
        }

        Commands::Status => {
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `slant init` to set up the database.");
                return Ok(());
            }
            let store = slant::db::open_sqlite(&config.db_path)?;
            slant::status::show(&store, &config.db_path, &config.model_dir).await?;
        }
    }

    Ok(())
}

fn load_analyzer(config: &Config) -> Result<Arc<dyn FeatureAnalyzer>> {
    info!("Loading local ONNX models");
    let analyzer = slant::nlp::LocalAnalyzer::load(&config.model_dir)?;
    Ok(Arc::new(analyzer))
}

fn build_pipeline(
    config: &Config,
    store: Arc<dyn ArticleStore>,
    analyzer: Option<Arc<dyn FeatureAnalyzer>>,
) -> Pipeline {
    info!(linkage = %config.linkage, topics = config.topic_count, "Building pipeline");
    Pipeline::new(
        store,
        analyzer,
        Arc::new(AgglomerativeClusterer::new(config.linkage)),
        PipelineSettings {
            cluster: config.cluster_options(),
            weights: BiasWeights::default(),
            lock_stale_secs: config.lock_stale_secs,
        },
    )
}
