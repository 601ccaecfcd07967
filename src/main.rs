use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use talentmatch::config::AppConfig;
use talentmatch::cost::CostTracker;
use talentmatch::database::Database;
use talentmatch::embeddings::EmbeddingClient;
use talentmatch::embeddings::EmbeddingIndexer;
use talentmatch::llm::LlmClient;
use talentmatch::matching::CandidateRetriever;
use talentmatch::matching::DeepEvaluator;
use talentmatch::matching::MatchEngine;
use talentmatch::profile::ProfileExtractor;
use talentmatch::tasks::TaskRegistry;
use talentmatch::Result;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "talentmatch")]
#[command(about = "AI candidate-job matching engine for recruiting agencies")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema (tables, enum, pgvector extension)
    Init {
        /// Skip creating vector/btree indexes
        #[arg(long)]
        skip_indexes: bool,
    },
    /// Match one job against the candidate pool
    MatchJob {
        /// Job id to match
        job_id: Uuid,
        /// Number of candidates to retrieve (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Geographic cutoff in km (default from config)
        #[arg(long)]
        max_distance_km: Option<f64>,
    },
    /// Match every active job in a category
    MatchAll {
        /// Category to match (e.g. finance)
        category: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        max_distance_km: Option<f64>,
    },
    /// Extract structured profiles for owners that lack one
    BackfillProfiles {
        /// Restrict to one category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Generate embeddings for owners that lack one
    EmbedMissing {
        /// Restrict to one category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Force-regenerate the embedding for one candidate or job
    ReEmbed {
        /// Owner kind
        #[arg(value_enum)]
        kind: OwnerArg,
        /// Owner id
        id: Uuid,
    },
    /// Flag matches whose candidate or job changed after scoring
    DetectStale,
    /// Show profile, embedding and match coverage
    Stats,
    /// Show current configuration
    Config,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum OwnerArg {
    Candidate,
    Job,
}

/// Wired-up service graph shared by the command handlers
struct Services {
    db: Arc<Database>,
    costs: Arc<CostTracker>,
    extractor: ProfileExtractor,
    indexer: Arc<EmbeddingIndexer>,
    engine: MatchEngine,
}

impl Services {
    fn build(config: &AppConfig, db: Arc<Database>) -> Result<Self> {
        let costs = Arc::new(CostTracker::new());
        let registry = TaskRegistry::new();

        let llm = Arc::new(LlmClient::from_config(&config.llm)?);
        let embed_client = Arc::new(EmbeddingClient::from_config(&config.embeddings)?);

        let indexer = Arc::new(EmbeddingIndexer::new(
            Arc::clone(&db),
            embed_client,
            Arc::clone(&costs),
            config.embeddings.clone(),
            registry.clone(),
            config.matching.commit_every,
            config.matching.max_errors,
        ));
        let retriever = CandidateRetriever::new(Arc::clone(&db), Arc::clone(&indexer));
        let evaluator = DeepEvaluator::new(
            Arc::clone(&llm),
            Arc::clone(&costs),
            config.llm.clone(),
        );
        let engine = MatchEngine::new(
            Arc::clone(&db),
            retriever,
            evaluator,
            Arc::clone(&costs),
            registry,
            config.matching.clone(),
        );
        let extractor = ProfileExtractor::new(
            Arc::clone(&db),
            llm,
            Arc::clone(&costs),
            config.llm.clone(),
            config.matching.max_errors,
        );

        Ok(Self {
            db,
            costs,
            extractor,
            indexer,
            engine,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        talentmatch::logging::init_logging_with_level("debug")?;
    } else {
        talentmatch::logging::init_logging()?;
    }

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    let db = Arc::new(Database::from_config(&config).await?);

    if let Commands::Init { skip_indexes } = &cli.command {
        db.init_schema(config.embedding_dimension(), *skip_indexes)
            .await?;
        println!(
            "Schema initialized (embedding dimension {})",
            config.embedding_dimension()
        );
        return Ok(());
    }
    db.verify_schema_or_error().await?;

    if let Commands::Config = &cli.command {
        return handle_config_command(&config);
    }

    let services = Services::build(&config, db)?;

    match cli.command {
        Commands::Init { .. } | Commands::Config => unreachable!("handled above"),
        Commands::MatchJob {
            job_id,
            top_k,
            max_distance_km,
        } => {
            handle_match_job(&services, job_id, top_k, max_distance_km).await?;
        }
        Commands::MatchAll {
            category,
            top_k,
            max_distance_km,
        } => {
            handle_match_all(&services, &category, top_k, max_distance_km).await?;
        }
        Commands::BackfillProfiles { category } => {
            handle_backfill_profiles(&services, category.as_deref()).await?;
        }
        Commands::EmbedMissing { category } => {
            handle_embed_missing(&services, category.as_deref()).await?;
        }
        Commands::ReEmbed { kind, id } => {
            handle_re_embed(&services, kind, id).await?;
        }
        Commands::DetectStale => {
            let flagged = services.db.detect_stale_matches().await?;
            println!("Flagged {flagged} matches as stale");
        }
        Commands::Stats => {
            handle_stats(&services).await?;
        }
    }

    Ok(())
}

async fn handle_match_job(
    services: &Services,
    job_id: Uuid,
    top_k: Option<usize>,
    max_distance_km: Option<f64>,
) -> Result<()> {
    let report = services.engine.match_job(job_id, top_k, max_distance_km).await?;

    println!("Matched job {job_id}:");
    for entry in &report.candidates {
        let distance = entry
            .distance_km
            .map_or_else(|| "n/a".to_string(), |d| format!("{d:.1} km"));
        let marker = if entry.evaluated { "" } else { " (evaluation failed)" };
        println!(
            "  - {} | similarity {:.4} | score {:.2} | {}{}",
            entry.candidate_id, entry.similarity, entry.ai_score, distance, marker
        );
    }
    println!(
        "{} created, {} updated, {} errors, cost ${:.4}",
        report.matches_created,
        report.matches_updated,
        report.errors.len(),
        report.total_cost_usd
    );
    for error in &report.errors {
        println!("  error: {error}");
    }

    Ok(())
}

async fn handle_match_all(
    services: &Services,
    category: &str,
    top_k: Option<usize>,
    max_distance_km: Option<f64>,
) -> Result<()> {
    let report = services
        .engine
        .match_all(category, top_k, max_distance_km, |step, detail| {
            println!("[{step}] {detail}");
        })
        .await?;

    println!();
    println!(
        "Matched {}/{} jobs: {} created, {} updated, {} errors, cost ${:.4}",
        report.jobs_matched,
        report.jobs_total,
        report.matches_created,
        report.matches_updated,
        report.errors.len(),
        report.total_cost_usd
    );
    for error in &report.errors {
        println!("  error: {error}");
    }

    Ok(())
}

async fn handle_backfill_profiles(services: &Services, category: Option<&str>) -> Result<()> {
    let stats = services.extractor.extract_all_missing(category).await?;

    println!(
        "Profile backfill: {} total, {} extracted, {} skipped, {} errors, cost ${:.4}",
        stats.total,
        stats.extracted,
        stats.skipped,
        stats.errors,
        services.costs.total_cost()
    );
    for error in &stats.error_samples {
        println!("  error: {error}");
    }

    Ok(())
}

async fn handle_embed_missing(services: &Services, category: Option<&str>) -> Result<()> {
    let stats = services.indexer.embed_all_missing(category).await?;

    println!(
        "Embedding backfill: {} total, {} embedded, {} skipped, {} errors, cost ${:.4}",
        stats.total,
        stats.embedded,
        stats.skipped,
        stats.errors,
        services.costs.total_cost()
    );
    for error in &stats.error_samples {
        println!("  error: {error}");
    }

    Ok(())
}

async fn handle_re_embed(services: &Services, kind: OwnerArg, id: Uuid) -> Result<()> {
    match kind {
        OwnerArg::Candidate => services.indexer.re_embed_candidate(id).await?,
        OwnerArg::Job => services.indexer.re_embed_job(id).await?,
    }
    println!("Embedding regenerated for {id}");
    Ok(())
}

async fn handle_stats(services: &Services) -> Result<()> {
    let profiles = services.db.get_profile_stats().await?;
    let embeddings = services.db.get_embedding_stats().await?;
    let status_counts = services.db.match_status_counts().await?;
    let stale = services.db.count_stale_matches().await?;

    println!("Coverage");
    println!("========");
    println!(
        "  Candidates: {} total | {} profiled ({:.1}%) | {} embedded ({:.1}%)",
        profiles.candidates_total,
        profiles.candidates_profiled,
        profiles.candidate_coverage(),
        embeddings.candidates_embedded,
        embeddings.candidate_coverage()
    );
    println!(
        "  Jobs:       {} total | {} profiled ({:.1}%) | {} embedded ({:.1}%)",
        profiles.jobs_total,
        profiles.jobs_profiled,
        profiles.job_coverage(),
        embeddings.jobs_embedded,
        embeddings.job_coverage()
    );

    println!();
    println!("Matches");
    println!("=======");
    for (status, count) in &status_counts {
        println!("  {:<12} {}", status.as_str(), count);
    }
    println!("  {:<12} {}", "stale", stale);

    Ok(())
}

fn handle_config_command(config: &AppConfig) -> Result<()> {
    println!("Database:");
    println!("  URL: {}", mask_database_url(config.database_url()));
    println!("  Max connections: {}", config.max_connections());
    println!();
    println!("Logging:");
    println!("  Level: {}", config.logging.level);
    println!();
    println!("Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!();
    println!("LLM:");
    println!("  Endpoint: {}", config.llm.endpoint);
    println!("  Model: {}", config.llm.model);
    println!();
    println!("Matching:");
    println!("  Top-K: {}", config.matching.top_k);
    println!("  Max distance: {} km", config.matching.max_distance_km);
    println!("  Commit every: {}", config.matching.commit_every);

    Ok(())
}

/// Mask database URL for display (hide password)
fn mask_database_url(url: &str) -> String {
    match url.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{host}"),
        None => url.to_string(),
    }
}
