use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vidrecall_embeddings::EmbeddingService;
use vidrecall_retrieval::{
    CatalogFilters, HybridTextFilter, Match, RetrievalEngine, RetrievalRequest, RetrievalResponse,
    TemporalGroup, WeaviateHybridClient,
};
use vidrecall_vector_index::LanceKeyframeIndex;

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Query text; repeat for a temporal search over consecutive moments
    #[arg(short = 'q', long = "query", value_name = "TEXT")]
    pub queries: Vec<String>,

    /// Number of results (defaults to [retrieval] default_top_k)
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Keyframes kept per query in temporal mode
    #[arg(long)]
    pub top_k_per_query: Option<usize>,

    /// Restrict to a pack, e.g. K01 (repeatable)
    #[arg(long = "pack", value_name = "PACK")]
    pub packs: Vec<String>,

    /// Restrict to a video, e.g. K01_V001 (repeatable)
    #[arg(long = "video", value_name = "VIDEO_ID")]
    pub videos: Vec<String>,

    /// Exclude a video, e.g. K01_V003 (repeatable)
    #[arg(long = "exclude", value_name = "VIDEO_ID")]
    pub excluded_videos: Vec<String>,

    /// Secondary-language query used to narrow results through [hybrid]
    #[arg(long, value_name = "TEXT")]
    pub language_query: Option<String>,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    fn to_request(&self) -> RetrievalRequest {
        RetrievalRequest {
            queries: self.queries.clone(),
            top_k: self.top_k,
            top_k_per_query: self.top_k_per_query,
            filters: CatalogFilters {
                packs: self.packs.clone(),
                videos: self.videos.clone(),
                excluded_videos: self.excluded_videos.clone(),
            },
            language_query: self.language_query.clone(),
        }
    }
}

pub(crate) async fn run_search(config_path: Option<&Path>, args: SearchArgs) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    config.validate()?;

    let engine = build_engine(&config).await?;
    let request = args.to_request();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling search");
            on_interrupt.cancel();
        }
    });

    let response = engine.retrieve_with_cancel(&request, &cancel).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to encode response")?
        );
    } else {
        print_response(&response);
    }
    Ok(())
}

async fn build_engine(config: &AppConfig) -> Result<RetrievalEngine> {
    let index = LanceKeyframeIndex::open(config.index.clone())
        .await
        .with_context(|| format!("Failed to open index at {}", config.index.path.display()))?;
    info!("Index holds {} keyframes", index.count().await?);

    let embedder = EmbeddingService::with_config(config.embedding.clone())
        .context("Failed to initialize query encoder")?;

    let engine = RetrievalEngine::new(config.retrieval.clone(), Arc::new(index), Arc::new(embedder))
        .context("Failed to initialize retrieval engine")?;

    let Some(hybrid) = &config.hybrid else {
        return Ok(engine);
    };

    let backend = WeaviateHybridClient::new(hybrid.weaviate.clone())
        .context("Failed to initialize Weaviate client")?;
    let language_embedder = EmbeddingService::with_config(hybrid.embedding.clone())
        .context("Failed to initialize language query encoder")?;

    Ok(engine.with_hybrid_filter(HybridTextFilter::new(
        Arc::new(backend),
        Arc::new(language_embedder),
    )))
}

fn print_response(response: &RetrievalResponse) {
    match response {
        RetrievalResponse::Empty => {
            println!("{} Nothing to search: give a --query or a filter", "✗".bright_red());
        }
        RetrievalResponse::Ranked { results } | RetrievalResponse::FilterOnly { results }
            if results.is_empty() =>
        {
            println!("{} No results found", "✗".bright_red());
        }
        RetrievalResponse::Ranked { results } => {
            println!(
                "{} Found {} keyframes\n",
                "✓".bright_green(),
                results.len().to_string().bright_cyan()
            );
            print_matches(results, true);
        }
        RetrievalResponse::FilterOnly { results } => {
            println!(
                "{} {} keyframes match the filters (unranked)\n",
                "✓".bright_green(),
                results.len().to_string().bright_cyan()
            );
            print_matches(results, false);
        }
        RetrievalResponse::Temporal { results } if results.is_empty() => {
            println!("{} No video matched every query", "✗".bright_red());
        }
        RetrievalResponse::Temporal { results } => {
            println!(
                "{} {} videos matched every query\n",
                "✓".bright_green(),
                results.len().to_string().bright_cyan()
            );
            for (i, group) in results.iter().enumerate() {
                print_group(i + 1, group);
            }
        }
    }
}

fn print_matches(matches: &[Match], ranked: bool) {
    for (i, m) in matches.iter().enumerate() {
        let score = if ranked {
            format!("{:.3}", m.score)
        } else {
            "-".to_string()
        };
        println!(
            "{}. {} {} {}",
            (i + 1).to_string().bright_yellow(),
            m.video_id.bright_cyan(),
            format!("frame {} (#{})", m.frame, m.frame_index).bright_black(),
            score.bright_green()
        );
    }
}

fn print_group(rank: usize, group: &TemporalGroup) {
    println!(
        "{}. {} {} {:.3}",
        rank.to_string().bright_yellow(),
        group.video_id.bright_cyan(),
        "score".bright_black(),
        group.aggregate_score()
    );
    for bucket in &group.query_results {
        let frames: Vec<String> = bucket
            .keyframes
            .iter()
            .map(|m| format!("{}@{:.2}", m.frame, m.score))
            .collect();
        println!("   {} {}", format!("{}:", bucket.query).bright_black(), frames.join(" "));
    }
    println!();
}
