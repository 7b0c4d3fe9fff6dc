//! Command implementations for the kalends binary.

use std::sync::Arc;

use kalends::{
    get_metrics, EventPipeline, EventRequest, FailurePatternStore, FileKvStore, KvStore,
    OutcomeLog, PipelineOutcome, RecoveryConfig, RequestCache, Result, UnavailableParser,
};

async fn open_store(config: &RecoveryConfig) -> Result<Arc<dyn KvStore>> {
    let dir = config.data_dir()?;
    Ok(Arc::new(FileKvStore::open(dir).await?))
}

/// Run a request through the pipeline and print what comes back.
pub async fn run_parse(
    config: RecoveryConfig,
    text: String,
    offline: bool,
    no_interaction: bool,
    json: bool,
) -> Result<()> {
    let store = open_store(&config).await?;
    let pipeline = EventPipeline::new(config, Arc::new(UnavailableParser), store);

    let request = EventRequest::new(text)
        .with_network_available(!offline)
        .with_user_interaction_allowed(!no_interaction);
    let outcome = pipeline.process(request).await?;

    match outcome {
        PipelineOutcome::Event(processed) => {
            if json {
                println!("{}", serde_json::to_string_pretty(processed.event())?);
            } else {
                let event = processed.event();
                println!("Title:       {}", event.title);
                if let Some(start) = event.start {
                    println!("Start:       {}", start.to_rfc3339());
                }
                if let Some(end) = event.end {
                    println!("End:         {}", end.to_rfc3339());
                }
                if let Some(location) = &event.location {
                    println!("Location:    {location}");
                }
                println!("Confidence:  {:.2}", event.confidence);
                println!(
                    "Recommendation: {}",
                    processed.assessment.recommendation.display_name()
                );
                if let Some(reason) = &event.fallback_reason {
                    println!("Fallback:    {reason}");
                }
                for suggestion in &processed.assessment.suggestions {
                    println!("Suggestion:  {}", suggestion.message);
                }
            }
        }
        PipelineOutcome::ActionRequired {
            action, message, ..
        } => {
            println!("Action required: {}", action.display_name());
            println!("{message}");
        }
        PipelineOutcome::Failed { strategy, message } => {
            println!("Failed ({})", strategy.display_name());
            println!("{message}");
        }
        PipelineOutcome::Cancelled => println!("Cancelled"),
    }
    Ok(())
}

/// Show cached requests awaiting retry.
pub async fn run_cache_list(config: RecoveryConfig, json: bool) -> Result<()> {
    let store = open_store(&config).await?;
    let cache = RequestCache::new(store)
        .with_capacity(config.cache.size)
        .with_expiry_hours(config.cache.expiry_hours);
    let requests = cache.all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&requests)?);
        return Ok(());
    }
    if requests.is_empty() {
        println!("No cached requests.");
        return Ok(());
    }
    for request in requests {
        println!(
            "[{}] retries={} kind={} text={:?}",
            request.timestamp,
            request.retry_count,
            request.kind.display_name(),
            request.text
        );
    }
    Ok(())
}

/// Drop all cached requests.
pub async fn run_cache_clear(config: RecoveryConfig) -> Result<()> {
    let store = open_store(&config).await?;
    let cache = RequestCache::new(store);
    cache.clear().await?;
    println!("Request cache cleared.");
    Ok(())
}

/// Aggregate recovery statistics from the outcome log.
pub async fn run_stats(config: RecoveryConfig, json: bool) -> Result<()> {
    let store = open_store(&config).await?;
    let outcomes = OutcomeLog::new(store.clone());
    let patterns = FailurePatternStore::new(store);

    let stats = outcomes.stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Recorded outcomes: {}", stats.total);
    println!(
        "Recovery success rate: {:.0}%",
        stats.success_rate() * 100.0
    );
    let mut by_kind: Vec<_> = stats.by_kind.iter().collect();
    by_kind.sort_by(|a, b| b.1.cmp(a.1));
    for (kind, count) in by_kind {
        println!("  {kind}: {count}");
    }

    let ranked = patterns.ranked().await?;
    if !ranked.is_empty() {
        println!("Most frequent failure shapes:");
        for (key, count) in ranked.iter().take(5) {
            println!("  {key}: {count}");
        }
    }
    Ok(())
}

/// Print current metrics in Prometheus text format.
pub fn run_metrics() -> Result<()> {
    print!("{}", get_metrics().export_prometheus());
    Ok(())
}
