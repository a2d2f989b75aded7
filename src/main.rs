use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use ticker_news_sentiment::chrome::ChromeDriver;
use ticker_news_sentiment::cli::{Cli, Command, resolve_symbols};
use ticker_news_sentiment::inference::InferenceClient;
use ticker_news_sentiment::pipeline::Pipeline;
use ticker_news_sentiment::store::DataStore;
use ticker_news_sentiment::{PipelineError, Result};

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ticker_news_sentiment starting up");

    // Parse CLI
    let args = Cli::parse();
    let Command::Run {
        feature,
        quote,
        quotes,
        data_dir,
        extraction_concurrency,
        inference_url,
        inference_model,
        inference_api_key,
    } = args.command;
    debug!(%feature, ?quote, ?quotes, %data_dir, "Parsed CLI arguments");

    if feature.to_lowercase() != "article" {
        error!(feature = %feature, "No pipeline is mapped to this feature");
        return Err(PipelineError::Setup(format!(
            "no pipeline is mapped to feature `{feature}`"
        )));
    }

    let symbols = match resolve_symbols(quote.as_deref(), quotes.as_deref()) {
        Ok(symbols) => symbols,
        Err(e) => {
            error!(error = %e, "Unusable symbol arguments; nothing to do");
            return Err(PipelineError::Setup(e.to_string()));
        }
    };
    info!(symbols = ?symbols, "Resolved ticker symbols");

    // Early check: ensure the data directories are writable
    let store = DataStore::new(&data_dir);
    if let Err(e) = store.ensure_layout().await {
        error!(
            path = %data_dir,
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let classifier = Arc::new(InferenceClient::new(
        &inference_url,
        &inference_model,
        inference_api_key,
    ));
    info!(url = %inference_url, model = %inference_model, "Inference client ready");

    let driver = Arc::new(ChromeDriver::launch().await?);

    let run_date = Local::now().date_naive();
    let pipeline = Pipeline::new(
        Arc::clone(&driver),
        classifier,
        store,
        extraction_concurrency,
        run_date,
    );
    pipeline.run(&symbols).await;

    if let Err(e) = driver.shutdown().await {
        warn!(error = %e, "Browser shutdown reported an error");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
