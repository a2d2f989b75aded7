//! Command-line interface definitions for the ticker news pipeline.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Inference endpoint settings can be provided via command-line flags or
//! environment variables.

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::inference::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::models::Symbol;

/// Command-line arguments for the ticker news pipeline.
///
/// # Examples
///
/// ```sh
/// # One symbol
/// ticker_news_sentiment run article --quote NFLX
///
/// # Several symbols
/// ticker_news_sentiment run article --quotes NFLX,TSLA,NVDA
///
/// # Against a local OpenAI-compatible endpoint
/// ticker_news_sentiment run article --quote AMD \
///     --inference-url http://localhost:8080/v1 --inference-model my-model
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a data pipeline feature for a set of ticker symbols
    Run {
        /// The pipeline feature to run (currently only `article`)
        feature: String,

        /// A single ticker symbol to analyze
        #[arg(long)]
        quote: Option<String>,

        /// Comma-separated ticker symbols to analyze
        #[arg(long)]
        quotes: Option<String>,

        /// Root directory for pipeline artifacts
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Maximum simultaneous in-flight article extractions, all
        /// symbols combined
        #[arg(long, default_value_t = 5)]
        extraction_concurrency: usize,

        /// Base URL of an OpenAI-compatible chat completions endpoint
        #[arg(long, env = "INFERENCE_BASE_URL", default_value = DEFAULT_BASE_URL)]
        inference_url: String,

        /// Model identifier sent with every classification request
        #[arg(long, env = "INFERENCE_MODEL", default_value = DEFAULT_MODEL)]
        inference_model: String,

        /// Bearer token for the inference endpoint
        #[arg(long, env = "HUGGINGFACE_API_KEY", hide_env_values = true)]
        inference_api_key: Option<String>,
    },
}

/// Ways the symbol arguments can be unusable.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum SymbolArgsError {
    /// `--quote` holds a comma; the caller probably meant `--quotes`.
    #[error("--quote takes a single symbol; use --quotes for a comma-separated list")]
    CommaInQuote,

    /// Neither argument produced a symbol.
    #[error("no ticker symbols given; pass --quote or --quotes")]
    NoSymbols,
}

/// Merge `--quote` and `--quotes` into a deduplicated symbol list.
///
/// Symbols are normalized to canonical form, so `nflx` and `NFLX` collapse
/// into one. The result is sorted for stable run order.
pub fn resolve_symbols(
    quote: Option<&str>,
    quotes: Option<&str>,
) -> Result<Vec<Symbol>, SymbolArgsError> {
    let mut symbols = Vec::new();

    if let Some(quote) = quote {
        if quote.contains(',') {
            return Err(SymbolArgsError::CommaInQuote);
        }
        symbols.push(Symbol::new(quote));
    }

    if let Some(quotes) = quotes {
        symbols.extend(quotes.split(',').map(Symbol::new));
    }

    symbols.retain(|symbol| !symbol.is_empty());
    symbols.sort();
    symbols.dedup();

    if symbols.is_empty() {
        return Err(SymbolArgsError::NoSymbols);
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_run(args: &[&str]) -> Command {
        let mut argv = vec!["ticker_news_sentiment"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv).command
    }

    #[test]
    fn test_cli_parsing_defaults() {
        let Command::Run {
            feature,
            quote,
            quotes,
            data_dir,
            extraction_concurrency,
            inference_url,
            inference_model,
            ..
        } = parse_run(&["run", "article", "--quote", "NFLX"]);

        assert_eq!(feature, "article");
        assert_eq!(quote.as_deref(), Some("NFLX"));
        assert!(quotes.is_none());
        assert_eq!(data_dir, "./data");
        assert_eq!(extraction_concurrency, 5);
        assert_eq!(inference_url, DEFAULT_BASE_URL);
        assert_eq!(inference_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_cli_parsing_overrides() {
        let Command::Run {
            quotes,
            data_dir,
            extraction_concurrency,
            ..
        } = parse_run(&[
            "run",
            "article",
            "--quotes",
            "NFLX,TSLA",
            "--data-dir",
            "/var/pipeline",
            "--extraction-concurrency",
            "3",
        ]);

        assert_eq!(quotes.as_deref(), Some("NFLX,TSLA"));
        assert_eq!(data_dir, "/var/pipeline");
        assert_eq!(extraction_concurrency, 3);
    }

    #[test]
    fn test_resolve_symbols_merges_and_dedupes() {
        let symbols = resolve_symbols(Some("nflx"), Some("TSLA,NFLX,nvda")).unwrap();
        assert_eq!(
            symbols,
            vec![Symbol::new("NFLX"), Symbol::new("NVDA"), Symbol::new("TSLA")]
        );
    }

    #[test]
    fn test_resolve_symbols_rejects_comma_in_quote() {
        assert_eq!(
            resolve_symbols(Some("NFLX,TSLA"), None),
            Err(SymbolArgsError::CommaInQuote)
        );
    }

    #[test]
    fn test_resolve_symbols_requires_at_least_one() {
        assert_eq!(resolve_symbols(None, None), Err(SymbolArgsError::NoSymbols));
        assert_eq!(
            resolve_symbols(None, Some(",, ,")),
            Err(SymbolArgsError::NoSymbols)
        );
    }

    #[test]
    fn test_resolve_symbols_skips_empty_pieces() {
        let symbols = resolve_symbols(None, Some("AMD,,INTC,")).unwrap();
        assert_eq!(symbols, vec![Symbol::new("AMD"), Symbol::new("INTC")]);
    }
}
