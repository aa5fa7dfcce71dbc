//! ccfeed - CodePipeline build-status feed exporter
//!
//! Entry point for both invocation modes: a scheduled Lambda handler
//! (the default) and a one-shot local run.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use ccfeed::persist::{FileSink, S3Sink, Sink};
use ccfeed::pipeline::{CodePipelineStateProvider, StateProvider};
use ccfeed::{encode, translate};

/// Publishes AWS CodePipeline state as a CCTray build-status feed
///
/// Each invocation fetches one snapshot of every pipeline's stage states,
/// translates it into feed projects, and replaces the feed document at
/// the configured target.
#[derive(Parser, Debug)]
#[command(name = "ccfeed", version, about)]
struct Cli {
    /// The S3 bucket to write the feed to
    #[arg(long, env = "BUCKET")]
    bucket: Option<String>,

    /// The S3 object key to write the feed to
    #[arg(long, env = "KEY", default_value = "cc.xml")]
    key: String,

    /// A local file to write the feed to instead of S3
    #[arg(long)]
    file: Option<PathBuf>,

    /// Whether to run as a Lambda handler
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    lambda: bool,
}

/// Run one fetch-translate-encode-persist pass.
///
/// A fetch or persist failure is the invocation's single terminal error;
/// there is no retry and no partial success. The next scheduled
/// invocation starts from a fresh snapshot.
async fn update_feed(provider: &dyn StateProvider, sink: &dyn Sink) -> Result<()> {
    let states = provider
        .pipeline_states()
        .await
        .context("unable to get pipeline state")?;

    let feed = encode(&translate(&states))?;

    sink.persist(&feed).await.context("unable to persist feed")
}

/// Handle one scheduled Lambda invocation.
///
/// The scheduled trigger payload carries nothing the feed needs, so the
/// event is acknowledged and ignored.
async fn handle_request(
    _event: LambdaEvent<Value>,
    bucket: String,
    key: String,
) -> Result<String, lambda_runtime::Error> {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let provider = CodePipelineStateProvider::new(&config);
    let sink = S3Sink::new(&config, bucket, key);

    update_feed(&provider, &sink).await?;

    Ok("Done".to_string())
}

/// Register the Lambda handler and serve invocations until shutdown.
async fn run_lambda(cli: Cli) -> Result<()> {
    let Some(bucket) = cli.bucket else {
        bail!("must specify the bucket name and key");
    };
    let key = cli.key;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        handle_request(event, bucket.clone(), key.clone())
    }))
    .await
    .map_err(|error| anyhow::anyhow!("lambda runtime failed: {error}"))
}

/// Run a single update pass against the configured sink and exit.
async fn run_locally(cli: Cli) -> Result<()> {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;

    let sink: Box<dyn Sink> = match (&cli.file, &cli.bucket) {
        (Some(file), _) => Box::new(FileSink::new(file)),
        (None, Some(bucket)) => Box::new(S3Sink::new(&config, bucket.as_str(), cli.key.as_str())),
        (None, None) => bail!("must either specify the bucket name and key or a file"),
    };

    let provider = CodePipelineStateProvider::new(&config);
    update_feed(&provider, sink.as_ref()).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.lambda {
        run_lambda(cli).await
    } else {
        run_locally(cli).await
    }
}
