//! Runs a single pipeline stage over a JSON envelope.
//!
//! The stage input is read from stdin and the output is written to stdout,
//! so an external step host can chain the stages.

use std::env;
use std::io::{self, Read};
use std::process::exit;

use tracing::error;
use tracing_subscriber::EnvFilter;

use pipeline_module::pipeline::run_stage_json;
use pipeline_module::{PipelineConfig, PipelineContext, Stage};

fn print_usage() {
    eprintln!(
        r##"Usage: run-stage <stage> < input.json > output.json

Stages:
  normalize      {{"webhooks-signature", "rawinput"}} -> direct message envelope
  fetch-store    direct message envelope -> stored envelope
  analyze        stored envelope -> analyzed envelope
  reply          analyzed envelope -> sent reply payload

Environment Variables:
  CONSUMER_KEY, CONSUMER_SECRET_KEY   - provider app credentials
  OAUTH_TOKEN, OAUTH_SECRET           - provider access token
  PICTURE_BUCKET                      - bucket for downloaded media
  AWS_ACCESS_KEY_ID                   - face detection credentials
  AWS_SECRET_ACCESS_KEY
  OBJECT_STORE_BACKEND                - (optional) supabase, azure or memory
  RUST_LOG                            - (optional) log filter, logs go to stderr
"##
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(stage_arg) = args.first() else {
        print_usage();
        exit(2);
    };
    if stage_arg == "-h" || stage_arg == "--help" {
        print_usage();
        return;
    }
    let stage: Stage = match stage_arg.parse() {
        Ok(stage) => stage,
        Err(err) => {
            eprintln!("{}", err);
            print_usage();
            exit(2);
        }
    };

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {}", err);
            exit(1);
        }
    };
    let ctx = match PipelineContext::from_config(config) {
        Ok(ctx) => ctx,
        Err(err) => {
            error!("startup failed: {}", err);
            exit(1);
        }
    };

    let mut input = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut input) {
        error!("failed to read stdin: {}", err);
        exit(1);
    }

    match run_stage_json(&ctx, stage, &input).await {
        Ok(output) => println!("{}", output),
        Err(err) => {
            error!("stage {} failed: {}", stage, err);
            exit(1);
        }
    }
}
