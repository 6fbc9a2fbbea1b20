//! End-to-end check against a running server

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{fail_mark, ok_mark};

const DEFAULT_DOCUMENT: &str = include_str!("../../../samples/qoin-helm.yaml");

#[derive(Args, Debug)]
pub struct SmokeArgs {
    /// Base URL of the kustomize builder
    #[arg(long, env = "KB_URL", default_value = "http://localhost:5000")]
    pub url: String,

    /// Kustomization to submit (defaults to the bundled qoin example)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Per-request timeout, e.g. "45s"
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ValidateReply {
    valid: bool,
    error: Option<String>,
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    success: bool,
    output: Option<String>,
    error: Option<String>,
}

pub async fn run(args: SmokeArgs) -> Result<()> {
    let document = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => DEFAULT_DOCUMENT.to_string(),
    };
    let base = args.url.trim_end_matches('/');
    let client = reqwest::Client::builder().timeout(args.timeout).build()?;
    let payload = json!({ "yaml_content": document });
    let mut failures = 0;

    info!(url = %base, bytes = document.len(), "starting smoke run");

    let validate: ValidateReply = client
        .post(format!("{}/validate", base))
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("POST {}/validate", base))?
        .json()
        .await
        .context("decoding /validate response")?;
    if validate.valid {
        println!("{} validate", ok_mark());
        if let Some(warning) = validate.warning {
            println!("  note: {}", warning);
        }
    } else {
        failures += 1;
        println!(
            "{} validate: {}",
            fail_mark(),
            validate.error.unwrap_or_default()
        );
    }

    let generate: GenerateReply = client
        .post(format!("{}/generate", base))
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("POST {}/generate", base))?
        .json()
        .await
        .context("decoding /generate response")?;
    if generate.success {
        let output = generate.output.unwrap_or_default();
        println!("{} generate ({} lines)", ok_mark(), output.lines().count());
    } else {
        failures += 1;
        println!(
            "{} generate: {}",
            fail_mark(),
            generate.error.unwrap_or_default().trim()
        );
    }

    if failures > 0 {
        bail!("{} of 2 smoke steps failed", failures);
    }
    Ok(())
}
