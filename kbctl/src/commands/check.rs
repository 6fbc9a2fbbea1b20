//! Probe for a working kustomize install

use anyhow::{bail, Result};
use build_exec::{ExternalTool, OutcomeKind, VERSION_PROBE_TIMEOUT};
use clap::Args;
use kustomize_builder::config::DEFAULT_KUSTOMIZE_BIN;
use tracing::debug;

use super::{fail_mark, ok_mark};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// kustomize binary to probe
    #[arg(long = "kustomize", env = "KUSTOMIZE_BIN", default_value = DEFAULT_KUSTOMIZE_BIN)]
    pub kustomize_bin: String,
}

pub async fn run(args: CheckArgs) -> Result<()> {
    let tool = ExternalTool::new(&args.kustomize_bin);
    let result = tool.probe_version().await;
    debug!(outcome = ?result.kind(), duration_ms = result.duration_ms(), "version probe finished");

    match result.kind() {
        OutcomeKind::Success => {
            println!("{} kustomize {}", ok_mark(), result.stdout().trim());
            Ok(())
        }
        OutcomeKind::Timeout => {
            println!("{} '{} version' did not answer", fail_mark(), args.kustomize_bin);
            bail!(
                "kustomize did not respond within {}s",
                VERSION_PROBE_TIMEOUT.as_secs()
            )
        }
        OutcomeKind::ToolFailure => {
            println!("{} '{} version' failed", fail_mark(), args.kustomize_bin);
            bail!("kustomize version failed: {}", result.stderr().trim())
        }
        OutcomeKind::InfrastructureError => {
            println!("{} kustomize not found", fail_mark());
            println!("  Install it from https://kubectl.docs.kubernetes.io/installation/kustomize/");
            println!("  or point KUSTOMIZE_BIN at an existing binary.");
            bail!("{}", result.message().unwrap_or("kustomize is not available"))
        }
    }
}
