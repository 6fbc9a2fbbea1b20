use anyhow::Result;
use clap::Parser;
use kustomize_builder::{server, ServerArgs};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();
    let (host, port) = (args.host.clone(), args.port);
    let context = args.into_context();

    let probe = context.tool.probe_version().await;
    if probe.is_success() {
        info!(version = %probe.stdout().trim(), "kustomize found");
    } else {
        warn!(
            binary = %context.tool.program().to_string_lossy(),
            error = probe.message().unwrap_or(probe.stderr().trim()),
            "kustomize is not available; builds will fail until it is installed"
        );
    }

    info!(
        samples = %context.samples.dir().display(),
        workspace_root = %context.workspace_root.display(),
        timeout = %humantime::format_duration(context.build_timeout),
        "starting kustomize builder"
    );
    server::serve(&host, port, context).await
}
