use std::path::PathBuf;
use std::time::Duration;

use build_exec::{run_build, BuildResponse, ExternalTool, DEFAULT_TIMEOUT};
use clap::Parser;
use manifest_scripts::ScriptBundle;
use tracing::{info, instrument};

use crate::samples::SampleCatalog;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_KUSTOMIZE_BIN: &str = "kustomize";
pub const DEFAULT_SAMPLES_DIR: &str = "samples";

/// Command-line and environment configuration for the web server.
#[derive(Debug, Clone, Parser)]
#[command(name = "kustomize-builder", version, about = "Web front-end for kustomize builds")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "KB_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Port to listen on
    #[arg(long, env = "KB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// kustomize binary used for builds
    #[arg(long, env = "KUSTOMIZE_BIN", default_value = DEFAULT_KUSTOMIZE_BIN)]
    pub kustomize_bin: String,
    /// Directory holding example kustomizations
    #[arg(long, env = "KB_SAMPLES_DIR", default_value = DEFAULT_SAMPLES_DIR)]
    pub samples_dir: PathBuf,
    /// Parent directory for per-request build workspaces (defaults to the system temp dir)
    #[arg(long, env = "KB_WORKSPACE_ROOT")]
    pub workspace_root: Option<PathBuf>,
    /// Wall-clock limit for a single build, e.g. "30s" or "2m"
    #[arg(
        long,
        env = "KB_BUILD_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub build_timeout: Duration,
}

impl ServerArgs {
    pub fn into_context(self) -> AppContext {
        let mut context = AppContext::new(
            ExternalTool::kustomize(self.kustomize_bin),
            SampleCatalog::new(self.samples_dir),
        )
        .with_build_timeout(self.build_timeout);
        if let Some(root) = self.workspace_root {
            context = context.with_workspace_root(root);
        }
        context
    }
}

/// Immutable per-process state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub tool: ExternalTool,
    pub build_timeout: Duration,
    pub workspace_root: PathBuf,
    pub samples: SampleCatalog,
}

impl AppContext {
    pub fn new(tool: ExternalTool, samples: SampleCatalog) -> Self {
        Self {
            tool,
            build_timeout: DEFAULT_TIMEOUT,
            workspace_root: std::env::temp_dir(),
            samples,
        }
    }

    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Validate `content` and, when it parses, build it with the configured tool.
    #[instrument(skip_all, fields(bytes = content.len()))]
    pub async fn generate(&self, content: &str) -> BuildResponse {
        if let Err(err) = manifest_scripts::validate(content) {
            info!(error = %err, "rejected build request with invalid YAML");
            return BuildResponse::failure(format!("Invalid YAML: {}", err));
        }

        let result = run_build(&self.tool, &self.workspace_root, content, self.build_timeout).await;
        info!(
            outcome = ?result.kind(),
            duration_ms = result.duration_ms(),
            "build finished"
        );
        BuildResponse::from(&result)
    }

    /// Validate `content` and derive the copy-paste scripts for it.
    pub fn validate(&self, content: &str) -> Result<ScriptBundle, String> {
        manifest_scripts::validate(content)
            .map(|document| manifest_scripts::render(&document))
            .map_err(|err| err.to_string())
    }
}
