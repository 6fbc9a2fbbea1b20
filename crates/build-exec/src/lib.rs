//! Request-scoped build execution: stage a document in a throwaway workspace,
//! run the manifest builder against it under a deadline, and always clean up.

mod invoker;
mod outcome;
mod workspace;

pub use invoker::{shell_escape, ExternalTool, DEFAULT_TIMEOUT, VERSION_PROBE_TIMEOUT};
pub use outcome::{BuildResponse, InvocationResult, OutcomeKind, TIMEOUT_MESSAGE};
pub use workspace::{Workspace, WorkspaceError, CONFIG_FILE_NAME};

use std::path::Path;
use std::time::Duration;

use tracing::{instrument, warn};
use uuid::Uuid;

/// Write `content` into a fresh workspace under `workspace_root`, run `tool`
/// against it and remove the workspace before returning.
///
/// Every failure is folded into the returned [`InvocationResult`]. A workspace
/// that cannot be removed turns the outcome into an infrastructure error, even
/// if the tool itself succeeded.
#[instrument(
    skip_all,
    fields(build_id = %Uuid::new_v4(), root = %workspace_root.display())
)]
pub async fn run_build(
    tool: &ExternalTool,
    workspace_root: &Path,
    content: &str,
    timeout: Duration,
) -> InvocationResult {
    let workspace = match Workspace::acquire(workspace_root) {
        Ok(workspace) => workspace,
        Err(err) => {
            warn!(error = %err, "could not acquire build workspace");
            return InvocationResult::infrastructure(err.to_string());
        }
    };

    let result = match workspace.write_config(content) {
        Ok(_) => tool.invoke(workspace.path(), timeout).await,
        Err(err) => {
            warn!(error = %err, "could not stage kustomization");
            InvocationResult::infrastructure(err.to_string())
        }
    };

    match workspace.release() {
        Ok(()) => result,
        Err(err) => {
            warn!(error = %err, outcome = ?result.kind(), "build workspace was not removed");
            InvocationResult::infrastructure(err.to_string())
        }
    }
}
