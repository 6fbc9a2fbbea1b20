#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use build_exec::{run_build, BuildResponse, ExternalTool, OutcomeKind, TIMEOUT_MESSAGE};

const KUSTOMIZATION: &str = "apiVersion: kustomize.config.k8s.io/v1beta1\nkind: Kustomization\n";

/// `sh -c <script> <arg0>`; the workspace path is appended and becomes `$1`.
fn shell_tool(script: &str, arg0: &str) -> ExternalTool {
    ExternalTool::new("sh").args(["-c", script, arg0])
}

fn assert_root_empty(root: &Path) {
    let leftovers: Vec<_> = fs::read_dir(root).unwrap().collect();
    assert!(leftovers.is_empty(), "workspace left behind: {:?}", leftovers);
}

#[tokio::test]
async fn successful_build_returns_stdout_and_removes_workspace() {
    let root = tempfile::tempdir().unwrap();
    let tool = shell_tool(r#"cat "$1/kustomization.yaml""#, "kustomize");

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(10)).await;

    assert_eq!(result.kind(), OutcomeKind::Success);
    assert_eq!(result.exit_code(), Some(0));
    assert_eq!(result.stdout(), KUSTOMIZATION);
    assert_root_empty(root.path());
}

#[tokio::test]
async fn failing_build_reports_stderr_and_removes_workspace() {
    let root = tempfile::tempdir().unwrap();
    let tool = shell_tool("echo 'Error: missing resources' >&2; exit 3", "kustomize");

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(10)).await;
    let response = BuildResponse::from(&result);

    assert_eq!(result.kind(), OutcomeKind::ToolFailure);
    assert_eq!(result.exit_code(), Some(3));
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Error: missing resources\n"));
    assert_root_empty(root.path());
}

#[tokio::test]
async fn repeated_builds_use_distinct_workspaces_with_same_outcome() {
    let root = tempfile::tempdir().unwrap();
    let tool = shell_tool(r#"echo "$1""#, "kustomize");

    let first = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(10)).await;
    let second = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(10)).await;

    assert_eq!(first.kind(), second.kind());
    assert_ne!(first.stdout(), second.stdout());
    assert_root_empty(root.path());
}

#[tokio::test]
async fn slow_tool_times_out_and_is_reclaimed() {
    let root = tempfile::tempdir().unwrap();
    let tool = shell_tool("sleep 30", "kustomize");

    let started = Instant::now();
    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_millis(300)).await;

    assert_eq!(result.kind(), OutcomeKind::Timeout);
    assert_eq!(result.message(), Some(TIMEOUT_MESSAGE));
    assert!(result.stdout().is_empty());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_root_empty(root.path());
}

#[tokio::test]
async fn timeout_wins_over_exit_code_when_output_stays_open() {
    let root = tempfile::tempdir().unwrap();
    // The shell exits non-zero at once but a background child keeps stdout open.
    let tool = shell_tool("sleep 30 & exit 4", "kustomize");

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_millis(300)).await;

    assert_eq!(result.kind(), OutcomeKind::Timeout);
    assert_root_empty(root.path());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_leaves_no_surviving_descendant() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let pid_file = scratch.path().join("sleeper.pid");
    // `$0` is the pid file, `$1` the workspace.
    let tool = shell_tool(
        r#"sleep 30 & echo $! > "$0"; wait"#,
        pid_file.to_str().unwrap(),
    );

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_millis(500)).await;
    assert_eq!(result.kind(), OutcomeKind::Timeout);

    let pid = fs::read_to_string(&pid_file).unwrap().trim().to_string();
    let stat_path = format!("/proc/{}/stat", pid);
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let alive = match fs::read_to_string(&stat_path) {
            // Field 3 is the state; a zombie only waits to be reaped by its new parent.
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .map(|rest| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        };
        if !alive {
            break;
        }
        assert!(Instant::now() < deadline, "background sleeper {} survived", pid);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn missing_tool_is_infrastructure_error_and_workspace_removed() {
    let root = tempfile::tempdir().unwrap();
    let tool = ExternalTool::kustomize("/nonexistent/bin/kustomize");

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(5)).await;
    let response = BuildResponse::from(&result);

    assert_eq!(result.kind(), OutcomeKind::InfrastructureError);
    assert!(response.error.unwrap().contains("/nonexistent/bin/kustomize"));
    assert_root_empty(root.path());
}

#[tokio::test]
async fn unusable_workspace_root_is_infrastructure_error() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("gone");
    let tool = shell_tool("true", "kustomize");

    let result = run_build(&tool, &missing, KUSTOMIZATION, Duration::from_secs(5)).await;

    assert_eq!(result.kind(), OutcomeKind::InfrastructureError);
    assert!(result.message().unwrap().contains("gone"));
}

#[tokio::test]
async fn version_probe_runs_without_build_arguments() {
    let tool = ExternalTool::kustomize("echo");
    let result = tool.probe_version().await;

    assert_eq!(result.kind(), OutcomeKind::Success);
    assert_eq!(result.stdout(), "version\n");
}

#[tokio::test]
async fn tool_that_removes_its_workspace_still_succeeds() {
    let root = tempfile::tempdir().unwrap();
    let tool = shell_tool(r#"echo built; rm -rf "$1""#, "kustomize");

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(10)).await;

    assert_eq!(result.kind(), OutcomeKind::Success);
    assert_eq!(result.stdout(), "built\n");
    assert_root_empty(root.path());
}

#[tokio::test]
async fn workspace_that_cannot_be_released_is_infrastructure_error() {
    let root = tempfile::tempdir().unwrap();
    // Swap the workspace directory for a plain file so removing it fails.
    let tool = shell_tool(r#"echo built; rm -rf "$1"; echo stray > "$1""#, "kustomize");

    let result = run_build(&tool, root.path(), KUSTOMIZATION, Duration::from_secs(10)).await;
    let response = BuildResponse::from(&result);

    assert_eq!(result.kind(), OutcomeKind::InfrastructureError);
    assert!(!response.success);
    assert!(response
        .error
        .unwrap()
        .starts_with("Failed to remove build workspace"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_builds_never_share_a_workspace() {
    let root = tempfile::tempdir().unwrap();
    let tool = shell_tool(r#"sleep 0.2; cat "$1/kustomization.yaml""#, "kustomize");

    let builds: Vec<_> = (0..8)
        .map(|n| {
            let tool = tool.clone();
            let root = root.path().to_path_buf();
            let content = format!("{}namePrefix: build-{}-\n", KUSTOMIZATION, n);
            tokio::spawn(async move {
                let result = run_build(&tool, &root, &content, Duration::from_secs(10)).await;
                (content, result)
            })
        })
        .collect();

    for build in builds {
        let (content, result) = build.await.unwrap();
        assert_eq!(result.kind(), OutcomeKind::Success);
        assert_eq!(result.stdout(), content);
    }
    assert_root_empty(root.path());
}
