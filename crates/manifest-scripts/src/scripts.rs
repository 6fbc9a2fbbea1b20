//! Copy-paste scripts derived from a submitted kustomization: a bash script
//! that reproduces the build, and a helm script that templates the same charts.

use build_exec::{shell_escape, CONFIG_FILE_NAME};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

use crate::overrides::{flatten, OverrideValue, SetFlag};
use crate::validator::ParsedDocument;

/// Chart used for the helm script when the document has no usable `helmCharts`.
pub const DEFAULT_CHART: DefaultChart = DefaultChart {
    name: "qoin",
    repo: "https://newrahmat.bitbucket.io",
    release_name: "qoin",
    namespace: "admin",
    version: "0.11.0",
};

/// Overrides rendered together with [`DEFAULT_CHART`], already flattened.
pub const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    ("name", "qoin-be-client-manager"),
    ("port", "8086"),
    ("image.repo", "loyaltolpi/qoin-be-client-manager"),
    ("image.tag", "2e6d963"),
    ("privateReg.enabled", "true"),
    ("secretName", "regcred"),
    ("selector.enabled", "true"),
    ("nodeSelector.nodetype", "front"),
];

/// Directory name used when no chart names the build.
pub const DEFAULT_SAMPLE_DIR: &str = "kustomize-sample";

const HEREDOC_DELIMITER: &str = "KUSTOMIZATION_EOF";

#[derive(Debug, Clone, Copy)]
pub struct DefaultChart {
    pub name: &'static str,
    pub repo: &'static str,
    pub release_name: &'static str,
    pub namespace: &'static str,
    pub version: &'static str,
}

/// Everything `/validate` returns next to the validity flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptBundle {
    pub build_command: String,
    pub sample_dir: String,
    pub bash_script: String,
    pub helm_script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// One entry of `helmCharts`, reduced to what `helm template` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmChart {
    pub name: String,
    pub repo: Option<String>,
    pub release_name: Option<String>,
    pub namespace: Option<String>,
    pub version: Option<String>,
    pub overrides: Vec<SetFlag>,
}

impl HelmChart {
    fn default_example() -> Self {
        Self {
            name: DEFAULT_CHART.name.to_string(),
            repo: Some(DEFAULT_CHART.repo.to_string()),
            release_name: Some(DEFAULT_CHART.release_name.to_string()),
            namespace: Some(DEFAULT_CHART.namespace.to_string()),
            version: Some(DEFAULT_CHART.version.to_string()),
            overrides: DEFAULT_OVERRIDES
                .iter()
                .map(|(key, value)| SetFlag::new(*key, *value))
                .collect(),
        }
    }

    fn release(&self) -> &str {
        self.release_name.as_deref().unwrap_or(&self.name)
    }

    fn is_oci(&self) -> bool {
        self.repo
            .as_deref()
            .map(|repo| repo.starts_with("oci://"))
            .unwrap_or(false)
    }

    /// `alias` is the local name the chart's repo was added under.
    fn chart_ref(&self, alias: Option<&str>) -> String {
        match (self.repo.as_deref(), alias) {
            (Some(repo), _) if self.is_oci() => {
                format!("{}/{}", repo.trim_end_matches('/'), self.name)
            }
            (Some(_), Some(alias)) => format!("{}/{}", alias, self.name),
            _ => self.name.clone(),
        }
    }
}

/// Why the charts of a document could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("no helmCharts field found")]
    Missing,
    #[error("helmCharts is malformed: {0}")]
    Malformed(String),
}

/// Read `helmCharts` from a parsed kustomization.
pub fn helm_charts(document: &Value) -> Result<Vec<HelmChart>, ChartError> {
    let charts = match document.get("helmCharts") {
        None | Some(Value::Null) => return Err(ChartError::Missing),
        Some(Value::Sequence(charts)) if !charts.is_empty() => charts,
        Some(Value::Sequence(_)) => {
            return Err(ChartError::Malformed("the list is empty".to_string()))
        }
        Some(_) => return Err(ChartError::Malformed("expected a list".to_string())),
    };

    charts
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = entry
                .as_mapping()
                .ok_or_else(|| ChartError::Malformed(format!("entry {} is not a mapping", index)))?;
            chart_from_mapping(index, entry)
        })
        .collect()
}

fn chart_from_mapping(index: usize, entry: &Mapping) -> Result<HelmChart, ChartError> {
    let name = scalar_field(entry, "name")
        .ok_or_else(|| ChartError::Malformed(format!("entry {} has no name", index)))?;

    let overrides = match entry.get("valuesInline") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Mapping(values)) => flatten(&OverrideValue::from_mapping(values)),
        Some(_) => {
            return Err(ChartError::Malformed(format!(
                "valuesInline of '{}' is not a mapping",
                name
            )))
        }
    };

    Ok(HelmChart {
        repo: scalar_field(entry, "repo"),
        release_name: scalar_field(entry, "releaseName"),
        namespace: scalar_field(entry, "namespace"),
        version: scalar_field(entry, "version"),
        name,
        overrides,
    })
}

fn scalar_field(entry: &Mapping, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Render all scripts for a validated document. Never fails: unreadable chart
/// data falls back to the default example chart and sets `warning`.
pub fn render(document: &ParsedDocument) -> ScriptBundle {
    let (charts, warning) = match helm_charts(document.value()) {
        Ok(charts) => (Some(charts), None),
        Err(err) => {
            debug!(error = %err, "falling back to default helm chart");
            let warning = format!("{}; the helm script shows the default example chart", err);
            (None, Some(warning))
        }
    };

    let sample_dir = charts
        .as_ref()
        .and_then(|charts| charts.first())
        .map(|chart| format!("{}-kustomize", sanitize_dir_name(chart.release())))
        .unwrap_or_else(|| DEFAULT_SAMPLE_DIR.to_string());

    let helm_script = match &charts {
        Some(charts) => helm_script(charts),
        None => helm_script(&[HelmChart::default_example()]),
    };

    ScriptBundle {
        build_command: build_command(&sample_dir),
        bash_script: bash_script(&sample_dir, document.raw()),
        helm_script,
        sample_dir,
        warning,
    }
}

pub fn build_command(sample_dir: &str) -> String {
    format!("kustomize build --enable-helm {}", sample_dir)
}

/// Bash script that recreates the kustomization on disk and builds it.
pub fn bash_script(sample_dir: &str, content: &str) -> String {
    let delimiter = heredoc_delimiter(content);
    let mut body = content.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }

    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -euo pipefail\n\n");
    script.push_str(&format!("SAMPLE_DIR={}\n\n", quote(sample_dir)));
    script.push_str("mkdir -p \"$SAMPLE_DIR\"\n");
    script.push_str(&format!(
        "cat > \"$SAMPLE_DIR/{}\" <<'{}'\n",
        CONFIG_FILE_NAME, delimiter
    ));
    script.push_str(&body);
    script.push_str(&delimiter);
    script.push_str("\n\n");
    script.push_str("kustomize build --enable-helm \"$SAMPLE_DIR\"\n");
    script
}

/// Bash script issuing one `helm template` per chart.
pub fn helm_script(charts: &[HelmChart]) -> String {
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -euo pipefail\n\n");

    let aliases = RepoAliases::assign(charts);
    for (repo, alias) in &aliases.entries {
        script.push_str(&format!("helm repo add {} {}\n", quote(alias), quote(repo)));
    }
    if !aliases.entries.is_empty() {
        script.push_str("helm repo update\n\n");
    }

    let commands: Vec<String> = charts
        .iter()
        .map(|chart| helm_template_command(chart, aliases.alias_for(chart)))
        .collect();
    script.push_str(&commands.join("\n\n"));
    script.push('\n');
    script
}

/// Local repo names, one per distinct non-OCI repo URL in first-seen order.
/// An alias is the first chart's name, suffixed `-2`, `-3`, ... when another
/// repo already took it.
struct RepoAliases<'a> {
    entries: Vec<(&'a str, String)>,
}

impl<'a> RepoAliases<'a> {
    fn assign(charts: &'a [HelmChart]) -> Self {
        let mut entries: Vec<(&'a str, String)> = Vec::new();
        for chart in charts {
            let Some(repo) = chart.repo.as_deref() else {
                continue;
            };
            if chart.is_oci() || entries.iter().any(|(known, _)| *known == repo) {
                continue;
            }
            let mut alias = chart.name.clone();
            let mut suffix = 1;
            while entries.iter().any(|(_, taken)| *taken == alias) {
                suffix += 1;
                alias = format!("{}-{}", chart.name, suffix);
            }
            entries.push((repo, alias));
        }
        Self { entries }
    }

    fn alias_for(&self, chart: &HelmChart) -> Option<&str> {
        let repo = chart.repo.as_deref()?;
        self.entries
            .iter()
            .find(|(known, _)| *known == repo)
            .map(|(_, alias)| alias.as_str())
    }
}

fn helm_template_command(chart: &HelmChart, alias: Option<&str>) -> String {
    let mut lines = vec![format!(
        "helm template {} {}",
        quote(chart.release()),
        quote(&chart.chart_ref(alias))
    )];
    if let Some(version) = &chart.version {
        lines.push(format!("--version {}", quote(version)));
    }
    if let Some(namespace) = &chart.namespace {
        lines.push(format!("--namespace {}", quote(namespace)));
    }
    for flag in &chart.overrides {
        lines.push(format!("--set {}", quote(&flag.assignment())));
    }
    lines.join(" \\\n  ")
}

fn heredoc_delimiter(content: &str) -> String {
    let mut delimiter = HEREDOC_DELIMITER.to_string();
    let mut suffix = 0;
    while content.lines().any(|line| line == delimiter) {
        suffix += 1;
        delimiter = format!("{}_{}", HEREDOC_DELIMITER, suffix);
    }
    delimiter
}

fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Quote a token only when the shell would otherwise split or expand it.
fn quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '_' | '-')
        });
    if safe {
        token.to_string()
    } else {
        shell_escape(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;

    const QOIN: &str = "apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization

helmCharts:
- name: qoin
  repo: https://newrahmat.bitbucket.io
  releaseName: qoin
  namespace: admin
  version: 0.11.0
  valuesInline:
    name: qoin-be-client-manager
    port: 8086
    image:
      repo: loyaltolpi/qoin-be-client-manager
      tag: 2e6d963
    privateReg:
      enabled: true
    secretName: regcred
    selector:
      enabled: true
    nodeSelector:
      nodetype: front";

    #[test]
    fn renders_helm_script_from_values_inline() {
        let bundle = render(&validate(QOIN).unwrap());

        assert_eq!(bundle.warning, None);
        assert_eq!(
            bundle.helm_script,
            "#!/usr/bin/env bash
set -euo pipefail

helm repo add qoin https://newrahmat.bitbucket.io
helm repo update

helm template qoin qoin/qoin \\
  --version 0.11.0 \\
  --namespace admin \\
  --set name=qoin-be-client-manager \\
  --set port=8086 \\
  --set image.repo=loyaltolpi/qoin-be-client-manager \\
  --set image.tag=2e6d963 \\
  --set privateReg.enabled=true \\
  --set secretName=regcred \\
  --set selector.enabled=true \\
  --set nodeSelector.nodetype=front
"
        );
    }

    #[test]
    fn default_overrides_match_the_example_document() {
        let charts = helm_charts(validate(QOIN).unwrap().value()).unwrap();
        assert_eq!(charts[0].overrides, HelmChart::default_example().overrides);
    }

    #[test]
    fn derives_sample_dir_and_build_command_from_release() {
        let bundle = render(&validate(QOIN).unwrap());
        assert_eq!(bundle.sample_dir, "qoin-kustomize");
        assert_eq!(
            bundle.build_command,
            "kustomize build --enable-helm qoin-kustomize"
        );
    }

    #[test]
    fn bash_script_embeds_document_in_quoted_heredoc() {
        let bundle = render(&validate(QOIN).unwrap());

        assert!(bundle.bash_script.starts_with("#!/usr/bin/env bash\nset -euo pipefail\n"));
        assert!(bundle.bash_script.contains("SAMPLE_DIR=qoin-kustomize\n"));
        assert!(bundle
            .bash_script
            .contains("cat > \"$SAMPLE_DIR/kustomization.yaml\" <<'KUSTOMIZATION_EOF'\n"));
        assert!(bundle.bash_script.contains(&format!("{}\nKUSTOMIZATION_EOF\n", QOIN)));
        assert!(bundle
            .bash_script
            .ends_with("kustomize build --enable-helm \"$SAMPLE_DIR\"\n"));
    }

    #[test]
    fn heredoc_delimiter_avoids_document_lines() {
        let content = "a: |\n  KUSTOMIZATION_EOF\nKUSTOMIZATION_EOF\nKUSTOMIZATION_EOF_1\n";
        assert_eq!(heredoc_delimiter(content), "KUSTOMIZATION_EOF_2");
        assert_eq!(heredoc_delimiter("a: 1\n"), "KUSTOMIZATION_EOF");
    }

    #[test]
    fn missing_helm_charts_falls_back_with_warning() {
        let bundle = render(&validate("resources:\n- deployment.yaml\n").unwrap());

        assert_eq!(bundle.sample_dir, DEFAULT_SAMPLE_DIR);
        assert!(bundle.warning.as_deref().unwrap().contains("no helmCharts"));
        assert_eq!(
            bundle.helm_script,
            helm_script(&[HelmChart::default_example()])
        );
        assert!(bundle.helm_script.contains("--set nodeSelector.nodetype=front"));
    }

    #[test]
    fn malformed_values_inline_falls_back_instead_of_failing() {
        let bundle = render(
            &validate("helmCharts:\n- name: web\n  valuesInline: [not, a, map]\n").unwrap(),
        );

        assert!(bundle.warning.as_deref().unwrap().contains("valuesInline of 'web'"));
        assert!(bundle.helm_script.contains("helm template qoin qoin/qoin"));
    }

    #[test]
    fn scalar_documents_fall_back() {
        for text in ["", "just a string", "- a\n- b\n"] {
            let bundle = render(&validate(text).unwrap());
            assert!(bundle.warning.is_some(), "expected fallback for {:?}", text);
            assert_eq!(bundle.sample_dir, DEFAULT_SAMPLE_DIR);
        }
    }

    #[test]
    fn multiple_charts_share_repo_add_and_render_each_template() {
        let doc = validate(
            "helmCharts:
- name: redis
  repo: https://charts.bitnami.com/bitnami
  releaseName: cache
- name: redis
  repo: https://charts.bitnami.com/bitnami
  releaseName: sessions
  valuesInline:
    auth:
      enabled: false
- name: podinfo
  repo: oci://ghcr.io/stefanprodan/charts
  version: 6.5.0
- name: local-chart
",
        )
        .unwrap();
        let bundle = render(&doc);

        assert_eq!(bundle.sample_dir, "cache-kustomize");
        assert_eq!(
            bundle.helm_script.matches("helm repo add redis").count(),
            1
        );
        assert!(bundle.helm_script.contains("helm template cache redis/redis\n"));
        assert!(bundle
            .helm_script
            .contains("helm template sessions redis/redis \\\n  --set auth.enabled=false"));
        assert!(bundle.helm_script.contains(
            "helm template podinfo oci://ghcr.io/stefanprodan/charts/podinfo \\\n  --version 6.5.0"
        ));
        assert!(!bundle.helm_script.contains("helm repo add podinfo"));
        assert!(bundle.helm_script.contains("helm template local-chart local-chart"));
    }

    #[test]
    fn same_chart_name_from_different_repos_gets_distinct_aliases() {
        let doc = validate(
            "helmCharts:
- name: redis
  repo: https://charts.bitnami.com/bitnami
  releaseName: a
- name: redis
  repo: https://other.example.com/charts
  releaseName: b
- name: redis
  repo: https://charts.bitnami.com/bitnami
  releaseName: c
",
        )
        .unwrap();
        let script = render(&doc).helm_script;

        assert!(script.contains("helm repo add redis https://charts.bitnami.com/bitnami\n"));
        assert!(script.contains("helm repo add redis-2 https://other.example.com/charts\n"));
        assert_eq!(script.matches("helm repo add").count(), 2);
        assert_eq!(script.matches("helm repo update").count(), 1);
        assert!(script.contains("helm template a redis/redis\n"));
        assert!(script.contains("helm template b redis-2/redis\n"));
        assert!(script.ends_with("helm template c redis/redis\n"));
    }

    #[test]
    fn values_needing_quotes_are_shell_escaped() {
        let doc = validate(
            "helmCharts:\n- name: web\n  valuesInline:\n    greeting: hello world\n    hosts: [a, b]\n",
        )
        .unwrap();
        let bundle = render(&doc);

        assert!(bundle.helm_script.contains("--set 'greeting=hello world'"));
        assert!(bundle.helm_script.contains("--set 'hosts={a,b}'"));
    }

    #[test]
    fn sample_dir_is_sanitized() {
        let doc = validate("helmCharts:\n- name: web\n  releaseName: my app/v1\n").unwrap();
        assert_eq!(render(&doc).sample_dir, "my-app-v1-kustomize");
    }

    #[test]
    fn bundle_omits_warning_when_absent() {
        let json = serde_json::to_value(render(&validate(QOIN).unwrap())).unwrap();
        assert!(json.get("warning").is_none());
        assert!(json["bash_script"].is_string());
    }
}
