//! YAML syntax validation for submitted kustomizations and the helper scripts
//! shown next to a valid document.

pub mod overrides;
pub mod scripts;
pub mod validator;

pub use overrides::{flatten, set_args, OverrideValue, SetFlag};
pub use scripts::{
    helm_charts, render, ChartError, HelmChart, ScriptBundle, DEFAULT_CHART, DEFAULT_OVERRIDES,
    DEFAULT_SAMPLE_DIR,
};
pub use validator::{validate, ParsedDocument, SyntaxError};
