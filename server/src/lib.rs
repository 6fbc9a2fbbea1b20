pub mod config;
pub mod samples;
pub mod server;

pub use config::{AppContext, ServerArgs};
pub use samples::{SampleCatalog, SampleEntry, SampleError};
