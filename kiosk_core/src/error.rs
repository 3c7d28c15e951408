use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = KioskError> = std::result::Result<T, E>;

/// Failures that can stop the kiosk from starting. Anything that happens
/// after startup (blocked audio, boundary rejections, odd frame deltas) is
/// recovered in place and never surfaces as one of these.
#[derive(Debug, Error)]
pub enum KioskError {
    #[error("catalog has no items to display")]
    EmptyCatalog,
    #[error("item key `{0}` registered more than once")]
    DuplicateItem(String),
    #[error("mesh for item `{0}` has no usable appearance")]
    MissingAppearance(String),
    #[error("reading {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {what}: {source}")]
    ConfigParse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to open {what}: {reason}")]
    AssetLoad { what: String, reason: String },
}
