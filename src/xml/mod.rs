//! Tax-authority XML output.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

pub mod element;
pub mod envelope;
pub mod taxpayer;

pub use element::XmlElement;
pub use envelope::{DivDohXml, KdvpXml};
pub use taxpayer::PersonalInfo;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid taxpayer info in {path}: {source}")]
    TaxpayerInfo {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `document` to `path`, creating missing parent directories.
pub fn write_to(document: &XmlElement, path: &Path) -> Result<(), XmlError> {
    let io_error = |source: std::io::Error| XmlError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, document.to_xml_string()).map_err(io_error)?;

    info!(path = %path.display(), root = document.name(), "XML written");
    Ok(())
}
