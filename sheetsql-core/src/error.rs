//! Structural errors raised while reading a workbook

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Failures that abort a conversion. Field-level parsing problems never end up here.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid spreadsheet archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("spreadsheet is missing required part '{0}'")]
    MissingPart(String),

    #[error("XML parsing error in '{part}': {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("workbook does not declare any sheets")]
    NoSheetsFound,

    #[error("sheet index {index} is out of range (workbook has {count} sheets)")]
    SheetIndexOutOfRange { index: usize, count: usize },

    #[error("could not resolve the XML part of sheet '{sheet}' (relationship {rel_id:?})")]
    UnresolvableSheetPart {
        sheet: String,
        rel_id: Option<String>,
    },
}

impl ImportError {
    pub(crate) fn xml(part: &str) -> impl Fn(quick_xml::Error) -> ImportError + '_ {
        move |source| ImportError::Xml {
            part: part.to_string(),
            source,
        }
    }
}
