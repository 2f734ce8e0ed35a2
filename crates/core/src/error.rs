use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors raised while writing or re-reading a delimited export.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("export is not valid UTF-8")]
    Encoding(#[from] FromUtf8Error),
    #[error("export header must start with id and name columns")]
    MissingHeader,
    #[error("export record {line} has {found} fields, header has {expected}")]
    ShortRecord { line: u64, found: usize, expected: usize },
    #[error("export record {line} has {found} fields, header has {expected}")]
    LongRecord { line: u64, found: usize, expected: usize },
}
