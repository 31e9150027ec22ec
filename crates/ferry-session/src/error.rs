//! Configuration errors.
//!
//! Transfer failures are not errors; they are reported through
//! [`TransferResult::Failed`](crate::TransferResult::Failed).

use std::path::PathBuf;

use thiserror::Error;

use crate::option::TransferOption;
use crate::param::SessionParam;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to set option {option} = {value}: {reason}")]
    OptionRejected {
        option: TransferOption,
        value: String,
        reason: String,
    },

    #[error("file for option {option} does not exist: {path:?}")]
    FileNotFound {
        option: TransferOption,
        path: PathBuf,
    },

    #[error("CA certificate bundle not found: {0:?}")]
    MissingCaBundle(PathBuf),

    #[error("nothing to import: {0} map is empty")]
    EmptyImport(&'static str),

    #[error("unknown session parameter '{0}'")]
    UnknownParam(String),

    #[error("invalid value for session parameter {param}: {value}")]
    InvalidParamValue { param: SessionParam, value: String },

    #[error("invalid post fields: {0}")]
    InvalidPostFields(&'static str),

    #[error(transparent)]
    Config(#[from] figment::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
