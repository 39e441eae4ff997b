use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaceError {
    #[error("unrecognized product '{0}' (expected one of kd, chl, rrs, aop, iop)")]
    UnknownProduct(String),

    #[error("unrecognized level '{0}' (expected l2 or l3)")]
    UnknownLevel(String),

    #[error("invalid date '{value}': expected {expected}")]
    InvalidDate {
        value: String,
        expected: &'static str,
    },

    #[error("invalid spatial filter: {0}")]
    InvalidSpatialFilter(String),

    #[error("could not create output directory {path:?}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Earthdata login failed: {0}")]
    Login(String),

    #[error("remote error: {0}")]
    Remote(String),
}

impl PaceError {
    pub(crate) fn invalid_date(value: &str, expected: &'static str) -> Self {
        PaceError::InvalidDate {
            value: value.to_owned(),
            expected,
        }
    }
}
