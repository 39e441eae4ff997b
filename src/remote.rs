use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
};

use crate::{spatial::SpatialFilter, window::DateWindow};

/// One catalog search: a collection, a temporal window and an optional area.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    pub short_name: &'static str,
    pub temporal: DateWindow,
    pub spatial: Option<SpatialFilter>,
}

/// A granule as returned by a catalog search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Granule {
    pub id: String,
    pub title: String,
    /// Direct download URLs for the granule's data files.
    pub data_links: Vec<String>,
}

impl Display for Granule {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}", self.title)
        }
    }
}

/// A granule download that stopped part way, after some of its files were already saved.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct PartialDownload {
    pub saved: Vec<PathBuf>,
    pub reason: String,
}

/// A data-access service that can search a catalog and fetch granules.
///
/// Implementations are expected to be authenticated before they are handed to a
/// [`Downloader`](crate::Downloader).
pub trait RemoteCatalog {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Granule>, Box<dyn Error>>;

    /// Fetch every file of `granule` into `dest_dir`, returning the local paths.
    ///
    /// When some files were saved before a failure, the error should be a [`PartialDownload`].
    fn download(&self, granule: &Granule, dest_dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>>;
}

impl<T: RemoteCatalog + ?Sized> RemoteCatalog for &T {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Granule>, Box<dyn Error>> {
        (**self).search(query)
    }

    fn download(&self, granule: &Granule, dest_dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
        (**self).download(granule, dest_dir)
    }
}
