/**************************************************************************************************
 *                                           Public API
 *************************************************************************************************/
pub use crate::{
    api::{download_daily, download_monthly, run_download},
    config::{EarthdataConfig, LoginStrategy},
    downloader::{DownloadFailure, DownloadSummary, Downloader, WindowReport},
    earthdata::EarthdataCmr,
    error::PaceError,
    level::Level,
    product::Product,
    remote::{Granule, PartialDownload, RemoteCatalog, SearchQuery},
    request::DownloadRequest,
    spatial::{BoundingBox, Point, SpatialFilter},
    window::{build_windows, DateWindow, WindowMode},
};

pub mod cli;
pub mod collection;

/**************************************************************************************************
 *                                      Private Implementation
 *************************************************************************************************/
mod api;
mod config;
mod downloader;
mod earthdata;
mod error;
mod level;
mod netrc;
mod product;
mod remote;
mod request;
mod spatial;
mod window;
