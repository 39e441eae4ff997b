use std::path::PathBuf;

use crate::{
    config::EarthdataConfig,
    downloader::{DownloadSummary, Downloader},
    earthdata::EarthdataCmr,
    error::PaceError,
    level::Level,
    product::Product,
    request::DownloadRequest,
    spatial::SpatialFilter,
};

/// Validate `request`, log in to Earthdata and fetch every window.
///
/// Arguments are checked before any network activity, so a malformed date never costs a login.
pub fn run_download(
    request: DownloadRequest,
    config: EarthdataConfig,
    show_progress: bool,
) -> Result<DownloadSummary, PaceError> {
    let windows = request.windows()?;

    let remote = EarthdataCmr::connect(config)?;
    Downloader::new(remote)
        .show_progress(show_progress)
        .dispatch(request, windows)
}

/// Download granules one day at a time between two `YYYY-MM-DD` dates.
pub fn download_daily<S, E, P>(
    product: Product,
    level: Level,
    start_date: S,
    end_date: E,
    output: P,
    spatial: Option<SpatialFilter>,
) -> Result<DownloadSummary, PaceError>
where
    S: Into<String>,
    E: Into<String>,
    P: Into<PathBuf>,
{
    let request = DownloadRequest::daily(product, level, start_date, end_date, output, spatial);
    run_download(request, EarthdataConfig::from_env(), true)
}

/// Download granules one calendar month at a time between two `YYYY-MM` months.
pub fn download_monthly<S, E, P>(
    product: Product,
    level: Level,
    start_month: S,
    end_month: E,
    output: P,
    spatial: Option<SpatialFilter>,
) -> Result<DownloadSummary, PaceError>
where
    S: Into<String>,
    E: Into<String>,
    P: Into<PathBuf>,
{
    let request = DownloadRequest::monthly(product, level, start_month, end_month, output, spatial);
    run_download(request, EarthdataConfig::from_env(), true)
}
