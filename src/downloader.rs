use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error::PaceError,
    remote::{Granule, PartialDownload, RemoteCatalog, SearchQuery},
    request::DownloadRequest,
    spatial::SpatialFilter,
    window::DateWindow,
};

/// A granule that could not be fetched, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadFailure {
    pub granule: String,
    pub reason: String,
}

/// Outcome of searching and downloading a single window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowReport {
    pub window: DateWindow,
    pub found: usize,
    pub files: Vec<PathBuf>,
    pub failures: Vec<DownloadFailure>,
    pub search_error: Option<String>,
}

impl WindowReport {
    fn new(window: DateWindow) -> Self {
        Self {
            window,
            found: 0,
            files: vec![],
            failures: vec![],
            search_error: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadSummary {
    pub short_name: &'static str,
    pub windows: Vec<WindowReport>,
}

impl DownloadSummary {
    pub fn total_found(&self) -> usize {
        self.windows.iter().map(|w| w.found).sum()
    }

    pub fn total_files(&self) -> usize {
        self.windows.iter().map(|w| w.files.len()).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.windows.iter().map(|w| w.failures.len()).sum()
    }
}

/// Drives searches and downloads against a [`RemoteCatalog`], one window at a time.
pub struct Downloader<R: RemoteCatalog> {
    remote: R,
    show_progress: bool,
}

impl<R> Downloader<R>
where
    R: RemoteCatalog,
{
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            show_progress: true,
        }
    }

    /// Toggle the per-window progress bar.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self, request: DownloadRequest) -> Result<DownloadSummary, PaceError> {
        let windows = request.windows()?;
        self.dispatch(request, windows)
    }

    /// Search and download every window in order. Failures inside a window are recorded in
    /// its report and never stop the remaining windows.
    pub fn dispatch(
        &self,
        request: DownloadRequest,
        windows: Vec<DateWindow>,
    ) -> Result<DownloadSummary, PaceError> {
        prepare_output_dir(&request.output)?;

        let short_name = request.short_name();
        let mut summary = DownloadSummary {
            short_name,
            windows: Vec::with_capacity(windows.len()),
        };

        for window in windows {
            let report = self.process_window(short_name, window, request.spatial, &request.output);
            summary.windows.push(report);
        }

        log::info!(
            "Finished {}: {} granules found, {} files downloaded, {} failures",
            short_name,
            summary.total_found(),
            summary.total_files(),
            summary.total_failures()
        );

        Ok(summary)
    }
}

// Private methods and associated functions.

impl<R> Downloader<R>
where
    R: RemoteCatalog,
{
    fn process_window(
        &self,
        short_name: &'static str,
        window: DateWindow,
        spatial: Option<SpatialFilter>,
        dest_dir: &Path,
    ) -> WindowReport {
        log::info!("Searching {} for {}", short_name, window);

        let query = SearchQuery {
            short_name,
            temporal: window.clone(),
            spatial,
        };
        let mut report = WindowReport::new(window);

        let granules = match self.remote.search(&query) {
            Ok(granules) => granules,
            Err(err) => {
                log::error!("Error searching {} for {}: {}", short_name, report.window, err);
                report.search_error = Some(err.to_string());
                return report;
            }
        };

        report.found = granules.len();
        log::info!("Found {} granules", granules.len());

        if granules.is_empty() {
            log::warn!("No granules for {}, skipping", report.window);
            return report;
        }

        let progress = self.progress_bar(granules.len());
        for granule in &granules {
            progress.set_message(granule.title.clone());
            self.download_one(granule, dest_dir, &mut report);
            progress.inc(1);
        }
        progress.finish_and_clear();

        log::info!(
            "Completed batch for {}: {} files, {} failures",
            report.window,
            report.files.len(),
            report.failures.len()
        );
        for pth in &report.files {
            log::info!("  ✔ {}", pth.display());
        }

        report
    }

    fn download_one(&self, granule: &Granule, dest_dir: &Path, report: &mut WindowReport) {
        match self.remote.download(granule, dest_dir) {
            Ok(paths) => {
                for pth in &paths {
                    log::debug!("Saved {:?}", pth);
                }
                report.files.extend(paths);
            }
            Err(err) => {
                if let Some(partial) = err.downcast_ref::<PartialDownload>() {
                    report.files.extend(partial.saved.iter().cloned());
                }
                log::error!("Failed to download {}: {}", granule, err);
                report.failures.push(DownloadFailure {
                    granule: granule.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  Granules [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Create the output directory, and any parents, if it does not exist yet.
pub fn prepare_output_dir(pth: &Path) -> Result<(), PaceError> {
    if !pth.exists() {
        log::debug!("Creating path: {:?}", pth);
    }

    create_dir_all(pth).map_err(|source| PaceError::OutputDirectory {
        path: pth.to_path_buf(),
        source,
    })
}
