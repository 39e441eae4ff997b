use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;

use crate::{
    api::run_download,
    config::{EarthdataConfig, LoginStrategy},
    downloader::DownloadSummary,
    error::PaceError,
    level::Level,
    product::Product,
    request::{DownloadRequest, DEFAULT_OUTPUT_DIR},
    spatial::{SpatialFilter, DEFAULT_RADIUS_KM},
    window::WindowMode,
};

/// PACE data downloader using NASA Earthdata.
#[derive(Parser, Debug)]
#[command(name = "pace-download", version)]
pub struct Cli {
    /// Which PACE variable to download.
    #[arg(long, value_enum)]
    pub product: Product,

    /// L2 or L3 data.
    #[arg(long, value_enum)]
    pub level: Level,

    /// Start date (YYYY-MM-DD, or YYYY-MM with --monthly).
    #[arg(long)]
    pub start: String,

    /// End date (YYYY-MM-DD, or YYYY-MM with --monthly).
    #[arg(long)]
    pub end: String,

    /// Output directory.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Bounding box: west south east north.
    #[arg(
        long,
        num_args = 4,
        value_names = ["WEST", "SOUTH", "EAST", "NORTH"],
        allow_negative_numbers = true,
        conflicts_with = "point"
    )]
    pub bbox: Option<Vec<f64>>,

    /// Lat lon point.
    #[arg(long, num_args = 2, value_names = ["LAT", "LON"], allow_negative_numbers = true)]
    pub point: Option<Vec<f64>>,

    /// Radius (km) for point search.
    #[arg(long, value_name = "KM", default_value_t = DEFAULT_RADIUS_KM)]
    pub radius: f64,

    /// Download day-by-day.
    #[arg(long, conflicts_with = "monthly")]
    pub daily: bool,

    /// Download month-by-month.
    #[arg(long)]
    pub monthly: bool,

    /// Where Earthdata Login credentials are read from.
    #[arg(long, value_enum, default_value_t = LoginStrategy::Netrc)]
    pub strategy: LoginStrategy,

    /// More log output (repeat for debug).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report errors and the final summary.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn mode(&self) -> WindowMode {
        if self.daily {
            WindowMode::Daily
        } else if self.monthly {
            WindowMode::Monthly
        } else {
            WindowMode::Range
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }

        match self.verbose {
            0 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    /// The immutable request this command line describes.
    pub fn to_request(&self) -> Result<DownloadRequest, PaceError> {
        let spatial = SpatialFilter::from_parts(
            self.bbox.as_deref(),
            self.point.as_deref(),
            Some(self.radius),
        )?;

        Ok(DownloadRequest::new(
            self.product,
            self.level,
            self.start.clone(),
            self.end.clone(),
            self.output.clone(),
            spatial,
            self.mode(),
        ))
    }
}

/// Run a parsed command line to completion. Individual download failures are reported, not
/// returned as errors.
pub fn run(cli: Cli) -> Result<(), PaceError> {
    let request = cli.to_request()?;
    let config = EarthdataConfig::from_env().with_strategy(cli.strategy);

    let summary = run_download(request, config, !cli.quiet)?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &DownloadSummary) {
    for line in summary_lines(summary) {
        println!("{}", line);
    }
}

fn summary_lines(summary: &DownloadSummary) -> Vec<String> {
    let mut lines = vec![];

    for report in &summary.windows {
        lines.push(format!("\n{} {}", summary.short_name, report.window));

        if let Some(err) = &report.search_error {
            lines.push(format!("    ⚠ Search failed: {}", err));
            continue;
        }
        if report.found == 0 {
            lines.push("    No granules found".to_owned());
            continue;
        }

        lines.push(format!(
            "  Completed batch: {} files, {} failures",
            report.files.len(),
            report.failures.len()
        ));
        for file in &report.files {
            lines.push(format!("    ✔ {}", file.display()));
        }
        for failure in &report.failures {
            lines.push(format!(
                "    ⚠ Failed to download {}: {}",
                failure.granule, failure.reason
            ));
        }
    }

    lines.push(format!(
        "\n{} granules found, {} files downloaded, {} failed",
        summary.total_found(),
        summary.total_files(),
        summary.total_failures()
    ));
    lines.push("All downloads complete.".to_owned());

    lines
}
