use std::path::PathBuf;

use crate::{
    collection,
    error::PaceError,
    level::Level,
    product::Product,
    spatial::SpatialFilter,
    window::{self, DateWindow, WindowMode},
};

/// Default directory granules are saved to.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Everything one download run needs, fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadRequest {
    pub product: Product,
    pub level: Level,
    pub start: String,
    pub end: String,
    pub output: PathBuf,
    pub spatial: Option<SpatialFilter>,
    pub mode: WindowMode,
}

impl DownloadRequest {
    pub fn new<S, E, P>(
        product: Product,
        level: Level,
        start: S,
        end: E,
        output: P,
        spatial: Option<SpatialFilter>,
        mode: WindowMode,
    ) -> Self
    where
        S: Into<String>,
        E: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            product,
            level,
            start: start.into(),
            end: end.into(),
            output: output.into(),
            spatial,
            mode,
        }
    }

    /// A request searched one day at a time.
    pub fn daily<S, E, P>(
        product: Product,
        level: Level,
        start_date: S,
        end_date: E,
        output: P,
        spatial: Option<SpatialFilter>,
    ) -> Self
    where
        S: Into<String>,
        E: Into<String>,
        P: Into<PathBuf>,
    {
        Self::new(product, level, start_date, end_date, output, spatial, WindowMode::Daily)
    }

    /// A request searched one calendar month at a time.
    pub fn monthly<S, E, P>(
        product: Product,
        level: Level,
        start_month: S,
        end_month: E,
        output: P,
        spatial: Option<SpatialFilter>,
    ) -> Self
    where
        S: Into<String>,
        E: Into<String>,
        P: Into<PathBuf>,
    {
        Self::new(product, level, start_month, end_month, output, spatial, WindowMode::Monthly)
    }

    pub fn short_name(&self) -> &'static str {
        collection::short_name(self.product, self.level)
    }

    pub fn windows(&self) -> Result<Vec<DateWindow>, PaceError> {
        window::build_windows(&self.start, &self.end, self.mode)
    }
}
