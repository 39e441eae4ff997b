use std::{env, path::PathBuf};

use clap::ValueEnum;
use strum::{Display, EnumString};

pub const DEFAULT_CMR_URL: &str = "https://cmr.earthdata.nasa.gov";
pub const DEFAULT_URS_URL: &str = "https://urs.earthdata.nasa.gov";
/// Largest page CMR will return for a granule search.
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// Where Earthdata Login credentials come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum LoginStrategy {
    /// A `machine urs.earthdata.nasa.gov` entry in the netrc file.
    Netrc,
    /// `EARTHDATA_TOKEN`, or `EARTHDATA_USERNAME` and `EARTHDATA_PASSWORD`.
    Environment,
    /// Environment first, then netrc.
    All,
}

/// Connection settings for the NASA Earthdata services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EarthdataConfig {
    pub cmr_url: String,
    pub urs_url: String,
    pub strategy: LoginStrategy,
    pub page_size: usize,
    /// Explicit netrc file; falls back to `~/.netrc` (or `~/_netrc` on Windows).
    pub netrc_path: Option<PathBuf>,
}

impl Default for EarthdataConfig {
    fn default() -> Self {
        Self {
            cmr_url: DEFAULT_CMR_URL.to_owned(),
            urs_url: DEFAULT_URS_URL.to_owned(),
            strategy: LoginStrategy::Netrc,
            page_size: DEFAULT_PAGE_SIZE,
            netrc_path: None,
        }
    }
}

impl EarthdataConfig {
    /// Defaults overridden by `EARTHDATA_CMR_URL`, `EARTHDATA_URS_URL` and `NETRC`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = non_empty_var("EARTHDATA_CMR_URL") {
            config.cmr_url = url;
        }
        if let Some(url) = non_empty_var("EARTHDATA_URS_URL") {
            config.urs_url = url;
        }
        config.netrc_path = non_empty_var("NETRC").map(PathBuf::from);

        config
    }

    pub fn with_strategy(mut self, strategy: LoginStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Host name credentials are looked up under in the netrc file.
    pub fn urs_host(&self) -> &str {
        let without_scheme = self
            .urs_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.urs_url);
        without_scheme
            .split(|c| c == '/' || c == ':')
            .next()
            .unwrap_or(without_scheme)
    }

    pub fn netrc_file(&self) -> Option<PathBuf> {
        if let Some(pth) = &self.netrc_path {
            return Some(pth.clone());
        }

        let name = if cfg!(windows) { "_netrc" } else { ".netrc" };
        Some(dirs::home_dir()?.join(name))
    }
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
