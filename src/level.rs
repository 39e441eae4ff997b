use clap::ValueEnum;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::PaceError;

/// Processing level of a granule.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr, ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    /// Swath granules.
    L2,
    /// Mapped (gridded) composites.
    L3,
}

impl Level {
    pub fn parse(code: &str) -> Result<Self, PaceError> {
        code.parse::<Level>().map_err(|_| PaceError::UnknownLevel(code.to_owned()))
    }
}
