use clap::ValueEnum;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::PaceError;

/// The PACE OCI ocean-color variables this crate knows how to fetch.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr, ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Product {
    /// Diffuse attenuation coefficient.
    Kd,
    /// Chlorophyll-a concentration.
    Chl,
    /// Remote sensing reflectance.
    Rrs,
    /// Apparent optical properties.
    Aop,
    /// Inherent optical properties.
    Iop,
}

impl Product {
    /// Parse a short code such as `"chl"`, rejecting anything outside the fixed set.
    pub fn parse(code: &str) -> Result<Self, PaceError> {
        code.parse::<Product>().map_err(|_| PaceError::UnknownProduct(code.to_owned()))
    }
}
