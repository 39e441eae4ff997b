use crate::{level::Level, product::Product};

/// CMR collection short name for a product at a processing level.
///
/// Level 3 products map to the near-real-time monthly mapped collections.
pub fn short_name(product: Product, level: Level) -> &'static str {
    use Level::*;
    use Product::*;

    match (product, level) {
        (Kd, L2) => "PACE_OCI_L2_KD",
        (Kd, L3) => "PACE_OCI_L3M_KD_NRT",
        (Chl, L2) => "PACE_OCI_L2_CHL",
        (Chl, L3) => "PACE_OCI_L3M_CHL_NRT",
        (Rrs, L2) => "PACE_OCI_L2_RRS",
        (Rrs, L3) => "PACE_OCI_L3M_RRS_NRT",
        (Aop, L2) => "PACE_OCI_L2_AOP",
        (Aop, L3) => "PACE_OCI_L3M_AOP_NRT",
        (Iop, L2) => "PACE_OCI_L2_IOP",
        (Iop, L3) => "PACE_OCI_L3M_IOP_NRT",
    }
}
