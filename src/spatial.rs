use crate::error::PaceError;

/// Default search radius around a point, in kilometers.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, PaceError> {
        check_lon(west)?;
        check_lon(east)?;
        check_lat(south)?;
        check_lat(north)?;

        if south > north {
            return Err(PaceError::InvalidSpatialFilter(format!(
                "south edge {} is north of north edge {}",
                south, north
            )));
        }

        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }
}

/// A search point given as latitude then longitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Result<Self, PaceError> {
        check_lat(lat)?;
        check_lon(lon)?;
        Ok(Self { lat, lon })
    }
}

/// Restricts a granule search to an area. Only one kind of filter is applied per search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpatialFilter {
    BoundingBox(BoundingBox),
    Circle { center: Point, radius_km: f64 },
}

impl SpatialFilter {
    pub fn circle(center: Point, radius_km: f64) -> Result<Self, PaceError> {
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(PaceError::InvalidSpatialFilter(format!(
                "radius must be a positive number of km, got {}",
                radius_km
            )));
        }

        Ok(SpatialFilter::Circle { center, radius_km })
    }

    /// Build a filter from the loose pieces a command line provides.
    ///
    /// `bbox` is `[west, south, east, north]`, `point` is `[lat, lon]`. Giving both is an error,
    /// giving neither means no spatial restriction.
    pub fn from_parts(
        bbox: Option<&[f64]>,
        point: Option<&[f64]>,
        radius_km: Option<f64>,
    ) -> Result<Option<Self>, PaceError> {
        match (bbox, point) {
            (Some(_), Some(_)) => Err(PaceError::InvalidSpatialFilter(
                "use either a bounding box or a point, not both".into(),
            )),
            (Some(&[west, south, east, north]), None) => Ok(Some(SpatialFilter::BoundingBox(
                BoundingBox::new(west, south, east, north)?,
            ))),
            (Some(values), None) => Err(PaceError::InvalidSpatialFilter(format!(
                "bounding box needs 4 values, got {}",
                values.len()
            ))),
            (None, Some(&[lat, lon])) => {
                let center = Point::new(lat, lon)?;
                Ok(Some(Self::circle(
                    center,
                    radius_km.unwrap_or(DEFAULT_RADIUS_KM),
                )?))
            }
            (None, Some(values)) => Err(PaceError::InvalidSpatialFilter(format!(
                "point needs 2 values (lat lon), got {}",
                values.len()
            ))),
            (None, None) => Ok(None),
        }
    }
}

fn check_lat(lat: f64) -> Result<(), PaceError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(PaceError::InvalidSpatialFilter(format!(
            "latitude {} outside [-90, 90]",
            lat
        )))
    }
}

fn check_lon(lon: f64) -> Result<(), PaceError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(PaceError::InvalidSpatialFilter(format!(
            "longitude {} outside [-180, 180]",
            lon
        )))
    }
}
