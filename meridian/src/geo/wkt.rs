//! WKT parsing and validation.

use geo::algorithm::coords_iter::CoordsIter;
use geo::algorithm::validation::Validation;
use geo_types::Geometry;
use wkt::TryFromWkt;

use crate::error::{Error, Result};

/// Parses a WKT literal into a geometry.
///
/// Admits Point, LineString, Polygon and MultiPolygon. Coordinates must lie
/// within the doubled longitude/latitude envelope (±360, ±180) so that
/// antimeridian-shifted rings stay expressible; polygons must be
/// topologically valid (closed, non-self-intersecting rings).
pub fn parse_wkt(literal: &str) -> Result<Geometry<f64>> {
    let geometry: Geometry<f64> = Geometry::try_from_wkt_str(literal.trim())
        .map_err(|e| Error::InvalidParameter(format!("invalid WKT: {e}")))?;

    match &geometry {
        Geometry::Point(_) | Geometry::LineString(_) => {}
        Geometry::Polygon(p) => {
            if !p.is_valid() {
                return Err(Error::InvalidParameter(
                    "invalid WKT polygon topology".to_string(),
                ));
            }
        }
        Geometry::MultiPolygon(mp) => {
            if !mp.is_valid() {
                return Err(Error::InvalidParameter(
                    "invalid WKT multipolygon topology".to_string(),
                ));
            }
        }
        _ => {
            return Err(Error::InvalidParameter(
                "only POINT, LINESTRING, POLYGON and MULTIPOLYGON literals are supported"
                    .to_string(),
            ))
        }
    }

    for c in geometry.coords_iter() {
        if c.x.abs() > 360.0 || c.y.abs() > 180.0 {
            return Err(Error::InvalidParameter(format!(
                "WKT coordinate ({}, {}) outside the ±360/±180 envelope",
                c.x, c.y
            )));
        }
    }
    Ok(geometry)
}
