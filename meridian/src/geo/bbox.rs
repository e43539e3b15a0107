//! Bounding boxes, including the antimeridian-crossing case.

use geo_types::{coord, LineString, Polygon};

use super::{orient_polygon, RingOrientation};
use crate::error::{Error, Result};

/// A `west,south,east,north` bounding box in degrees.
///
/// `west > east` means the box crosses the antimeridian and wraps around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return Err(Error::InvalidParameter(format!(
                "bbox longitudes must be within [-180, 180], got west={west} east={east}"
            )));
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(Error::InvalidParameter(format!(
                "bbox latitudes must be within [-90, 90], got south={south} north={north}"
            )));
        }
        if south >= north {
            return Err(Error::InvalidParameter(format!(
                "bbox south ({south}) must be below north ({north})"
            )));
        }
        if west == east {
            return Err(Error::InvalidParameter(
                "bbox west and east must differ".to_string(),
            ));
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Parses the `west,south,east,north` literal.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(Error::InvalidParameter(format!(
                "bbox must be west,south,east,north, got '{s}'"
            )));
        }
        let mut coords = [0f64; 4];
        for (i, p) in parts.iter().enumerate() {
            coords[i] = p.parse().map_err(|_| {
                Error::InvalidParameter(format!("bbox coordinate is not a number: '{p}'"))
            })?;
        }
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Builds the box's ring with the requested winding. A wrapping box has
    /// its east bound shifted by +360 first, so the ring spans the
    /// antimeridian instead of the rest of the globe.
    pub fn to_polygon(&self, orientation: RingOrientation) -> Polygon<f64> {
        let east = if self.crosses_antimeridian() {
            self.east + 360.0
        } else {
            self.east
        };
        let ring = LineString::new(vec![
            coord! { x: self.west, y: self.south },
            coord! { x: east, y: self.south },
            coord! { x: east, y: self.north },
            coord! { x: self.west, y: self.north },
            coord! { x: self.west, y: self.south },
        ]);
        orient_polygon(Polygon::new(ring, vec![]), orientation)
    }
}
