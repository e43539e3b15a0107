//! Pure geometry and cell math: WKT parsing, bounding boxes, ring winding,
//! and spatial-cell decoding (geohash, web-mercator tiles, H3).
//!
//! Everything here is stateless; the compiler and the formatter both lean on
//! these helpers.

mod bbox;
mod cells;
mod wkt;

pub use bbox::BoundingBox;
pub use cells::{
    geohash_center, geohash_polygon, h3_center, h3_polygon, parse_tile_key, tile_bbox,
    tile_center,
};
pub use wkt::parse_wkt;

use geo::orient::{Direction, Orient};
use geo_types::{MultiPolygon, Polygon};

/// Exterior-ring winding of emitted polygons.
///
/// The backend's `left`/`right` orientation convention is the inverse of the
/// common GIS one, so both windings must be constructible; requests select
/// the right-hand (counter-clockwise exterior) convention explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOrientation {
    Clockwise,
    CounterClockwise,
}

impl RingOrientation {
    pub fn from_righthand(righthand: bool) -> Self {
        if righthand {
            RingOrientation::CounterClockwise
        } else {
            RingOrientation::Clockwise
        }
    }
}

/// Rewind a polygon's rings: the requested winding for the exterior, the
/// opposite for interiors.
pub fn orient_polygon(polygon: Polygon<f64>, orientation: RingOrientation) -> Polygon<f64> {
    match orientation {
        RingOrientation::CounterClockwise => polygon.orient(Direction::Default),
        RingOrientation::Clockwise => polygon.orient(Direction::Reversed),
    }
}

pub fn orient_multi_polygon(
    multi: MultiPolygon<f64>,
    orientation: RingOrientation,
) -> MultiPolygon<f64> {
    match orientation {
        RingOrientation::CounterClockwise => multi.orient(Direction::Default),
        RingOrientation::Clockwise => multi.orient(Direction::Reversed),
    }
}
