//! Spatial-cell decoding: geohash, web-mercator tiles and H3 hexagons.
//!
//! Each cell family offers the same two views: the cell's center point and
//! the cell's polygon, both used by the aggregation result formatter.

use std::f64::consts::PI;
use std::str::FromStr;

use geo_types::{coord, Coord, LineString, Polygon};
use h3o::CellIndex;

use super::bbox::BoundingBox;
use crate::error::{Error, Result};

/// Center of a geohash cell, via the standard base-32 bit-interleaving decode.
pub fn geohash_center(hash: &str) -> Result<Coord<f64>> {
    let (center, _, _) = geohash::decode(hash)
        .map_err(|e| Error::InvalidParameter(format!("invalid geohash '{hash}': {e}")))?;
    Ok(center)
}

/// The geohash cell's bounds as a polygon ring.
pub fn geohash_polygon(hash: &str) -> Result<Polygon<f64>> {
    let rect = geohash::decode_bbox(hash)
        .map_err(|e| Error::InvalidParameter(format!("invalid geohash '{hash}': {e}")))?;
    Ok(rect.to_polygon())
}

/// Parses a `z/x/y` tile key.
pub fn parse_tile_key(key: &str) -> Result<(u8, u32, u32)> {
    let invalid =
        || Error::InvalidParameter(format!("tile key must be of the form z/x/y, got '{key}'"));
    let mut parts = key.split('/');
    let (z, x, y) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(z), Some(x), Some(y), None) => (z, x, y),
        _ => return Err(invalid()),
    };
    let z: u8 = z.parse().map_err(|_| invalid())?;
    let x: u32 = x.parse().map_err(|_| invalid())?;
    let y: u32 = y.parse().map_err(|_| invalid())?;
    let n = 1u32 << z.min(31);
    if z > 29 || x >= n || y >= n {
        return Err(Error::InvalidParameter(format!(
            "tile {key} is out of range for zoom {z}"
        )));
    }
    Ok((z, x, y))
}

/// Bounds of a web-mercator tile, standard slippy-map math.
pub fn tile_bbox(z: u8, x: u32, y: u32) -> BoundingBox {
    let n = (1u64 << z) as f64;
    let west = x as f64 / n * 360.0 - 180.0;
    let east = (x + 1) as f64 / n * 360.0 - 180.0;
    let north = mercator_lat(y as f64 / n);
    let south = mercator_lat((y + 1) as f64 / n);
    BoundingBox {
        west,
        south,
        east,
        north,
    }
}

pub fn tile_center(z: u8, x: u32, y: u32) -> Coord<f64> {
    let b = tile_bbox(z, x, y);
    coord! { x: (b.west + b.east) / 2.0, y: (b.south + b.north) / 2.0 }
}

fn mercator_lat(fraction: f64) -> f64 {
    (PI * (1.0 - 2.0 * fraction)).sinh().atan().to_degrees()
}

/// Center of an H3 cell.
pub fn h3_center(index: &str) -> Result<Coord<f64>> {
    let cell = parse_h3(index)?;
    let center = h3o::LatLng::from(cell);
    Ok(coord! { x: center.lng(), y: center.lat() })
}

/// The H3 cell's boundary as a polygon ring.
pub fn h3_polygon(index: &str) -> Result<Polygon<f64>> {
    let cell = parse_h3(index)?;
    let mut ring: Vec<Coord<f64>> = cell
        .boundary()
        .iter()
        .map(|v| coord! { x: v.lng(), y: v.lat() })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    Ok(Polygon::new(LineString::new(ring), vec![]))
}

fn parse_h3(index: &str) -> Result<CellIndex> {
    CellIndex::from_str(index)
        .map_err(|e| Error::InvalidParameter(format!("invalid H3 index '{index}': {e}")))
}
