// Geographic primitives and the grid-bucket GeoIndex
//
// Radius queries scan candidate grid cells as a cheap pre-filter and apply
// the true haversine distance for final inclusion, so the contract is always
// "distance <= radius", never a bounding-box approximation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude (and of longitude at the equator).
const KM_PER_DEG: f64 = 111.0;

/// Grid cell edge in degrees. 0.25 degrees is ~28 km of latitude, so any
/// practical query radius spans only a handful of cells.
const CELL_SIZE_DEG: f64 = 0.25;

/// Longitude cells per full turn (360 / CELL_SIZE_DEG).
const CELLS_PER_TURN: i32 = 1440;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Clients report (0, 0) when they have no location fix.
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }

    /// Great-circle distance to another point in kilometers.
    ///
    /// a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)
    /// c = 2·atan2(√a, √(1−a))
    /// d = R·c
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// A latitude/longitude box enclosing a radius around a center point.
///
/// Pre-filter only: everything inside the true radius is inside the box, but
/// the corners of the box are farther away than the radius.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// `min_lon`/`max_lon` may extend past ±180 when the radius crosses
    /// the antimeridian; consumers match wrapped longitudes against the
    /// unclamped range.
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let dlat = radius_km / KM_PER_DEG;
        // Longitude degrees shrink with latitude; clamp the cosine so the
        // box stays finite near the poles.
        let cos_lat = center.lat.to_radians().cos().abs().max(0.01);
        let dlon = radius_km / (KM_PER_DEG * cos_lat);

        Self {
            min_lat: center.lat - dlat,
            max_lat: center.lat + dlat,
            min_lon: center.lon - dlon,
            max_lon: center.lon + dlon,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        if point.lat < self.min_lat || point.lat > self.max_lat {
            return false;
        }
        [point.lon, point.lon + 360.0, point.lon - 360.0]
            .into_iter()
            .any(|lon| lon >= self.min_lon && lon <= self.max_lon)
    }
}

type Cell = (i32, i32);

fn cell_of(point: &GeoPoint) -> Cell {
    (
        (point.lat / CELL_SIZE_DEG).floor() as i32,
        (point.lon / CELL_SIZE_DEG).floor() as i32,
    )
}

/// Map a possibly out-of-range longitude cell back into the stored cell
/// range, so a query box crossing the antimeridian lands on the cells of
/// points on the far side.
fn wrap_lon_cell(cell: i32) -> i32 {
    (cell + CELLS_PER_TURN / 2).rem_euclid(CELLS_PER_TURN) - CELLS_PER_TURN / 2
}

/// Grid-bucket index over point-tagged records.
///
/// Records are keyed so they can be moved (user locations) or updated in
/// place (outbreaks). Radius queries return matching records together with
/// their haversine distance from the query center, nearest first.
#[derive(Debug, Clone)]
pub struct GeoIndex<K, T> {
    entries: HashMap<K, (GeoPoint, T)>,
    cells: HashMap<Cell, HashSet<K>>,
}

impl<K, T> Default for GeoIndex<K, T>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> GeoIndex<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the record for `key`, re-bucketing if it moved.
    pub fn upsert(&mut self, key: K, point: GeoPoint, value: T) {
        if let Some((old_point, _)) = self.entries.get(&key) {
            let old_cell = cell_of(old_point);
            let new_cell = cell_of(&point);
            if old_cell != new_cell {
                if let Some(members) = self.cells.get_mut(&old_cell) {
                    members.remove(&key);
                    if members.is_empty() {
                        self.cells.remove(&old_cell);
                    }
                }
                self.cells.entry(new_cell).or_default().insert(key.clone());
            }
        } else {
            self.cells
                .entry(cell_of(&point))
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, (point, value));
    }

    pub fn remove(&mut self, key: &K) -> Option<T> {
        let (point, value) = self.entries.remove(key)?;
        let cell = cell_of(&point);
        if let Some(members) = self.cells.get_mut(&cell) {
            members.remove(key);
            if members.is_empty() {
                self.cells.remove(&cell);
            }
        }
        Some(value)
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.get(key).map(|(_, value)| value)
    }

    /// Iterate over all records regardless of location.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &GeoPoint, &T)> {
        self.entries
            .iter()
            .map(|(key, (point, value))| (key, point, value))
    }

    /// All records matching `filter` within `radius_km` of `center`,
    /// with their distance in kilometers, nearest first.
    pub fn query<F>(&self, center: GeoPoint, radius_km: f64, filter: F) -> Vec<(&K, &T, f64)>
    where
        F: Fn(&T) -> bool,
    {
        let bbox = BoundingBox::around(center, radius_km);
        let (min_lat_cell, min_lon_cell) = cell_of(&GeoPoint::new(bbox.min_lat, bbox.min_lon));
        let (max_lat_cell, max_lon_cell) = cell_of(&GeoPoint::new(bbox.max_lat, bbox.max_lon));

        let mut matches = Vec::new();
        for lat_cell in min_lat_cell..=max_lat_cell {
            for raw_lon_cell in min_lon_cell..=max_lon_cell.min(min_lon_cell + CELLS_PER_TURN - 1) {
                let lon_cell = wrap_lon_cell(raw_lon_cell);
                let Some(members) = self.cells.get(&(lat_cell, lon_cell)) else {
                    continue;
                };
                for key in members {
                    let (point, value) = &self.entries[key];
                    if !filter(value) {
                        continue;
                    }
                    let distance = center.haversine_km(point);
                    if distance <= radius_km {
                        matches.push((key, value, distance));
                    }
                }
            }
        }

        matches.sort_by(|a, b| a.2.total_cmp(&b.2));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Kilometers per degree of latitude on a 6371 km sphere.
    const KM_PER_DEG_EXACT: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

    fn offset_north(origin: GeoPoint, km: f64) -> GeoPoint {
        GeoPoint::new(origin.lat + km / KM_PER_DEG_EXACT, origin.lon)
    }

    #[test]
    fn haversine_distance_to_self_is_zero() {
        let p = GeoPoint::new(25.3176, 82.9912);
        assert_eq!(p.haversine_km(&p), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let p = GeoPoint::new(25.3176, 82.9912);
        let q = GeoPoint::new(26.8467, 80.9462);
        let pq = p.haversine_km(&q);
        let qp = q.haversine_km(&p);
        assert!((pq - qp).abs() < 1e-9);
    }

    #[test]
    fn haversine_one_degree_meridian() {
        // One degree along a meridian at the equator is ~111.19 km.
        let p = GeoPoint::new(0.0, 0.0);
        let q = GeoPoint::new(1.0, 0.0);
        let d = p.haversine_km(&q);
        let expected = KM_PER_DEG_EXACT;
        assert!((d - expected).abs() / expected < 0.005, "got {d}");
    }

    #[test]
    fn bounding_box_encloses_radius() {
        let center = GeoPoint::new(25.0, 83.0);
        let bbox = BoundingBox::around(center, 5.0);
        assert!(bbox.contains(&offset_north(center, 4.9)));
        assert!(bbox.contains(&center));
        assert!(!bbox.contains(&offset_north(center, 20.0)));
    }

    #[test]
    fn query_uses_true_distance_not_the_box() {
        let center = GeoPoint::new(25.0, 83.0);
        let mut index: GeoIndex<u32, &str> = GeoIndex::new();
        // A box corner point: inside the bounding box, outside the radius.
        let corner = GeoPoint::new(
            center.lat + 4.5 / KM_PER_DEG_EXACT,
            center.lon + 4.5 / (KM_PER_DEG_EXACT * center.lat.to_radians().cos()),
        );
        index.upsert(1, corner, "corner");
        index.upsert(2, offset_north(center, 3.0), "inside");

        let hits = index.query(center, 5.0, |_| true);
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].1, "inside");
    }

    #[test]
    fn query_radius_boundary() {
        let center = GeoPoint::new(10.0, 10.0);
        let mut index: GeoIndex<u32, ()> = GeoIndex::new();
        index.upsert(1, offset_north(center, 4.95), ());
        index.upsert(2, offset_north(center, 5.05), ());

        let hits = index.query(center, 5.0, |_| true);
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].0, 1);
    }

    #[test]
    fn query_wraps_across_the_antimeridian() {
        let center = GeoPoint::new(0.0, 179.99);
        let mut index: GeoIndex<u32, &str> = GeoIndex::new();
        // ~2.2 km away, on the other side of the 180th meridian.
        index.upsert(1, GeoPoint::new(0.0, -179.99), "far side");
        index.upsert(2, GeoPoint::new(0.0, 170.0), "distant");

        let hits = index.query(center, 5.0, |_| true);
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].1, "far side");

        let bbox = BoundingBox::around(center, 5.0);
        assert!(bbox.contains(&GeoPoint::new(0.0, -179.99)));
        assert!(!bbox.contains(&GeoPoint::new(0.0, 179.0)));
    }

    #[test]
    fn query_respects_filter() {
        let center = GeoPoint::new(0.0, 0.0);
        let mut index: GeoIndex<u32, &str> = GeoIndex::new();
        index.upsert(1, offset_north(center, 1.0), "late blight");
        index.upsert(2, offset_north(center, 2.0), "rust");

        let hits = index.query(center, 10.0, |d| *d == "rust");
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].0, 2);
    }

    #[test]
    fn query_sorts_nearest_first() {
        let center = GeoPoint::new(0.0, 0.0);
        let mut index: GeoIndex<u32, ()> = GeoIndex::new();
        index.upsert(1, offset_north(center, 8.0), ());
        index.upsert(2, offset_north(center, 2.0), ());
        index.upsert(3, offset_north(center, 5.0), ());

        let hits = index.query(center, 10.0, |_| true);
        let order: Vec<u32> = hits.iter().map(|(k, _, _)| **k).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn upsert_moves_record_between_cells() {
        let mut index: GeoIndex<&str, ()> = GeoIndex::new();
        let here = GeoPoint::new(25.0, 83.0);
        let far = GeoPoint::new(26.8, 80.9);
        index.upsert("farmer-1", here, ());
        index.upsert("farmer-1", far, ());

        assert_eq!(index.len(), 1);
        assert!(index.query(here, 5.0, |_| true).is_empty());
        assert_eq!(index.query(far, 5.0, |_| true).len(), 1);
    }

    #[test]
    fn remove_clears_cell_membership() {
        let mut index: GeoIndex<u32, ()> = GeoIndex::new();
        let p = GeoPoint::new(25.0, 83.0);
        index.upsert(7, p, ());
        assert!(index.remove(&7).is_some());
        assert!(index.is_empty());
        assert!(index.query(p, 5.0, |_| true).is_empty());
        assert!(index.remove(&7).is_none());
    }
}
