//! Country name to coordinate resolution.
//!
//! Resolvers are explicit objects handed to the controller; any caching
//! they do is their own, inspectable state.

use crate::error::DataError;
use crate::sphere::GeoPoint;
use geo::{Centroid, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// How a location was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    /// Case-insensitive exact name match
    Exact,
    /// Partial name match
    Fuzzy,
    /// Name unknown; the point is `(0, 0)` and should be treated as a
    /// data-quality problem
    Fallback,
}

/// A resolved location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub point: GeoPoint,
    pub source: LocationSource,
}

impl ResolvedLocation {
    pub fn exact(point: GeoPoint) -> Self {
        Self {
            point,
            source: LocationSource::Exact,
        }
    }

    pub fn fallback() -> Self {
        Self {
            point: GeoPoint::ORIGIN,
            source: LocationSource::Fallback,
        }
    }

    /// True when the point is a placeholder rather than real data.
    pub fn is_fallback(&self) -> bool {
        self.source == LocationSource::Fallback
    }
}

/// Maps a place name to a coordinate. Must be deterministic per name.
pub trait LocationResolver {
    fn resolve(&mut self, name: &str) -> ResolvedLocation;
}

/// Fixed name table.
#[derive(Debug, Clone, Default)]
pub struct StaticGazetteer {
    entries: HashMap<String, GeoPoint>,
}

/// Approximate centres of major trading nations.
const BUILTIN_LOCATIONS: &[(&str, f64, f64)] = &[
    ("argentina", -34.0, -64.0),
    ("australia", -25.3, 133.8),
    ("belgium", 50.6, 4.7),
    ("brazil", -10.3, -53.1),
    ("canada", 56.1, -106.3),
    ("chile", -35.7, -71.5),
    ("china", 35.0, 104.2),
    ("democratic republic of the congo", -2.9, 23.6),
    ("egypt", 26.8, 30.8),
    ("france", 46.2, 2.2),
    ("germany", 51.2, 10.5),
    ("india", 22.9, 79.6),
    ("indonesia", -2.5, 118.0),
    ("italy", 42.8, 12.6),
    ("japan", 36.2, 138.3),
    ("kazakhstan", 48.0, 67.0),
    ("malaysia", 4.2, 102.0),
    ("mexico", 23.6, -102.6),
    ("netherlands", 52.1, 5.3),
    ("new zealand", -41.8, 172.6),
    ("nigeria", 9.1, 8.7),
    ("norway", 64.6, 12.0),
    ("peru", -9.2, -75.0),
    ("philippines", 12.9, 121.8),
    ("poland", 52.1, 19.4),
    ("russia", 61.5, 105.3),
    ("saudi arabia", 23.9, 45.1),
    ("singapore", 1.35, 103.8),
    ("south africa", -29.0, 25.1),
    ("south korea", 36.5, 127.9),
    ("spain", 40.2, -3.6),
    ("switzerland", 46.8, 8.2),
    ("taiwan", 23.7, 121.0),
    ("thailand", 15.1, 101.0),
    ("turkey", 39.0, 35.2),
    ("united arab emirates", 23.9, 54.3),
    ("united kingdom", 54.0, -2.5),
    ("united states of america", 39.8, -98.6),
    ("usa", 39.8, -98.6),
    ("vietnam", 16.0, 107.8),
];

impl StaticGazetteer {
    /// Creates an empty gazetteer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gazetteer preloaded with major trading nations.
    pub fn builtin() -> Self {
        let mut gazetteer = Self::new();
        for &(name, lat, lng) in BUILTIN_LOCATIONS {
            gazetteer.insert(name, GeoPoint::new(lat, lng));
        }
        gazetteer
    }

    /// Adds or replaces an entry. Names are case-insensitive.
    pub fn insert(&mut self, name: &str, point: GeoPoint) {
        self.entries.insert(name.trim().to_lowercase(), point);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocationResolver for StaticGazetteer {
    fn resolve(&mut self, name: &str) -> ResolvedLocation {
        self.entries
            .get(&name.trim().to_lowercase())
            .map(|p| ResolvedLocation::exact(*p))
            .unwrap_or_else(ResolvedLocation::fallback)
    }
}

// ============================================================================
// GeoJSON centroid resolver
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: RawProperties,
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(rename = "ADMIN")]
    admin: Option<String>,
    #[serde(rename = "NAME")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

type Ring = Vec<Vec<f64>>;

/// One country outline.
#[derive(Debug, Clone)]
struct CountryShape {
    /// Lower-cased display name
    name: String,
    /// Outline used for the centroid; `None` for unsupported geometry
    outline: Option<Polygon<f64>>,
}

impl CountryShape {
    fn from_feature(feature: RawFeature) -> Option<Self> {
        let name = feature
            .properties
            .admin
            .or(feature.properties.name)?
            .to_lowercase();
        let outline = feature.geometry.and_then(outline_of);
        Some(Self { name, outline })
    }

    fn centroid(&self) -> Option<GeoPoint> {
        let c = self.outline.as_ref()?.centroid()?;
        Some(GeoPoint::new(c.y(), c.x()))
    }
}

/// Picks the outer ring to locate a geometry by. For multipolygons this is
/// the ring with the most vertices, so small islands don't pull the
/// centroid off the mainland.
fn outline_of(geometry: RawGeometry) -> Option<Polygon<f64>> {
    let ring: Ring = match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Ring> = serde_json::from_value(geometry.coordinates).ok()?;
            rings.into_iter().next()?
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Ring>> = serde_json::from_value(geometry.coordinates).ok()?;
            polygons
                .into_iter()
                .filter_map(|rings| rings.into_iter().next())
                .max_by_key(|ring| ring.len())?
        }
        _ => return None,
    };

    let coords: Vec<Coord<f64>> = ring
        .iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| Coord { x: pos[0], y: pos[1] })
        .collect();
    if coords.is_empty() {
        return None;
    }
    Some(Polygon::new(LineString::from(coords), vec![]))
}

/// Resolves names to the centroid of their country polygon.
///
/// Lookup order: exact (case-insensitive) name, then a partial match in
/// either direction. Results are memoised per requested name.
#[derive(Debug, Clone, Default)]
pub struct CentroidResolver {
    shapes: Vec<CountryShape>,
    cache: HashMap<String, ResolvedLocation>,
}

impl CentroidResolver {
    /// Parses a GeoJSON `FeatureCollection`. Features without an `ADMIN`
    /// or `NAME` property are skipped.
    pub fn from_geojson_str(text: &str) -> Result<Self, DataError> {
        let collection: RawCollection = serde_json::from_str(text)?;
        Ok(Self {
            shapes: collection
                .features
                .into_iter()
                .filter_map(CountryShape::from_feature)
                .collect(),
            cache: HashMap::new(),
        })
    }

    /// Reads a GeoJSON `FeatureCollection` from disk.
    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&text)
    }

    /// Number of country shapes loaded.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Cached result for `name`, if it has been resolved before.
    pub fn cached(&self, name: &str) -> Option<ResolvedLocation> {
        self.cache.get(&name.to_lowercase()).copied()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn lookup(&self, key: &str) -> ResolvedLocation {
        if key.is_empty() {
            return ResolvedLocation::fallback();
        }
        let exact = self.shapes.iter().find(|s| s.name == key);
        let (shape, source) = match exact {
            Some(shape) => (shape, LocationSource::Exact),
            None => {
                let fuzzy = self
                    .shapes
                    .iter()
                    .find(|s| !s.name.is_empty() && (s.name.contains(key) || key.contains(&s.name)));
                match fuzzy {
                    Some(shape) => (shape, LocationSource::Fuzzy),
                    None => return ResolvedLocation::fallback(),
                }
            }
        };
        match shape.centroid() {
            Some(point) => ResolvedLocation { point, source },
            None => ResolvedLocation::fallback(),
        }
    }
}

impl LocationResolver for CentroidResolver {
    fn resolve(&mut self, name: &str) -> ResolvedLocation {
        let key = name.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }
        let resolved = self.lookup(&key);
        // Misses are not cached so a later, larger dataset can still fill them
        if !resolved.is_fallback() {
            self.cache.insert(key, resolved);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const COUNTRIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ADMIN": "Squareland" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[10, 10], [20, 10], [20, 20], [10, 20], [10, 10]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Archipelago Republic" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[100, 0], [101, 0], [101, 1], [100, 0]]],
                        [[[-40, -10], [-30, -10], [-30, 0], [-35, 2], [-40, 0], [-40, -10]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "ADMIN": "Pointless" },
                "geometry": { "type": "Point", "coordinates": [5, 5] }
            }
        ]
    }"#;

    #[test]
    fn test_exact_match_uses_polygon_centroid() {
        let mut resolver = CentroidResolver::from_geojson_str(COUNTRIES).unwrap();
        let hit = resolver.resolve("SQUARELAND");

        assert_eq!(hit.source, LocationSource::Exact);
        assert_relative_eq!(hit.point.lat, 15.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point.lng, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_multipolygon_uses_largest_ring() {
        let mut resolver = CentroidResolver::from_geojson_str(COUNTRIES).unwrap();
        let hit = resolver.resolve("archipelago republic");

        assert!(hit.point.lng < -30.0 && hit.point.lng > -40.0);
        assert!(hit.point.lat < 2.0 && hit.point.lat > -10.0);
    }

    #[test]
    fn test_fuzzy_match_either_direction() {
        let mut resolver = CentroidResolver::from_geojson_str(COUNTRIES).unwrap();
        assert_eq!(resolver.resolve("Archipelago").source, LocationSource::Fuzzy);
        assert_eq!(resolver.resolve("Republic of Squareland").source, LocationSource::Fuzzy);
    }

    #[test]
    fn test_unknown_and_unsupported_fall_back() {
        let mut resolver = CentroidResolver::from_geojson_str(COUNTRIES).unwrap();
        assert!(resolver.resolve("Atlantis").is_fallback());
        assert!(resolver.resolve("Pointless").is_fallback());
        assert_eq!(resolver.resolve("Atlantis").point, GeoPoint::ORIGIN);
    }

    #[test]
    fn test_blank_name_falls_back() {
        let mut resolver = CentroidResolver::from_geojson_str(COUNTRIES).unwrap();
        assert_eq!(resolver.resolve("").source, LocationSource::Fallback);
        assert!(resolver.resolve("   ").is_fallback());
        assert_eq!(resolver.resolve(" Squareland ").source, LocationSource::Exact);
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn test_cache_is_inspectable() {
        let mut resolver = CentroidResolver::from_geojson_str(COUNTRIES).unwrap();
        assert_eq!(resolver.cache_len(), 0);

        let first = resolver.resolve("Squareland");
        resolver.resolve("Atlantis");

        assert_eq!(resolver.cache_len(), 1);
        assert_eq!(resolver.cached("squareland"), Some(first));
        assert_eq!(resolver.resolve("Squareland"), first);

        resolver.clear_cache();
        assert_eq!(resolver.cache_len(), 0);
    }

    #[test]
    fn test_static_gazetteer() {
        let mut gazetteer = StaticGazetteer::builtin();
        assert_eq!(gazetteer.resolve("  China ").source, LocationSource::Exact);
        assert!(gazetteer.resolve("Atlantis").is_fallback());

        gazetteer.insert("Atlantis", GeoPoint::new(31.0, -24.0));
        assert_eq!(gazetteer.resolve("atlantis").point, GeoPoint::new(31.0, -24.0));
    }
}
