//! GeoJSON text encoding for geometry columns.

use geo::{Geometry, Point};
use log::warn;

use crate::{FeatureKey, LinkedOsmIds};

#[cfg(any(test, feature = "test-support"))]
/// Serialise a geometry as a GeoJSON geometry object.
pub(crate) fn encode_geometry(geometry: &Geometry<f64>) -> String {
    geojson::Geometry::from(geometry).to_string()
}

#[cfg(any(test, feature = "test-support"))]
/// Serialise a point as a GeoJSON `Point`.
pub(crate) fn encode_point(point: Point<f64>) -> String {
    encode_geometry(&Geometry::Point(point))
}

#[cfg(any(test, feature = "test-support"))]
/// Serialise linked ids as a JSON array.
pub(crate) fn encode_linked_ids(ids: &LinkedOsmIds) -> Result<String, serde_json::Error> {
    serde_json::to_string(ids)
}

/// Decode a stored geometry column.
///
/// Undecodable text is logged and treated as missing so the row counts as
/// malformed rather than failing the pass.
pub(crate) fn decode_geometry(
    key: FeatureKey,
    column: &'static str,
    text: Option<&str>,
) -> Option<Geometry<f64>> {
    let text = text?;
    let parsed = text
        .parse::<geojson::Geometry>()
        .and_then(|geometry| Geometry::<f64>::try_from(geometry.value));
    match parsed {
        Ok(geometry) => Some(geometry),
        Err(err) => {
            warn!("ignoring undecodable {column} on {key}: {err}");
            None
        }
    }
}

/// Decode a stored `geometry_center` column. Non-point geometries are ignored.
pub(crate) fn decode_point(key: FeatureKey, text: Option<&str>) -> Option<Point<f64>> {
    match decode_geometry(key, "geometry_center", text)? {
        Geometry::Point(point) => Some(point),
        other => {
            warn!(
                "ignoring geometry_center on {key}: expected a point, found {}",
                geometry_name(&other)
            );
            None
        }
    }
}

/// Decode a stored `linked_osm_ids` column, treating garbage as empty.
pub(crate) fn decode_linked_ids(key: FeatureKey, text: &str) -> LinkedOsmIds {
    serde_json::from_str(text).unwrap_or_else(|err| {
        warn!("ignoring undecodable linked_osm_ids on {key}: {err}");
        LinkedOsmIds::default()
    })
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureKind;
    use geo::polygon;
    use rstest::rstest;

    fn key() -> FeatureKey {
        FeatureKey::new(FeatureKind::Polygon, 1)
    }

    #[rstest]
    fn polygons_survive_storage() {
        let geometry: Geometry<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)].into();
        let text = encode_geometry(&geometry);
        assert!(text.contains("\"Polygon\""));
        assert_eq!(decode_geometry(key(), "geometry", Some(&text)), Some(geometry));
    }

    #[rstest]
    #[case("not json")]
    #[case("{\"type\":\"Point\"}")]
    #[case("{\"type\":\"Circle\",\"coordinates\":[1,2]}")]
    fn garbage_geometry_is_treated_as_missing(#[case] text: &str) {
        assert_eq!(decode_geometry(key(), "geometry", Some(text)), None);
    }

    #[rstest]
    fn centers_must_be_points() {
        let line = "{\"type\":\"LineString\",\"coordinates\":[[0,0],[1,1]]}";
        assert_eq!(decode_point(key(), Some(line)), None);
        let point = encode_point(Point::new(2.0, 2.0));
        assert_eq!(decode_point(key(), Some(&point)), Some(Point::new(2.0, 2.0)));
    }

    #[rstest]
    fn linked_ids_fall_back_to_empty() {
        assert!(decode_linked_ids(key(), "{").is_empty());
        let ids = decode_linked_ids(key(), "[1337, 43]");
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec![43, 1337]);
    }
}
