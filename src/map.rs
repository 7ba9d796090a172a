//! GeoJSON layer for the map screen. Reports without coordinates (address
//! only) are left off the map.

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::model::CrisisReport;

fn feature(report: &CrisisReport) -> Option<Feature> {
    let coordinates = report.location()?.coordinates()?;

    let mut properties = JsonObject::new();
    properties.insert("title".into(), json!(report.title));
    properties.insert("category".into(), json!(report.category.as_str()));
    properties.insert("status".into(), json!(report.status.as_str()));
    properties.insert("severity".into(), json!(report.severity.as_str()));
    properties.insert("location".into(), json!(report.display_location()));
    properties.insert("responders".into(), json!(report.responders));

    Some(Feature {
        bbox: None,
        // GeoJSON positions are [lon, lat]
        geometry: Some(Geometry::new(Value::Point(vec![
            coordinates.lon(),
            coordinates.lat(),
        ]))),
        id: Some(Id::Number(report.id.get().into())),
        properties: Some(properties),
        foreign_members: None,
    })
}

#[must_use]
pub fn feature_collection<'a>(reports: impl IntoIterator<Item = &'a CrisisReport>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: reports.into_iter().filter_map(feature).collect(),
        foreign_members: None,
    }
}

/// Serialized collection handed to the shell's map widget.
#[must_use]
pub fn to_geojson_string<'a>(reports: impl IntoIterator<Item = &'a CrisisReport>) -> String {
    serde_json::to_string(&feature_collection(reports))
        .unwrap_or_else(|_| r#"{"type":"FeatureCollection","features":[]}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::report;

    #[test]
    fn test_point_order_is_lon_lat() {
        let collection = feature_collection([&report(1)]);
        assert_eq!(collection.features.len(), 1);
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.value, Value::Point(vec![29.23, -25.87]));
    }

    #[test]
    fn test_address_only_reports_skipped() {
        let mut r = report(1);
        r.latitude = None;
        r.longitude = None;
        assert!(feature_collection([&r]).features.is_empty());
    }

    #[test]
    fn test_serialized_properties() {
        let json: serde_json::Value =
            serde_json::from_str(&to_geojson_string([&report(7)])).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["id"], 7);
        assert_eq!(json["features"][0]["properties"]["category"], "FIRE");
    }
}
