//! GeoJSON export of the joined counties.

use crate::processing::Choropleth;
use anyhow::{Context, Result};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn to_feature_collection(choropleth: &Choropleth) -> FeatureCollection {
    let features = choropleth
        .counties
        .iter()
        .map(|county| {
            let mut properties = JsonObject::new();
            properties.insert("fips".to_string(), json!(county.fips));
            properties.insert("area_name".to_string(), json!(county.record.as_ref().map(|r| &r.area_name)));
            properties.insert("state".to_string(), json!(county.record.as_ref().map(|r| &r.state)));
            properties.insert("education".to_string(), json!(county.education()));
            properties.insert("bucket".to_string(), json!(county.bucket));
            properties.insert("fill".to_string(), json!(choropleth.fill(county)));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&county.geometry))),
                id: Some(Id::Number(county.fips.0.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_geojson(choropleth: &Choropleth, path: &Path) -> Result<()> {
    let collection = to_feature_collection(choropleth);
    let json = serde_json::to_string(&collection).context("Failed to serialize GeoJSON")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write GeoJSON: {:?}", path))?;
    info!("Exported {} counties to {:?}", collection.features.len(), path);
    Ok(())
}
