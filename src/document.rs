//! HTML presentation of a [`Scene`].

use crate::render::Scene;
use anyhow::{Context, Result};
use askama::Template;
use std::fs;
use std::path::Path;
use tracing::info;

/// Page with the inline SVG map, legend and tooltip element.
#[derive(Template)]
#[template(path = "map.html")]
pub struct MapPage<'a> {
    pub scene: &'a Scene,
}

pub fn render_document(scene: &Scene) -> Result<String> {
    MapPage { scene }
        .render()
        .context("Failed to render map template")
}

pub fn write_document(scene: &Scene, path: &Path) -> Result<()> {
    let html = render_document(scene)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write map document: {:?}", path))?;
    info!("Wrote map with {} counties to {:?}", scene.counties.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{CountyShape, Legend, Overlay, Swatch, Tick};
    use crate::types::Fips;

    fn scene() -> Scene {
        Scene {
            width: 1024.0,
            height: 500.0,
            padding: 80.0,
            title: "USA Educational Data".to_string(),
            description: "Bachelor's degree or higher".to_string(),
            legend: Legend {
                offset_x: 409.6,
                swatches: vec![Swatch {
                    x: 0.0,
                    width: 38.0,
                    height: 8.0,
                    fill: "#fee6ce".to_string(),
                }],
                ticks: vec![Tick {
                    x: 0.0,
                    label: "10%".to_string(),
                }],
                tick_size: 13.0,
                axis_path: "M0,13V0H300V13".to_string(),
                swatch_stroke: "blue",
            },
            counties: vec![CountyShape {
                fips: Fips(1001),
                path: "M0,0L10,0L10,10Z".to_string(),
                fill: "#a63603".to_string(),
                education: Some(42.0),
                tooltip: "Autauga County, AL: 42%".to_string(),
            }],
            overlays: vec![Overlay {
                path: "M0,0L1,1".to_string(),
                stroke: "white",
            }],
            hover_stroke: "black",
        }
    }

    #[test]
    fn document_carries_county_attributes() {
        let html = render_document(&scene()).unwrap();
        assert!(html.contains(r#"id="title""#));
        assert!(html.contains(r#"id="legend""#));
        assert!(html.contains(r#"data-fips="1001""#));
        assert!(html.contains(r#"data-education="42""#));
        assert!(html.contains(r##"fill="#a63603""##));
        assert!(html.contains("Autauga County, AL: 42%"));
        assert!(html.contains(r#"width="1104""#));
    }

    #[test]
    fn strokes_come_from_the_scene() {
        let mut scene = scene();
        scene.legend.swatch_stroke = "navy";
        scene.hover_stroke = "crimson";
        let html = render_document(&scene).unwrap();
        assert!(html.contains(r#"stroke="navy""#));
        assert!(html.contains("'crimson'"));
        assert!(!html.contains("'black'"));
    }

    #[test]
    fn text_is_escaped() {
        let html = render_document(&scene()).unwrap();
        assert!(!html.contains("Bachelor's degree"));
        assert!(html.contains("Bachelor&"));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.html");
        write_document(&scene(), &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("county"));
    }
}
