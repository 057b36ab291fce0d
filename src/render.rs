//! Builds a [`Scene`]: a complete description of the map document, independent
//! of how it is finally written out.

use crate::config::AppConfig;
use crate::processing::{Choropleth, JoinedCounty};
use crate::scale::{LinearScale, ThresholdScale};
use crate::types::Fips;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Coord, LineString, MultiLineString, MultiPolygon, Rect};
use rayon::prelude::*;
use tracing::debug;

const LEGEND_WIDTH: f64 = 300.0;
const SWATCH_HEIGHT: f64 = 8.0;
const TICK_SIZE: f64 = 13.0;
const SWATCH_STROKE: &str = "blue";
const HIGHLIGHT_STROKE: &str = "black";
const STATE_STROKE: &str = "white";
const NATION_STROKE: &str = "blue";

/// Affine map from geometry coordinates to SVG user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    scale: f64,
    translate: (f64, f64),
}

impl Projection {
    /// For geometry that is already in screen coordinates.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translate: (0.0, 0.0),
        }
    }

    /// Scale `bounds` uniformly to fit `width × height`, centred. Screen y grows
    /// downward, same as the source geometry.
    pub fn fit_extent(bounds: Rect<f64>, width: f64, height: f64) -> Self {
        let (dx, dy) = (bounds.width(), bounds.height());
        if dx <= 0.0 || dy <= 0.0 {
            return Self::identity();
        }
        let scale = (width / dx).min(height / dy);
        let translate = (
            (width - scale * dx) / 2.0 - scale * bounds.min().x,
            (height - scale * dy) / 2.0 - scale * bounds.min().y,
        );
        Self { scale, translate }
    }

    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: c.x * self.scale + self.translate.0,
            y: c.y * self.scale + self.translate.1,
        }
    }
}

/// Pointer events a county responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Leave,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub education: Option<f64>,
}

/// Visible state of a county and the tooltip after an event.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverEffect {
    pub stroke: Option<&'static str>,
    pub tooltip: Option<Tooltip>,
}

#[derive(Debug, Clone)]
pub struct CountyShape {
    pub fips: Fips,
    pub path: String,
    pub fill: String,
    pub education: Option<f64>,
    pub tooltip: String,
}

impl CountyShape {
    pub fn on_pointer(&self, event: PointerEvent) -> HoverEffect {
        match event {
            PointerEvent::Enter => HoverEffect {
                stroke: Some(HIGHLIGHT_STROKE),
                tooltip: Some(Tooltip {
                    text: self.tooltip.clone(),
                    education: self.education,
                }),
            },
            PointerEvent::Leave => HoverEffect {
                stroke: None,
                tooltip: None,
            },
        }
    }

    /// `data-education` attribute value; empty for counties without data.
    pub fn education_attr(&self) -> String {
        self.education.map(|v| v.to_string()).unwrap_or_default()
    }
}

/// Unfilled outline drawn above the counties.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub path: String,
    pub stroke: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Swatch {
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Legend {
    pub offset_x: f64,
    pub swatches: Vec<Swatch>,
    pub ticks: Vec<Tick>,
    pub tick_size: f64,
    pub axis_path: String,
    pub swatch_stroke: &'static str,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub title: String,
    pub description: String,
    pub legend: Legend,
    pub counties: Vec<CountyShape>,
    pub overlays: Vec<Overlay>,
    /// Outline given to a county while the pointer is over it.
    pub hover_stroke: &'static str,
}

impl Scene {
    pub fn svg_width(&self) -> f64 {
        self.width + self.padding
    }

    pub fn svg_height(&self) -> f64 {
        self.height + self.padding
    }
}

pub fn build_scene(config: &AppConfig, choropleth: &Choropleth) -> Scene {
    let output = &config.output;
    let projection = if output.fit_to_viewport {
        match bounds(&choropleth.counties) {
            Some(rect) => Projection::fit_extent(rect, output.width, output.height),
            None => Projection::identity(),
        }
    } else {
        Projection::identity()
    };
    debug!("Projection: {:?}", projection);

    let counties: Vec<CountyShape> = choropleth
        .counties
        .par_iter()
        .map(|county| CountyShape {
            fips: county.fips,
            path: polygon_path(&county.geometry, &projection),
            fill: choropleth.fill(county).to_string(),
            education: county.education(),
            tooltip: tooltip_text(county),
        })
        .collect();

    let overlays = vec![
        Overlay {
            path: line_path(&choropleth.borders.states, &projection),
            stroke: STATE_STROKE,
        },
        Overlay {
            path: line_path(&choropleth.borders.nation, &projection),
            stroke: NATION_STROKE,
        },
    ];

    Scene {
        width: output.width,
        height: output.height,
        padding: output.padding,
        title: output.title.clone(),
        description: output.description.clone(),
        legend: build_legend(&choropleth.scale, output.width / 2.5),
        counties,
        overlays,
        hover_stroke: HIGHLIGHT_STROKE,
    }
}

fn tooltip_text(county: &JoinedCounty) -> String {
    match &county.record {
        Some(r) => format!("{}, {}: {}%", r.area_name, r.state, r.bachelors_or_higher),
        None => format!("County {}: no data", county.fips),
    }
}

/// One swatch per bucket laid along a `[0, 300]` axis over the data extent,
/// with a tick at every breakpoint.
pub fn build_legend(scale: &ThresholdScale, offset_x: f64) -> Legend {
    let (min, max) = scale.extent();
    let axis = LinearScale::new((min, max), (0.0, LEGEND_WIDTH));

    let swatches = (0..scale.bucket_count())
        .map(|bucket| {
            let (lo, hi) = scale.invert_extent(bucket);
            let x0 = axis.scale_round(lo.unwrap_or(min).clamp(min, max));
            let x1 = axis.scale_round(hi.unwrap_or(max).clamp(min, max));
            Swatch {
                x: x0,
                width: (x1 - x0).max(0.0),
                height: SWATCH_HEIGHT,
                fill: scale.bucket_color(bucket).to_string(),
            }
        })
        .collect();

    let ticks = scale
        .breaks()
        .iter()
        .map(|&b| Tick {
            x: axis.scale_round(b),
            label: format!("{}%", b.floor()),
        })
        .collect();

    let (r0, r1) = axis.range();
    Legend {
        offset_x,
        swatches,
        ticks,
        tick_size: TICK_SIZE,
        axis_path: format!("M{r0},{TICK_SIZE}V0H{r1}V{TICK_SIZE}"),
        swatch_stroke: SWATCH_STROKE,
    }
}

fn bounds(counties: &[JoinedCounty]) -> Option<Rect<f64>> {
    counties
        .iter()
        .filter_map(|c| c.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

/// SVG path data for polygons: every ring closed with `Z`.
pub fn polygon_path(geometry: &MultiPolygon<f64>, projection: &Projection) -> String {
    let mut d = String::new();
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let coords = ring_coords(ring);
            if coords.is_empty() {
                continue;
            }
            push_line(&mut d, coords, projection);
            d.push('Z');
        }
    }
    d
}

pub fn line_path(lines: &MultiLineString<f64>, projection: &Projection) -> String {
    let mut d = String::new();
    for line in lines {
        if line.0.len() > 1 {
            push_line(&mut d, &line.0, projection);
        }
    }
    d
}

// Closed rings repeat their first point; `Z` already implies it.
fn ring_coords(ring: &LineString<f64>) -> &[Coord<f64>] {
    match ring.0.as_slice() {
        [first, rest @ .., last] if first == last && !rest.is_empty() => &ring.0[..ring.0.len() - 1],
        coords => coords,
    }
}

fn push_line(d: &mut String, coords: &[Coord<f64>], projection: &Projection) {
    for (i, c) in coords.iter().enumerate() {
        let p = projection.project(*c);
        let command = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{}{},{}", command, fmt_coord(p.x), fmt_coord(p.y)));
    }
}

fn fmt_coord(v: f64) -> String {
    // Adding 0.0 turns -0.0 into 0.0.
    ((v * 1000.0).round() / 1000.0 + 0.0).to_string()
}
