//! TopoJSON decoding into `geo` types.
//!
//! Only what the map needs is supported: quantized or plain arcs, polygon and
//! line geometries (points pass through), `feature` extraction per object and
//! boundary `mesh` construction.

use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("topology has no object named '{0}'")]
    MissingObject(String),
    #[error("arc index {0} is out of range")]
    ArcOutOfRange(i64),
    #[error("position must have at least two coordinates")]
    ShortPosition,
    #[error("expected a Topology, found '{0}'")]
    NotATopology(String),
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    fn apply(&self, x: f64, y: f64) -> Coord<f64> {
        Coord {
            x: x * self.scale[0] + self.translate[0],
            y: y * self.scale[1] + self.translate[1],
        }
    }
}

/// A geometry object inside `objects`, possibly a nested collection.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryObject {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub shape: Shape,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    GeometryCollection { geometries: Vec<GeometryObject> },
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
}

#[derive(Debug, Deserialize)]
struct RawTopology {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    objects: HashMap<String, GeometryObject>,
}

/// A decoded feature: the object's id and properties plus absolute geometry.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: Option<serde_json::Value>,
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    pub geometry: Geometry<f64>,
}

/// Which arcs a mesh keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFilter {
    /// Every arc of the object.
    All,
    /// Arcs shared by two different geometries (internal borders).
    Interior,
}

/// A topology with its arcs already decoded to absolute coordinates.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawTopology")]
pub struct Topology {
    transform: Option<Transform>,
    arcs: Vec<LineString<f64>>,
    objects: HashMap<String, GeometryObject>,
}

impl TryFrom<RawTopology> for Topology {
    type Error = TopologyError;

    fn try_from(raw: RawTopology) -> Result<Self, Self::Error> {
        if raw.kind != "Topology" {
            return Err(TopologyError::NotATopology(raw.kind));
        }
        let arcs = raw
            .arcs
            .iter()
            .map(|arc| decode_arc(arc, raw.transform.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            transform: raw.transform,
            arcs,
            objects: raw.objects,
        })
    }
}

fn decode_arc(positions: &[Vec<f64>], transform: Option<&Transform>) -> Result<LineString<f64>, TopologyError> {
    // Quantized arcs are delta-encoded from the previous position.
    let (mut x, mut y) = (0.0, 0.0);
    positions
        .iter()
        .map(|position| {
            let (px, py) = match position.as_slice() {
                [px, py, ..] => (*px, *py),
                _ => return Err(TopologyError::ShortPosition),
            };
            Ok(match transform {
                Some(t) => {
                    x += px;
                    y += py;
                    t.apply(x, y)
                }
                None => Coord { x: px, y: py },
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::from)
}

/// Negative indices refer to the one's complement arc, traversed backwards.
fn arc_slot(index: i64) -> i64 {
    if index < 0 {
        !index
    } else {
        index
    }
}

impl Topology {
    pub fn object(&self, name: &str) -> Result<&GeometryObject, TopologyError> {
        self.objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))
    }

    /// Features of a named object. A collection yields one feature per member.
    pub fn feature(&self, name: &str) -> Result<Vec<Feature>, TopologyError> {
        let object = self.object(name)?;
        let members: Vec<&GeometryObject> = match &object.shape {
            Shape::GeometryCollection { geometries } => geometries.iter().collect(),
            _ => vec![object],
        };

        members
            .into_iter()
            .map(|member| {
                Ok(Feature {
                    id: member.id.clone(),
                    properties: member.properties.clone(),
                    geometry: self.geometry(&member.shape)?,
                })
            })
            .collect()
    }

    /// Boundary lines of a named object, each arc at most once. Arcs that meet
    /// end to start are joined into a single line.
    pub fn mesh(&self, name: &str, filter: MeshFilter) -> Result<MultiLineString<f64>, TopologyError> {
        let object = self.object(name)?;

        let mut owners: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        let mut next_geometry = 0;
        collect_arc_owners(object, &mut next_geometry, &mut owners);

        let mut kept = Vec::new();
        for (slot, geometries) in owners {
            let keep = match filter {
                MeshFilter::All => true,
                MeshFilter::Interior => geometries.first() != geometries.last(),
            };
            if keep {
                kept.push(self.arc(slot)?);
            }
        }
        Ok(MultiLineString::new(stitch(kept)))
    }

    fn arc(&self, slot: i64) -> Result<&LineString<f64>, TopologyError> {
        usize::try_from(slot)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or(TopologyError::ArcOutOfRange(slot))
    }

    fn push_arc(&self, index: i64, points: &mut Vec<Coord<f64>>) -> Result<(), TopologyError> {
        let arc = self
            .arc(arc_slot(index))
            .map_err(|_| TopologyError::ArcOutOfRange(index))?;
        // Consecutive arcs share their junction point.
        points.pop();
        if index < 0 {
            points.extend(arc.0.iter().rev().copied());
        } else {
            points.extend(arc.0.iter().copied());
        }
        Ok(())
    }

    fn line(&self, arcs: &[i64]) -> Result<LineString<f64>, TopologyError> {
        let mut points = Vec::new();
        for &index in arcs {
            self.push_arc(index, &mut points)?;
        }
        if points.len() == 1 {
            points.push(points[0]);
        }
        Ok(LineString::from(points))
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Polygon<f64>, TopologyError> {
        let mut rings = rings.iter().map(|ring| self.line(ring));
        let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(Vec::new()));
        let interiors = rings.collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    fn point(&self, position: &[f64]) -> Result<Point<f64>, TopologyError> {
        let (x, y) = match position {
            [x, y, ..] => (*x, *y),
            _ => return Err(TopologyError::ShortPosition),
        };
        Ok(match &self.transform {
            Some(t) => Point::from(t.apply(x, y)),
            None => Point::new(x, y),
        })
    }

    fn geometry(&self, shape: &Shape) -> Result<Geometry<f64>, TopologyError> {
        Ok(match shape {
            Shape::GeometryCollection { geometries } => Geometry::GeometryCollection(GeometryCollection(
                geometries
                    .iter()
                    .map(|g| self.geometry(&g.shape))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Shape::Point { coordinates } => Geometry::Point(self.point(coordinates)?),
            Shape::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|c| self.point(c))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Shape::LineString { arcs } => Geometry::LineString(self.line(arcs)?),
            Shape::MultiLineString { arcs } => Geometry::MultiLineString(MultiLineString::new(
                arcs.iter().map(|l| self.line(l)).collect::<Result<Vec<_>, _>>()?,
            )),
            Shape::Polygon { arcs } => Geometry::Polygon(self.polygon(arcs)?),
            Shape::MultiPolygon { arcs } => Geometry::MultiPolygon(MultiPolygon::new(
                arcs.iter().map(|p| self.polygon(p)).collect::<Result<Vec<_>, _>>()?,
            )),
        })
    }
}

/// Chains arcs whose end point is the next arc's start point.
fn stitch(arcs: Vec<&LineString<f64>>) -> Vec<LineString<f64>> {
    let mut lines: Vec<Vec<Coord<f64>>> = Vec::new();

    for arc in arcs {
        let mut points = arc.0.clone();
        while let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if let Some(i) = lines.iter().position(|line| line.last() == Some(&first)) {
                let mut line = lines.remove(i);
                line.extend(points.into_iter().skip(1));
                points = line;
            } else if let Some(i) = lines.iter().position(|line| line.first() == Some(&last)) {
                let line = lines.remove(i);
                points.extend(line.into_iter().skip(1));
            } else {
                break;
            }
        }
        lines.push(points);
    }

    lines.into_iter().map(LineString::new).collect()
}

fn collect_arc_owners(object: &GeometryObject, next_geometry: &mut usize, owners: &mut BTreeMap<i64, Vec<usize>>) {
    let geometry = *next_geometry;
    match &object.shape {
        Shape::GeometryCollection { geometries } => {
            for member in geometries {
                collect_arc_owners(member, next_geometry, owners);
            }
            return;
        }
        Shape::Point { .. } | Shape::MultiPoint { .. } => {}
        Shape::LineString { arcs } => record_owner(owners, arcs, geometry),
        Shape::MultiLineString { arcs } | Shape::Polygon { arcs } => {
            for line in arcs {
                record_owner(owners, line, geometry);
            }
        }
        Shape::MultiPolygon { arcs } => {
            for polygon in arcs {
                for ring in polygon {
                    record_owner(owners, ring, geometry);
                }
            }
        }
    }
    *next_geometry += 1;
}

fn record_owner(owners: &mut BTreeMap<i64, Vec<usize>>, arcs: &[i64], geometry: usize) {
    for &index in arcs {
        owners.entry(arc_slot(index)).or_default().push(geometry);
    }
}
