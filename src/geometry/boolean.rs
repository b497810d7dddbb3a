//! Thin adapter over the `geo` crate's polygon boolean operations.
//!
//! Used to fuse overlapping copper regions ahead of reconstruction and to
//! combine offset contours. Input primitives are sampled to flat polygons
//! before the call — arc fidelity is lost through this interface, which is
//! why the offset engine itself never routes arcs through here.

use geo::BooleanOps;

use crate::error::CamError;

use super::primitives::{PathPrimitive, Primitive};
use super::{Point, ARC_SAMPLE_CHORD};

/// The boolean operation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolOp {
    Union,
    Difference,
    Intersection,
}

fn sample_count(arc_length: f64) -> usize {
    ((arc_length / ARC_SAMPLE_CHORD).ceil() as usize).max(16)
}

/// Samples a primitive into a flat `geo` polygon. Open paths cannot form
/// polygons and are rejected.
fn primitive_to_polygon(primitive: &Primitive) -> Result<geo::Polygon<f64>, CamError> {
    let path = match primitive {
        Primitive::Circle(c) => c.to_path(sample_count(c.circumference())),
        Primitive::Obround(o) => {
            o.to_path(sample_count(std::f64::consts::PI * o.cap_radius()).max(4))
        }
        Primitive::Path(p) => p.clone(),
    };
    path_to_polygon(&path)
}

fn path_to_polygon(path: &PathPrimitive) -> Result<geo::Polygon<f64>, CamError> {
    if !path.closed {
        return Err(CamError::InvalidInput(
            "boolean operations require closed paths".to_string(),
        ));
    }
    if path.vertices.len() < 3 {
        return Err(CamError::InvalidInput(format!(
            "boolean operand has only {} vertices",
            path.vertices.len()
        )));
    }
    let exterior = ring_of(path);
    let mut interiors = Vec::with_capacity(path.holes.len());
    for hole in &path.holes {
        if hole.closed && hole.vertices.len() >= 3 {
            interiors.push(ring_of(hole));
        }
    }
    Ok(geo::Polygon::new(exterior, interiors))
}

fn ring_of(path: &PathPrimitive) -> geo::LineString<f64> {
    geo::LineString::from(
        path.vertices
            .iter()
            .map(|v| (v.point.x, v.point.y))
            .collect::<Vec<_>>(),
    )
}

fn polygon_to_path(polygon: &geo::Polygon<f64>) -> PathPrimitive {
    let mut out = path_of_ring(polygon.exterior());
    out.holes = polygon.interiors().iter().map(path_of_ring).collect();
    out
}

fn path_of_ring(ring: &geo::LineString<f64>) -> PathPrimitive {
    let mut coords: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
    // geo rings repeat the first coordinate at the end; the closed-path
    // invariant makes that segment implicit.
    if coords.len() >= 2 {
        let first = coords[0];
        let last = coords[coords.len() - 1];
        if Point::new(first.0, first.1).distance(&Point::new(last.0, last.1)) < 1e-12 {
            coords.pop();
        }
    }
    PathPrimitive::from_points(&coords, true)
}

fn to_multi(primitives: &[Primitive]) -> Result<geo::MultiPolygon<f64>, CamError> {
    let mut polygons = Vec::with_capacity(primitives.len());
    for p in primitives {
        polygons.push(primitive_to_polygon(p)?);
    }
    Ok(geo::MultiPolygon::new(polygons))
}

/// Applies `op` to two sets of closed primitives, returning flat
/// (annotation-free) closed paths.
pub fn combine(
    a: &[Primitive],
    b: &[Primitive],
    op: BoolOp,
) -> Result<Vec<PathPrimitive>, CamError> {
    let ma = to_multi(a)?;
    let mb = to_multi(b)?;
    let result = match op {
        BoolOp::Union => ma.union(&mb),
        BoolOp::Difference => ma.difference(&mb),
        BoolOp::Intersection => ma.intersection(&mb),
    };
    Ok(result.iter().map(polygon_to_path).collect())
}

/// Unions a whole set of primitives into non-overlapping outlines (layer
/// fusion).
pub fn fuse(primitives: &[Primitive]) -> Result<Vec<PathPrimitive>, CamError> {
    if primitives.is_empty() {
        return Ok(Vec::new());
    }
    let mut acc = geo::MultiPolygon::new(vec![primitive_to_polygon(&primitives[0])?]);
    for p in &primitives[1..] {
        let next = geo::MultiPolygon::new(vec![primitive_to_polygon(p)?]);
        acc = acc.union(&next);
    }
    Ok(acc.iter().map(polygon_to_path).collect())
}
