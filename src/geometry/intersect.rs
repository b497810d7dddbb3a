//! Pairwise segment intersection used by the offset engine's join and
//! self-intersection logic.
//!
//! All functions return at most one point lying on both operands'
//! parameter intervals, endpoints excluded by a `precision`-derived margin
//! so that chained segments sharing an endpoint do not report themselves.

use std::f64::consts::TAU;

use super::primitives::PathSegment;
use super::{cross, dot, Point, EPSILON};

/// Intersection of two infinite lines given as point + direction.
/// `None` when the directions are parallel.
pub fn line_line_infinite(p: Point, d1: Point, q: Point, d2: Point) -> Option<Point> {
    let denom = cross(&d1, &d2);
    if denom.abs() < EPSILON {
        return None;
    }
    let qp = Point::new(q.x - p.x, q.y - p.y);
    let t = cross(&qp, &d2) / denom;
    Some(Point::new(p.x + t * d1.x, p.y + t * d1.y))
}

/// Bounded line–line intersection with endpoints excluded.
pub fn line_line(a1: Point, a2: Point, b1: Point, b2: Point, precision: f64) -> Option<Point> {
    let r = Point::new(a2.x - a1.x, a2.y - a1.y);
    let s = Point::new(b2.x - b1.x, b2.y - b1.y);
    let denom = cross(&r, &s);
    if denom.abs() < EPSILON {
        return None;
    }
    let qp = Point::new(b1.x - a1.x, b1.y - a1.y);
    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;
    let t_margin = margin(precision, r.length());
    let u_margin = margin(precision, s.length());
    if t < t_margin || t > 1.0 - t_margin || u < u_margin || u > 1.0 - u_margin {
        return None;
    }
    Some(Point::new(a1.x + t * r.x, a1.y + t * r.y))
}

fn margin(precision: f64, length: f64) -> f64 {
    if length < EPSILON {
        return 1.0; // degenerate operand never intersects
    }
    (precision / length).min(0.5)
}

/// Fraction of the arc's sweep at which angle `theta` sits, or `None` when
/// the angle is outside the swept range (with an endpoint-excluding
/// margin). `sweep` is signed; negative means clockwise.
fn arc_fraction(
    theta: f64,
    start_angle: f64,
    sweep: f64,
    angular_margin: f64,
) -> Option<f64> {
    let total = sweep.abs();
    if total < EPSILON {
        return None;
    }
    let progressed = if sweep >= 0.0 {
        (theta - start_angle).rem_euclid(TAU)
    } else {
        (start_angle - theta).rem_euclid(TAU)
    };
    if progressed < angular_margin || progressed > total - angular_margin {
        return None;
    }
    Some(progressed / total)
}

/// Bounded line–arc intersection; when both circle roots land on the
/// operands, the one nearer the line's start wins.
pub fn line_arc(
    l_start: Point,
    l_end: Point,
    centre: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    precision: f64,
) -> Option<Point> {
    let d = Point::new(l_end.x - l_start.x, l_end.y - l_start.y);
    let f = Point::new(l_start.x - centre.x, l_start.y - centre.y);
    let a = dot(&d, &d);
    if a < EPSILON {
        return None;
    }
    let b = 2.0 * dot(&f, &d);
    let c = dot(&f, &f) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t_margin = margin(precision, d.length());
    let angular_margin = if radius > EPSILON {
        precision / radius
    } else {
        return None;
    };
    for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
        if t < t_margin || t > 1.0 - t_margin {
            continue;
        }
        let p = Point::new(l_start.x + t * d.x, l_start.y + t * d.y);
        let theta = p.angle_from(&centre);
        if arc_fraction(theta, start_angle, sweep, angular_margin).is_some() {
            return Some(p);
        }
    }
    None
}

/// Bounded arc–arc intersection; when both circle–circle points land on
/// the operands, the one earlier along the first arc wins.
#[allow(clippy::too_many_arguments)]
pub fn arc_arc(
    c1: Point,
    r1: f64,
    start1: f64,
    sweep1: f64,
    c2: Point,
    r2: f64,
    start2: f64,
    sweep2: f64,
    precision: f64,
) -> Option<Point> {
    let d = c1.distance(&c2);
    if d < EPSILON {
        return None; // concentric: none or infinitely many, report none
    }
    if d > r1 + r2 + precision || d < (r1 - r2).abs() - precision {
        return None;
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h_sq = r1 * r1 - a * a;
    let h = if h_sq > 0.0 { h_sq.sqrt() } else { 0.0 };
    let ux = (c2.x - c1.x) / d;
    let uy = (c2.y - c1.y) / d;
    let base = Point::new(c1.x + a * ux, c1.y + a * uy);
    let m1 = precision / r1.max(EPSILON);
    let m2 = precision / r2.max(EPSILON);

    let mut best: Option<(f64, Point)> = None;
    for sign in [1.0, -1.0] {
        let p = Point::new(base.x + sign * h * -uy, base.y + sign * h * ux);
        let t1 = arc_fraction(p.angle_from(&c1), start1, sweep1, m1);
        let t2 = arc_fraction(p.angle_from(&c2), start2, sweep2, m2);
        if let (Some(t1), Some(_)) = (t1, t2) {
            match best {
                Some((t, _)) if t <= t1 => {}
                _ => best = Some((t1, p)),
            }
        }
        if h < EPSILON {
            break; // tangent circles have a single candidate
        }
    }
    best.map(|(_, p)| p)
}

/// Dispatches the four segment pairings. Returns at most one point on
/// both operands, endpoints excluded.
pub fn segment_intersection(
    a: &PathSegment,
    b: &PathSegment,
    precision: f64,
) -> Option<Point> {
    match (a, b) {
        (
            PathSegment::Line { start: a1, end: a2 },
            PathSegment::Line { start: b1, end: b2 },
        ) => line_line(*a1, *a2, *b1, *b2, precision),
        (
            PathSegment::Line { start, end },
            PathSegment::Arc {
                centre,
                radius,
                start_angle,
                sweep,
                ..
            },
        )
        | (
            PathSegment::Arc {
                centre,
                radius,
                start_angle,
                sweep,
                ..
            },
            PathSegment::Line { start, end },
        ) => line_arc(
            *start,
            *end,
            *centre,
            *radius,
            *start_angle,
            *sweep,
            precision,
        ),
        (
            PathSegment::Arc {
                centre: ca,
                radius: ra,
                start_angle: sa,
                sweep: wa,
                ..
            },
            PathSegment::Arc {
                centre: cb,
                radius: rb,
                start_angle: sb,
                sweep: wb,
                ..
            },
        ) => arc_arc(*ca, *ra, *sa, *wa, *cb, *rb, *sb, *wb, precision),
    }
}
