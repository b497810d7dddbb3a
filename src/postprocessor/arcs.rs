use super::PostError;
use crate::geometry::Point;

/// Returns the IJ arc-centre offsets: `(I, J) = centre − start`.
///
/// In G-code, I and J are the signed offsets from the arc start point to
/// the arc centre along the X and Y axes.
pub fn ij_from_arc(start: &Point, centre: &Point) -> (f64, f64) {
    (centre.x - start.x, centre.y - start.y)
}

/// Computes the sweep angle (in degrees) traversed by an arc from `start`
/// to `end` around `centre`, in the specified direction.
///
/// Returns a value in `(0°, 360°]`; `360°` indicates a full circle
/// (start and end coincide angularly around the centre).
pub fn arc_sweep_degrees(start: &Point, centre: &Point, end: &Point, clockwise: bool) -> f64 {
    let angle_start = start.angle_from(centre);
    let angle_end = end.angle_from(centre);

    let diff = if clockwise {
        angle_start - angle_end
    } else {
        angle_end - angle_start
    };

    let sweep_deg = diff.to_degrees().rem_euclid(360.0);
    if sweep_deg == 0.0 {
        360.0
    } else {
        sweep_deg
    }
}

/// Returns the R-format radius for a G-code arc.
///
/// * Minor arcs (sweep < 180°) → positive R.
/// * Major arcs (sweep > 180°) → negative R.
/// * Exactly 180° arcs → [`Err`]: the R form is ambiguous for a
///   semicircle; use IJ instead. Full circles cannot be expressed at all.
pub fn r_from_arc(
    start: &Point,
    end: &Point,
    centre: &Point,
    clockwise: bool,
) -> Result<f64, PostError> {
    let radius = start.distance(centre);
    let sweep = arc_sweep_degrees(start, centre, end, clockwise);

    const HALF_CIRCLE: f64 = 180.0;
    const EPSILON: f64 = 1e-9;

    if (sweep - HALF_CIRCLE).abs() < EPSILON {
        return Err(PostError::ArcError(
            "180\u{b0} arc is ambiguous in R format; use IJ instead".to_string(),
        ));
    }
    if (sweep - 360.0).abs() < EPSILON {
        return Err(PostError::ArcError(
            "full circle cannot be expressed in R format".to_string(),
        ));
    }

    if sweep > HALF_CIRCLE {
        Ok(-radius)
    } else {
        Ok(radius)
    }
}
