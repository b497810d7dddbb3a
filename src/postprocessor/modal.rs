/// Tracks the currently active modal state for word suppression.
///
/// Each modal group holds the last-emitted value. `should_emit_*` returns
/// `true` (and updates the cache) when the new value differs, or `false`
/// when the word can be omitted. A strictly 2.5-D engine only tracks the
/// three linear axes plus motion, feed and spindle.
#[derive(Default)]
pub struct ModalState {
    motion: Option<String>,
    feed: Option<f64>,
    spindle: Option<f64>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
}

/// Tolerance for floating-point modal comparisons. Suppresses redundant
/// words when values differ only by rounding error.
const NUMERIC_TOLERANCE: f64 = 1e-6;

fn update_float(slot: &mut Option<f64>, value: f64) -> bool {
    if let Some(last) = *slot {
        if (last - value).abs() < NUMERIC_TOLERANCE {
            return false;
        }
    }
    *slot = Some(value);
    true
}

impl ModalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and caches `code` if it differs from the last
    /// emitted motion code.
    pub fn should_emit_motion(&mut self, code: &str) -> bool {
        if self.motion.as_deref() == Some(code) {
            return false;
        }
        self.motion = Some(code.to_string());
        true
    }

    pub fn should_emit_feed(&mut self, feed: f64) -> bool {
        update_float(&mut self.feed, feed)
    }

    pub fn should_emit_spindle(&mut self, speed: f64) -> bool {
        update_float(&mut self.spindle, speed)
    }

    pub fn should_emit_coord(&mut self, axis: char, value: f64) -> bool {
        let slot = match axis {
            'X' | 'x' => &mut self.x,
            'Y' | 'y' => &mut self.y,
            'Z' | 'z' => &mut self.z,
            _ => return true, // unknown axis — always emit
        };
        update_float(slot, value)
    }

    /// Clears all modal state (tool change or program reset).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_emits_first_time_then_suppresses() {
        let mut ms = ModalState::new();
        assert!(ms.should_emit_motion("G1"));
        assert!(!ms.should_emit_motion("G1"));
        assert!(ms.should_emit_motion("G0"));
    }

    #[test]
    fn feed_suppressed_on_repeat() {
        let mut ms = ModalState::new();
        assert!(ms.should_emit_feed(150.0));
        assert!(!ms.should_emit_feed(150.0));
        assert!(ms.should_emit_feed(300.0));
    }

    #[test]
    fn spindle_suppressed_on_repeat() {
        let mut ms = ModalState::new();
        assert!(ms.should_emit_spindle(10000.0));
        assert!(!ms.should_emit_spindle(10000.0));
    }

    #[test]
    fn coords_track_independently() {
        let mut ms = ModalState::new();
        assert!(ms.should_emit_coord('X', 1.0));
        assert!(ms.should_emit_coord('Y', 1.0));
        assert!(!ms.should_emit_coord('X', 1.0));
        assert!(ms.should_emit_coord('X', 2.0));
    }

    #[test]
    fn coord_suppressed_within_tolerance() {
        let mut ms = ModalState::new();
        ms.should_emit_coord('Z', 5.0);
        assert!(!ms.should_emit_coord('Z', 5.0 + 5e-7));
        assert!(ms.should_emit_coord('Z', 5.0 + 2e-6));
    }

    #[test]
    fn unknown_axis_always_emits() {
        let mut ms = ModalState::new();
        assert!(ms.should_emit_coord('A', 0.0));
        assert!(ms.should_emit_coord('A', 0.0));
    }

    #[test]
    fn reset_clears_everything() {
        let mut ms = ModalState::new();
        ms.should_emit_motion("G1");
        ms.should_emit_feed(150.0);
        ms.should_emit_coord('X', 1.0);
        ms.reset();
        assert!(ms.should_emit_motion("G1"));
        assert!(ms.should_emit_feed(150.0));
        assert!(ms.should_emit_coord('X', 1.0));
    }
}
