//! Debounced automatic floor lock
//!
//! Watches hit-test poses while the user is aiming at the floor. Once the
//! target height has stayed inside a tolerance band for the dwell time, the
//! latest pose is yielded exactly once so the caller can lock the floor with
//! it. A lost target or a jump outside the band restarts the window.

use crate::domain::types::Pose;
use crate::infra::config::Config;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Window {
    anchor_y: f64,
    since: Instant,
}

#[derive(Debug)]
pub struct FloorStabilizer {
    dwell: Duration,
    tolerance_m: f64,
    window: Option<Window>,
    fired: bool,
}

impl FloorStabilizer {
    pub fn new(dwell: Duration, tolerance_m: f64) -> Self {
        Self { dwell, tolerance_m: tolerance_m.abs(), window: None, fired: false }
    }

    /// Stabilizer from config, or `None` when auto lock is disabled
    pub fn from_config(config: &Config) -> Option<Self> {
        config.auto_floor_lock().then(|| {
            Self::new(
                Duration::from_millis(config.floor_lock_dwell_ms()),
                config.floor_lock_tolerance_m(),
            )
        })
    }

    /// Feed one pose tick. Returns the pose to lock with once the height settles.
    pub fn observe(&mut self, pose: Option<&Pose>, now: Instant) -> Option<Pose> {
        if self.fired {
            return None;
        }

        let Some(pose) = pose else {
            if self.window.take().is_some() {
                debug!("floor_stabilizer_target_lost");
            }
            return None;
        };

        let y = pose.position.y;
        match self.window {
            Some(w) if (y - w.anchor_y).abs() <= self.tolerance_m => {
                if now.saturating_duration_since(w.since) >= self.dwell {
                    self.fired = true;
                    self.window = None;
                    debug!(y = %y, "floor_stabilizer_settled");
                    return Some(*pose);
                }
            }
            Some(w) => {
                debug!(anchor_y = %w.anchor_y, y = %y, "floor_stabilizer_restarted");
                self.window = Some(Window { anchor_y: y, since: now });
            }
            None => {
                self.window = Some(Window { anchor_y: y, since: now });
            }
        }
        None
    }

    /// Re-arm after a session reset
    pub fn reset(&mut self) {
        self.window = None;
        self.fired = false;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(y: f64) -> Pose {
        Pose::at(0.0, y, 0.0)
    }

    fn stabilizer() -> FloorStabilizer {
        FloorStabilizer::new(Duration::from_millis(1000), 0.02)
    }

    #[test]
    fn test_fires_after_dwell() {
        let mut s = stabilizer();
        let t0 = Instant::now();

        assert!(s.observe(Some(&floor(0.10)), t0).is_none());
        assert!(s.observe(Some(&floor(0.11)), t0 + Duration::from_millis(500)).is_none());
        let locked = s.observe(Some(&floor(0.105)), t0 + Duration::from_millis(1000));
        assert_eq!(locked, Some(floor(0.105)));
        assert!(s.has_fired());

        // only once
        assert!(s.observe(Some(&floor(0.10)), t0 + Duration::from_millis(3000)).is_none());
    }

    #[test]
    fn test_lost_target_restarts_window() {
        let mut s = stabilizer();
        let t0 = Instant::now();

        s.observe(Some(&floor(0.0)), t0);
        s.observe(None, t0 + Duration::from_millis(900));
        assert!(s.observe(Some(&floor(0.0)), t0 + Duration::from_millis(1100)).is_none());
        assert!(s.observe(Some(&floor(0.0)), t0 + Duration::from_millis(2100)).is_some());
    }

    #[test]
    fn test_jump_restarts_window() {
        let mut s = stabilizer();
        let t0 = Instant::now();

        s.observe(Some(&floor(0.0)), t0);
        // a table top, not the floor
        s.observe(Some(&floor(0.75)), t0 + Duration::from_millis(800));
        assert!(s.observe(Some(&floor(0.75)), t0 + Duration::from_millis(1200)).is_none());
        assert!(s.observe(Some(&floor(0.76)), t0 + Duration::from_millis(1800)).is_some());
    }

    #[test]
    fn test_reset_rearms() {
        let mut s = FloorStabilizer::new(Duration::ZERO, 0.02);
        let t0 = Instant::now();

        s.observe(Some(&floor(0.0)), t0);
        assert!(s.observe(Some(&floor(0.0)), t0).is_some());
        s.reset();
        assert!(!s.has_fired());
        s.observe(Some(&floor(0.3)), t0);
        assert_eq!(s.observe(Some(&floor(0.3)), t0), Some(floor(0.3)));
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(FloorStabilizer::from_config(&Config::default()).is_none());
        let config = Config::default().with_auto_floor_lock(250, 0.01);
        assert!(FloorStabilizer::from_config(&config).is_some());
    }
}
