//! Wheel geometry and pocket positions.
//!
//! The simulator never owns the wheel: each step it asks a [`SlotLocator`] where the winning
//! pocket currently is, so an animated wheel is tracked without extra plumbing.

use glam::Vec3;
use roulette_types::casino::{EUROPEAN_WHEEL_ORDER, WHEEL_POCKETS};
use std::f32::consts::TAU;

/// Where the ball may roll: the wheel axis, its rim radius and the circling waypoints.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelGeometry {
    pub center: Vec3,
    pub radius: f32,
    /// Waypoints the ball circles through, in travel order.
    pub ring: Vec<Vec3>,
}

impl WheelGeometry {
    /// Evenly spaced waypoints on a circle of `radius` about `center`, `height` above it.
    ///
    /// Waypoint `i` sits at angle `i * TAU / waypoints` in the xz plane.
    pub fn circular(center: Vec3, radius: f32, waypoints: usize, height: f32) -> Self {
        let ring = (0..waypoints)
            .map(|i| {
                let angle = i as f32 * TAU / waypoints as f32;
                center + Vec3::new(angle.cos() * radius, height, angle.sin() * radius)
            })
            .collect();
        Self {
            center,
            radius,
            ring,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err("wheel radius must be positive");
        }
        if self.ring.len() < 3 {
            return Err("wheel ring needs at least three waypoints");
        }
        if self
            .ring
            .iter()
            .any(|point| planar(*point - self.center).length() <= f32::EPSILON)
        {
            return Err("wheel waypoints must not sit on the axis");
        }
        Ok(())
    }

    /// Angle of `point` about the wheel axis, in the xz plane.
    pub fn angle_of(&self, point: Vec3) -> f32 {
        let offset = point - self.center;
        offset.z.atan2(offset.x)
    }

    /// Distance of `point` from the wheel axis, ignoring height.
    pub fn planar_distance(&self, point: Vec3) -> f32 {
        planar(point - self.center).length()
    }
}

/// Drop the vertical component.
pub(crate) fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Render-side lookup of a pocket's current world position.
pub trait SlotLocator {
    /// `None` when the pocket for `number` is not mapped.
    fn slot_position(&self, number: u8, elapsed_secs: f32) -> Option<Vec3>;
}

/// 37 pockets on a circle, in single-zero wheel order.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticWheel {
    center: Vec3,
    pocket_radius: f32,
    height: f32,
}

impl StaticWheel {
    pub fn new(center: Vec3, pocket_radius: f32, height: f32) -> Self {
        Self {
            center,
            pocket_radius,
            height,
        }
    }

    /// Angle of the pocket for `number` with the wheel at rest.
    pub fn pocket_angle(number: u8) -> Option<f32> {
        EUROPEAN_WHEEL_ORDER
            .iter()
            .position(|pocket| *pocket == number)
            .map(|index| index as f32 * TAU / WHEEL_POCKETS as f32)
    }

    fn position_at(&self, angle: f32) -> Vec3 {
        self.center
            + Vec3::new(
                angle.cos() * self.pocket_radius,
                self.height,
                angle.sin() * self.pocket_radius,
            )
    }
}

impl SlotLocator for StaticWheel {
    fn slot_position(&self, number: u8, _elapsed_secs: f32) -> Option<Vec3> {
        Self::pocket_angle(number).map(|angle| self.position_at(angle))
    }
}

/// A [`StaticWheel`] turning about its axis at a fixed rate (radians per second).
#[derive(Clone, Debug, PartialEq)]
pub struct RotatingWheel {
    wheel: StaticWheel,
    angular_speed: f32,
}

impl RotatingWheel {
    pub fn new(wheel: StaticWheel, angular_speed: f32) -> Self {
        Self {
            wheel,
            angular_speed,
        }
    }
}

impl SlotLocator for RotatingWheel {
    fn slot_position(&self, number: u8, elapsed_secs: f32) -> Option<Vec3> {
        let rotation = (self.angular_speed * elapsed_secs).rem_euclid(TAU);
        StaticWheel::pocket_angle(number).map(|angle| self.wheel.position_at(angle + rotation))
    }
}

impl<T: SlotLocator + ?Sized> SlotLocator for Box<T> {
    fn slot_position(&self, number: u8, elapsed_secs: f32) -> Option<Vec3> {
        (**self).slot_position(number, elapsed_secs)
    }
}
