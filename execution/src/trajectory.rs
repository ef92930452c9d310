//! Ball trajectory simulator.
//!
//! A roll has three sub-phases, each bounded by elapsed time rather than frame count:
//! 1. **Circling** - the ball rides the ring of waypoints, decelerating, until the circling
//!    budget elapses or it passes close to the target.
//! 2. **Approach** - a cubic Bezier from the circling end point to the (re-sampled) target,
//!    with a few decaying bounce pulses added to the height.
//! 3. **Settle** - smoothstep onto the target with a small damped wobble; the last sample is
//!    exactly the target position.
//!
//! The simulator is driven by [`TrajectorySimulator::step`] with the caller's time step and the
//! pocket's current position. It never reads a clock.

use crate::wheel::{planar, WheelGeometry};
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use tracing::{debug, warn};

/// Latest permitted bounce start, as a fraction of the approach.
const LATEST_BOUNCE_START: f32 = 0.9;
/// Gap between one bounce ending and the next starting.
const MIN_BOUNCE_GAP: f32 = 0.05;
/// Width of the window the next bounce may start in.
const BOUNCE_START_WINDOW: f32 = 0.2;
/// Lateral jitter applied to the Bezier midpoint.
const MIDPOINT_JITTER: f32 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Nominal roll length in seconds (circling + approach).
    pub roll_duration_secs: f32,
    /// Share of the roll spent circling.
    pub circling_fraction: f32,
    /// Share of the circling budget that must pass before the proximity exit applies.
    pub min_circling_fraction: f32,
    /// Hard circling limit, as a multiple of the roll duration. Applies even when it is shorter
    /// than the circling budget.
    pub max_circling_factor: f32,
    /// Share of the roll spent on the Bezier approach.
    pub approach_fraction: f32,
    pub settle_duration_secs: f32,
    /// Distance to the target below which circling may end early.
    pub approach_threshold: f32,
    /// Ring revolutions per second at release.
    pub initial_rotation_speed: f32,
    pub min_rotation_speed: f32,
    /// Deceleration in revolutions per second squared.
    pub rotation_decay: f32,
    pub max_bounce_height: f32,
    /// Horizontal distance (as a multiple of the wheel radius) past which the ball is pulled back.
    pub bounds_tolerance: f32,
    pub settle_bounce_amplitude: f32,
    /// Share of the settle during which the wobble is applied.
    pub settle_bounce_cutoff: f32,
    /// Minimum angle between the release point and the target, in degrees.
    pub min_start_separation_deg: f32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            roll_duration_secs: 13.0,
            circling_fraction: 0.7,
            min_circling_fraction: 0.3,
            max_circling_factor: 2.0,
            approach_fraction: 0.3,
            settle_duration_secs: 1.0,
            approach_threshold: 10.0,
            initial_rotation_speed: 2.0,
            min_rotation_speed: 0.2,
            rotation_decay: 1.0,
            max_bounce_height: 0.15,
            bounds_tolerance: 1.1,
            settle_bounce_amplitude: 0.02,
            settle_bounce_cutoff: 0.7,
            min_start_separation_deg: 90.0,
        }
    }
}

fn is_fraction(value: f32) -> bool {
    value > 0.0 && value <= 1.0
}

impl TrajectoryConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.roll_duration_secs.is_finite() && self.roll_duration_secs > 0.0) {
            return Err("roll_duration_secs must be positive");
        }
        if !(self.settle_duration_secs.is_finite() && self.settle_duration_secs > 0.0) {
            return Err("settle_duration_secs must be positive");
        }
        if !is_fraction(self.circling_fraction) {
            return Err("circling_fraction must be in (0, 1]");
        }
        if !is_fraction(self.approach_fraction) {
            return Err("approach_fraction must be in (0, 1]");
        }
        if !(0.0..=1.0).contains(&self.min_circling_fraction) {
            return Err("min_circling_fraction must be in [0, 1]");
        }
        if !(self.max_circling_factor.is_finite() && self.max_circling_factor > 0.0) {
            return Err("max_circling_factor must be positive");
        }
        if self.approach_threshold < 0.0 {
            return Err("approach_threshold must not be negative");
        }
        if self.min_rotation_speed < 0.0 || self.initial_rotation_speed < self.min_rotation_speed {
            return Err("rotation speeds must satisfy 0 <= min <= initial");
        }
        if self.rotation_decay < 0.0 {
            return Err("rotation_decay must not be negative");
        }
        if self.max_bounce_height < 0.0 || self.settle_bounce_amplitude < 0.0 {
            return Err("bounce heights must not be negative");
        }
        if self.bounds_tolerance < 1.0 {
            return Err("bounds_tolerance must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.settle_bounce_cutoff) {
            return Err("settle_bounce_cutoff must be in [0, 1]");
        }
        if !(0.0..180.0).contains(&self.min_start_separation_deg) {
            return Err("min_start_separation_deg must be in [0, 180)");
        }
        Ok(())
    }

    pub fn circling_secs(&self) -> f32 {
        self.roll_duration_secs * self.circling_fraction
    }

    pub fn max_circling_secs(&self) -> f32 {
        self.roll_duration_secs * self.max_circling_factor
    }

    pub fn approach_secs(&self) -> f32 {
        self.roll_duration_secs * self.approach_fraction
    }
}

/// Sub-phase of a roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RollPhase {
    Circling,
    Approach,
    Settle,
}

/// One point of the ball path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectorySample {
    pub position: Vec3,
    /// Seconds since the roll started.
    pub timestamp: f32,
    pub phase: RollPhase,
}

/// One vertical pulse during the approach, in normalized approach time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounce {
    pub start: f32,
    pub duration: f32,
    pub height: f32,
}

impl Bounce {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    pub fn contains(&self, t: f32) -> bool {
        t >= self.start && t < self.end()
    }
}

/// Draw the bounce schedule for one approach.
///
/// Bounces never overlap: each starts at least [`MIN_BOUNCE_GAP`] after the previous one ends,
/// and heights never grow.
pub fn generate_bounces<R: Rng>(rng: &mut R, max_height: f32) -> Vec<Bounce> {
    let count = rng.gen_range(2..=4);
    let mut bounces: Vec<Bounce> = Vec::with_capacity(count);
    bounces.push(Bounce {
        start: rng.gen_range(0.15..0.3),
        duration: rng.gen_range(0.15..0.25),
        height: rng.gen_range(0.7f32..1.0) * max_height,
    });
    while bounces.len() < count {
        let Some(previous) = bounces.last().copied() else {
            break;
        };
        let earliest = previous.end() + MIN_BOUNCE_GAP;
        if earliest > LATEST_BOUNCE_START {
            break;
        }
        let latest = (earliest + BOUNCE_START_WINDOW).min(LATEST_BOUNCE_START);
        bounces.push(Bounce {
            start: rng.gen_range(earliest..=latest),
            duration: rng.gen_range(0.1..0.2),
            height: rng.gen_range(0.3f32..0.7) * previous.height,
        });
    }
    bounces
}

/// Height offset at normalized approach time `t`.
///
/// The final bounce uses a parabola, the others a half sine.
pub fn bounce_offset(bounces: &[Bounce], t: f32) -> f32 {
    let last = bounces.len().saturating_sub(1);
    for (i, bounce) in bounces.iter().enumerate() {
        if bounce.contains(t) {
            let progress = (t - bounce.start) / bounce.duration;
            let curve = if i == last && i > 0 {
                4.0 * progress * (1.0 - progress)
            } else {
                (progress * PI).sin()
            };
            return curve * bounce.height;
        }
    }
    0.0
}

pub fn cubic_bezier(t: f32, points: &[Vec3; 4]) -> Vec3 {
    let u = 1.0 - t;
    points[0] * (u * u * u)
        + points[1] * (3.0 * u * u * t)
        + points[2] * (3.0 * u * t * t)
        + points[3] * (t * t * t)
}

pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Spherical interpolation between two unit directions.
fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let dot = from.dot(to).clamp(-1.0, 1.0);
    let ortho = (to - from * dot).normalize_or_zero();
    if ortho == Vec3::ZERO {
        return from;
    }
    let theta = dot.acos() * t;
    from * theta.cos() + ortho * theta.sin()
}

/// Signed difference between two angles, wrapped to `[-PI, PI]`.
fn delta_angle(a: f32, b: f32) -> f32 {
    let delta = (b - a).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

/// Result of [`TrajectorySimulator::start_rolling`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollStart {
    Started,
    /// A roll is in progress; nothing changed.
    AlreadyRolling,
}

/// Result of one simulation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub sample: TrajectorySample,
    /// Set exactly once per roll, on the step that puts the ball in its pocket.
    pub finished: Option<u8>,
}

#[derive(Clone, Debug)]
enum Stage {
    Idle,
    Circling {
        elapsed: f32,
        progress: f32,
        speed: f32,
    },
    Approach {
        elapsed: f32,
        controls: [Vec3; 4],
        bounces: Vec<Bounce>,
    },
    Settle {
        elapsed: f32,
        from: Vec3,
    },
}

pub struct TrajectorySimulator {
    config: TrajectoryConfig,
    geometry: WheelGeometry,
    rng: StdRng,
    stage: Stage,
    number: u8,
    position: Vec3,
    last_direction: Vec3,
    roll_elapsed: f32,
}

impl TrajectorySimulator {
    pub fn new(config: TrajectoryConfig, geometry: WheelGeometry, rng: StdRng) -> Self {
        let position = geometry.ring.first().copied().unwrap_or(geometry.center);
        Self {
            config,
            geometry,
            rng,
            stage: Stage::Idle,
            number: 0,
            position,
            last_direction: Vec3::ZERO,
            roll_elapsed: 0.0,
        }
    }

    pub fn from_seed(config: TrajectoryConfig, geometry: WheelGeometry, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, geometry, rng)
    }

    pub fn is_rolling(&self) -> bool {
        !matches!(self.stage, Stage::Idle)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn phase(&self) -> Option<RollPhase> {
        match self.stage {
            Stage::Idle => None,
            Stage::Circling { .. } => Some(RollPhase::Circling),
            Stage::Approach { .. } => Some(RollPhase::Approach),
            Stage::Settle { .. } => Some(RollPhase::Settle),
        }
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Bounce schedule of the running approach, if any.
    pub fn bounces(&self) -> Option<&[Bounce]> {
        match &self.stage {
            Stage::Approach { bounces, .. } => Some(bounces),
            _ => None,
        }
    }

    /// Stop the running roll where it is. The ball keeps its last position.
    pub fn abandon(&mut self) {
        if self.is_rolling() {
            debug!(number = self.number, elapsed = self.roll_elapsed, "roll abandoned");
        }
        self.stage = Stage::Idle;
    }

    /// Release the ball toward the pocket for `number`, currently at `target`.
    pub fn start_rolling(&mut self, number: u8, target: Vec3) -> RollStart {
        if self.is_rolling() {
            warn!(number, current = self.number, "start_rolling ignored: already rolling");
            return RollStart::AlreadyRolling;
        }

        // Release at least the configured separation away from the target
        let separation = self.config.min_start_separation_deg.to_radians();
        let offset = self.rng.gen_range(separation..=TAU - separation);
        let target_angle = self.geometry.angle_of(target);
        let start_angle = (target_angle + offset).rem_euclid(TAU);
        let progress = start_angle / TAU;

        self.number = number;
        self.roll_elapsed = 0.0;
        self.last_direction = Vec3::ZERO;
        self.position = self.ring_position(progress, None);
        self.stage = Stage::Circling {
            elapsed: 0.0,
            progress,
            speed: self.config.initial_rotation_speed,
        };
        debug!(
            number,
            separation_deg = delta_angle(start_angle, target_angle).abs().to_degrees(),
            "ball released"
        );
        RollStart::Started
    }

    /// Advance the current sub-phase by `dt` seconds toward `target`.
    ///
    /// Returns `None` when no roll is in progress. A step never crosses into the next sub-phase;
    /// the remainder of `dt` is dropped.
    pub fn step(&mut self, dt: f32, target: Vec3) -> Option<StepOutcome> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let stage = std::mem::replace(&mut self.stage, Stage::Idle);
        let (phase, next, finished) = match stage {
            Stage::Idle => return None,
            Stage::Circling {
                elapsed,
                progress,
                speed,
            } => {
                let (next, done) = self.step_circling(dt, target, elapsed, progress, speed);
                (RollPhase::Circling, next, done)
            }
            Stage::Approach {
                elapsed,
                mut controls,
                bounces,
            } => {
                let elapsed = elapsed + dt;
                let t = (elapsed / self.config.approach_secs()).min(1.0);
                controls[3] = target;
                let bounce = bounce_offset(&bounces, t);
                let mut position = cubic_bezier(t, &controls);
                position.y += bounce;
                self.position = self.keep_within_bounds(position);
                if t >= 1.0 {
                    debug!(number = self.number, "approach finished, settling");
                    let from = self.position;
                    (
                        RollPhase::Approach,
                        Stage::Settle { elapsed: 0.0, from },
                        false,
                    )
                } else {
                    (
                        RollPhase::Approach,
                        Stage::Approach {
                            elapsed,
                            controls,
                            bounces,
                        },
                        false,
                    )
                }
            }
            Stage::Settle { elapsed, from } => {
                let elapsed = elapsed + dt;
                let linear = elapsed / self.config.settle_duration_secs;
                if linear >= 1.0 {
                    self.position = target;
                    (RollPhase::Settle, Stage::Idle, true)
                } else {
                    let t = smoothstep(linear);
                    let mut position = from.lerp(target, t);
                    if t < self.config.settle_bounce_cutoff {
                        position.y +=
                            (t * TAU).sin() * self.config.settle_bounce_amplitude * (1.0 - t);
                    }
                    self.position = position;
                    (RollPhase::Settle, Stage::Settle { elapsed, from }, false)
                }
            }
        };

        self.stage = next;
        self.roll_elapsed += dt;
        let sample = TrajectorySample {
            position: self.position,
            timestamp: self.roll_elapsed,
            phase,
        };
        let finished = finished.then(|| {
            debug!(number = self.number, elapsed = self.roll_elapsed, "ball settled");
            self.number
        });
        Some(StepOutcome { sample, finished })
    }

    fn step_circling(
        &mut self,
        dt: f32,
        target: Vec3,
        elapsed: f32,
        progress: f32,
        speed: f32,
    ) -> (Stage, bool) {
        let elapsed = elapsed + dt;
        let progress = progress + speed * dt;
        let speed = (speed - self.config.rotation_decay * dt).max(self.config.min_rotation_speed);

        let previous = self.position;
        self.position = self.ring_position(progress, Some(previous.y));
        let moved = self.position - previous;
        if moved.length_squared() > f32::EPSILON {
            self.last_direction = moved.normalize();
        }

        let circling_secs = self.config.circling_secs();
        let near_target = self.position.distance(target) < self.config.approach_threshold
            && elapsed > circling_secs * self.config.min_circling_fraction;
        let out_of_time = elapsed >= circling_secs;
        let escape = elapsed >= self.config.max_circling_secs();
        if escape && !near_target && !out_of_time {
            warn!(number = self.number, elapsed, "circling escape valve hit");
        }

        if near_target || out_of_time || escape {
            debug!(number = self.number, elapsed, near_target, "circling finished, approaching");
            let controls = self.control_points(self.position, target);
            let bounces = generate_bounces(&mut self.rng, self.config.max_bounce_height);
            (
                Stage::Approach {
                    elapsed: 0.0,
                    controls,
                    bounces,
                },
                false,
            )
        } else {
            (
                Stage::Circling {
                    elapsed,
                    progress,
                    speed,
                },
                false,
            )
        }
    }

    /// Point on the ring for a revolution count, slerped between neighbouring waypoints.
    fn ring_position(&self, progress: f32, height: Option<f32>) -> Vec3 {
        let ring = &self.geometry.ring;
        if ring.is_empty() {
            return self.geometry.center;
        }
        let segments = ring.len();
        let total = progress.rem_euclid(1.0) * segments as f32;
        let index = (total.floor() as usize).min(segments - 1);
        let fraction = total - index as f32;

        let center = self.geometry.center;
        let first = ring[index] - center;
        let second = ring[(index + 1) % segments] - center;
        let direction = slerp_direction(first.normalize_or_zero(), second.normalize_or_zero(), fraction);
        let mut position = center + direction * first.length();
        if let Some(y) = height {
            position.y = y;
        }
        position
    }

    fn control_points(&mut self, start: Vec3, target: Vec3) -> [Vec3; 4] {
        let mut mid = start.lerp(target, 0.5);
        mid.x += self.rng.gen_range(-MIDPOINT_JITTER..MIDPOINT_JITTER);
        mid.z += self.rng.gen_range(-MIDPOINT_JITTER..MIDPOINT_JITTER);
        let lead = self.last_direction * self.rng.gen_range(0.05f32..0.15);
        [
            start,
            start.lerp(mid, 0.5) + lead,
            mid.lerp(target, 0.5),
            target,
        ]
    }

    /// Pull the ball back onto the rim if it strays past the tolerance band.
    fn keep_within_bounds(&self, position: Vec3) -> Vec3 {
        let offset = planar(position - self.geometry.center);
        if offset.length() > self.geometry.radius * self.config.bounds_tolerance {
            let clamped = self.geometry.center + offset.normalize() * self.geometry.radius;
            Vec3::new(clamped.x, position.y, clamped.z)
        } else {
            position
        }
    }
}
