//! Pusher platforms
//!
//! Kinematic boxes that sweep back and forth along z. The motion itself is a
//! plain [`Oscillator`] so it can be tested without a physics world.

use glam::{Quat, Vec3};
use serde::Serialize;

use super::physics::{BodyHandle, PhysicsWorld};
use crate::consts::*;

/// Back-and-forth motion between two bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Oscillator {
    pub z: f32,
    pub z_min: f32,
    pub z_max: f32,
    /// -1.0 or +1.0
    pub direction: f32,
    /// Units per second
    pub speed: f32,
}

impl Oscillator {
    pub fn new(z_min: f32, z_max: f32, speed: f32) -> Self {
        Self {
            z: z_min,
            z_min,
            z_max,
            direction: 1.0,
            speed,
        }
    }

    /// Same bounds, starting at the far end heading back
    pub fn opposite_phase(z_min: f32, z_max: f32, speed: f32) -> Self {
        Self {
            z: z_max,
            direction: -1.0,
            ..Self::new(z_min, z_max, speed)
        }
    }

    /// Advance by `dt`, reflecting off the bounds; returns the new z
    pub fn advance(&mut self, dt: f32, speed_scale: f32) -> f32 {
        self.z += self.direction * self.speed * speed_scale * dt;
        if self.z >= self.z_max {
            self.z = (2.0 * self.z_max - self.z).max(self.z_min);
            self.direction = -1.0;
        } else if self.z <= self.z_min {
            self.z = (2.0 * self.z_min - self.z).min(self.z_max);
            self.direction = 1.0;
        }
        self.z
    }

    pub fn velocity(&self, speed_scale: f32) -> f32 {
        self.direction * self.speed * speed_scale
    }
}

/// One kinematic pusher body
#[derive(Debug, Clone)]
struct Pusher {
    handle: BodyHandle,
    motion: Oscillator,
    base_half: Vec3,
    y: f32,
}

/// Pusher pose handed to presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PusherSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub half_extents: Vec3,
}

/// Drives the main pusher and, once unlocked, the shelf pusher above it
#[derive(Debug, Clone)]
pub struct PusherController {
    pushers: Vec<Pusher>,
    width_scale: f32,
}

impl PusherController {
    /// Create the main pusher in `physics`
    pub fn new(physics: &mut PhysicsWorld) -> Self {
        let half = Vec3::new(PUSHER_WIDTH / 2.0, PUSHER_HEIGHT / 2.0, PUSHER_DEPTH / 2.0);
        let motion = Oscillator::new(PUSHER_Z_MIN, PUSHER_Z_MAX, PUSHER_SPEED);
        let y = PUSHER_HEIGHT / 2.0;
        let handle = physics.add_pusher(Vec3::new(0.0, y, motion.z), half);
        Self {
            pushers: vec![Pusher {
                handle,
                motion,
                base_half: half,
                y,
            }],
            width_scale: 1.0,
        }
    }

    pub fn has_second(&self) -> bool {
        self.pushers.len() > 1
    }

    /// Add the shelf pusher; false if it already exists
    pub fn enable_second(&mut self, physics: &mut PhysicsWorld) -> bool {
        if self.has_second() {
            return false;
        }
        let half = Vec3::new(
            PUSHER_WIDTH / 2.0,
            PUSHER_HEIGHT / 2.0,
            SHELF_PUSHER_DEPTH / 2.0,
        );
        let motion = Oscillator::opposite_phase(SHELF_PUSHER_Z_MIN, SHELF_PUSHER_Z_MAX, PUSHER_SPEED);
        let y = PUSHER_HEIGHT + PUSHER_HEIGHT / 2.0;
        let handle = physics.add_pusher(Vec3::new(0.0, y, motion.z), half);
        self.pushers.push(Pusher {
            handle,
            motion,
            base_half: half,
            y,
        });
        self.apply_width(physics);
        log::info!("Shelf pusher enabled");
        true
    }

    /// Move every pusher by one tick
    pub fn update(&mut self, dt: f32, speed_scale: f32, physics: &mut PhysicsWorld) {
        for pusher in &mut self.pushers {
            let z = pusher.motion.advance(dt, speed_scale);
            physics.set_kinematic_position(pusher.handle, Vec3::new(0.0, pusher.y, z));
        }
    }

    pub fn width_scale(&self) -> f32 {
        self.width_scale
    }

    /// Scale pusher width; clamped so a pusher never exceeds the table
    pub fn set_width_scale(&mut self, scale: f32, physics: &mut PhysicsWorld) {
        let max_scale = (TABLE_WIDTH - 0.1) / PUSHER_WIDTH;
        self.width_scale = scale.clamp(0.1, max_scale);
        self.apply_width(physics);
    }

    fn apply_width(&self, physics: &mut PhysicsWorld) {
        for pusher in &self.pushers {
            physics.set_box_half_extents(pusher.handle, self.half_extents(pusher));
        }
    }

    fn half_extents(&self, pusher: &Pusher) -> Vec3 {
        Vec3::new(
            pusher.base_half.x * self.width_scale,
            pusher.base_half.y,
            pusher.base_half.z,
        )
    }

    pub fn oscillators(&self) -> impl Iterator<Item = &Oscillator> {
        self.pushers.iter().map(|p| &p.motion)
    }

    pub fn snapshot(&self, physics: &PhysicsWorld) -> Vec<PusherSnapshot> {
        self.pushers
            .iter()
            .filter_map(|p| {
                physics.transform(p.handle).map(|t| PusherSnapshot {
                    position: t.position,
                    rotation: t.rotation,
                    half_extents: self.half_extents(p),
                })
            })
            .collect()
    }
}
