//! rapier3d physics world
//!
//! Owns every rigid body on the table. The rest of the simulation talks to it
//! in glam types; nalgebra stays inside this module.
//!
//! Stepping is decoupled from the frame rate: `step(dt)` feeds an accumulator
//! and integrates fixed `SIM_DT` substeps, at most `MAX_SUBSTEPS` per call.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::consts::*;
use crate::tuning::CoinSizeConfig;

pub type BodyHandle = RigidBodyHandle;

/// World-space pose of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

#[inline]
fn to_na(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
fn from_na(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Unintegrated time carried to the next `step`
    accumulator: f32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Empty world with base gravity
    pub fn new() -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = SIM_DT;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, -GRAVITY, 0.0],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            accumulator: 0.0,
        }
    }

    /// World with the table, side walls and back wall in place
    pub fn with_table() -> Self {
        let mut world = Self::new();
        world.build_table();
        world
    }

    fn add_fixed_box(&mut self, center: Vec3, half: Vec3, friction: f32) {
        let body = RigidBodyBuilder::fixed().translation(to_na(center)).build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
            .friction(friction)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
    }

    fn build_table(&mut self) {
        // Playfield slab, top face at y = 0
        self.add_fixed_box(
            Vec3::new(0.0, -0.1, 0.0),
            Vec3::new(TABLE_HALF_WIDTH, 0.1, TABLE_HALF_DEPTH),
            0.5,
        );

        // Side walls
        let wall_half = Vec3::new(0.05, WALL_HEIGHT / 2.0, TABLE_HALF_DEPTH);
        for side in [-1.0, 1.0] {
            self.add_fixed_box(
                Vec3::new(side * (TABLE_HALF_WIDTH + 0.05), WALL_HEIGHT / 2.0, 0.0),
                wall_half,
                0.2,
            );
        }

        // Back wall
        self.add_fixed_box(
            Vec3::new(0.0, WALL_HEIGHT / 2.0, -(TABLE_HALF_DEPTH + 0.05)),
            Vec3::new(TABLE_HALF_WIDTH + 0.1, WALL_HEIGHT / 2.0, 0.05),
            0.2,
        );
    }

    /// Add a dynamic coin (flat cylinder) and return its body
    pub fn add_coin(&mut self, position: Vec3, size: &CoinSizeConfig) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(position))
            .linear_damping(0.1)
            .angular_damping(0.5)
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);

        let volume = std::f32::consts::PI * size.radius * size.radius * size.thickness;
        let collider = ColliderBuilder::cylinder(size.thickness / 2.0, size.radius)
            .density(size.mass / volume)
            .friction(0.6)
            .restitution(0.1)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Add a dynamic item (cube) and return its body
    pub fn add_item(&mut self, position: Vec3, half_extent: f32, mass: f32) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(position))
            .linear_damping(0.1)
            .angular_damping(0.5)
            .build();
        let handle = self.bodies.insert(body);

        let volume = 8.0 * half_extent * half_extent * half_extent;
        let collider = ColliderBuilder::cuboid(half_extent, half_extent, half_extent)
            .density(mass / volume)
            .friction(0.5)
            .restitution(0.05)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Add a kinematic box driven by `set_kinematic_position`
    pub fn add_pusher(&mut self, position: Vec3, half_extents: Vec3) -> BodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(to_na(position))
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .friction(0.4)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Remove a body and its colliders; false if it was already gone
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Advance by `dt` seconds of wall time; returns the substeps taken
    pub fn step(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step_once();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        // Drop backlog we could not integrate
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    fn step_once(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    pub fn transform(&self, handle: BodyHandle) -> Option<Transform> {
        self.bodies.get(handle).map(|rb| {
            let q = rb.rotation();
            Transform {
                position: from_na(rb.translation()),
                rotation: Quat::from_xyzw(q.i, q.j, q.k, q.w),
            }
        })
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| from_na(rb.translation()))
    }

    pub fn linvel(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| from_na(rb.linvel()))
    }

    pub fn is_sleeping(&self, handle: BodyHandle) -> bool {
        self.bodies
            .get(handle)
            .map(|rb| rb.is_sleeping())
            .unwrap_or(false)
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.apply_impulse(to_na(impulse), true);
        }
    }

    /// Teleport a dynamic body and zero its velocity
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_translation(to_na(position), true);
            rb.set_linvel(vector![0.0, 0.0, 0.0], true);
            rb.set_angvel(vector![0.0, 0.0, 0.0], true);
        }
    }

    /// Target pose for a kinematic body at the next step
    pub fn set_kinematic_position(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_next_kinematic_translation(to_na(position));
        }
    }

    /// Resize every box collider attached to `handle`
    pub fn set_box_half_extents(&mut self, handle: BodyHandle, half: Vec3) {
        let Some(rb) = self.bodies.get(handle) else {
            return;
        };
        for collider in rb.colliders() {
            if let Some(c) = self.colliders.get_mut(*collider) {
                c.set_shape(SharedShape::cuboid(half.x, half.y, half.z));
            }
        }
    }

    /// Damp X/Z spin of a body moving slower than `settle_speed`
    ///
    /// Returns true if the body counted as settled.
    pub fn damp_tilt(&mut self, handle: BodyHandle, factor: f32, settle_speed: f32) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        if rb.linvel().norm() >= settle_speed {
            return false;
        }
        let w = *rb.angvel();
        rb.set_angvel(vector![w.x * factor, w.y, w.z * factor], false);
        true
    }

    /// Scale gravity relative to the base value
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity = vector![0.0, -GRAVITY * scale, 0.0];
    }

    pub fn gravity(&self) -> Vec3 {
        from_na(&self.gravity)
    }

    pub fn wake_all(&mut self) {
        for (_, rb) in self.bodies.iter_mut() {
            if rb.is_dynamic() {
                rb.wake_up(true);
            }
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::CoinSize;

    fn run(world: &mut PhysicsWorld, seconds: f32) {
        let frames = (seconds / SIM_DT).round() as u32;
        for _ in 0..frames {
            world.step(SIM_DT);
        }
    }

    #[test]
    fn test_coin_rests_on_table() {
        let mut world = PhysicsWorld::with_table();
        let coin = world.add_coin(Vec3::new(0.0, 1.0, 0.0), CoinSize::Small.config());
        run(&mut world, 2.0);
        let pos = world.position(coin).unwrap();
        assert!(pos.y > -0.05 && pos.y < 0.3, "coin at {:?}", pos);
    }

    #[test]
    fn test_coin_off_table_falls() {
        let mut world = PhysicsWorld::with_table();
        let coin = world.add_coin(Vec3::new(0.0, 1.0, 5.0), CoinSize::Small.config());
        run(&mut world, 1.0);
        assert!(world.position(coin).unwrap().y < COLLECTION_HEIGHT);
    }

    #[test]
    fn test_step_clamps_substeps() {
        let mut world = PhysicsWorld::new();
        assert_eq!(world.step(1.0), MAX_SUBSTEPS);
        // Backlog was discarded
        assert!(world.step(0.0) <= 1);
        assert_eq!(world.step(SIM_DT * 0.5), 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut world = PhysicsWorld::new();
        let before = world.body_count();
        let h = world.add_item(Vec3::ZERO, 0.3, 1.0);
        assert_eq!(world.body_count(), before + 1);
        assert!(world.remove(h));
        assert!(!world.remove(h));
        assert!(world.position(h).is_none());
    }

    #[test]
    fn test_gravity_scale() {
        let mut world = PhysicsWorld::new();
        world.set_gravity_scale(0.4);
        assert!((world.gravity().y + GRAVITY * 0.4).abs() < 1e-5);
        world.set_gravity_scale(1.0);
        assert!((world.gravity().y + GRAVITY).abs() < 1e-5);
    }

    #[test]
    fn test_kinematic_pusher_moves() {
        let mut world = PhysicsWorld::new();
        let p = world.add_pusher(Vec3::ZERO, Vec3::splat(0.5));
        world.set_kinematic_position(p, Vec3::new(0.0, 0.0, 1.0));
        world.step(SIM_DT);
        assert!((world.position(p).unwrap().z - 1.0).abs() < 1e-4);
    }
}
