//! Physics integration using Avian 3D.
//!
//! Avian runs in `PostUpdate`, so physics advances exactly once per rendered
//! frame with the (clamped) virtual delta. The simulation core talks to it
//! through [`AvianWorld`], which implements the core's `PhysicsWorld` trait
//! over avian components.
//!
//! Forces from the core are accumulated in [`PendingForce`] and converted to
//! velocity changes (`dv = F/m * dt`) right before the next physics step.

use avian3d::prelude::*;
use bevy::{ecs::system::SystemParam, prelude::*};
use cityrun_core::{BodyDesc, BodyHandle, BodyState, PhysicsWorld, RaycastHit, Shape};

/// Gravity of the city scene (m/s²).
const GRAVITY: f32 = 9.82;

/// Plugin for the physics integration.
pub struct PhysicsIntegrationPlugin {
    /// Avian substep count per physics step.
    pub substeps: u32,
}

impl Plugin for PhysicsIntegrationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::new(PostUpdate))
            .insert_resource(Gravity(Vec3::NEG_Y * GRAVITY))
            .insert_resource(SubstepCount(self.substeps))
            .init_resource::<BodyRegistry>()
            .add_systems(
                PostUpdate,
                (sync_sleep_state, apply_pending_forces)
                    .chain()
                    .before(PhysicsSystems::Prepare),
            );
    }
}

// ============================================================================
// Body registry
// ============================================================================

/// Maps core body handles to entities.
#[derive(Resource, Default, Debug)]
pub struct BodyRegistry {
    entities: Vec<Entity>,
}

impl BodyRegistry {
    /// Register an entity and return its handle.
    pub fn register(&mut self, entity: Entity) -> BodyHandle {
        let handle = BodyHandle(u32::try_from(self.entities.len()).unwrap_or(u32::MAX));
        self.entities.push(entity);
        handle
    }

    pub fn entity(&self, handle: BodyHandle) -> Option<Entity> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.entities.get(index))
            .copied()
    }

    pub fn handle(&self, entity: Entity) -> Option<BodyHandle> {
        self.entities
            .iter()
            .position(|&e| e == entity)
            .and_then(|index| u32::try_from(index).ok())
            .map(BodyHandle)
    }
}

/// Force accumulated by the core since the last physics step.
#[derive(Component, Default, Debug)]
pub struct PendingForce(pub Vec3);

/// Whether the core has put this body to sleep.
///
/// Mirrored onto [`RigidBodyDisabled`] and [`ColliderDisabled`] before the
/// next physics step.
#[derive(Component, Default, Debug)]
pub struct BodyAsleep(pub bool);

/// Physics components for a core body description.
pub fn body_bundle(desc: &BodyDesc) -> impl Bundle {
    let parts = desc
        .shapes
        .iter()
        .map(|shape| match *shape {
            Shape::Sphere { radius, offset } => (offset, Quat::IDENTITY, Collider::sphere(radius)),
            Shape::Cuboid {
                half_extents,
                offset,
            } => (
                offset,
                Quat::IDENTITY,
                Collider::cuboid(
                    half_extents.x * 2.0,
                    half_extents.y * 2.0,
                    half_extents.z * 2.0,
                ),
            ),
        })
        .collect::<Vec<_>>();
    let locked = if desc.lock_rotation {
        LockedAxes::ROTATION_LOCKED
    } else {
        LockedAxes::new()
    };

    (
        RigidBody::Dynamic,
        Collider::compound(parts),
        Mass(desc.mass),
        LinearDamping(desc.linear_damping),
        AngularDamping(desc.angular_damping),
        locked,
        Transform::from_translation(desc.position).with_rotation(desc.rotation),
        PendingForce::default(),
        BodyAsleep::default(),
    )
}

// ============================================================================
// Systems
// ============================================================================

/// Disable physics for sleeping bodies.
fn sync_sleep_state(mut commands: Commands, query: Query<(Entity, &BodyAsleep), Changed<BodyAsleep>>) {
    for (entity, asleep) in &query {
        if asleep.0 {
            commands
                .entity(entity)
                .insert((RigidBodyDisabled, ColliderDisabled));
        } else {
            commands
                .entity(entity)
                .remove::<(RigidBodyDisabled, ColliderDisabled)>();
        }
    }
}

/// Convert accumulated forces to velocity changes: dv = F/m * dt.
fn apply_pending_forces(
    time: Res<Time>,
    mut query: Query<(&mut PendingForce, &ComputedMass, &BodyAsleep, &mut LinearVelocity)>,
) {
    let dt = time.delta_secs();
    for (mut force, mass, asleep, mut velocity) in &mut query {
        if !asleep.0 && force.0 != Vec3::ZERO {
            velocity.0 += force.0 / mass.value().max(0.001) * dt;
        }
        force.0 = Vec3::ZERO;
    }
}

// ============================================================================
// PhysicsWorld adapter
// ============================================================================

/// The avian world as seen by the simulation core.
#[derive(SystemParam)]
pub struct AvianWorld<'w, 's> {
    registry: Res<'w, BodyRegistry>,
    spatial_query: Res<'w, SpatialQueryPipeline>,
    bodies: Query<
        'w,
        's,
        (
            &'static mut Position,
            &'static mut Rotation,
            &'static mut Transform,
            &'static mut LinearVelocity,
            &'static mut AngularVelocity,
            &'static ComputedMass,
            &'static mut PendingForce,
            &'static mut BodyAsleep,
        ),
    >,
}

impl PhysicsWorld for AvianWorld<'_, '_> {
    /// Avian steps itself in `PostUpdate` before the core runs.
    fn step(&mut self, _fixed_rate: f32, _dt: f32, _max_substeps: u32) {}

    fn raycast_closest(&self, from: Vec3, to: Vec3, exclude: Option<BodyHandle>) -> RaycastHit {
        let delta = to - from;
        let Ok(direction) = Dir3::new(delta) else {
            return RaycastHit::MISS;
        };
        let filter = match exclude.and_then(|handle| self.registry.entity(handle)) {
            Some(entity) => SpatialQueryFilter::default().with_excluded_entities([entity]),
            None => SpatialQueryFilter::default(),
        };
        self.spatial_query
            .cast_ray(from, direction, delta.length(), true, &filter)
            .map_or(RaycastHit::MISS, |hit| RaycastHit {
                has_hit: true,
                distance: hit.distance,
                body: self.registry.handle(hit.entity),
            })
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        let entity = self.registry.entity(handle)?;
        let (position, rotation, _, linear, angular, mass, _, asleep) =
            self.bodies.get(entity).ok()?;
        Some(BodyState {
            position: position.0,
            rotation: rotation.0,
            linear_velocity: linear.0,
            angular_velocity: angular.0,
            mass: mass.value(),
            sleeping: asleep.0,
        })
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec3) {
        if let Some(mut pending) = self.component_mut(handle, |c| c.6) {
            pending.0 += force;
        }
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        let Some(entity) = self.registry.entity(handle) else {
            return;
        };
        if let Ok((mut pos, _, mut transform, ..)) = self.bodies.get_mut(entity) {
            pos.0 = position;
            transform.translation = position;
        }
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(mut linear) = self.component_mut(handle, |c| c.3) {
            linear.0 = velocity;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(mut angular) = self.component_mut(handle, |c| c.4) {
            angular.0 = velocity;
        }
    }

    fn set_sleeping(&mut self, handle: BodyHandle, sleeping: bool) {
        if let Some(mut asleep) = self.component_mut(handle, |c| c.7) {
            asleep.0 = sleeping;
        }
    }
}

type BodyItem<'a> = (
    Mut<'a, Position>,
    Mut<'a, Rotation>,
    Mut<'a, Transform>,
    Mut<'a, LinearVelocity>,
    Mut<'a, AngularVelocity>,
    &'a ComputedMass,
    Mut<'a, PendingForce>,
    Mut<'a, BodyAsleep>,
);

impl AvianWorld<'_, '_> {
    /// Borrow one component of a registered body mutably.
    fn component_mut<'a, T>(
        &'a mut self,
        handle: BodyHandle,
        pick: impl FnOnce(BodyItem<'a>) -> T,
    ) -> Option<T> {
        let entity = self.registry.entity(handle)?;
        self.bodies.get_mut(entity).ok().map(pick)
    }
}
