/*!
Static level geometry for the reference motor.

Levels are described as a list of [`WorldStaticDef`]s and built once into a [`StaticQueryWorld`]:
a rapier collider set plus a broad phase that can hand out borrowed query pipelines for ray casts
and the kinematic character controller.

Notes
- Each collider carries its collision layer in `user_data`, so query filters and movement hits can
  report and honour layers without a side table.
- The world is immutable after construction; nothing here steps a simulation.
*/

use rapier3d::na::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rapier3d::parry::query;
use rapier3d::prelude::*;

/// Definition of an immutable level collider.
#[derive(Clone, Debug)]
pub struct WorldStaticDef {
    pub id: u32,
    /// World-space translation.
    pub translation: Vector<f32>,
    /// World-space rotation (unit quaternion).
    pub rotation: UnitQuaternion<f32>,
    pub shape: ColliderShapeDef,
    /// Collision layer, bit index into the character's ignored-layer mask.
    pub layer: u32,
}

impl WorldStaticDef {
    pub fn new(id: u32, translation: Vector<f32>, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            translation,
            rotation: UnitQuaternion::identity(),
            shape,
            layer: 0,
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

/// Supported static collider shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space) with normal `rotation * +Y`, offset along that normal.
    Plane { offset_along_normal: f32 },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },

    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Rounded cuboid (meters). `border_radius` rounds all edges and corners.
    RoundCuboid {
        half_extents: Vector<f32>,
        border_radius: f32,
    },
}

/// Build a rapier collider from a `WorldStaticDef`, posed and tagged with its layer.
pub fn collider_from_def(def: &WorldStaticDef) -> Collider {
    let builder = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // Plane n . x = dist, with n = R * +Y and dist measured from the def's translation.
            let n = def.rotation * Vector::y();
            let dist = n.dot(&def.translation) + *offset_along_normal;
            let unit_n = UnitVector::new_normalize(n);
            return ColliderBuilder::new(SharedShape::new(HalfSpace::new(unit_n)))
                .translation(unit_n.into_inner() * dist)
                .user_data(u128::from(def.layer))
                .build();
        }
        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius),
        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius),
        ColliderShapeDef::RoundCuboid {
            half_extents,
            border_radius,
        } => ColliderBuilder::round_cuboid(
            half_extents.x,
            half_extents.y,
            half_extents.z,
            *border_radius,
        ),
    };

    builder
        .position(Isometry3::from_parts(
            Translation3::from(def.translation),
            def.rotation,
        ))
        .user_data(u128::from(def.layer))
        .build()
}

/// Collision layer stored on a collider by [`collider_from_def`].
#[inline]
pub fn collider_layer(collider: &Collider) -> u32 {
    u32::try_from(collider.user_data).unwrap_or(u32::MAX)
}

#[inline]
pub(crate) fn layer_in_mask(layer: u32, mask: u32) -> bool {
    layer < u32::BITS && mask & (1 << layer) != 0
}

/// Ray hit against the static world.
#[derive(Clone, Copy, Debug)]
pub struct WorldRayHit {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
    pub layer: u32,
}

pub struct StaticQueryWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
}

impl StaticQueryWorld {
    pub fn as_query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn layer_of(&self, handle: ColliderHandle) -> Option<u32> {
        self.colliders.get(handle).map(collider_layer)
    }

    /// Closest hit along a ray against colliders whose layer is in `layers`.
    pub fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        layers: u32,
    ) -> Option<WorldRayHit> {
        let predicate = |_: ColliderHandle, collider: &Collider| {
            layer_in_mask(collider_layer(collider), layers)
        };
        let pipeline = self.as_query_pipeline(QueryFilter::only_fixed().predicate(&predicate));

        let ray = Ray::new(origin, direction);
        let (handle, hit) = pipeline.cast_ray_and_get_normal(&ray, max_distance.max(0.0), true)?;
        Some(WorldRayHit {
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
            layer: self.layer_of(handle).unwrap_or(0),
        })
    }

    /// Does `shape` at `pose` intersect any collider whose layer is in `layers`?
    pub fn overlaps(&self, pose: &Isometry3<f32>, shape: &dyn Shape, layers: u32) -> bool {
        self.colliders.iter().any(|(_, collider)| {
            layer_in_mask(collider_layer(collider), layers)
                && query::intersection_test(pose, shape, collider.position(), collider.shape())
                    .unwrap_or(false)
        })
    }
}

pub fn build_static_query_world(
    world_statics: impl IntoIterator<Item = WorldStaticDef>,
    dt: f32,
) -> StaticQueryWorld {
    let bodies = RigidBodySet::new();
    let mut colliders = ColliderSet::new();

    // Deterministic insertion order.
    let mut defs: Vec<WorldStaticDef> = world_statics.into_iter().collect();
    defs.sort_by_key(|def| def.id);

    let modified_colliders: Vec<ColliderHandle> = defs
        .iter()
        .map(|def| colliders.insert(collider_from_def(def)))
        .collect();

    let mut broad_phase = BroadPhaseBvh::new();
    let mut events = Vec::new();
    broad_phase.update(
        &IntegrationParameters {
            dt,
            ..IntegrationParameters::default()
        },
        &colliders,
        &bodies,
        &modified_colliders,
        &[],
        &mut events,
    );

    log::debug!("Built static query world with {} colliders", colliders.len());
    StaticQueryWorld {
        bodies,
        colliders,
        broad_phase,
        narrow_phase: NarrowPhase::default(),
    }
}
