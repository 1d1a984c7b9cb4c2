use nalgebra::{Point3, UnitQuaternion, Vector3, point, vector};
use locomotion::{
    ColliderShapeDef, Environment, Ladder, PushBlock, StaticQueryWorld, WaterVolume,
    WorldStaticDef, build_static_query_world,
};

/// Layer of props the character walks through when `ignored_layers` has bit 1 set.
pub const DECORATION_LAYER: u32 = 1;

pub struct Level {
    pub world: StaticQueryWorld,
    pub environment: Environment,
    pub spawn: Point3<f32>,
}

pub const LADDER_BOTTOM: Point3<f32> = Point3::new(0.0, 0.0, 40.0);
pub const POOL_CENTER: Point3<f32> = Point3::new(-20.0, 1.0, 10.0);
pub const BLOCK_CENTER: Point3<f32> = Point3::new(6.0, 0.5, 10.0);

/// Flat ground with a low step, a ramp, a platform reached by a ladder, a pool and a push block.
pub fn build(dt: f32) -> Level {
    let statics = [
        WorldStaticDef::new(0, Vector3::zeros(), ColliderShapeDef::Plane {
            offset_along_normal: 0.0,
        }),
        // Low enough to autostep.
        WorldStaticDef::new(1, vector![0.0, 0.15, 20.0], ColliderShapeDef::Cuboid {
            half_extents: vector![2.0, 0.15, 1.0],
        }),
        WorldStaticDef::new(2, vector![10.0, 0.0, 20.0], ColliderShapeDef::Cuboid {
            half_extents: vector![2.0, 0.5, 6.0],
        })
        .with_rotation(UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.35)),
        // Platform the ladder leads up to.
        WorldStaticDef::new(3, vector![0.0, 2.0, 42.0], ColliderShapeDef::Cuboid {
            half_extents: vector![3.0, 2.0, 1.5],
        }),
        WorldStaticDef::new(4, vector![-6.0, 1.0, 25.0], ColliderShapeDef::RoundCuboid {
            half_extents: vector![0.4, 0.9, 0.4],
            border_radius: 0.1,
        })
        .on_layer(DECORATION_LAYER),
    ];

    let mut environment = Environment::new();
    environment.add_ladder(Ladder::new(LADDER_BOTTOM, UnitQuaternion::identity(), 4.0));
    environment.add_water(WaterVolume::new(
        POOL_CENTER,
        vector![5.0, 1.5, 5.0],
        UnitQuaternion::identity(),
    ));
    environment.add_block(PushBlock::new(
        BLOCK_CENTER,
        vector![0.5, 0.5, 0.5],
        UnitQuaternion::identity(),
    ));

    log::info!("Level built");
    Level {
        world: build_static_query_world(statics, dt),
        environment,
        spawn: point![0.0, 0.05, 0.0],
    }
}
