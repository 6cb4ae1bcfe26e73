#![feature(portable_simd)]

use std::simd::prelude::*;
use std::time::Instant;

use glam::*;
use incidence::*;
use log::info;

const WIDTH: usize = 64;
const HEIGHT: usize = 32;

fn build_scene() -> (Scene, TriangleBatch4, MotionTriangleBatch4) {
    let mut scene = Scene::new(KernelFlags::RayMask | KernelFlags::IntersectionFilter);
    let floor_id = scene.attach(Geometry::new(!0));
    let blade_id = scene.attach(Geometry::new(!0));

    // Floor quad in the z = 0 plane.
    let floor = TriangleBatch4::from_triangles(&[
        TriangleDesc {
            v0: Vec3::new(-1.0, -1.0, 0.0),
            v1: Vec3::new(1.0, -1.0, 0.0),
            v2: Vec3::new(1.0, 1.0, 0.0),
            geom_id: floor_id,
            prim_id: 0
        },
        TriangleDesc {
            v0: Vec3::new(-1.0, -1.0, 0.0),
            v1: Vec3::new(1.0, 1.0, 0.0),
            v2: Vec3::new(-1.0, 1.0, 0.0),
            geom_id: floor_id,
            prim_id: 1
        }
    ]);

    // A blade hovering above the floor, sweeping sideways over the shutter.
    let blade = MotionTriangleBatch4::from_triangles(&[MotionTriangleDesc {
        v0: Vec3::new(-0.7, -0.2, 0.5),
        v1: Vec3::new(-0.3, 0.6, 0.5),
        v2: Vec3::new(0.1, -0.2, 0.5),
        dv0: Vec3::new(0.6, 0.0, 0.0),
        dv1: Vec3::new(0.6, 0.0, 0.0),
        dv2: Vec3::new(0.6, 0.0, 0.0),
        geom_id: blade_id,
        prim_id: 0
    }]);

    (scene, floor, blade)
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let (scene, floor, blade) = build_scene();
    let light = Vec3::new(1.5, 1.5, 2.5);

    let mut picture = vec![vec![' '; WIDTH]; HEIGHT];
    let mut primary_hits = 0;
    let mut shadowed = 0;

    let start = Instant::now();
    for y in (0..HEIGHT).step_by(2) {
        for x in (0..WIDTH).step_by(2) {
            let mut rays = [Ray::default(); 4];
            for (k, (dx, dy)) in [(0, 0), (1, 0), (0, 1), (1, 1)].iter().enumerate() {
                let px = x + dx;
                let py = y + dy;
                let sx = (px as f32 / (WIDTH - 1) as f32) * 2.4 - 1.2;
                let sy = 1.2 - (py as f32 / (HEIGHT - 1) as f32) * 2.4;
                let time = px as f32 / (WIDTH - 1) as f32;
                rays[k] = Ray::new(
                    &Vec3::new(sx, sy, 2.0),
                    &Vec3::NEG_Z,
                    0.0,
                    f32::MAX
                ).with_time(time);
            }

            let mut packet = RayPacket4::from_rays(&rays);
            let pre = PrecalcK::new(Mask::splat(true), &packet);
            floor.intersect_packet(Mask::splat(true), &pre, &mut packet, &scene, None);
            blade.intersect_packet(Mask::splat(true), &pre, &mut packet, &scene, None);

            for (k, (dx, dy)) in [(0, 0), (1, 0), (0, 1), (1, 1)].iter().enumerate() {
                let lane = packet.ray(k);
                picture[y + dy][x + dx] = if !lane.hit() {
                    '.'
                } else {
                    primary_hits += 1;
                    let point = lane.origin + lane.direction * lane.tfar;
                    let to_light = light - point;
                    let shadow_ray = Ray::new(
                        &point,
                        &to_light.normalize(),
                        1e-3,
                        to_light.length()
                    ).with_time(lane.time);

                    let pre1 = Precalc1::new(&shadow_ray);
                    let occluded = floor.occluded1(&pre1, &shadow_ray, &scene, None)
                        || blade.occluded1(&pre1, &shadow_ray, &scene, None);
                    if occluded {
                        shadowed += 1;
                        '*'
                    } else {
                        '#'
                    }
                };
            }
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    for row in &picture {
        println!("{}", row.iter().collect::<String>());
    }
    info!(
        "{} rays in {:.2}ms, {} primary hits, {} in shadow",
        WIDTH * HEIGHT,
        elapsed * 1000.0,
        primary_hits,
        shadowed
    );
}
