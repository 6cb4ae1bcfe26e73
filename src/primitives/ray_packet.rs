use glam::*;
use std::simd::prelude::*;

use super::{Ray, SIMDVec3Generic, INVALID_ID};

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// A structure-of-lanes packet of K rays, hit state included.
///
/// Lane k of every field belongs to ray k; the packet is the unit the
/// traversal engine hands to the leaf kernels, which update hit state lane
/// by lane as triangles are tested.
#[derive(Clone, Copy, Debug)]
pub struct RayPacketGeneric<const K: usize>
{
    pub origin: SIMDVec3Generic<K>,
    pub direction: SIMDVec3Generic<K>,
    pub tnear: Simd<f32, K>,
    pub tfar: Simd<f32, K>,
    pub time: Simd<f32, K>,
    pub mask: Simd<u32, K>,

    pub u: Simd<f32, K>,
    pub v: Simd<f32, K>,
    pub ng: SIMDVec3Generic<K>,
    pub geom_id: Simd<u32, K>,
    pub prim_id: Simd<u32, K>
}

pub type RayPacket4 = RayPacketGeneric<4>;
pub type RayPacket8 = RayPacketGeneric<8>;

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl<const K: usize> RayPacketGeneric<K>
{
    pub fn from_rays(rays: &[Ray; K]) -> Self {
        RayPacketGeneric {
            origin: SIMDVec3Generic::from_lanes(rays.map(|r| r.origin)),
            direction: SIMDVec3Generic::from_lanes(rays.map(|r| r.direction)),
            tnear: Simd::from_array(rays.map(|r| r.tnear)),
            tfar: Simd::from_array(rays.map(|r| r.tfar)),
            time: Simd::from_array(rays.map(|r| r.time)),
            mask: Simd::from_array(rays.map(|r| r.mask)),
            u: Simd::from_array(rays.map(|r| r.u)),
            v: Simd::from_array(rays.map(|r| r.v)),
            ng: SIMDVec3Generic::from_lanes(rays.map(|r| r.ng)),
            geom_id: Simd::from_array(rays.map(|r| r.geom_id)),
            prim_id: Simd::from_array(rays.map(|r| r.prim_id))
        }
    }

    /// Extracts lane k as a scalar ray, hit state included.
    pub fn ray(&self, k: usize) -> Ray {
        Ray {
            origin: self.origin.lane(k),
            direction: self.direction.lane(k),
            tnear: self.tnear.as_array()[k],
            tfar: self.tfar.as_array()[k],
            time: self.time.as_array()[k],
            mask: self.mask.as_array()[k],
            u: self.u.as_array()[k],
            v: self.v.as_array()[k],
            ng: self.ng.lane(k),
            geom_id: self.geom_id.as_array()[k],
            prim_id: self.prim_id.as_array()[k]
        }
    }

    /// Lanes that carry a committed hit.
    pub fn hit_mask(&self) -> Mask<i32, K> {
        self.geom_id.simd_ne(Simd::splat(INVALID_ID))
    }

    /// Commits a hit into lane k.
    #[inline]
    pub(crate) fn commit_lane(
        &mut self, k: usize,
        u: f32, v: f32, t: f32, ng: Vec3,
        geom_id: u32, prim_id: u32
    ) {
        self.u[k] = u;
        self.v[k] = v;
        self.tfar[k] = t;
        self.ng.x[k] = ng.x;
        self.ng.y[k] = ng.y;
        self.ng.z[k] = ng.z;
        self.geom_id[k] = geom_id;
        self.prim_id[k] = prim_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalar_rays() {
        let mut rays = [Ray::default(); 4];
        for (k, ray) in rays.iter_mut().enumerate() {
            *ray = Ray::new(
                &Vec3::new(k as f32, 0.0, 1.0),
                &Vec3::new(0.0, 0.0, -1.0),
                0.01,
                100.0
            ).with_time(0.25 * k as f32).with_mask(1 << k);
        }

        let packet = RayPacketGeneric::from_rays(&rays);
        for (k, ray) in rays.iter().enumerate() {
            let lane = packet.ray(k);
            assert_eq!(lane.origin, ray.origin);
            assert_eq!(lane.direction, ray.direction);
            assert_eq!(lane.tnear, ray.tnear);
            assert_eq!(lane.tfar, ray.tfar);
            assert_eq!(lane.time, ray.time);
            assert_eq!(lane.mask, ray.mask);
            assert!(!lane.hit());
        }
    }

    #[test]
    fn commit_updates_one_lane_only() {
        let rays = [Ray::new(&Vec3::ZERO, &Vec3::Z, 0.0, f32::MAX); 4];
        let mut packet = RayPacketGeneric::from_rays(&rays);

        packet.commit_lane(2, 0.25, 0.5, 3.0, Vec3::Y, 7, 11);

        assert_eq!(packet.hit_mask().to_array(), [false, false, true, false]);
        let lane = packet.ray(2);
        assert_eq!(lane.tfar, 3.0);
        assert_eq!(lane.geom_id, 7);
        assert_eq!(lane.prim_id, 11);
        assert_eq!(packet.ray(1).tfar, f32::MAX);
    }
}
