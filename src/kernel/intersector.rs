use std::simd::prelude::*;

use crate::{
    MotionTriangleBatchGeneric, Ray, RayPacketGeneric, SIMDVec3Generic, Scene,
    TriangleBatchGeneric
};

use super::moeller;
use super::{
    Intersect1Epilog, IntersectKEpilog, IntersectLaneEpilog, Occluded1Epilog, OccludedKEpilog,
    OccludedLaneEpilog
};

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// Per-ray precomputation slot required by the traversal contract. This
/// kernel family precomputes nothing, so the type is empty; other kernel
/// families plug in here with real state.
pub struct Precalc1;

/// Per-packet precomputation slot, equally empty for this kernel family.
pub struct PrecalcK;

/// Leaf-level test of one ray against a triangle batch.
pub trait LeafIntersector1 {
    /// Finds the nearest accepted hit and commits it into the ray,
    /// tightening `tfar`.
    fn intersect1(&self, pre: &Precalc1, ray: &mut Ray, scene: &Scene, remap: Option<&[u32]>);

    /// Reports whether anything in the batch occludes the ray.
    fn occluded1(&self, pre: &Precalc1, ray: &Ray, scene: &Scene, remap: Option<&[u32]>) -> bool;
}

/// Leaf-level test of a K-wide ray packet against a triangle batch.
pub trait LeafIntersectorK<const K: usize>
{
    /// Runs the batch against every active packet lane, committing per-lane
    /// nearest hits as it goes.
    fn intersect_packet(
        &self, valid: Mask<i32, K>, pre: &PrecalcK,
        ray: &mut RayPacketGeneric<K>, scene: &Scene, remap: Option<&[u32]>
    );

    /// Returns the packet lanes occluded by the batch.
    fn occluded_packet(
        &self, valid: Mask<i32, K>, pre: &PrecalcK,
        ray: &RayPacketGeneric<K>, scene: &Scene, remap: Option<&[u32]>
    ) -> Mask<i32, K>;

    /// Tests a single packet lane against the whole batch.
    fn intersect_lane(
        &self, pre: &PrecalcK,
        ray: &mut RayPacketGeneric<K>, k: usize, scene: &Scene, remap: Option<&[u32]>
    );

    /// Occlusion test for a single packet lane against the whole batch.
    fn occluded_lane(
        &self, pre: &PrecalcK,
        ray: &RayPacketGeneric<K>, k: usize, scene: &Scene, remap: Option<&[u32]>
    ) -> bool;
}

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl Precalc1 {
    #[inline]
    pub fn new(_ray: &Ray) -> Self {
        Precalc1
    }
}

impl PrecalcK {
    #[inline]
    pub fn new<const K: usize>(_valid: Mask<i32, K>, _ray: &RayPacketGeneric<K>) -> Self
    {
        PrecalcK
    }
}

impl<const M: usize> LeafIntersector1 for TriangleBatchGeneric<M>
{
    fn intersect1(&self, _pre: &Precalc1, ray: &mut Ray, scene: &Scene, remap: Option<&[u32]>) {
        moeller::intersect1(
            ray.origin, ray.direction, ray.tnear, ray.tfar,
            &self.v0, &self.e1, &self.e2, &self.ng,
            self.active_mask(), scene.flags(),
            Intersect1Epilog {
                ray,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene,
                remap
            }
        );
    }

    fn occluded1(&self, _pre: &Precalc1, ray: &Ray, scene: &Scene, _remap: Option<&[u32]>) -> bool {
        moeller::intersect1(
            ray.origin, ray.direction, ray.tnear, ray.tfar,
            &self.v0, &self.e1, &self.e2, &self.ng,
            self.active_mask(), scene.flags(),
            Occluded1Epilog {
                ray,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene
            }
        )
    }
}

impl<const K: usize, const M: usize> LeafIntersectorK<K> for TriangleBatchGeneric<M>
{
    fn intersect_packet(
        &self, valid: Mask<i32, K>, _pre: &PrecalcK,
        ray: &mut RayPacketGeneric<K>, scene: &Scene, remap: Option<&[u32]>
    ) {
        for i in 0..self.len() {
            let v0 = SIMDVec3Generic::splat(self.v0.lane(i));
            let e1 = SIMDVec3Generic::splat(self.e1.lane(i));
            let e2 = SIMDVec3Generic::splat(self.e2.lane(i));
            let ng = SIMDVec3Generic::splat(self.ng.lane(i));

            // tfar is re-read every iteration: hits committed by earlier
            // triangles tighten the interval for later ones.
            let org = ray.origin;
            let dir = ray.direction;
            let tnear = ray.tnear;
            let tfar = ray.tfar;
            moeller::intersect_k(
                valid, &org, &dir, tnear, tfar, &v0, &e1, &e2, &ng, scene.flags(),
                IntersectKEpilog {
                    ray: &mut *ray,
                    geom_id: self.geom_ids.as_array()[i],
                    prim_id: self.prim_ids.as_array()[i],
                    scene,
                    remap
                }
            );
        }
    }

    fn occluded_packet(
        &self, valid: Mask<i32, K>, _pre: &PrecalcK,
        ray: &RayPacketGeneric<K>, scene: &Scene, _remap: Option<&[u32]>
    ) -> Mask<i32, K> {
        let mut live = valid;
        for i in 0..self.len() {
            if !live.any() {
                break;
            }
            let v0 = SIMDVec3Generic::splat(self.v0.lane(i));
            let e1 = SIMDVec3Generic::splat(self.e1.lane(i));
            let e2 = SIMDVec3Generic::splat(self.e2.lane(i));
            let ng = SIMDVec3Generic::splat(self.ng.lane(i));

            let occluded = moeller::intersect_k(
                live, &ray.origin, &ray.direction, ray.tnear, ray.tfar,
                &v0, &e1, &e2, &ng, scene.flags(),
                OccludedKEpilog {
                    ray,
                    geom_id: self.geom_ids.as_array()[i],
                    prim_id: self.prim_ids.as_array()[i],
                    scene
                }
            );
            live &= !occluded;
        }
        valid & !live
    }

    fn intersect_lane(
        &self, _pre: &PrecalcK,
        ray: &mut RayPacketGeneric<K>, k: usize, scene: &Scene, remap: Option<&[u32]>
    ) {
        let lane_ray = ray.ray(k);
        moeller::intersect1(
            lane_ray.origin, lane_ray.direction, lane_ray.tnear, lane_ray.tfar,
            &self.v0, &self.e1, &self.e2, &self.ng,
            self.active_mask(), scene.flags(),
            IntersectLaneEpilog {
                ray,
                k,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene,
                remap
            }
        );
    }

    fn occluded_lane(
        &self, _pre: &PrecalcK,
        ray: &RayPacketGeneric<K>, k: usize, scene: &Scene, _remap: Option<&[u32]>
    ) -> bool {
        let lane_ray = ray.ray(k);
        moeller::intersect1(
            lane_ray.origin, lane_ray.direction, lane_ray.tnear, lane_ray.tfar,
            &self.v0, &self.e1, &self.e2, &self.ng,
            self.active_mask(), scene.flags(),
            OccludedLaneEpilog {
                ray,
                k,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene
            }
        )
    }
}

impl<const M: usize> LeafIntersector1 for MotionTriangleBatchGeneric<M>
{
    fn intersect1(&self, _pre: &Precalc1, ray: &mut Ray, scene: &Scene, remap: Option<&[u32]>) {
        let (v0, v1, v2) = self.interpolate(Simd::splat(ray.time));
        moeller::intersect1_verts(
            ray.origin, ray.direction, ray.tnear, ray.tfar,
            &v0, &v1, &v2,
            self.active_mask(), scene.flags(),
            Intersect1Epilog {
                ray,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene,
                remap
            }
        );
    }

    fn occluded1(&self, _pre: &Precalc1, ray: &Ray, scene: &Scene, _remap: Option<&[u32]>) -> bool {
        let (v0, v1, v2) = self.interpolate(Simd::splat(ray.time));
        moeller::intersect1_verts(
            ray.origin, ray.direction, ray.tnear, ray.tfar,
            &v0, &v1, &v2,
            self.active_mask(), scene.flags(),
            Occluded1Epilog {
                ray,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene
            }
        )
    }
}

impl<const K: usize, const M: usize> LeafIntersectorK<K> for MotionTriangleBatchGeneric<M>
{
    fn intersect_packet(
        &self, valid: Mask<i32, K>, _pre: &PrecalcK,
        ray: &mut RayPacketGeneric<K>, scene: &Scene, remap: Option<&[u32]>
    ) {
        for i in 0..self.len() {
            let time = ray.time;
            let v0 = SIMDVec3Generic::splat(self.v0.lane(i))
                + SIMDVec3Generic::splat(self.dv0.lane(i)) * time;
            let v1 = SIMDVec3Generic::splat(self.v1.lane(i))
                + SIMDVec3Generic::splat(self.dv1.lane(i)) * time;
            let v2 = SIMDVec3Generic::splat(self.v2.lane(i))
                + SIMDVec3Generic::splat(self.dv2.lane(i)) * time;

            let org = ray.origin;
            let dir = ray.direction;
            let tnear = ray.tnear;
            let tfar = ray.tfar;
            moeller::intersect_k_verts(
                valid, &org, &dir, tnear, tfar, &v0, &v1, &v2, scene.flags(),
                IntersectKEpilog {
                    ray: &mut *ray,
                    geom_id: self.geom_ids.as_array()[i],
                    prim_id: self.prim_ids.as_array()[i],
                    scene,
                    remap
                }
            );
        }
    }

    fn occluded_packet(
        &self, valid: Mask<i32, K>, _pre: &PrecalcK,
        ray: &RayPacketGeneric<K>, scene: &Scene, _remap: Option<&[u32]>
    ) -> Mask<i32, K> {
        let mut live = valid;
        for i in 0..self.len() {
            if !live.any() {
                break;
            }
            let time = ray.time;
            let v0 = SIMDVec3Generic::splat(self.v0.lane(i))
                + SIMDVec3Generic::splat(self.dv0.lane(i)) * time;
            let v1 = SIMDVec3Generic::splat(self.v1.lane(i))
                + SIMDVec3Generic::splat(self.dv1.lane(i)) * time;
            let v2 = SIMDVec3Generic::splat(self.v2.lane(i))
                + SIMDVec3Generic::splat(self.dv2.lane(i)) * time;

            let occluded = moeller::intersect_k_verts(
                live, &ray.origin, &ray.direction, ray.tnear, ray.tfar,
                &v0, &v1, &v2, scene.flags(),
                OccludedKEpilog {
                    ray,
                    geom_id: self.geom_ids.as_array()[i],
                    prim_id: self.prim_ids.as_array()[i],
                    scene
                }
            );
            live &= !occluded;
        }
        valid & !live
    }

    fn intersect_lane(
        &self, _pre: &PrecalcK,
        ray: &mut RayPacketGeneric<K>, k: usize, scene: &Scene, remap: Option<&[u32]>
    ) {
        let lane_ray = ray.ray(k);
        let (v0, v1, v2) = self.interpolate(Simd::splat(lane_ray.time));
        moeller::intersect1_verts(
            lane_ray.origin, lane_ray.direction, lane_ray.tnear, lane_ray.tfar,
            &v0, &v1, &v2,
            self.active_mask(), scene.flags(),
            IntersectLaneEpilog {
                ray,
                k,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene,
                remap
            }
        );
    }

    fn occluded_lane(
        &self, _pre: &PrecalcK,
        ray: &RayPacketGeneric<K>, k: usize, scene: &Scene, _remap: Option<&[u32]>
    ) -> bool {
        let lane_ray = ray.ray(k);
        let (v0, v1, v2) = self.interpolate(Simd::splat(lane_ray.time));
        moeller::intersect1_verts(
            lane_ray.origin, lane_ray.direction, lane_ray.tnear, lane_ray.tfar,
            &v0, &v1, &v2,
            self.active_mask(), scene.flags(),
            OccludedLaneEpilog {
                ray,
                k,
                geom_ids: self.geom_ids,
                prim_ids: self.prim_ids,
                scene
            }
        )
    }
}
