use std::simd::prelude::*;

use crate::{
    first_valid, select_min, HitCandidate, KernelFlags, Ray, RayPacketGeneric, SIMDVec3Generic,
    Scene
};

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// The raw lane coordinates a geometric test produces. Scaled by the
/// absolute denominator; dividing it out is deferred until a candidate is
/// actually wanted.
#[derive(Clone, Copy, Debug)]
pub struct UnnormalizedHit<const LANES: usize>
{
    pub u: Simd<f32, LANES>,
    pub v: Simd<f32, LANES>,
    pub t: Simd<f32, LANES>,
    pub abs_den: Simd<f32, LANES>,
    pub ng: SIMDVec3Generic<LANES>
}

/// Barycentric coordinates, depth and geometric normal per lane.
#[derive(Clone, Copy, Debug)]
pub struct HitAttributes<const LANES: usize>
{
    pub u: Simd<f32, LANES>,
    pub v: Simd<f32, LANES>,
    pub t: Simd<f32, LANES>,
    pub ng: SIMDVec3Generic<LANES>
}

/// Candidate selection run after a one-ray-many-triangles test.
///
/// Receives the lanes that passed the geometric test plus their raw
/// coordinates and decides which single lane, if any, the ray commits to.
pub trait TriangleEpilog<const M: usize>
{
    fn apply(self, valid: Mask<i32, M>, hit: UnnormalizedHit<M>) -> bool;
}

/// Candidate selection run after a many-rays-one-triangle test; every ray
/// lane resolves independently. Returns the lanes that were accepted.
pub trait PacketEpilog<const K: usize>
{
    fn apply(self, valid: Mask<i32, K>, hit: UnnormalizedHit<K>) -> Mask<i32, K>;
}

/// Commits the nearest surviving candidate into a single ray.
pub struct Intersect1Epilog<'a, const M: usize>
{
    pub ray: &'a mut Ray,
    pub geom_ids: Simd<u32, M>,
    pub prim_ids: Simd<u32, M>,
    pub scene: &'a Scene,
    pub remap: Option<&'a [u32]>
}

/// Reports whether any candidate occludes a single ray.
pub struct Occluded1Epilog<'a, const M: usize>
{
    pub ray: &'a Ray,
    pub geom_ids: Simd<u32, M>,
    pub prim_ids: Simd<u32, M>,
    pub scene: &'a Scene
}

/// Commits one broadcast triangle into every packet lane it improves.
pub struct IntersectKEpilog<'a, const K: usize>
{
    pub ray: &'a mut RayPacketGeneric<K>,
    pub geom_id: u32,
    pub prim_id: u32,
    pub scene: &'a Scene,
    pub remap: Option<&'a [u32]>
}

/// Resolves one broadcast triangle against every still-unoccluded packet lane.
pub struct OccludedKEpilog<'a, const K: usize>
{
    pub ray: &'a RayPacketGeneric<K>,
    pub geom_id: u32,
    pub prim_id: u32,
    pub scene: &'a Scene
}

/// Commits the nearest surviving candidate into lane k of a packet.
pub struct IntersectLaneEpilog<'a, const K: usize, const M: usize>
{
    pub ray: &'a mut RayPacketGeneric<K>,
    pub k: usize,
    pub geom_ids: Simd<u32, M>,
    pub prim_ids: Simd<u32, M>,
    pub scene: &'a Scene,
    pub remap: Option<&'a [u32]>
}

/// Reports whether any candidate occludes lane k of a packet.
pub struct OccludedLaneEpilog<'a, const K: usize, const M: usize>
{
    pub ray: &'a RayPacketGeneric<K>,
    pub k: usize,
    pub geom_ids: Simd<u32, M>,
    pub prim_ids: Simd<u32, M>,
    pub scene: &'a Scene
}

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl<const LANES: usize> UnnormalizedHit<LANES>
{
    /// Divides the denominator out of every lane. One reciprocal for the
    /// whole batch, run only when the epilog actually wants attributes.
    #[inline]
    pub fn finalize(self) -> HitAttributes<LANES> {
        let rcp_abs_den = self.abs_den.recip();
        HitAttributes {
            u: self.u * rcp_abs_den,
            v: self.v * rcp_abs_den,
            t: self.t * rcp_abs_den,
            ng: self.ng
        }
    }
}

impl<const LANES: usize> HitAttributes<LANES>
{
    #[inline]
    pub fn candidate(&self, lane: usize, geom_id: u32, prim_id: u32) -> HitCandidate {
        HitCandidate {
            lane,
            u: self.u.as_array()[lane],
            v: self.v.as_array()[lane],
            t: self.t.as_array()[lane],
            ng: self.ng.lane(lane),
            geom_id,
            prim_id
        }
    }
}

impl<const M: usize> TriangleEpilog<M> for Intersect1Epilog<'_, M>
{
    fn apply(self, valid: Mask<i32, M>, hit: UnnormalizedHit<M>) -> bool {
        let Intersect1Epilog { ray, geom_ids, prim_ids, scene, remap } = self;
        let attrs = hit.finalize();
        let flags = scene.flags();
        let mut valid = valid;

        // Search for the nearest candidate surviving mask and filter tests,
        // dropping rejected lanes from the mask as we go.
        loop {
            if !valid.any() {
                return false;
            }
            let i = select_min(valid, attrs.t);
            let geom_id = geom_ids.as_array()[i];
            let geometry = scene.get(geom_id);

            if flags.contains(KernelFlags::RayMask) && (geometry.mask & ray.mask) == 0 {
                valid.set(i, false);
                continue;
            }

            if flags.contains(KernelFlags::IntersectionFilter) {
                if let Some(filter) = &geometry.intersection_filter {
                    let candidate = attrs.candidate(i, geom_id, prim_ids.as_array()[i]);
                    if !filter(ray, &candidate) {
                        log::trace!(
                            "intersection filter rejected geom {} prim {}",
                            candidate.geom_id, candidate.prim_id
                        );
                        valid.set(i, false);
                        continue;
                    }
                }
            }

            ray.u = attrs.u.as_array()[i];
            ray.v = attrs.v.as_array()[i];
            ray.tfar = attrs.t.as_array()[i];
            ray.ng = attrs.ng.lane(i);
            ray.geom_id = remap.map_or(geom_id, |remap| remap[geom_id as usize]);
            ray.prim_id = prim_ids.as_array()[i];
            return true;
        }
    }
}

impl<const M: usize> TriangleEpilog<M> for Occluded1Epilog<'_, M>
{
    fn apply(self, valid: Mask<i32, M>, hit: UnnormalizedHit<M>) -> bool {
        let Occluded1Epilog { ray, geom_ids, prim_ids, scene } = self;
        let flags = scene.flags();
        let mut valid = valid;

        // Any surviving candidate occludes; attributes are only materialized
        // if an occlusion filter actually has to look at them.
        let mut hit = Some(hit);
        let mut attrs = None;
        loop {
            if !valid.any() {
                return false;
            }
            let i = first_valid(valid);
            let geom_id = geom_ids.as_array()[i];
            let geometry = scene.get(geom_id);

            if flags.contains(KernelFlags::RayMask) && (geometry.mask & ray.mask) == 0 {
                valid.set(i, false);
                continue;
            }

            if flags.contains(KernelFlags::IntersectionFilter) {
                if let Some(filter) = &geometry.occlusion_filter {
                    let attrs: &HitAttributes<M> =
                        attrs.get_or_insert_with(|| hit.take().unwrap().finalize());
                    let candidate = attrs.candidate(i, geom_id, prim_ids.as_array()[i]);
                    if !filter(ray, &candidate) {
                        log::trace!(
                            "occlusion filter rejected geom {} prim {}",
                            candidate.geom_id, candidate.prim_id
                        );
                        valid.set(i, false);
                        continue;
                    }
                }
            }

            return true;
        }
    }
}

impl<const K: usize> PacketEpilog<K> for IntersectKEpilog<'_, K>
{
    fn apply(self, valid: Mask<i32, K>, hit: UnnormalizedHit<K>) -> Mask<i32, K> {
        let IntersectKEpilog { ray, geom_id, prim_id, scene, remap } = self;
        let attrs = hit.finalize();
        let flags = scene.flags();
        let geometry = scene.get(geom_id);
        let mut accept = valid;

        if flags.contains(KernelFlags::RayMask) {
            accept &= (ray.mask & Simd::splat(geometry.mask)).simd_ne(Simd::splat(0));
            if !accept.any() {
                return accept;
            }
        }

        if flags.contains(KernelFlags::IntersectionFilter) {
            if let Some(filter) = &geometry.intersection_filter {
                for k in 0..K {
                    if !accept.test(k) {
                        continue;
                    }
                    let candidate = attrs.candidate(k, geom_id, prim_id);
                    let lane_ray = ray.ray(k);
                    if !filter(&lane_ray, &candidate) {
                        accept.set(k, false);
                    }
                }
            }
        }

        let commit_geom_id = remap.map_or(geom_id, |remap| remap[geom_id as usize]);
        ray.u = accept.select(attrs.u, ray.u);
        ray.v = accept.select(attrs.v, ray.v);
        ray.tfar = accept.select(attrs.t, ray.tfar);
        ray.ng.x = accept.select(attrs.ng.x, ray.ng.x);
        ray.ng.y = accept.select(attrs.ng.y, ray.ng.y);
        ray.ng.z = accept.select(attrs.ng.z, ray.ng.z);
        ray.geom_id = accept.select(Simd::splat(commit_geom_id), ray.geom_id);
        ray.prim_id = accept.select(Simd::splat(prim_id), ray.prim_id);
        accept
    }
}

impl<const K: usize> PacketEpilog<K> for OccludedKEpilog<'_, K>
{
    fn apply(self, valid: Mask<i32, K>, hit: UnnormalizedHit<K>) -> Mask<i32, K> {
        let OccludedKEpilog { ray, geom_id, prim_id, scene } = self;
        let flags = scene.flags();
        let geometry = scene.get(geom_id);
        let mut accept = valid;

        if flags.contains(KernelFlags::RayMask) {
            accept &= (ray.mask & Simd::splat(geometry.mask)).simd_ne(Simd::splat(0));
            if !accept.any() {
                return accept;
            }
        }

        if flags.contains(KernelFlags::IntersectionFilter) {
            if let Some(filter) = &geometry.occlusion_filter {
                let attrs = hit.finalize();
                for k in 0..K {
                    if !accept.test(k) {
                        continue;
                    }
                    let candidate = attrs.candidate(k, geom_id, prim_id);
                    let lane_ray = ray.ray(k);
                    if !filter(&lane_ray, &candidate) {
                        accept.set(k, false);
                    }
                }
            }
        }

        accept
    }
}

impl<const K: usize, const M: usize> TriangleEpilog<M> for IntersectLaneEpilog<'_, K, M>
{
    fn apply(self, valid: Mask<i32, M>, hit: UnnormalizedHit<M>) -> bool {
        let IntersectLaneEpilog { ray, k, geom_ids, prim_ids, scene, remap } = self;
        let attrs = hit.finalize();
        let flags = scene.flags();
        let ray_mask = ray.mask.as_array()[k];
        let mut valid = valid;

        loop {
            if !valid.any() {
                return false;
            }
            let i = select_min(valid, attrs.t);
            let geom_id = geom_ids.as_array()[i];
            let geometry = scene.get(geom_id);

            if flags.contains(KernelFlags::RayMask) && (geometry.mask & ray_mask) == 0 {
                valid.set(i, false);
                continue;
            }

            if flags.contains(KernelFlags::IntersectionFilter) {
                if let Some(filter) = &geometry.intersection_filter {
                    let candidate = attrs.candidate(i, geom_id, prim_ids.as_array()[i]);
                    let lane_ray = ray.ray(k);
                    if !filter(&lane_ray, &candidate) {
                        valid.set(i, false);
                        continue;
                    }
                }
            }

            let geom_id = remap.map_or(geom_id, |remap| remap[geom_id as usize]);
            ray.commit_lane(
                k,
                attrs.u.as_array()[i],
                attrs.v.as_array()[i],
                attrs.t.as_array()[i],
                attrs.ng.lane(i),
                geom_id,
                prim_ids.as_array()[i]
            );
            return true;
        }
    }
}

impl<const K: usize, const M: usize> TriangleEpilog<M> for OccludedLaneEpilog<'_, K, M>
{
    fn apply(self, valid: Mask<i32, M>, hit: UnnormalizedHit<M>) -> bool {
        let OccludedLaneEpilog { ray, k, geom_ids, prim_ids, scene } = self;
        let flags = scene.flags();
        let ray_mask = ray.mask.as_array()[k];
        let mut valid = valid;

        let mut hit = Some(hit);
        let mut attrs = None;
        loop {
            if !valid.any() {
                return false;
            }
            let i = first_valid(valid);
            let geom_id = geom_ids.as_array()[i];
            let geometry = scene.get(geom_id);

            if flags.contains(KernelFlags::RayMask) && (geometry.mask & ray_mask) == 0 {
                valid.set(i, false);
                continue;
            }

            if flags.contains(KernelFlags::IntersectionFilter) {
                if let Some(filter) = &geometry.occlusion_filter {
                    let attrs: &HitAttributes<M> =
                        attrs.get_or_insert_with(|| hit.take().unwrap().finalize());
                    let candidate = attrs.candidate(i, geom_id, prim_ids.as_array()[i]);
                    let lane_ray = ray.ray(k);
                    if !filter(&lane_ray, &candidate) {
                        valid.set(i, false);
                        continue;
                    }
                }
            }

            return true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_divides_by_the_denominator() {
        let hit = UnnormalizedHit::<4> {
            u: Simd::splat(1.0),
            v: Simd::splat(2.0),
            t: Simd::splat(4.0),
            abs_den: Simd::splat(4.0),
            ng: SIMDVec3Generic::splat(glam::Vec3::Z)
        };
        let attrs = hit.finalize();
        assert_eq!(attrs.u.as_array()[0], 0.25);
        assert_eq!(attrs.v.as_array()[0], 0.5);
        assert_eq!(attrs.t.as_array()[0], 1.0);
    }

    #[test]
    fn candidate_extracts_one_lane() {
        let attrs = HitAttributes::<4> {
            u: Simd::from_array([0.0, 0.1, 0.2, 0.3]),
            v: Simd::from_array([0.4, 0.5, 0.6, 0.7]),
            t: Simd::from_array([1.0, 2.0, 3.0, 4.0]),
            ng: SIMDVec3Generic::splat(glam::Vec3::Y)
        };
        let candidate = attrs.candidate(2, 5, 6);
        assert_eq!(candidate.lane, 2);
        assert_eq!(candidate.u, 0.2);
        assert_eq!(candidate.v, 0.6);
        assert_eq!(candidate.t, 3.0);
        assert_eq!(candidate.ng, glam::Vec3::Y);
        assert_eq!((candidate.geom_id, candidate.prim_id), (5, 6));
    }
}
