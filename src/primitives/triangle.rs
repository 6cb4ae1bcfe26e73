use glam::*;
use std::simd::prelude::*;

use super::{SIMDVec3Generic, INVALID_ID};

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// One triangle as handed over by the acceleration-structure builder.
#[derive(Clone, Copy, Debug)]
pub struct TriangleDesc {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub geom_id: u32,
    pub prim_id: u32
}

/// One motion-blurred triangle: base vertices plus per-vertex velocities.
/// The position of a vertex at time s in [0, 1] is `v + s * dv`.
#[derive(Clone, Copy, Debug)]
pub struct MotionTriangleDesc {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub dv0: Vec3,
    pub dv1: Vec3,
    pub dv2: Vec3,
    pub geom_id: u32,
    pub prim_id: u32
}

/// A structure-of-lanes batch of up to M static triangles in canonical form:
/// `v0`, `e1 = v0 - v1`, `e2 = v2 - v0` and the geometric normal
/// `ng = e1 x e2`.
///
/// Unused lanes are degenerate (all zero), so their plane normal is zero and
/// no ray can ever pass their denominator test; their identifiers are
/// `INVALID_ID`.
#[derive(Clone, Copy, Debug)]
pub struct TriangleBatchGeneric<const M: usize>
{
    pub v0: SIMDVec3Generic<M>,
    pub e1: SIMDVec3Generic<M>,
    pub e2: SIMDVec3Generic<M>,
    pub ng: SIMDVec3Generic<M>,
    pub geom_ids: Simd<u32, M>,
    pub prim_ids: Simd<u32, M>,
    len: usize
}

pub type TriangleBatch4 = TriangleBatchGeneric<4>;
pub type TriangleBatch8 = TriangleBatchGeneric<8>;

/// A structure-of-lanes batch of up to M motion-blurred triangles. Kept in
/// vertex form; the canonical edges and normal only exist after the vertices
/// have been interpolated to a ray's time.
#[derive(Clone, Copy, Debug)]
pub struct MotionTriangleBatchGeneric<const M: usize>
{
    pub v0: SIMDVec3Generic<M>,
    pub v1: SIMDVec3Generic<M>,
    pub v2: SIMDVec3Generic<M>,
    pub dv0: SIMDVec3Generic<M>,
    pub dv1: SIMDVec3Generic<M>,
    pub dv2: SIMDVec3Generic<M>,
    pub geom_ids: Simd<u32, M>,
    pub prim_ids: Simd<u32, M>,
    len: usize
}

pub type MotionTriangleBatch4 = MotionTriangleBatchGeneric<4>;
pub type MotionTriangleBatch8 = MotionTriangleBatchGeneric<8>;

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl<const M: usize> TriangleBatchGeneric<M>
{
    pub fn from_triangles(triangles: &[TriangleDesc]) -> Self {
        assert!(triangles.len() <= M, "Triangle batch overflow.");

        let mut v0 = [Vec3::ZERO; M];
        let mut v1 = [Vec3::ZERO; M];
        let mut v2 = [Vec3::ZERO; M];
        let mut geom_ids = [INVALID_ID; M];
        let mut prim_ids = [INVALID_ID; M];
        for (i, triangle) in triangles.iter().enumerate() {
            v0[i] = triangle.v0;
            v1[i] = triangle.v1;
            v2[i] = triangle.v2;
            geom_ids[i] = triangle.geom_id;
            prim_ids[i] = triangle.prim_id;
        }

        let v0 = SIMDVec3Generic::from_lanes(v0);
        let e1 = v0 - SIMDVec3Generic::from_lanes(v1);
        let e2 = SIMDVec3Generic::from_lanes(v2) - v0;
        let ng = e1.cross(&e2);

        TriangleBatchGeneric {
            v0,
            e1,
            e2,
            ng,
            geom_ids: Simd::from_array(geom_ids),
            prim_ids: Simd::from_array(prim_ids),
            len: triangles.len()
        }
    }

    /// Number of triangles actually stored; lanes past it are padding.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn valid(&self, i: usize) -> bool {
        i < self.len
    }

    /// Per-lane mask over the triangles actually stored.
    #[inline]
    pub fn active_mask(&self) -> Mask<i32, M> {
        Mask::from_array(std::array::from_fn(|i| i < self.len))
    }
}

impl<const M: usize> MotionTriangleBatchGeneric<M>
{
    pub fn from_triangles(triangles: &[MotionTriangleDesc]) -> Self {
        assert!(triangles.len() <= M, "Triangle batch overflow.");

        let mut v0 = [Vec3::ZERO; M];
        let mut v1 = [Vec3::ZERO; M];
        let mut v2 = [Vec3::ZERO; M];
        let mut dv0 = [Vec3::ZERO; M];
        let mut dv1 = [Vec3::ZERO; M];
        let mut dv2 = [Vec3::ZERO; M];
        let mut geom_ids = [INVALID_ID; M];
        let mut prim_ids = [INVALID_ID; M];
        for (i, triangle) in triangles.iter().enumerate() {
            v0[i] = triangle.v0;
            v1[i] = triangle.v1;
            v2[i] = triangle.v2;
            dv0[i] = triangle.dv0;
            dv1[i] = triangle.dv1;
            dv2[i] = triangle.dv2;
            geom_ids[i] = triangle.geom_id;
            prim_ids[i] = triangle.prim_id;
        }

        MotionTriangleBatchGeneric {
            v0: SIMDVec3Generic::from_lanes(v0),
            v1: SIMDVec3Generic::from_lanes(v1),
            v2: SIMDVec3Generic::from_lanes(v2),
            dv0: SIMDVec3Generic::from_lanes(dv0),
            dv1: SIMDVec3Generic::from_lanes(dv1),
            dv2: SIMDVec3Generic::from_lanes(dv2),
            geom_ids: Simd::from_array(geom_ids),
            prim_ids: Simd::from_array(prim_ids),
            len: triangles.len()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn valid(&self, i: usize) -> bool {
        i < self.len
    }

    #[inline]
    pub fn active_mask(&self) -> Mask<i32, M> {
        Mask::from_array(std::array::from_fn(|i| i < self.len))
    }

    /// Vertex positions of every lane interpolated to the given per-lane time.
    #[inline]
    pub fn interpolate(
        &self, time: Simd<f32, M>
    ) -> (SIMDVec3Generic<M>, SIMDVec3Generic<M>, SIMDVec3Generic<M>) {
        (
            self.v0 + self.dv0 * time,
            self.v1 + self.dv1 * time,
            self.v2 + self.dv2 * time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle(geom_id: u32, prim_id: u32) -> TriangleDesc {
        TriangleDesc {
            v0: Vec3::new(0.0, 0.0, 0.0),
            v1: Vec3::new(1.0, 0.0, 0.0),
            v2: Vec3::new(0.0, 1.0, 0.0),
            geom_id,
            prim_id
        }
    }

    #[test]
    fn canonical_form_matches_definition() {
        let batch = TriangleBatchGeneric::<4>::from_triangles(&[unit_triangle(0, 0)]);

        assert_eq!(batch.e1.lane(0), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(batch.e2.lane(0), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(batch.ng.lane(0), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn padding_lanes_are_degenerate() {
        let batch = TriangleBatchGeneric::<4>::from_triangles(&[unit_triangle(3, 9)]);

        assert_eq!(batch.len(), 1);
        assert!(batch.valid(0));
        assert!(!batch.valid(1));
        assert_eq!(batch.active_mask().to_array(), [true, false, false, false]);
        for i in 1..4 {
            assert_eq!(batch.ng.lane(i), Vec3::ZERO);
            assert_eq!(batch.geom_ids.as_array()[i], INVALID_ID);
        }
    }

    #[test]
    fn interpolation_at_zero_is_the_base_pose() {
        let desc = MotionTriangleDesc {
            v0: Vec3::new(0.0, 0.0, 0.0),
            v1: Vec3::new(1.0, 0.0, 0.0),
            v2: Vec3::new(0.0, 1.0, 0.0),
            dv0: Vec3::new(0.0, 0.0, 2.0),
            dv1: Vec3::new(0.0, 0.0, 2.0),
            dv2: Vec3::new(0.0, 0.0, 2.0),
            geom_id: 0,
            prim_id: 0
        };
        let batch = MotionTriangleBatchGeneric::<4>::from_triangles(&[desc]);

        let (v0, v1, v2) = batch.interpolate(Simd::splat(0.0));
        assert_eq!(v0.lane(0), desc.v0);
        assert_eq!(v1.lane(0), desc.v1);
        assert_eq!(v2.lane(0), desc.v2);

        let (v0, _, _) = batch.interpolate(Simd::splat(0.5));
        assert_eq!(v0.lane(0), Vec3::new(0.0, 0.0, 1.0));
    }
}
