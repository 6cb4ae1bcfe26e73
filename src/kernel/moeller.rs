/*!
This kernel implements a modified version of the Moeller-Trumbore ray-triangle
intersection ("Fast, Minimum Storage Ray-Triangle Intersection"). The
calculations are factored so that the cross product e1 x e2 can be
precalculated per batch, similar to the fastest variant found by "Optimizing
Ray-Triangle Intersection via Automated Search".

The sign of the denominator is folded into the edge and depth coordinates with
an XOR on the IEEE sign bit, so both winding directions share a single set of
comparisons and no per-lane branch is needed.
*/

use glam::*;
use std::simd::prelude::*;

use crate::{sign_mask, xor_sign, KernelFlags, SIMDVec3Generic};

use super::{PacketEpilog, TriangleEpilog, UnnormalizedHit};

/// Tests one ray against M triangle lanes in canonical form and forwards the
/// surviving lanes to the epilog. Returns whether any lane was accepted.
#[inline]
pub fn intersect1<const M: usize, E: TriangleEpilog<M>>(
    org: Vec3, dir: Vec3, tnear: f32, tfar: f32,
    v0: &SIMDVec3Generic<M>,
    e1: &SIMDVec3Generic<M>,
    e2: &SIMDVec3Generic<M>,
    ng: &SIMDVec3Generic<M>,
    active: Mask<i32, M>,
    flags: KernelFlags,
    epilog: E
) -> bool
{
    // Calculate denominator
    let o = SIMDVec3Generic::splat(org);
    let d = SIMDVec3Generic::splat(dir);
    let c = *v0 - o;
    let r = d.cross(&c);
    let den = ng.dot(&d);
    let abs_den = den.abs();
    let sgn_den = sign_mask(den);

    // Perform edge tests
    let u = xor_sign(r.dot(e2), sgn_den);
    let v = xor_sign(r.dot(e1), sgn_den);

    let zero = Simd::splat(0.0);
    let mut valid = active
        & u.simd_ge(zero)
        & v.simd_ge(zero)
        & (u + v).simd_le(abs_den);
    valid &= if flags.contains(KernelFlags::BackfaceCulling) {
        den.simd_gt(zero)
    } else {
        den.simd_ne(zero)
    };
    if !valid.any() {
        return false;
    }

    // Perform depth test
    let t = xor_sign(ng.dot(&c), sgn_den);
    valid &= t.simd_gt(abs_den * Simd::splat(tnear)) & t.simd_lt(abs_den * Simd::splat(tfar));
    if !valid.any() {
        return false;
    }

    epilog.apply(valid, UnnormalizedHit {
        u,
        v,
        t,
        abs_den,
        ng: *ng
    })
}

/// `intersect1` on a batch still in vertex form; reduces to canonical form
/// first.
#[inline]
pub fn intersect1_verts<const M: usize, E: TriangleEpilog<M>>(
    org: Vec3, dir: Vec3, tnear: f32, tfar: f32,
    v0: &SIMDVec3Generic<M>,
    v1: &SIMDVec3Generic<M>,
    v2: &SIMDVec3Generic<M>,
    active: Mask<i32, M>,
    flags: KernelFlags,
    epilog: E
) -> bool
{
    let e1 = *v0 - *v1;
    let e2 = *v2 - *v0;
    let ng = e1.cross(&e2);
    intersect1(org, dir, tnear, tfar, v0, &e1, &e2, &ng, active, flags, epilog)
}

/// Tests K ray lanes against one broadcast triangle and forwards the
/// surviving lanes to the epilog. Returns the lanes the epilog accepted.
///
/// The edge coordinates are rejected one at a time; rays of a packet tend to
/// fail the same edge, so each early-out retires the whole packet at once.
#[inline]
pub fn intersect_k<const K: usize, E: PacketEpilog<K>>(
    valid0: Mask<i32, K>,
    org: &SIMDVec3Generic<K>, dir: &SIMDVec3Generic<K>,
    tnear: Simd<f32, K>, tfar: Simd<f32, K>,
    v0: &SIMDVec3Generic<K>,
    e1: &SIMDVec3Generic<K>,
    e2: &SIMDVec3Generic<K>,
    ng: &SIMDVec3Generic<K>,
    flags: KernelFlags,
    epilog: E
) -> Mask<i32, K>
{
    // Calculate denominator
    let c = *v0 - *org;
    let r = dir.cross(&c);
    let den = ng.dot(dir);
    let abs_den = den.abs();
    let sgn_den = sign_mask(den);
    let zero = Simd::splat(0.0);

    // Test against edge p2 p0
    let u = xor_sign(r.dot(e2), sgn_den);
    let mut valid = valid0 & u.simd_ge(zero);
    if !valid.any() {
        return Mask::splat(false);
    }

    // Test against edge p0 p1
    let v = xor_sign(r.dot(e1), sgn_den);
    valid &= v.simd_ge(zero);
    if !valid.any() {
        return Mask::splat(false);
    }

    // Test against edge p1 p2
    let w = abs_den - u - v;
    valid &= w.simd_ge(zero);
    if !valid.any() {
        return Mask::splat(false);
    }

    // Perform depth test
    let t = xor_sign(ng.dot(&c), sgn_den);
    valid &= t.simd_gt(abs_den * tnear) & t.simd_lt(abs_den * tfar);
    if !valid.any() {
        return Mask::splat(false);
    }

    // Perform backface culling
    valid &= if flags.contains(KernelFlags::BackfaceCulling) {
        den.simd_gt(zero)
    } else {
        den.simd_ne(zero)
    };
    if !valid.any() {
        return Mask::splat(false);
    }

    epilog.apply(valid, UnnormalizedHit {
        u,
        v,
        t,
        abs_den,
        ng: *ng
    })
}

/// `intersect_k` on a triangle still in vertex form.
#[inline]
pub fn intersect_k_verts<const K: usize, E: PacketEpilog<K>>(
    valid0: Mask<i32, K>,
    org: &SIMDVec3Generic<K>, dir: &SIMDVec3Generic<K>,
    tnear: Simd<f32, K>, tfar: Simd<f32, K>,
    v0: &SIMDVec3Generic<K>,
    v1: &SIMDVec3Generic<K>,
    v2: &SIMDVec3Generic<K>,
    flags: KernelFlags,
    epilog: E
) -> Mask<i32, K>
{
    let e1 = *v0 - *v1;
    let e2 = *v2 - *v0;
    let ng = e1.cross(&e2);
    intersect_k(valid0, org, dir, tnear, tfar, v0, &e1, &e2, &ng, flags, epilog)
}
