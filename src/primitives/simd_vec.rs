use glam::*;
use std::simd::prelude::*;

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// A 3-vector with one scalar slot per SIMD lane.
#[derive(Clone, Copy, Debug)]
pub struct SIMDVec3Generic<const LANES: usize>
{
    pub x: Simd<f32, LANES>,
    pub y: Simd<f32, LANES>,
    pub z: Simd<f32, LANES>
}

pub type SIMDVec3 = SIMDVec3Generic<4>;

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl<const LANES: usize> SIMDVec3Generic<LANES>
{
    #[inline]
    pub fn new(x: Simd<f32, LANES>, y: Simd<f32, LANES>, z: Simd<f32, LANES>) -> Self {
        SIMDVec3Generic {
            x,
            y,
            z
        }
    }

    /// Broadcasts one scalar vector into every lane.
    #[inline]
    pub fn splat(v: Vec3) -> Self {
        SIMDVec3Generic {
            x: Simd::splat(v.x),
            y: Simd::splat(v.y),
            z: Simd::splat(v.z)
        }
    }

    #[inline]
    pub fn from_lanes(lanes: [Vec3; LANES]) -> Self {
        SIMDVec3Generic {
            x: Simd::from_array(lanes.map(|v| v.x)),
            y: Simd::from_array(lanes.map(|v| v.y)),
            z: Simd::from_array(lanes.map(|v| v.z))
        }
    }

    #[inline]
    pub fn lane(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.x.as_array()[i],
            self.y.as_array()[i],
            self.z.as_array()[i]
        )
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> Simd<f32, LANES> {
        (self.x * other.x) + (self.y * other.y) + (self.z * other.z)
    }

    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        SIMDVec3Generic {
            x: (self.y * other.z) - (other.y * self.z),
            y: (self.z * other.x) - (other.z * self.x),
            z: (self.x * other.y) - (other.x * self.y)
        }
    }
}

impl<const LANES: usize> Default for SIMDVec3Generic<LANES>
{
    fn default() -> Self {
        SIMDVec3Generic {
            x: Simd::splat(0.0),
            y: Simd::splat(0.0),
            z: Simd::splat(0.0)
        }
    }
}

impl<const LANES: usize> std::ops::Add for SIMDVec3Generic<LANES>
{
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        SIMDVec3Generic {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z
        }
    }
}

impl<const LANES: usize> std::ops::Sub for SIMDVec3Generic<LANES>
{
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        SIMDVec3Generic {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z
        }
    }
}

impl<const LANES: usize> std::ops::Mul<Simd<f32, LANES>> for SIMDVec3Generic<LANES>
{
    type Output = Self;

    #[inline]
    fn mul(self, scale: Simd<f32, LANES>) -> Self {
        SIMDVec3Generic {
            x: self.x * scale,
            y: self.y * scale,
            z: self.z * scale
        }
    }
}

/// Extracts the IEEE sign bit of every lane.
#[inline]
pub fn sign_mask<const LANES: usize>(v: Simd<f32, LANES>) -> Simd<u32, LANES>
{
    v.to_bits() & Simd::splat(0x8000_0000)
}

/// Flips the sign of every lane whose bit is set in `sgn`.
#[inline]
pub fn xor_sign<const LANES: usize>(v: Simd<f32, LANES>, sgn: Simd<u32, LANES>) -> Simd<f32, LANES>
{
    Simd::from_bits(v.to_bits() ^ sgn)
}

/// Index of the lane holding the smallest value among the valid lanes.
/// At least one lane must be valid.
#[inline]
pub fn select_min<const LANES: usize>(valid: Mask<i32, LANES>, t: Simd<f32, LANES>) -> usize
{
    let masked = valid.select(t, Simd::splat(f32::INFINITY));
    let min = masked.reduce_min();
    (masked.simd_eq(Simd::splat(min)) & valid).to_bitmask().trailing_zeros() as usize
}

/// Index of the first valid lane. At least one lane must be valid.
#[inline]
pub fn first_valid<const LANES: usize>(valid: Mask<i32, LANES>) -> usize
{
    valid.to_bitmask().trailing_zeros() as usize
}
