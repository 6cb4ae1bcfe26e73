use glam::*;

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// Identifier value marking an unset geometry/primitive slot.
pub const INVALID_ID: u32 = u32::MAX;

/// A single ray together with its mutable hit state.
///
/// `tfar` is both the upper bound of the valid interval and the distance of
/// the committed hit, so it only ever tightens while a ray is traced.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tnear: f32,
    pub tfar: f32,
    /// Motion-blur sample time in [0, 1].
    pub time: f32,
    /// Bitfield tested against geometry masks.
    pub mask: u32,

    pub u: f32,
    pub v: f32,
    pub ng: Vec3,
    pub geom_id: u32,
    pub prim_id: u32
}

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl Ray {
    #[inline]
    pub fn new(origin: &Vec3, direction: &Vec3, tnear: f32, tfar: f32) -> Self {
        Ray {
            origin: *origin,
            direction: *direction,
            tnear,
            tfar,
            time: 0.0,
            mask: !0,
            u: 0.0,
            v: 0.0,
            ng: Vec3::ZERO,
            geom_id: INVALID_ID,
            prim_id: INVALID_ID
        }
    }

    #[inline]
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    #[inline]
    pub fn with_mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }

    #[inline]
    pub fn hit(&self) -> bool {
        self.geom_id != INVALID_ID
    }
}

impl Default for Ray {
    fn default() -> Self {
        Ray::new(&Vec3::ZERO, &Vec3::ZERO, 0.0, f32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ray_carries_no_hit() {
        let ray = Ray::new(&Vec3::ZERO, &Vec3::Z, 0.0, f32::MAX);
        assert!(!ray.hit());
        assert_eq!(ray.mask, !0);
        assert_eq!(ray.time, 0.0);
    }
}
