use bitmask_enum::bitmask;
use glam::*;

use super::Ray;

/*****************************************************************************
*                               PUB STRUCTS
******************************************************************************/

/// Feature toggles consumed by the kernels. The scene carries one set of
/// flags for all of its geometries.
#[bitmask(u32)]
pub enum KernelFlags {
    /// Reject hits where the ray approaches the triangle from behind
    /// (denominator <= 0) instead of only rejecting parallel rays.
    BackfaceCulling,
    /// Invoke per-geometry intersection/occlusion filter callbacks.
    IntersectionFilter,
    /// Test the ray mask against geometry masks.
    RayMask
}

/// The candidate hit handed to filter callbacks. `lane` is the slot the
/// candidate occupies within the current lane-parallel test.
#[derive(Clone, Copy, Debug)]
pub struct HitCandidate {
    pub lane: usize,
    pub u: f32,
    pub v: f32,
    pub t: f32,
    pub ng: Vec3,
    pub geom_id: u32,
    pub prim_id: u32
}

/// Accept/reject callback run against a candidate hit. Callbacks that need
/// to accumulate state across invocations (stochastic transparency and the
/// like) capture it with interior mutability.
pub type FilterFn = Box<dyn Fn(&Ray, &HitCandidate) -> bool + Send + Sync>;

/// Per-geometry record the kernels consult when a candidate survives the
/// geometric test.
#[derive(Default)]
pub struct Geometry {
    pub mask: u32,
    pub intersection_filter: Option<FilterFn>,
    pub occlusion_filter: Option<FilterFn>
}

/// Read-only geometry table passed into every kernel entry point, indexed by
/// geometry identifier.
pub struct Scene {
    geometries: Vec<Geometry>,
    flags: KernelFlags
}

/*****************************************************************************
*                               IMPLEMENTATIONS
******************************************************************************/

impl Geometry {
    pub fn new(mask: u32) -> Self {
        Geometry {
            mask,
            intersection_filter: None,
            occlusion_filter: None
        }
    }

    pub fn with_intersection_filter(
        mut self,
        filter: impl Fn(&Ray, &HitCandidate) -> bool + Send + Sync + 'static
    ) -> Self {
        self.intersection_filter = Some(Box::new(filter));
        self
    }

    pub fn with_occlusion_filter(
        mut self,
        filter: impl Fn(&Ray, &HitCandidate) -> bool + Send + Sync + 'static
    ) -> Self {
        self.occlusion_filter = Some(Box::new(filter));
        self
    }

    #[inline]
    pub fn has_intersection_filter(&self) -> bool {
        self.intersection_filter.is_some()
    }

    #[inline]
    pub fn has_occlusion_filter(&self) -> bool {
        self.occlusion_filter.is_some()
    }
}

impl Scene {
    pub fn new(flags: KernelFlags) -> Self {
        Scene {
            geometries: vec![],
            flags
        }
    }

    /// Adds a geometry and returns the identifier triangles refer to it by.
    pub fn attach(&mut self, geometry: Geometry) -> u32 {
        self.geometries.push(geometry);
        self.geometries.len() as u32 - 1
    }

    #[inline]
    pub fn get(&self, geom_id: u32) -> &Geometry {
        &self.geometries[geom_id as usize]
    }

    #[inline]
    pub fn flags(&self) -> KernelFlags {
        self.flags
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(KernelFlags::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_hands_out_dense_identifiers() {
        let mut scene = Scene::new(KernelFlags::RayMask);
        let a = scene.attach(Geometry::new(0b01));
        let b = scene.attach(Geometry::new(0b10));

        assert_eq!((a, b), (0, 1));
        assert_eq!(scene.get(a).mask, 0b01);
        assert_eq!(scene.get(b).mask, 0b10);
        assert!(scene.flags().contains(KernelFlags::RayMask));
        assert!(!scene.flags().contains(KernelFlags::BackfaceCulling));
    }

    #[test]
    fn filters_are_optional() {
        let geometry = Geometry::new(!0).with_occlusion_filter(|_, _| false);
        assert!(!geometry.has_intersection_filter());
        assert!(geometry.has_occlusion_filter());
    }
}
