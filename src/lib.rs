#![feature(portable_simd)]
#![allow(clippy::too_many_arguments)]

mod primitives;
pub use primitives::*;

mod scene;
pub use scene::*;

mod kernel;
pub use kernel::*;
