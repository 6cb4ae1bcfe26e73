pub mod simd_vec;
pub use simd_vec::*;
pub mod ray;
pub use ray::*;
pub mod ray_packet;
pub use ray_packet::*;
pub mod triangle;
pub use triangle::*;
