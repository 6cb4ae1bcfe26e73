pub mod moeller;
pub use moeller::*;
pub mod epilog;
pub use epilog::*;
pub mod intersector;
pub use intersector::*;
