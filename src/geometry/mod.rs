pub mod affine;

pub use affine::*;
