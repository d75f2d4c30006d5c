pub mod loam;

pub use loam::Loam;
