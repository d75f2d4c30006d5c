use nalgebra::{Isometry3, Point3};

use super::Framed;

/// The sensor frame of the sweep being processed.
#[derive(Debug)]
pub struct Scan;

/// The sensor frame of the sweep before it.
#[derive(Debug)]
pub struct Previous;

/// The sensor frame of the first sweep.
#[derive(Debug)]
pub struct World;

pub type WorldPoint<T> = Framed<Point3<T>, World>;

pub type ScanToWorld<T> = Framed<Isometry3<T>, fn(Scan) -> World>;
