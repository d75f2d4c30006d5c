pub mod frames;
use std::{
    fmt,
    marker::PhantomData,
    ops::{Deref, Mul},
};

pub use frames::*;
use nalgebra::{Isometry3, Point3, RealField};

/// A value tagged with the coordinate frame it lives in.
///
/// Transforms are tagged with `fn(From) -> To`.
pub struct Framed<T, F> {
    inner: T,
    frame: PhantomData<F>,
}

impl<T: Clone, F> Clone for Framed<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            frame: PhantomData,
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for Framed<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Framed").field(&self.inner).finish()
    }
}

impl<T, F> Framed<T, F> {
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            frame: PhantomData,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T, F> Deref for Framed<T, F> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T, F1, F2> Framed<Isometry3<T>, fn(F1) -> F2>
where
    T: RealField,
{
    /// Chains `self` after `first`: the result maps `F0` through `F1` into `F2`.
    pub fn after<F0>(
        &self,
        first: &Framed<Isometry3<T>, fn(F0) -> F1>,
    ) -> Framed<Isometry3<T>, fn(F0) -> F2> {
        Framed::new(&self.inner * &first.inner)
    }
}

impl<'a, T, F1, F2> Mul<&'a Framed<Isometry3<T>, fn(F1) -> F2>> for Framed<Point3<T>, F1>
where
    T: RealField,
{
    type Output = Framed<Point3<T>, F2>;

    fn mul(self, transform: &'a Framed<Isometry3<T>, fn(F1) -> F2>) -> Self::Output {
        Framed::new(&transform.inner * &self.inner)
    }
}
