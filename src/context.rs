/// Borrowed state paired with the read-only inputs an operation on it needs.
///
/// Algorithms are written as inherent impls on `Contextual<&mut State, (inputs..)>`,
/// so reusable scratch and per-call inputs stay in separate fields and both can be
/// destructured at once.
pub(crate) struct Contextual<T, C> {
    pub inner: T,
    pub context: C,
}

pub(crate) trait WithContext<C>: Sized {
    fn mut_with_context(&mut self, context: C) -> Contextual<&mut Self, C>;
}

impl<T, C> WithContext<C> for T {
    #[inline]
    fn mut_with_context(&mut self, context: C) -> Contextual<&mut Self, C> {
        Contextual {
            inner: self,
            context,
        }
    }
}
