//! Proptest strategies for generating lists.

use std::fmt::Debug;

use proptest::collection::SizeRange;
use proptest::prelude::*;

use crate::TreeList;

/// Strategy producing a [`TreeList`] with elements drawn from `element`.
/// The fan-out is chosen by the caller, so tests can use a small `LIMIT`
/// to exercise the balancing machinery with few elements.
pub fn tree_list<S, const LIMIT: usize>(
    element: S,
    len: impl Into<SizeRange>,
) -> impl Strategy<Value = TreeList<S::Value, LIMIT>>
where
    S: Strategy,
    S::Value: Clone + Debug,
{
    proptest::collection::vec(element, len).prop_map(|values| values.into_iter().collect())
}

impl<T> Arbitrary for TreeList<T>
where
    T: Arbitrary + Clone + Debug + 'static,
    T::Strategy: 'static,
{
    type Parameters = ();
    type Strategy = BoxedStrategy<TreeList<T>>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        tree_list(any::<T>(), 0..512).boxed()
    }
}
