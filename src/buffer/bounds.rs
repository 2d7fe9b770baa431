//! Bounds (min/max) computation over a column buffer's physical values.

use crate::types::{compare, Scalar};
use std::cmp::Ordering;

/// Folds `values` down to `(min, max)` using the type's total order. Empty
/// input produces "no bounds" (`None`).
pub fn bounds<'a>(values: impl Iterator<Item = Scalar<'a>>, unsigned: bool) -> Option<(Scalar<'a>, Scalar<'a>)> {
    let mut it = values;
    let first = it.next()?;
    let mut min = first;
    let mut max = first;
    for v in it {
        if compare(&v, &min, unsigned) == Ordering::Less {
            min = v;
        }
        if compare(&v, &max, unsigned) == Ordering::Greater {
            max = v;
        }
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_iterator_has_no_bounds() {
        assert!(bounds(std::iter::empty::<Scalar>(), false).is_none());
    }

    #[test]
    fn unsigned_bounds_reinterpret_signed_storage() {
        let values = vec![Scalar::I32(-1), Scalar::I32(5)];
        let (min, max) = bounds(values.into_iter(), true).unwrap();
        // unsigned: -1 is 0xFFFFFFFF, the largest u32, so it becomes the max.
        assert!(matches!(min, Scalar::I32(5)));
        assert!(matches!(max, Scalar::I32(-1)));
    }
}
