//! Axis selectors and their resolution into contiguous runs.
//!
//! A [`Selector`] is one side of a 2D index expression. Resolving it against
//! an axis length produces the selected positions in request order; the
//! slicing engine then groups consecutive positions into maximal [`Run`]s so
//! a mask with long `true` stretches costs one backing read per stretch
//! rather than one per position.

use std::ops::Range;

use crate::error::{Error, Result};

/// Selection along one axis of a matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The whole axis.
    All,
    /// A single position (the result keeps the axis, with length 1).
    Index(usize),
    /// A contiguous half-open range.
    Range(Range<usize>),
    /// Arbitrary positions, in request order; duplicates are allowed and
    /// duplicate the selected slots.
    Indices(Vec<usize>),
    /// A boolean mask over the whole axis.
    Mask(Vec<bool>),
}

impl Selector {
    /// Resolve into explicit positions against an axis of length `len`.
    ///
    /// Masks must match the axis length exactly; positions are
    /// bounds-checked. Order is preserved for [`Selector::Indices`].
    pub fn positions(&self, len: usize) -> Result<Vec<usize>> {
        match self {
            Selector::All => Ok((0..len).collect()),
            Selector::Index(i) => {
                check_bound(*i, len)?;
                Ok(vec![*i])
            }
            Selector::Range(range) => {
                if range.start > range.end {
                    return Err(Error::Index { index: range.start, len });
                }
                if range.end > len {
                    return Err(Error::Index { index: range.end, len });
                }
                Ok(range.clone().collect())
            }
            Selector::Indices(indices) => {
                for &i in indices {
                    check_bound(i, len)?;
                }
                Ok(indices.clone())
            }
            Selector::Mask(mask) => {
                if mask.len() != len {
                    return Err(Error::Shape(format!(
                        "boolean mask of length {} on axis of length {}",
                        mask.len(),
                        len,
                    )));
                }
                Ok(mask.iter().enumerate().filter(|(_, &m)| m).map(|(i, _)| i).collect())
            }
        }
    }

    /// Whether this selector trivially selects everything.
    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }
}

fn check_bound(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(Error::Index { index, len });
    }
    Ok(())
}

/// A maximal stretch of consecutive ascending positions, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First position in the run.
    pub start: usize,
    /// One past the last position.
    pub end: usize,
}

impl Run {
    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the run covers nothing.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Group positions into maximal consecutive runs, preserving order.
///
/// `[2, 3, 4, 9, 0, 1]` becomes `[2..5, 9..10, 0..2]`. A repeated position
/// starts a new run, so duplicates survive as separate reads.
pub fn runs(positions: &[usize]) -> Vec<Run> {
    let mut out = Vec::new();
    let mut iter = positions.iter().copied();
    let Some(first) = iter.next() else {
        return out;
    };
    let mut current = Run { start: first, end: first + 1 };
    for p in iter {
        if p == current.end {
            current.end += 1;
        } else {
            out.push(current);
            current = Run { start: p, end: p + 1 };
        }
    }
    out.push(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_and_range_resolve() {
        assert_eq!(Selector::All.positions(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(Selector::Range(1..3).positions(4).unwrap(), vec![1, 2]);
        assert_eq!(Selector::Range(2..2).positions(4).unwrap(), Vec::<usize>::new());
        assert!(matches!(Selector::Range(1..5).positions(4), Err(Error::Index { .. })));
    }

    #[test]
    fn index_bounds_checked() {
        assert_eq!(Selector::Index(2).positions(3).unwrap(), vec![2]);
        assert!(matches!(Selector::Index(3).positions(3), Err(Error::Index { index: 3, len: 3 })));
    }

    #[test]
    fn mask_matches_positions() {
        let mask = vec![true, false, true, true, false];
        let positions = Selector::Mask(mask.clone()).positions(5).unwrap();
        assert_eq!(positions, vec![0, 2, 3]);
        assert!(matches!(Selector::Mask(mask).positions(4), Err(Error::Shape(_))));
    }

    #[test]
    fn runs_merge_consecutive() {
        assert!(runs(&[]).is_empty());
        assert_eq!(runs(&[5]), vec![Run { start: 5, end: 6 }]);
        assert_eq!(
            runs(&[2, 3, 4, 9, 0, 1]),
            vec![
                Run { start: 2, end: 5 },
                Run { start: 9, end: 10 },
                Run { start: 0, end: 2 },
            ]
        );
    }

    #[test]
    fn runs_split_on_duplicates() {
        assert_eq!(
            runs(&[1, 1, 2]),
            vec![Run { start: 1, end: 2 }, Run { start: 1, end: 3 }]
        );
    }

    #[test]
    fn mask_and_positions_agree_on_runs() {
        let mask = vec![false, true, true, true, false, false, true, true];
        let from_mask = Selector::Mask(mask.clone()).positions(8).unwrap();
        let from_indices = Selector::Indices(from_mask.clone()).positions(8).unwrap();
        assert_eq!(runs(&from_mask), runs(&from_indices));
    }
}
