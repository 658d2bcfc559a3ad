//! In-memory compressed sparse matrices.
//!
//! Row-oriented (CSR) and column-oriented (CSC) matrices share one
//! representation, [`CsMatrix`], parameterized by a [`SparseFormat`] that
//! decides which axis is the *primary* (compressed) one. All axis-dependent
//! logic goes through the format's helpers, so the two orientations are two
//! configurations of the same code rather than two implementations.

use crate::element::Element;
use crate::error::{Error, Result};
use crate::select::Selector;
use crate::store::EncodingKind;

/// Orientation of a compressed sparse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    /// Row-oriented: `indptr` compresses rows, `indices` hold columns.
    Csr,
    /// Column-oriented: `indptr` compresses columns, `indices` hold rows.
    Csc,
}

impl SparseFormat {
    /// Length of the compressed axis.
    pub fn primary_dim(self, shape: (usize, usize)) -> usize {
        match self {
            SparseFormat::Csr => shape.0,
            SparseFormat::Csc => shape.1,
        }
    }

    /// Length of the other axis (the one `indices` points into).
    pub fn secondary_dim(self, shape: (usize, usize)) -> usize {
        match self {
            SparseFormat::Csr => shape.1,
            SparseFormat::Csc => shape.0,
        }
    }

    /// Rebuild a `(rows, cols)` shape from axis-role lengths.
    pub fn shape_from(self, primary: usize, secondary: usize) -> (usize, usize) {
        match self {
            SparseFormat::Csr => (primary, secondary),
            SparseFormat::Csc => (secondary, primary),
        }
    }

    /// The encoding tag kind for this orientation.
    pub fn encoding_kind(self) -> EncodingKind {
        match self {
            SparseFormat::Csr => EncodingKind::CsrMatrix,
            SparseFormat::Csc => EncodingKind::CscMatrix,
        }
    }

    /// The orientation named by a tag kind, if it is a compressed sparse one.
    pub fn from_kind(kind: EncodingKind) -> Option<SparseFormat> {
        match kind {
            EncodingKind::CsrMatrix => Some(SparseFormat::Csr),
            EncodingKind::CscMatrix => Some(SparseFormat::Csc),
            EncodingKind::Array => None,
        }
    }

    /// Short scipy-style name, `"csr"` or `"csc"`.
    pub fn name(self) -> &'static str {
        match self {
            SparseFormat::Csr => "csr",
            SparseFormat::Csc => "csc",
        }
    }
}

/// An in-memory compressed sparse matrix.
///
/// `indptr[i]..indptr[i + 1]` bounds the segment of `indices`/`data`
/// belonging to primary slot `i`. Matrices built by this crate keep the
/// indices within each slot sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct CsMatrix<T> {
    /// Orientation.
    pub format: SparseFormat,
    /// Dimensions as `(rows, cols)`.
    pub shape: (usize, usize),
    /// Cumulative offsets, length `primary_dim + 1`.
    pub indptr: Vec<u64>,
    /// Secondary-axis index of each stored element.
    pub indices: Vec<u64>,
    /// Stored element values, parallel to `indices`.
    pub data: Vec<T>,
}

/// A coordinate-format sparse matrix.
///
/// Not a supported backing encoding; it exists so code taking "some sparse
/// matrix" can name the kind it rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct CooMatrix<T> {
    /// Dimensions as `(rows, cols)`.
    pub shape: (usize, usize),
    /// Row of each stored element.
    pub row: Vec<u64>,
    /// Column of each stored element.
    pub col: Vec<u64>,
    /// Stored element values.
    pub data: Vec<T>,
}

impl<T: Element> CsMatrix<T> {
    /// Build a matrix from its parts, validating the layout invariants.
    pub fn from_parts(
        format: SparseFormat,
        shape: (usize, usize),
        indptr: Vec<u64>,
        indices: Vec<u64>,
        data: Vec<T>,
    ) -> Result<CsMatrix<T>> {
        let primary = format.primary_dim(shape);
        let secondary = format.secondary_dim(shape);
        if indptr.len() != primary + 1 {
            return Err(Error::Shape(format!(
                "indptr length {} does not match primary dimension {} + 1",
                indptr.len(),
                primary,
            )));
        }
        if indices.len() != data.len() {
            return Err(Error::Shape(format!(
                "indices length {} != data length {}",
                indices.len(),
                data.len(),
            )));
        }
        if indptr[0] != 0 {
            return Err(Error::Shape("indptr must start at 0".to_string()));
        }
        if *indptr.last().expect("indptr is non-empty") != indices.len() as u64 {
            return Err(Error::Shape(format!(
                "final indptr entry {} != number of stored elements {}",
                indptr.last().expect("indptr is non-empty"),
                indices.len(),
            )));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::Shape("indptr must be non-decreasing".to_string()));
        }
        if indices.iter().any(|&i| i as usize >= secondary) {
            return Err(Error::Shape(format!(
                "index out of range for secondary dimension {}",
                secondary,
            )));
        }
        Ok(CsMatrix { format, shape, indptr, indices, data })
    }

    /// An empty matrix of the given shape.
    pub fn zeros(format: SparseFormat, shape: (usize, usize)) -> CsMatrix<T> {
        CsMatrix {
            format,
            shape,
            indptr: vec![0; format.primary_dim(shape) + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Compress a row-major dense buffer, skipping zero entries.
    pub fn from_dense(
        format: SparseFormat,
        shape: (usize, usize),
        dense: &[T],
    ) -> Result<CsMatrix<T>> {
        let (rows, cols) = shape;
        if dense.len() != rows * cols {
            return Err(Error::Shape(format!(
                "dense buffer of {} elements for shape {}x{}",
                dense.len(),
                rows,
                cols,
            )));
        }
        let primary = format.primary_dim(shape);
        let secondary = format.secondary_dim(shape);
        let mut indptr = Vec::with_capacity(primary + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for p in 0..primary {
            for s in 0..secondary {
                let (r, c) = match format {
                    SparseFormat::Csr => (p, s),
                    SparseFormat::Csc => (s, p),
                };
                let value = dense[r * cols + c];
                if value != T::default() {
                    indices.push(s as u64);
                    data.push(value);
                }
            }
            indptr.push(indices.len() as u64);
        }
        Ok(CsMatrix { format, shape, indptr, indices, data })
    }

    /// Number of stored elements.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Dimensions as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Expand into a row-major dense buffer.
    pub fn to_dense(&self) -> Vec<T> {
        let (rows, cols) = self.shape;
        let mut dense = vec![T::default(); rows * cols];
        let primary = self.format.primary_dim(self.shape);
        for p in 0..primary {
            let (start, end) = (self.indptr[p] as usize, self.indptr[p + 1] as usize);
            for (&idx, &value) in self.indices[start..end].iter().zip(&self.data[start..end]) {
                let (r, c) = match self.format {
                    SparseFormat::Csr => (p, idx as usize),
                    SparseFormat::Csc => (idx as usize, p),
                };
                dense[r * cols + c] = value;
            }
        }
        dense
    }

    /// Concatenate along the primary axis: `vstack` for CSR, `hstack` for
    /// CSC.
    ///
    /// Panics if the formats differ or the secondary dimensions do not
    /// match; those are caller bugs, not recoverable conditions.
    pub fn stack(&self, other: &CsMatrix<T>) -> CsMatrix<T> {
        assert_eq!(self.format, other.format, "cannot stack matrices of different formats");
        assert_eq!(
            self.format.secondary_dim(self.shape),
            other.format.secondary_dim(other.shape),
            "secondary dimension mismatch in stack",
        );
        let offset = *self.indptr.last().expect("indptr is non-empty");
        let mut indptr = self.indptr.clone();
        indptr.extend(other.indptr[1..].iter().map(|&x| x + offset));
        let mut indices = self.indices.clone();
        indices.extend_from_slice(&other.indices);
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        let primary =
            self.format.primary_dim(self.shape) + other.format.primary_dim(other.shape);
        let shape = self.format.shape_from(primary, self.format.secondary_dim(self.shape));
        CsMatrix { format: self.format, shape, indptr, indices, data }
    }

    /// Restrict to a 2D selection, both axes independently selectable.
    ///
    /// Selection order is preserved, and duplicate positions duplicate the
    /// corresponding slots.
    pub fn select(&self, rows: &Selector, cols: &Selector) -> Result<CsMatrix<T>> {
        let (primary_sel, secondary_sel) = match self.format {
            SparseFormat::Csr => (rows, cols),
            SparseFormat::Csc => (cols, rows),
        };
        let positions = primary_sel.positions(self.format.primary_dim(self.shape))?;
        let gathered = self.select_primary(&positions);
        gathered.select_secondary(secondary_sel)
    }

    /// Gather primary slots by explicit position, in order.
    pub(crate) fn select_primary(&self, positions: &[usize]) -> CsMatrix<T> {
        let mut indptr = Vec::with_capacity(positions.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for &p in positions {
            let (start, end) = (self.indptr[p] as usize, self.indptr[p + 1] as usize);
            indices.extend_from_slice(&self.indices[start..end]);
            data.extend_from_slice(&self.data[start..end]);
            indptr.push(indices.len() as u64);
        }
        let shape = self
            .format
            .shape_from(positions.len(), self.format.secondary_dim(self.shape));
        CsMatrix { format: self.format, shape, indptr, indices, data }
    }

    /// Restrict the secondary axis in memory.
    ///
    /// Supports the same selector kinds as the primary axis; each selected
    /// position becomes one slot of the new secondary axis, so duplicates
    /// duplicate values.
    pub(crate) fn select_secondary(&self, selector: &Selector) -> Result<CsMatrix<T>> {
        if selector.is_all() {
            return Ok(self.clone());
        }
        let secondary = self.format.secondary_dim(self.shape);
        let positions = selector.positions(secondary)?;

        // Old secondary index -> every new position it lands in.
        let mut remap: Vec<Vec<u64>> = vec![Vec::new(); secondary];
        for (new, &old) in positions.iter().enumerate() {
            remap[old].push(new as u64);
        }

        let primary = self.format.primary_dim(self.shape);
        let mut indptr = Vec::with_capacity(primary + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        let mut slot: Vec<(u64, T)> = Vec::new();
        indptr.push(0);
        for p in 0..primary {
            let (start, end) = (self.indptr[p] as usize, self.indptr[p + 1] as usize);
            slot.clear();
            for (&idx, &value) in self.indices[start..end].iter().zip(&self.data[start..end]) {
                for &new in &remap[idx as usize] {
                    slot.push((new, value));
                }
            }
            slot.sort_unstable_by_key(|&(new, _)| new);
            for &(new, value) in &slot {
                indices.push(new);
                data.push(value);
            }
            indptr.push(indices.len() as u64);
        }
        let shape = self.format.shape_from(primary, positions.len());
        Ok(CsMatrix { format: self.format, shape, indptr, indices, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsMatrix<f64> {
        // [[1, 0, 4, 0],
        //  [0, 2, 0, 0],
        //  [6, 0, 7, 5]]
        CsMatrix::from_parts(
            SparseFormat::Csr,
            (3, 4),
            vec![0, 2, 3, 6],
            vec![0, 2, 1, 0, 2, 3],
            vec![1.0, 4.0, 2.0, 6.0, 7.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn from_parts_rejects_bad_layouts() {
        let err = CsMatrix::<f64>::from_parts(
            SparseFormat::Csr,
            (3, 4),
            vec![0, 2, 3],
            vec![0, 2, 1],
            vec![1.0, 4.0, 2.0],
        );
        assert!(matches!(err, Err(Error::Shape(_))));

        let err = CsMatrix::<f64>::from_parts(
            SparseFormat::Csr,
            (2, 2),
            vec![0, 2, 1],
            vec![0, 1],
            vec![1.0, 2.0],
        );
        assert!(matches!(err, Err(Error::Shape(_))));

        let err = CsMatrix::<f64>::from_parts(
            SparseFormat::Csr,
            (1, 2),
            vec![0, 1],
            vec![5],
            vec![1.0],
        );
        assert!(matches!(err, Err(Error::Shape(_))));
    }

    #[test]
    fn dense_roundtrip_both_formats() {
        let dense = sample().to_dense();
        for format in [SparseFormat::Csr, SparseFormat::Csc] {
            let m = CsMatrix::from_dense(format, (3, 4), &dense).unwrap();
            assert_eq!(m.to_dense(), dense);
            assert_eq!(m.nnz(), 6);
        }
    }

    #[test]
    fn stack_is_vstack_for_csr() {
        let a = sample();
        let b = sample();
        let stacked = a.stack(&b);
        assert_eq!(stacked.shape(), (6, 4));
        let mut expected = a.to_dense();
        expected.extend(b.to_dense());
        assert_eq!(stacked.to_dense(), expected);
    }

    #[test]
    #[should_panic(expected = "secondary dimension mismatch")]
    fn stack_wrong_secondary_dim_panics() {
        let a = sample();
        let b = CsMatrix::<f64>::zeros(SparseFormat::Csr, (3, 5));
        let _ = a.stack(&b);
    }

    #[test]
    fn select_preserves_order_and_duplicates() {
        let m = sample();
        let picked = m
            .select(&Selector::Indices(vec![2, 0, 0]), &Selector::All)
            .unwrap();
        assert_eq!(picked.shape(), (3, 4));
        let dense = m.to_dense();
        let rows: Vec<&[f64]> = dense.chunks(4).collect();
        let expected: Vec<f64> =
            [rows[2], rows[0], rows[0]].concat();
        assert_eq!(picked.to_dense(), expected);
    }

    #[test]
    fn secondary_mask_matches_dense_filtering() {
        let m = sample();
        let mask = vec![true, false, true, true];
        let picked = m.select(&Selector::All, &Selector::Mask(mask)).unwrap();
        assert_eq!(picked.shape(), (3, 3));
        let expected: Vec<f64> = m
            .to_dense()
            .chunks(4)
            .flat_map(|row| [row[0], row[2], row[3]])
            .collect();
        assert_eq!(picked.to_dense(), expected);
    }

    #[test]
    fn empty_selection_is_degenerate_but_valid() {
        let m = sample();
        let empty = m.select(&Selector::Indices(vec![]), &Selector::All).unwrap();
        assert_eq!(empty.shape(), (0, 4));
        assert_eq!(empty.indptr, vec![0]);
        assert_eq!(empty.nnz(), 0);
    }
}
