//! Collaborator write API: producing correctly tagged backing groups.
//!
//! These functions are consumed by tests and setup code; the backed layer
//! itself never creates groups, it only opens existing ones.

use crate::backed::join;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::mem::CsMatrix;
use crate::store::{ArrayStore, EncodingKind, EncodingTag};

/// Write a compressed sparse matrix as a tagged group.
///
/// Creates (or replaces) the `indptr`, `indices` and `data` arrays under
/// `group` and attaches a tag naming the orientation, shape and encoding
/// version. The resulting group can be opened with
/// [`open_sparse`](crate::open_sparse).
pub fn write_elem<T: Element, S: ArrayStore>(
    store: &mut S,
    group: &str,
    matrix: &CsMatrix<T>,
) -> Result<()> {
    store.overwrite(&join(group, "indptr"), &matrix.indptr)?;
    store.overwrite(&join(group, "indices"), &matrix.indices)?;
    store.overwrite(&join(group, "data"), &matrix.data)?;
    store.write_tag(
        group,
        &EncodingTag::new(
            matrix.format.encoding_kind(),
            (matrix.shape.0 as u64, matrix.shape.1 as u64),
        ),
    )
}

/// Write a dense row-major array as a tagged group.
///
/// Dense groups can never be opened as sparse matrices; they exist so
/// callers can exercise the rejection paths of the sparse layer.
pub fn write_dense_elem<T: Element, S: ArrayStore>(
    store: &mut S,
    group: &str,
    shape: (usize, usize),
    data: &[T],
) -> Result<()> {
    if data.len() != shape.0 * shape.1 {
        return Err(Error::Shape(format!(
            "dense buffer of {} elements for shape {}x{}",
            data.len(),
            shape.0,
            shape.1,
        )));
    }
    store.overwrite(&join(group, "data"), data)?;
    store.write_tag(
        group,
        &EncodingTag::new(EncodingKind::Array, (shape.0 as u64, shape.1 as u64)),
    )
}
