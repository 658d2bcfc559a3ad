//! Backed sparse matrices: compressed sparse triples living in a store.
//!
//! A [`BackedSparse`] is a descriptor over a tagged backing group holding
//! `indptr`, `indices` and `data` arrays. It owns none of the data and none
//! of the store handle; every operation borrows the store for its duration,
//! so closing or flushing the underlying container stays the caller's
//! responsibility. Reads of `indices`/`data` touch only the byte ranges a
//! selection needs, while `indptr` is read once and cached for the life of
//! the descriptor.

use std::sync::OnceLock;
use std::marker::PhantomData;

use log::debug;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::mem::{CooMatrix, CsMatrix, SparseFormat};
use crate::select::{runs, Selector};
use crate::store::{ArrayStore, EncodingTag};

/// Elements moved per backing read when streaming one on-disk matrix into
/// another.
const STREAM_CHUNK: usize = 1 << 16;

pub(crate) fn join(group: &str, leaf: &str) -> String {
    format!("{}/{}", group, leaf)
}

/// The argument to [`BackedSparse::append`].
///
/// Append dispatches on the kind of source; the unsupported kinds are
/// explicit variants so they can be rejected before anything is written.
pub enum AppendSource<'a, T> {
    /// An in-memory compressed sparse matrix.
    Compressed(&'a CsMatrix<T>),
    /// Another backed matrix in the same store, streamed through bounded
    /// reads rather than materialized.
    Backed(&'a BackedSparse<T>),
    /// Coordinate-format input. Always rejected.
    Coo(&'a CooMatrix<T>),
    /// Dense row-major input. Always rejected.
    Dense {
        /// Dimensions as `(rows, cols)`.
        shape: (usize, usize),
        /// Row-major values.
        data: &'a [T],
    },
}

/// A compressed sparse matrix whose arrays live in a backing store.
///
/// Obtained only through [`open_sparse`]; the backing group is fixed at
/// construction.
#[derive(Debug)]
pub struct BackedSparse<T> {
    group: String,
    format: SparseFormat,
    shape: (usize, usize),
    indptr: OnceLock<Vec<u64>>,
    _element: PhantomData<T>,
}

/// Open an existing tagged sparse group as a backed matrix.
///
/// Reads only the group's encoding tag and the dtype of `data`; the arrays
/// themselves stay on disk. Fails with [`Error::Format`] if the tag is
/// missing, names anything other than a CSR/CSC encoding, or the stored
/// dtype does not match `T`.
pub fn open_sparse<T: Element, S: ArrayStore>(store: &S, group: &str) -> Result<BackedSparse<T>> {
    let tag = store
        .read_tag(group)?
        .ok_or_else(|| Error::Format(format!("group '{}' has no encoding tag", group)))?;
    let format = SparseFormat::from_kind(tag.kind).ok_or_else(|| {
        Error::Format(format!(
            "group '{}' is not a compressed sparse encoding (tag {:?})",
            group, tag.kind,
        ))
    })?;
    let dtype = store.dtype_of(&join(group, "data"))?;
    if dtype != T::DTYPE {
        return Err(Error::Format(format!(
            "group '{}' stores {} data, not {}",
            group,
            dtype,
            T::DTYPE,
        )));
    }
    Ok(BackedSparse {
        group: group.to_string(),
        format,
        shape: (tag.shape.0 as usize, tag.shape.1 as usize),
        indptr: OnceLock::new(),
        _element: PhantomData,
    })
}

enum Payload<'a, T> {
    Mem(&'a CsMatrix<T>),
    Disk(&'a BackedSparse<T>),
}

impl<T: Element> BackedSparse<T> {
    /// Path of the backing group inside the store.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Orientation of the stored matrix.
    pub fn format(&self) -> SparseFormat {
        self.format
    }

    /// Dimensions as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of stored elements, from the cached `indptr`.
    pub fn nnz<S: ArrayStore>(&self, store: &S) -> Result<usize> {
        let indptr = self.indptr(store)?;
        Ok(*indptr.last().expect("indptr is non-empty") as usize)
    }

    /// The backing group cannot be changed after construction; this always
    /// fails with [`Error::Frozen`].
    pub fn rebind(&mut self, _group: &str) -> Result<()> {
        Err(Error::Frozen("the backing group is fixed when the matrix is opened"))
    }

    fn indptr_path(&self) -> String {
        join(&self.group, "indptr")
    }

    fn indices_path(&self) -> String {
        join(&self.group, "indices")
    }

    fn data_path(&self) -> String {
        join(&self.group, "data")
    }

    /// The cached `indptr`, loaded from the store on first use.
    fn indptr<S: ArrayStore>(&self, store: &S) -> Result<&[u64]> {
        if let Some(cached) = self.indptr.get() {
            return Ok(cached);
        }
        let loaded = store.read_full::<u64>(&self.indptr_path())?;
        let primary = self.format.primary_dim(self.shape);
        if loaded.len() != primary + 1 {
            return Err(Error::Shape(format!(
                "indptr of group '{}' has length {}, expected {}",
                self.group,
                loaded.len(),
                primary + 1,
            )));
        }
        Ok(self.indptr.get_or_init(|| loaded))
    }

    /// Restrict to a 2D selection, reading only what the selection needs.
    ///
    /// The primary-axis selector is resolved into maximal consecutive runs,
    /// and `indices`/`data` are fetched with one bounded read per run; a
    /// boolean mask therefore costs as many reads as it has `true`
    /// stretches, not as many as it has `true` entries. Selection order is
    /// preserved, including duplicates. The secondary-axis selector is
    /// applied to the assembled in-memory matrix afterwards.
    pub fn slice<S: ArrayStore>(
        &self,
        store: &S,
        rows: &Selector,
        cols: &Selector,
    ) -> Result<CsMatrix<T>> {
        let (primary_sel, secondary_sel) = match self.format {
            SparseFormat::Csr => (rows, cols),
            SparseFormat::Csc => (cols, rows),
        };
        let primary_len = self.format.primary_dim(self.shape);
        let secondary_len = self.format.secondary_dim(self.shape);
        let positions = primary_sel.positions(primary_len)?;
        let spans = runs(&positions);
        let indptr = self.indptr(store)?;
        debug!(
            "slicing '{}': {} selected slots in {} runs",
            self.group,
            positions.len(),
            spans.len(),
        );

        let mut out_indptr = Vec::with_capacity(positions.len() + 1);
        let mut out_indices = Vec::new();
        let mut out_data = Vec::new();
        out_indptr.push(0u64);
        for span in &spans {
            let base = indptr[span.start] as usize;
            let stop = indptr[span.end] as usize;
            let seen = out_indices.len() as u64;
            out_indices.extend(store.read_slice::<u64>(&self.indices_path(), base..stop)?);
            out_data.extend(store.read_slice::<T>(&self.data_path(), base..stop)?);
            for p in span.start..span.end {
                out_indptr.push(seen + (indptr[p + 1] as usize - base) as u64);
            }
        }

        let assembled = CsMatrix {
            format: self.format,
            shape: self.format.shape_from(positions.len(), secondary_len),
            indptr: out_indptr,
            indices: out_indices,
            data: out_data,
        };
        assembled.select_secondary(secondary_sel)
    }

    /// Single-axis convenience: select rows, keep every column.
    pub fn slice_rows<S: ArrayStore>(&self, store: &S, rows: &Selector) -> Result<CsMatrix<T>> {
        self.slice(store, rows, &Selector::All)
    }

    /// Read all three arrays and build the full in-memory matrix.
    ///
    /// `indices` and `data` are re-read on every call; only `indptr` comes
    /// from the cache.
    pub fn to_memory<S: ArrayStore>(&self, store: &S) -> Result<CsMatrix<T>> {
        let indptr = self.indptr(store)?.to_vec();
        let indices = store.read_full::<u64>(&self.indices_path())?;
        let data = store.read_full::<T>(&self.data_path())?;
        CsMatrix::from_parts(self.format, self.shape, indptr, indices, data)
    }

    /// Grow the backing arrays by another matrix along the primary axis.
    ///
    /// All validation happens before any write, so a failed append leaves
    /// the store byte-for-byte unchanged: coordinate-format and dense
    /// sources fail with [`Error::NotImplemented`], an orientation mismatch
    /// fails with [`Error::Format`], and a secondary-dimension mismatch is a
    /// data-integrity bug and panics.
    ///
    /// On success `indices`/`data` are extended (streamed in bounded chunks
    /// when the source is backed), the grown `indptr` overwrites the stored
    /// one in full, the group's shape tag is rewritten, and the cache is
    /// refreshed.
    pub fn append<S: ArrayStore>(
        &mut self,
        store: &mut S,
        other: AppendSource<'_, T>,
    ) -> Result<()> {
        let payload = match other {
            AppendSource::Compressed(m) => Payload::Mem(m),
            AppendSource::Backed(b) => Payload::Disk(b),
            AppendSource::Coo(_) => {
                return Err(Error::NotImplemented(
                    "appending a coordinate-format matrix".to_string(),
                ));
            }
            AppendSource::Dense { .. } => {
                return Err(Error::NotImplemented("appending a dense array".to_string()));
            }
        };

        let (other_format, other_shape) = match &payload {
            Payload::Mem(m) => (m.format, m.shape),
            Payload::Disk(b) => (b.format, b.shape),
        };
        if other_format != self.format {
            return Err(Error::Format(format!(
                "cannot append a {} matrix to a {} matrix",
                other_format.name(),
                self.format.name(),
            )));
        }
        let secondary = self.format.secondary_dim(self.shape);
        assert_eq!(
            secondary,
            other_format.secondary_dim(other_shape),
            "secondary dimension mismatch on append",
        );

        let offset = {
            let indptr = self.indptr(store)?;
            *indptr.last().expect("indptr is non-empty")
        };
        let mut new_indptr = self.indptr(store)?.to_vec();
        new_indptr.pop();
        match &payload {
            Payload::Mem(m) => new_indptr.extend(m.indptr.iter().map(|&x| x + offset)),
            Payload::Disk(b) => {
                new_indptr.extend(b.indptr(store)?.iter().map(|&x| x + offset))
            }
        }

        match payload {
            Payload::Mem(m) => {
                store.append(&self.indices_path(), &m.indices)?;
                store.append(&self.data_path(), &m.data)?;
            }
            Payload::Disk(b) => {
                let nnz = b.nnz(store)?;
                let mut done = 0;
                while done < nnz {
                    let stop = (done + STREAM_CHUNK).min(nnz);
                    let chunk = store.read_slice::<u64>(&b.indices_path(), done..stop)?;
                    store.append(&self.indices_path(), &chunk)?;
                    let chunk = store.read_slice::<T>(&b.data_path(), done..stop)?;
                    store.append(&self.data_path(), &chunk)?;
                    done = stop;
                }
            }
        }
        store.overwrite(&self.indptr_path(), &new_indptr)?;

        let primary =
            self.format.primary_dim(self.shape) + other_format.primary_dim(other_shape);
        self.shape = self.format.shape_from(primary, secondary);
        store.write_tag(
            &self.group,
            &EncodingTag::new(
                self.format.encoding_kind(),
                (self.shape.0 as u64, self.shape.1 as u64),
            ),
        )?;
        debug!(
            "appended {} primary slots onto '{}', new shape {:?}",
            other_format.primary_dim(other_shape),
            self.group,
            self.shape,
        );
        self.indptr = OnceLock::from(new_indptr);
        Ok(())
    }
}
