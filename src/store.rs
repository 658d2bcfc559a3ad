//! The backing store contract and the in-memory reference store.
//!
//! A store is a flat namespace of 1D typed arrays plus per-group encoding
//! tags, in the manner of a zarr hierarchy: the three arrays of a sparse
//! group `X` live at `X/indptr`, `X/indices` and `X/data`, and the tag that
//! describes the group is attached to `X` itself.
//!
//! [`MemStore`] keeps everything in `HashMap`s and is the backend used by
//! most unit tests. [`AccessTrackingStore`] wraps any store and counts read
//! operations per array, which is how the indptr caching behavior is
//! verified. The file-backed store lives in [`crate::dir_store`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::element::{DType, Element};
use crate::error::{Error, Result};

/// Version written into every encoding tag produced by this crate.
pub const ENCODING_VERSION: &str = "0.1.0";

/// What kind of element a tagged group encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingKind {
    /// Compressed sparse, row-oriented (`indptr` over rows).
    #[serde(rename = "csr_matrix")]
    CsrMatrix,
    /// Compressed sparse, column-oriented (`indptr` over columns).
    #[serde(rename = "csc_matrix")]
    CscMatrix,
    /// A plain dense array. Written by collaborators; never opened as a
    /// sparse matrix.
    #[serde(rename = "array")]
    Array,
}

/// Metadata attached to a backing group.
///
/// Format is always taken from the tag, never inferred from array contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingTag {
    /// The encoded element kind.
    #[serde(rename = "encoding-type")]
    pub kind: EncodingKind,
    /// Matrix shape as `(rows, cols)`.
    pub shape: (u64, u64),
    /// Encoding version marker, for forward compatibility.
    #[serde(rename = "encoding-version")]
    pub version: String,
}

impl EncodingTag {
    /// Tag with the current [`ENCODING_VERSION`].
    pub fn new(kind: EncodingKind, shape: (u64, u64)) -> EncodingTag {
        EncodingTag { kind, shape, version: ENCODING_VERSION.to_string() }
    }
}

/// Uniform interface over a chunked array container.
///
/// All reads and writes are blocking; concurrent reads are as safe as the
/// implementation makes them, while writes require external serialization.
pub trait ArrayStore {
    /// Number of elements in the named 1D array.
    fn array_len(&self, name: &str) -> Result<usize>;

    /// On-disk scalar type of the named array.
    fn dtype_of(&self, name: &str) -> Result<DType>;

    /// Read the whole array.
    fn read_full<T: Element>(&self, name: &str) -> Result<Vec<T>>;

    /// Read `range` (in elements) of the array.
    fn read_slice<T: Element>(&self, name: &str, range: Range<usize>) -> Result<Vec<T>>;

    /// Grow an existing array by `values`.
    ///
    /// Fails with [`Error::Format`] if `T` does not match the stored dtype.
    fn append<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()>;

    /// Replace the array's contents, creating it if absent.
    fn overwrite<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()>;

    /// Read the encoding tag of a group, if one is attached.
    fn read_tag(&self, group: &str) -> Result<Option<EncodingTag>>;

    /// Attach (or replace) the encoding tag of a group.
    fn write_tag(&mut self, group: &str, tag: &EncodingTag) -> Result<()>;
}

struct ArrayBuf {
    dtype: DType,
    bytes: Vec<u8>,
}

impl ArrayBuf {
    fn check_dtype(&self, name: &str, expected: DType) -> Result<()> {
        if self.dtype != expected {
            return Err(Error::Format(format!(
                "array '{}' holds {} elements, not {}",
                name, self.dtype, expected,
            )));
        }
        Ok(())
    }
}

/// A store backed by process memory.
#[derive(Default)]
pub struct MemStore {
    arrays: HashMap<String, ArrayBuf>,
    tags: HashMap<String, EncodingTag>,
}

impl MemStore {
    /// An empty store.
    pub fn new() -> MemStore {
        MemStore::default()
    }

    fn get(&self, name: &str) -> Result<&ArrayBuf> {
        self.arrays.get(name).ok_or_else(|| Error::NotFound(name.to_string()))
    }
}

impl ArrayStore for MemStore {
    fn array_len(&self, name: &str) -> Result<usize> {
        let buf = self.get(name)?;
        Ok(buf.bytes.len() / buf.dtype.size())
    }

    fn dtype_of(&self, name: &str) -> Result<DType> {
        Ok(self.get(name)?.dtype)
    }

    fn read_full<T: Element>(&self, name: &str) -> Result<Vec<T>> {
        let buf = self.get(name)?;
        buf.check_dtype(name, T::DTYPE)?;
        T::decode(&buf.bytes)
    }

    fn read_slice<T: Element>(&self, name: &str, range: Range<usize>) -> Result<Vec<T>> {
        let buf = self.get(name)?;
        buf.check_dtype(name, T::DTYPE)?;
        let size = T::DTYPE.size();
        let len = buf.bytes.len() / size;
        if range.start > range.end || range.end > len {
            return Err(Error::Index { index: range.end, len });
        }
        T::decode(&buf.bytes[range.start * size..range.end * size])
    }

    fn append<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        let buf = self
            .arrays
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        buf.check_dtype(name, T::DTYPE)?;
        buf.bytes.extend_from_slice(&T::encode(values));
        Ok(())
    }

    fn overwrite<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.arrays
            .insert(name.to_string(), ArrayBuf { dtype: T::DTYPE, bytes: T::encode(values) });
        Ok(())
    }

    fn read_tag(&self, group: &str) -> Result<Option<EncodingTag>> {
        Ok(self.tags.get(group).cloned())
    }

    fn write_tag(&mut self, group: &str, tag: &EncodingTag) -> Result<()> {
        self.tags.insert(group.to_string(), tag.clone());
        Ok(())
    }
}

/// A store wrapper that counts read operations per tracked array.
///
/// Only keys registered with [`AccessTrackingStore::track`] are counted;
/// everything else passes through untouched.
pub struct AccessTrackingStore<S> {
    inner: S,
    counts: RefCell<HashMap<String, usize>>,
}

impl<S> AccessTrackingStore<S> {
    /// Wrap a store.
    pub fn new(inner: S) -> AccessTrackingStore<S> {
        AccessTrackingStore { inner, counts: RefCell::new(HashMap::new()) }
    }

    /// Start counting read operations on `name`.
    pub fn track(&mut self, name: &str) {
        self.counts.borrow_mut().insert(name.to_string(), 0);
    }

    /// Number of read operations seen on `name` since tracking began.
    pub fn access_count(&self, name: &str) -> usize {
        self.counts.borrow().get(name).copied().unwrap_or(0)
    }

    /// The wrapped store.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn bump(&self, name: &str) {
        if let Some(count) = self.counts.borrow_mut().get_mut(name) {
            *count += 1;
        }
    }
}

impl<S: ArrayStore> ArrayStore for AccessTrackingStore<S> {
    fn array_len(&self, name: &str) -> Result<usize> {
        self.bump(name);
        self.inner.array_len(name)
    }

    fn dtype_of(&self, name: &str) -> Result<DType> {
        self.bump(name);
        self.inner.dtype_of(name)
    }

    fn read_full<T: Element>(&self, name: &str) -> Result<Vec<T>> {
        self.bump(name);
        self.inner.read_full(name)
    }

    fn read_slice<T: Element>(&self, name: &str, range: Range<usize>) -> Result<Vec<T>> {
        self.bump(name);
        self.inner.read_slice(name, range)
    }

    fn append<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.inner.append(name, values)
    }

    fn overwrite<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.inner.overwrite(name, values)
    }

    fn read_tag(&self, group: &str) -> Result<Option<EncodingTag>> {
        self.inner.read_tag(group)
    }

    fn write_tag(&mut self, group: &str, tag: &EncodingTag) -> Result<()> {
        self.inner.write_tag(group, tag)
    }
}
