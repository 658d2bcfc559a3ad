#![warn(missing_docs)]

/*!
Backed (out-of-core) CSR/CSC sparse matrices stored in chunked array
containers.

# Overview

A compressed sparse matrix is three parallel arrays: cumulative offsets
(`indptr`), secondary-axis indices (`indices`) and values (`data`). This
crate keeps those arrays in a named-array store (an HDF5/zarr-like
container, abstracted by the [`ArrayStore`] trait) and lets you slice,
append to, and materialize the matrix without ever loading all of it:

* slicing reads only the byte ranges the selection touches, merging
  consecutive selected slots into single reads;
* `indptr` is small and needed by every slice, so it is read once per
  descriptor and cached;
* appending grows `indices`/`data` in place and rewrites `indptr`, so a
  matrix can be built up incrementally on disk.

# Reading and slicing

```rust
use sparz::{open_sparse, write_elem, CsMatrix, MemStore, Selector, SparseFormat};

fn main() -> sparz::Result<()> {
    let mut store = MemStore::new();
    let matrix = CsMatrix::from_dense(
        SparseFormat::Csr,
        (3, 3),
        &[1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0, 4.0],
    )?;
    write_elem(&mut store, "X", &matrix)?;

    let backed = open_sparse::<f64, _>(&store, "X")?;
    let rows = backed.slice(&store, &Selector::Range(0..2), &Selector::All)?;
    assert_eq!(rows.shape(), (2, 3));
    assert_eq!(backed.to_memory(&store)?, matrix);
    Ok(())
}
```

# Appending

```rust
use sparz::{open_sparse, write_elem, AppendSource, CsMatrix, MemStore, SparseFormat};

fn main() -> sparz::Result<()> {
    let mut store = MemStore::new();
    let a = CsMatrix::from_dense(SparseFormat::Csr, (2, 2), &[1.0, 0.0, 0.0, 2.0])?;
    let b = CsMatrix::from_dense(SparseFormat::Csr, (1, 2), &[0.0, 3.0])?;
    write_elem(&mut store, "X", &a)?;

    let mut backed = open_sparse::<f64, _>(&store, "X")?;
    backed.append(&mut store, AppendSource::Compressed(&b))?;
    assert_eq!(backed.shape(), (3, 2));
    assert_eq!(backed.to_memory(&store)?, a.stack(&b));
    Ok(())
}
```

# Concurrency

Everything is synchronous and blocking. Read-only operations on one
descriptor are safe to issue concurrently if the store's reads are;
[`BackedSparse::append`] mutates shared on-disk state and must be
externally serialized against every other operation on the same group.
*/

mod backed;
mod dir_store;
mod element;
mod error;
mod mem;
mod select;
mod store;
mod write;

pub use backed::{open_sparse, AppendSource, BackedSparse};
pub use dir_store::DirStore;
pub use element::{DType, Element};
pub use error::{Error, Result};
pub use mem::{CooMatrix, CsMatrix, SparseFormat};
pub use select::{runs, Run, Selector};
pub use store::{
    AccessTrackingStore, ArrayStore, EncodingKind, EncodingTag, MemStore, ENCODING_VERSION,
};
pub use write::{write_dense_elem, write_elem};
