//! A file-backed store: one binary file per array, one JSON sidecar per
//! group.
//!
//! Array files carry a tiny header (magic plus dtype code) followed by the
//! raw little-endian payload; the element count is derived from the file
//! size, so [`ArrayStore::append`] is a plain file append and
//! [`ArrayStore::read_slice`] is a seek plus a bounded read. Group tags are
//! stored as JSON in a `.attrs.json` file inside the group directory.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::element::{DType, Element};
use crate::error::{Error, Result};
use crate::store::{ArrayStore, EncodingTag};

const MAGIC: [u8; 4] = *b"SPZ\x01";
const HEADER_LEN: u64 = 8;
const ATTRS_FILE: &str = ".attrs.json";

/// A store rooted at a directory on the filesystem.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open a store at `root`, creating the directory if it does not exist.
    pub fn open(root: impl AsRef<Path>) -> Result<DirStore> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(DirStore { root })
    }

    /// The directory this store lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn array_path(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(name.split('/'));
        path
    }

    fn attrs_path(&self, group: &str) -> PathBuf {
        self.array_path(group).join(ATTRS_FILE)
    }

    fn open_array(&self, name: &str) -> Result<(File, DType)> {
        let mut file = match File::open(self.array_path(name)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)?;
        if header[..4] != MAGIC {
            return Err(Error::Format(format!("array '{}' has a bad magic number", name)));
        }
        let dtype = DType::from_code(header[4]).ok_or_else(|| {
            Error::Format(format!("array '{}' has unknown dtype code {:#x}", name, header[4]))
        })?;
        Ok((file, dtype))
    }

    fn open_typed(&self, name: &str, expected: DType) -> Result<File> {
        let (file, dtype) = self.open_array(name)?;
        if dtype != expected {
            return Err(Error::Format(format!(
                "array '{}' holds {} elements, not {}",
                name, dtype, expected,
            )));
        }
        Ok(file)
    }
}

fn payload_len(file: &File, dtype: DType) -> Result<usize> {
    let bytes = file.metadata()?.len().saturating_sub(HEADER_LEN);
    Ok(bytes as usize / dtype.size())
}

impl ArrayStore for DirStore {
    fn array_len(&self, name: &str) -> Result<usize> {
        let (file, dtype) = self.open_array(name)?;
        payload_len(&file, dtype)
    }

    fn dtype_of(&self, name: &str) -> Result<DType> {
        Ok(self.open_array(name)?.1)
    }

    fn read_full<T: Element>(&self, name: &str) -> Result<Vec<T>> {
        let mut file = self.open_typed(name, T::DTYPE)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        T::decode(&bytes)
    }

    fn read_slice<T: Element>(&self, name: &str, range: Range<usize>) -> Result<Vec<T>> {
        let mut file = self.open_typed(name, T::DTYPE)?;
        let size = T::DTYPE.size();
        let len = payload_len(&file, T::DTYPE)?;
        if range.start > range.end || range.end > len {
            return Err(Error::Index { index: range.end, len });
        }
        file.seek(SeekFrom::Start(HEADER_LEN + (range.start * size) as u64))?;
        let mut bytes = vec![0u8; (range.end - range.start) * size];
        file.read_exact(&mut bytes)?;
        T::decode(&bytes)
    }

    fn append<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        // Re-opening to check the header keeps the append itself a pure
        // file append.
        self.open_typed(name, T::DTYPE)?;
        let mut file = OpenOptions::new().append(true).open(self.array_path(name))?;
        file.write_all(&T::encode(values))?;
        Ok(())
    }

    fn overwrite<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        let path = self.array_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        let mut header = [0u8; HEADER_LEN as usize];
        header[..4].copy_from_slice(&MAGIC);
        header[4] = T::DTYPE.code();
        file.write_all(&header)?;
        file.write_all(&T::encode(values))?;
        Ok(())
    }

    fn read_tag(&self, group: &str) -> Result<Option<EncodingTag>> {
        let bytes = match std::fs::read(self.attrs_path(group)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tag = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Format(format!("bad encoding tag on '{}': {}", group, e)))?;
        Ok(Some(tag))
    }

    fn write_tag(&mut self, group: &str, tag: &EncodingTag) -> Result<()> {
        let path = self.attrs_path(group);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(tag)
            .map_err(|e| Error::Format(format!("cannot serialize encoding tag: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EncodingKind;

    #[test]
    fn array_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(dir.path().join("store")).unwrap();

        store.overwrite("g/data", &[1.5f64, -2.0, 0.25]).unwrap();
        assert_eq!(store.array_len("g/data").unwrap(), 3);
        assert_eq!(store.dtype_of("g/data").unwrap(), DType::F64);
        assert_eq!(store.read_full::<f64>("g/data").unwrap(), vec![1.5, -2.0, 0.25]);
        assert_eq!(store.read_slice::<f64>("g/data", 1..3).unwrap(), vec![-2.0, 0.25]);

        store.append("g/data", &[9.0f64]).unwrap();
        assert_eq!(store.read_slice::<f64>("g/data", 3..4).unwrap(), vec![9.0]);
    }

    #[test]
    fn dtype_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        store.overwrite("a", &[1u64]).unwrap();
        assert!(matches!(store.read_full::<f64>("a"), Err(Error::Format(_))));
        assert!(matches!(store.append("a", &[1.0f64]), Err(Error::Format(_))));
    }

    #[test]
    fn tag_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        assert_eq!(store.read_tag("g").unwrap(), None);

        let tag = EncodingTag::new(EncodingKind::CsrMatrix, (10, 20));
        store.write_tag("g", &tag).unwrap();
        assert_eq!(store.read_tag("g").unwrap(), Some(tag));
    }

    #[test]
    fn missing_array_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        assert!(matches!(store.read_full::<f64>("absent"), Err(Error::NotFound(_))));
    }
}
