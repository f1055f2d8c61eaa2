//! Validated key sets.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SolveError};

/// A non-empty set of distinct 32-bit keys, in caller order.
///
/// Key `i` becomes edge `i` of every graph built from the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keys {
    keys: Vec<u32>,
}

impl Keys {
    /// Validates `keys`.
    ///
    /// # Errors
    /// [`SolveError::NoKeys`] for an empty set, [`SolveError::DuplicateKey`]
    /// naming the first repeated key.
    pub fn new(keys: Vec<u32>) -> Result<Self> {
        if keys.is_empty() {
            return Err(SolveError::NoKeys);
        }
        let mut seen = HashSet::with_capacity(keys.len());
        if let Some(&dup) = keys.iter().find(|&&k| !seen.insert(k)) {
            return Err(SolveError::DuplicateKey(dup));
        }
        Ok(Self { keys })
    }

    /// Parses a `.keys` file: a packed array of little-endian `u32`.
    ///
    /// # Errors
    /// [`SolveError::KeyFile`] if the file is unreadable or its length is not
    /// a multiple of four, plus everything [`Keys::new`] rejects.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| SolveError::KeyFile(format!("{}: {e}", path.display())))?;
        let keys = Self::from_le_bytes(&bytes).map_err(|e| match e {
            SolveError::KeyFile(msg) => SolveError::KeyFile(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), keys = keys.len(), "loaded key file");
        Ok(keys)
    }

    /// Parses a packed little-endian `u32` array.
    ///
    /// # Errors
    /// As for [`Keys::from_file`].
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(SolveError::KeyFile(format!(
                "length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let keys = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(keys)
    }

    /// The keys in caller order.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.keys
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Encodes the keys in the `.keys` file format.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.keys.iter().flat_map(|k| k.to_le_bytes()).collect()
    }
}

impl TryFrom<Vec<u32>> for Keys {
    type Error = SolveError;

    fn try_from(keys: Vec<u32>) -> Result<Self> {
        Self::new(keys)
    }
}

impl TryFrom<&[u32]> for Keys {
    type Error = SolveError;

    fn try_from(keys: &[u32]) -> Result<Self> {
        Self::new(keys.to_vec())
    }
}

impl AsRef<[u32]> for Keys {
    fn as_ref(&self) -> &[u32] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_duplicates() {
        assert_eq!(Keys::new(vec![]), Err(SolveError::NoKeys));
        assert_eq!(Keys::new(vec![1, 2, 3, 2, 1]), Err(SolveError::DuplicateKey(2)));
        assert_eq!(Keys::new(vec![7]).unwrap().as_slice(), &[7]);
    }

    #[test]
    fn parses_little_endian_words() {
        let keys = Keys::from_le_bytes(&[1, 0, 0, 0, 0, 1, 0, 0, 0xff, 0xff, 0xff, 0xff]).unwrap();
        assert_eq!(keys.as_slice(), &[1, 256, u32::MAX]);
        assert_eq!(Keys::from_le_bytes(&keys.to_le_bytes()).unwrap(), keys);
    }

    #[test]
    fn rejects_truncated_words() {
        assert!(matches!(Keys::from_le_bytes(&[1, 0, 0]), Err(SolveError::KeyFile(_))));
        assert_eq!(Keys::from_le_bytes(&[]), Err(SolveError::NoKeys));
    }
}
