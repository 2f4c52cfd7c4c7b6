// kernel/src/fs/mod.rs
//
// Storage as the kernel core sees it: flat namespace, files addressed by name,
// whole-file reads and writes. Backends are interchangeable behind `Storage`.

mod ramfs;

pub use ramfs::RamFs;

use core::fmt;

pub const MAX_FILES: usize = 10;
pub const MAX_FILE_SIZE: usize = 2048;
/// Name buffer size including the terminating NUL.
pub const MAX_NAME_LEN: usize = 64;

/// Opaque reference to a file, valid until that file is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHandle(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    NoSpace,
    InvalidName,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "file not found"),
            FsError::AlreadyExists => write!(f, "file already exists"),
            FsError::NoSpace => write!(f, "no space left in file table"),
            FsError::InvalidName => write!(f, "invalid file name"),
        }
    }
}

pub trait Storage {
    fn lookup(&self, name: &str) -> Option<FileHandle>;

    /// Copies up to `buf.len()` bytes from the start of the file.
    fn read(&self, file: FileHandle, buf: &mut [u8]) -> usize;

    /// Replaces the file's contents; returns how many bytes were kept.
    fn write(&mut self, file: FileHandle, data: &[u8]) -> usize;

    fn create(&mut self, name: &str) -> Result<FileHandle, FsError>;

    fn delete(&mut self, name: &str) -> Result<(), FsError>;

    /// Calls `f(name, size)` for every file.
    fn for_each_file(&self, f: &mut dyn FnMut(&str, usize));

    fn max_file_size(&self) -> usize;
}

/// A validated file name: non-empty UTF-8, shorter than MAX_NAME_LEN.
#[derive(Clone, Copy)]
pub struct FileName {
    bytes: [u8; MAX_NAME_LEN],
    len: usize,
}

impl FileName {
    pub fn from_bytes(name: &[u8]) -> Result<Self, FsError> {
        if name.is_empty() || name.len() >= MAX_NAME_LEN || name.contains(&0) {
            return Err(FsError::InvalidName);
        }
        core::str::from_utf8(name).map_err(|_| FsError::InvalidName)?;

        let mut bytes = [0; MAX_NAME_LEN];
        bytes[..name.len()].copy_from_slice(name);
        Ok(FileName {
            bytes,
            len: name.len(),
        })
    }

    pub fn new(name: &str) -> Result<Self, FsError> {
        Self::from_bytes(name.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileName({:?})", self.as_str())
    }
}

impl PartialEq for FileName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for FileName {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_validated() {
        assert_eq!(FileName::new("hello.txt").map(|n| n.as_str().len()), Ok(9));
        assert_eq!(FileName::new(""), Err(FsError::InvalidName));
        assert_eq!(FileName::from_bytes(&[0xff, 0xfe]), Err(FsError::InvalidName));
        assert_eq!(FileName::from_bytes(b"a\0b"), Err(FsError::InvalidName));

        let longest = [b'x'; MAX_NAME_LEN - 1];
        assert!(FileName::from_bytes(&longest).is_ok());
        let too_long = [b'x'; MAX_NAME_LEN];
        assert_eq!(FileName::from_bytes(&too_long), Err(FsError::InvalidName));
    }
}
