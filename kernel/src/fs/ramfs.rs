// kernel/src/fs/ramfs.rs
//
// In-RAM file table used when no disk is attached.
// - MAX_FILES records, each holding up to MAX_FILE_SIZE bytes.
// - Files baked into the kernel image stay borrowed until first written,
//   then get a private copy.

use super::{FileHandle, FileName, FsError, Storage, MAX_FILES, MAX_FILE_SIZE};

/// Files shipped inside the kernel image.
pub const EMBEDDED_FILES: &[(&str, &[u8])] = &[
    ("hello.txt", include_bytes!("../../disk/hello.txt")),
    ("meow.txt", include_bytes!("../../disk/meow.txt")),
];

enum Contents {
    Embedded(&'static [u8]),
    Owned { data: [u8; MAX_FILE_SIZE], len: usize },
}

impl Contents {
    fn bytes(&self) -> &[u8] {
        match self {
            Contents::Embedded(data) => data,
            Contents::Owned { data, len } => &data[..*len],
        }
    }
}

struct RamFile {
    name: FileName,
    contents: Contents,
}

pub struct RamFs {
    files: [Option<RamFile>; MAX_FILES],
}

impl RamFs {
    pub fn new() -> Self {
        RamFs {
            files: core::array::from_fn(|_| None),
        }
    }

    /// A table pre-populated with EMBEDDED_FILES.
    pub fn with_embedded() -> Self {
        let mut fs = RamFs::new();
        for (name, data) in EMBEDDED_FILES {
            if let Err(e) = fs.add_embedded(name, data) {
                crate::logging::error(name);
                crate::logging::error(match e {
                    FsError::NoSpace => "embedded file dropped: no space",
                    _ => "embedded file dropped",
                });
            }
        }
        fs
    }

    pub fn add_embedded(&mut self, name: &str, data: &'static [u8]) -> Result<FileHandle, FsError> {
        self.insert(name, Contents::Embedded(data))
    }

    fn insert(&mut self, name: &str, contents: Contents) -> Result<FileHandle, FsError> {
        let name = FileName::new(name)?;
        if self.lookup(name.as_str()).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::NoSpace)?;
        self.files[slot] = Some(RamFile { name, contents });
        Ok(FileHandle(slot))
    }

    fn file(&self, handle: FileHandle) -> Option<&RamFile> {
        self.files.get(handle.0).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.files.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RamFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for RamFs {
    fn lookup(&self, name: &str) -> Option<FileHandle> {
        self.files
            .iter()
            .position(|f| f.as_ref().is_some_and(|f| f.name.as_str() == name))
            .map(FileHandle)
    }

    fn read(&self, file: FileHandle, buf: &mut [u8]) -> usize {
        let Some(file) = self.file(file) else {
            return 0;
        };
        let bytes = file.contents.bytes();
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        n
    }

    fn write(&mut self, file: FileHandle, data: &[u8]) -> usize {
        let Some(Some(file)) = self.files.get_mut(file.0) else {
            return 0;
        };

        if let Contents::Embedded(_) = file.contents {
            file.contents = Contents::Owned {
                data: [0; MAX_FILE_SIZE],
                len: 0,
            };
        }

        let Contents::Owned { data: store, len } = &mut file.contents else {
            return 0;
        };
        let n = data.len().min(MAX_FILE_SIZE);
        store[..n].copy_from_slice(&data[..n]);
        *len = n;
        n
    }

    fn create(&mut self, name: &str) -> Result<FileHandle, FsError> {
        self.insert(
            name,
            Contents::Owned {
                data: [0; MAX_FILE_SIZE],
                len: 0,
            },
        )
    }

    fn delete(&mut self, name: &str) -> Result<(), FsError> {
        let handle = self.lookup(name).ok_or(FsError::NotFound)?;
        self.files[handle.0] = None;
        Ok(())
    }

    fn for_each_file(&self, f: &mut dyn FnMut(&str, usize)) {
        for file in self.files.iter().flatten() {
            f(file.name.as_str(), file.contents.bytes().len());
        }
    }

    fn max_file_size(&self) -> usize {
        MAX_FILE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::{String, ToString};
    use std::vec::Vec;

    fn listing(fs: &RamFs) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        fs.for_each_file(&mut |name, size| out.push((name.to_string(), size)));
        out
    }

    #[test]
    fn create_write_read_delete() {
        let mut fs = RamFs::new();
        let h = fs.create("notes.txt").expect("create");
        assert_eq!(fs.lookup("notes.txt"), Some(h));

        assert_eq!(fs.write(h, b"hello"), 5);
        let mut buf = [0u8; 16];
        assert_eq!(fs.read(h, &mut buf), 5);
        assert_eq!(&buf[..5], b"hello");

        // writes replace, they do not append
        assert_eq!(fs.write(h, b"hi"), 2);
        assert_eq!(fs.read(h, &mut buf), 2);

        assert_eq!(fs.delete("notes.txt"), Ok(()));
        assert_eq!(fs.lookup("notes.txt"), None);
        assert_eq!(fs.read(h, &mut buf), 0, "stale handle reads nothing");
        assert_eq!(fs.delete("notes.txt"), Err(FsError::NotFound));
    }

    #[test]
    fn duplicate_and_full_table() {
        let mut fs = RamFs::new();
        fs.create("a").expect("a");
        assert_eq!(fs.create("a"), Err(FsError::AlreadyExists));

        for i in 1..MAX_FILES {
            fs.create(&i.to_string()).expect("fill");
        }
        assert_eq!(fs.create("overflow"), Err(FsError::NoSpace));

        fs.delete("a").expect("delete");
        assert!(fs.create("overflow").is_ok(), "freed slot is reused");
    }

    #[test]
    fn writes_are_clamped() {
        let mut fs = RamFs::new();
        let h = fs.create("big").expect("create");
        let data = [7u8; MAX_FILE_SIZE + 100];
        assert_eq!(fs.write(h, &data), MAX_FILE_SIZE);
        assert_eq!(listing(&fs), [("big".to_string(), MAX_FILE_SIZE)]);
    }

    #[test]
    fn embedded_files_copy_on_write() {
        static ORIGINAL: &[u8] = b"baked in";
        let mut fs = RamFs::new();
        let h = fs.add_embedded("baked.txt", ORIGINAL).expect("embed");

        let mut buf = [0u8; 32];
        assert_eq!(fs.read(h, &mut buf), ORIGINAL.len());

        fs.write(h, b"changed");
        let n = fs.read(h, &mut buf);
        assert_eq!(&buf[..n], b"changed");
        assert_eq!(ORIGINAL, b"baked in");
    }

    #[test]
    fn seeded_table_lists_embedded_files() {
        let fs = RamFs::with_embedded();
        let names: Vec<String> = listing(&fs).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["hello.txt", "meow.txt"]);
        assert_eq!(fs.len(), EMBEDDED_FILES.len());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut fs = RamFs::new();
        assert_eq!(fs.create(""), Err(FsError::InvalidName));
        assert!(fs.is_empty());
    }
}
