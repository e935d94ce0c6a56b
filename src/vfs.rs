use crate::error::FsError;

/// Maximum number of file descriptors the dispatch layer hands out per
/// filesystem; one bound shared with the open-file table.
pub const MAX_FDS: usize = crate::file::MAX_OPEN_FILES;

/// Maximum number of filesystems the dispatch table holds.
pub const MAX_FS: usize = 8;

/// The operations vector a filesystem exposes to the dispatch layer.
///
/// The directory-specific entry points are declared for completeness but not
/// provided by this core; their defaults report [`FsError::Unsupported`].
pub trait FileSystemOps {
    /// Identifier reported to the dispatch layer.
    fn fsid(&self) -> u32;

    /// Human-readable filesystem name.
    fn fsname(&self) -> &'static str;

    /// Whether no descriptor is currently in use.
    fn is_idle(&self) -> bool;

    /// Formats the underlying device; returns the total number of blocks.
    fn format(&mut self, block_size: u32) -> Result<u32, FsError>;

    /// Opens (or creates) the regular file at `path`; returns a descriptor.
    fn open(&mut self, path: &str) -> Result<u32, FsError>;

    /// Reads from an open descriptor; returns the bytes copied.
    fn read(&mut self, fd: u32, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Writes to an open descriptor; returns the bytes written.
    fn write(&mut self, fd: u32, buf: &[u8]) -> Result<usize, FsError>;

    /// Closes an open descriptor.
    fn close(&mut self, fd: u32) -> Result<(), FsError>;

    fn opendir(&mut self, _path: &str) -> Result<u32, FsError> {
        Err(FsError::Unsupported)
    }

    fn readdir(&mut self, _fd: u32) -> Result<Option<(String, u32)>, FsError> {
        Err(FsError::Unsupported)
    }

    fn link(&mut self, _fd: u32, _name: &str, _inode_number: u32) -> Result<(), FsError> {
        Err(FsError::Unsupported)
    }

    fn unlink(&mut self, _fd: u32, _name: &str) -> Result<(), FsError> {
        Err(FsError::Unsupported)
    }

    fn closedir(&mut self, _fd: u32) -> Result<(), FsError> {
        Err(FsError::Unsupported)
    }
}

/// Descriptive record of a registered filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsInfo {
    pub slot: usize,
    pub fsid: u32,
    pub fsname: &'static str,
}

/// Dispatch table routing calls from a generic namespace to the registered
/// filesystems' operation vectors.
#[derive(Default)]
pub struct Vfs {
    slots: Vec<Box<dyn FileSystemOps>>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fs` and returns its slot index.
    pub fn register(&mut self, fs: Box<dyn FileSystemOps>) -> Result<usize, FsError> {
        if self.slots.len() >= MAX_FS {
            return Err(FsError::TooManyFileSystems);
        }
        self.slots.push(fs);
        let slot = self.slots.len() - 1;
        log::debug!("registered filesystem {:?} in slot {slot}", self.slots[slot].fsname());
        Ok(slot)
    }

    /// The operations vector registered in `slot`.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut dyn FileSystemOps> {
        Some(self.slots.get_mut(slot)?.as_mut())
    }

    /// Identity of the filesystem registered in `slot`.
    pub fn info(&self, slot: usize) -> Option<FsInfo> {
        let fs = self.slots.get(slot)?;
        Some(FsInfo {
            slot,
            fsid: fs.fsid(),
            fsname: fs.fsname(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
