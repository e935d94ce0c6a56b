use crate::error::FsError;
use crate::inode::{Inode, InodeOps};

/// Maximum number of simultaneously open files.
pub const MAX_OPEN_FILES: usize = 20;

/// An open file: the descriptor id, an exclusively owned in-memory copy of
/// the inode, and a byte cursor.
///
/// Descriptors exist only between `open` and `close`; nothing about them is
/// persisted.
#[derive(Debug)]
pub struct FileDescriptor {
    pub fd: u32,
    pub inode: Inode,
    pub cursor: u32,
}

/// Bounded table of open-file descriptors.
///
/// Descriptor ids are positive and monotonically increasing; an id is never
/// reused within the table's lifetime, so a stale id from a closed file can
/// not alias a later open.
#[derive(Debug, Default)]
pub struct FileTable {
    files: Vec<FileDescriptor>,
    last_fd: u32,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh descriptor for `inode` with the cursor at zero.
    pub fn create(&mut self, inode: Inode) -> Result<u32, FsError> {
        if self.files.len() >= MAX_OPEN_FILES {
            return Err(FsError::TooManyOpenFiles);
        }
        self.last_fd += 1;
        self.files.push(FileDescriptor {
            fd: self.last_fd,
            inode,
            cursor: 0,
        });
        Ok(self.last_fd)
    }

    pub fn get_mut(&mut self, fd: u32) -> Option<&mut FileDescriptor> {
        self.files.iter_mut().find(|desc| desc.fd == fd)
    }

    /// Returns the descriptor already holding inode `num`, if any.
    pub fn find_by_inode(&self, num: u32) -> Option<u32> {
        self.files
            .iter()
            .find(|desc| desc.inode.number() == num)
            .map(|desc| desc.fd)
    }

    /// Removes `fd` from the table, dropping its inode copy.
    pub fn remove(&mut self, fd: u32) -> Result<(), FsError> {
        let index = self
            .files
            .iter()
            .position(|desc| desc.fd == fd)
            .ok_or(FsError::BadDescriptor)?;
        self.files.remove(index);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.files.len() >= MAX_OPEN_FILES
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
