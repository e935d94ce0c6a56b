use std::fmt;
use std::io;

/// Errors surfaced by filesystem operations.
///
/// Operations either return a valid value or exactly one of these; nothing is
/// retried at this layer.
#[derive(Debug)]
pub enum FsError {
    /// A parameter was rejected before any state was touched.
    InvalidArgument,
    /// A path component or directory entry does not exist.
    NotFound,
    /// A path component resolved to something that is not a directory.
    NotADirectory,
    /// The directory already holds an entry with this name.
    EntryExists,
    /// The entry name exceeds the fixed name field.
    NameTooLong,
    /// The volume has fewer free blocks than requested.
    NoFreeBlocks,
    /// The inode table has no free slot left.
    NoFreeInodes,
    /// The open-file table is full.
    TooManyOpenFiles,
    /// The dispatch layer's registration table is full.
    TooManyFileSystems,
    /// No open file with this descriptor id.
    BadDescriptor,
    /// The inode's block address table cannot grow any further.
    FileTooLarge,
    /// On-disk structures do not decode to a consistent volume.
    Corrupted,
    /// The operation is declared but not provided by this core.
    Unsupported,
    /// The sector device reported an error.
    Io(io::Error),
}

impl FsError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsError::InvalidArgument => "invalid argument",
            FsError::NotFound => "not found",
            FsError::NotADirectory => "not a directory",
            FsError::EntryExists => "entry already exists",
            FsError::NameTooLong => "name too long",
            FsError::NoFreeBlocks => "no free blocks",
            FsError::NoFreeInodes => "no free inodes",
            FsError::TooManyOpenFiles => "too many open files",
            FsError::TooManyFileSystems => "too many file systems",
            FsError::BadDescriptor => "bad file descriptor",
            FsError::FileTooLarge => "file too large",
            FsError::Corrupted => "corrupted volume",
            FsError::Unsupported => "operation not supported",
            FsError::Io(_) => "device i/o error",
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::Io(err) => write!(f, "device i/o error: {err}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
