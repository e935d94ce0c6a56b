//! WillianFS: a Unix-style filesystem inside a fixed-size block device.
//!
//! The device is a sequence of 512-byte sectors grouped into blocks. Sector 0
//! holds the superblock, the inode table follows, then the byte-per-block
//! free bitmap, and everything after that is the data pool. Directories are
//! ordinary files whose payload is a packed entry list, and the whole volume
//! hangs off inode 1, the root directory.
//!
//! [`fs::WillianFs`] ties the pieces together and exposes the operation set
//! (`format`, `open`, `read`, `write`, `close`); [`vfs::Vfs`] routes those
//! operations through a registration table, the way an operating system's
//! virtual filesystem layer would.

pub mod bitmap;
pub mod block;
pub mod dir;
pub mod disk;
pub mod error;
pub mod file;
pub mod fs;
pub mod inode;
pub mod path;
pub mod superblock;
pub mod vfs;

pub use disk::{Disk, FileDisk, MemDisk, SECTOR_SIZE};
pub use error::FsError;
pub use fs::WillianFs;
