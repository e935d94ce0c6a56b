use crate::disk::{Disk, SECTOR_SIZE};
use crate::error::FsError;
use crate::inode::INODE_AREA_BEGIN_SECTOR;

/// Writes `buf` into block `block`.
///
/// A block spans `block_size / SECTOR_SIZE` consecutive sectors starting at
/// `block * sectors_per_block`. `buf` may be shorter than a block; only the
/// sectors it covers are written, with the final sector zero-filled past the
/// end of `buf`.
///
/// Blocks whose first sector falls before the inode area are rejected, which
/// keeps the superblock out of reach of data writes.
pub fn write_block(
    disk: &mut dyn Disk,
    block_size: u32,
    block: u32,
    buf: &[u8],
) -> Result<(), FsError> {
    if buf.len() > block_size as usize {
        return Err(FsError::InvalidArgument);
    }
    let sectors_per_block = block_size / SECTOR_SIZE as u32;
    let first_sector = block * sectors_per_block;
    if first_sector < INODE_AREA_BEGIN_SECTOR {
        return Err(FsError::InvalidArgument);
    }

    let mut sector = [0u8; SECTOR_SIZE];
    for (i, chunk) in buf.chunks(SECTOR_SIZE).enumerate() {
        sector.fill(0);
        sector[..chunk.len()].copy_from_slice(chunk);
        disk.write_sector(first_sector + i as u32, &sector)?;
    }
    Ok(())
}

/// Reads the first `buf.len()` bytes of block `block` into `buf`.
pub fn read_block(
    disk: &mut dyn Disk,
    block_size: u32,
    block: u32,
    buf: &mut [u8],
) -> Result<(), FsError> {
    if buf.len() > block_size as usize {
        return Err(FsError::InvalidArgument);
    }
    let sectors_per_block = block_size / SECTOR_SIZE as u32;
    let first_sector = block * sectors_per_block;

    let mut sector = [0u8; SECTOR_SIZE];
    for (i, chunk) in buf.chunks_mut(SECTOR_SIZE).enumerate() {
        disk.read_sector(first_sector + i as u32, &mut sector)?;
        chunk.copy_from_slice(&sector[..chunk.len()]);
    }
    Ok(())
}
