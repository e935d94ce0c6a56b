use static_assertions::const_assert;

use crate::disk::{Disk, SECTOR_SIZE};
use crate::error::FsError;

/// Sector holding the superblock.
pub const SUPERBLOCK_SECTOR: u32 = 0;

// The four header words must fit in the superblock sector.
const_assert!(4 * size_of::<u32>() <= SECTOR_SIZE);

/// Volume header stored at sector 0 as four little-endian words.
///
/// Written once by `format`; never mutated at runtime. The remainder of the
/// sector is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// Bytes per filesystem block, a multiple of `SECTOR_SIZE`.
    pub block_size: u32,
    /// Total number of blocks on the volume.
    pub num_blocks: u32,
    /// Number of inodes in the inode table.
    pub num_inodes: u32,
    /// Index of the first block of the free-block bitmap.
    pub bitmap_block: u32,
}

impl SuperBlock {
    /// Reads and decodes the superblock from sector 0.
    pub fn load(disk: &mut dyn Disk) -> Result<Self, FsError> {
        let mut sector = [0u8; SECTOR_SIZE];
        disk.read_sector(SUPERBLOCK_SECTOR, &mut sector)?;

        let mut words = [0u32; 4];
        for (i, word) in words.iter_mut().enumerate() {
            *word = u32::from_le_bytes(sector[i * 4..i * 4 + 4].try_into().unwrap());
        }
        let sb = Self {
            block_size: words[0],
            num_blocks: words[1],
            num_inodes: words[2],
            bitmap_block: words[3],
        };

        if sb.block_size < SECTOR_SIZE as u32
            || sb.block_size % SECTOR_SIZE as u32 != 0
            || sb.num_blocks == 0
        {
            log::warn!(
                "superblock rejected: block_size={} num_blocks={}",
                sb.block_size,
                sb.num_blocks
            );
            return Err(FsError::Corrupted);
        }
        Ok(sb)
    }

    /// Encodes the four words into sector 0.
    pub fn save(&self, disk: &mut dyn Disk) -> Result<(), FsError> {
        let mut sector = [0u8; SECTOR_SIZE];
        let words = [
            self.block_size,
            self.num_blocks,
            self.num_inodes,
            self.bitmap_block,
        ];
        for (i, word) in words.iter().enumerate() {
            sector[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        disk.write_sector(SUPERBLOCK_SECTOR, &sector)?;
        Ok(())
    }

    /// Number of consecutive sectors in one block.
    pub fn sectors_per_block(&self) -> u32 {
        self.block_size / SECTOR_SIZE as u32
    }
}
