use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert;

use crate::bitmap::{BLOCK_USED, Bitmap};
use crate::block::{read_block, write_block};
use crate::disk::{Disk, SECTOR_SIZE};
use crate::error::FsError;
use crate::superblock::SuperBlock;

/// First sector of the on-disk inode table.
pub const INODE_AREA_BEGIN_SECTOR: u32 = 1;
/// Number of direct block address slots in an inode.
pub const NDIRECT: usize = 9;
/// Inode number of the root directory.
pub const ROOT_INODE: u32 = 1;
/// Serialized inodes per sector.
pub const INODES_PER_SECTOR: u32 = (SECTOR_SIZE / size_of::<DiskInode>()) as u32;

// The inode record must tile the sector exactly, or the table offsets drift.
const_assert!(SECTOR_SIZE % size_of::<DiskInode>() == 0);

/// File type tag stored in an inode.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FileType(pub u32);

impl FileType {
    pub const FREE: Self = Self(0);
    pub const REGULAR: Self = Self(1);
    pub const DIR: Self = Self(2);
}

/// On-disk inode record (64 bytes, little-endian words).
///
/// `addrs` holds `NDIRECT` direct data block addresses plus one final slot
/// pointing at a single-indirect block of further addresses. Address 0 means
/// "no block": block 0 belongs to the superblock and is never allocated.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DiskInode {
    pub file_type: FileType,
    pub file_size: u32,
    pub ref_count: u32,
    pub owner: u32,
    pub group_owner: u32,
    pub permission: u32,
    pub addrs: [u32; NDIRECT + 1],
}

/// Capability set the core uses to manipulate an inode, independent of its
/// on-disk encoding.
pub trait InodeOps {
    fn number(&self) -> u32;
    fn file_type(&self) -> FileType;
    fn set_file_type(&mut self, file_type: FileType);
    fn file_size(&self) -> u32;
    fn set_file_size(&mut self, size: u32);
    fn ref_count(&self) -> u32;
    fn set_ref_count(&mut self, count: u32);
    fn owner(&self) -> u32;
    fn set_owner(&mut self, owner: u32);
    fn group_owner(&self) -> u32;
    fn set_group_owner(&mut self, group: u32);
    fn permission(&self) -> u32;
    fn set_permission(&mut self, permission: u32);

    /// Returns the address of the `i`-th data block, or `None` when the file
    /// has no block at that logical index.
    fn block_addr(
        &self,
        disk: &mut dyn Disk,
        sb: &SuperBlock,
        i: u32,
    ) -> Result<Option<u32>, FsError>;

    /// Appends `addr` to the block address list.
    ///
    /// When the direct slots are exhausted this grows a single-indirect table,
    /// allocating its block from `bitmap` in the same write-then-mark
    /// discipline as data blocks. The caller still owns persisting the inode
    /// and the bitmap.
    fn add_block(
        &mut self,
        disk: &mut dyn Disk,
        sb: &SuperBlock,
        bitmap: &mut Bitmap,
        addr: u32,
    ) -> Result<(), FsError>;
}

/// In-memory copy of an inode, identified by its 1-based table number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    num: u32,
    dinode: DiskInode,
}

/// Sector and in-sector byte offset of inode `num`.
fn locate(num: u32) -> (u32, usize) {
    let sector = INODE_AREA_BEGIN_SECTOR + (num - 1) / INODES_PER_SECTOR;
    let offset = ((num - 1) % INODES_PER_SECTOR) as usize * size_of::<DiskInode>();
    (sector, offset)
}

impl Inode {
    /// Writes a fresh, cleared inode record and returns its in-memory copy.
    pub fn create(num: u32, disk: &mut dyn Disk) -> Result<Self, FsError> {
        if num == 0 {
            return Err(FsError::InvalidArgument);
        }
        let inode = Self {
            num,
            dinode: DiskInode::zeroed(),
        };
        inode.save(disk)?;
        Ok(inode)
    }

    /// Reads inode `num` from the inode table.
    pub fn load(num: u32, disk: &mut dyn Disk) -> Result<Self, FsError> {
        if num == 0 {
            return Err(FsError::InvalidArgument);
        }
        let (sector, offset) = locate(num);
        let mut buf = [0u8; SECTOR_SIZE];
        disk.read_sector(sector, &mut buf)?;
        let dinode = bytemuck::pod_read_unaligned(&buf[offset..offset + size_of::<DiskInode>()]);
        Ok(Self { num, dinode })
    }

    /// Writes the in-memory copy back into the inode table.
    pub fn save(&self, disk: &mut dyn Disk) -> Result<(), FsError> {
        let (sector, offset) = locate(self.num);
        let mut buf = [0u8; SECTOR_SIZE];
        disk.read_sector(sector, &mut buf)?;
        buf[offset..offset + size_of::<DiskInode>()].copy_from_slice(bytemuck::bytes_of(&self.dinode));
        disk.write_sector(sector, &buf)?;
        Ok(())
    }

    /// Scans the table for a free inode number, starting at `start`.
    pub fn find_free(
        disk: &mut dyn Disk,
        start: u32,
        num_inodes: u32,
    ) -> Result<Option<u32>, FsError> {
        if start == 0 {
            return Err(FsError::InvalidArgument);
        }
        let mut buf = [0u8; SECTOR_SIZE];
        let mut loaded_sector = u32::MAX;
        for num in start..=num_inodes {
            let (sector, offset) = locate(num);
            if sector != loaded_sector {
                disk.read_sector(sector, &mut buf)?;
                loaded_sector = sector;
            }
            let dinode: DiskInode =
                bytemuck::pod_read_unaligned(&buf[offset..offset + size_of::<DiskInode>()]);
            if dinode.file_type == FileType::FREE {
                return Ok(Some(num));
            }
        }
        Ok(None)
    }
}

impl InodeOps for Inode {
    fn number(&self) -> u32 {
        self.num
    }

    fn file_type(&self) -> FileType {
        self.dinode.file_type
    }

    fn set_file_type(&mut self, file_type: FileType) {
        self.dinode.file_type = file_type;
    }

    fn file_size(&self) -> u32 {
        self.dinode.file_size
    }

    fn set_file_size(&mut self, size: u32) {
        self.dinode.file_size = size;
    }

    fn ref_count(&self) -> u32 {
        self.dinode.ref_count
    }

    fn set_ref_count(&mut self, count: u32) {
        self.dinode.ref_count = count;
    }

    fn owner(&self) -> u32 {
        self.dinode.owner
    }

    fn set_owner(&mut self, owner: u32) {
        self.dinode.owner = owner;
    }

    fn group_owner(&self) -> u32 {
        self.dinode.group_owner
    }

    fn set_group_owner(&mut self, group: u32) {
        self.dinode.group_owner = group;
    }

    fn permission(&self) -> u32 {
        self.dinode.permission
    }

    fn set_permission(&mut self, permission: u32) {
        self.dinode.permission = permission;
    }

    fn block_addr(
        &self,
        disk: &mut dyn Disk,
        sb: &SuperBlock,
        i: u32,
    ) -> Result<Option<u32>, FsError> {
        let i = i as usize;
        if i < NDIRECT {
            let addr = self.dinode.addrs[i];
            return Ok((addr != 0).then_some(addr));
        }

        let indirect = self.dinode.addrs[NDIRECT];
        if indirect == 0 {
            return Ok(None);
        }
        let index = i - NDIRECT;
        if index >= sb.block_size as usize / size_of::<u32>() {
            return Ok(None);
        }

        let mut table = vec![0u8; sb.block_size as usize];
        read_block(disk, sb.block_size, indirect, &mut table)?;
        let addr = u32::from_le_bytes(table[index * 4..index * 4 + 4].try_into().unwrap());
        Ok((addr != 0).then_some(addr))
    }

    fn add_block(
        &mut self,
        disk: &mut dyn Disk,
        sb: &SuperBlock,
        bitmap: &mut Bitmap,
        addr: u32,
    ) -> Result<(), FsError> {
        if addr == 0 {
            return Err(FsError::InvalidArgument);
        }
        for slot in self.dinode.addrs[..NDIRECT].iter_mut() {
            if *slot == 0 {
                *slot = addr;
                return Ok(());
            }
        }

        // Direct slots are full: go through the single-indirect table,
        // creating it on first use.
        let mut table = vec![0u8; sb.block_size as usize];
        let indirect = self.dinode.addrs[NDIRECT];
        let indirect = if indirect == 0 {
            let staged = bitmap.find_free_blocks(1)?;
            write_block(disk, sb.block_size, staged[0], &table)?;
            bitmap.set_blocks_status(&staged, BLOCK_USED)?;
            self.dinode.addrs[NDIRECT] = staged[0];
            staged[0]
        } else {
            read_block(disk, sb.block_size, indirect, &mut table)?;
            indirect
        };

        for offset in (0..table.len()).step_by(size_of::<u32>()) {
            let slot = u32::from_le_bytes(table[offset..offset + 4].try_into().unwrap());
            if slot == 0 {
                table[offset..offset + 4].copy_from_slice(&addr.to_le_bytes());
                return write_block(disk, sb.block_size, indirect, &table);
            }
        }
        Err(FsError::FileTooLarge)
    }
}
