use crate::bitmap::{BLOCK_USED, Bitmap};
use crate::block::{read_block, write_block};
use crate::disk::{Disk, SECTOR_SIZE};
use crate::error::FsError;
use crate::inode::{FileType, Inode, InodeOps};
use crate::superblock::SuperBlock;

/// Maximum length of a directory entry name, in bytes.
pub const MAX_FILENAME_LENGTH: usize = 255;
/// Serialized size of one directory entry.
pub const ENTRY_SIZE: usize = size_of::<u32>() + MAX_FILENAME_LENGTH;

/// One packed directory entry: an inode number followed by a fixed-width,
/// NUL-padded name field.
///
/// A name of exactly `MAX_FILENAME_LENGTH` bytes fills the field with no
/// terminator. Entries are densely packed after the directory's `num_entries`
/// word and may straddle block boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode_number: u32,
    pub name: [u8; MAX_FILENAME_LENGTH],
}

impl DirEntry {
    pub fn new(inode_number: u32, name: &str) -> Result<Self, FsError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.contains(&b'/') || bytes.contains(&0) {
            return Err(FsError::InvalidArgument);
        }
        if bytes.len() > MAX_FILENAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
        let mut name = [0u8; MAX_FILENAME_LENGTH];
        name[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { inode_number, name })
    }

    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut bytes = [0u8; ENTRY_SIZE];
        bytes[..4].copy_from_slice(&self.inode_number.to_le_bytes());
        bytes[4..].copy_from_slice(&self.name);
        bytes
    }

    pub fn decode(bytes: &[u8; ENTRY_SIZE]) -> Self {
        let inode_number = u32::from_le_bytes(bytes[..4].try_into().unwrap());
        let mut name = [0u8; MAX_FILENAME_LENGTH];
        name.copy_from_slice(&bytes[4..]);
        Self { inode_number, name }
    }

    /// Compares the padded name field against `name`.
    pub fn name_matches(&self, name: &str) -> bool {
        let end = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(MAX_FILENAME_LENGTH);
        &self.name[..end] == name.as_bytes()
    }
}

/// Decoded entry list of one directory.
#[derive(Debug)]
pub struct Directory {
    pub entries: Vec<DirEntry>,
}

impl Directory {
    /// Reads `dir_inode`'s content and decodes the packed entry list.
    pub fn load(
        disk: &mut dyn Disk,
        sb: &SuperBlock,
        dir_inode: &Inode,
    ) -> Result<Self, FsError> {
        if dir_inode.file_type() != FileType::DIR {
            return Err(FsError::NotADirectory);
        }

        let size = dir_inode.file_size() as usize;
        let block_size = sb.block_size as usize;
        let num_blocks = size.div_ceil(block_size);

        let mut buffer = vec![0u8; num_blocks * block_size];
        for i in 0..num_blocks {
            let block = dir_inode
                .block_addr(disk, sb, i as u32)?
                .ok_or(FsError::Corrupted)?;
            read_block(
                disk,
                sb.block_size,
                block,
                &mut buffer[i * block_size..(i + 1) * block_size],
            )?;
        }
        if size < size_of::<u32>() {
            return Err(FsError::Corrupted);
        }

        let num_entries = u32::from_le_bytes(buffer[..4].try_into().unwrap()) as usize;
        if 4 + num_entries * ENTRY_SIZE > buffer.len() {
            log::warn!(
                "directory inode {}: {num_entries} entries do not fit in {} bytes",
                dir_inode.number(),
                buffer.len()
            );
            return Err(FsError::Corrupted);
        }

        let mut entries = Vec::with_capacity(num_entries);
        let mut offset = size_of::<u32>();
        for _ in 0..num_entries {
            let bytes: &[u8; ENTRY_SIZE] = buffer[offset..offset + ENTRY_SIZE]
                .try_into()
                .map_err(|_| FsError::Corrupted)?;
            entries.push(DirEntry::decode(bytes));
            offset += ENTRY_SIZE;
        }
        Ok(Self { entries })
    }

    /// Looks `name` up in the entry list; `None` when absent.
    pub fn find(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.name_matches(name))
            .map(|entry| entry.inode_number)
    }

    pub fn num_entries(&self) -> u32 {
        self.entries.len() as u32
    }
}

/// Appends an entry for `entry_inode` under `name`, bumps its reference
/// count, and persists both inodes and the bitmap.
pub fn add_entry(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    bitmap: &mut Bitmap,
    dir_inode: &mut Inode,
    entry_inode: &mut Inode,
    name: &str,
) -> Result<(), FsError> {
    append_entry(disk, sb, bitmap, dir_inode, entry_inode.number(), name)?;
    entry_inode.set_ref_count(entry_inode.ref_count() + 1);
    entry_inode.save(disk)?;
    dir_inode.save(disk)?;
    bitmap.save(disk, sb)
}

/// [`add_entry`] for an entry that names the directory itself (`.`, and `..`
/// of the root), where the entry inode and the directory inode are one.
pub fn add_self_entry(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    bitmap: &mut Bitmap,
    dir_inode: &mut Inode,
    name: &str,
) -> Result<(), FsError> {
    append_entry(disk, sb, bitmap, dir_inode, dir_inode.number(), name)?;
    dir_inode.set_ref_count(dir_inode.ref_count() + 1);
    dir_inode.save(disk)?;
    bitmap.save(disk, sb)
}

/// Splices the serialized entry after the directory's last byte, growing the
/// directory by one block when the final block cannot hold it whole.
///
/// Updates `dir_inode`'s size and the on-disk `num_entries` word; the caller
/// saves the inodes and the bitmap.
fn append_entry(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    bitmap: &mut Bitmap,
    dir_inode: &mut Inode,
    entry_num: u32,
    name: &str,
) -> Result<(), FsError> {
    let dir = Directory::load(disk, sb, dir_inode)?;
    if dir.find(name).is_some() {
        return Err(FsError::EntryExists);
    }
    let bytes = DirEntry::new(entry_num, name)?.encode();

    let block_size = sb.block_size;
    let size = dir_inode.file_size();
    let offset = size % block_size;
    // A directory always holds at least its num_entries word, so a final
    // block exists; when it is exactly full its free space is zero.
    let (last_index, free) = if offset == 0 {
        (size / block_size - 1, 0)
    } else {
        (size / block_size, (block_size - offset) as usize)
    };
    let final_block = dir_inode
        .block_addr(disk, sb, last_index)?
        .ok_or(FsError::Corrupted)?;

    if free >= ENTRY_SIZE {
        let mut block = vec![0u8; block_size as usize];
        read_block(disk, block_size, final_block, &mut block)?;
        block[offset as usize..offset as usize + ENTRY_SIZE].copy_from_slice(&bytes);
        write_block(disk, block_size, final_block, &block)?;
    } else {
        // The entry straddles into a fresh block: its head fills the final
        // block's tail, the rest lands at the start of the new block.
        let staged = bitmap.find_free_blocks(1)?;
        let new_block = staged[0];

        let mut head = vec![0u8; block_size as usize];
        head[..ENTRY_SIZE - free].copy_from_slice(&bytes[free..]);
        write_block(disk, block_size, new_block, &head)?;

        if free > 0 {
            let mut block = vec![0u8; block_size as usize];
            read_block(disk, block_size, final_block, &mut block)?;
            block[offset as usize..].copy_from_slice(&bytes[..free]);
            write_block(disk, block_size, final_block, &block)?;
        }

        dir_inode.add_block(disk, sb, bitmap, new_block)?;
        bitmap.set_blocks_status(&staged, BLOCK_USED)?;
    }

    dir_inode.set_file_size(size + ENTRY_SIZE as u32);
    set_num_entries(disk, sb, dir_inode, dir.num_entries() + 1)
}

/// Rewrites the entry count at the head of the directory's first block.
fn set_num_entries(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    dir_inode: &Inode,
    count: u32,
) -> Result<(), FsError> {
    let block = dir_inode
        .block_addr(disk, sb, 0)?
        .ok_or(FsError::Corrupted)?;
    let first_sector = block * sb.sectors_per_block();

    let mut sector = [0u8; SECTOR_SIZE];
    disk.read_sector(first_sector, &mut sector)?;
    sector[..4].copy_from_slice(&count.to_le_bytes());
    disk.write_sector(first_sector, &sector)?;
    Ok(())
}

/// Turns a fresh inode into an empty directory holding only its `.` entry.
///
/// The parent linkage (`..`) is appended by the caller, which knows the
/// parent; for the root both entries point at the root itself.
pub fn create_directory(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    bitmap: &mut Bitmap,
    inode: &mut Inode,
) -> Result<(), FsError> {
    let staged = bitmap.find_free_blocks(1)?;
    let first_block = staged[0];

    // An empty entry list: num_entries = 0 and nothing after it.
    write_block(disk, sb.block_size, first_block, &0u32.to_le_bytes())?;

    inode.set_file_type(FileType::DIR);
    inode.set_file_size(size_of::<u32>() as u32);
    inode.set_permission(0);
    inode.set_owner(0);
    inode.set_group_owner(0);
    inode.add_block(disk, sb, bitmap, first_block)?;
    bitmap.set_blocks_status(&staged, BLOCK_USED)?;
    bitmap.save(disk, sb)?;

    add_self_entry(disk, sb, bitmap, inode, ".")
}
