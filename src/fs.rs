use crate::bitmap::{BLOCK_FREE, BLOCK_USED, Bitmap};
use crate::block::{read_block, write_block};
use crate::dir;
use crate::disk::{Disk, SECTOR_SIZE};
use crate::error::FsError;
use crate::file::{FileDescriptor, FileTable};
use crate::inode::{
    FileType, INODE_AREA_BEGIN_SECTOR, INODES_PER_SECTOR, Inode, InodeOps, ROOT_INODE,
};
use crate::path::{self, Resolved};
use crate::superblock::SuperBlock;
use crate::vfs::FileSystemOps;

/// The inode table gets one slot for every 8 blocks of the volume.
const BLOCKS_PER_INODE: u32 = 8;

/// Per-volume state loaded from disk: the superblock, the free-block bitmap
/// and the root inode.
#[derive(Debug)]
struct FsData {
    superblock: SuperBlock,
    bitmap: Bitmap,
    root: Inode,
}

/// A WillianFS volume on a sector device.
///
/// Owns the device and every piece of volume state; all operations run
/// synchronously against the disk and complete before returning. The volume
/// caches are populated lazily by the first operation that needs them and
/// rebuilt by [`format`](Self::format).
#[derive(Debug)]
pub struct WillianFs<D: Disk> {
    disk: D,
    data: Option<FsData>,
    files: FileTable,
}

impl<D: Disk> WillianFs<D> {
    pub fn new(disk: D) -> Self {
        Self {
            disk,
            data: None,
            files: FileTable::new(),
        }
    }

    /// Formats the device with blocks of `block_size` bytes and returns the
    /// total number of blocks.
    ///
    /// Lays out the volume head to tail: inode table, free-block bitmap, then
    /// the root directory's first block; everything the layout itself
    /// occupies is marked in the bitmap.
    pub fn format(&mut self, block_size: u32) -> Result<u32, FsError> {
        if block_size == 0 || block_size % SECTOR_SIZE as u32 != 0 {
            return Err(FsError::InvalidArgument);
        }
        let num_sectors = self.disk.size_in_sectors();
        let num_blocks =
            ((num_sectors as u64 * SECTOR_SIZE as u64) / block_size as u64) as u32;
        let num_inodes = num_blocks / BLOCKS_PER_INODE;
        if num_inodes == 0 {
            return Err(FsError::InvalidArgument);
        }

        // Whatever was cached describes the previous volume.
        self.data = None;

        let mut root = None;
        for num in 1..=num_inodes {
            let inode = Inode::create(num, &mut self.disk)?;
            if num == ROOT_INODE {
                root = Some(inode);
            }
        }
        let mut root = root.ok_or(FsError::Corrupted)?;

        // Reserve every block overlapping the inode area, then the bitmap
        // itself right after it.
        let inode_sectors = num_inodes.div_ceil(INODES_PER_SECTOR);
        let inodes_blocks = ((INODE_AREA_BEGIN_SECTOR + inode_sectors) as u64
            * SECTOR_SIZE as u64)
            .div_ceil(block_size as u64) as u32;
        let bitmap_blocks = num_blocks.div_ceil(block_size);
        if inodes_blocks + bitmap_blocks >= num_blocks {
            return Err(FsError::InvalidArgument);
        }

        let superblock = SuperBlock {
            block_size,
            num_blocks,
            num_inodes,
            bitmap_block: inodes_blocks,
        };
        let mut bitmap = Bitmap::new(num_blocks);
        let reserved: Vec<u32> = (0..inodes_blocks + bitmap_blocks).collect();
        bitmap.set_blocks_status(&reserved, BLOCK_USED)?;

        superblock.save(&mut self.disk)?;
        bitmap.save(&mut self.disk, &superblock)?;

        dir::create_directory(&mut self.disk, &superblock, &mut bitmap, &mut root)?;
        dir::add_self_entry(&mut self.disk, &superblock, &mut bitmap, &mut root, "..")?;

        log::debug!(
            "formatted volume: {num_blocks} blocks of {block_size} bytes, {num_inodes} inodes"
        );
        self.data = Some(FsData {
            superblock,
            bitmap,
            root,
        });
        Ok(num_blocks)
    }

    /// Loads the superblock, bitmap and root inode on first use; when they
    /// are already cached there is nothing to do.
    fn ensure_loaded(&mut self) -> Result<(), FsError> {
        if self.data.is_some() {
            return Ok(());
        }
        let superblock = SuperBlock::load(&mut self.disk)?;
        let bitmap = Bitmap::load(&mut self.disk, &superblock)?;
        let root = Inode::load(ROOT_INODE, &mut self.disk)?;
        if root.file_type() != FileType::DIR {
            log::warn!("root inode is not a directory");
            return Err(FsError::Corrupted);
        }
        log::debug!(
            "loaded volume: {} blocks of {} bytes",
            superblock.num_blocks,
            superblock.block_size
        );
        self.data = Some(FsData {
            superblock,
            bitmap,
            root,
        });
        Ok(())
    }

    fn parts(&mut self) -> Result<(&mut D, &mut FsData, &mut FileTable), FsError> {
        self.ensure_loaded()?;
        let data = self.data.as_mut().ok_or(FsError::Corrupted)?;
        Ok((&mut self.disk, data, &mut self.files))
    }

    /// Opens the regular file at the absolute `path`, creating it when the
    /// terminal component does not exist.
    ///
    /// Returns the file's descriptor id; opening an already-open file hands
    /// back the existing descriptor, preserving its cursor.
    pub fn open(&mut self, path: &str) -> Result<u32, FsError> {
        let components = path::split_path(path);
        if components.is_empty() {
            return Err(FsError::InvalidArgument);
        }
        let (disk, data, files) = self.parts()?;
        let FsData {
            superblock,
            bitmap,
            root,
        } = data;

        let inode = match path::resolve(disk, superblock, root, &components)? {
            Resolved::Found(inode) => inode,
            Resolved::Missing { mut parent } => {
                let name = *components.last().ok_or(FsError::InvalidArgument)?;
                let num = Inode::find_free(disk, ROOT_INODE + 1, superblock.num_inodes)?
                    .ok_or(FsError::NoFreeInodes)?;
                let mut inode = Inode::create(num, disk)?;
                inode.set_file_type(FileType::REGULAR);
                inode.set_file_size(0);

                // A regular file owns a first data block even while empty.
                let staged = bitmap.find_free_blocks(1)?;
                let zeroed = vec![0u8; superblock.block_size as usize];
                write_block(disk, superblock.block_size, staged[0], &zeroed)?;
                inode.add_block(disk, superblock, bitmap, staged[0])?;
                bitmap.set_blocks_status(&staged, BLOCK_USED)?;

                dir::add_entry(disk, superblock, bitmap, &mut parent, &mut inode, name)?;
                if parent.number() == ROOT_INODE {
                    *root = parent;
                }
                log::debug!("created {path:?} as inode {num}");
                inode
            }
        };

        if let Some(fd) = files.find_by_inode(inode.number()) {
            return Ok(fd);
        }
        files.create(inode)
    }

    /// Reads from the descriptor's cursor into `buf`.
    ///
    /// A read past the end of the file is truncated, not an error; the return
    /// value is the number of bytes actually copied.
    pub fn read(&mut self, fd: u32, buf: &mut [u8]) -> Result<usize, FsError> {
        let (disk, data, files) = self.parts()?;
        let superblock = &data.superblock;
        let desc = files.get_mut(fd).ok_or(FsError::BadDescriptor)?;

        let block_size = superblock.block_size;
        let n = (buf.len() as u32).min(desc.inode.file_size().saturating_sub(desc.cursor));
        let mut scratch = vec![0u8; block_size as usize];
        let mut total = 0u32;
        while total < n {
            let offset = desc.cursor + total;
            let index = offset / block_size;
            let within = (offset % block_size) as usize;
            let chunk = ((n - total).min(block_size - within as u32)) as usize;

            let fetched = match desc.inode.block_addr(disk, superblock, index) {
                Ok(Some(addr)) => read_block(disk, block_size, addr, &mut scratch),
                Ok(None) => Err(FsError::Corrupted),
                Err(err) => Err(err),
            };
            if let Err(err) = fetched {
                // A fault after the first byte reports a short read instead.
                if total == 0 {
                    return Err(err);
                }
                break;
            }
            buf[total as usize..total as usize + chunk]
                .copy_from_slice(&scratch[within..within + chunk]);
            total += chunk as u32;
        }
        desc.cursor += total;
        Ok(total as usize)
    }

    /// Writes `buf` at the descriptor's cursor, allocating blocks as needed.
    ///
    /// Data blocks reach the disk before the inode, and the inode before the
    /// bitmap, so an interruption can lose the write but never leak a block.
    pub fn write(&mut self, fd: u32, buf: &[u8]) -> Result<usize, FsError> {
        let (disk, data, files) = self.parts()?;
        let FsData {
            superblock,
            bitmap,
            root,
        } = data;
        let desc = files.get_mut(fd).ok_or(FsError::BadDescriptor)?;
        if buf.is_empty() {
            return Ok(0);
        }

        // A file opened through this core always owns its first block; an
        // inode without one is not writable.
        if desc.inode.block_addr(disk, superblock, 0)?.is_none() {
            return Err(FsError::Corrupted);
        }

        let block_size = superblock.block_size;
        let n = buf.len() as u32;
        let cursor = desc.cursor;
        let first_index = cursor / block_size;
        let last_index = (cursor + n - 1) / block_size;

        // Stage every block the write needs in one scan, so exhaustion is
        // detected before anything is touched.
        let mut missing = 0;
        for index in first_index..=last_index {
            if desc.inode.block_addr(disk, superblock, index)?.is_none() {
                missing += 1;
            }
        }
        let staged = bitmap.find_free_blocks(missing)?;
        bitmap.set_blocks_status(&staged, BLOCK_USED)?;

        match write_blocks(disk, superblock, bitmap, desc, buf, &staged) {
            Ok(()) => {
                let new_size = desc.inode.file_size().max(cursor + n);
                desc.inode.set_file_size(new_size);
                desc.inode.save(disk)?;
                bitmap.save(disk, superblock)?;
                desc.cursor += n;
                if desc.inode.number() == ROOT_INODE {
                    *root = desc.inode.clone();
                }
                Ok(n as usize)
            }
            Err(err) => {
                // Nothing was committed: release the staged marks and fall
                // back to the on-disk inode.
                bitmap.set_blocks_status(&staged, BLOCK_FREE)?;
                desc.inode = Inode::load(desc.inode.number(), disk)?;
                Err(err)
            }
        }
    }

    /// Closes `fd`, dropping its inode copy.
    pub fn close(&mut self, fd: u32) -> Result<(), FsError> {
        self.files.remove(fd)
    }

    /// Whether no file is currently open.
    pub fn is_idle(&self) -> bool {
        self.files.is_empty()
    }
}

/// Writes `buf` block by block at the descriptor's cursor, linking staged
/// blocks into the inode as they are consumed.
fn write_blocks(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    bitmap: &mut Bitmap,
    desc: &mut FileDescriptor,
    buf: &[u8],
    staged: &[u32],
) -> Result<(), FsError> {
    let block_size = sb.block_size;
    let mut staged = staged.iter().copied();
    let mut scratch = vec![0u8; block_size as usize];
    let mut total = 0usize;
    while total < buf.len() {
        let offset = desc.cursor + total as u32;
        let index = offset / block_size;
        let within = (offset % block_size) as usize;
        let chunk = (buf.len() - total).min(block_size as usize - within);
        let slice = &buf[total..total + chunk];

        match desc.inode.block_addr(disk, sb, index)? {
            Some(addr) => {
                if chunk == block_size as usize {
                    write_block(disk, block_size, addr, slice)?;
                } else {
                    // Partial update of a live block: read-modify-write to
                    // keep the bytes around it.
                    read_block(disk, block_size, addr, &mut scratch)?;
                    scratch[within..within + chunk].copy_from_slice(slice);
                    write_block(disk, block_size, addr, &scratch)?;
                }
            }
            None => {
                let addr = staged.next().ok_or(FsError::NoFreeBlocks)?;
                scratch.fill(0);
                scratch[within..within + chunk].copy_from_slice(slice);
                write_block(disk, block_size, addr, &scratch)?;
                desc.inode.add_block(disk, sb, bitmap, addr)?;
            }
        }
        total += chunk;
    }
    Ok(())
}

impl<D: Disk> FileSystemOps for WillianFs<D> {
    fn fsid(&self) -> u32 {
        1
    }

    fn fsname(&self) -> &'static str {
        "WillianFS"
    }

    fn is_idle(&self) -> bool {
        WillianFs::is_idle(self)
    }

    fn format(&mut self, block_size: u32) -> Result<u32, FsError> {
        WillianFs::format(self, block_size)
    }

    fn open(&mut self, path: &str) -> Result<u32, FsError> {
        WillianFs::open(self, path)
    }

    fn read(&mut self, fd: u32, buf: &mut [u8]) -> Result<usize, FsError> {
        WillianFs::read(self, fd, buf)
    }

    fn write(&mut self, fd: u32, buf: &[u8]) -> Result<usize, FsError> {
        WillianFs::write(self, fd, buf)
    }

    fn close(&mut self, fd: u32) -> Result<(), FsError> {
        WillianFs::close(self, fd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::{Directory, ENTRY_SIZE};
    use crate::disk::MemDisk;
    use crate::file::MAX_OPEN_FILES;

    const MIB: u32 = 2048; // sectors in 1 MiB

    fn fresh_volume(sectors: u32, block_size: u32) -> WillianFs<MemDisk> {
        let mut fs = WillianFs::new(MemDisk::new(sectors));
        fs.format(block_size).unwrap();
        fs
    }

    #[test]
    fn format_reports_volume_geometry() {
        let mut fs = WillianFs::new(MemDisk::new(MIB));
        assert_eq!(fs.format(1024).unwrap(), 1024);
        assert!(fs.is_idle());

        // The persisted superblock matches what format computed.
        let sb = SuperBlock::load(&mut fs.disk).unwrap();
        assert_eq!(sb.block_size, 1024);
        assert_eq!(sb.num_blocks, 1024);
        assert_eq!(sb.num_inodes, 128);
        // 128 inodes fill 16 sectors after the superblock; 17 sectors round
        // up to 9 blocks, so the bitmap lands at block 9.
        assert_eq!(sb.bitmap_block, 9);
    }

    #[test]
    fn format_rejects_bad_block_sizes() {
        let mut fs = WillianFs::new(MemDisk::new(MIB));
        assert!(matches!(fs.format(0), Err(FsError::InvalidArgument)));
        assert!(matches!(fs.format(1000), Err(FsError::InvalidArgument)));
        assert!(matches!(fs.format(256), Err(FsError::InvalidArgument)));
    }

    #[test]
    fn root_directory_points_at_itself() {
        let mut fs = fresh_volume(MIB, 1024);
        let (disk, data, _) = fs.parts().unwrap();
        assert_eq!(data.root.number(), ROOT_INODE);
        assert_eq!(data.root.ref_count(), 2);

        let dir = Directory::load(disk, &data.superblock, &data.root).unwrap();
        assert_eq!(dir.num_entries(), 2);
        assert_eq!(dir.find("."), Some(ROOT_INODE));
        assert_eq!(dir.find(".."), Some(ROOT_INODE));
        assert_eq!(
            data.root.file_size(),
            4 + 2 * ENTRY_SIZE as u32
        );
    }

    #[test]
    fn open_creates_the_file_and_reuses_the_descriptor() {
        let mut fs = fresh_volume(MIB, 1024);

        let fd = fs.open("/hello").unwrap();
        assert_eq!(fd, 1);
        assert!(!fs.is_idle());

        // The file landed in the root directory on the first free inode.
        let (disk, data, _) = fs.parts().unwrap();
        let dir = Directory::load(disk, &data.superblock, &data.root).unwrap();
        assert_eq!(dir.find("hello"), Some(2));
        let inode = Inode::load(2, disk).unwrap();
        assert_eq!(inode.file_type(), FileType::REGULAR);
        assert_eq!(inode.file_size(), 0);
        assert_eq!(inode.ref_count(), 1);

        // A second open of the same path reuses the live descriptor.
        assert_eq!(fs.open("/hello").unwrap(), fd);
        assert_eq!(fs.files.len(), 1);
    }

    #[test]
    fn a_full_table_still_returns_existing_descriptors() {
        let mut fs = fresh_volume(MIB, 1024);
        let mut fds = Vec::new();
        for i in 0..MAX_OPEN_FILES {
            fds.push(fs.open(&format!("/f{i}")).unwrap());
        }

        // Reopening an open file needs no new slot, so capacity does not
        // gate it.
        assert_eq!(fs.open("/f0").unwrap(), fds[0]);

        // A file without a live descriptor does need one.
        assert!(matches!(
            fs.open("/brand-new"),
            Err(FsError::TooManyOpenFiles)
        ));
        fs.close(fds[0]).unwrap();
        assert!(fs.open("/brand-new").is_ok());
    }

    #[test]
    fn reopening_after_close_issues_a_fresh_descriptor() {
        let mut fs = fresh_volume(MIB, 1024);
        let fd = fs.open("/a").unwrap();
        fs.write(fd, b"cursor moves").unwrap();
        fs.close(fd).unwrap();
        assert!(fs.is_idle());

        let fd2 = fs.open("/a").unwrap();
        assert_ne!(fd2, fd);
        // The new descriptor starts at the beginning of the file.
        let mut buf = [0u8; 6];
        assert_eq!(fs.read(fd2, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"cursor");
    }

    #[test]
    fn close_rejects_unknown_descriptors() {
        let mut fs = fresh_volume(MIB, 1024);
        assert!(matches!(fs.close(7), Err(FsError::BadDescriptor)));
        let fd = fs.open("/x").unwrap();
        fs.close(fd).unwrap();
        assert!(matches!(fs.close(fd), Err(FsError::BadDescriptor)));
    }

    #[test]
    fn small_write_survives_a_reopen() {
        let mut fs = fresh_volume(MIB, 1024);
        let payload = b"the quick brown fox";

        let fd = fs.open("/note").unwrap();
        assert_eq!(fs.write(fd, payload).unwrap(), payload.len());
        fs.close(fd).unwrap();

        let fd = fs.open("/note").unwrap();
        let mut buf = vec![0u8; payload.len()];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), payload.len());
        assert_eq!(&buf, payload);
    }

    #[test]
    fn multi_block_payload_round_trip() {
        let mut fs = fresh_volume(MIB, 1024);
        let payload: Vec<u8> = (0..3000u32).map(|i| (i % 241) as u8).collect();

        let fd = fs.open("/big").unwrap();
        assert_eq!(fs.write(fd, &payload).unwrap(), payload.len());
        fs.close(fd).unwrap();

        let fd = fs.open("/big").unwrap();
        let (disk, data, files) = fs.parts().unwrap();
        let desc = files.get_mut(fd).unwrap();
        assert_eq!(desc.inode.file_size(), 3000);
        // 3000 bytes at 1024 per block occupy exactly three blocks.
        for index in 0..3 {
            assert!(
                desc.inode
                    .block_addr(disk, &data.superblock, index)
                    .unwrap()
                    .is_some()
            );
        }
        assert!(
            desc.inode
                .block_addr(disk, &data.superblock, 3)
                .unwrap()
                .is_none()
        );

        let mut buf = vec![0u8; 4096];
        // Reading more than the file holds is truncated to the file size.
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 3000);
        assert_eq!(&buf[..3000], &payload[..]);
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    }

    #[test]
    fn overwriting_does_not_inflate_the_size() {
        let mut fs = fresh_volume(MIB, 1024);
        let fd = fs.open("/f").unwrap();
        fs.write(fd, &[7u8; 100]).unwrap();
        fs.close(fd).unwrap();

        let fd = fs.open("/f").unwrap();
        fs.write(fd, &[9u8; 40]).unwrap();
        let (_, _, files) = fs.parts().unwrap();
        let desc = files.get_mut(fd).unwrap();
        // Overwriting the head leaves the size at the high-water mark.
        assert_eq!(desc.inode.file_size(), 100);

        fs.close(fd).unwrap();
        let fd = fs.open("/f").unwrap();
        let mut buf = vec![0u8; 128];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 100);
        assert_eq!(&buf[..40], &[9u8; 40][..]);
        assert_eq!(&buf[40..100], &[7u8; 60][..]);
    }

    #[test]
    fn sequential_writes_append_across_blocks() {
        let mut fs = fresh_volume(MIB, 1024);
        let fd = fs.open("/log").unwrap();
        for i in 0..10u8 {
            fs.write(fd, &[i; 300]).unwrap();
        }
        fs.close(fd).unwrap();

        let fd = fs.open("/log").unwrap();
        let mut buf = vec![0u8; 3000];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 3000);
        for i in 0..10u8 {
            assert!(buf[i as usize * 300..(i as usize + 1) * 300]
                .iter()
                .all(|&b| b == i));
        }
    }

    #[test]
    fn write_failure_rolls_the_staging_back() {
        // A deliberately tiny volume: 16 KiB in 512-byte blocks leaves a
        // handful of data blocks after the reserved head.
        let mut fs = fresh_volume(32, 512);
        let free_before = {
            let (_, data, _) = fs.parts().unwrap();
            (0..data.superblock.num_blocks)
                .filter(|&b| !data.bitmap.is_used(b))
                .count()
        };

        let fd = fs.open("/fill").unwrap();
        // Far more than the volume can hold.
        assert!(matches!(
            fs.write(fd, &vec![1u8; 64 * 1024]),
            Err(FsError::NoFreeBlocks)
        ));

        // The failed write marked nothing; one block went to the file itself
        // at open time.
        let free_after = {
            let (_, data, _) = fs.parts().unwrap();
            (0..data.superblock.num_blocks)
                .filter(|&b| !data.bitmap.is_used(b))
                .count()
        };
        assert_eq!(free_after, free_before - 1);

        // The volume still works within its means.
        assert_eq!(fs.write(fd, &[2u8; 512]).unwrap(), 512);
    }

    #[test]
    fn directory_entries_survive_block_straddling() {
        // 512-byte blocks make the 259-byte entries straddle early and often.
        let mut fs = fresh_volume(MIB, 512);
        let names: Vec<String> = (0..12).map(|i| format!("file-{i:02}")).collect();
        for name in &names {
            let fd = fs.open(&format!("/{name}")).unwrap();
            fs.close(fd).unwrap();
        }

        // Every file is found again by name, with its own inode.
        let mut seen = std::collections::HashSet::new();
        for name in &names {
            let fd = fs.open(&format!("/{name}")).unwrap();
            let (_, _, files) = fs.parts().unwrap();
            let num = files.get_mut(fd).unwrap().inode.number();
            assert!(seen.insert(num), "inode {num} reused for {name}");
            fs.close(fd).unwrap();
        }
    }

    #[test]
    fn every_live_block_is_marked_in_the_bitmap() {
        let mut fs = fresh_volume(MIB, 1024);
        let fd = fs.open("/a").unwrap();
        fs.write(fd, &[3u8; 5000]).unwrap();
        let fd_b = fs.open("/b").unwrap();
        fs.write(fd_b, &[4u8; 100]).unwrap();

        let (disk, data, _) = fs.parts().unwrap();
        let sb = data.superblock;
        for num in 1..=sb.num_inodes {
            let inode = Inode::load(num, disk).unwrap();
            if inode.file_type() == FileType::FREE {
                continue;
            }
            for index in 0.. {
                match inode.block_addr(disk, &sb, index).unwrap() {
                    Some(block) => assert!(
                        data.bitmap.is_used(block),
                        "inode {num} block {block} not marked"
                    ),
                    None => break,
                }
            }
        }
    }

    #[test]
    fn multi_block_bitmap_is_fully_reserved() {
        // 2048 blocks of 512 bytes need a 2048-byte bitmap spanning four
        // blocks; every one of them must be reserved or format would hand
        // the bitmap's own tail out as data blocks.
        let mut fs = fresh_volume(MIB, 512);
        let (disk, data, _) = fs.parts().unwrap();
        let sb = data.superblock;
        assert_eq!(sb.bitmap_block, 33);
        for block in 33..37 {
            assert!(data.bitmap.is_used(block), "bitmap block {block} not marked");
        }

        // The root directory's first block lands right after the bitmap.
        assert_eq!(data.root.block_addr(disk, &sb, 0).unwrap(), Some(37));

        // The on-disk copy decodes to the same map.
        let loaded = Bitmap::load(disk, &sb).unwrap();
        for block in 0..sb.num_blocks {
            assert_eq!(loaded.is_used(block), data.bitmap.is_used(block));
        }
    }

    #[test]
    fn opening_nested_missing_directories_fails() {
        let mut fs = fresh_volume(MIB, 1024);
        assert!(matches!(
            fs.open("/no/such/dir/file"),
            Err(FsError::NotFound)
        ));
        assert!(matches!(fs.open("/"), Err(FsError::InvalidArgument)));
        assert!(matches!(fs.open(""), Err(FsError::InvalidArgument)));
    }

    #[test]
    fn unformatted_volume_refuses_to_open() {
        let mut fs = WillianFs::new(MemDisk::new(MIB));
        assert!(matches!(fs.open("/x"), Err(FsError::Corrupted)));
    }

    #[test]
    fn vfs_facade_reports_identity_and_stubs() {
        let mut fs = fresh_volume(MIB, 1024);
        let ops: &mut dyn FileSystemOps = &mut fs;
        assert_eq!(ops.fsid(), 1);
        assert_eq!(ops.fsname(), "WillianFS");
        assert!(ops.is_idle());
        assert!(matches!(ops.opendir("/"), Err(FsError::Unsupported)));
        assert!(matches!(ops.readdir(1), Err(FsError::Unsupported)));
        assert!(matches!(ops.link(1, "x", 2), Err(FsError::Unsupported)));
        assert!(matches!(ops.unlink(1, "x"), Err(FsError::Unsupported)));
        assert!(matches!(ops.closedir(1), Err(FsError::Unsupported)));
    }
}
