use crate::dir::Directory;
use crate::disk::Disk;
use crate::error::FsError;
use crate::inode::{FileType, Inode, InodeOps};
use crate::superblock::SuperBlock;

/// Splits `path` into its name components.
///
/// Empty components, `.` and `..` are discarded: the resolver only ever walks
/// downward from the root, so `/a//./b` and `/a/b` name the same file.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect()
}

/// Outcome of resolving a path to its terminal component.
#[derive(Debug)]
pub enum Resolved {
    /// The terminal file exists.
    Found(Inode),
    /// The terminal entry is absent; `open` may create it in this parent.
    Missing { parent: Inode },
}

/// Walks `components` downward from the root directory.
///
/// Every component but the last must name a directory; the walk aborts on a
/// missing component or a type mismatch. The terminal component is looked up
/// in the final directory, and its absence is not an error: the parent is
/// handed back so the caller can create the file in place.
pub fn resolve(
    disk: &mut dyn Disk,
    sb: &SuperBlock,
    root: &Inode,
    components: &[&str],
) -> Result<Resolved, FsError> {
    let (name, dirs) = components.split_last().ok_or(FsError::InvalidArgument)?;

    let mut current = root.clone();
    for component in dirs {
        let dir = Directory::load(disk, sb, &current)?;
        let num = dir.find(component).ok_or(FsError::NotFound)?;
        current = Inode::load(num, disk)?;
        if current.file_type() != FileType::DIR {
            return Err(FsError::NotADirectory);
        }
    }

    let dir = Directory::load(disk, sb, &current)?;
    match dir.find(name) {
        Some(num) => Ok(Resolved::Found(Inode::load(num, disk)?)),
        None => Ok(Resolved::Missing { parent: current }),
    }
}
