use alloc::sync::Arc;

/// In-core reference to a directory, shared between processes.
///
/// The file system owns the inode; a process only holds a counted
/// reference to its current directory.
#[derive(Debug)]
pub struct Inode {
    pub id: u64,
}

pub type InodeRef = Arc<Inode>;

/// Root directory inode number.
pub const ROOTINO: u64 = 1;

impl Inode {
    pub fn root() -> InodeRef {
        Arc::new(Inode { id: ROOTINO })
    }
}

/// Take another reference to `ip`.
pub fn idup(ip: &InodeRef) -> InodeRef {
    Arc::clone(ip)
}

/// Drop a reference to `ip`.
pub fn iput(ip: InodeRef) {
    drop(ip);
}
