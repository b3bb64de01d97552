//! File handles a process holds. The file system behind them lives
//! elsewhere; the process core only duplicates and drops references.

pub mod fd;
pub mod inode;

pub use fd::{FdTable, File, FileRef, OpenMode};
pub use inode::{Inode, InodeRef};
