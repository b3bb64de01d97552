use alloc::sync::Arc;
use bitflags::bitflags;
use spin::Mutex;

use crate::param::NOFILE;

bitflags! {
    /// Access mode an open file was created with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

/// An open file. Only the console is opened by the process core itself.
pub struct File {
    pub mode: OpenMode,
}

/// Shared open-file handle. Cloning the `Arc` is the reference count.
pub type FileRef = Arc<Mutex<File>>;

/// Per-process open file table.
pub type FdTable = [Option<FileRef>; NOFILE];

impl File {
    pub fn new_console() -> FileRef {
        Arc::new(Mutex::new(File { mode: OpenMode::READ | OpenMode::WRITE }))
    }
}

/// Share `f` with another descriptor slot; no copy of the file is made.
pub fn filedup(f: &FileRef) -> FileRef {
    Arc::clone(f)
}

/// Drop one reference to `f`. The file goes away with its last reference.
pub fn fileclose(f: FileRef) {
    drop(f);
}

pub fn empty_fd_table() -> FdTable {
    core::array::from_fn(|_| None)
}

/// Table with stdin, stdout and stderr all on the console.
pub fn console_fd_table() -> FdTable {
    let mut table = empty_fd_table();
    let console = File::new_console();
    table[0] = Some(filedup(&console));
    table[1] = Some(filedup(&console));
    table[2] = Some(console);
    table
}

/// Duplicate every open slot of `table`, bumping each file's count.
pub fn dup_fd_table(table: &FdTable) -> FdTable {
    core::array::from_fn(|fd| table[fd].as_ref().map(filedup))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_table_shares_one_file() {
        let table = console_fd_table();
        let console = table[0].as_ref().unwrap();
        assert_eq!(Arc::strong_count(console), 3);
        assert!(table[3..].iter().all(Option::is_none));
    }

    #[test]
    fn dup_bumps_refcounts_without_copying() {
        let table = console_fd_table();
        let copy = dup_fd_table(&table);
        let orig = table[1].as_ref().unwrap();
        assert!(Arc::ptr_eq(orig, copy[1].as_ref().unwrap()));
        assert_eq!(Arc::strong_count(orig), 6);
        assert!(copy[3].is_none());
        assert_eq!(orig.lock().mode, OpenMode::READ | OpenMode::WRITE);
    }

    #[test]
    fn close_drops_reference() {
        let f = File::new_console();
        let g = filedup(&f);
        fileclose(g);
        assert_eq!(Arc::strong_count(&f), 1);
    }
}
