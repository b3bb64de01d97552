use core::fmt;

/// Recoverable failures of process operations.
///
/// Corrupted bookkeeping is never reported through this type; it panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// Every table slot is in use.
    NoFreeProc,
    /// Kernel stack or address space allocation failed.
    OutOfMemory,
    /// `wait` found no children.
    NoChild,
    /// No addressable process has that pid.
    NoSuchProcess,
    InvalidPid,
    InvalidPriority,
    /// uid or gid outside the permitted range.
    InvalidId,
    /// The caller was killed while blocked in `wait` or `sleep`.
    Killed,
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcError::NoFreeProc => write!(f, "No free process slot"),
            ProcError::OutOfMemory => write!(f, "Out of memory"),
            ProcError::NoChild => write!(f, "No child processes"),
            ProcError::NoSuchProcess => write!(f, "No such process"),
            ProcError::InvalidPid => write!(f, "Invalid PID"),
            ProcError::InvalidPriority => write!(f, "Invalid priority"),
            ProcError::InvalidId => write!(f, "Invalid uid/gid"),
            ProcError::Killed => write!(f, "Process killed"),
        }
    }
}

pub type ProcResult<T> = Result<T, ProcError>;
