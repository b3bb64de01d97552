use alloc::sync::Arc;
use core::fmt;

/// A saved kernel execution context the platform can switch between.
///
/// Each CPU owns one scheduler context; each live process owns one
/// context that lives on its kernel stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Scheduler(usize),
    Process(usize),
}

/// User code a process runs once it leaves the kernel. It receives the
/// value of the return register, so a forked child sees 0.
pub type Entry = Arc<dyn Fn(isize) + Send + Sync>;

/// User register state saved on kernel entry.
#[derive(Clone, Default)]
pub struct TrapFrame {
    /// Return value register.
    pub eax: isize,
    /// Where the process resumes in user mode.
    pub entry: Option<Entry>,
}

impl fmt::Debug for TrapFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TrapFrame")
            .field("eax", &self.eax)
            .field("entry", &self.entry.as_ref().map(|_| "<user code>"))
            .finish()
    }
}
