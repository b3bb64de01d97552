use alloc::string::String;
use core::fmt;

use super::context::TrapFrame;
use crate::fs::fd::{empty_fd_table, FdTable};
use crate::fs::InodeRef;
use crate::platform::{AddrSpace, KernelStack};

/// Unique process identifier. Pid 0 marks a free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ProcState {
    Unused = 0,
    Embryo = 1,
    Sleeping = 2,
    Runnable = 3,
    Running = 4,
    Zombie = 5,
}

impl ProcState {
    pub const COUNT: usize = 6;

    pub const ALL: [ProcState; ProcState::COUNT] = [
        ProcState::Unused,
        ProcState::Embryo,
        ProcState::Sleeping,
        ProcState::Runnable,
        ProcState::Running,
        ProcState::Zombie,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label used by `ps`-style listings.
    pub fn label(self) -> &'static str {
        match self {
            ProcState::Unused => "unused",
            ProcState::Embryo => "embryo",
            ProcState::Sleeping => "sleep",
            ProcState::Runnable => "runble",
            ProcState::Running => "run",
            ProcState::Zombie => "zombie",
        }
    }
}

/// What a sleeping process is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// A process waiting on another process (a parent in `wait`).
    Proc(usize),
    /// The clock; woken on every timer interrupt.
    Ticks,
    /// Any other kernel object, identified by address.
    Addr(usize),
}

impl Channel {
    /// Channel named by the address of `obj`.
    pub fn of<T>(obj: &T) -> Self {
        Channel::Addr(obj as *const T as usize)
    }
}

/// Process control block.
pub struct Proc {
    pub pid: Pid,
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub state: ProcState,
    pub priority: u32,
    /// Ticks left at the current priority. Goes non-positive when overspent.
    pub budget: i64,
    /// Slot of the parent. Rewritten to the root process on reparent.
    pub parent: Option<usize>,
    pub killed: bool,
    pub chan: Option<Channel>,
    pub start_ticks: u64,
    pub cpu_ticks_in: u64,
    pub cpu_ticks_total: u64,
    /// Size of the user image in bytes.
    pub sz: usize,
    pub kstack: Option<KernelStack>,
    pub pgdir: Option<AddrSpace>,
    pub tf: TrapFrame,
    pub ofile: FdTable,
    pub cwd: Option<InodeRef>,
    /// CPU the process was last dispatched on.
    pub(crate) cpu: Option<usize>,
    /// Link to the next process on whichever list holds this one.
    pub(crate) next: Option<usize>,
}

impl Proc {
    pub(crate) fn new() -> Self {
        Proc {
            pid: Pid(0),
            name: String::new(),
            uid: 0,
            gid: 0,
            state: ProcState::Unused,
            priority: 0,
            budget: 0,
            parent: None,
            killed: false,
            chan: None,
            start_ticks: 0,
            cpu_ticks_in: 0,
            cpu_ticks_total: 0,
            sz: 0,
            kstack: None,
            pgdir: None,
            tf: TrapFrame::default(),
            ofile: empty_fd_table(),
            cwd: None,
            cpu: None,
            next: None,
        }
    }

    /// Wipe everything that identified the previous occupant of this slot.
    /// Kernel stack and address space must already have been taken out.
    pub(crate) fn clear_identity(&mut self) {
        self.pid = Pid(0);
        self.name.clear();
        self.parent = None;
        self.killed = false;
        self.chan = None;
        self.sz = 0;
        self.tf = TrapFrame::default();
        self.cpu = None;
    }
}

impl fmt::Debug for Proc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Proc")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("budget", &self.budget)
            .field("parent", &self.parent)
            .field("killed", &self.killed)
            .field("chan", &self.chan)
            .finish()
    }
}
