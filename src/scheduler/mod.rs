pub mod context;
pub mod dump;
pub mod error;
pub mod list;
pub mod mlfq;
pub mod table;
pub mod task;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, Ordering};
use spin::{Mutex, MutexGuard};

pub use context::{Context, Entry, TrapFrame};
pub use dump::Uproc;
pub use error::{ProcError, ProcResult};
pub use table::{Children, ProcTable, Released};
pub use task::{Channel, Pid, Proc, ProcState};

use crate::fs::fd::{console_fd_table, dup_fd_table, empty_fd_table, fileclose};
use crate::fs::inode::{idup, iput, Inode};
use crate::param::{Config, DEF_GID, DEF_UID, MAX_ID, PGSIZE};
use crate::platform::Platform;

/// The process subsystem: one table behind one lock, driven by the
/// dispatch loop each CPU runs.
pub struct Kernel<P: Platform> {
    platform: P,
    ptable: Mutex<ProcTable>,
    halted: AtomicBool,
}

impl<P: Platform> Kernel<P> {
    /// Build an empty kernel. An invalid configuration is fatal.
    pub fn new(platform: P, config: Config) -> Self {
        if let Err(e) = config.validate() {
            panic!("invalid kernel configuration: {}", e);
        }
        Kernel {
            platform,
            ptable: Mutex::new(ProcTable::new(config)),
            halted: AtomicBool::new(false),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Lock the process table for inspection.
    pub fn table(&self) -> MutexGuard<'_, ProcTable> {
        self.ptable.lock()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Slot of the process running on this CPU.
    fn myproc(&self, table: &ProcTable) -> usize {
        let cpu = self.platform.cpu_id();
        match table.current(cpu) {
            Some(slot) => slot,
            None => panic!("myproc: no process on cpu {}", cpu),
        }
    }

    /// Give up the CPU. The caller has already moved itself off the
    /// running list. Returns once the process is dispatched again.
    fn sched<'a>(&'a self, mut table: MutexGuard<'a, ProcTable>, slot: usize) -> MutexGuard<'a, ProcTable> {
        if table.proc(slot).state == ProcState::Running {
            panic!("sched running");
        }
        let now = self.platform.ticks();
        let p = table.proc_mut(slot);
        p.cpu_ticks_total += now.saturating_sub(p.cpu_ticks_in);
        let cpu = self.platform.cpu_id();
        // The lock is released before the switch, so another CPU may
        // dispatch this process before it has left this one. That is safe
        // because the process is already off the running list, and
        // `swtch` returns at once when a hand-off to `from` is pending.
        drop(table);

        self.platform.swtch(Context::Process(slot), Context::Scheduler(cpu));
        self.ptable.lock()
    }

    /// Per-CPU dispatch loop. Returns once the kernel is halted.
    pub fn scheduler(&self) {
        let cpu = self.platform.cpu_id();
        crate::log_debug!("cpu{}: scheduler starting", cpu);

        while !self.is_halted() {
            let now = self.platform.ticks();
            let mut table = self.ptable.lock();
            let promoted = table.promote_if_due(now);

            let slot = match table.pick_next() {
                Some(slot) => slot,
                None => {
                    drop(table);
                    if promoted {
                        crate::log_debug!("cpu{}: promotion pass at tick {}", cpu, now);
                    }
                    self.platform.wait_for_interrupt();
                    continue;
                }
            };

            table.dispatch(slot, cpu, now);
            if let Some(pgdir) = table.proc(slot).pgdir.as_ref() {
                self.platform.switch_uvm(pgdir);
            }
            // `slot` is Running and on no ready list, so no other CPU can
            // pick it while the lock is dropped.
            drop(table);
            if promoted {
                crate::log_debug!("cpu{}: promotion pass at tick {}", cpu, now);
            }

            self.platform.swtch(Context::Scheduler(cpu), Context::Process(slot));
            self.platform.switch_kvm();
            self.ptable.lock().release_cpu(cpu);
        }

        crate::log_debug!("cpu{}: scheduler halted", cpu);
    }

    /// Stop every dispatch loop after its current iteration.
    pub fn halt(&self) {
        crate::log_info!("Shutting down ...");
        self.halted.store(true, Ordering::Release);
    }

    fn release(&self, released: Released) {
        if let Some(stack) = released.kstack {
            self.platform.free_kstack(stack);
        }
        if let Some(space) = released.pgdir {
            self.platform.free_uvm(space);
        }
    }

    fn discard_embryo(&self, table: &mut ProcTable, slot: usize) {
        let released = table.free_embryo(slot);
        self.release(released);
    }

    /// First code run by every new process context.
    fn forkret(&self, slot: usize) -> ! {
        let (entry, eax) = {
            let table = self.ptable.lock();
            let tf = &table.proc(slot).tf;
            (tf.entry.clone(), tf.eax)
        };
        if let Some(entry) = entry {
            entry(eax);
        }
        self.exit()
    }
}

impl<P: Platform + 'static> Kernel<P> {
    fn init_context(self: &Arc<Self>, table: &ProcTable, slot: usize) {
        let kernel = Arc::downgrade(self);
        if let Some(stack) = table.proc(slot).kstack.as_ref() {
            self.platform.init_context(
                slot,
                stack,
                Box::new(move || {
                    if let Some(kernel) = kernel.upgrade() {
                        kernel.forkret(slot);
                    }
                }),
            );
        }
    }

    /// Set up the root process. It runs `entry` once dispatched.
    pub fn userinit(self: &Arc<Self>, entry: Entry) -> ProcResult<Pid> {
        let now = self.platform.ticks();
        let mut table = self.ptable.lock();
        if table.initproc().is_some() {
            panic!("userinit: root process already exists");
        }
        table.promote_at = now + table.config().ticks_to_promote;

        let slot = table.allocproc(now).ok_or(ProcError::NoFreeProc)?;
        let kstack = match self.platform.alloc_kstack() {
            Some(stack) => stack,
            None => {
                self.discard_embryo(&mut table, slot);
                crate::log_error!("userinit: out of kernel stacks");
                return Err(ProcError::OutOfMemory);
            }
        };
        table.proc_mut(slot).kstack = Some(kstack);
        let pgdir = match self.platform.setup_uvm(PGSIZE) {
            Some(pgdir) => pgdir,
            None => {
                self.discard_embryo(&mut table, slot);
                crate::log_error!("userinit: out of memory?");
                return Err(ProcError::OutOfMemory);
            }
        };

        let p = table.proc_mut(slot);
        p.pgdir = Some(pgdir);
        p.sz = PGSIZE;
        p.name = String::from("initcode");
        p.uid = DEF_UID;
        p.gid = DEF_GID;
        p.tf = TrapFrame { eax: 0, entry: Some(entry) };
        p.ofile = console_fd_table();
        p.cwd = Some(Inode::root());
        let pid = p.pid;

        self.init_context(&table, slot);
        table.set_initproc(slot);
        table.make_runnable(slot);
        drop(table);

        crate::log_info!("userinit: pid {} ready", pid);
        Ok(pid)
    }

    /// Create a copy of the caller. The parent gets the child's pid; the
    /// child resumes at the same entry and sees 0.
    pub fn fork(self: &Arc<Self>) -> ProcResult<Pid> {
        let now = self.platform.ticks();
        let mut table = self.ptable.lock();
        let parent = self.myproc(&table);

        let slot = match table.allocproc(now) {
            Some(slot) => slot,
            None => {
                drop(table);
                crate::log_error!("fork: process table full");
                return Err(ProcError::NoFreeProc);
            }
        };
        match self.platform.alloc_kstack() {
            Some(stack) => table.proc_mut(slot).kstack = Some(stack),
            None => {
                self.discard_embryo(&mut table, slot);
                drop(table);
                crate::log_error!("fork: out of kernel stacks");
                return Err(ProcError::OutOfMemory);
            }
        }

        let pp = table.proc(parent);
        let pgdir = pp.pgdir.as_ref().and_then(|pd| self.platform.copy_uvm(pd, pp.sz));
        let pgdir = match pgdir {
            Some(pgdir) => pgdir,
            None => {
                self.discard_embryo(&mut table, slot);
                drop(table);
                crate::log_error!("fork: cannot copy address space");
                return Err(ProcError::OutOfMemory);
            }
        };

        let mut tf = pp.tf.clone();
        tf.eax = 0;
        let (sz, uid, gid, name) = (pp.sz, pp.uid, pp.gid, pp.name.clone());
        let ofile = dup_fd_table(&pp.ofile);
        let cwd = pp.cwd.as_ref().map(idup);

        let child = table.proc_mut(slot);
        child.pgdir = Some(pgdir);
        child.sz = sz;
        child.tf = tf;
        child.uid = uid;
        child.gid = gid;
        child.name = name;
        child.ofile = ofile;
        child.cwd = cwd;
        child.parent = Some(parent);
        let pid = child.pid;

        self.init_context(&table, slot);
        table.make_runnable(slot);
        let parent_pid = table.proc(parent).pid;
        drop(table);

        crate::log_info!("fork: pid {} created pid {}", parent_pid, pid);
        Ok(pid)
    }
}

impl<P: Platform> Kernel<P> {
    /// Terminate the caller. It stays a zombie until its parent waits.
    pub fn exit(&self) -> ! {
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        if table.initproc() == Some(slot) {
            panic!("init exiting");
        }
        let p = table.proc_mut(slot);
        let files = core::mem::replace(&mut p.ofile, empty_fd_table());
        let cwd = p.cwd.take();
        let pid = p.pid;
        drop(table);

        for f in files.into_iter().flatten() {
            fileclose(f);
        }
        if let Some(cwd) = cwd {
            iput(cwd);
        }
        crate::log_info!("exit: pid {}", pid);

        let mut table = self.ptable.lock();
        table.exit_transition(slot);
        let _table = self.sched(table, slot);
        panic!("zombie exit");
    }

    /// Reap one exited child, blocking while children are still alive.
    pub fn wait(&self) -> ProcResult<Pid> {
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        loop {
            match table.scan_children(slot) {
                Children::Zombie(child) => {
                    let released = table.reap(child);
                    drop(table);
                    let pid = released.pid;
                    self.release(released);
                    crate::log_info!("wait: reaped pid {}", pid);
                    return Ok(pid);
                }
                Children::None => return Err(ProcError::NoChild),
                Children::Live if table.proc(slot).killed => return Err(ProcError::Killed),
                Children::Live => {
                    let now = self.platform.ticks();
                    table.sleep_transition(slot, Channel::Proc(slot), now);
                    table = self.sched(table, slot);
                    table.proc_mut(slot).chan = None;
                }
            }
        }
    }

    /// Give up the CPU for one scheduling round.
    pub fn yield_now(&self) {
        let now = self.platform.ticks();
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        table.yield_transition(slot, now);
        let _table = self.sched(table, slot);
    }

    /// Block the caller until `chan` is woken.
    pub fn sleep(&self, chan: Channel) {
        let now = self.platform.ticks();
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        table.sleep_transition(slot, chan, now);
        let mut table = self.sched(table, slot);
        table.proc_mut(slot).chan = None;
    }

    /// Atomically release `guard` and sleep on `chan`; `lock` is held
    /// again on return. The table lock is taken before `guard` is dropped,
    /// so a wakeup sent under `lock` cannot be missed.
    pub fn sleep_on<'a, T>(&self, chan: Channel, lock: &'a Mutex<T>, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let now = self.platform.ticks();
        let mut table = self.ptable.lock();
        drop(guard);
        let slot = self.myproc(&table);
        table.sleep_transition(slot, chan, now);
        let mut table = self.sched(table, slot);
        table.proc_mut(slot).chan = None;
        drop(table);
        lock.lock()
    }

    /// Wake every process sleeping on `chan`.
    pub fn wakeup(&self, chan: Channel) -> usize {
        self.ptable.lock().wakeup(chan)
    }

    /// Timer tick: the platform has advanced its counter.
    pub fn timer_interrupt(&self) {
        self.wakeup(Channel::Ticks);
    }

    pub fn kill(&self, pid: Pid) -> ProcResult<()> {
        let killed = self.ptable.lock().kill(pid);
        match killed {
            Some(_) => {
                crate::log_info!("kill: pid {}", pid);
                Ok(())
            }
            None => {
                crate::log_warn!("kill: no process {}", pid);
                Err(ProcError::NoSuchProcess)
            }
        }
    }

    /// Whether the caller has been killed.
    pub fn killed(&self) -> bool {
        let table = self.ptable.lock();
        table.proc(self.myproc(&table)).killed
    }

    pub fn setpriority(&self, pid: Pid, prio: u32) -> ProcResult<()> {
        let result = self.ptable.lock().setpriority(pid, prio);
        if let Err(e) = result {
            crate::log_warn!("setpriority({}, {}): {}", pid, prio, e);
        }
        result
    }

    pub fn getpriority(&self, pid: Pid) -> ProcResult<u32> {
        self.ptable.lock().getpriority(pid)
    }

    // ── Identity ────────────────────────────────────────────

    fn with_current<R>(&self, f: impl FnOnce(&mut Proc) -> R) -> R {
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        f(table.proc_mut(slot))
    }

    pub fn getpid(&self) -> Pid {
        self.with_current(|p| p.pid)
    }

    /// Parent pid, or the caller's own pid when it has no parent.
    pub fn getppid(&self) -> Pid {
        let table = self.ptable.lock();
        let p = table.proc(self.myproc(&table));
        match p.parent {
            Some(parent) => table.proc(parent).pid,
            None => p.pid,
        }
    }

    pub fn getuid(&self) -> u32 {
        self.with_current(|p| p.uid)
    }

    pub fn getgid(&self) -> u32 {
        self.with_current(|p| p.gid)
    }

    pub fn setuid(&self, uid: u32) -> ProcResult<()> {
        if uid > MAX_ID {
            crate::log_warn!("setuid: {} out of range", uid);
            return Err(ProcError::InvalidId);
        }
        self.with_current(|p| p.uid = uid);
        Ok(())
    }

    pub fn setgid(&self, gid: u32) -> ProcResult<()> {
        if gid > MAX_ID {
            crate::log_warn!("setgid: {} out of range", gid);
            return Err(ProcError::InvalidId);
        }
        self.with_current(|p| p.gid = gid);
        Ok(())
    }

    /// Replace the code the caller runs in user mode. A later fork hands
    /// the new entry to the child.
    pub fn set_entry(&self, entry: Entry) {
        self.with_current(|p| p.tf.entry = Some(entry));
    }

    // ── Memory and time ─────────────────────────────────────

    /// Grow or shrink the caller's image by `n` bytes. Returns the old size.
    pub fn growproc(&self, n: isize) -> ProcResult<usize> {
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        let p = table.proc_mut(slot);
        let old = p.sz;
        let new = match (old as isize).checked_add(n) {
            Some(new) if new >= 0 => new,
            _ => {
                crate::log_warn!("growproc: pid {} cannot resize by {} bytes", p.pid, n);
                return Err(ProcError::OutOfMemory);
            }
        };
        let pgdir = p.pgdir.as_ref().ok_or(ProcError::OutOfMemory)?;
        let sz = match self.platform.resize_uvm(pgdir, old, new as usize) {
            Some(sz) => sz,
            None => {
                crate::log_error!("growproc: pid {} cannot grow to {} bytes", p.pid, new);
                return Err(ProcError::OutOfMemory);
            }
        };
        self.platform.switch_uvm(pgdir);
        p.sz = sz;
        Ok(old)
    }

    /// Sleep for `n` ticks.
    pub fn sleep_ticks(&self, n: u64) -> ProcResult<()> {
        let mut table = self.ptable.lock();
        let slot = self.myproc(&table);
        let start = self.platform.ticks();
        while self.platform.ticks().saturating_sub(start) < n {
            if table.proc(slot).killed {
                return Err(ProcError::Killed);
            }
            let now = self.platform.ticks();
            table.sleep_transition(slot, Channel::Ticks, now);
            table = self.sched(table, slot);
            table.proc_mut(slot).chan = None;
        }
        Ok(())
    }

    pub fn uptime(&self) -> u64 {
        self.platform.ticks()
    }

    // ── Listings ────────────────────────────────────────────

    pub fn getprocs(&self, max: usize) -> Vec<Uproc> {
        let now = self.platform.ticks();
        self.ptable.lock().getprocs(max, now)
    }

    pub fn procdump(&self, out: &mut dyn Write) -> fmt::Result {
        let now = self.platform.ticks();
        self.ptable.lock().procdump(out, now)
    }

    pub fn readylist(&self, out: &mut dyn Write) -> fmt::Result {
        self.ptable.lock().readylist(out)
    }

    pub fn freelist(&self, out: &mut dyn Write) -> fmt::Result {
        self.ptable.lock().freelist(out)
    }

    pub fn sleeplist(&self, out: &mut dyn Write) -> fmt::Result {
        self.ptable.lock().sleeplist(out)
    }

    pub fn zombielist(&self, out: &mut dyn Write) -> fmt::Result {
        self.ptable.lock().zombielist(out)
    }
}
