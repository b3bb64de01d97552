//! A [`Platform`] backed by host threads.
//!
//! Every CPU and every process context is an OS thread. A context only
//! runs while it holds its [`Baton`]; `swtch` hands the caller's CPU to the
//! target baton and parks until its own baton comes back, so at most one
//! context runs per CPU at a time.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::platform::{AddrSpace, ContextStart, KernelStack, Platform};
use crate::scheduler::{Context, Kernel};

/// How long an idle CPU parks before polling the ready lists again.
const IDLE_PARK: Duration = Duration::from_micros(200);

thread_local! {
    static CPU: Cell<usize> = const { Cell::new(0) };
    static OWN: RefCell<Option<Arc<Baton>>> = const { RefCell::new(None) };
}

/// Unwind payload used to end the thread of a reaped process.
struct Retired;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Idle,
    Go(usize),
    Retired,
}

/// Run permission for one context.
struct Baton {
    turn: Mutex<Turn>,
    cv: Condvar,
    start: Mutex<Option<ContextStart>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Baton {
    fn new(start: Option<ContextStart>) -> Arc<Self> {
        Arc::new(Baton {
            turn: Mutex::new(Turn::Idle),
            cv: Condvar::new(),
            start: Mutex::new(start),
        })
    }

    /// Let the owner run on `cpu`.
    fn hand(&self, cpu: usize) {
        let mut turn = lock(&self.turn);
        if *turn != Turn::Retired {
            *turn = Turn::Go(cpu);
            self.cv.notify_one();
        }
    }

    fn retire(&self) {
        *lock(&self.turn) = Turn::Retired;
        self.cv.notify_all();
    }

    /// Block until handed a CPU. `None` once retired.
    fn wait(&self) -> Option<usize> {
        let mut turn = lock(&self.turn);
        loop {
            match *turn {
                Turn::Go(cpu) => {
                    *turn = Turn::Idle;
                    return Some(cpu);
                }
                Turn::Retired => return None,
                Turn::Idle => turn = self.cv.wait(turn).unwrap_or_else(PoisonError::into_inner),
            }
        }
    }

    fn take_start(&self) -> Option<ContextStart> {
        lock(&self.start).take()
    }
}

/// Simulated machine: clock, memory handles and context switching.
pub struct Machine {
    ticks: AtomicU64,
    contexts: Arc<Mutex<HashMap<Context, Arc<Baton>>>>,
    stacks: Mutex<HashMap<u64, Arc<Baton>>>,
    spaces: Mutex<HashMap<u64, usize>>,
    next_handle: AtomicU64,
    live_kstacks: AtomicUsize,
    fail_kstack: AtomicBool,
    fail_uvm: AtomicBool,
    faulted: Arc<AtomicBool>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            ticks: AtomicU64::new(0),
            contexts: Arc::new(Mutex::new(HashMap::new())),
            stacks: Mutex::new(HashMap::new()),
            spaces: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            live_kstacks: AtomicUsize::new(0),
            fail_kstack: AtomicBool::new(false),
            fail_uvm: AtomicBool::new(false),
            faulted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Advance the clock by `n` ticks. Returns the new tick count.
    pub fn advance(&self, n: u64) -> u64 {
        self.ticks.fetch_add(n, Ordering::AcqRel) + n
    }

    pub fn live_kstacks(&self) -> usize {
        self.live_kstacks.load(Ordering::Acquire)
    }

    pub fn live_address_spaces(&self) -> usize {
        lock(&self.spaces).len()
    }

    /// Make kernel stack allocation fail until switched back off.
    pub fn fail_kstack_alloc(&self, fail: bool) {
        self.fail_kstack.store(fail, Ordering::Release);
    }

    /// Make address space creation, copy and growth fail.
    pub fn fail_uvm_alloc(&self, fail: bool) {
        self.fail_uvm.store(fail, Ordering::Release);
    }

    /// Whether any process thread died of a panic.
    pub fn faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn scheduler_baton(&self, cpu: usize) -> Arc<Baton> {
        let mut contexts = lock(&self.contexts);
        Arc::clone(
            contexts
                .entry(Context::Scheduler(cpu))
                .or_insert_with(|| Baton::new(None)),
        )
    }

    /// Start the thread behind a process context the first time it is
    /// switched to.
    fn spawn_process(&self, baton: Arc<Baton>, start: ContextStart) {
        let contexts = Arc::clone(&self.contexts);
        let faulted = Arc::clone(&self.faulted);
        thread::spawn(move || {
            OWN.with(|own| *own.borrow_mut() = Some(Arc::clone(&baton)));
            let cpu = match baton.wait() {
                Some(cpu) => cpu,
                None => return,
            };
            CPU.with(|c| c.set(cpu));

            let result = panic::catch_unwind(AssertUnwindSafe(start));
            if let Err(payload) = result {
                if payload.is::<Retired>() {
                    return;
                }
                faulted.store(true, Ordering::Release);
                crate::log_error!("process context died of a panic");
                // Give the CPU back so its dispatch loop does not hang.
                let cpu = CPU.with(Cell::get);
                if let Some(sched) = lock(&contexts).get(&Context::Scheduler(cpu)) {
                    sched.hand(cpu);
                }
            }
        });
    }

    /// Spawn one dispatch thread per CPU.
    pub fn boot(kernel: &Arc<Kernel<Machine>>, ncpu: usize) -> Vec<JoinHandle<()>> {
        (0..ncpu)
            .map(|cpu| {
                let kernel = Arc::clone(kernel);
                let baton = kernel.platform().scheduler_baton(cpu);
                thread::spawn(move || {
                    CPU.with(|c| c.set(cpu));
                    OWN.with(|own| *own.borrow_mut() = Some(baton));
                    kernel.scheduler();
                })
            })
            .collect()
    }
}

impl Platform for Machine {
    fn cpu_id(&self) -> usize {
        CPU.with(Cell::get)
    }

    fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn alloc_kstack(&self) -> Option<KernelStack> {
        if self.fail_kstack.load(Ordering::Acquire) {
            return None;
        }
        self.live_kstacks.fetch_add(1, Ordering::AcqRel);
        Some(KernelStack(self.handle()))
    }

    fn free_kstack(&self, stack: KernelStack) {
        self.live_kstacks.fetch_sub(1, Ordering::AcqRel);
        let baton = lock(&self.stacks).remove(&stack.0);
        if let Some(baton) = baton {
            lock(&self.contexts).retain(|_, b| !Arc::ptr_eq(b, &baton));
            baton.retire();
        }
    }

    fn setup_uvm(&self, size: usize) -> Option<AddrSpace> {
        if self.fail_uvm.load(Ordering::Acquire) {
            return None;
        }
        let id = self.handle();
        lock(&self.spaces).insert(id, size);
        Some(AddrSpace(id))
    }

    fn copy_uvm(&self, parent: &AddrSpace, size: usize) -> Option<AddrSpace> {
        if self.fail_uvm.load(Ordering::Acquire) || !lock(&self.spaces).contains_key(&parent.0) {
            return None;
        }
        self.setup_uvm(size)
    }

    fn resize_uvm(&self, space: &AddrSpace, _old: usize, new: usize) -> Option<usize> {
        if self.fail_uvm.load(Ordering::Acquire) {
            return None;
        }
        let mut spaces = lock(&self.spaces);
        let size = spaces.get_mut(&space.0)?;
        *size = new;
        Some(new)
    }

    fn free_uvm(&self, space: AddrSpace) {
        lock(&self.spaces).remove(&space.0);
    }

    // Hosted processes all live in the host's address space.
    fn switch_uvm(&self, _space: &AddrSpace) {}

    fn switch_kvm(&self) {}

    fn init_context(&self, slot: usize, stack: &KernelStack, start: ContextStart) {
        let baton = Baton::new(Some(start));
        lock(&self.contexts).insert(Context::Process(slot), Arc::clone(&baton));
        lock(&self.stacks).insert(stack.0, baton);
    }

    fn swtch(&self, from: Context, to: Context) {
        let cpu = self.cpu_id();
        let target = match to {
            Context::Scheduler(cpu) => Some(self.scheduler_baton(cpu)),
            Context::Process(_) => lock(&self.contexts).get(&to).cloned(),
        };
        let target = match target {
            Some(baton) => baton,
            None => panic!("swtch: no context for {:?}", to),
        };
        if let Some(start) = target.take_start() {
            self.spawn_process(Arc::clone(&target), start);
        }

        let own = match OWN.with(|own| own.borrow().clone()) {
            Some(baton) => baton,
            None => panic!("swtch: {:?} is not a kernel context", from),
        };
        target.hand(cpu);
        match own.wait() {
            Some(cpu) => CPU.with(|c| c.set(cpu)),
            None => panic::resume_unwind(Box::new(Retired)),
        }
    }

    fn wait_for_interrupt(&self) {
        thread::park_timeout(IDLE_PARK);
    }
}
