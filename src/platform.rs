//! Machine services the process core depends on.
//!
//! Everything here is supplied by the host: a bare-metal port implements it
//! over page tables and `swtch`, the `hosted` module implements it over OS
//! threads.

use alloc::boxed::Box;

use crate::scheduler::context::Context;

/// Handle to a process's user address space (its page directory).
#[derive(Debug, PartialEq, Eq)]
pub struct AddrSpace(pub u64);

/// Handle to a per-process kernel stack.
#[derive(Debug, PartialEq, Eq)]
pub struct KernelStack(pub u64);

/// Code run the first time a new process context is switched to.
pub type ContextStart = Box<dyn FnOnce() + Send + 'static>;

pub trait Platform: Send + Sync {
    /// Index of the CPU executing the caller.
    fn cpu_id(&self) -> usize;

    /// Global tick counter.
    fn ticks(&self) -> u64;

    fn alloc_kstack(&self) -> Option<KernelStack>;
    fn free_kstack(&self, stack: KernelStack);

    /// Fresh address space holding the root process image of `size` bytes.
    fn setup_uvm(&self, size: usize) -> Option<AddrSpace>;
    /// Copy of the first `size` bytes of `parent`.
    fn copy_uvm(&self, parent: &AddrSpace, size: usize) -> Option<AddrSpace>;
    /// Grow or shrink `space` from `old` to `new` bytes. Returns the new size.
    fn resize_uvm(&self, space: &AddrSpace, old: usize, new: usize) -> Option<usize>;
    fn free_uvm(&self, space: AddrSpace);

    /// Load the address space of the process about to run.
    fn switch_uvm(&self, space: &AddrSpace);
    /// Back to the kernel-only address space.
    fn switch_kvm(&self);

    /// Prepare the context for `slot` on `stack` so that the first switch to
    /// `Context::Process(slot)` runs `start`.
    fn init_context(&self, slot: usize, stack: &KernelStack, start: ContextStart);

    /// Save the caller as `from` and resume `to`. Returns when something
    /// switches back to `from`, which may already have happened: the
    /// process table lock is not held across the call, so a switch to
    /// `from` issued before `from` has parked must not be lost.
    fn swtch(&self, from: Context, to: Context);

    /// Idle until an interrupt may have made work available.
    fn wait_for_interrupt(&self);
}
