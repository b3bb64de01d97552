#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[doc(hidden)]
pub use log as __log;

pub mod klog;
pub mod param;
pub mod platform;
pub mod fs;
pub mod scheduler;
pub mod syscalls;
pub mod console;

#[cfg(feature = "std")]
pub mod hosted;

pub use param::Config;
pub use platform::Platform;
pub use scheduler::{Channel, Entry, Kernel, Pid, ProcError, ProcResult, ProcState, Uproc};
