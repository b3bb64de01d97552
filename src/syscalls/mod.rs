use alloc::sync::Arc;

use crate::param::MAX_ID;
use crate::platform::Platform;
use crate::scheduler::{Kernel, Pid, ProcError, ProcResult};

/// Syscall numbers.
pub const SYS_FORK: u64 = 1;
pub const SYS_EXIT: u64 = 2;
pub const SYS_WAIT: u64 = 3;
pub const SYS_KILL: u64 = 6;
pub const SYS_GETPID: u64 = 11;
pub const SYS_SBRK: u64 = 12;
pub const SYS_SLEEP: u64 = 13;
pub const SYS_UPTIME: u64 = 14;
pub const SYS_HALT: u64 = 22;
pub const SYS_GETUID: u64 = 24;
pub const SYS_GETGID: u64 = 25;
pub const SYS_GETPPID: u64 = 26;
pub const SYS_SETUID: u64 = 27;
pub const SYS_SETGID: u64 = 28;
pub const SYS_SETPRIORITY: u64 = 30;
pub const SYS_GETPRIORITY: u64 = 31;
pub const SYS_YIELD: u64 = 32;

/// Returned to user code for every failed call.
pub const SYSCALL_ERR: i64 = -1;

/// Central syscall dispatcher, called from process context.
/// Returns the value for the caller's return register.
pub fn dispatch<P: Platform + 'static>(kernel: &Arc<Kernel<P>>, number: u64, arg0: i64, arg1: i64) -> i64 {
    if kernel.killed() {
        kernel.exit();
    }
    let ret = match number {
        SYS_FORK => result(kernel.fork().map(pid)),
        SYS_EXIT => kernel.exit(),
        SYS_WAIT => result(kernel.wait().map(pid)),
        SYS_KILL => result(arg_pid(arg0).and_then(|p| kernel.kill(p)).map(|_| 0)),
        SYS_GETPID => pid(kernel.getpid()),
        SYS_SBRK => result(kernel.growproc(arg0 as isize).map(|old| old as i64)),
        SYS_SLEEP => {
            if arg0 < 0 {
                SYSCALL_ERR
            } else {
                result(kernel.sleep_ticks(arg0 as u64).map(|_| 0))
            }
        }
        SYS_UPTIME => kernel.uptime() as i64,
        SYS_HALT => {
            kernel.halt();
            0
        }
        SYS_GETUID => kernel.getuid() as i64,
        SYS_GETGID => kernel.getgid() as i64,
        SYS_GETPPID => pid(kernel.getppid()),
        SYS_SETUID => result(arg_id(arg0).and_then(|id| kernel.setuid(id)).map(|_| 0)),
        SYS_SETGID => result(arg_id(arg0).and_then(|id| kernel.setgid(id)).map(|_| 0)),
        SYS_SETPRIORITY => result(sys_setpriority(kernel, arg0, arg1)),
        SYS_GETPRIORITY => result(arg_pid(arg0).and_then(|p| kernel.getpriority(p)).map(i64::from)),
        SYS_YIELD => {
            kernel.yield_now();
            0
        }
        _ => {
            crate::log_warn!("syscall: unknown number {}", number);
            SYSCALL_ERR
        }
    };
    if kernel.killed() {
        kernel.exit();
    }
    ret
}

fn sys_setpriority<P: Platform>(kernel: &Kernel<P>, pid: i64, prio: i64) -> ProcResult<i64> {
    let pid = arg_pid(pid)?;
    let prio = arg_prio(prio)?;
    kernel.setpriority(pid, prio)?;
    Ok(0)
}

fn pid(p: Pid) -> i64 {
    i64::from(p.0)
}

fn result(r: ProcResult<i64>) -> i64 {
    r.unwrap_or(SYSCALL_ERR)
}

fn arg_pid(arg: i64) -> ProcResult<Pid> {
    u32::try_from(arg).map(Pid).map_err(|_| {
        crate::log_warn!("syscall: bad pid {}", arg);
        ProcError::InvalidPid
    })
}

fn arg_prio(arg: i64) -> ProcResult<u32> {
    u32::try_from(arg).map_err(|_| {
        crate::log_warn!("syscall: bad priority {}", arg);
        ProcError::InvalidPriority
    })
}

fn arg_id(arg: i64) -> ProcResult<u32> {
    match u32::try_from(arg) {
        Ok(id) if id <= MAX_ID => Ok(id),
        _ => {
            crate::log_warn!("syscall: uid/gid {} out of range", arg);
            Err(ProcError::InvalidId)
        }
    }
}
