//! Console debug keys.

use core::fmt::{self, Write};

use crate::klog::{self, KLOG_CAPACITY};
use crate::platform::Platform;
use crate::scheduler::Kernel;

/// The byte a terminal sends for Ctrl-`c`.
pub const fn ctrl(c: u8) -> u8 {
    c - b'@'
}

pub const CTRL_F: u8 = ctrl(b'F');
pub const CTRL_L: u8 = ctrl(b'L');
pub const CTRL_P: u8 = ctrl(b'P');
pub const CTRL_R: u8 = ctrl(b'R');
pub const CTRL_S: u8 = ctrl(b'S');
pub const CTRL_Z: u8 = ctrl(b'Z');

/// Run the listing bound to `key`, if any. Returns whether the key was
/// a control key.
pub fn control<P: Platform>(kernel: &Kernel<P>, key: u8, out: &mut dyn Write) -> Result<bool, fmt::Error> {
    match key {
        CTRL_P => kernel.procdump(out)?,
        CTRL_R => kernel.readylist(out)?,
        CTRL_F => kernel.freelist(out)?,
        CTRL_S => kernel.sleeplist(out)?,
        CTRL_Z => kernel.zombielist(out)?,
        CTRL_L => dump_log(out)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn dump_log(out: &mut dyn Write) -> fmt::Result {
    let entries = klog::recent(KLOG_CAPACITY);
    if entries.is_empty() {
        return writeln!(out, "(no log entries)");
    }
    for entry in &entries {
        writeln!(out, "  {}", entry)?;
    }
    Ok(())
}
