use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Records kept in the kernel log ring buffer.
pub const KLOG_CAPACITY: usize = 64;

/// Kernel log ring buffer.
pub struct KernelLog {
    pub entries: VecDeque<String>,
}

impl KernelLog {
    pub fn new() -> Self {
        KernelLog { entries: VecDeque::with_capacity(KLOG_CAPACITY) }
    }

    pub fn push(&mut self, msg: String) {
        if self.entries.len() >= KLOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(msg);
    }

    /// The last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> Vec<String> {
        let start = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(start).cloned().collect()
    }
}

impl Default for KernelLog {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref KLOG: Mutex<KernelLog> = Mutex::new(KernelLog::new());
}

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        KLOG.lock().push(format!("[{}] {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Route the `log` facade into [`KLOG`]. Safe to call more than once; only
/// the level changes after the first call.
pub fn init(level: LevelFilter) {
    // A second set_logger fails harmlessly, keeping the first logger.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Snapshot of the newest `count` log records.
pub fn recent(count: usize) -> Vec<String> {
    KLOG.lock().recent(count)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::__log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__log::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::__log::debug!($($arg)*)
    };
}
