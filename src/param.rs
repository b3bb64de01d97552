//! Kernel-wide sizing and scheduling parameters.

use core::fmt;

/// Process table slots.
pub const NPROC: usize = 64;
/// Maximum number of CPUs running the dispatch loop.
pub const NCPU: usize = 8;
/// Open files per process.
pub const NOFILE: usize = 16;

/// Highest MLFQ priority. Priority 0 is the lowest.
pub const MAXPRIO: u32 = 6;
/// Ticks a process may consume at one priority before it is demoted.
pub const DEFAULT_BUDGET: i64 = 300;
/// Ticks between two promotion passes.
pub const TICKS_TO_PROMOTE: u64 = 3000;

pub const DEF_UID: u32 = 0;
pub const DEF_GID: u32 = 0;
/// Largest uid/gid a process may take.
pub const MAX_ID: u32 = 32767;

/// Size of the root process image.
pub const PGSIZE: usize = 4096;

/// Runtime scheduling configuration, fixed at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub nproc: usize,
    pub ncpu: usize,
    pub max_prio: u32,
    pub default_budget: i64,
    pub ticks_to_promote: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nproc: NPROC,
            ncpu: NCPU,
            max_prio: MAXPRIO,
            default_budget: DEFAULT_BUDGET,
            ticks_to_promote: TICKS_TO_PROMOTE,
        }
    }
}

/// Reason a [`Config`] was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    NoProcSlots,
    NoCpus,
    NonPositiveBudget,
    ZeroPromotionInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::NoProcSlots => write!(f, "process table needs at least one slot"),
            ConfigError::NoCpus => write!(f, "at least one CPU is required"),
            ConfigError::NonPositiveBudget => write!(f, "default budget must be positive"),
            ConfigError::ZeroPromotionInterval => write!(f, "promotion interval must be non-zero"),
        }
    }
}

impl Config {
    /// Same as the defaults but with a different priority ceiling.
    pub fn with_max_prio(max_prio: u32) -> Self {
        Config { max_prio, ..Config::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nproc == 0 {
            return Err(ConfigError::NoProcSlots);
        }
        if self.ncpu == 0 {
            return Err(ConfigError::NoCpus);
        }
        if self.default_budget <= 0 {
            return Err(ConfigError::NonPositiveBudget);
        }
        if self.ticks_to_promote == 0 {
            return Err(ConfigError::ZeroPromotionInterval);
        }
        Ok(())
    }
}
