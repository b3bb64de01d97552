//! Process table listings for `ps` and the console debug keys.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use super::table::ProcTable;
use super::task::{Pid, ProcState};

/// One row of a process table snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uproc {
    pub pid: Pid,
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub ppid: Pid,
    pub priority: u32,
    pub elapsed_ticks: u64,
    pub cpu_total_ticks: u64,
    pub state: &'static str,
    pub size: usize,
}

/// Ticks as `seconds.millis`.
struct Millis(u64);

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

impl ProcTable {
    fn ppid(&self, slot: usize) -> Pid {
        let p = &self.procs[slot];
        match p.parent {
            Some(parent) => self.procs[parent].pid,
            None => p.pid,
        }
    }

    /// Up to `max` rows, one per allocated slot, in slot order.
    pub fn getprocs(&self, max: usize, now: u64) -> Vec<Uproc> {
        (0..self.procs.len())
            .filter(|&s| self.procs[s].state != ProcState::Unused)
            .take(max)
            .map(|s| {
                let p = &self.procs[s];
                Uproc {
                    pid: p.pid,
                    name: p.name.clone(),
                    uid: p.uid,
                    gid: p.gid,
                    ppid: self.ppid(s),
                    priority: p.priority,
                    elapsed_ticks: now.saturating_sub(p.start_ticks),
                    cpu_total_ticks: p.cpu_ticks_total,
                    state: p.state.label(),
                    size: p.sz,
                }
            })
            .collect()
    }

    pub fn procdump(&self, out: &mut dyn Write, now: u64) -> fmt::Result {
        writeln!(out, "\nPID\tName\tUID\tGID\tPPID\tPRIO\tElapsed\tCPU\tState\tSize")?;
        for row in self.getprocs(self.procs.len(), now) {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                row.pid,
                row.name,
                row.uid,
                row.gid,
                row.ppid,
                row.priority,
                Millis(row.elapsed_ticks),
                Millis(row.cpu_total_ticks),
                row.state,
                row.size
            )?;
        }
        Ok(())
    }

    pub fn readylist(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Ready List Processes: ")?;
        let mut found = false;
        for prio in (0..=self.config.max_prio).rev() {
            write!(out, "Priority {}: ", prio)?;
            let entries: Vec<String> = self
                .ready_slots(prio)
                .into_iter()
                .map(|s| alloc::format!("({}, {})", self.procs[s].pid, self.procs[s].budget))
                .collect();
            found |= !entries.is_empty();
            writeln!(out, "{}", entries.join(" -> "))?;
        }
        writeln!(out)?;
        if !found {
            writeln!(out, "Ready list empty!")?;
        }
        Ok(())
    }

    pub fn freelist(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Free list size: {} processes", self.count(ProcState::Unused))
    }

    pub fn sleeplist(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Sleep List Processes: ")?;
        let pids = self.pids_in(ProcState::Sleeping);
        if pids.is_empty() {
            return writeln!(out, "Sleep list empty!");
        }
        let entries: Vec<String> = pids.iter().map(|pid| alloc::format!("{}", pid)).collect();
        writeln!(out, "{}", entries.join(" -> "))
    }

    pub fn zombielist(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Zombie List Processes: ")?;
        let slots = self.slots_in(ProcState::Zombie);
        if slots.is_empty() {
            return writeln!(out, "Zombie list empty!");
        }
        let entries: Vec<String> = slots
            .into_iter()
            .map(|s| alloc::format!("({}, {})", self.procs[s].pid, self.ppid(s)))
            .collect();
        writeln!(out, "{}", entries.join(" -> "))
    }
}
