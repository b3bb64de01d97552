//! Multi-level feedback queue policy on top of [`ProcTable`].

use alloc::vec::Vec;

use super::error::{ProcError, ProcResult};
use super::table::{ListId, ProcTable};
use super::task::{Pid, ProcState};

impl ProcTable {
    /// Head of the highest non-empty ready list.
    pub fn pick_next(&self) -> Option<usize> {
        self.ready.iter().rev().find_map(|list| list.head())
    }

    /// Run a promotion pass if the deadline has passed.
    pub fn promote_if_due(&mut self, now: u64) -> bool {
        if now < self.promote_at {
            return false;
        }
        self.promote(now);
        true
    }

    /// Raise every runnable, sleeping and running process one level (capped
    /// at the top) and give each a full budget. Schedules the next pass.
    pub fn promote(&mut self, now: u64) {
        let max = self.config.max_prio;
        let budget = self.config.default_budget;

        // Top down, so a process moved up is not seen again this pass.
        for prio in (0..=max).rev() {
            let members: Vec<usize> = self.ready_slots(prio);
            for slot in members {
                if prio == max {
                    self.procs[slot].budget = budget;
                    continue;
                }
                self.unlink(ListId::Ready(prio), slot);
                self.assert_state(slot, ProcState::Runnable);
                let p = &mut self.procs[slot];
                p.priority = prio + 1;
                p.budget = budget;
                self.link(ListId::Ready(prio + 1), slot);
            }
        }

        for state in [ProcState::Sleeping, ProcState::Running] {
            for slot in self.slots_in(state) {
                let p = &mut self.procs[slot];
                if p.priority < max {
                    p.priority += 1;
                }
                p.budget = budget;
            }
        }

        self.promote_at = now + self.config.ticks_to_promote;
    }

    /// Move `pid` to `prio` with a fresh budget. Setting the level a
    /// process already has changes nothing, budget included.
    pub fn setpriority(&mut self, pid: Pid, prio: u32) -> ProcResult<()> {
        if prio > self.config.max_prio {
            return Err(ProcError::InvalidPriority);
        }
        let slot = self.find_prioritized(pid).ok_or(ProcError::NoSuchProcess)?;
        let p = &self.procs[slot];
        if p.priority == prio {
            return Ok(());
        }

        let budget = self.config.default_budget;
        if p.state == ProcState::Runnable {
            self.unlink(ListId::Ready(p.priority), slot);
            self.assert_state(slot, ProcState::Runnable);
            let p = &mut self.procs[slot];
            p.priority = prio;
            p.budget = budget;
            self.link(ListId::Ready(prio), slot);
        } else {
            let p = &mut self.procs[slot];
            p.priority = prio;
            p.budget = budget;
        }
        Ok(())
    }

    pub fn getpriority(&self, pid: Pid) -> ProcResult<u32> {
        self.find_prioritized(pid)
            .map(|slot| self.procs[slot].priority)
            .ok_or(ProcError::NoSuchProcess)
    }
}
