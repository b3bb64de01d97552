use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::list::ProcList;
use super::task::{Channel, Pid, Proc, ProcState};
use crate::param::Config;
use crate::platform::{AddrSpace, KernelStack};

/// Per-CPU scheduling state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu {
    /// Slot of the process running on this CPU.
    pub proc: Option<usize>,
}

/// Which membership list a process belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListId {
    State(ProcState),
    Ready(u32),
}

/// Outcome of scanning for a caller's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Children {
    /// A zombie child ready to be reaped.
    Zombie(usize),
    /// Children exist but none has exited.
    Live,
    None,
}

/// Resources released when a slot goes back to the free list.
#[derive(Debug)]
pub struct Released {
    pub pid: Pid,
    pub kstack: Option<KernelStack>,
    pub pgdir: Option<AddrSpace>,
}

/// The process table: every PCB plus the lists that partition them.
///
/// Every slot is on exactly one list. Non-runnable processes sit on the
/// list for their state; runnable ones sit on the ready list for their
/// priority. The `Runnable` state list is never used.
pub struct ProcTable {
    pub(crate) procs: Vec<Proc>,
    pub(crate) lists: [ProcList; ProcState::COUNT],
    pub(crate) ready: Vec<ProcList>,
    pub(crate) promote_at: u64,
    pub(crate) next_pid: u32,
    pub(crate) initproc: Option<usize>,
    pub(crate) cpus: Vec<Cpu>,
    pub(crate) config: Config,
}

impl ProcTable {
    /// Empty table with every slot on the free list.
    pub fn new(config: Config) -> Self {
        let mut table = ProcTable {
            procs: (0..config.nproc).map(|_| Proc::new()).collect(),
            lists: [ProcList::new(); ProcState::COUNT],
            ready: vec![ProcList::new(); config.max_prio as usize + 1],
            promote_at: config.ticks_to_promote,
            next_pid: 1,
            initproc: None,
            cpus: vec![Cpu::default(); config.ncpu],
            config,
        };
        for slot in 0..config.nproc {
            table.link(ListId::State(ProcState::Unused), slot);
        }
        table
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn proc(&self, slot: usize) -> &Proc {
        &self.procs[slot]
    }

    pub(crate) fn proc_mut(&mut self, slot: usize) -> &mut Proc {
        &mut self.procs[slot]
    }

    pub fn initproc(&self) -> Option<usize> {
        self.initproc
    }

    pub(crate) fn set_initproc(&mut self, slot: usize) {
        self.initproc = Some(slot);
    }

    /// Slot running on `cpu`, if any.
    pub fn current(&self, cpu: usize) -> Option<usize> {
        self.cpus.get(cpu).and_then(|c| c.proc)
    }

    pub fn promote_at(&self) -> u64 {
        self.promote_at
    }

    // ── List plumbing ───────────────────────────────────────

    fn list_id(&self, slot: usize) -> ListId {
        let p = &self.procs[slot];
        match p.state {
            ProcState::Runnable => ListId::Ready(p.priority),
            state => ListId::State(state),
        }
    }

    pub(crate) fn list(&self, id: ListId) -> &ProcList {
        match id {
            ListId::State(state) => &self.lists[state.index()],
            ListId::Ready(prio) => &self.ready[prio as usize],
        }
    }

    pub(crate) fn link(&mut self, id: ListId, slot: usize) {
        let ProcTable { procs, lists, ready, .. } = self;
        match id {
            ListId::State(state) => lists[state.index()].push_back(procs, slot),
            ListId::Ready(prio) => ready[prio as usize].push_back(procs, slot),
        }
    }

    pub(crate) fn unlink(&mut self, id: ListId, slot: usize) {
        let ProcTable { procs, lists, ready, .. } = self;
        let removed = match id {
            ListId::State(state) => lists[state.index()].remove(procs, slot),
            ListId::Ready(prio) => ready[prio as usize].remove(procs, slot),
        };
        if removed.is_err() {
            panic!("stateListRemove failed! slot {} not on {:?}", slot, id);
        }
    }

    pub(crate) fn assert_state(&self, slot: usize, expected: ProcState) {
        let actual = self.procs[slot].state;
        if actual != expected {
            panic!(
                "Incorrect state! pid {} is {:?}, expected {:?}",
                self.procs[slot].pid, actual, expected
            );
        }
    }

    /// Move `slot` from the list for `from` to the list for `to`.
    ///
    /// `update` runs after the state changes and before the process is
    /// relinked, so it may change the priority a runnable process is
    /// queued at.
    pub(crate) fn transition<F>(&mut self, slot: usize, from: ProcState, to: ProcState, update: F)
    where
        F: FnOnce(&mut Proc, &Config),
    {
        let src = self.list_id(slot);
        self.unlink(src, slot);
        self.assert_state(slot, from);
        let config = self.config;
        let p = &mut self.procs[slot];
        p.state = to;
        update(p, &config);
        let dst = self.list_id(slot);
        self.link(dst, slot);
    }

    /// Slots on the given state list, head first.
    pub fn slots_in(&self, state: ProcState) -> Vec<usize> {
        match state {
            ProcState::Runnable => (0..=self.config.max_prio)
                .rev()
                .flat_map(|prio| self.ready_slots(prio))
                .collect(),
            state => self.lists[state.index()].iter(&self.procs).collect(),
        }
    }

    pub fn ready_slots(&self, prio: u32) -> Vec<usize> {
        match self.ready.get(prio as usize) {
            Some(list) => list.iter(&self.procs).collect(),
            None => Vec::new(),
        }
    }

    pub fn pids_in(&self, state: ProcState) -> Vec<Pid> {
        self.slots_in(state).into_iter().map(|s| self.procs[s].pid).collect()
    }

    pub fn count(&self, state: ProcState) -> usize {
        self.slots_in(state).len()
    }

    /// Ready lists from priority 0 up, then the given state lists in order.
    fn scan(&self, states: &[ProcState]) -> Vec<usize> {
        let mut slots: Vec<usize> = (0..=self.config.max_prio)
            .flat_map(|prio| self.ready_slots(prio))
            .collect();
        for &state in states {
            slots.extend(self.lists[state.index()].iter(&self.procs));
        }
        slots
    }

    fn find_in(&self, pid: Pid, states: &[ProcState]) -> Option<usize> {
        self.scan(states).into_iter().find(|&s| self.procs[s].pid == pid)
    }

    /// Any allocated slot carrying `pid`.
    pub fn find_pid(&self, pid: Pid) -> Option<usize> {
        if pid.0 == 0 {
            return None;
        }
        (0..self.procs.len())
            .find(|&s| self.procs[s].state != ProcState::Unused && self.procs[s].pid == pid)
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Claim a free slot as an embryo with a fresh pid at the top priority.
    pub fn allocproc(&mut self, now: u64) -> Option<usize> {
        let slot = self.lists[ProcState::Unused.index()].head()?;
        let pid = Pid(self.next_pid);
        // Pid 0 is never handed out.
        self.next_pid = match self.next_pid.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        self.transition(slot, ProcState::Unused, ProcState::Embryo, |p, cfg| {
            p.pid = pid;
            p.start_ticks = now;
            p.cpu_ticks_in = 0;
            p.cpu_ticks_total = 0;
            p.priority = cfg.max_prio;
            p.budget = cfg.default_budget;
            p.killed = false;
            p.chan = None;
            p.parent = None;
        });
        Some(slot)
    }

    /// Hand an embryo's slot back after a failed setup.
    pub fn free_embryo(&mut self, slot: usize) -> Released {
        let p = &mut self.procs[slot];
        let released = Released { pid: p.pid, kstack: p.kstack.take(), pgdir: p.pgdir.take() };
        self.transition(slot, ProcState::Embryo, ProcState::Unused, |p, _| p.clear_identity());
        released
    }

    pub fn make_runnable(&mut self, slot: usize) {
        self.transition(slot, ProcState::Embryo, ProcState::Runnable, |_, _| {});
    }

    /// Put `slot` on `cpu` and mark it running.
    pub fn dispatch(&mut self, slot: usize, cpu: usize, now: u64) {
        self.cpus[cpu].proc = Some(slot);
        self.transition(slot, ProcState::Runnable, ProcState::Running, |p, _| {
            p.cpu_ticks_in = now;
            p.cpu = Some(cpu);
        });
    }

    /// `cpu` is back in its scheduler context.
    pub fn release_cpu(&mut self, cpu: usize) {
        self.cpus[cpu].proc = None;
    }

    /// Running to runnable, charging the ticks just used.
    pub fn yield_transition(&mut self, slot: usize, now: u64) {
        self.transition(slot, ProcState::Running, ProcState::Runnable, |p, cfg| {
            charge(p, now, cfg)
        });
    }

    /// Running to sleeping on `chan`, charging the ticks just used.
    pub fn sleep_transition(&mut self, slot: usize, chan: Channel, now: u64) {
        self.transition(slot, ProcState::Running, ProcState::Sleeping, |p, cfg| {
            p.chan = Some(chan);
            charge(p, now, cfg);
        });
    }

    /// Make every process sleeping on `chan` runnable. Returns how many woke.
    pub fn wakeup(&mut self, chan: Channel) -> usize {
        let sleepers: Vec<usize> = self.lists[ProcState::Sleeping.index()]
            .iter(&self.procs)
            .filter(|&s| self.procs[s].chan == Some(chan))
            .collect();
        for &slot in &sleepers {
            self.transition(slot, ProcState::Sleeping, ProcState::Runnable, |p, _| p.chan = None);
        }
        sleepers.len()
    }

    /// Running to zombie. Wakes the parent and hands every child to the
    /// root process, waking it if one of them has already exited.
    pub fn exit_transition(&mut self, slot: usize) {
        let init = match self.initproc {
            Some(init) if init != slot => init,
            _ => panic!("init exiting"),
        };

        if let Some(parent) = self.procs[slot].parent {
            self.wakeup(Channel::Proc(parent));
        }

        let mut adopted_zombie = false;
        for child in self.scan(&[
            ProcState::Embryo,
            ProcState::Sleeping,
            ProcState::Running,
            ProcState::Zombie,
        ]) {
            let p = &mut self.procs[child];
            if p.parent == Some(slot) {
                p.parent = Some(init);
                adopted_zombie |= p.state == ProcState::Zombie;
            }
        }
        if adopted_zombie {
            self.wakeup(Channel::Proc(init));
        }

        self.transition(slot, ProcState::Running, ProcState::Zombie, |_, _| {});
    }

    /// Look for children of `parent`.
    pub fn scan_children(&self, parent: usize) -> Children {
        let mut found = false;
        for slot in self.scan(&[
            ProcState::Embryo,
            ProcState::Sleeping,
            ProcState::Running,
            ProcState::Zombie,
        ]) {
            let p = &self.procs[slot];
            if p.parent != Some(parent) {
                continue;
            }
            if p.state == ProcState::Zombie {
                return Children::Zombie(slot);
            }
            found = true;
        }
        if found {
            Children::Live
        } else {
            Children::None
        }
    }

    /// Zombie back to unused. The caller frees what is returned.
    pub fn reap(&mut self, slot: usize) -> Released {
        let p = &mut self.procs[slot];
        let released = Released { pid: p.pid, kstack: p.kstack.take(), pgdir: p.pgdir.take() };
        self.transition(slot, ProcState::Zombie, ProcState::Unused, |p, _| p.clear_identity());
        released
    }

    /// Flag `pid` as killed, waking it if it sleeps.
    pub fn kill(&mut self, pid: Pid) -> Option<usize> {
        let slot = self.find_in(
            pid,
            &[ProcState::Embryo, ProcState::Sleeping, ProcState::Running],
        )?;
        self.procs[slot].killed = true;
        if self.procs[slot].state == ProcState::Sleeping {
            self.transition(slot, ProcState::Sleeping, ProcState::Runnable, |p, _| p.chan = None);
        }
        Some(slot)
    }

    /// Slot of `pid` among processes whose priority may be read or set.
    pub(crate) fn find_prioritized(&self, pid: Pid) -> Option<usize> {
        self.find_in(pid, &[ProcState::Sleeping, ProcState::Running])
    }

    // ── Consistency ─────────────────────────────────────────

    /// Verify that the lists partition the table and agree with each
    /// process's state and priority.
    pub fn check_invariants(&self) -> Result<(), String> {
        let nproc = self.procs.len();
        let mut seen = vec![false; nproc];

        let mut ids: Vec<ListId> = ProcState::ALL
            .iter()
            .map(|&s| ListId::State(s))
            .collect();
        ids.extend((0..=self.config.max_prio).map(ListId::Ready));

        for id in ids {
            let list = self.list(id);
            let mut last = None;
            for (count, slot) in list.iter(&self.procs).enumerate() {
                if count >= nproc {
                    return Err(format!("{:?} has a cycle", id));
                }
                if seen[slot] {
                    return Err(format!("slot {} linked twice (again on {:?})", slot, id));
                }
                seen[slot] = true;
                last = Some(slot);

                let p = &self.procs[slot];
                match id {
                    ListId::State(ProcState::Runnable) => {
                        return Err(format!("slot {} on the unused runnable list", slot));
                    }
                    ListId::State(state) if p.state != state => {
                        return Err(format!("slot {} is {:?} but on {:?}", slot, p.state, id));
                    }
                    ListId::Ready(prio) if p.state != ProcState::Runnable || p.priority != prio => {
                        return Err(format!(
                            "slot {} is {:?} at priority {} but on {:?}",
                            slot, p.state, p.priority, id
                        ));
                    }
                    _ => {}
                }
            }
            if list.tail() != last {
                return Err(format!("{:?} tail is {:?}, last element {:?}", id, list.tail(), last));
            }
        }

        if let Some(slot) = seen.iter().position(|s| !s) {
            return Err(format!("slot {} is on no list", slot));
        }

        let mut pids: Vec<u32> = Vec::new();
        for p in &self.procs {
            if p.priority > self.config.max_prio {
                return Err(format!("pid {} has priority {}", p.pid, p.priority));
            }
            if p.state == ProcState::Unused {
                continue;
            }
            if pids.contains(&p.pid.0) {
                return Err(format!("pid {} assigned twice", p.pid));
            }
            pids.push(p.pid.0);
        }

        Ok(())
    }
}

/// Bill `p` for the ticks since it was dispatched. A process that has
/// spent its budget drops one level and starts a fresh budget there.
pub(crate) fn charge(p: &mut Proc, now: u64, config: &Config) {
    let used = now.saturating_sub(p.cpu_ticks_in) as i64;
    p.budget -= used;
    if p.budget <= 0 {
        if p.priority > 0 {
            p.priority -= 1;
        }
        p.budget = config.default_budget;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ProcTable {
        ProcTable::new(Config { nproc: 8, ncpu: 2, ..Config::with_max_prio(2) })
    }

    /// Allocate and queue a process, returning its slot.
    fn spawn(t: &mut ProcTable, parent: Option<usize>) -> usize {
        let slot = t.allocproc(0).unwrap();
        t.proc_mut(slot).parent = parent;
        t.make_runnable(slot);
        slot
    }

    /// Root process running on cpu 0.
    fn boot(t: &mut ProcTable) -> usize {
        let init = spawn(t, None);
        t.set_initproc(init);
        t.dispatch(init, 0, 0);
        init
    }

    #[test]
    fn new_table_is_all_free() {
        let t = table();
        assert_eq!(t.count(ProcState::Unused), 8);
        assert_eq!(t.slots_in(ProcState::Unused), (0..8).collect::<Vec<_>>());
        t.check_invariants().unwrap();
    }

    #[test]
    fn pid_counter_wraps_past_zero() {
        let mut t = table();
        t.next_pid = u32::MAX;
        let a = t.allocproc(0).unwrap();
        let b = t.allocproc(0).unwrap();
        assert_eq!(t.proc(a).pid, Pid(u32::MAX));
        assert_eq!(t.proc(b).pid, Pid(1));
        assert_eq!(t.next_pid, 2);
    }

    #[test]
    fn allocproc_hands_out_increasing_pids_at_top_priority() {
        let mut t = table();
        let a = t.allocproc(5).unwrap();
        let b = t.allocproc(6).unwrap();
        assert_eq!(t.proc(a).pid, Pid(1));
        assert_eq!(t.proc(b).pid, Pid(2));
        assert_eq!(t.proc(a).state, ProcState::Embryo);
        assert_eq!(t.proc(a).priority, 2);
        assert_eq!(t.proc(a).budget, t.config().default_budget);
        assert_eq!(t.proc(b).start_ticks, 6);
        t.check_invariants().unwrap();
    }

    #[test]
    fn allocproc_fails_when_full() {
        let mut t = table();
        for _ in 0..8 {
            assert!(t.allocproc(0).is_some());
        }
        assert_eq!(t.allocproc(0), None);
        t.check_invariants().unwrap();
    }

    #[test]
    fn free_embryo_recycles_slot() {
        let mut t = table();
        let slot = t.allocproc(0).unwrap();
        t.proc_mut(slot).kstack = Some(KernelStack(9));
        let released = t.free_embryo(slot);
        assert_eq!(released.kstack, Some(KernelStack(9)));
        assert_eq!(t.proc(slot).pid, Pid(0));
        assert_eq!(t.count(ProcState::Unused), 8);
        // The freed slot goes to the back of the free list.
        assert_eq!(t.slots_in(ProcState::Unused).last(), Some(&slot));
        t.check_invariants().unwrap();
    }

    #[test]
    fn runnable_processes_queue_by_priority() {
        let mut t = table();
        let a = spawn(&mut t, None);
        let b = spawn(&mut t, None);
        assert_eq!(t.ready_slots(2), [a, b]);
        assert!(t.lists[ProcState::Runnable.index()].is_empty());
        t.check_invariants().unwrap();
    }

    #[test]
    fn yield_charges_and_requeues_at_tail() {
        let mut t = table();
        let a = spawn(&mut t, None);
        let b = spawn(&mut t, None);
        t.dispatch(a, 0, 100);
        assert_eq!(t.current(0), Some(a));
        t.yield_transition(a, 140);
        t.release_cpu(0);
        assert_eq!(t.proc(a).budget, t.config().default_budget - 40);
        assert_eq!(t.ready_slots(2), [b, a]);
        t.check_invariants().unwrap();
    }

    #[test]
    fn spent_budget_demotes_and_resets() {
        let mut t = table();
        let a = spawn(&mut t, None);
        t.dispatch(a, 0, 0);
        let budget = t.config().default_budget as u64;
        t.yield_transition(a, budget);
        t.release_cpu(0);
        assert_eq!(t.proc(a).priority, 1);
        assert_eq!(t.proc(a).budget, t.config().default_budget);
        assert_eq!(t.ready_slots(1), [a]);
        t.check_invariants().unwrap();
    }

    #[test]
    fn demotion_stops_at_zero() {
        let mut t = table();
        let a = spawn(&mut t, None);
        let budget = t.config().default_budget as u64;
        for round in 0..5 {
            let start = round * budget;
            t.dispatch(a, 0, start);
            t.yield_transition(a, start + budget);
            t.release_cpu(0);
        }
        assert_eq!(t.proc(a).priority, 0);
        assert_eq!(t.ready_slots(0), [a]);
    }

    #[test]
    fn sleep_and_wakeup_on_channel() {
        let mut t = table();
        let a = spawn(&mut t, None);
        let b = spawn(&mut t, None);
        for (slot, chan) in [(a, Channel::Addr(1)), (b, Channel::Addr(2))] {
            t.dispatch(slot, 0, 0);
            t.sleep_transition(slot, chan, 10);
            t.release_cpu(0);
        }
        assert_eq!(t.proc(a).chan, Some(Channel::Addr(1)));
        assert_eq!(t.wakeup(Channel::Addr(3)), 0);
        assert_eq!(t.wakeup(Channel::Addr(1)), 1);
        assert_eq!(t.proc(a).state, ProcState::Runnable);
        assert_eq!(t.proc(a).chan, None);
        assert_eq!(t.proc(b).state, ProcState::Sleeping);
        assert_eq!(t.proc(a).budget, t.config().default_budget - 10);
        t.check_invariants().unwrap();
    }

    #[test]
    fn exit_reparents_children_to_init() {
        let mut t = table();
        let init = boot(&mut t);
        t.yield_transition(init, 0);
        t.release_cpu(0);

        let parent = spawn(&mut t, Some(init));
        let child = spawn(&mut t, Some(parent));
        t.dispatch(parent, 0, 0);
        t.exit_transition(parent);
        t.release_cpu(0);

        assert_eq!(t.proc(child).parent, Some(init));
        assert_eq!(t.proc(parent).state, ProcState::Zombie);
        assert_eq!(t.scan_children(init), Children::Zombie(parent));
        t.check_invariants().unwrap();
    }

    #[test]
    fn exit_wakes_waiting_parent() {
        let mut t = table();
        let init = boot(&mut t);
        let child = spawn(&mut t, Some(init));
        t.sleep_transition(init, Channel::Proc(init), 0);
        t.release_cpu(0);

        t.dispatch(child, 0, 0);
        t.exit_transition(child);
        assert_eq!(t.proc(init).state, ProcState::Runnable);
    }

    #[test]
    fn adopting_a_zombie_wakes_init() {
        let mut t = table();
        let init = boot(&mut t);
        t.sleep_transition(init, Channel::Proc(init), 0);
        t.release_cpu(0);

        let parent = spawn(&mut t, Some(init));
        let child = spawn(&mut t, Some(parent));
        t.dispatch(child, 0, 0);
        t.exit_transition(child);
        t.release_cpu(0);
        // init is still asleep: the child's parent is not init.
        assert_eq!(t.proc(init).state, ProcState::Sleeping);

        // The parent never waits; exiting hands the zombie to init and wakes it.
        // Its own exit also wakes init as the direct parent.
        t.dispatch(parent, 0, 0);
        t.exit_transition(parent);
        t.release_cpu(0);
        assert_eq!(t.proc(child).parent, Some(init));
        assert_eq!(t.proc(init).state, ProcState::Runnable);
        t.check_invariants().unwrap();
    }

    #[test]
    #[should_panic(expected = "init exiting")]
    fn init_may_not_exit() {
        let mut t = table();
        let init = boot(&mut t);
        t.exit_transition(init);
    }

    #[test]
    fn scan_children_distinguishes_live_and_none() {
        let mut t = table();
        let init = boot(&mut t);
        assert_eq!(t.scan_children(init), Children::None);
        spawn(&mut t, Some(init));
        assert_eq!(t.scan_children(init), Children::Live);
    }

    #[test]
    fn reap_returns_resources_and_frees_slot() {
        let mut t = table();
        let init = boot(&mut t);
        let child = spawn(&mut t, Some(init));
        t.proc_mut(child).pgdir = Some(AddrSpace(3));
        t.proc_mut(child).kstack = Some(KernelStack(4));
        t.release_cpu(0);
        t.dispatch(child, 1, 0);
        t.exit_transition(child);
        t.release_cpu(1);

        let released = t.reap(child);
        assert_eq!(released.pid, Pid(2));
        assert_eq!(released.pgdir, Some(AddrSpace(3)));
        assert_eq!(released.kstack, Some(KernelStack(4)));
        let p = t.proc(child);
        assert_eq!((p.pid, p.parent, p.killed), (Pid(0), None, false));
        assert!(p.name.is_empty());
        assert_eq!(t.count(ProcState::Unused), 7);
        t.check_invariants().unwrap();
    }

    #[test]
    fn kill_flags_and_wakes_sleeper() {
        let mut t = table();
        let a = spawn(&mut t, None);
        t.dispatch(a, 0, 0);
        t.sleep_transition(a, Channel::Ticks, 0);
        t.release_cpu(0);

        let pid = t.proc(a).pid;
        assert_eq!(t.kill(pid), Some(a));
        assert!(t.proc(a).killed);
        assert_eq!(t.proc(a).state, ProcState::Runnable);
        assert_eq!(t.kill(Pid(99)), None);
        t.check_invariants().unwrap();
    }

    #[test]
    fn kill_ignores_zombies() {
        let mut t = table();
        let init = boot(&mut t);
        let child = spawn(&mut t, Some(init));
        t.release_cpu(0);
        t.dispatch(child, 1, 0);
        t.exit_transition(child);
        assert_eq!(t.kill(t.proc(child).pid), None);
    }

    #[test]
    #[should_panic(expected = "Incorrect state!")]
    fn transition_from_wrong_state_panics() {
        let mut t = table();
        let a = spawn(&mut t, None);
        // a is runnable, not running.
        t.transition(a, ProcState::Running, ProcState::Zombie, |_, _| {});
    }

    #[test]
    #[should_panic(expected = "stateListRemove failed!")]
    fn unlink_of_absent_slot_panics() {
        let mut t = table();
        t.unlink(ListId::State(ProcState::Zombie), 0);
    }

    #[test]
    fn invariant_check_spots_mismatched_state() {
        let mut t = table();
        let a = spawn(&mut t, None);
        t.proc_mut(a).state = ProcState::Sleeping;
        assert!(t.check_invariants().is_err());
    }

    #[test]
    fn find_pid_skips_free_slots() {
        let mut t = table();
        let a = spawn(&mut t, None);
        assert_eq!(t.find_pid(Pid(1)), Some(a));
        assert_eq!(t.find_pid(Pid(0)), None);
        assert_eq!(t.find_pid(Pid(2)), None);
    }
}
