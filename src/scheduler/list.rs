use super::task::Proc;

/// Singly linked list of table slots, threaded through [`Proc::next`].
///
/// A process sits on at most one list at a time, so a single link per slot
/// is enough. Appends are O(1); removal scans from the head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcList {
    head: Option<usize>,
    tail: Option<usize>,
}

/// The slot was not on the list it was removed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotLinked;

impl ProcList {
    pub const fn new() -> Self {
        ProcList { head: None, tail: None }
    }

    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn tail(&self) -> Option<usize> {
        self.tail
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn push_back(&mut self, procs: &mut [Proc], slot: usize) {
        procs[slot].next = None;
        match self.tail {
            None => self.head = Some(slot),
            Some(tail) => procs[tail].next = Some(slot),
        }
        self.tail = Some(slot);
    }

    pub fn remove(&mut self, procs: &mut [Proc], slot: usize) -> Result<(), NotLinked> {
        let mut prev = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if c == slot {
                break;
            }
            prev = Some(c);
            cur = procs[c].next;
        }
        if cur.is_none() {
            return Err(NotLinked);
        }

        let next = procs[slot].next.take();
        match prev {
            None => self.head = next,
            Some(p) => procs[p].next = next,
        }
        if self.tail == Some(slot) {
            self.tail = prev;
        }
        Ok(())
    }

    pub fn iter<'a>(&self, procs: &'a [Proc]) -> Iter<'a> {
        Iter { procs, cur: self.head }
    }

    pub fn len(&self, procs: &[Proc]) -> usize {
        self.iter(procs).count()
    }
}

pub struct Iter<'a> {
    procs: &'a [Proc],
    cur: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let slot = self.cur?;
        self.cur = self.procs[slot].next;
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn procs(n: usize) -> Vec<Proc> {
        (0..n).map(|_| Proc::new()).collect()
    }

    fn slots(list: &ProcList, procs: &[Proc]) -> Vec<usize> {
        list.iter(procs).collect()
    }

    #[test]
    fn push_keeps_insertion_order() {
        let mut p = procs(4);
        let mut list = ProcList::new();
        for s in [2, 0, 3] {
            list.push_back(&mut p, s);
        }
        assert_eq!(slots(&list, &p), [2, 0, 3]);
        assert_eq!(list.head(), Some(2));
        assert_eq!(list.tail(), Some(3));
        assert_eq!(list.len(&p), 3);
    }

    #[test]
    fn remove_only_element_empties_list() {
        let mut p = procs(2);
        let mut list = ProcList::new();
        list.push_back(&mut p, 1);
        assert_eq!(list.remove(&mut p, 1), Ok(()));
        assert!(list.is_empty());
        assert_eq!(list.tail(), None);
        list.push_back(&mut p, 0);
        assert_eq!(slots(&list, &p), [0]);
    }

    #[test]
    fn remove_tail_moves_tail_back() {
        let mut p = procs(3);
        let mut list = ProcList::new();
        for s in 0..3 {
            list.push_back(&mut p, s);
        }
        list.remove(&mut p, 2).unwrap();
        assert_eq!(list.tail(), Some(1));
        list.push_back(&mut p, 2);
        assert_eq!(slots(&list, &p), [0, 1, 2]);
    }

    #[test]
    fn remove_head_and_middle() {
        let mut p = procs(4);
        let mut list = ProcList::new();
        for s in 0..4 {
            list.push_back(&mut p, s);
        }
        list.remove(&mut p, 0).unwrap();
        list.remove(&mut p, 2).unwrap();
        assert_eq!(slots(&list, &p), [1, 3]);
        assert_eq!(p[2].next, None);
    }

    #[test]
    fn remove_missing_slot_fails_without_damage() {
        let mut p = procs(3);
        let mut list = ProcList::new();
        list.push_back(&mut p, 0);
        list.push_back(&mut p, 1);
        assert_eq!(list.remove(&mut p, 2), Err(NotLinked));
        assert_eq!(slots(&list, &p), [0, 1]);

        let mut empty = ProcList::new();
        assert_eq!(empty.remove(&mut p, 0), Err(NotLinked));
    }
}
