#![allow(dead_code)]

use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use atomic_proc::hosted::Machine;
use atomic_proc::{Config, Kernel, Pid};

pub type K = Arc<Kernel<Machine>>;

pub const TIMEOUT: Duration = Duration::from_secs(20);

pub fn kernel(config: Config) -> K {
    Arc::new(Kernel::new(Machine::new(), config))
}

/// Start `ncpu` CPUs. The root process runs `body`, then reaps orphans
/// for the rest of its life.
pub fn boot<F>(k: &K, ncpu: usize, body: F) -> Vec<JoinHandle<()>>
where
    F: Fn(&K) + Send + Sync + 'static,
{
    let root = Arc::clone(k);
    k.userinit(Arc::new(move |_: isize| {
        body(&root);
        reap_forever(&root);
    }))
    .unwrap();
    Machine::boot(k, ncpu)
}

pub fn reap_forever(k: &K) -> ! {
    loop {
        if k.wait().is_err() {
            k.yield_now();
        }
    }
}

pub fn shutdown(k: &K, cpus: Vec<JoinHandle<()>>) {
    k.halt();
    for cpu in cpus {
        cpu.join().unwrap();
    }
}

/// Poll `cond` until it holds or the test times out.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

pub fn state_of(k: &K, pid: Pid) -> Option<&'static str> {
    k.getprocs(usize::MAX).into_iter().find(|u| u.pid == pid).map(|u| u.state)
}

/// A sender process closures can share.
pub struct Tx<T>(Arc<Mutex<mpsc::Sender<T>>>);

impl<T> Clone for Tx<T> {
    fn clone(&self) -> Self {
        Tx(Arc::clone(&self.0))
    }
}

impl<T> Tx<T> {
    pub fn send(&self, value: T) {
        let _ = self.0.lock().unwrap().send(value);
    }
}

pub fn channel<T>() -> (Tx<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel();
    (Tx(Arc::new(Mutex::new(tx))), rx)
}
