use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use hotswap::engine::{PatchUnit, Patcher};

/// One call made to the patcher, with the names it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchCall {
    Introduce(Vec<String>),
    Redefine(Vec<String>),
}

/// A fake patcher that:
/// - records every call and the names it carried
/// - can be told to fail either operation
/// - can sleep inside each call, to widen the application window
/// - tracks how many calls were ever in flight at once
#[derive(Debug, Default)]
pub struct FakePatcher {
    calls: Mutex<Vec<PatchCall>>,
    loaded: Mutex<HashSet<String>>,
    fail_introduce: AtomicBool,
    fail_redefine: AtomicBool,
    delay: Mutex<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakePatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `names` were loaded by the host before the monitor started.
    pub fn with_loaded(self, names: &[&str]) -> Self {
        {
            let mut loaded = self.loaded.lock().unwrap();
            loaded.extend(names.iter().map(|n| n.to_string()));
        }
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn fail_introduce(&self, fail: bool) {
        self.fail_introduce.store(fail, Ordering::SeqCst);
    }

    pub fn fail_redefine(&self, fail: bool) {
        self.fail_redefine.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<PatchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of patcher calls observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self, call: PatchCall) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn names(units: &[PatchUnit]) -> Vec<String> {
        units.iter().map(|u| u.name.clone()).collect()
    }
}

impl Patcher for FakePatcher {
    fn introduce_new(&self, units: &[PatchUnit]) -> Result<()> {
        self.enter(PatchCall::Introduce(Self::names(units)));
        let result = if self.fail_introduce.load(Ordering::SeqCst) {
            Err(anyhow!("introduce rejected"))
        } else {
            self.loaded.lock().unwrap().extend(Self::names(units));
            Ok(())
        };
        self.leave();
        result
    }

    fn redefine_existing(&self, units: &[PatchUnit]) -> Result<()> {
        self.enter(PatchCall::Redefine(Self::names(units)));
        let result = if self.fail_redefine.load(Ordering::SeqCst) {
            Err(anyhow!("redefine rejected"))
        } else {
            Ok(())
        };
        self.leave();
        result
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().unwrap().contains(name)
    }
}
