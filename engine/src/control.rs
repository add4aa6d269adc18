use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationState {
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

impl SimulationState {
    /// A run is in progress, paused or not.
    pub fn is_active(self) -> bool {
        matches!(self, SimulationState::Running | SimulationState::Paused)
    }
}

/// Run state shared by the controlling thread and the workers.
///
/// The state itself lives behind a mutex and every change is broadcast on the condvar. The stop
/// and pause flags mirror it in atomics so that workers can poll them between transport steps
/// without locking.
#[derive(Debug)]
pub(crate) struct RunControl {
    state: Mutex<SimulationState>,
    changed: Condvar,
    stop: AtomicBool,
    paused: AtomicBool,
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimulationState::Idle),
            changed: Condvar::new(),
            stop: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SimulationState {
        *self.lock()
    }

    /// Enters `Running`. Returns false if a run is already active.
    pub fn begin(&self) -> bool {
        let mut state = self.lock();
        if state.is_active() {
            return false;
        }
        self.stop.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        *state = SimulationState::Running;
        self.changed.notify_all();
        true
    }

    pub fn pause(&self) -> bool {
        let mut state = self.lock();
        if *state != SimulationState::Running {
            return false;
        }
        *state = SimulationState::Paused;
        self.paused.store(true, Ordering::SeqCst);
        self.changed.notify_all();
        true
    }

    pub fn resume(&self) -> bool {
        let mut state = self.lock();
        if *state != SimulationState::Paused {
            return false;
        }
        *state = SimulationState::Running;
        self.paused.store(false, Ordering::SeqCst);
        self.changed.notify_all();
        true
    }

    /// Asks every worker to leave its loop and wakes the paused ones.
    pub fn request_stop(&self) {
        let _state = self.lock();
        self.stop.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.changed.notify_all();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Cooperative checkpoint between transport steps: blocks while paused. Returns false when the
    /// caller must stop.
    pub fn checkpoint(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return false;
        }
        if !self.paused.load(Ordering::Relaxed) {
            return true;
        }
        let mut state = self.lock();
        while *state == SimulationState::Paused && !self.stop.load(Ordering::SeqCst) {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !self.stop.load(Ordering::SeqCst)
    }

    /// Moves an active run to `to`; does nothing once the run has left Running/Paused.
    pub fn finish(&self, to: SimulationState) -> bool {
        let mut state = self.lock();
        if !state.is_active() {
            return false;
        }
        *state = to;
        self.paused.store(false, Ordering::SeqCst);
        self.changed.notify_all();
        true
    }

    /// Enters `Error` from any state and stops the workers.
    pub fn fail(&self) {
        let mut state = self.lock();
        *state = SimulationState::Error;
        self.stop.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.changed.notify_all();
    }

    /// Blocks until the run leaves Running/Paused.
    pub fn wait_until_settled(&self) -> SimulationState {
        let mut state = self.lock();
        while state.is_active() {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *state
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn transitions() {
        let control = RunControl::new();
        assert!(!control.pause());
        assert!(control.begin());
        assert!(!control.begin());
        assert!(control.pause());
        assert_eq!(control.state(), SimulationState::Paused);
        assert!(!control.pause());
        assert!(control.resume());
        assert!(control.finish(SimulationState::Completed));
        assert!(!control.finish(SimulationState::Idle));
        assert_eq!(control.state(), SimulationState::Completed);
        control.fail();
        assert_eq!(control.state(), SimulationState::Error);
        assert!(control.stop_requested());
    }

    #[test]
    fn paused_checkpoint_wakes_on_resume_and_stop() {
        let control = Arc::new(RunControl::new());
        control.begin();
        control.pause();
        let worker = {
            let control = control.clone();
            std::thread::spawn(move || control.checkpoint())
        };
        std::thread::sleep(Duration::from_millis(20));
        control.resume();
        assert!(worker.join().unwrap());

        control.pause();
        let worker = {
            let control = control.clone();
            std::thread::spawn(move || control.checkpoint())
        };
        std::thread::sleep(Duration::from_millis(20));
        control.request_stop();
        assert!(!worker.join().unwrap());
        assert!(!control.checkpoint());
    }
}
