// crates/core/src/progress.rs
//! Progress reporting seam between the blocking pipeline and whoever tracks
//! the job (the server's job registry, or a test recorder).

use crate::types::Phase;

/// Receives phase transitions and completion fractions from a running compile.
///
/// Implementations must be cheap: `completion` is called once per visited file.
pub trait CompileObserver: Send + Sync {
    /// A new phase started; completion restarts at 0.0.
    fn phase_started(&self, phase: Phase);

    /// Completion of the current phase, in `[0.0, 1.0]`.
    fn completion(&self, fraction: f32);

    /// Polled between phases and between files.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CompileObserver for NoopObserver {
    fn phase_started(&self, _phase: Phase) {}
    fn completion(&self, _fraction: f32) {}
}

/// Forwards completion values, dropping any that would move backwards.
#[derive(Debug, Default)]
pub struct MonotonicProgress {
    last: f32,
}

impl MonotonicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `value` (clamped to `[0, 1]`) if it does not go backwards.
    pub fn advance(&mut self, observer: &dyn CompileObserver, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if value >= self.last {
            self.last = value;
            observer.completion(value);
        }
    }

    pub fn last(&self) -> f32 {
        self.last
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::CompileObserver;
    use crate::types::Phase;

    /// Records every event, for asserting on progress sequences.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub events: Mutex<Vec<(Phase, f32)>>,
        current: Mutex<Option<Phase>>,
        pub cancel: AtomicBool,
    }

    impl RecordingObserver {
        pub fn completions(&self, phase: Phase) -> Vec<f32> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| *p == phase)
                .map(|(_, c)| *c)
                .collect()
        }

        pub fn phases(&self) -> Vec<Phase> {
            let mut phases: Vec<Phase> = Vec::new();
            for (phase, _) in self.events.lock().unwrap().iter() {
                if phases.last() != Some(phase) {
                    phases.push(*phase);
                }
            }
            phases
        }
    }

    impl CompileObserver for RecordingObserver {
        fn phase_started(&self, phase: Phase) {
            *self.current.lock().unwrap() = Some(phase);
            self.events.lock().unwrap().push((phase, 0.0));
        }

        fn completion(&self, fraction: f32) {
            let phase = self.current.lock().unwrap().unwrap_or(Phase::Initializing);
            self.events.lock().unwrap().push((phase, fraction));
        }

        fn is_cancelled(&self) -> bool {
            self.cancel.load(Ordering::Relaxed)
        }
    }
}
