//! Shared engine handle with one-at-a-time execution.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::command::{EngineCommand, InvocationTag};
use super::probe::MediaInfo;
use super::{EngineResult, MediaEngine};

/// Cloneable handle to a single engine instance.
///
/// All clones share one gate: a probe or execute call blocks until any
/// operation already in flight (from this or another clone) has finished.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Box<dyn MediaEngine>,
    gate: Mutex<()>,
}

impl EngineHandle {
    pub fn new(engine: impl MediaEngine + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: Box::new(engine),
                gate: Mutex::new(()),
            }),
        }
    }

    /// Engine name (for logging).
    pub fn name(&self) -> &str {
        self.inner.engine.name()
    }

    /// Probe a file, waiting for exclusive use of the engine.
    pub fn probe(&self, tag: InvocationTag, path: &Path) -> EngineResult<MediaInfo> {
        let _guard = self.inner.gate.lock();
        tracing::debug!("[{}] probing {}", tag, path.display());
        self.inner.engine.probe(path)
    }

    /// Run a command, waiting for exclusive use of the engine.
    pub fn execute(
        &self,
        command: &EngineCommand,
        on_progress: &mut dyn FnMut(f64),
    ) -> EngineResult<()> {
        let _guard = self.inner.gate.lock();
        tracing::debug!("[{}] executing {} command", command.tag, self.name());
        self.inner.engine.execute(command, on_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::models::{JobId, Stage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Engine that records how many operations overlap.
    struct OverlapEngine {
        active: AtomicUsize,
        max_active: Arc<AtomicUsize>,
    }

    impl MediaEngine for OverlapEngine {
        fn name(&self) -> &str {
            "overlap"
        }

        fn probe(&self, _path: &Path) -> EngineResult<MediaInfo> {
            Err(EngineError::parse("overlap", "not supported"))
        }

        fn execute(
            &self,
            _command: &EngineCommand,
            on_progress: &mut dyn FnMut(f64),
        ) -> EngineResult<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            on_progress(1.0);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn operations_never_overlap() {
        let max_active = Arc::new(AtomicUsize::new(0));
        let handle = EngineHandle::new(OverlapEngine {
            active: AtomicUsize::new(0),
            max_active: Arc::clone(&max_active),
        });

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        let tag = InvocationTag::new(JobId::new(), Stage::Normalize);
                        let cmd = EngineCommand::new(tag, "/dev/null");
                        handle.execute(&cmd, &mut |_| {}).unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn forwards_progress() {
        let handle = EngineHandle::new(OverlapEngine {
            active: AtomicUsize::new(0),
            max_active: Arc::new(AtomicUsize::new(0)),
        });
        let tag = InvocationTag::new(JobId::new(), Stage::Mux);
        let mut seen = Vec::new();

        handle
            .execute(&EngineCommand::new(tag, "/dev/null"), &mut |f| seen.push(f))
            .unwrap();

        assert_eq!(seen, vec![1.0]);
        assert_eq!(handle.name(), "overlap");
    }
}
