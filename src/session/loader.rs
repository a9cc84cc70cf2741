use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::config::session::EngineBundles;
use crate::foundation::core::LoadStage;
use crate::host::api::{Scheduler, ScriptInjector, ScriptOutcome, TimerId};

/// Progress reported by [`ScriptLoader`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LoadEvent {
    Loaded(LoadStage),
    Failed { stage: LoadStage, reason: String },
}

struct Deadline {
    scheduler: Rc<dyn Scheduler>,
    id: TimerId,
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.scheduler.clear(self.id);
    }
}

/// The outstanding injection. A timed-out attempt stays here: its `<script>` element is still in
/// the document and may yet execute.
struct Attempt {
    stage: LoadStage,
    generation: u64,
    timed_out: bool,
}

/// Loads the engine bundles one after another.
///
/// The tracker is injected only from inside the renderer's completion, so the second load can
/// never start before the first executed. Each bundle is injected at most once per attempt chain:
/// a timeout reports failure but keeps waiting on the same element, and [`ScriptLoader::resume`]
/// re-arms the deadline on it instead of injecting a duplicate. Completions from a cancelled
/// attempt are dropped.
pub(crate) struct ScriptLoader {
    scheduler: Rc<dyn Scheduler>,
    scripts: Rc<dyn ScriptInjector>,
    bundles: EngineBundles,
    timeout: Option<Duration>,
    generation: Cell<u64>,
    attempt: RefCell<Option<Attempt>>,
    deadline: RefCell<Option<Deadline>>,
    listener: Box<dyn Fn(LoadEvent)>,
}

impl ScriptLoader {
    pub(crate) fn new(
        scheduler: Rc<dyn Scheduler>,
        scripts: Rc<dyn ScriptInjector>,
        bundles: EngineBundles,
        timeout: Option<Duration>,
        listener: impl Fn(LoadEvent) + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            scheduler,
            scripts,
            bundles,
            timeout,
            generation: Cell::new(0),
            attempt: RefCell::new(None),
            deadline: RefCell::new(None),
            listener: Box::new(listener),
        })
    }

    /// Inject `stage` and, on success, every stage after it.
    pub(crate) fn start(self: &Rc<Self>, stage: LoadStage) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        *self.attempt.borrow_mut() = Some(Attempt {
            stage,
            generation,
            timed_out: false,
        });
        let src = self.bundles.locator(stage).to_string();
        tracing::debug!(?stage, %src, "injecting engine bundle");

        self.arm(stage, generation);

        let loader = Rc::downgrade(self);
        self.scripts.inject(
            &src,
            Box::new(move |outcome| {
                if let Some(loader) = loader.upgrade() {
                    loader.settle(generation, outcome);
                }
            }),
        );
    }

    /// Pick up a failed `stage` again.
    ///
    /// When the stage only timed out, its script is still pending: the deadline is re-armed on it
    /// and nothing is injected. After a script error the bundle is injected afresh.
    pub(crate) fn resume(self: &Rc<Self>, stage: LoadStage) {
        let pending = match self.attempt.borrow_mut().as_mut() {
            Some(attempt) if attempt.stage == stage && attempt.timed_out => {
                attempt.timed_out = false;
                Some(attempt.generation)
            }
            _ => None,
        };
        match pending {
            Some(generation) => {
                tracing::debug!(?stage, "waiting again on pending engine bundle");
                self.arm(stage, generation);
            }
            None => self.start(stage),
        }
    }

    /// Abandon the current attempt; its completion will be ignored.
    pub(crate) fn cancel(&self) {
        self.generation.set(self.generation.get() + 1);
        self.attempt.borrow_mut().take();
        self.deadline.borrow_mut().take();
    }

    fn arm(self: &Rc<Self>, stage: LoadStage, generation: u64) {
        let Some(timeout) = self.timeout else {
            return;
        };
        let loader = Rc::downgrade(self);
        let id = self.scheduler.set_timeout(
            timeout,
            Box::new(move || {
                if let Some(loader) = loader.upgrade() {
                    loader.expire(stage, generation, timeout);
                }
            }),
        );
        *self.deadline.borrow_mut() = Some(Deadline {
            scheduler: Rc::clone(&self.scheduler),
            id,
        });
    }

    fn expire(&self, stage: LoadStage, generation: u64, timeout: Duration) {
        let live = match self.attempt.borrow_mut().as_mut() {
            Some(attempt) if attempt.generation == generation && !attempt.timed_out => {
                attempt.timed_out = true;
                true
            }
            _ => false,
        };
        if !live {
            return;
        }
        self.deadline.borrow_mut().take();
        let reason = format!("timed out after {} ms", timeout.as_millis());
        tracing::warn!(?stage, %reason, "engine bundle stalled");
        (self.listener)(LoadEvent::Failed { stage, reason });
    }

    fn settle(self: &Rc<Self>, generation: u64, outcome: ScriptOutcome) {
        let stage = {
            let mut slot = self.attempt.borrow_mut();
            match slot.as_ref() {
                Some(attempt) if attempt.generation == generation => {
                    let stage = attempt.stage;
                    *slot = None;
                    stage
                }
                _ => {
                    tracing::debug!(?outcome, "ignoring completion of abandoned load");
                    return;
                }
            }
        };
        self.deadline.borrow_mut().take();

        match outcome {
            ScriptOutcome::Loaded => {
                tracing::info!(?stage, "engine bundle executed");
                (self.listener)(LoadEvent::Loaded(stage));
                if self.generation.get() != generation {
                    // cancelled from inside the listener
                    return;
                }
                if let Some(next) = stage.next() {
                    self.start(next);
                }
            }
            ScriptOutcome::Failed(reason) => {
                tracing::warn!(?stage, %reason, "engine bundle failed to load");
                (self.listener)(LoadEvent::Failed { stage, reason });
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/loader.rs"]
mod tests;
