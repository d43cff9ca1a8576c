//! The dispatcher: event loop, scene state machine, and injection points.
//!
//! One mutex serialises everything. The backend's cycle thread takes it per
//! input event; [`Engine::process_event`], [`Engine::output_event`] and
//! [`Engine::run_async`] take it from other threads and may interleave
//! between events of the same drain. Pending scene switches live in a pair
//! of atomics so [`Engine::switch_scene`] itself never needs the lock.

use std::mem;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use segue_midi::MidiEvent;
use tracing::debug;

use crate::backend::{Backend, CycleCallback, InitCallback};
use crate::buffer::EventBuffer;
use crate::diag::RtLog;
use crate::error::{Error, Result};
use crate::matcher::PatchMatcher;
use crate::patch::PatchRef;
use crate::sanitize::Sanitize;
use crate::scene::{Scene, SceneRegistry};

/// Sentinel for "no scene on this axis".
const UNSET: i32 = -1;

/// Notification seam for an embedded scripting runtime.
///
/// Called under the process mutex while a scene switch is applied. The
/// implementation must not call back into the engine; record the request
/// and act on it later, e.g. through [`AsyncHandle::run`].
pub trait ControlHook: Send + Sync {
    fn scene_switch(&self, scene: i32, subscene: i32);
}

/// Parameterless continuation handed to the scripting runtime.
///
/// Holds only a weak reference, so an outstanding handle never keeps the
/// engine alive.
#[derive(Clone)]
pub struct AsyncHandle {
    engine: Weak<Engine>,
}

impl AsyncHandle {
    /// Flush a pending scene switch, if the engine still exists.
    pub fn run(&self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.run_async();
        }
    }
}

/// Per-cycle timing counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub cycles: u64,
    pub total: Duration,
    pub max: Duration,
}

impl CycleStats {
    fn record(&mut self, elapsed: Duration) {
        self.cycles += 1;
        self.total += elapsed;
        if elapsed > self.max {
            self.max = elapsed;
        }
    }

    pub fn mean(&self) -> Duration {
        if self.cycles == 0 {
            Duration::ZERO
        } else {
            self.total.div_f64(self.cycles as f64)
        }
    }
}

// arc-swap needs a sized payload, so the trait objects ride inside slots
struct BackendSlot(Arc<dyn Backend>);
struct HookSlot(Arc<dyn ControlHook>);

/// Everything guarded by the process mutex.
struct EngineState {
    scenes: SceneRegistry,
    current_patch: Option<PatchRef>,
    current_scene: i32,
    current_subscene: i32,
    ctrl_patch: Option<PatchRef>,
    pre_patch: Option<PatchRef>,
    post_patch: Option<PatchRef>,
    matcher: PatchMatcher,
    buffer: EventBuffer,
    stats: CycleStats,
}

/// The event-routing engine.
pub struct Engine {
    backend: ArcSwapOption<BackendSlot>,
    state: Mutex<EngineState>,
    pending_scene: AtomicI32,
    pending_subscene: AtomicI32,
    sanitize_patch: PatchRef,
    hook: ArcSwapOption<HookSlot>,
    _log: RtLog,
}

impl Engine {
    pub fn new(backend: Arc<dyn Backend>, verbose: bool) -> Arc<Self> {
        let (log, warn) = RtLog::spawn();
        let sanitize_patch: PatchRef = Arc::new(Sanitize::new(backend.clone(), verbose, warn));

        Arc::new(Self {
            backend: ArcSwapOption::from(Some(Arc::new(BackendSlot(backend)))),
            state: Mutex::new(EngineState {
                scenes: SceneRegistry::new(),
                current_patch: None,
                current_scene: UNSET,
                current_subscene: UNSET,
                ctrl_patch: None,
                pre_patch: None,
                post_patch: None,
                matcher: PatchMatcher::new(),
                buffer: EventBuffer::new(),
                stats: CycleStats::default(),
            }),
            pending_scene: AtomicI32::new(UNSET),
            pending_subscene: AtomicI32::new(UNSET),
            sanitize_patch,
            hook: ArcSwapOption::from(None),
            _log: log,
        })
    }

    /// Register a subscene of scene `id`, creating the scene if absent.
    pub fn add_scene(
        &self,
        id: i32,
        patch: PatchRef,
        init_patch: Option<PatchRef>,
        exit_patch: Option<PatchRef>,
    ) -> Result<()> {
        if id < 0 {
            return Err(Error::InvalidSceneId(id));
        }
        self.state
            .lock()
            .scenes
            .add(id, Scene::new(patch, init_patch, exit_patch));
        Ok(())
    }

    pub fn has_scene(&self, id: i32) -> bool {
        self.state.lock().scenes.has_scene(id)
    }

    /// Install the global ctrl/pre/post patches. Callable once.
    pub fn set_processing(
        &self,
        ctrl_patch: Option<PatchRef>,
        pre_patch: Option<PatchRef>,
        post_patch: Option<PatchRef>,
    ) -> Result<()> {
        let mut st = self.state.lock();
        if st.ctrl_patch.is_some() || st.pre_patch.is_some() || st.post_patch.is_some() {
            return Err(Error::ProcessingAlreadySet);
        }
        st.ctrl_patch = ctrl_patch;
        st.pre_patch = pre_patch;
        st.post_patch = post_patch;
        Ok(())
    }

    pub fn set_hook(&self, hook: Arc<dyn ControlHook>) {
        self.hook.store(Some(Arc::new(HookSlot(hook))));
    }

    /// Continuation for the scripting runtime to flush pending switches.
    pub fn async_handle(self: &Arc<Self>) -> AsyncHandle {
        AsyncHandle {
            engine: Arc::downgrade(self),
        }
    }

    /// Arm the backend. The initial scene defaults to the lowest registered
    /// id; the initial subscene to 0. Fails if the target does not exist.
    pub fn start(
        self: &Arc<Self>,
        initial_scene: Option<i32>,
        initial_subscene: Option<i32>,
    ) -> Result<()> {
        let backend = self
            .backend
            .load_full()
            .ok_or_else(|| Error::Backend("backend already released".into()))?;

        let (scene, subscene) = {
            let st = self.state.lock();
            let scene = match initial_scene {
                Some(id) => id,
                None => st.scenes.default_scene_id().ok_or(Error::NoScenes)?,
            };
            let subscene = initial_subscene.unwrap_or(UNSET);
            let index = if subscene == UNSET { 0 } else { subscene };
            if index < 0 || st.scenes.get(scene, index as usize).is_none() {
                return Err(Error::SceneNotFound {
                    scene,
                    subscene: index,
                });
            }
            (scene, subscene)
        };

        let weak = Arc::downgrade(self);
        let init: InitCallback = Box::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.run_init(scene, subscene);
            }
        });

        let weak = Arc::downgrade(self);
        let cycle: CycleCallback = Box::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.run_cycle();
            }
        });

        backend.0.start(init, cycle)
    }

    /// Request a scene switch; axes left as `None` are untouched. Takes
    /// effect at the end of the current cycle, or on the next
    /// [`Engine::run_async`] flush.
    pub fn switch_scene(&self, scene: Option<i32>, subscene: Option<i32>) {
        if let Some(scene) = scene {
            self.pending_scene.store(scene, Ordering::SeqCst);
        }
        if let Some(subscene) = subscene {
            self.pending_subscene.store(subscene, Ordering::SeqCst);
        }
    }

    /// Flush a pending scene switch from outside the cycle thread.
    pub fn run_async(&self) {
        let Some(backend) = self.backend.load_full() else {
            return;
        };
        if self.pending_scene.load(Ordering::SeqCst) == UNSET
            && self.pending_subscene.load(Ordering::SeqCst) == UNSET
        {
            return;
        }

        let mut st = self.state.lock();
        let mut buffer = mem::take(&mut st.buffer);
        buffer.clear();
        self.process_scene_switch(&mut st, &mut buffer);
        backend.0.output_events(&mut buffer.iter());
        st.buffer = buffer;
    }

    /// Run one event through the full pipeline synchronously and return
    /// what it produced. Not realtime-safe; intended for ad-hoc injection.
    ///
    /// # Panics
    ///
    /// If no scene has been activated yet and scene 0 subscene 0 is not
    /// registered.
    pub fn process_event(&self, ev: &MidiEvent) -> Vec<MidiEvent> {
        let mut st = self.state.lock();
        if st.current_patch.is_none() {
            let scene = st
                .scenes
                .get(0, 0)
                .expect("scene 0 subscene 0 must be registered before process_event");
            st.current_patch = Some(scene.patch.clone());
        }

        let mut buffer = EventBuffer::new();
        self.process(&mut st, &mut buffer, ev);
        self.process_scene_switch(&mut st, &mut buffer);
        buffer.to_vec()
    }

    /// Send one event straight to the backend, bypassing all patches.
    pub fn output_event(&self, ev: &MidiEvent) {
        let Some(backend) = self.backend.load_full() else {
            return;
        };
        let _guard = self.state.lock();
        backend.0.output_event(ev);
    }

    /// Active `(scene, subscene)`, or `None` before the first activation.
    pub fn current_scene(&self) -> Option<(i32, i32)> {
        let st = self.state.lock();
        if st.current_scene == UNSET {
            None
        } else {
            Some((st.current_scene, st.current_subscene))
        }
    }

    pub fn cycle_stats(&self) -> CycleStats {
        self.state.lock().stats
    }

    /// Monotonic seconds; the timebase handed to scripting runtimes.
    pub fn time(&self) -> f64 {
        crate::time::monotonic_seconds()
    }

    fn run_init(&self, scene: i32, subscene: i32) {
        let Some(backend) = self.backend.load_full() else {
            return;
        };
        let mut st = self.state.lock();
        let mut buffer = mem::take(&mut st.buffer);
        buffer.clear();

        self.pending_scene.store(scene, Ordering::SeqCst);
        self.pending_subscene.store(subscene, Ordering::SeqCst);
        self.process_scene_switch(&mut st, &mut buffer);

        backend.0.output_events(&mut buffer.iter());
        st.buffer = buffer;
    }

    fn run_cycle(&self) {
        let Some(backend) = self.backend.load_full() else {
            return;
        };
        // lock per event, not per drain, so injections may interleave
        while let Some(ev) = backend.0.input_event() {
            let started = Instant::now();
            let mut st = self.state.lock();
            let mut buffer = mem::take(&mut st.buffer);
            buffer.clear();

            self.process(&mut st, &mut buffer, &ev);
            self.process_scene_switch(&mut st, &mut buffer);

            st.stats.record(started.elapsed());
            backend.0.output_events(&mut buffer.iter());
            st.buffer = buffer;
        }
    }

    /// The per-event pipeline: ctrl patch over the whole buffer, then pre,
    /// matched, post and sanitise patches over the live range rooted at the
    /// event. Stages see events appended by earlier stages.
    fn process(&self, st: &mut EngineState, buffer: &mut EventBuffer, ev: &MidiEvent) {
        debug_assert!(buffer.is_empty());

        let Some(current) = st.current_patch.clone() else {
            return;
        };
        let patch = st.matcher.match_patch(ev, &current);

        if let Some(ctrl) = st.ctrl_patch.clone() {
            let pos = buffer.push(ev.clone());
            let whole = buffer.range_from(pos);
            ctrl.process(buffer, whole);
        }

        let pos = buffer.push(ev.clone());
        let range = buffer.range_from(pos);

        if let Some(pre) = st.pre_patch.clone() {
            pre.process(buffer, range);
        }

        patch.process(buffer, range);

        if let Some(post) = st.post_patch.clone() {
            post.process(buffer, range);
        }

        self.sanitize_patch.process(buffer, range);
    }

    /// Apply a pending scene switch, if any.
    ///
    /// Pending axes are consumed atomically up front: a switch requested by
    /// the hook while this runs stays pending for the next invocation
    /// instead of recursing. An invalid target aborts the switch silently,
    /// with both axes already cleared.
    fn process_scene_switch(&self, st: &mut EngineState, buffer: &mut EventBuffer) {
        let pending_scene = self.pending_scene.swap(UNSET, Ordering::SeqCst);
        let pending_subscene = self.pending_subscene.swap(UNSET, Ordering::SeqCst);
        if pending_scene == UNSET && pending_subscene == UNSET {
            return;
        }

        if st.scenes.len() > 1 {
            if let Some(hook) = self.hook.load_full() {
                hook.0.scene_switch(pending_scene, pending_subscene);
            }
        }

        let scene_num = if pending_scene != UNSET {
            pending_scene
        } else {
            st.current_scene
        };
        // an unspecified subscene resets to 0, it does not carry over
        let subscene_num = if pending_subscene != UNSET {
            pending_subscene
        } else {
            0
        };

        let target = if subscene_num >= 0 {
            st.scenes.get(scene_num, subscene_num as usize).cloned()
        } else {
            None
        };
        let Some(target) = target else {
            return;
        };

        // drive the exit patch of the still-current scene first
        if st.current_scene != UNSET {
            let prev = st
                .scenes
                .get(st.current_scene, st.current_subscene as usize)
                .cloned();
            if let Some(exit) = prev.and_then(|scene| scene.exit_patch.clone()) {
                self.run_transition(st, buffer, &exit);
            }
        }

        if let Some(init) = target.init_patch.clone() {
            self.run_transition(st, buffer, &init);
        }

        st.current_patch = Some(target.patch.clone());
        st.current_scene = scene_num;
        st.current_subscene = subscene_num;
        debug!(scene = scene_num, subscene = subscene_num, "scene switched");
    }

    /// Feed a `Dummy` event through a transition patch, then post and
    /// sanitise stages.
    fn run_transition(&self, st: &EngineState, buffer: &mut EventBuffer, patch: &PatchRef) {
        let pos = buffer.push(MidiEvent::dummy());
        let range = buffer.range_from(pos);

        patch.process(buffer, range);
        if let Some(post) = st.post_patch.clone() {
            post.process(buffer, range);
        }
        self.sanitize_patch.process(buffer, range);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // stop the backend before the hook goes away; its cycle thread may
        // still be mid-callback
        if let Some(backend) = self.backend.swap(None) {
            backend.0.stop();
        }
        self.hook.store(None);
    }
}
