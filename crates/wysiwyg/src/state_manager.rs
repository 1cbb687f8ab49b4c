//! Derives [`EditorState`] snapshots from a live engine and fans them out.
//!
//! Engine listeners only queue the event kind with its transaction number.
//! A selection change whose transaction also updated the document is left
//! to the content path. The queue is drained by
//! [`EditorStateManager::process_events`], which feeds the throttles and
//! runs any leading-edge work; [`EditorStateManager::run_pending`] fires
//! trailing work whose deadline has passed. Content checks compare the
//! serialized HTML first and only recompute the snapshot when it moved.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::time::Instant;

use raytha_editor_core::{Editor, EventKind, ListenerId};

use crate::clock::Clock;
use crate::config::{TextStyleDefaults, WysiwygConfig};
use crate::engine::EditingEngine;
use crate::state::EditorState;
use crate::timing::{Debounce, Throttle};

pub type StateCallback = Box<dyn FnMut(&EditorState, Option<&EditorState>)>;
pub type ContentCallback = Box<dyn FnMut(&str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Rc<RefCell<StateCallback>>)>,
}

impl Subscribers {
    fn insert(&mut self, callback: Rc<RefCell<StateCallback>>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, callback));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }
}

/// Handle returned by [`EditorStateManager::subscribe`].
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe()"]
pub struct Subscription {
    id: SubscriptionId,
    subscribers: Weak<RefCell<Subscribers>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Takes effect from the next notification on, also when called from
    /// inside a subscriber.
    pub fn unsubscribe(self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.borrow_mut().remove(self.id);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateManagerStats {
    pub content_checks: u64,
    pub recomputes: u64,
    pub notifications: u64,
    pub subscriber_panics: u64,
}

pub struct EditorStateManager<E: EditingEngine = Editor> {
    engine: Rc<RefCell<E>>,
    clock: Rc<dyn Clock>,
    defaults: TextStyleDefaults,
    current: EditorState,
    previous: Option<EditorState>,
    last_content: String,
    subscribers: Rc<RefCell<Subscribers>>,
    content_callback: Option<ContentCallback>,
    queue: Rc<RefCell<VecDeque<(EventKind, u64)>>>,
    listeners: Vec<ListenerId>,
    content_throttle: Throttle,
    content_debounce: Debounce,
    selection_throttle: Throttle,
    stats: StateManagerStats,
    destroyed: bool,
}

impl<E: EditingEngine> EditorStateManager<E> {
    pub fn new(engine: Rc<RefCell<E>>, clock: Rc<dyn Clock>, config: &WysiwygConfig) -> Self {
        let queue: Rc<RefCell<VecDeque<(EventKind, u64)>>> = Rc::default();
        let (listeners, current, last_content) = {
            let mut engine = engine.borrow_mut();
            let listeners = [EventKind::Update, EventKind::SelectionUpdate]
                .into_iter()
                .map(|kind| {
                    let queue = Rc::clone(&queue);
                    engine.on(
                        kind,
                        Box::new(move |event| queue.borrow_mut().push_back((event.kind, event.transaction))),
                    )
                })
                .collect();
            let current = EditorState::capture(&*engine, &config.text_style);
            (listeners, current, engine.get_html())
        };

        Self {
            engine,
            clock,
            defaults: config.text_style.clone(),
            current,
            previous: None,
            last_content,
            subscribers: Rc::default(),
            content_callback: None,
            queue,
            listeners,
            content_throttle: Throttle::new(config.content_throttle()),
            content_debounce: Debounce::new(config.content_debounce()),
            selection_throttle: Throttle::new(config.selection_throttle()),
            stats: StateManagerStats::default(),
            destroyed: false,
        }
    }

    /// Registers `callback` and calls it once with `(current, None)` before returning.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&EditorState, Option<&EditorState>) + 'static,
    ) -> Subscription {
        let callback: Rc<RefCell<StateCallback>> = Rc::new(RefCell::new(Box::new(callback)));
        let id = self.subscribers.borrow_mut().insert(Rc::clone(&callback));
        if !invoke(&callback, &self.current, None) {
            self.stats.subscriber_panics += 1;
            tracing::error!(subscriber = id.0, "subscriber panicked during subscribe");
        }
        Subscription {
            id,
            subscribers: Rc::downgrade(&self.subscribers),
        }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.borrow_mut().remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().entries.len()
    }

    pub fn get_state(&self) -> EditorState {
        self.current.clone()
    }

    pub fn previous_state(&self) -> Option<&EditorState> {
        self.previous.as_ref()
    }

    pub fn set_content_change_callback(&mut self, callback: impl FnMut(&str) + 'static) {
        self.content_callback = Some(Box::new(callback));
    }

    /// Recomputes now, ignoring throttle windows.
    pub fn force_update(&mut self) {
        if self.destroyed {
            tracing::debug!("force_update after destroy ignored");
            return;
        }
        self.update_state();
    }

    /// Checks the serialized HTML now and hands it to the content callback
    /// if it moved. Returns whether it did.
    pub fn sync_content(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.update_if_content_changed()
    }

    /// Takes the engine's current HTML as the last seen content without
    /// calling the content callback.
    pub fn reset_content_baseline(&mut self) {
        match self.engine.try_borrow() {
            Ok(engine) => self.last_content = engine.get_html(),
            Err(_) => tracing::warn!("engine busy; content baseline kept"),
        }
    }

    pub fn process_events(&mut self) {
        if self.destroyed {
            return;
        }
        let events: Vec<(EventKind, u64)> = self.queue.borrow_mut().drain(..).collect();
        if events.is_empty() {
            return;
        }
        let updated: Vec<u64> = events
            .iter()
            .filter(|(kind, _)| *kind == EventKind::Update)
            .map(|(_, transaction)| *transaction)
            .collect();

        let now = self.clock.now();
        for (kind, transaction) in events {
            match kind {
                EventKind::Update => {
                    let throttled = self.content_throttle.call(now);
                    let debounced = self.content_debounce.call(now);
                    if throttled || debounced {
                        self.update_if_content_changed();
                    }
                }
                EventKind::SelectionUpdate if updated.contains(&transaction) => {}
                EventKind::SelectionUpdate => {
                    if self.selection_throttle.call(now) {
                        self.update_state();
                    }
                }
                EventKind::Transaction => {}
            }
        }
    }

    pub fn run_pending(&mut self) {
        if self.destroyed {
            return;
        }
        self.process_events();

        let now = self.clock.now();
        let throttled = self.content_throttle.poll(now);
        let debounced = self.content_debounce.poll(now);
        if throttled || debounced {
            self.update_if_content_changed();
        }
        if self.selection_throttle.poll(now) {
            self.update_state();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.content_throttle.next_deadline(),
            self.content_debounce.next_deadline(),
            self.selection_throttle.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn stats(&self) -> StateManagerStats {
        self.stats
    }

    pub fn last_content(&self) -> &str {
        &self.last_content
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Cancels pending timers, then drops callbacks, then detaches from the engine.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.content_throttle.cancel();
        self.content_debounce.cancel();
        self.selection_throttle.cancel();

        self.content_callback = None;
        self.subscribers.borrow_mut().entries.clear();

        match self.engine.try_borrow_mut() {
            Ok(mut engine) => {
                for id in self.listeners.drain(..) {
                    engine.off(id);
                }
            }
            Err(_) => tracing::warn!("engine busy during destroy; listeners stay attached"),
        }
        self.queue.borrow_mut().clear();
        tracing::debug!(stats = ?self.stats, "state manager destroyed");
    }

    fn update_if_content_changed(&mut self) -> bool {
        self.stats.content_checks += 1;
        let Ok(engine) = self.engine.try_borrow() else {
            tracing::warn!("engine busy; content check skipped");
            return false;
        };
        let html = engine.get_html();
        drop(engine);

        if html == self.last_content {
            return false;
        }
        self.last_content = html;
        self.update_state();

        if let Some(callback) = self.content_callback.as_mut() {
            callback(&self.last_content);
        }
        true
    }

    fn update_state(&mut self) {
        let Ok(engine) = self.engine.try_borrow() else {
            tracing::warn!("engine busy; snapshot skipped");
            return;
        };
        let next = EditorState::capture(&*engine, &self.defaults);
        drop(engine);

        self.stats.recomputes += 1;
        if next == self.current {
            return;
        }
        self.previous = Some(std::mem::replace(&mut self.current, next));
        self.notify();
    }

    fn notify(&mut self) {
        let callbacks: Vec<(SubscriptionId, Rc<RefCell<StateCallback>>)> = self
            .subscribers
            .borrow()
            .entries
            .iter()
            .map(|(id, callback)| (*id, Rc::clone(callback)))
            .collect();

        for (id, callback) in callbacks {
            self.stats.notifications += 1;
            if !invoke(&callback, &self.current, self.previous.as_ref()) {
                self.stats.subscriber_panics += 1;
                tracing::error!(subscriber = id.0, "subscriber panicked; remaining subscribers still notified");
            }
        }
    }
}

/// Returns `false` when the callback panicked.
fn invoke(callback: &RefCell<StateCallback>, state: &EditorState, previous: Option<&EditorState>) -> bool {
    let Ok(mut guard) = callback.try_borrow_mut() else {
        tracing::warn!("subscriber is already running; nested notification skipped");
        return true;
    };
    let callback = &mut **guard;
    catch_unwind(AssertUnwindSafe(|| callback(state, previous))).is_ok()
}
