use std::cell::{Cell, RefCell};
use std::rc::Rc;

use raytha_editor_core::{EditorEvent, EventBus, EventKind, Listener, ListenerId};
use raytha_wysiwyg::{
    EditingEngine, EditorModel, EditorState, EditorStateManager, ManualClock, SearchResult, WysiwygConfig,
};
use serde_json::Value;

#[derive(Default)]
struct FakeEngine {
    bus: EventBus,
    html: String,
    bold: bool,
    text_align: String,
    transaction: u64,
}

impl FakeEngine {
    fn set_html(&mut self, html: &str) {
        self.html = html.to_string();
        self.emit(EventKind::Update);
    }

    fn move_caret(&mut self, bold: bool) {
        self.bold = bold;
        self.emit(EventKind::SelectionUpdate);
    }

    /// A keystroke: the document and the caret move in one transaction.
    fn type_html(&mut self, html: &str) {
        self.html = html.to_string();
        self.transaction += 1;
        for kind in [EventKind::SelectionUpdate, EventKind::Update] {
            self.bus.emit(&EditorEvent {
                kind,
                transaction: self.transaction,
                source: None,
            });
        }
    }

    fn emit(&mut self, kind: EventKind) {
        self.transaction += 1;
        self.bus.emit(&EditorEvent {
            kind,
            transaction: self.transaction,
            source: None,
        });
    }
}

impl EditingEngine for FakeEngine {
    fn is_active(&self, name: &str, attrs: Option<&Value>) -> bool {
        match (name, attrs) {
            ("bold", None) => self.bold,
            ("paragraph", None) => true,
            ("", Some(attrs)) => attrs["textAlign"] == self.text_align.as_str(),
            _ => false,
        }
    }

    fn get_attributes(&self, _name: &str) -> Value {
        Value::Object(Default::default())
    }

    fn get_html(&self) -> String {
        self.html.clone()
    }

    fn word_count(&self) -> usize {
        self.html.split_whitespace().count()
    }

    fn cursor_breadcrumb(&self) -> String {
        "p".into()
    }

    fn search_status(&self) -> SearchResult {
        SearchResult::default()
    }

    fn extension_enabled(&self, _name: &str) -> bool {
        false
    }

    fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.bus.on(kind, listener)
    }

    fn off(&mut self, id: ListenerId) -> bool {
        self.bus.off(id)
    }
}

struct Harness {
    engine: Rc<RefCell<FakeEngine>>,
    clock: Rc<ManualClock>,
    manager: EditorStateManager<FakeEngine>,
}

fn harness() -> Harness {
    let engine = Rc::new(RefCell::new(FakeEngine {
        html: "<p></p>".into(),
        text_align: "left".into(),
        ..FakeEngine::default()
    }));
    let clock = Rc::new(ManualClock::new());
    let manager = EditorStateManager::new(Rc::clone(&engine), clock.clone(), &WysiwygConfig::default());
    Harness { engine, clock, manager }
}

fn counter() -> (Rc<Cell<usize>>, impl FnMut(&EditorState, Option<&EditorState>) + 'static) {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    (calls, move |_: &EditorState, _: Option<&EditorState>| seen.set(seen.get() + 1))
}

#[test]
fn subscribe_calls_back_once_without_previous() {
    let mut h = harness();
    let seen: Rc<RefCell<Vec<(EditorState, bool)>>> = Rc::default();
    let log = Rc::clone(&seen);

    let _subscription = h.manager.subscribe(move |state, previous| {
        log.borrow_mut().push((state.clone(), previous.is_some()));
    });

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, h.manager.get_state());
    assert!(!seen[0].1);
    assert_eq!(seen[0].0.text_align, "left");
    assert_eq!(seen[0].0.words, "1 word");
}

#[test]
fn force_update_without_changes_notifies_at_most_once() {
    let mut h = harness();
    let (calls, callback) = counter();
    let _subscription = h.manager.subscribe(callback);

    h.engine.borrow_mut().bold = true;
    h.manager.force_update();
    let first = h.manager.get_state();
    h.manager.force_update();

    assert_eq!(h.manager.get_state(), first);
    assert_eq!(calls.get(), 2);
    assert_eq!(h.manager.stats().notifications, 1);
}

#[test]
fn rapid_content_changes_recompute_at_most_twice() {
    let mut h = harness();
    let contents: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = Rc::clone(&contents);
    h.manager
        .set_content_change_callback(move |html| sink.borrow_mut().push(html.to_string()));

    for i in 1..=10 {
        h.engine.borrow_mut().set_html(&format!("<p>{}</p>", "w ".repeat(i)));
        h.manager.process_events();
        h.clock.advance_ms(40);
    }
    h.clock.advance_ms(200);
    h.manager.run_pending();
    h.clock.advance_ms(600);
    h.manager.run_pending();

    assert!(h.manager.stats().recomputes <= 2, "{:?}", h.manager.stats());
    let last = format!("<p>{}</p>", "w ".repeat(10));
    assert_eq!(contents.borrow().last(), Some(&last));
    assert_eq!(h.manager.last_content(), last);
    assert_eq!(h.manager.next_deadline(), None);
}

#[test]
fn keystrokes_with_caret_moves_stay_on_the_content_path() {
    let mut h = harness();

    for i in 1..=10 {
        h.engine.borrow_mut().type_html(&format!("<p>{}</p>", "a".repeat(i)));
        h.manager.process_events();
        h.clock.advance_ms(40);
    }
    for _ in 0..2 {
        h.clock.advance_ms(600);
        h.manager.run_pending();
    }

    assert!(h.manager.stats().recomputes <= 2, "{:?}", h.manager.stats());
    assert_eq!(h.manager.last_content(), format!("<p>{}</p>", "a".repeat(10)));
    assert_eq!(h.manager.next_deadline(), None);
}

#[test]
fn typing_into_a_real_editor_recomputes_at_most_twice() {
    let clock = Rc::new(ManualClock::new());
    let mut model = EditorModel::with_clock(&WysiwygConfig::default(), clock.clone());

    for _ in 0..10 {
        assert!(model.type_text("a"));
        clock.advance_ms(40);
        model.tick();
    }
    for _ in 0..2 {
        clock.advance_ms(600);
        model.tick();
    }

    let stats = model.state_manager().stats();
    assert!(stats.recomputes <= 2, "{stats:?}");
    assert_eq!(model.get_html(), "<p>aaaaaaaaaa</p>");
    assert_eq!(model.state_manager().last_content(), "<p>aaaaaaaaaa</p>");
    assert_eq!(model.state_manager().get_state().words, "1 word");
    assert_eq!(model.next_deadline(), None);
}

#[test]
fn unchanged_html_skips_recompute_and_callback() {
    let mut h = harness();
    let writes = Rc::new(Cell::new(0));
    let sink = Rc::clone(&writes);
    h.manager.set_content_change_callback(move |_| sink.set(sink.get() + 1));

    h.engine.borrow_mut().set_html("<p></p>");
    h.manager.process_events();

    assert_eq!(writes.get(), 0);
    assert_eq!(h.manager.stats().content_checks, 1);
    assert_eq!(h.manager.stats().recomputes, 0);
}

#[test]
fn selection_updates_are_throttled_separately() {
    let mut h = harness();
    let (calls, callback) = counter();
    let _subscription = h.manager.subscribe(callback);

    h.engine.borrow_mut().move_caret(true);
    h.manager.process_events();
    assert!(h.manager.get_state().marks.bold);
    assert_eq!(calls.get(), 2);

    h.clock.advance_ms(100);
    h.engine.borrow_mut().move_caret(false);
    h.manager.process_events();
    assert!(h.manager.get_state().marks.bold);

    h.clock.advance_ms(400);
    h.manager.run_pending();
    assert!(!h.manager.get_state().marks.bold);
    assert_eq!(calls.get(), 3);
}

#[test]
fn destroy_cancels_timers_before_detaching() {
    let mut h = harness();
    let (calls, callback) = counter();
    let _subscription = h.manager.subscribe(callback);

    h.engine.borrow_mut().set_html("<p>a</p>");
    h.manager.process_events();
    h.engine.borrow_mut().set_html("<p>a b</p>");
    h.manager.process_events();
    assert!(h.manager.next_deadline().is_some());
    let calls_before = calls.get();

    h.manager.destroy();
    h.manager.destroy();
    assert!(h.manager.is_destroyed());
    assert_eq!(h.engine.borrow().bus.len(), 0);
    assert_eq!(h.manager.subscriber_count(), 0);
    assert_eq!(h.manager.next_deadline(), None);

    h.clock.advance_ms(2_000);
    h.engine.borrow_mut().set_html("<p>late</p>");
    h.manager.process_events();
    h.manager.run_pending();
    h.manager.force_update();
    assert_eq!(calls.get(), calls_before);
}

#[test]
fn destroy_is_safe_when_nothing_fired() {
    let mut h = harness();
    h.manager.destroy();
    h.manager.run_pending();
    assert_eq!(h.manager.stats().recomputes, 0);
}

#[test]
fn panicking_subscriber_does_not_block_the_others() {
    let mut h = harness();
    let _panicky = h.manager.subscribe(|_, previous| {
        if previous.is_some() {
            panic!("subscriber bug");
        }
    });
    let (calls, callback) = counter();
    let _subscription = h.manager.subscribe(callback);

    h.engine.borrow_mut().bold = true;
    h.manager.force_update();

    assert_eq!(calls.get(), 2);
    assert_eq!(h.manager.stats().subscriber_panics, 1);
    assert_eq!(h.manager.subscriber_count(), 2);
}

#[test]
fn unsubscribed_callbacks_stop_receiving() {
    let mut h = harness();
    let (calls, callback) = counter();
    let subscription = h.manager.subscribe(callback);
    let (other_calls, other) = counter();
    let other_subscription = h.manager.subscribe(other);

    subscription.unsubscribe();
    assert!(h.manager.unsubscribe(other_subscription.id()));
    assert!(!h.manager.unsubscribe(other_subscription.id()));

    h.engine.borrow_mut().bold = true;
    h.manager.force_update();
    assert_eq!(calls.get(), 1);
    assert_eq!(other_calls.get(), 1);
}
