use std::collections::BTreeSet;

use raytha_wysiwyg::view::{Dom, ICON_CHECK, ICON_EMPTY, NodeId, UpdateableComponent};
use raytha_wysiwyg::{EditorState, EditorView, FormatsState, SearchResult, TextStyleState, WysiwygConfig};

fn initial_state() -> EditorState {
    EditorState {
        text_style: TextStyleState {
            font_family: "Helvetica".into(),
            font_size: "16px".into(),
            color: "#000000".into(),
            line_height: "1.4".into(),
        },
        formats: FormatsState {
            paragraph: true,
            ..FormatsState::default()
        },
        text_align: "left".into(),
        cursor_position: "p".into(),
        words: "0 words".into(),
        ..EditorState::default()
    }
}

fn rendered_view() -> (EditorView, EditorState) {
    let mut view = EditorView::new(&WysiwygConfig::default());
    let state = initial_state();
    view.update_view(&state, None);
    view.dom_mut().clear_mutations();
    (view, state)
}

fn dropdown_root(dom: &Dom, scope: NodeId, role: &str) -> NodeId {
    dom.query(scope, &format!(r#"[data-dropdown-role="{role}"]"#)).unwrap()
}

fn item_icon(dom: &Dom, scope: NodeId, role: &str, param: &str, value: &str) -> NodeId {
    let menu = dropdown_root(dom, scope, role);
    let item = dom
        .query(menu, &format!(r#".dropdown-item[data-wysiwyg-{param}-param="{value}"]"#))
        .unwrap();
    dom.last_element_child(item).unwrap()
}

fn format_icon(dom: &Dom, scope: NodeId, role: &str, format: &str) -> NodeId {
    let menu = dropdown_root(dom, scope, role);
    let item = dom.query(menu, &format!(r#"[data-item-role="{format}"]"#)).unwrap();
    dom.last_element_child(item).unwrap()
}

fn is_checked(dom: &Dom, node: NodeId) -> bool {
    dom.has_class(node, ICON_CHECK) && !dom.has_class(node, ICON_EMPTY)
}

#[test]
fn first_render_checks_the_defaults() {
    let (view, _) = rendered_view();
    let dom = view.dom();
    let toolbar = view.toolbar().root();
    let menubar = view.menubar().root();

    assert!(is_checked(dom, item_icon(dom, toolbar, "fontFamily", "font-family", "Helvetica")));
    assert!(!is_checked(dom, item_icon(dom, toolbar, "fontFamily", "font-family", "Arial")));
    assert!(is_checked(dom, item_icon(dom, menubar, "line-height", "line-height", "1.4")));
    assert!(is_checked(dom, format_icon(dom, toolbar, "format", "paragraph")));
    assert_eq!(dom.text(dom.get_by_id("formatSpan").unwrap()), "Paragraph");
    assert_eq!(dom.text(dom.get_by_id("cursorPosition").unwrap()), "p");
}

#[test]
fn text_align_change_touches_only_alignment_indicators() {
    let (mut view, previous) = rendered_view();
    let state = EditorState {
        text_align: "center".into(),
        ..previous.clone()
    };

    view.update_view(&state, Some(&previous));

    let dom = view.dom();
    let toolbar = view.toolbar().root();
    let menubar = view.menubar().root();
    let label = dom.get_by_id("textAlignButton").unwrap();
    let expected: BTreeSet<NodeId> = [
        item_icon(dom, toolbar, "text-align", "text-align", "left"),
        item_icon(dom, toolbar, "text-align", "text-align", "center"),
        item_icon(dom, menubar, "text-align", "text-align", "left"),
        item_icon(dom, menubar, "text-align", "text-align", "center"),
        label,
    ]
    .into_iter()
    .collect();

    assert_eq!(dom.touched_nodes(), expected);
    assert!(is_checked(dom, item_icon(dom, toolbar, "text-align", "text-align", "center")));
    assert!(!is_checked(dom, item_icon(dom, toolbar, "text-align", "text-align", "left")));
    assert!(dom.has_class(label, "icon-text-align-center"));
    assert!(!dom.has_class(label, "icon-text-align-left"));
}

#[test]
fn identical_snapshots_write_nothing() {
    let (mut view, previous) = rendered_view();

    view.update_view(&previous.clone(), Some(&previous));

    assert!(view.dom().mutations().is_empty());
}

#[test]
fn mark_buttons_follow_the_snapshot() {
    let (mut view, previous) = rendered_view();
    let mut state = previous.clone();
    state.marks.bold = true;

    view.update_view(&state, Some(&previous));

    let dom = view.dom();
    let bold = dom.get_by_id("boldButton").unwrap();
    assert!(dom.has_class(bold, "active"));
    assert!(!dom.has_class(dom.get_by_id("italicButton").unwrap(), "active"));
    assert_eq!(dom.touched_nodes(), BTreeSet::from([bold]));
}

#[test]
fn heading_updates_format_label_and_checks() {
    let (mut view, previous) = rendered_view();
    let state = EditorState {
        formats: FormatsState {
            heading2: true,
            ..FormatsState::default()
        },
        ..previous.clone()
    };

    view.update_view(&state, Some(&previous));

    let dom = view.dom();
    let toolbar = view.toolbar().root();
    let menubar = view.menubar().root();
    assert_eq!(dom.text(dom.get_by_id("formatSpan").unwrap()), "Heading 2");
    assert!(is_checked(dom, format_icon(dom, toolbar, "format", "heading2")));
    assert!(!is_checked(dom, format_icon(dom, toolbar, "format", "paragraph")));
    assert!(is_checked(dom, format_icon(dom, menubar, "format", "heading2")));
}

#[test]
fn unknown_font_checks_the_default_but_shows_the_value() {
    let (mut view, previous) = rendered_view();
    let mut state = previous.clone();
    state.text_style.font_family = "Comic Sans".into();

    view.update_view(&state, Some(&previous));

    let dom = view.dom();
    let toolbar = view.toolbar().root();
    assert!(is_checked(dom, item_icon(dom, toolbar, "fontFamily", "font-family", "Helvetica")));
    assert_eq!(dom.text(dom.get_by_id("fontFamilySpan").unwrap()), "Comic Sans");
}

#[test]
fn color_swatches_take_the_current_color() {
    let (mut view, previous) = rendered_view();
    let mut state = previous.clone();
    state.text_style.color = "#e03e2d".into();
    state.highlight = Some("#f1c40f".into());

    view.update_view(&state, Some(&previous));
    {
        let dom = view.dom();
        let menubar = view.menubar().root();
        assert_eq!(dom.attr(dom.get_by_id("textCurrentColor").unwrap(), "fill"), Some("#e03e2d"));
        assert_eq!(dom.attr(dom.get_by_id("backgroundCurrentColor").unwrap(), "fill"), Some("#f1c40f"));
        assert!(is_checked(dom, item_icon(dom, menubar, "background-color", "color", "#f1c40f")));
    }

    view.dom_mut().clear_mutations();
    let cleared = EditorState {
        highlight: None,
        ..state.clone()
    };
    view.update_view(&cleared, Some(&state));

    assert!(view.dom().mutations().is_empty());
}

#[test]
fn invisible_characters_mark_both_controls() {
    let (mut view, previous) = rendered_view();
    let state = EditorState {
        invisible_characters: true,
        ..previous.clone()
    };

    view.update_view(&state, Some(&previous));

    let dom = view.dom();
    let button = dom
        .query(view.toolbar().root(), r#"button[data-command="toggleInvisibleCharacters"]"#)
        .unwrap();
    let item = dom
        .query(view.menubar().root(), r#"a[data-command="toggleInvisibleCharacters"]"#)
        .unwrap();
    assert!(dom.has_class(button, "active"));
    assert!(dom.has_class(item, ICON_CHECK));
}

#[test]
fn footer_shows_words_and_cursor_position() {
    let (mut view, previous) = rendered_view();
    let state = EditorState {
        words: "3 words".into(),
        cursor_position: "table > tableRow > tableCell > p".into(),
        ..previous.clone()
    };

    view.update_view(&state, Some(&previous));

    let dom = view.dom();
    assert_eq!(dom.text(dom.get_by_id("wordsCount").unwrap()), "3 words");
    assert_eq!(
        dom.text(dom.get_by_id("cursorPosition").unwrap()),
        "table > tableRow > tableCell > p"
    );
}

#[test]
fn search_dialog_counts_results_and_toggles() {
    let (mut view, previous) = rendered_view();
    assert!(!view.search_dialog().is_visible());
    assert_eq!(view.search_dialog().results_label(view.dom()), "0 of 0");

    let state = EditorState {
        search_result: SearchResult { total: 3, index: 2 },
        ..previous.clone()
    };
    view.update_view(&state, Some(&previous));
    assert_eq!(view.search_dialog().results_label(view.dom()), "2 of 3");

    assert!(view.toggle_search_and_replace());
    let root = view.search_dialog().root();
    assert!(!view.dom().has_class(root, "d-none"));
    assert!(!view.toggle_search_and_replace());
    assert!(view.dom().has_class(root, "d-none"));
}

#[test]
fn destroyed_view_ignores_snapshots() {
    let (mut view, previous) = rendered_view();
    let container = view.container();

    view.destroy();
    view.destroy();
    assert!(view.is_destroyed());
    assert!(!view.dom().is_attached(container));

    view.dom_mut().clear_mutations();
    let mut state = previous.clone();
    state.marks.italic = true;
    view.update_view(&state, Some(&previous));

    assert!(view.dom().mutations().is_empty());
    assert!(!view.toggle_search_and_replace());
}
