//! Tests for the widget system.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::error::{DomError, WidgetError};
    use crate::geometry::{Constraints, Size};
    use crate::widget::widgets::{HBox, VBox, VBoxWithResizeCallback};
    use crate::widget::{HIDDEN_CLASS, WidgetDelegate, WidgetId, WidgetTree};

    type Log = Arc<Mutex<Vec<String>>>;

    /// A widget that records its lifecycle notifications.
    struct Recorder {
        name: &'static str,
        log: Log,
        layouts: AtomicUsize,
    }

    impl Recorder {
        fn create(tree: &mut WidgetTree, name: &'static str, log: &Log) -> (WidgetId, Arc<Recorder>) {
            tree.create_typed_widget("div", |_, _| Recorder {
                name,
                log: log.clone(),
                layouts: AtomicUsize::new(0),
            })
        }

        fn record(&self, event: &str) {
            self.log.lock().push(format!("{}:{}", self.name, event));
        }
    }

    impl WidgetDelegate for Recorder {
        fn was_shown(&self, _tree: &mut WidgetTree, _widget: WidgetId) {
            self.record("was_shown");
        }

        fn will_hide(&self, _tree: &mut WidgetTree, _widget: WidgetId) {
            self.record("will_hide");
        }

        fn on_layout(&self, _tree: &mut WidgetTree, _widget: WidgetId) {
            self.layouts.fetch_add(1, Ordering::SeqCst);
        }

        fn child_was_detached(&self, _tree: &mut WidgetTree, _widget: WidgetId, _child: WidgetId) {
            self.record("child_was_detached");
        }
    }

    /// A widget that shows a child from inside its own `was_shown`.
    struct ShowsChildWhenShown {
        child: WidgetId,
    }

    impl WidgetDelegate for ShowsChildWhenShown {
        fn was_shown(&self, tree: &mut WidgetTree, widget: WidgetId) {
            if let Ok(element) = tree.element(widget) {
                tree.show(self.child, element, None).unwrap();
            }
        }
    }

    fn setup() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn show_as_root(tree: &mut WidgetTree, widget: WidgetId) {
        tree.mark_as_root(widget).unwrap();
        let body = tree.document().body();
        tree.show(widget, body, None).unwrap();
    }

    fn show_in(tree: &mut WidgetTree, widget: WidgetId, parent: WidgetId) {
        let element = tree.element(parent).unwrap();
        tree.show(widget, element, None).unwrap();
    }

    fn sized(tree: &mut WidgetTree, min: (f32, f32), preferred: (f32, f32)) -> WidgetId {
        let widget = tree.create();
        tree.set_minimum_and_preferred_sizes(widget, min.0, min.1, preferred.0, preferred.1)
            .unwrap();
        widget
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[test]
    fn test_was_shown_reaches_whole_subtree() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let (root, _) = Recorder::create(&mut tree, "R", &log);
        let (a, _) = Recorder::create(&mut tree, "A", &log);
        let (b, _) = Recorder::create(&mut tree, "B", &log);

        show_as_root(&mut tree, root);
        // B is attached while A is not showing yet: no notification.
        show_in(&mut tree, b, a);
        assert_eq!(tree.parent_widget(b), Some(a));
        assert!(!tree.is_showing(b));

        show_in(&mut tree, a, root);

        assert_eq!(*log.lock(), vec!["R:was_shown", "A:was_shown", "B:was_shown"]);
        assert!(tree.is_showing(a));
        assert!(tree.is_showing(b));
        assert_eq!(tree.children(root), vec![a]);
    }

    #[test]
    fn test_show_twice_is_noop() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let (root, _) = Recorder::create(&mut tree, "R", &log);
        let (a, _) = Recorder::create(&mut tree, "A", &log);
        show_as_root(&mut tree, root);

        show_in(&mut tree, a, root);
        show_in(&mut tree, a, root);

        let root_element = tree.element(root).unwrap();
        assert_eq!(tree.document().children(root_element).len(), 1);
        assert_eq!(tree.document().widget_counter(root_element), 1);
        assert_eq!(tree.children(root), vec![a]);
        let shown = log.lock().iter().filter(|e| *e == "A:was_shown").count();
        assert_eq!(shown, 1);
    }

    #[test]
    fn test_show_then_detach_round_trip() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let (root, _) = Recorder::create(&mut tree, "R", &log);
        let (a, _) = Recorder::create(&mut tree, "A", &log);
        show_as_root(&mut tree, root);
        let body = tree.document().body();
        let root_element = tree.element(root).unwrap();
        let a_element = tree.element(a).unwrap();

        show_in(&mut tree, a, root);
        assert_eq!(tree.document().widget_counter(body), 2);
        assert_eq!(tree.document().widget_counter(root_element), 1);

        log.lock().clear();
        tree.detach(a, false).unwrap();

        assert_eq!(tree.parent_widget(a), None);
        assert!(tree.children(root).is_empty());
        assert!(!tree.is_showing(a));
        assert!(!tree.is_visible(a));
        assert_eq!(tree.document().parent(a_element), None);
        assert_eq!(tree.document().widget_counter(root_element), 0);
        assert_eq!(tree.document().widget_counter(body), 1);
        assert_eq!(*log.lock(), vec!["A:will_hide", "R:child_was_detached"]);

        // Detaching again is a no-op.
        tree.detach(a, false).unwrap();
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_hide_on_detach_on_descendant_keeps_element() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let a = tree.create();
        let b = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, a, root);
        show_in(&mut tree, b, a);
        tree.set_hide_on_detach(b).unwrap();
        let root_element = tree.element(root).unwrap();
        let a_element = tree.element(a).unwrap();

        assert!(tree.should_hide_on_detach(a));
        tree.detach(a, false).unwrap();

        assert_eq!(tree.document().parent(a_element), Some(root_element));
        assert!(tree.document().has_class(a_element, HIDDEN_CLASS));
        assert_eq!(tree.parent_widget(a), None);
        assert!(!tree.is_showing(a));
        assert!(!tree.is_showing(b));
    }

    #[test]
    fn test_override_hide_on_detach_removes_element() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let a = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, a, root);
        tree.set_hide_on_detach(a).unwrap();
        let a_element = tree.element(a).unwrap();

        tree.detach(a, true).unwrap();

        assert_eq!(tree.document().parent(a_element), None);
        assert_eq!(tree.document().widget_counter(tree.element(root).unwrap()), 0);
    }

    #[test]
    fn test_hide_and_show_widget_in_place() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let root = tree.create();
        let (a, _) = Recorder::create(&mut tree, "A", &log);
        show_as_root(&mut tree, root);
        show_in(&mut tree, a, root);
        let a_element = tree.element(a).unwrap();

        tree.hide_widget(a).unwrap();
        tree.hide_widget(a).unwrap();
        assert!(!tree.is_visible(a));
        assert!(tree.document().has_class(a_element, HIDDEN_CLASS));
        assert_eq!(tree.document().parent(a_element), tree.element(root).ok());
        assert!(tree.visible_children(root).is_empty());

        tree.show_widget(a).unwrap();
        assert!(tree.is_showing(a));
        assert!(!tree.document().has_class(a_element, HIDDEN_CLASS));
        assert_eq!(*log.lock(), vec!["A:was_shown", "A:will_hide", "A:was_shown"]);
    }

    #[test]
    fn test_hook_showing_child_notifies_child_once() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let (child, _) = Recorder::create(&mut tree, "C", &log);
        let parent = tree.create_with_delegate(Arc::new(ShowsChildWhenShown { child }));
        let root = tree.create();
        show_as_root(&mut tree, root);

        show_in(&mut tree, parent, root);

        assert!(tree.is_showing(child));
        assert_eq!(*log.lock(), vec!["C:was_shown"]);
    }

    #[test]
    fn test_reparenting_moves_counters() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let left = tree.create();
        let right = tree.create();
        let leaf = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, left, root);
        show_in(&mut tree, right, root);
        show_in(&mut tree, leaf, left);

        show_in(&mut tree, leaf, right);

        assert_eq!(tree.parent_widget(leaf), Some(right));
        assert!(tree.children(left).is_empty());
        let document = tree.document();
        assert_eq!(document.widget_counter(tree.element(left).unwrap()), 0);
        assert_eq!(document.widget_counter(tree.element(right).unwrap()), 1);
        assert_eq!(document.widget_counter(tree.element(root).unwrap()), 3);
        assert!(tree.is_showing(leaf));
    }

    #[test]
    fn test_remove_widget_frees_subtree() {
        setup();
        let mut tree = WidgetTree::new();
        let panel = tree.create();
        let child = tree.create();
        show_in(&mut tree, child, panel);
        let panel_element = tree.element(panel).unwrap();
        let child_element = tree.element(child).unwrap();

        tree.remove_widget(panel).unwrap();

        assert!(!tree.contains(panel));
        assert!(!tree.contains(child));
        assert!(!tree.document().contains(panel_element));
        assert!(!tree.document().contains(child_element));
        assert!(tree.is_empty());
    }

    // =========================================================================
    // Contract violations
    // =========================================================================

    #[test]
    fn test_attach_errors() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        show_as_root(&mut tree, root);
        let root_element = tree.element(root).unwrap();

        let other_root = tree.create();
        tree.mark_as_root(other_root).unwrap();
        assert_eq!(
            tree.show(other_root, root_element, None),
            Err(WidgetError::RootUnderWidget(other_root))
        );

        let floating = tree.document().create_element("div");
        let widget = tree.create();
        assert_eq!(
            tree.show(widget, floating, None),
            Err(WidgetError::OrphanNode(floating))
        );

        tree.document().destroy(floating).unwrap();
        assert_eq!(
            tree.show(widget, floating, None),
            Err(WidgetError::InvalidParentElement(floating))
        );

        show_in(&mut tree, widget, root);
        assert_eq!(
            tree.remove_widget(widget),
            Err(WidgetError::NonRootRemoval(widget))
        );
        assert_eq!(
            tree.mark_as_externally_managed(widget),
            Err(WidgetError::ExternallyManagedAfterInsertion(widget))
        );
        assert_eq!(
            tree.mark_as_root(root),
            Err(WidgetError::RootAlreadyAttached(root))
        );
    }

    #[test]
    fn test_bad_insertion_point_leaves_widget_in_place() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        show_as_root(&mut tree, root);
        let first = tree.create();
        let second = tree.create();
        show_in(&mut tree, first, root);
        show_in(&mut tree, second, root);
        let widget = tree.create();
        show_in(&mut tree, widget, first);

        let second_element = tree.element(second).unwrap();
        let stray = tree.document().create_element("span");
        assert_eq!(
            tree.show(widget, second_element, Some(stray)),
            Err(WidgetError::Dom(DomError::NotAChild {
                parent: second_element,
                child: stray,
            }))
        );
        assert_eq!(tree.parent_widget(widget), Some(first));
        assert_eq!(tree.children(first), vec![widget]);
        assert!(tree.children(second).is_empty());
        assert!(tree.is_showing(widget));

        let fresh = tree.create();
        let root_element = tree.element(root).unwrap();
        let widget_element = tree.element(widget).unwrap();
        assert!(tree.show(fresh, root_element, Some(widget_element)).is_err());
        assert_eq!(tree.parent_widget(fresh), None);
        assert_eq!(tree.children(root), vec![first, second]);
    }

    #[test]
    fn test_plain_dom_cannot_move_widgets() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let a = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, a, root);
        let root_element = tree.element(root).unwrap();
        let a_element = tree.element(a).unwrap();
        let document = tree.document().clone();
        let elsewhere = document.create_child(document.body(), "div", None).unwrap();

        assert_eq!(
            document.remove(a_element),
            Err(DomError::RemoveWidgetViaRegularDom(a_element))
        );
        assert_eq!(
            document.append_child(elsewhere, a_element),
            Err(DomError::WidgetViaRegularDom(a_element))
        );
        assert_eq!(
            document.remove_children(root_element),
            Err(DomError::RemoveWidgetViaRegularDom(root_element))
        );
        assert!(tree.is_showing(a));

        // Plain elements inside a widget stay freely movable.
        let text = document.create_child(a_element, "span", None).unwrap();
        document.append_child(elsewhere, text).unwrap();
        assert_eq!(document.parent(text), Some(elsewhere));
    }

    #[test]
    fn test_invalid_constraints_rejected() {
        setup();
        let mut tree = WidgetTree::new();
        let widget = tree.create();

        let result = tree.set_minimum_and_preferred_sizes(widget, 100.0, 50.0, 50.0, 50.0);

        assert!(matches!(result, Err(WidgetError::Constraints(_))));
        assert!(tree.constraints(widget).is_zero());
    }

    #[test]
    fn test_externally_managed_widget_is_not_counted() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let editor = tree.create();
        show_as_root(&mut tree, root);
        tree.mark_as_externally_managed(editor).unwrap();

        show_in(&mut tree, editor, root);

        let root_element = tree.element(root).unwrap();
        assert!(tree.is_showing(editor));
        assert_eq!(tree.parent_widget(editor), Some(root));
        assert_eq!(tree.document().widget_counter(root_element), 0);

        tree.detach(editor, false).unwrap();
        assert_eq!(tree.document().parent(tree.element(editor).unwrap()), None);
        assert_eq!(tree.document().widget_counter(root_element), 0);
    }

    // =========================================================================
    // Constraints and layout
    // =========================================================================

    #[test]
    fn test_vbox_folds_children() {
        setup();
        let mut tree = WidgetTree::new();
        let vbox = VBox::create(&mut tree);
        let first = sized(&mut tree, (100.0, 50.0), (150.0, 60.0));
        let second = sized(&mut tree, (80.0, 30.0), (200.0, 40.0));
        show_as_root(&mut tree, vbox);
        show_in(&mut tree, first, vbox);
        show_in(&mut tree, second, vbox);

        let expected = Constraints::new(Size::new(100.0, 80.0), Size::new(200.0, 100.0)).unwrap();
        assert_eq!(tree.constraints(vbox), expected);
        assert!(tree.document().has_class(tree.element(vbox).unwrap(), "vbox"));

        tree.hide_widget(first).unwrap();
        let expected = Constraints::new(Size::new(80.0, 30.0), Size::new(200.0, 40.0)).unwrap();
        assert_eq!(tree.constraints(vbox), expected);
    }

    #[test]
    fn test_hbox_folds_children() {
        setup();
        let mut tree = WidgetTree::new();
        let hbox = HBox::create(&mut tree);
        let first = sized(&mut tree, (100.0, 50.0), (150.0, 60.0));
        let second = sized(&mut tree, (80.0, 30.0), (200.0, 40.0));
        show_as_root(&mut tree, hbox);
        show_in(&mut tree, first, hbox);
        show_in(&mut tree, second, hbox);

        let expected = Constraints::new(Size::new(180.0, 50.0), Size::new(350.0, 60.0)).unwrap();
        assert_eq!(tree.constraints(hbox), expected);
    }

    #[test]
    fn test_empty_box_has_zero_constraints() {
        setup();
        let mut tree = WidgetTree::new();
        let vbox = VBox::create(&mut tree);

        assert!(tree.constraints(vbox).is_zero());
        assert!(!tree.has_non_zero_constraints(vbox));
    }

    #[test]
    fn test_nested_size_change_reaches_root_layout() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let (root, recorder) = Recorder::create(&mut tree, "R", &log);
        let column = VBox::create(&mut tree);
        let leaf = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, column, root);
        show_in(&mut tree, leaf, column);
        let before = recorder.layouts.load(Ordering::SeqCst);

        tree.set_minimum_size(leaf, 10.0, 25.0).unwrap();

        assert_eq!(tree.constraints(column).minimum(), Size::new(10.0, 25.0));
        assert_eq!(recorder.layouts.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_suspended_invalidations_coalesce() {
        setup();
        let mut tree = WidgetTree::new();
        let log = new_log();
        let (root, recorder) = Recorder::create(&mut tree, "R", &log);
        show_as_root(&mut tree, root);
        let before = recorder.layouts.load(Ordering::SeqCst);

        tree.suspend_invalidations(root).unwrap();
        for _ in 0..5 {
            tree.invalidate_constraints(root).unwrap();
        }
        assert_eq!(recorder.layouts.load(Ordering::SeqCst), before);
        tree.resume_invalidations(root).unwrap();
        assert_eq!(recorder.layouts.load(Ordering::SeqCst), before + 1);

        {
            let mut guard = tree.suspend_invalidations_guard(root).unwrap();
            guard.invalidate_constraints(root).unwrap();
            guard.invalidate_constraints(root).unwrap();
        }
        assert_eq!(recorder.layouts.load(Ordering::SeqCst), before + 2);

        // Nothing requested, nothing done.
        tree.suspend_invalidations(root).unwrap();
        tree.resume_invalidations(root).unwrap();
        assert_eq!(recorder.layouts.load(Ordering::SeqCst), before + 2);
    }

    #[test]
    fn test_do_resize_reaches_showing_children() {
        setup();
        let mut tree = WidgetTree::new();
        let resized = Arc::new(AtomicUsize::new(0));
        let counter = resized.clone();
        let root = tree.create();
        let child = VBoxWithResizeCallback::create(&mut tree, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        show_as_root(&mut tree, root);
        show_in(&mut tree, child, root);
        let before = resized.load(Ordering::SeqCst);

        tree.do_resize(root);
        assert_eq!(resized.load(Ordering::SeqCst), before + 1);

        tree.hide_widget(child).unwrap();
        tree.do_resize(root);
        assert_eq!(resized.load(Ordering::SeqCst), before + 1);
    }

    // =========================================================================
    // Scroll positions and focus
    // =========================================================================

    #[test]
    fn test_scroll_position_survives_hide() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let pane = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, pane, root);
        let element = tree.element(pane).unwrap();
        tree.document().set_scroll_top(element, 120.0);

        tree.hide_widget(pane).unwrap();
        tree.document().set_scroll_top(element, 0.0);
        tree.show_widget(pane).unwrap();

        assert_eq!(tree.document().scroll_top(element), 120.0);
    }

    #[test]
    fn test_focus_follows_default_child() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let first = tree.create();
        let second = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, first, root);
        show_in(&mut tree, second, root);
        let document = tree.document().clone();
        let button = document
            .create_child(tree.element(second).unwrap(), "button", None)
            .unwrap();
        document.set_focusable(button, true);

        tree.set_default_focused_child(root, second).unwrap();
        tree.focus(root).unwrap();

        assert_eq!(document.focused_element(), Some(button));
        assert!(tree.has_focus(second));
        assert!(tree.has_focus(root));
        assert!(!tree.has_focus(first));

        let stranger = tree.create();
        assert_eq!(
            tree.set_default_focused_child(root, stranger),
            Err(WidgetError::DefaultFocusNotChild {
                parent: root,
                child: stranger,
            })
        );
    }

    #[test]
    fn test_focus_widget_for_node_records_path() {
        setup();
        let mut tree = WidgetTree::new();
        let root = tree.create();
        let panel = tree.create();
        let field = tree.create();
        show_as_root(&mut tree, root);
        show_in(&mut tree, panel, root);
        show_in(&mut tree, field, panel);
        let input = tree
            .document()
            .create_child(tree.element(field).unwrap(), "input", None)
            .unwrap();

        tree.focus_widget_for_node(input);

        assert_eq!(tree.default_focused_child(panel), Some(field));
        assert_eq!(tree.default_focused_child(root), Some(panel));

        tree.detach(panel, false).unwrap();
        assert_eq!(tree.default_focused_child(root), None);
    }

    // =========================================================================
    // Debugging
    // =========================================================================

    #[test]
    fn test_format_widget_hierarchy() {
        setup();
        let mut tree = WidgetTree::new();
        let root = VBox::create(&mut tree);
        let child = tree.create();
        show_as_root(&mut tree, root);
        tree.set_name(child, "sidebar").unwrap();
        show_in(&mut tree, child, root);

        let output = tree.format_widget_hierarchy(root);

        assert!(output.contains("VBox"));
        assert!(output.contains("sidebar"));
        assert!(output.contains("showing"));
        assert_eq!(tree.name(child), Some("sidebar"));
    }
}
