//! Integration tests for the split widget.

use std::sync::Arc;

use panelkit::geometry::Size;
use panelkit::settings::Settings;
use panelkit::widget::widgets::{
    OrientationState, ShowMode, SidebarSide, SplitWidget, SplitWidgetOptions, SplitWidgetState,
};
use panelkit::widget::{WidgetId, WidgetTree};
use parking_lot::Mutex;

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    tree: WidgetTree,
    split: Arc<SplitWidget>,
    main: WidgetId,
    sidebar: WidgetId,
}

/// A split of the given size holding two empty widgets, not yet shown.
fn fixture(options: SplitWidgetOptions, width: f32, height: f32) -> Fixture {
    let mut tree = WidgetTree::new();
    let split = SplitWidget::create(&mut tree, options).unwrap();
    let main = tree.create();
    let sidebar = tree.create();
    split.set_main_widget(&mut tree, Some(main)).unwrap();
    split.set_sidebar_widget(&mut tree, Some(sidebar)).unwrap();
    tree.document()
        .set_size(split.element(), Size::new(width, height));
    Fixture {
        tree,
        split,
        main,
        sidebar,
    }
}

fn show(fixture: &mut Fixture) {
    let widget = fixture.split.widget();
    fixture.tree.mark_as_root(widget).unwrap();
    let body = fixture.tree.document().body();
    fixture.tree.show(widget, body, None).unwrap();
}

fn shown(options: SplitWidgetOptions) -> Fixture {
    let mut fixture = fixture(options, 800.0, 600.0);
    show(&mut fixture);
    fixture
}

fn vertical() -> SplitWidgetOptions {
    SplitWidgetOptions::default().with_vertical(true)
}

fn record_sizes(split: &SplitWidget) -> Arc<Mutex<Vec<f32>>> {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let recv = sizes.clone();
    split
        .sidebar_size_changed
        .connect(move |size| recv.lock().push(*size));
    sizes
}

fn style(fixture: &Fixture, element: panelkit::dom::ElementId, property: &str) -> Option<String> {
    fixture.tree.document().style(element, property)
}

// =========================================================================
// Layout
// =========================================================================

#[test]
fn test_vertical_split_lays_out_panes() {
    setup();
    let mut fixture = fixture(vertical(), 800.0, 600.0);
    let sizes = record_sizes(&fixture.split);
    show(&mut fixture);

    let split = fixture.split.clone();
    assert_eq!(split.sidebar_size(), 200.0);
    assert_eq!(split.total_size(&fixture.tree), 800.0);
    assert_eq!(split.sidebar_side(), Some(SidebarSide::Left));
    assert!(fixture.tree.is_showing(fixture.main));
    assert!(fixture.tree.is_showing(fixture.sidebar));

    let sidebar = split.sidebar_element();
    let main = split.main_element();
    assert_eq!(style(&fixture, sidebar, "flex-basis").as_deref(), Some("200px"));
    assert_eq!(style(&fixture, sidebar, "width").as_deref(), Some("200px"));
    assert_eq!(style(&fixture, main, "width").as_deref(), Some("600px"));
    assert_eq!(style(&fixture, main, "height").as_deref(), Some("600px"));
    assert_eq!(
        style(&fixture, split.resizer_element(), "left").as_deref(),
        Some("200px")
    );

    let document = fixture.tree.document();
    assert_eq!(document.size(sidebar), Size::new(200.0, 600.0));
    assert_eq!(document.size(main), Size::new(600.0, 600.0));
    let main_element = fixture.tree.element(fixture.main).unwrap();
    assert_eq!(document.size(main_element), Size::new(600.0, 600.0));
    assert_eq!(sizes.lock().last(), Some(&200.0));
}

#[test]
fn test_fractional_default_size_scales_with_total() {
    setup();
    let fixture = shown(SplitWidgetOptions::default().with_default_sidebar_height(0.25));
    let split = &fixture.split;

    assert!(!split.is_vertical());
    assert!(fixture.tree.document().has_class(split.element(), "vbox"));
    assert_eq!(split.sidebar_size(), 150.0);
    assert_eq!(split.sidebar_side(), Some(SidebarSide::Top));
    assert_eq!(
        style(&fixture, split.sidebar_element(), "height").as_deref(),
        Some("150px")
    );
    assert_eq!(
        style(&fixture, split.sidebar_element(), "width").as_deref(),
        Some("800px")
    );
}

#[test]
fn test_set_vertical_switches_axis() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();

    split.set_vertical(&mut fixture.tree, false).unwrap();

    assert_eq!(split.sidebar_side(), Some(SidebarSide::Top));
    assert_eq!(split.total_size(&fixture.tree), 600.0);
    assert_eq!(split.sidebar_size(), 200.0);
    assert_eq!(
        style(&fixture, split.sidebar_element(), "height").as_deref(),
        Some("200px")
    );
    assert_eq!(style(&fixture, split.sidebar_element(), "flex-basis").as_deref(), Some("200px"));
    assert!(!fixture.tree.document().has_class(split.resizer_element(), "vertical"));
}

#[test]
fn test_constraints_follow_show_mode() {
    setup();
    let mut fixture = fixture(vertical(), 800.0, 600.0);
    fixture.tree.set_minimum_size(fixture.main, 100.0, 50.0).unwrap();
    fixture.tree.set_minimum_size(fixture.sidebar, 60.0, 80.0).unwrap();
    let split = fixture.split.clone();
    let widget = split.widget();

    // Widths add up with the one pixel splitter; the taller pane wins.
    assert_eq!(fixture.tree.constraints(widget).minimum(), Size::new(161.0, 80.0));

    split.set_vertical(&mut fixture.tree, false).unwrap();
    assert_eq!(fixture.tree.constraints(widget).minimum(), Size::new(100.0, 131.0));

    split.hide_sidebar(&mut fixture.tree, false).unwrap();
    assert_eq!(
        fixture.tree.constraints(widget),
        fixture.tree.constraints(fixture.main)
    );

    split.hide_main(&mut fixture.tree, false).unwrap();
    assert_eq!(
        fixture.tree.constraints(widget),
        fixture.tree.constraints(fixture.sidebar)
    );
}

#[test]
fn test_empty_panes_get_padding() {
    setup();
    let fixture = fixture(vertical(), 800.0, 600.0);
    let constraints = fixture.tree.constraints(fixture.split.widget());
    assert_eq!(
        constraints.minimum(),
        Size::new(2.0 * SplitWidget::MIN_PADDING + 1.0, 0.0)
    );
}

// =========================================================================
// Size constraints
// =========================================================================

#[test]
fn test_requested_size_clamped_to_main_minimum() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();
    fixture.tree.set_minimum_size(fixture.main, 500.0, 10.0).unwrap();

    split.set_sidebar_size(&mut fixture.tree, 400.0).unwrap();
    assert_eq!(split.sidebar_size(), 300.0);

    // Never below the sidebar minimum plus the splitter.
    split.set_sidebar_size(&mut fixture.tree, 5.0).unwrap();
    assert_eq!(split.sidebar_size(), SplitWidget::MIN_PADDING + 1.0);
}

#[test]
fn test_overflow_shared_by_preferred_sizes() {
    setup();
    let mut fixture = fixture(vertical(), 600.0, 400.0);
    fixture
        .tree
        .set_minimum_and_preferred_sizes(fixture.main, 100.0, 10.0, 500.0, 10.0)
        .unwrap();
    fixture
        .tree
        .set_minimum_and_preferred_sizes(fixture.sidebar, 50.0, 10.0, 300.0, 10.0)
        .unwrap();
    show(&mut fixture);
    let split = fixture.split.clone();

    // 801 preferred pixels in 600: the sidebar gives up 301/801 of the overflow.
    let size = split.apply_constraints(&fixture.tree, 300.0, false);
    assert!((size - 225.468).abs() < 0.01, "got {size}");

    // A user resize lets the main pane shrink to its minimum.
    assert_eq!(split.apply_constraints(&fixture.tree, 300.0, true), 301.0);
    assert_eq!(split.apply_constraints(&fixture.tree, 900.0, true), 500.0);
}

#[test]
fn test_main_minimum_wins_when_nothing_fits() {
    setup();
    let mut fixture = fixture(vertical(), 600.0, 400.0);
    fixture
        .tree
        .set_minimum_and_preferred_sizes(fixture.main, 100.0, 10.0, 500.0, 10.0)
        .unwrap();
    fixture
        .tree
        .set_minimum_and_preferred_sizes(fixture.sidebar, 50.0, 10.0, 300.0, 10.0)
        .unwrap();
    show(&mut fixture);
    let split = fixture.split.clone();

    let widget = split.widget();
    fixture
        .tree
        .document()
        .set_size(split.element(), Size::new(120.0, 400.0));
    fixture.tree.do_layout(widget);

    assert_eq!(split.total_size(&fixture.tree), 120.0);
    assert_eq!(split.sidebar_size(), 20.0);
}

#[test]
fn test_minimized_sidebar_uses_minimum() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();

    split.set_sidebar_minimized(&mut fixture.tree, true).unwrap();
    assert!(split.is_sidebar_minimized());
    assert_eq!(split.sidebar_size(), SplitWidget::MIN_PADDING + 1.0);
}

// =========================================================================
// Show modes
// =========================================================================

#[test]
fn test_hide_sidebar_and_show_both() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();
    let modes = Arc::new(Mutex::new(Vec::new()));
    let recv = modes.clone();
    split.show_mode_changed.connect(move |mode| recv.lock().push(*mode));

    split.hide_sidebar(&mut fixture.tree, false).unwrap();

    assert_eq!(split.show_mode(), ShowMode::OnlyMain);
    assert!(!fixture.tree.is_showing(fixture.sidebar));
    assert!(fixture.tree.is_showing(fixture.main));
    assert_eq!(split.sidebar_widget(), Some(fixture.sidebar));
    assert_eq!(split.sidebar_side(), None);
    assert!(!split.is_resizable());
    {
        let document = fixture.tree.document();
        assert!(document.has_class(split.sidebar_element(), "hidden"));
        assert!(document.has_class(split.main_element(), "maximized"));
        assert!(document.has_class(split.resizer_element(), "hidden"));
        assert_eq!(document.size(split.main_element()), Size::new(800.0, 600.0));
    }

    split.show_both(&mut fixture.tree, false).unwrap();

    assert_eq!(split.show_mode(), ShowMode::Both);
    assert!(fixture.tree.is_showing(fixture.sidebar));
    assert!(split.is_resizable());
    assert_eq!(split.sidebar_size(), 200.0);
    {
        let document = fixture.tree.document();
        assert!(!document.has_class(split.sidebar_element(), "hidden"));
        assert!(!document.has_class(split.main_element(), "maximized"));
        assert!(!document.has_class(split.resizer_element(), "hidden"));
    }
    assert_eq!(*modes.lock(), vec![ShowMode::OnlyMain, ShowMode::Both]);
}

#[test]
fn test_hide_main() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();

    split.show_only_sidebar(&mut fixture.tree, false).unwrap();

    assert_eq!(split.show_mode(), ShowMode::OnlySidebar);
    assert!(!fixture.tree.is_showing(fixture.main));
    assert!(fixture.tree.is_showing(fixture.sidebar));
    let document = fixture.tree.document();
    assert!(document.has_class(split.sidebar_element(), "maximized"));
    assert!(document.has_class(split.main_element(), "hidden"));
    let sidebar_element = fixture.tree.element(fixture.sidebar).unwrap();
    assert_eq!(document.size(sidebar_element), Size::new(800.0, 600.0));
}

#[test]
fn test_main_detached_elsewhere_is_forgotten() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();

    fixture.tree.detach(fixture.main, false).unwrap();

    assert_eq!(split.main_widget(), None);
    assert_eq!(split.sidebar_widget(), Some(fixture.sidebar));
}

#[test]
fn test_second_is_sidebar_orders_panes() {
    setup();
    let fixture = shown(vertical().with_second_is_sidebar(true));
    let split = &fixture.split;

    assert_eq!(
        fixture.tree.document().children(split.element()),
        vec![split.main_element(), split.sidebar_element(), split.resizer_element()]
    );
    assert_eq!(split.sidebar_side(), Some(SidebarSide::Right));
    assert_eq!(
        style(&fixture, split.resizer_element(), "right").as_deref(),
        Some("200px")
    );

    split.set_second_is_sidebar(&fixture.tree, false);
    assert_eq!(
        fixture.tree.document().children(split.element()),
        vec![split.sidebar_element(), split.main_element(), split.resizer_element()]
    );
}

// =========================================================================
// Animation
// =========================================================================

#[test]
fn test_animated_hide_runs_on_frames() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();
    let sizes = record_sizes(&split);

    split.hide_sidebar(&mut fixture.tree, true).unwrap();

    assert!(split.is_animating());
    assert_eq!(split.show_mode(), ShowMode::OnlyMain);
    // The pane switch waits for the slide to finish.
    assert!(fixture.tree.is_showing(fixture.sidebar));
    assert_eq!(style(&fixture, split.element(), "margin-left").as_deref(), Some("0"));

    assert!(split.animation_frame(&mut fixture.tree, 0.0).unwrap());
    assert_eq!(
        style(&fixture, split.element(), "margin-left").as_deref(),
        Some("-200px")
    );
    assert!(split.animation_frame(&mut fixture.tree, 10.0).unwrap());
    assert!(split.is_animating());

    assert!(!split.animation_frame(&mut fixture.tree, 60.0).unwrap());
    assert!(!split.is_animating());
    assert!(!fixture.tree.is_showing(fixture.sidebar));
    assert_eq!(style(&fixture, split.element(), "margin-left"), None);
    assert_eq!(style(&fixture, split.element(), "transition"), None);
    assert_eq!(sizes.lock().last(), Some(&0.0));

    assert!(!split.animation_frame(&mut fixture.tree, 100.0).unwrap());
}

#[test]
fn test_show_both_cancels_pending_hide() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();

    split.hide_sidebar(&mut fixture.tree, true).unwrap();
    split.show_both(&mut fixture.tree, false).unwrap();

    assert!(!split.is_animating());
    assert_eq!(split.show_mode(), ShowMode::Both);
    assert!(fixture.tree.is_showing(fixture.sidebar));
    assert_eq!(split.sidebar_size(), 200.0);
}

// =========================================================================
// Divider drag
// =========================================================================

#[test]
fn test_drag_resizes_sidebar() {
    setup();
    let mut fixture = shown(vertical().with_second_is_sidebar(true));
    let split = fixture.split.clone();
    let sizes = record_sizes(&split);

    split.start_resize();
    // Dragging left grows a sidebar docked on the right.
    split.update_resize(&mut fixture.tree, 500.0, 450.0).unwrap();
    split.end_resize();

    assert_eq!(split.sidebar_size(), 250.0);
    assert_eq!(*sizes.lock(), vec![250.0]);
    assert_eq!(
        style(&fixture, split.resizer_element(), "right").as_deref(),
        Some("250px")
    );

    split.set_resizable(&fixture.tree, false);
    assert!(fixture.tree.document().has_class(split.resizer_element(), "disabled"));
    split.start_resize();
    split.update_resize(&mut fixture.tree, 500.0, 300.0).unwrap();
    assert_eq!(split.sidebar_size(), 250.0);
}

#[test]
fn test_drag_stops_at_main_minimum() {
    setup();
    let mut fixture = shown(vertical());
    let split = fixture.split.clone();

    split.start_resize();
    split.update_resize(&mut fixture.tree, 200.0, 1200.0).unwrap();
    split.end_resize();

    assert_eq!(split.sidebar_size(), 800.0 - SplitWidget::MIN_PADDING);
}

// =========================================================================
// Settings
// =========================================================================

#[test]
fn test_sidebar_size_persists() {
    setup();
    let settings = Arc::new(Settings::new());
    let mut fixture = shown(vertical().with_settings(settings.clone(), "network.sidebar"));
    let split = fixture.split.clone();

    split.set_sidebar_size(&mut fixture.tree, 300.0).unwrap();
    assert_eq!(split.sidebar_size(), 300.0);
    assert_eq!(
        settings.get_deserialized::<SplitWidgetState>("network.sidebar"),
        Some(SplitWidgetState {
            vertical: Some(OrientationState {
                size: 300.0,
                show_mode: None,
            }),
            horizontal: None,
        })
    );

    let restored = shown(vertical().with_settings(settings.clone(), "network.sidebar"));
    assert_eq!(restored.split.sidebar_size(), 300.0);

    // The other orientation keeps its own entry.
    let horizontal = shown(SplitWidgetOptions::default().with_settings(settings, "network.sidebar"));
    assert_eq!(horizontal.split.sidebar_size(), 200.0);
}

#[test]
fn test_show_mode_saving() {
    setup();
    let settings = Arc::new(Settings::new());
    let options = vertical().with_settings(settings.clone(), "sources");
    let mut fixture = shown(options.clone());
    let split = fixture.split.clone();

    split.enable_show_mode_saving(&mut fixture.tree).unwrap();
    assert_eq!(split.show_mode(), ShowMode::Both);
    split.hide_sidebar(&mut fixture.tree, false).unwrap();

    let stored = settings
        .get_deserialized::<SplitWidgetState>("sources")
        .and_then(|state| state.vertical);
    assert_eq!(stored.and_then(|s| s.show_mode), Some(ShowMode::OnlyMain));

    let mut restored = fixture_with(options);
    restored
        .split
        .enable_show_mode_saving(&mut restored.tree)
        .unwrap();
    assert_eq!(restored.split.show_mode(), ShowMode::OnlyMain);
    show(&mut restored);
    assert!(restored.tree.is_showing(restored.main));
    assert!(!restored.tree.is_showing(restored.sidebar));
}

fn fixture_with(options: SplitWidgetOptions) -> Fixture {
    fixture(options, 800.0, 600.0)
}
