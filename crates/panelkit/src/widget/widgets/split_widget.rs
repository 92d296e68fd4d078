//! Two-pane container with a draggable divider.
//!
//! A [`SplitWidget`] hosts a *main* widget and a *sidebar* widget side by
//! side (vertical split) or stacked (horizontal split). Either pane can be
//! hidden, optionally with a short slide animation, and the sidebar size can
//! be dragged by the user and persisted into [`Settings`].
//!
//! The split lays out its own panes: whenever it is shown, resized or asked
//! to lay out, it re-applies the preferred sidebar size, clamped against the
//! constraints of both panes, and writes the resulting sizes onto the pane
//! elements.
//!
//! # Example
//!
//! ```
//! use panelkit::geometry::Size;
//! use panelkit::widget::WidgetTree;
//! use panelkit::widget::widgets::{SplitWidget, SplitWidgetOptions, ShowMode};
//!
//! let mut tree = WidgetTree::new();
//! let split = SplitWidget::create(&mut tree, SplitWidgetOptions::default().with_vertical(true)).unwrap();
//! tree.mark_as_root(split.widget()).unwrap();
//! tree.document().set_size(split.element(), Size::new(800.0, 600.0));
//!
//! let main = tree.create();
//! let sidebar = tree.create();
//! split.set_main_widget(&mut tree, Some(main)).unwrap();
//! split.set_sidebar_widget(&mut tree, Some(sidebar)).unwrap();
//!
//! let body = tree.document().body();
//! tree.show(split.widget(), body, None).unwrap();
//! assert_eq!(split.sidebar_size(), 200.0);
//!
//! split.hide_sidebar(&mut tree, false).unwrap();
//! assert_eq!(split.show_mode(), ShowMode::OnlyMain);
//! assert!(!tree.is_showing(sidebar));
//! ```

use std::sync::Arc;

use panelkit_core::Signal;
use panelkit_core::logging::targets;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::dom::ElementId;
use crate::error::WidgetResult;
use crate::geometry::{Constraints, Size, constrain};
use crate::settings::SharedSettings;
use crate::widget::{WidgetDelegate, WidgetId, WidgetTree};

/// Which panes of a [`SplitWidget`] are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShowMode {
    #[default]
    Both,
    OnlyMain,
    OnlySidebar,
}

/// Edge the sidebar is docked to while both panes show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// Construction options for [`SplitWidget`].
#[derive(Debug, Clone)]
pub struct SplitWidgetOptions {
    /// Panes side by side, split by a vertical divider.
    pub vertical: bool,
    /// The sidebar is the right (or bottom) pane.
    pub second_is_sidebar: bool,
    /// Initial sidebar width. Values in `(0, 1)` are a fraction of the total.
    pub default_sidebar_width: f32,
    /// Initial sidebar height; defaults to the width.
    pub default_sidebar_height: Option<f32>,
    /// Where to persist the sidebar size and show mode.
    pub settings: Option<(SharedSettings, String)>,
}

impl Default for SplitWidgetOptions {
    fn default() -> Self {
        Self {
            vertical: false,
            second_is_sidebar: false,
            default_sidebar_width: 200.0,
            default_sidebar_height: None,
            settings: None,
        }
    }
}

impl SplitWidgetOptions {
    pub fn with_vertical(mut self, vertical: bool) -> Self {
        self.vertical = vertical;
        self
    }

    pub fn with_second_is_sidebar(mut self, second_is_sidebar: bool) -> Self {
        self.second_is_sidebar = second_is_sidebar;
        self
    }

    pub fn with_default_sidebar_width(mut self, width: f32) -> Self {
        self.default_sidebar_width = width;
        self
    }

    pub fn with_default_sidebar_height(mut self, height: f32) -> Self {
        self.default_sidebar_height = Some(height);
        self
    }

    /// Persist state in `settings` under `key`.
    pub fn with_settings(mut self, settings: SharedSettings, key: impl Into<String>) -> Self {
        self.settings = Some((settings, key.into()));
        self
    }
}

/// Persisted state of one orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationState {
    pub size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_mode: Option<ShowMode>,
}

/// Persisted state of a [`SplitWidget`], one entry per orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitWidgetState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<OrientationState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<OrientationState>,
}

/// Deferred tail of a "show only one pane" request.
#[derive(Debug, Clone, Copy)]
struct ShowOnly {
    side_to_show: Option<WidgetId>,
    side_to_hide: Option<WidgetId>,
    show_main: bool,
}

#[derive(Debug)]
struct Animation {
    property: &'static str,
    margin_to: String,
    start_ms: Option<f64>,
    callback: Option<ShowOnly>,
}

#[derive(Debug)]
struct SplitState {
    vertical: bool,
    second_is_sidebar: bool,
    show_mode: ShowMode,
    saved_show_mode: ShowMode,
    should_save_show_mode: bool,
    main_widget: Option<WidgetId>,
    sidebar_widget: Option<WidgetId>,
    /// Applied sidebar size; negative forces the next layout.
    sidebar_size: f32,
    /// Size requested by the user or restored from settings; 0 means unset.
    saved_sidebar_size: f32,
    /// Lazily measured extent along the split axis; 0 means stale.
    total_size: f32,
    total_size_other_dimension: f32,
    resizer_size: Option<f32>,
    resize_start_size: f32,
    saved_vertical_main_size: Option<f32>,
    saved_horizontal_main_size: Option<f32>,
    sidebar_minimized: bool,
    resizable: bool,
    detaching: bool,
    animation: Option<Animation>,
}

/// A widget showing a main pane and a resizable sidebar.
pub struct SplitWidget {
    widget: WidgetId,
    element: ElementId,
    main_element: ElementId,
    sidebar_element: ElementId,
    resizer_element: ElementId,
    default_sidebar_width: f32,
    default_sidebar_height: f32,
    settings: Option<(SharedSettings, String)>,
    state: Mutex<SplitState>,
    /// Emitted after the show mode changed.
    pub show_mode_changed: Signal<ShowMode>,
    /// Emitted with the new sidebar size once a resize is complete.
    pub sidebar_size_changed: Signal<f32>,
}

const MAXIMIZED_CLASS: &str = "maximized";
const HIDDEN_CLASS: &str = crate::widget::HIDDEN_CLASS;

impl SplitWidget {
    /// Pane size used when a pane reports no constraints.
    pub const MIN_PADDING: f32 = 20.0;
    /// Duration of the show/hide slide.
    pub const ANIMATION_DURATION_MS: f64 = 50.0;

    /// Create a split widget. Show it with [`WidgetTree::show`] like any
    /// other widget.
    pub fn create(tree: &mut WidgetTree, options: SplitWidgetOptions) -> WidgetResult<Arc<SplitWidget>> {
        let document = tree.document().clone();
        let sidebar_element = document.create_element("div");
        let main_element = document.create_element("div");
        let resizer_element = document.create_element("div");
        for class in ["split-widget-contents", "split-widget-sidebar", "vbox"] {
            document.add_class(sidebar_element, class);
        }
        for class in ["split-widget-contents", "split-widget-main", "vbox"] {
            document.add_class(main_element, class);
        }
        document.add_class(resizer_element, "split-widget-resizer");

        let default_sidebar_width = options.default_sidebar_width;
        let default_sidebar_height = options.default_sidebar_height.unwrap_or(default_sidebar_width);
        let settings = options.settings;
        let (widget, split) = tree.create_typed_widget("div", |widget, element| SplitWidget {
            widget,
            element,
            main_element,
            sidebar_element,
            resizer_element,
            default_sidebar_width,
            default_sidebar_height,
            settings,
            state: Mutex::new(SplitState {
                vertical: false,
                second_is_sidebar: false,
                show_mode: ShowMode::Both,
                saved_show_mode: ShowMode::Both,
                should_save_show_mode: false,
                main_widget: None,
                sidebar_widget: None,
                sidebar_size: -1.0,
                saved_sidebar_size: -1.0,
                total_size: 0.0,
                total_size_other_dimension: 0.0,
                resizer_size: None,
                resize_start_size: 0.0,
                saved_vertical_main_size: None,
                saved_horizontal_main_size: None,
                sidebar_minimized: false,
                resizable: true,
                detaching: false,
                animation: None,
            }),
            show_mode_changed: Signal::new(),
            sidebar_size_changed: Signal::new(),
        });

        document.add_class(split.element, "split-widget");
        document.append_child(split.element, sidebar_element)?;
        document.append_child(split.element, main_element)?;
        document.append_child(split.element, resizer_element)?;

        split.set_second_is_sidebar(tree, options.second_is_sidebar);
        split.inner_set_vertical(tree, options.vertical)?;
        tracing::debug!(target: targets::SPLIT, ?widget, vertical = options.vertical, "created split widget");
        Ok(split)
    }

    fn state(&self) -> MutexGuard<'_, SplitState> {
        self.state.lock()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Pane element the main widget is shown into.
    pub fn main_element(&self) -> ElementId {
        self.main_element
    }

    /// Pane element the sidebar widget is shown into.
    pub fn sidebar_element(&self) -> ElementId {
        self.sidebar_element
    }

    pub fn resizer_element(&self) -> ElementId {
        self.resizer_element
    }

    pub fn main_widget(&self) -> Option<WidgetId> {
        self.state().main_widget
    }

    pub fn sidebar_widget(&self) -> Option<WidgetId> {
        self.state().sidebar_widget
    }

    pub fn is_vertical(&self) -> bool {
        self.state().vertical
    }

    pub fn is_sidebar_second(&self) -> bool {
        self.state().second_is_sidebar
    }

    pub fn show_mode(&self) -> ShowMode {
        self.state().show_mode
    }

    pub fn is_resizable(&self) -> bool {
        self.state().resizable
    }

    pub fn is_sidebar_minimized(&self) -> bool {
        self.state().sidebar_minimized
    }

    /// Whether a show/hide animation is waiting for frames.
    pub fn is_animating(&self) -> bool {
        self.state().animation.is_some()
    }

    /// Current sidebar size along the split axis.
    pub fn sidebar_size(&self) -> f32 {
        self.state().sidebar_size.max(0.0)
    }

    /// Edge the sidebar is docked to; `None` unless both panes show.
    pub fn sidebar_side(&self) -> Option<SidebarSide> {
        let state = self.state();
        if state.show_mode != ShowMode::Both {
            return None;
        }
        Some(match (state.vertical, state.second_is_sidebar) {
            (true, true) => SidebarSide::Right,
            (true, false) => SidebarSide::Left,
            (false, true) => SidebarSide::Bottom,
            (false, false) => SidebarSide::Top,
        })
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Replace the main widget. The old one is detached.
    pub fn set_main_widget(&self, tree: &mut WidgetTree, widget: Option<WidgetId>) -> WidgetResult<()> {
        let (old, show_mode) = {
            let state = self.state();
            (state.main_widget, state.show_mode)
        };
        if old == widget {
            return Ok(());
        }
        let mut tree = tree.suspend_invalidations_guard(self.widget)?;
        if let Some(old) = old {
            tree.detach(old, false)?;
        }
        self.state().main_widget = widget;
        if let Some(widget) = widget {
            if matches!(show_mode, ShowMode::OnlyMain | ShowMode::Both) {
                tree.show(widget, self.main_element, None)?;
            }
        }
        Ok(())
    }

    /// Replace the sidebar widget. The old one is detached.
    pub fn set_sidebar_widget(&self, tree: &mut WidgetTree, widget: Option<WidgetId>) -> WidgetResult<()> {
        let (old, show_mode) = {
            let state = self.state();
            (state.sidebar_widget, state.show_mode)
        };
        if old == widget {
            return Ok(());
        }
        let mut tree = tree.suspend_invalidations_guard(self.widget)?;
        if let Some(old) = old {
            tree.detach(old, false)?;
        }
        self.state().sidebar_widget = widget;
        if let Some(widget) = widget {
            if matches!(show_mode, ShowMode::OnlySidebar | ShowMode::Both) {
                tree.show(widget, self.sidebar_element, None)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Orientation
    // =========================================================================

    pub fn set_vertical(&self, tree: &mut WidgetTree, vertical: bool) -> WidgetResult<()> {
        if self.state().vertical == vertical {
            return Ok(());
        }
        self.inner_set_vertical(tree, vertical)?;
        if tree.is_showing(self.widget) {
            self.update_layout(tree, false)?;
        }
        Ok(())
    }

    fn inner_set_vertical(&self, tree: &mut WidgetTree, vertical: bool) -> WidgetResult<()> {
        let document = tree.document();
        document.toggle_class(self.element, "vbox", !vertical);
        document.toggle_class(self.element, "hbox", vertical);
        document.toggle_class(self.resizer_element, "vertical", vertical);
        let should_save_show_mode = {
            let mut state = self.state();
            state.vertical = vertical;
            state.resizer_size = None;
            state.sidebar_size = -1.0;
            state.saved_sidebar_size = self.orientation_setting(vertical).map_or(0.0, |s| s.size);
            state.should_save_show_mode
        };
        if should_save_show_mode {
            self.restore_and_apply_show_mode_from_settings(tree)?;
        }
        tree.invalidate_constraints(self.widget)
    }

    /// Put the sidebar after the main pane (`true`) or before it.
    ///
    /// Pane elements are reordered in the document. When both panes hold
    /// widgets that must not be moved (see
    /// [`WidgetTree::set_hide_on_detach`]) the request is logged and ignored.
    pub fn set_second_is_sidebar(&self, tree: &WidgetTree, second_is_sidebar: bool) {
        let (main, sidebar) = {
            let mut state = self.state();
            if state.second_is_sidebar == second_is_sidebar {
                return;
            }
            state.second_is_sidebar = second_is_sidebar;
            (state.main_widget, state.sidebar_widget)
        };
        self.order_panes(tree, main, sidebar, second_is_sidebar);
    }

    fn order_panes(
        &self,
        tree: &WidgetTree,
        main: Option<WidgetId>,
        sidebar: Option<WidgetId>,
        second_is_sidebar: bool,
    ) {
        let document = tree.document();
        let result = if !main.is_some_and(|w| tree.should_hide_on_detach(w)) {
            let before = if second_is_sidebar {
                self.sidebar_element
            } else {
                self.resizer_element
            };
            document.insert_before(self.element, self.main_element, Some(before))
        } else if !sidebar.is_some_and(|w| tree.should_hide_on_detach(w)) {
            let before = if second_is_sidebar {
                self.resizer_element
            } else {
                self.main_element
            };
            document.insert_before(self.element, self.sidebar_element, Some(before))
        } else {
            tracing::error!(target: targets::SPLIT, "could not swap split widget sides, both panes are pinned");
            self.state().second_is_sidebar = !second_is_sidebar;
            return;
        };
        if let Err(error) = result {
            tracing::error!(target: targets::SPLIT, %error, "failed to reorder split panes");
        }
    }

    // =========================================================================
    // Show modes
    // =========================================================================

    /// Persist the show mode too, and apply the stored one now.
    pub fn enable_show_mode_saving(&self, tree: &mut WidgetTree) -> WidgetResult<()> {
        self.state().should_save_show_mode = true;
        self.restore_and_apply_show_mode_from_settings(tree)
    }

    /// Show only the sidebar.
    pub fn hide_main(&self, tree: &mut WidgetTree, animate: bool) -> WidgetResult<()> {
        let (main, sidebar) = self.children();
        self.show_only(
            tree,
            ShowOnly {
                side_to_show: sidebar,
                side_to_hide: main,
                show_main: false,
            },
            animate,
        )?;
        self.update_show_mode(tree, ShowMode::OnlySidebar)
    }

    /// Show only the main pane.
    pub fn hide_sidebar(&self, tree: &mut WidgetTree, animate: bool) -> WidgetResult<()> {
        let (main, sidebar) = self.children();
        self.show_only(
            tree,
            ShowOnly {
                side_to_show: main,
                side_to_hide: sidebar,
                show_main: true,
            },
            animate,
        )?;
        self.update_show_mode(tree, ShowMode::OnlyMain)
    }

    pub fn show_only_main(&self, tree: &mut WidgetTree, animate: bool) -> WidgetResult<()> {
        self.hide_sidebar(tree, animate)
    }

    pub fn show_only_sidebar(&self, tree: &mut WidgetTree, animate: bool) -> WidgetResult<()> {
        self.hide_main(tree, animate)
    }

    /// Show both panes.
    pub fn show_both(&self, tree: &mut WidgetTree, animate: bool) -> WidgetResult<()> {
        let animate = animate && self.show_mode() != ShowMode::Both;
        self.cancel_animation(tree)?;

        let document = tree.document();
        for pane in [self.main_element, self.sidebar_element] {
            document.remove_class(pane, MAXIMIZED_CLASS);
            document.remove_class(pane, HIDDEN_CLASS);
        }
        document.remove_class(self.resizer_element, HIDDEN_CLASS);
        self.set_resizable(tree, true);

        let (main, sidebar) = self.children();
        {
            let mut tree = tree.suspend_invalidations_guard(self.widget)?;
            if let Some(sidebar) = sidebar {
                tree.show(sidebar, self.sidebar_element, None)?;
            }
            if let Some(main) = main {
                tree.show(main, self.main_element, None)?;
            }
        }

        let second_is_sidebar = self.is_sidebar_second();
        self.order_panes(tree, main, sidebar, second_is_sidebar);
        self.state().sidebar_size = -1.0;
        self.update_show_mode(tree, ShowMode::Both)?;
        self.update_layout(tree, animate)
    }

    fn children(&self) -> (Option<WidgetId>, Option<WidgetId>) {
        let state = self.state();
        (state.main_widget, state.sidebar_widget)
    }

    fn show_only(&self, tree: &mut WidgetTree, request: ShowOnly, animate: bool) -> WidgetResult<()> {
        self.cancel_animation(tree)?;
        if animate {
            self.animate(tree, true, Some(request));
        } else {
            self.finish_show_only(tree, request)?;
        }
        self.state().sidebar_size = -1.0;
        self.set_resizable(tree, false);
        Ok(())
    }

    fn finish_show_only(&self, tree: &mut WidgetTree, request: ShowOnly) -> WidgetResult<()> {
        let (pane_to_show, pane_to_hide) = if request.show_main {
            (self.main_element, self.sidebar_element)
        } else {
            (self.sidebar_element, self.main_element)
        };
        if let Some(widget) = request.side_to_show {
            tree.show(widget, pane_to_show, None)?;
        }
        if let Some(widget) = request.side_to_hide {
            self.state().detaching = true;
            let detached = tree.detach(widget, false);
            self.state().detaching = false;
            detached?;
        }

        let document = tree.document();
        document.add_class(self.resizer_element, HIDDEN_CLASS);
        document.remove_class(pane_to_show, HIDDEN_CLASS);
        document.add_class(pane_to_show, MAXIMIZED_CLASS);
        document.add_class(pane_to_hide, HIDDEN_CLASS);
        document.remove_class(pane_to_hide, MAXIMIZED_CLASS);
        self.remove_all_layout_properties(tree);

        let full = document.size(self.element);
        document.set_size(pane_to_show, full);
        document.set_size(pane_to_hide, Size::ZERO);
        if let Some(widget) = request.side_to_show {
            fill_pane(tree, widget, full);
        }
        tree.do_resize(self.widget);
        Ok(())
    }

    fn update_show_mode(&self, tree: &mut WidgetTree, show_mode: ShowMode) -> WidgetResult<()> {
        {
            let mut state = self.state();
            state.show_mode = show_mode;
            state.saved_show_mode = show_mode;
        }
        self.save_setting();
        tracing::debug!(target: targets::SPLIT, widget = ?self.widget, ?show_mode, "show mode changed");
        self.show_mode_changed.emit(show_mode);
        tree.invalidate_constraints(self.widget)
    }

    fn restore_and_apply_show_mode_from_settings(&self, tree: &mut WidgetTree) -> WidgetResult<()> {
        let saved = {
            let mut state = self.state();
            let saved = self
                .orientation_setting(state.vertical)
                .and_then(|s| s.show_mode)
                .unwrap_or(state.show_mode);
            state.saved_show_mode = saved;
            state.show_mode = saved;
            saved
        };
        match saved {
            ShowMode::Both => self.show_both(tree, false),
            ShowMode::OnlyMain => self.hide_sidebar(tree, false),
            ShowMode::OnlySidebar => self.hide_main(tree, false),
        }
    }

    // =========================================================================
    // Sizing
    // =========================================================================

    /// Enable or disable the divider drag.
    pub fn set_resizable(&self, tree: &WidgetTree, resizable: bool) {
        self.state().resizable = resizable;
        tree.document()
            .toggle_class(self.resizer_element, "disabled", !resizable);
    }

    /// Collapse the sidebar to its minimum size.
    pub fn set_sidebar_minimized(&self, tree: &mut WidgetTree, minimized: bool) -> WidgetResult<()> {
        self.state().sidebar_minimized = minimized;
        tree.invalidate_constraints(self.widget)
    }

    /// Resize the sidebar as if the user did it; the size is persisted.
    pub fn set_sidebar_size(&self, tree: &mut WidgetTree, size: f32) -> WidgetResult<()> {
        self.state().saved_sidebar_size = size;
        self.save_setting();
        self.inner_set_sidebar_size(tree, size, false, true)
    }

    /// Extent of the split along its axis, measured on first use after a
    /// layout.
    pub fn total_size(&self, tree: &WidgetTree) -> f32 {
        let mut state = self.state();
        self.measure_total_size(tree, &mut state)
    }

    fn measure_total_size(&self, tree: &WidgetTree, state: &mut SplitState) -> f32 {
        if state.total_size == 0.0 {
            let size = tree.document().size(self.element);
            let (along, across) = if state.vertical {
                (size.width, size.height)
            } else {
                (size.height, size.width)
            };
            state.total_size = along;
            state.total_size_other_dimension = across;
        }
        state.total_size
    }

    fn preferred_sidebar_size(&self, tree: &WidgetTree) -> f32 {
        let mut state = self.state();
        let mut size = state.saved_sidebar_size;
        if size == 0.0 {
            size = if state.vertical {
                self.default_sidebar_width
            } else {
                self.default_sidebar_height
            };
            if 0.0 < size && size < 1.0 {
                size *= self.measure_total_size(tree, &mut state);
            }
        }
        size
    }

    /// Clamp a requested sidebar size against both panes' constraints.
    ///
    /// With room for both preferred sizes the request is clamped between
    /// them. With room only for the minimums the overflow is taken from both
    /// panes in proportion to their preferred sizes. Otherwise the main pane
    /// keeps its minimum. A user action lets the main pane shrink to its
    /// minimum.
    pub fn apply_constraints(&self, tree: &WidgetTree, sidebar_size: f32, user_action: bool) -> f32 {
        let (vertical, main, sidebar, minimized, saved_main, total) = {
            let mut state = self.state();
            let total = self.measure_total_size(tree, &mut state);
            let saved_main = if state.vertical {
                state.saved_vertical_main_size
            } else {
                state.saved_horizontal_main_size
            };
            (
                state.vertical,
                state.main_widget,
                state.sidebar_widget,
                state.sidebar_minimized,
                saved_main,
                total,
            )
        };
        let along = |constraints: Constraints| {
            let (minimum, preferred) = (constraints.minimum(), constraints.preferred());
            if vertical {
                (minimum.width, preferred.width)
            } else {
                (minimum.height, preferred.height)
            }
        };
        let or_padding = |value: f32| if value == 0.0 { Self::MIN_PADDING } else { value };

        let mut sidebar_size = sidebar_size;
        let sidebar_constraints = sidebar.map(|w| tree.constraints(w)).unwrap_or_default();
        let (min_sidebar, preferred_sidebar) = along(sidebar_constraints);
        let min_sidebar = or_padding(min_sidebar);
        if minimized {
            sidebar_size = min_sidebar;
        }
        let mut preferred_sidebar = or_padding(preferred_sidebar);
        if sidebar_size < preferred_sidebar {
            preferred_sidebar = sidebar_size.max(min_sidebar);
        }
        // Splitter border.
        preferred_sidebar += 1.0;

        let main_constraints = main.map(|w| tree.constraints(w)).unwrap_or_default();
        let (min_main, preferred_main) = along(main_constraints);
        let min_main = or_padding(min_main);
        let mut preferred_main = or_padding(preferred_main);
        if let Some(saved) = saved_main {
            preferred_main = preferred_main.min(saved);
        }
        if user_action {
            preferred_main = min_main;
        }

        let total_preferred = preferred_main + preferred_sidebar;
        if total_preferred <= total {
            return constrain(sidebar_size, preferred_sidebar, total - preferred_main);
        }

        if min_main + min_sidebar <= total {
            let delta = total_preferred - total;
            let sidebar_delta = delta * preferred_sidebar / total_preferred;
            let sidebar_size = preferred_sidebar - sidebar_delta;
            return constrain(sidebar_size, min_sidebar, total - min_main);
        }

        (total - min_main).max(0.0)
    }

    fn inner_set_sidebar_size(
        &self,
        tree: &mut WidgetTree,
        size: f32,
        animate: bool,
        user_action: bool,
    ) -> WidgetResult<()> {
        if self.show_mode() != ShowMode::Both || !tree.is_showing(self.widget) {
            return Ok(());
        }
        let size = self.apply_constraints(tree, size, user_action);
        if self.state().sidebar_size == size {
            return Ok(());
        }

        self.remove_all_layout_properties(tree);
        let document = tree.document().clone();
        let (vertical, second_is_sidebar, total, other, resizer_size) = {
            let mut state = self.state();
            if state.resizer_size.is_none() {
                let resizer = document.size(self.resizer_element);
                state.resizer_size = Some(if state.vertical {
                    resizer.width
                } else {
                    resizer.height
                });
            }
            state.sidebar_size = size;
            (
                state.vertical,
                state.second_is_sidebar,
                state.total_size,
                state.total_size_other_dimension,
                state.resizer_size.unwrap_or(0.0),
            )
        };

        let round = size.round();
        let sidebar_value = px(round);
        let main_value = px(total - round);
        let other_value = px(other);
        document.set_style(self.sidebar_element, "flex-basis", &sidebar_value);
        let (along, across) = if vertical {
            ("width", "height")
        } else {
            ("height", "width")
        };
        document.set_style(self.sidebar_element, along, &sidebar_value);
        document.set_style(self.main_element, along, &main_value);
        document.set_style(self.sidebar_element, across, &other_value);
        document.set_style(self.main_element, across, &other_value);

        let edge = match (vertical, second_is_sidebar) {
            (true, true) => "right",
            (true, false) => "left",
            (false, true) => "bottom",
            (false, false) => "top",
        };
        document.set_style(self.resizer_element, edge, &sidebar_value);
        document.set_style(
            self.resizer_element,
            &format!("margin-{edge}"),
            &px(-resizer_size / 2.0),
        );

        let (sidebar_extent, main_extent) = if vertical {
            (Size::new(round, other), Size::new(total - round, other))
        } else {
            (Size::new(other, round), Size::new(other, total - round))
        };
        document.set_size(self.sidebar_element, sidebar_extent);
        document.set_size(self.main_element, main_extent);
        let (main, sidebar) = self.children();
        if let Some(sidebar) = sidebar {
            fill_pane(tree, sidebar, sidebar_extent);
        }
        if let Some(main) = main {
            fill_pane(tree, main, main_extent);
        }
        tracing::trace!(target: targets::SPLIT, widget = ?self.widget, size, total, "sidebar size applied");

        if animate {
            self.animate(tree, false, None);
        } else {
            tree.do_resize(self.widget);
            self.sidebar_size_changed.emit(self.sidebar_size());
        }
        Ok(())
    }

    fn remove_all_layout_properties(&self, tree: &WidgetTree) {
        let document = tree.document();
        document.remove_style(self.sidebar_element, "flex-basis");
        for pane in [self.main_element, self.sidebar_element] {
            document.remove_style(pane, "width");
            document.remove_style(pane, "height");
        }
        for edge in ["left", "right", "top", "bottom"] {
            document.remove_style(self.resizer_element, edge);
            document.remove_style(self.resizer_element, &format!("margin-{edge}"));
        }
    }

    fn update_layout(&self, tree: &mut WidgetTree, animate: bool) -> WidgetResult<()> {
        {
            let mut state = self.state();
            state.total_size = 0.0;
            state.total_size_other_dimension = 0.0;
        }
        let document = tree.document();
        for pane in [self.main_element, self.sidebar_element] {
            document.remove_style(pane, "width");
            document.remove_style(pane, "height");
        }
        let preferred = self.preferred_sidebar_size(tree);
        self.inner_set_sidebar_size(tree, preferred, animate, false)
    }

    fn force_update_layout(&self, tree: &mut WidgetTree) -> WidgetResult<()> {
        self.state().sidebar_size = -1.0;
        self.update_layout(tree, false)
    }

    // =========================================================================
    // Divider drag
    // =========================================================================

    /// The user grabbed the divider.
    pub fn start_resize(&self) {
        let mut state = self.state();
        if state.resizable {
            state.resize_start_size = state.sidebar_size;
        }
    }

    /// The divider moved from `start_position` to `current_position`, in
    /// pixels along the split axis.
    pub fn update_resize(&self, tree: &mut WidgetTree, start_position: f32, current_position: f32) -> WidgetResult<()> {
        let (resizable, start_size, second_is_sidebar) = {
            let state = self.state();
            (state.resizable, state.resize_start_size, state.second_is_sidebar)
        };
        if !resizable {
            return Ok(());
        }
        let offset = current_position - start_position;
        let requested = if second_is_sidebar {
            start_size - offset
        } else {
            start_size + offset
        };
        let constrained = self.apply_constraints(tree, requested, true);
        self.state().saved_sidebar_size = constrained;
        self.save_setting();
        self.inner_set_sidebar_size(tree, constrained, false, true)?;

        let mut state = self.state();
        let main_size = state.total_size - state.sidebar_size;
        if state.vertical {
            state.saved_vertical_main_size = Some(main_size);
        } else {
            state.saved_horizontal_main_size = Some(main_size);
        }
        Ok(())
    }

    /// The user released the divider.
    pub fn end_resize(&self) {
        self.state().resize_start_size = 0.0;
    }

    // =========================================================================
    // Animation
    // =========================================================================

    fn animate(&self, tree: &mut WidgetTree, reverse: bool, callback: Option<ShowOnly>) {
        let (property, sidebar_size, sidebar) = {
            let state = self.state();
            let property = match (state.vertical, state.second_is_sidebar) {
                (true, true) => "margin-right",
                (true, false) => "margin-left",
                (false, true) => "margin-bottom",
                (false, false) => "margin-top",
            };
            (property, state.sidebar_size.max(0.0), state.sidebar_widget)
        };
        let hidden_margin = format!("-{}", px(sidebar_size));
        let (margin_from, margin_to) = if reverse {
            ("0".to_string(), hidden_margin)
        } else {
            (hidden_margin, "0".to_string())
        };

        let document = tree.document().clone();
        document.set_style(self.element, property, &margin_from);
        if !reverse {
            if let Some(sidebar) = sidebar {
                tree.do_resize(sidebar);
            }
        }
        document.set_style(
            self.element,
            "transition",
            &format!("{property} {}ms linear", Self::ANIMATION_DURATION_MS),
        );
        self.state().animation = Some(Animation {
            property,
            margin_to,
            start_ms: None,
            callback,
        });
        tracing::trace!(target: targets::SPLIT, widget = ?self.widget, reverse, "animation started");
    }

    /// Step a running animation; call once per frame with a monotonic clock.
    ///
    /// The first frame starts the slide; once
    /// [`ANIMATION_DURATION_MS`](Self::ANIMATION_DURATION_MS) have passed the
    /// animation completes, runs any pending pane switch and emits
    /// [`sidebar_size_changed`](Self::sidebar_size_changed). Returns whether
    /// more frames are needed.
    pub fn animation_frame(&self, tree: &mut WidgetTree, now_ms: f64) -> WidgetResult<bool> {
        enum Step {
            Kick(&'static str, String),
            Progress,
            Complete,
        }
        let (step, main) = {
            let mut state = self.state();
            let main = state.main_widget;
            let Some(animation) = state.animation.as_mut() else {
                return Ok(false);
            };
            let step = match animation.start_ms {
                None => {
                    animation.start_ms = Some(now_ms);
                    Step::Kick(animation.property, animation.margin_to.clone())
                }
                Some(start) if now_ms < start + Self::ANIMATION_DURATION_MS => Step::Progress,
                Some(_) => Step::Complete,
            };
            (step, main)
        };

        match step {
            Step::Kick(property, margin_to) => {
                tree.document().set_style(self.element, property, &margin_to);
                Ok(true)
            }
            Step::Progress => {
                if let Some(main) = main {
                    tree.do_resize(main);
                }
                Ok(true)
            }
            Step::Complete => {
                self.cancel_animation(tree)?;
                if let Some(main) = self.main_widget() {
                    tree.do_resize(main);
                }
                self.sidebar_size_changed.emit(self.sidebar_size());
                Ok(false)
            }
        }
    }

    /// Stop a running animation, applying its pending pane switch at once.
    fn cancel_animation(&self, tree: &mut WidgetTree) -> WidgetResult<()> {
        let document = tree.document();
        for property in ["margin-top", "margin-right", "margin-bottom", "margin-left", "transition"] {
            document.remove_style(self.element, property);
        }
        let Some(animation) = self.state().animation.take() else {
            return Ok(());
        };
        match animation.callback {
            Some(callback) => self.finish_show_only(tree, callback),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    fn stored_state(&self) -> Option<SplitWidgetState> {
        let (settings, key) = self.settings.as_ref()?;
        settings.get_deserialized(key)
    }

    fn orientation_setting(&self, vertical: bool) -> Option<OrientationState> {
        let state = self.stored_state()?;
        if vertical {
            state.vertical
        } else {
            state.horizontal
        }
    }

    fn save_setting(&self) {
        let Some((settings, key)) = self.settings.as_ref() else {
            return;
        };
        let mut stored = self.stored_state().unwrap_or_default();
        {
            let state = self.state();
            let entry = if state.vertical {
                &mut stored.vertical
            } else {
                &mut stored.horizontal
            };
            let orientation = entry.get_or_insert_with(OrientationState::default);
            orientation.size = state.saved_sidebar_size;
            if state.should_save_show_mode {
                orientation.show_mode = Some(state.saved_show_mode);
            }
        }
        if let Err(error) = settings.set_serialized(key, &stored) {
            tracing::error!(target: targets::SPLIT, %error, %key, "failed to save split widget state");
        }
    }
}

impl WidgetDelegate for SplitWidget {
    fn was_shown(&self, tree: &mut WidgetTree, _widget: WidgetId) {
        if let Err(error) = self.force_update_layout(tree) {
            tracing::error!(target: targets::SPLIT, %error, "layout after show failed");
        }
    }

    fn on_resize(&self, tree: &mut WidgetTree, _widget: WidgetId) {
        if let Err(error) = self.update_layout(tree, false) {
            tracing::error!(target: targets::SPLIT, %error, "layout on resize failed");
        }
    }

    fn on_layout(&self, tree: &mut WidgetTree, _widget: WidgetId) {
        if let Err(error) = self.update_layout(tree, false) {
            tracing::error!(target: targets::SPLIT, %error, "layout failed");
        }
    }

    fn calculate_constraints(&self, tree: &WidgetTree, _widget: WidgetId) -> Constraints {
        let (show_mode, vertical, main, sidebar) = {
            let state = self.state();
            (
                state.show_mode,
                state.vertical,
                state.main_widget,
                state.sidebar_widget,
            )
        };
        let constraints_of = |widget: Option<WidgetId>| widget.map(|w| tree.constraints(w)).unwrap_or_default();
        match show_mode {
            ShowMode::OnlyMain => return constraints_of(main),
            ShowMode::OnlySidebar => return constraints_of(sidebar),
            ShowMode::Both => {}
        }

        let main = constraints_of(main);
        let sidebar = constraints_of(sidebar);
        let min = Self::MIN_PADDING;
        if vertical {
            // One pixel for the splitter.
            let main = main.width_to_max_value(min).add_width_value(1.0);
            let sidebar = sidebar.width_to_max_value(min);
            main.add_width(sidebar).height_to_max(sidebar)
        } else {
            let main = main.height_to_max_value(min).add_height_value(1.0);
            let sidebar = sidebar.height_to_max_value(min);
            main.width_to_max(sidebar).add_height(sidebar)
        }
    }

    fn child_was_detached(&self, tree: &mut WidgetTree, widget: WidgetId, child: WidgetId) {
        {
            let mut state = self.state();
            if state.detaching {
                return;
            }
            if state.main_widget == Some(child) {
                state.main_widget = None;
            }
            if state.sidebar_widget == Some(child) {
                state.sidebar_widget = None;
            }
        }
        if let Err(error) = tree.invalidate_constraints(widget) {
            tracing::error!(target: targets::SPLIT, %error, "invalidation after detach failed");
        }
    }
}

/// Size a pane widget's element to its pane.
fn fill_pane(tree: &WidgetTree, widget: WidgetId, size: Size) {
    if let Ok(element) = tree.element(widget) {
        tree.document().set_size(element, size);
    }
}

fn px(value: f32) -> String {
    format!("{value}px")
}
