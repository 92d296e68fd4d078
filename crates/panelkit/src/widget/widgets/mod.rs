//! Concrete widget kinds.
//!
//! - [`VBox`], [`HBox`]: stacking containers
//! - [`SplitWidget`]: main pane plus a resizable sidebar
//! - [`ListControl`]: virtualized list view over a [`ListModel`](crate::model::ListModel)

pub mod boxes;
pub mod list_control;
pub mod split_widget;

pub use boxes::{HBOX_CLASS, HBox, VBOX_CLASS, VBox, VBoxWithResizeCallback};
pub use list_control::{ListControl, ListDelegate, ListKey, ListMode};
pub use split_widget::{
    OrientationState, ShowMode, SidebarSide, SplitWidget, SplitWidgetOptions, SplitWidgetState,
};
