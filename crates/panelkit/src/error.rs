//! Error types for panelkit.
//!
//! Every error here reports a broken caller contract: a widget attached to
//! the wrong parent, a widget-owned element moved behind the widget tree's
//! back, a list item that is not in the model. None of them are recovered
//! from inside the crate; they propagate to the caller through `?`.

use std::path::PathBuf;

use thiserror::Error;

use crate::dom::ElementId;
use crate::widget::WidgetId;

/// Errors raised when constructing [`Constraints`](crate::geometry::Constraints).
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConstraintsError {
    #[error("minimum width {minimum} exceeds preferred width {preferred}")]
    MinimumWidthExceedsPreferred { minimum: f32, preferred: f32 },

    #[error("minimum height {minimum} exceeds preferred height {preferred}")]
    MinimumHeightExceedsPreferred { minimum: f32, preferred: f32 },
}

/// Errors raised by the element tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The element id is stale or was never issued by this document.
    #[error("invalid element id: {0:?}")]
    InvalidElement(ElementId),

    /// A widget-owned element (or a subtree holding one) was moved with the
    /// plain element API instead of the widget tree.
    #[error("attempt to add widget via regular DOM operation: {0:?}")]
    WidgetViaRegularDom(ElementId),

    /// A widget-owned element (or a subtree holding one) was removed with the
    /// plain element API instead of the widget tree.
    #[error("attempt to remove widget via regular DOM operation: {0:?}")]
    RemoveWidgetViaRegularDom(ElementId),

    #[error("element {child:?} is not a child of {parent:?}")]
    NotAChild { parent: ElementId, child: ElementId },

    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle { parent: ElementId, child: ElementId },
}

/// Errors raised by the widget tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    #[error("invalid widget id: {0:?}")]
    InvalidWidgetId(WidgetId),

    /// `show` was given an element id that does not exist.
    #[error("attempt to attach widget with no parent element: {0:?}")]
    InvalidParentElement(ElementId),

    /// No widget owns the parent element or any of its ancestors.
    #[error("attempt to attach widget to orphan node {0:?}")]
    OrphanNode(ElementId),

    #[error("attempt to attach root widget {0:?} under another widget")]
    RootUnderWidget(WidgetId),

    /// The widget is already parented and the new parent element belongs to
    /// another widget.
    #[error("attempt to show widget {widget:?} under an element owned by {owner:?}, not its parent")]
    AlienParent { widget: WidgetId, owner: Option<WidgetId> },

    #[error("widget {child:?} is not a child of {parent:?}")]
    NotAChild { parent: WidgetId, child: WidgetId },

    /// The widget to remove is still attached.
    #[error("widget {0:?} must be detached before it is removed")]
    NonRootRemoval(WidgetId),

    /// `show_widget` was called on a widget that is already visible or was
    /// never attached.
    #[error("widget {0:?} is not a hidden child")]
    NotHidden(WidgetId),

    #[error("root widget {0:?} is already attached")]
    RootAlreadyAttached(WidgetId),

    #[error("widget {0:?} must be marked externally managed before it is shown")]
    ExternallyManagedAfterInsertion(WidgetId),

    #[error("widget {child:?} is not a child of {parent:?} and cannot be focused by default")]
    DefaultFocusNotChild { parent: WidgetId, child: WidgetId },

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Constraints(#[from] ConstraintsError),
}

/// Errors raised by the virtualized list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("item is not in the model")]
    ItemNotInModel,

    #[error("item at index {0} is not selectable")]
    ItemNotSelectable(usize),

    #[error("range {from}..{to} is outside the model of {len} items")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error("{operation} is not supported in {mode} mode")]
    UnsupportedMode {
        operation: &'static str,
        mode: &'static str,
    },

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Errors raised by the settings store.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to access settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SettingsError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type DomResult<T> = Result<T, DomError>;
pub type WidgetResult<T> = Result<T, WidgetError>;
pub type ListResult<T> = Result<T, ListError>;
pub type SettingsResult<T> = Result<T, SettingsError>;
