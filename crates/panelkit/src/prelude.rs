//! Prelude module for panelkit.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```
//! use panelkit::prelude::*;
//! ```

// ============================================================================
// Signals
// ============================================================================

pub use crate::signal::{ConnectionId, Signal};

// ============================================================================
// Element Tree
// ============================================================================

pub use crate::dom::{Document, ElementId};

// ============================================================================
// Widget Foundation
// ============================================================================

pub use crate::widget::{FocusRestorer, PlainWidget, WidgetDelegate, WidgetId, WidgetTree};

// ============================================================================
// Widgets
// ============================================================================

pub use crate::widget::widgets::{
    HBox, ListControl, ListDelegate, ListKey, ListMode, ShowMode, SplitWidget, SplitWidgetOptions,
    VBox,
};

// ============================================================================
// Models, Geometry and Settings
// ============================================================================

pub use crate::geometry::{Constraints, Size};
pub use crate::model::ListModel;
pub use crate::settings::{Settings, SharedSettings};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{ListError, ListResult, WidgetError, WidgetResult};
