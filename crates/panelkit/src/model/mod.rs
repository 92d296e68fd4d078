//! Observable data models.
//!
//! Models own data and announce changes through [`Signal`](panelkit_core::Signal)s;
//! views subscribe and patch themselves from each change event.
//!
//! ```text
//! ┌─────────────┐  items_replaced  ┌─────────────┐
//! │  ListModel  │─────────────────>│ ListControl │
//! └─────────────┘                  └─────────────┘
//! ```

mod list_model;

pub use list_model::{ItemsReplaced, ListModel};
