//! UI-agnostic foundations of panelkit.
//!
//! - [`signal`]: typed observer lists connecting models to views
//! - [`logging`]: `tracing` targets, hierarchy dumps and timing spans
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use panelkit_core::Signal;
//!
//! let sidebar_resized = Signal::<f32>::new();
//! let last = Arc::new(AtomicU32::new(0));
//! let sink = last.clone();
//! sidebar_resized.connect(move |size| sink.store(size.to_bits(), Ordering::SeqCst));
//!
//! sidebar_resized.emit(240.0);
//! assert_eq!(f32::from_bits(last.load(Ordering::SeqCst)), 240.0);
//! ```

pub mod logging;
pub mod signal;

pub use logging::{PerfSpan, TreeFormatOptions, TreeFormatter, TreeSource, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
