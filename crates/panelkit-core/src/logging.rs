//! Log targets, hierarchy dumps and timing spans.
//!
//! Every event the toolkit emits through `tracing` carries one of the
//! [`targets`], so a subscriber can select a subsystem with a directive such
//! as `RUST_LOG=panelkit::list=trace,panelkit::split=debug`. No subscriber is
//! installed by the library.
//!
//! [`TreeFormatter`] prints any [`TreeSource`]; the widget tree and the
//! element arena both implement it for their debug dumps.
//!
//! ```
//! use panelkit_core::logging::{TreeFormatOptions, TreeFormatter, TreeSource};
//!
//! /// A split pane: node 0 holds the sidebar (1) and the main pane (2).
//! struct Panes(Vec<&'static str>);
//!
//! impl TreeSource for Panes {
//!     type Node = usize;
//!     fn label(&self, node: usize) -> String { self.0[node].to_string() }
//!     fn children(&self, node: usize) -> Vec<usize> {
//!         if node == 0 { vec![1, 2] } else { Vec::new() }
//!     }
//! }
//!
//! let panes = Panes(vec!["split", "sidebar", "main"]);
//! let dump = TreeFormatter::with_options(TreeFormatOptions::minimal()).format(&panes, 0);
//! assert_eq!(dump.lines().count(), 3);
//! ```

use std::fmt::{Debug, Write as FmtWrite};

/// `tracing` targets, one per subsystem.
pub mod targets {
    pub const SIGNAL: &str = "panelkit_core::signal";
    /// [`PerfSpan`](super::PerfSpan)s.
    pub const PERF: &str = "panelkit::perf";
    /// Element arena mutations and guard rejections.
    pub const DOM: &str = "panelkit::dom";
    /// Show, hide and detach.
    pub const WIDGET: &str = "panelkit::widget";
    /// Constraint invalidation, `do_layout` and `do_resize`.
    pub const LAYOUT: &str = "panelkit::layout";
    pub const MODEL: &str = "panelkit::model";
    /// Viewport windowing and selection.
    pub const LIST: &str = "panelkit::list";
    pub const SPLIT: &str = "panelkit::split";
    pub const SETTINGS: &str = "panelkit::settings";
}

/// Branch glyphs used by [`TreeFormatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// `+--` and `` `-- ``.
    Ascii,
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// A single dash per level.
    Compact,
}

/// What a dump includes.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Append the node handle in brackets.
    pub show_ids: bool,
    /// Append [`TreeSource::details`] in parentheses.
    pub show_details: bool,
    /// Deepest level printed; the root is level 0.
    pub max_depth: Option<usize>,
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_details: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_details: false,
            ..Default::default()
        }
    }
}

/// A hierarchy that can be rendered by [`TreeFormatter`].
pub trait TreeSource {
    /// Node handle type.
    type Node: Copy + Debug;

    /// Display name of a node.
    fn label(&self, node: Self::Node) -> String;

    /// Ordered children of a node.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Extra state printed after the label, such as flags.
    fn details(&self, _node: Self::Node) -> Option<String> {
        None
    }
}

/// Renders a [`TreeSource`] as an indented multi-line string.
#[derive(Debug, Clone, Default)]
pub struct TreeFormatter {
    options: TreeFormatOptions,
}

impl TreeFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Dump the subtree under `root`, one node per line.
    pub fn format<S: TreeSource>(&self, source: &S, root: S::Node) -> String {
        let mut output = String::new();
        self.format_into(source, root, 0, true, &mut output);
        output
    }

    fn format_into<S: TreeSource>(
        &self,
        source: &S,
        node: S::Node,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return;
            }
        }

        output.push_str(&self.build_prefix(depth, is_last));

        let label = source.label(node);
        output.push_str(if label.is_empty() { "(unnamed)" } else { &label });

        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", node);
        }
        if self.options.show_details {
            if let Some(details) = source.details(node) {
                let _ = write!(output, " ({})", details);
            }
        }
        output.push('\n');

        let children = source.children(node);
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_into(source, child, depth + 1, i + 1 == child_count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

/// Keeps an info-level span on the perf target entered until dropped, so a
/// timing subscriber sees how long the enclosing operation took.
///
/// ```
/// use panelkit_core::PerfSpan;
///
/// let _span = PerfSpan::new("rebuild_viewport");
/// ```
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
