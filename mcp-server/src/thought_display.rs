//! Human-facing rendering of the thinking session on stderr.
//!
//! stdout carries the protocol, so everything here goes to stderr. The
//! `*_lines` functions are pure and return the exact lines to print, which
//! keeps the layout testable without a terminal.

use std::io::Write;

use owo_colors::OwoColorize;
use owo_colors::Style;
use thinking_core::SessionId;
use thinking_core::SessionState;
use thinking_core::ThoughtRecord;
use thinking_core::summarize;
use unicode_width::UnicodeWidthStr;

/// Total width of a thought panel, borders included.
pub(crate) const PANEL_WIDTH: usize = 80;

/// Characters of a thought shown per line of the session summary tree.
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ThoughtDisplay {
    enabled: bool,
    color: bool,
}

impl ThoughtDisplay {
    pub(crate) fn new(enabled: bool, color: bool) -> Self {
        Self { enabled, color }
    }

    #[cfg(test)]
    pub(crate) fn disabled() -> Self {
        Self::new(false, false)
    }

    pub(crate) fn startup(&self, session_id: SessionId) {
        if self.enabled {
            emit(startup_lines(session_id, self.color));
        }
    }

    /// Renders a thought the router has just placed.
    pub(crate) fn thought(&self, record: &ThoughtRecord) {
        if !self.enabled {
            return;
        }
        let lines = if record.branch().is_some() {
            branch_thought_lines(record, self.color)
        } else {
            main_thought_lines(record, self.color)
        };
        emit(lines);
    }

    pub(crate) fn error(&self, message: &str) {
        if self.enabled {
            emit(error_lines(message, self.color));
        }
    }

    pub(crate) fn session_summary(&self, session: &SessionState) {
        if self.enabled {
            emit(session_summary_lines(session, self.color));
        }
    }
}

fn emit(lines: Vec<String>) {
    let mut stderr = std::io::stderr().lock();
    for line in lines {
        if writeln!(stderr, "{line}").is_err() {
            return;
        }
    }
}

fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

pub(crate) fn startup_lines(session_id: SessionId, color: bool) -> Vec<String> {
    let banner = "Sequential Thinking MCP Server Started";
    let mut lines = frame(
        None,
        &[banner.to_string()],
        UnicodeWidthStr::width(banner),
        Style::new().bright_blue(),
        Style::new().bold().green(),
        color,
    );
    lines.push(paint(
        &format!("Session ID: {session_id}"),
        Style::new().dimmed(),
        color,
    ));
    lines.push(String::new());
    lines
}

pub(crate) fn main_thought_lines(record: &ThoughtRecord, color: bool) -> Vec<String> {
    let progress = format!("{}/{}", record.thought_number(), record.total_thoughts());
    let (title, border) = if record.is_revision() {
        (format!("🔄 Revision {progress}"), Style::new().yellow())
    } else {
        (format!("💭 Thought {progress}"), Style::new().bright_blue())
    };

    let mut lines = panel(&title, record.thought(), border, color);

    let mut status = vec![if record.next_thought_needed() {
        paint("→ More thoughts needed", Style::new().bright_green(), color)
    } else {
        paint("✓ Thinking complete", Style::new().bright_red(), color)
    }];
    if record.needs_more_thoughts() {
        status.push(paint(
            "📈 Expanding scope",
            Style::new().bright_yellow(),
            color,
        ));
    }
    lines.push(status.join(" "));
    lines.push(String::new());
    lines
}

pub(crate) fn branch_thought_lines(record: &ThoughtRecord, color: bool) -> Vec<String> {
    let branch_id = record.branch_id().unwrap_or_default();
    let title = format!(
        "🌿 Branch: {branch_id} ({}/{})",
        record.thought_number(),
        record.total_thoughts()
    );
    let mut lines = panel(&title, record.thought(), Style::new().bright_magenta(), color);

    if let Some(origin) = record.branch_from_thought() {
        lines.push(paint(
            &format!("Branched from thought {origin}"),
            Style::new().dimmed(),
            color,
        ));
    }
    lines.push(if record.next_thought_needed() {
        paint(
            "→ More thoughts needed in this branch",
            Style::new().bright_green(),
            color,
        )
    } else {
        paint("✓ Branch complete", Style::new().bright_red(), color)
    });
    lines.push(String::new());
    lines
}

pub(crate) fn error_lines(message: &str, color: bool) -> Vec<String> {
    let inner = PANEL_WIDTH - 4;
    let body: Vec<String> = textwrap::wrap(message, inner)
        .into_iter()
        .map(|line| line.into_owned())
        .collect();
    let mut lines = frame(
        Some("Error"),
        &body,
        inner,
        Style::new().red(),
        Style::new().bold().red(),
        color,
    );
    lines.push(String::new());
    lines
}

pub(crate) fn session_summary_lines(session: &SessionState, color: bool) -> Vec<String> {
    let summary = summarize(session);

    let main = TreeNode::new(format!(
        "🎯 Main Branch ({} thoughts)",
        summary.main_branch_thoughts
    ))
    .with_children(
        session
            .main_sequence()
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let revision = if record.is_revision() { " 🔄" } else { "" };
                TreeNode::new(format!(
                    "{} Thought {}: {}{revision}",
                    status_marker(record),
                    index + 1,
                    preview(record.thought())
                ))
            }),
    );

    let mut sections = vec![main];
    if session.branch_count() > 0 {
        let branches = session.branches().map(|(branch_id, branch)| {
            TreeNode::new(format!(
                "🌿 {branch_id} ({} thoughts)",
                branch.thoughts().len()
            ))
            .with_children(branch.thoughts().iter().enumerate().map(|(index, record)| {
                TreeNode::new(format!(
                    "{} Thought {}: {}",
                    status_marker(record),
                    index + 1,
                    preview(record.thought())
                ))
            }))
        });
        sections.push(
            TreeNode::new(format!("🌳 Branches ({})", session.branch_count()))
                .with_children(branches),
        );
    }

    let status = if summary.is_complete {
        "Complete"
    } else {
        "In Progress"
    };
    sections.push(
        TreeNode::new("📊 Statistics".to_string()).with_children([
            TreeNode::new(format!("Total thoughts: {}", summary.total_thoughts)),
            TreeNode::new(format!("Revisions: {}", summary.revisions_count)),
            TreeNode::new(format!("Status: {status}")),
        ]),
    );

    let mut lines = vec![paint(
        "📚 Thinking Session Summary",
        Style::new().bold().bright_blue(),
        color,
    )];
    render_children(&sections, "", &mut lines);
    lines.push(String::new());
    lines
}

fn status_marker(record: &ThoughtRecord) -> &'static str {
    if record.next_thought_needed() {
        "⏳"
    } else {
        "✅"
    }
}

fn preview(text: &str) -> String {
    let flattened = text.replace('\n', " ");
    let mut chars = flattened.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// An 80-column panel with `title` centred in the top border and `body`
/// wrapped inside.
fn panel(title: &str, body: &str, border: Style, color: bool) -> Vec<String> {
    let inner = PANEL_WIDTH - 4;
    let body: Vec<String> = textwrap::wrap(body, inner)
        .into_iter()
        .map(|line| line.into_owned())
        .collect();
    frame(Some(title), &body, inner, border, Style::new().white(), color)
}

fn frame(
    title: Option<&str>,
    body: &[String],
    inner_width: usize,
    border: Style,
    body_style: Style,
    color: bool,
) -> Vec<String> {
    let outer_width = inner_width + 4;
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(top_border(title, outer_width, border, color));

    let edge = paint("│", border, color);
    for line in body {
        let pad = inner_width.saturating_sub(UnicodeWidthStr::width(line.as_str()));
        lines.push(format!(
            "{edge} {}{} {edge}",
            paint(line, body_style, color),
            " ".repeat(pad)
        ));
    }

    lines.push(paint(
        &format!("╰{}╯", "─".repeat(outer_width - 2)),
        border,
        color,
    ));
    lines
}

fn top_border(title: Option<&str>, outer_width: usize, border: Style, color: bool) -> String {
    let Some(title) = title else {
        return paint(&format!("╭{}╮", "─".repeat(outer_width - 2)), border, color);
    };

    let title = format!(" {title} ");
    let dashes = outer_width.saturating_sub(2 + UnicodeWidthStr::width(title.as_str()));
    let left = dashes / 2;
    let right = dashes - left;
    format!(
        "{}{}{}",
        paint(&format!("╭{}", "─".repeat(left)), border, color),
        paint(&title, Style::new().bold(), color),
        paint(&format!("{}╮", "─".repeat(right)), border, color),
    )
}

struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }

    fn with_children(mut self, children: impl IntoIterator<Item = TreeNode>) -> Self {
        self.children.extend(children);
        self
    }
}

fn render_children(nodes: &[TreeNode], prefix: &str, lines: &mut Vec<String>) {
    for (index, node) in nodes.iter().enumerate() {
        let last = index + 1 == nodes.len();
        let (connector, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!("{prefix}{connector}{}", node.label));
        render_children(&node.children, &format!("{prefix}{indent}"), lines);
    }
}
