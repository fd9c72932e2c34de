//! [`Tree`] → CommonMark text.
//!
//! Blocks are rendered to strings bottom-up and joined with a blank line;
//! containers (block quotes, list items) prefix the lines of their rendered
//! children. The output ends with a single newline unless the tree is empty.
//!
//! Text is escaped so that parsing the output yields the same tree. Subtrees
//! nested deeper than [`MAX_NESTING`] are flattened to an escaped paragraph
//! of their text.

use std::sync::LazyLock;

use indextree::NodeId;
use regex::Regex;

use crate::tree::{Alignment, NodeKind, ReferenceKind, Tree};

/// Deepest node, counted in ancestors, that is rendered with its markup.
pub(crate) const MAX_NESTING: usize = 128;

/// Render a whole tree.
pub(crate) fn stringify(tree: &Tree) -> String {
    let body = render_blocks(tree, &tree.top_level(), "\n\n");
    if body.is_empty() {
        body
    } else {
        format!("{}\n", body.trim_end_matches('\n'))
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

fn render_blocks(tree: &Tree, ids: &[NodeId], separator: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut inline_run: Vec<NodeId> = Vec::new();

    // Tight list items hold inlines directly; treat each run as a paragraph.
    for &id in ids {
        if tree.kind(id).is_inline() {
            inline_run.push(id);
            continue;
        }
        if !inline_run.is_empty() {
            parts.push(escape_line_starts(&render_inlines(tree, &inline_run)));
            inline_run.clear();
        }
        parts.push(render_block(tree, id));
    }
    if !inline_run.is_empty() {
        parts.push(escape_line_starts(&render_inlines(tree, &inline_run)));
    }

    parts.retain(|p| !p.is_empty());
    parts.join(separator)
}

fn render_block(tree: &Tree, id: NodeId) -> String {
    if too_deep(tree, id) {
        return escape_line_starts(&escape_text(tree.text_content(id).trim()));
    }
    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::Root => render_blocks(tree, &children, "\n\n"),
        NodeKind::Heading { depth } => {
            let hashes = "#".repeat(usize::from(*depth).clamp(1, 6));
            format!("{hashes} {}", escape_line_starts(&render_inlines(tree, &children)))
        }
        NodeKind::Paragraph => escape_line_starts(&render_inlines(tree, &children)),
        NodeKind::TableCell => render_inlines(tree, &children),
        NodeKind::BlockQuote => {
            let inner = render_blocks(tree, &children, "\n\n");
            prefix_lines(&inner, "> ", ">")
        }
        NodeKind::List { start } => render_list(tree, &children, *start),
        NodeKind::ListItem => render_blocks(tree, &children, "\n\n"),
        NodeKind::CodeBlock { info, literal } => {
            let fence = "`".repeat(longest_run(literal, '`').max(2) + 1);
            let literal = literal.strip_suffix('\n').unwrap_or(literal);
            format!("{fence}{info}\n{literal}\n{fence}")
        }
        NodeKind::Html { raw } => raw.trim_end_matches('\n').to_string(),
        NodeKind::ThematicBreak => "***".to_string(),
        NodeKind::Table { alignments } => render_table(tree, &children, alignments),
        NodeKind::TableHead | NodeKind::TableRow => render_row(tree, &children),
        NodeKind::Definition { label, url, title } => {
            format!("[{label}]: {}{}", destination(url), title_suffix(title.as_deref()))
        }
        NodeKind::FrontMatter { raw } => {
            format!("---\n{}\n---", raw.trim_end_matches('\n'))
        }
        _ => render_inlines(tree, &[id]),
    }
}

fn render_list(tree: &Tree, items: &[NodeId], start: Option<u64>) -> String {
    let loose = items.iter().any(|&item| {
        tree.children(item)
            .into_iter()
            .any(|child| matches!(tree.kind(child), NodeKind::Paragraph))
    });

    let separator = if loose { "\n\n" } else { "\n" };
    let rendered: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, &item)| {
            let marker = match start {
                Some(n) => format!("{}. ", n + i as u64),
                None => "- ".to_string(),
            };
            let indent = " ".repeat(marker.len());
            let body = render_blocks(tree, &tree.children(item), separator);
            let body = prefix_lines(&body, &indent, "");
            format!("{marker}{}", body.strip_prefix(&indent).unwrap_or(&body))
        })
        .collect();

    rendered.join(separator)
}

fn render_table(tree: &Tree, rows: &[NodeId], alignments: &[Alignment]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (i, &row) in rows.iter().enumerate() {
        lines.push(render_block(tree, row));
        if i == 0 {
            let separator: Vec<&str> = alignments
                .iter()
                .map(|a| match a {
                    Alignment::None => "---",
                    Alignment::Left => ":---",
                    Alignment::Center => ":---:",
                    Alignment::Right => "---:",
                })
                .collect();
            lines.push(format!("| {} |", separator.join(" | ")));
        }
    }
    lines.join("\n")
}

fn render_row(tree: &Tree, cells: &[NodeId]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|&cell| render_block(tree, cell).replace('|', "\\|"))
        .collect();
    format!("| {} |", cells.join(" | "))
}

/// Prefix every line of `text`; blank lines get `blank_prefix` instead.
fn prefix_lines(text: &str, prefix: &str, blank_prefix: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                blank_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Inlines
// ---------------------------------------------------------------------------

fn render_inlines(tree: &Tree, ids: &[NodeId]) -> String {
    let mut out = String::new();
    for &id in ids {
        render_inline(tree, id, &mut out);
    }
    out
}

fn render_inline(tree: &Tree, id: NodeId, out: &mut String) {
    if too_deep(tree, id) {
        out.push_str(&escape_text(&tree.text_content(id)));
        return;
    }
    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::Text(text) => out.push_str(&escape_text(text)),
        NodeKind::Code(code) => out.push_str(&code_span(code)),
        NodeKind::Emphasis => wrap(out, "*", &render_inlines(tree, &children)),
        NodeKind::Strong => wrap(out, "**", &render_inlines(tree, &children)),
        NodeKind::Strikethrough => wrap(out, "~~", &render_inlines(tree, &children)),
        NodeKind::Link { url, title } => {
            let text = render_inlines(tree, &children);
            if title.is_none() && is_autolink(url, &tree.text_content(id)) {
                out.push_str(&format!("<{url}>"));
            } else {
                out.push_str(&format!(
                    "[{text}]({}{})",
                    destination(url),
                    title_suffix(title.as_deref())
                ));
            }
        }
        NodeKind::LinkReference { label, kind } => {
            let text = render_inlines(tree, &children);
            match kind {
                ReferenceKind::Full => out.push_str(&format!("[{text}][{label}]")),
                ReferenceKind::Collapsed => out.push_str(&format!("[{text}][]")),
                ReferenceKind::Shortcut => out.push_str(&format!("[{text}]")),
            }
        }
        NodeKind::Image { url, title } => {
            let alt = render_inlines(tree, &children);
            out.push_str(&format!(
                "![{alt}]({}{})",
                destination(url),
                title_suffix(title.as_deref())
            ));
        }
        NodeKind::InlineHtml(html) => out.push_str(html),
        NodeKind::SoftBreak => out.push('\n'),
        NodeKind::HardBreak => out.push_str("\\\n"),
        _ => out.push_str(&render_block(tree, id)),
    }
}

fn wrap(out: &mut String, marker: &str, inner: &str) {
    out.push_str(marker);
    out.push_str(inner);
    out.push_str(marker);
}

fn code_span(code: &str) -> String {
    let ticks = "`".repeat(longest_run(code, '`') + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{ticks} {code} {ticks}")
    } else {
        format!("{ticks}{code}{ticks}")
    }
}

fn destination(url: &str) -> String {
    if url.is_empty() || url.contains([' ', '(', ')']) {
        format!("<{url}>")
    } else {
        url.to_string()
    }
}

fn title_suffix(title: Option<&str>) -> String {
    match title {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn is_autolink(url: &str, text: &str) -> bool {
    url == text && (url.starts_with("http://") || url.starts_with("https://"))
}

fn too_deep(tree: &Tree, id: NodeId) -> bool {
    tree.ancestors(id).len() > MAX_NESTING
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Escape characters that would otherwise start inline markup.
///
/// An `&` that could begin an entity is written as `&amp;`. A trailing `&`
/// counts too, since the next text node may continue it.
fn escape_text(text: &str) -> String {
    static SPECIAL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\\`*~\[\]]|<[A-Za-z/!?]").expect("valid regex"));
    static AMPERSAND_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"&([#A-Za-z0-9]|$)").expect("valid regex"));
    static INTRAWORD_UNDERSCORE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(^|[^A-Za-z0-9])_|_([^A-Za-z0-9]|$)").expect("valid regex"));

    let escaped = SPECIAL_RE.replace_all(text, |caps: &regex::Captures| format!("\\{}", &caps[0]));
    let escaped = AMPERSAND_RE.replace_all(&escaped, "&amp;$1");
    INTRAWORD_UNDERSCORE_RE
        .replace_all(&escaped, |caps: &regex::Captures| {
            let before = caps.get(1).map_or("", |m| m.as_str());
            let after = caps.get(2).map_or("", |m| m.as_str());
            format!("{before}\\_{after}")
        })
        .into_owned()
}

/// Escape lines of rendered inline content that would open a block:
/// ATX headings, block quotes, list items, setext underlines and
/// thematic breaks.
fn escape_line_starts(text: &str) -> String {
    static BLOCK_START_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:#{1,6}(?:[ \t]|$)|>|[-+](?:[ \t]|$)|[-=]+[ \t]*$|\d{1,9}[.)](?:[ \t]|$))")
            .expect("valid regex")
    });

    text.split('\n')
        .map(|line| {
            if !BLOCK_START_RE.is_match(line) {
                return line.to_string();
            }
            // For ordered list markers the delimiter after the digits is escaped.
            let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            format!("{}\\{}", &line[..digits], &line[digits..])
        })
        .collect::<Vec<_>>()
        .join("\n")
}
