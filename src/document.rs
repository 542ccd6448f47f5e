//! The task document model.
//!
//! One plain-text file holds the whole board: a fenced front-matter header
//! declaring the allowed status and severity labels, followed by task blocks
//! separated by `---` lines:
//!
//! ```text
//! ---
//! statuses: Backlog, To Do, In Progress, Done
//! severities: Low, Medium, High
//! ---
//! 1. Fix the login redirect
//!
//!     Severity: High
//!     Status: To Do
//!
//!     Repro: log in from the pricing page.
//! ```
//!
//! Parsing is tolerant: a block whose first line is not `<id>. <title>` is
//! reported as skipped rather than failing the read, unknown lines inside a
//! block are kept as description, and missing field lines fall back to
//! defaults. Serialization is deterministic, so
//! `parse(serialize(config, tasks))` reproduces the same record tuples
//! (description whitespace may renormalize, content never changes).
//!
//! [`patch_field_lines`] is the third serialization mode: it rewrites only
//! the `Severity:`/`Status:` lines of specific blocks and leaves every other
//! byte of the document untouched, so label-only edits never reformat
//! unrelated content.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Line that separates task blocks and fences the front matter.
pub const SEPARATOR: &str = "---";

/// Indent applied to field and description lines when serializing.
pub const INDENT: &str = "    ";

/// Severity assumed when a block has no `Severity:` line.
pub const DEFAULT_SEVERITY: &str = "Medium";

/// Status assumed when a block has no `Status:` line, and the status of
/// newly created tasks.
pub const DEFAULT_STATUS: &str = "Backlog";

/// Characters that start an inline annotation after a field value, as in
/// `Status: Done (2024-05-01)`. The value is cut at the first one.
const ANNOTATION_DELIMITERS: &[char] = &['(', '[', '|', '#'];

const DEFAULT_STATUSES: &[&str] = &["Backlog", "To Do", "In Progress", "Done"];
const DEFAULT_SEVERITIES: &[&str] = &["Low", "Medium", "High"];

/// One task record. All label fields are free-form strings; the configured
/// label lists are advisory, not a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub severity: String,
    pub status: String,
    /// Multi-line body. Anything in the block that is not the title line or
    /// one of the two labeled lines lands here, so nothing is lost.
    #[serde(default)]
    pub description: String,
}

/// Label lists declared by the front matter, plus the front-matter text
/// itself so it can be re-emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardConfig {
    pub statuses: Vec<String>,
    pub severities: Vec<String>,
    #[serde(skip)]
    front_matter: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::from_labels(
            DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect(),
            DEFAULT_SEVERITIES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl BoardConfig {
    /// Build a config from label lists, synthesizing the front matter.
    pub fn from_labels(statuses: Vec<String>, severities: Vec<String>) -> Self {
        let front_matter = format!(
            "{SEPARATOR}\nstatuses: {}\nseverities: {}\n{SEPARATOR}\n",
            statuses.join(", "),
            severities.join(", ")
        );
        Self {
            statuses,
            severities,
            front_matter,
        }
    }

    /// Severity assigned to new tasks: the configured label matching
    /// "medium" case-insensitively, else the first configured label, else
    /// [`DEFAULT_SEVERITY`].
    pub fn default_severity(&self) -> String {
        self.severities
            .iter()
            .find(|s| s.eq_ignore_ascii_case("medium"))
            .or_else(|| self.severities.first())
            .cloned()
            .unwrap_or_else(|| DEFAULT_SEVERITY.to_string())
    }
}

/// Parsed document: configuration plus the ordered task sequence.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub config: BoardConfig,
    pub tasks: Vec<Task>,
}

impl Board {
    pub fn find(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Next id for a created task. Ids are never reused or renumbered, so
    /// this is `max + 1`, not a gap fill.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }
}

/// Outcome of tokenizing one separator-delimited block. The tolerance
/// policy is explicit: a malformed block becomes `Skipped`, never an error
/// and never a silent partial record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBlock {
    Task(Task),
    /// Block whose first non-blank line is not `<id>. <title>`. Carries
    /// that line for diagnostics.
    Skipped { first_line: String },
}

/// Parse a document into its configuration and ordered tasks.
///
/// Malformed blocks are skipped; duplicate ids keep the first block. This
/// never fails: the worst input yields an empty board with default labels.
pub fn parse(text: &str) -> Board {
    let text = text.replace("\r\n", "\n");
    let (config, body) = split_front_matter(&text);
    let mut tasks: Vec<Task> = Vec::new();
    for block in tokenize_blocks(body) {
        match block {
            ParsedBlock::Task(task) => {
                if tasks.iter().any(|t| t.id == task.id) {
                    tracing::warn!(id = task.id, "duplicate task id, keeping the first block");
                } else {
                    tasks.push(task);
                }
            }
            ParsedBlock::Skipped { first_line } => {
                tracing::debug!(line = %first_line, "skipped malformed task block");
            }
        }
    }
    Board { config, tasks }
}

/// Split the body into blocks and tokenize each one. Segments containing
/// only blank lines are dropped, not reported as skipped.
pub fn tokenize_blocks(body: &str) -> Vec<ParsedBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in body.lines() {
        if line == SEPARATOR {
            if current.iter().any(|l| !l.trim().is_empty()) {
                blocks.push(parse_block(&current));
            }
            current.clear();
        } else {
            current.push(line);
        }
    }
    if current.iter().any(|l| !l.trim().is_empty()) {
        blocks.push(parse_block(&current));
    }
    blocks
}

fn parse_block(lines: &[&str]) -> ParsedBlock {
    let Some(first_idx) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return ParsedBlock::Skipped {
            first_line: String::new(),
        };
    };
    let first_line = lines[first_idx].trim();
    let Some((id, title)) = parse_title_line(first_line) else {
        return ParsedBlock::Skipped {
            first_line: first_line.to_string(),
        };
    };

    let mut severity: Option<String> = None;
    let mut status: Option<String> = None;
    let mut description: Vec<String> = Vec::new();
    for line in lines[first_idx + 1..].iter().copied() {
        if severity.is_none() {
            if let Some(value) = field_value(line, "severity:") {
                severity = Some(value);
                continue;
            }
        }
        if status.is_none() {
            if let Some(value) = field_value(line, "status:") {
                status = Some(value);
                continue;
            }
        }
        description.push(line.trim().to_string());
    }
    while description.first().is_some_and(|l| l.is_empty()) {
        description.remove(0);
    }
    while description.last().is_some_and(|l| l.is_empty()) {
        description.pop();
    }

    ParsedBlock::Task(Task {
        id,
        title,
        severity: severity.unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        status: status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        description: description.join("\n"),
    })
}

/// Parse a block's opening line, `<id>. <title>`. Ids must be positive
/// integers; anything else rejects the line (and thereby the block).
fn parse_title_line(line: &str) -> Option<(u64, String)> {
    let dot = line.find('.')?;
    let digits = &line[..dot];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: u64 = digits.parse().ok().filter(|id| *id > 0)?;
    let rest = &line[dot + 1..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((id, rest.trim().to_string()))
}

/// Extract a labeled field value, e.g. `  severity: High (raised 5/1)` with
/// label `severity:` yields `High`. Matching is case-insensitive after
/// trimming; the value is cut at the first annotation delimiter. Lines with
/// an empty value do not match and fall through to the description.
fn field_value(line: &str, label: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.len() < label.len() || !trimmed.is_char_boundary(label.len()) {
        return None;
    }
    if !trimmed[..label.len()].eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = &trimmed[label.len()..];
    let value = match rest.find(ANNOTATION_DELIMITERS) {
        Some(pos) => &rest[..pos],
        None => rest,
    };
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn split_front_matter(text: &str) -> (BoardConfig, &str) {
    let mut offset = 0;
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (BoardConfig::default(), text);
    };
    if first.trim_end_matches('\n') != SEPARATOR {
        return (BoardConfig::default(), text);
    }
    offset += first.len();

    let mut statuses: Option<Vec<String>> = None;
    let mut severities: Option<Vec<String>> = None;
    for line in lines {
        offset += line.len();
        let content = line.trim_end_matches('\n');
        if content == SEPARATOR {
            let mut front_matter = text[..offset].to_string();
            if !front_matter.ends_with('\n') {
                front_matter.push('\n');
            }
            let config = BoardConfig {
                statuses: statuses
                    .unwrap_or_else(|| DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect()),
                severities: severities
                    .unwrap_or_else(|| DEFAULT_SEVERITIES.iter().map(|s| s.to_string()).collect()),
                front_matter,
            };
            return (config, &text[offset..]);
        }
        if let Some(labels) = key_list(content, "statuses:") {
            statuses = Some(labels);
        } else if let Some(labels) = key_list(content, "severities:") {
            severities = Some(labels);
        }
        // Anything else in the front matter is preserved but not interpreted.
    }

    // Unclosed fence: not front matter, the whole text is body.
    (BoardConfig::default(), text)
}

fn key_list(line: &str, key: &str) -> Option<Vec<String>> {
    let rest = line.trim().strip_prefix(key)?;
    let labels: Vec<String> = rest
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if labels.is_empty() {
        None
    } else {
        Some(labels)
    }
}

/// Serialize a full document: front matter verbatim (newline normalized),
/// then each task as title line, field lines, and the description
/// re-indented line by line. The result ends in exactly one newline.
pub fn serialize(config: &BoardConfig, tasks: &[Task]) -> String {
    let mut out = String::new();
    let front = config.front_matter.replace("\r\n", "\n");
    out.push_str(&front);
    if !front.ends_with('\n') {
        out.push('\n');
    }
    for (index, task) in tasks.iter().enumerate() {
        if index > 0 {
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        out.push_str(&format!("{}. {}\n\n", task.id, task.title));
        out.push_str(&format!("{INDENT}Severity: {}\n", task.severity));
        out.push_str(&format!("{INDENT}Status: {}\n", task.status));
        if !task.description.is_empty() {
            out.push('\n');
            for line in task.description.lines() {
                let line = line.trim();
                if line.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(INDENT);
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out.push('\n');
    }
    let mut result = out.trim_end_matches('\n').to_string();
    result.push('\n');
    result
}

/// Rewrite only the `Severity:`/`Status:` lines of the given tasks' blocks,
/// leaving every other byte of the document untouched (including each
/// affected task's own title and description formatting).
///
/// Returns `None` when an affected block is missing, or lacks one of the
/// labeled lines to rewrite; the caller then falls back to a full
/// [`serialize`] instead of inventing an insertion point.
pub fn patch_field_lines(original: &str, tasks: &[&Task]) -> Option<String> {
    let targets: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, *t)).collect();
    let mut done: HashMap<u64, (bool, bool)> = HashMap::new();

    let mut out = String::with_capacity(original.len() + 64);
    let mut in_front_matter = false;
    let mut block_started = false;
    let mut current: Option<u64> = None;

    for (index, raw) in original.split_inclusive('\n').enumerate() {
        let (line, ending) = if let Some(l) = raw.strip_suffix("\r\n") {
            (l, "\r\n")
        } else if let Some(l) = raw.strip_suffix('\n') {
            (l, "\n")
        } else {
            (raw, "")
        };

        if index == 0 && line == SEPARATOR {
            in_front_matter = true;
            out.push_str(raw);
            continue;
        }
        if in_front_matter {
            if line == SEPARATOR {
                in_front_matter = false;
            }
            out.push_str(raw);
            continue;
        }
        if line == SEPARATOR {
            block_started = false;
            current = None;
            out.push_str(raw);
            continue;
        }
        if !block_started {
            if !line.trim().is_empty() {
                block_started = true;
                current = parse_title_line(line.trim()).map(|(id, _)| id);
            }
            out.push_str(raw);
            continue;
        }

        let Some(task) = current.and_then(|id| targets.get(&id)) else {
            out.push_str(raw);
            continue;
        };
        let flags = done.entry(task.id).or_insert((false, false));
        if !flags.0 {
            if let Some(patched) = rewrite_field_line(line, "severity:", &task.severity) {
                flags.0 = true;
                out.push_str(&patched);
                out.push_str(ending);
                continue;
            }
        }
        if !flags.1 {
            if let Some(patched) = rewrite_field_line(line, "status:", &task.status) {
                flags.1 = true;
                out.push_str(&patched);
                out.push_str(ending);
                continue;
            }
        }
        out.push_str(raw);
    }

    let complete = targets
        .keys()
        .all(|id| matches!(done.get(id), Some((true, true))));
    if complete {
        Some(out)
    } else {
        None
    }
}

/// Rebuild one labeled line with a new value, preserving the original
/// indentation and label spelling. Any inline annotation after the old
/// value is dropped along with it.
fn rewrite_field_line(line: &str, label: &str, value: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if trimmed.len() < label.len() || !trimmed.is_char_boundary(label.len()) {
        return None;
    }
    if !trimmed[..label.len()].eq_ignore_ascii_case(label) {
        return None;
    }
    let indent = &line[..line.len() - trimmed.len()];
    let original_label = &trimmed[..label.len()];
    Some(format!("{indent}{original_label} {value}"))
}
