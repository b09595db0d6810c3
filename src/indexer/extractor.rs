//! Lexical declaration extraction from Nim source text.
//!
//! The scan is line-based and error-tolerant: a malformed declaration never
//! suppresses the rest of the file. No parsing or type-checking happens
//! here; the extractor only recognises declaration shapes.
//!
//! Recognised forms:
//!   - routine declarations: proc/func/method/iterator/converter/template/
//!     macro, with multi-line parameter lists;
//!   - section declarations: type/const/var/let, both inline
//!     (`const answer* = 42`) and indented-section form;
//!   - `##` doc-comment blocks immediately preceding a declaration;
//!   - the export marker `*` directly after the declared identifier;
//!   - backtick-quoted operator names and unicode identifiers.

use regex::Regex;

use crate::types::{SymbolKind, Visibility};

/// Longest routine header the extractor will chase across lines.
const MAX_HEADER_LINES: usize = 40;

/// One extracted declaration, positioned 1-based in its source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub documentation: String,
    pub visibility: Visibility,
    pub line: u32,
    pub col: u32,
}

pub struct SymbolExtractor {
    routine_re: Regex,
    ident_re: Regex,
}

impl SymbolExtractor {
    pub fn new() -> Self {
        // Identifiers: unicode letter or underscore start, or a
        // backtick-quoted operator token. The optional `*` is the export
        // marker.
        let ident = r"(`[^`]+`|[\p{L}_][\p{L}\p{N}_]*)(\*)?";
        Self {
            routine_re: Regex::new(&format!(
                r"^(proc|func|method|iterator|converter|template|macro)\s+{ident}"
            ))
            .unwrap_or_else(|e| panic!("routine regex: {e}")),
            ident_re: Regex::new(ident).unwrap_or_else(|e| panic!("ident regex: {e}")),
        }
    }

    /// Extract all declarations from one file's text, in source order.
    ///
    /// An empty file yields an empty vector; unrecognisable lines are
    /// skipped.
    pub fn extract(&self, source: &str) -> Vec<Declaration> {
        let lines: Vec<&str> = source.lines().collect();
        let mut decls = Vec::new();
        let mut doc_buf: Vec<String> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();

            if trimmed.is_empty() {
                doc_buf.clear();
                i += 1;
                continue;
            }
            if let Some(text) = doc_line(trimmed) {
                doc_buf.push(text);
                i += 1;
                continue;
            }

            if let Some(caps) = self.routine_re.captures(trimmed) {
                let kw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let kind = match SymbolKind::from_str_loose(kw) {
                    Some(kind) => kind,
                    None => {
                        i += 1;
                        continue;
                    }
                };
                let name_match = match caps.get(2) {
                    Some(m) => m,
                    None => {
                        i += 1;
                        continue;
                    }
                };
                let visibility = if caps.get(3).is_some() {
                    Visibility::Public
                } else {
                    Visibility::Private
                };

                let (signature, consumed) = capture_header(&lines, i);
                decls.push(Declaration {
                    name: unquote(name_match.as_str()),
                    kind,
                    signature,
                    documentation: take_doc(&mut doc_buf),
                    visibility,
                    line: (i + 1) as u32,
                    col: col_at(line, indent + name_match.start()),
                });
                i += consumed;
                continue;
            }

            // Section keywords only declare at top level; an indented
            // `let`/`var` is a routine-body local, not a module symbol.
            if indent == 0 {
                if let Some((kind, rest)) = section_head(trimmed) {
                    if rest.is_empty() {
                        // Section form: indented entries until dedent. Only
                        // the first indentation level declares; deeper lines
                        // are object fields or enum members.
                        doc_buf.clear();
                        i += 1;
                        let mut entry_indent: Option<usize> = None;
                        while i < lines.len() {
                            let entry_line = lines[i];
                            let entry_trimmed = entry_line.trim_start();
                            if entry_trimmed.is_empty() {
                                doc_buf.clear();
                                i += 1;
                                continue;
                            }
                            let ind = entry_line.len() - entry_trimmed.len();
                            if ind <= indent {
                                break;
                            }
                            if let Some(text) = doc_line(entry_trimmed) {
                                doc_buf.push(text);
                                i += 1;
                                continue;
                            }
                            if entry_indent.map(|e| ind > e).unwrap_or(false) {
                                doc_buf.clear();
                                i += 1;
                                continue;
                            }
                            entry_indent = Some(ind);
                            self.push_entries(kind, entry_line, i, &mut doc_buf, &mut decls);
                            i += 1;
                        }
                    } else {
                        // Inline form: `const answer* = 42`.
                        self.push_entries(kind, line, i, &mut doc_buf, &mut decls);
                        i += 1;
                    }
                    continue;
                }
            }

            doc_buf.clear();
            i += 1;
        }

        decls
    }

    /// Parse the name list at the head of a section entry (or an inline
    /// section line) and emit one declaration per name.
    ///
    /// Handles comma-separated names (`width, height: int`) and stops the
    /// name scan at the first `:`, `=`, generic bracket, or pragma.
    fn push_entries(
        &self,
        kind: SymbolKind,
        line: &str,
        line_idx: usize,
        doc_buf: &mut Vec<String>,
        decls: &mut Vec<Declaration>,
    ) {
        let trimmed = line.trim_start();
        let body = match section_head(trimmed) {
            Some((_, rest)) => rest,
            None => trimmed,
        };
        // `body` borrows from `line`, so pointer distance is its byte offset.
        let body_start = body.as_ptr() as usize - line.as_ptr() as usize;

        let head_len = body
            .find(|c| c == ':' || c == '=' || c == '[' || c == '{')
            .unwrap_or(body.len());
        let head = &body[..head_len];

        let documentation = take_doc(doc_buf);

        for caps in self.ident_re.captures_iter(head) {
            let name_match = match caps.get(1) {
                Some(m) => m,
                None => continue,
            };
            let visibility = if caps.get(2).is_some() {
                Visibility::Public
            } else {
                Visibility::Private
            };
            decls.push(Declaration {
                name: unquote(name_match.as_str()),
                kind,
                signature: format!("{} {}", kind.as_str(), body.trim_end()),
                documentation: documentation.clone(),
                visibility,
                line: (line_idx + 1) as u32,
                col: col_at(line, body_start + name_match.start()),
            });
        }
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `##` doc line → its text, with the marker and one leading space removed.
fn doc_line(trimmed: &str) -> Option<String> {
    let rest = trimmed.strip_prefix("##")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest).to_string())
}

fn take_doc(doc_buf: &mut Vec<String>) -> String {
    let doc = doc_buf.join("\n");
    doc_buf.clear();
    doc
}

/// Strip backticks from an operator token; plain identifiers pass through.
fn unquote(token: &str) -> String {
    token
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(token)
        .to_string()
}

/// 1-based character column for a byte offset into `line`.
fn col_at(line: &str, byte_idx: usize) -> u32 {
    (line[..byte_idx].chars().count() + 1) as u32
}

/// Split a section keyword (`type`/`const`/`var`/`let`) off the front of a
/// trimmed line. Returns the kind and the remainder (trailing `#` comments
/// stripped).
fn section_head(trimmed: &str) -> Option<(SymbolKind, &str)> {
    for (kw, kind) in [
        ("type", SymbolKind::Type),
        ("const", SymbolKind::Const),
        ("var", SymbolKind::Var),
        ("let", SymbolKind::Let),
    ] {
        if let Some(rest) = trimmed.strip_prefix(kw) {
            if rest.is_empty() {
                return Some((kind, ""));
            }
            if rest.starts_with(char::is_whitespace) {
                let rest = strip_line_comment(rest).trim();
                return Some((kind, rest));
            }
        }
    }
    None
}

/// Drop a trailing `# ...` comment (doc markers `##` never reach here on
/// their own line; inline ones are dropped with the comment).
fn strip_line_comment(s: &str) -> &str {
    match s.find('#') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

/// Capture a routine header starting at `start`, following continuation
/// lines while bracket depth is open. The header ends at a top-level `=`
/// (excluded) or at end of line with all brackets closed.
///
/// Returns the normalized signature text and the number of lines consumed.
fn capture_header(lines: &[&str], start: usize) -> (String, usize) {
    let mut parts: Vec<String> = Vec::new();
    let mut depth = 0i32;
    let mut consumed = 0;

    for (offset, raw) in lines[start..].iter().take(MAX_HEADER_LINES).enumerate() {
        let line = raw.trim();
        // Headers never span blank lines; an unclosed bracket stops here.
        if offset > 0 && line.is_empty() {
            break;
        }
        let mut end = line.len();
        let mut in_string = false;
        let mut in_backtick = false;
        let mut prev = '\0';
        let mut finished = false;

        for (idx, c) in line.char_indices() {
            if in_string {
                if c == '"' && prev != '\\' {
                    in_string = false;
                }
            } else if in_backtick {
                // Quoted operator names like `==` may contain `=`; none of
                // it terminates the header.
                if c == '`' {
                    in_backtick = false;
                }
            } else {
                match c {
                    '"' => in_string = true,
                    '`' => in_backtick = true,
                    '(' | '[' | '{' => depth += 1,
                    ')' | ']' | '}' => depth -= 1,
                    '=' if depth <= 0 => {
                        end = idx;
                        finished = true;
                    }
                    _ => {}
                }
            }
            if finished {
                break;
            }
            prev = c;
        }

        parts.push(line[..end].trim_end().to_string());
        consumed = offset + 1;

        if finished || depth <= 0 {
            break;
        }
    }

    (parts.join(" "), consumed.max(1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
