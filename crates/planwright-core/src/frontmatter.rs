//! Frontmatter codec for planning documents.
//!
//! A document may start with a metadata block delimited by literal `---`
//! lines. The block uses a small YAML subset:
//!
//! - `key: scalar` (plain, `"double"` or `'single'` quoted)
//! - `key: [a, b, c]` inline arrays, `key: []` and `key: {}` empties
//! - `key:` followed by indented `- item` lines (block array)
//! - `key:` followed by indented `sub: value` lines (nested mapping)
//! - `key:` with no indented continuation (null placeholder)
//!
//! Parsing is a recursive descent over lines that yields a tagged [`Value`]
//! tree. Every top-level entry keeps the exact text it was parsed from, and
//! [`reconstruct`] re-emits that text for entries whose value was not
//! changed. Untouched fields therefore survive a mutate-and-write cycle
//! byte for byte, and `splice(d, extract(d)) == d` for any parseable `d`.

use serde_json::Number;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    /// Ordered mapping; key order is preserved on output.
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up `key` in a mapping value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Scalar items of a list rendered as plain strings. Non-list values
    /// yield an empty vector; a bare string yields itself.
    pub fn string_items(&self) -> Vec<String> {
        match self {
            Value::List(items) => items.iter().filter_map(scalar_text).collect(),
            Value::String(s) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.clone()),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::String).collect())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontmatterError {
    #[error("line {line}: expected `key: value`")]
    ExpectedKey { line: usize },

    #[error("line {line}: unexpected indentation")]
    UnexpectedIndent { line: usize },

    #[error("line {line}: unterminated inline array")]
    UnterminatedArray { line: usize },

    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote { line: usize },
}

type ParseResult<T> = std::result::Result<T, FrontmatterError>;

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    value: Value,
    /// Exact source text of the entry; `None` once the value changes.
    source: Option<String>,
    /// Blank and comment lines that followed the entry.
    trailing: String,
}

/// Parsed metadata block: ordered fields plus the text they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    preamble: String,
    entries: Vec<Entry>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text between the `---` delimiters.
    pub fn parse(block: &str) -> ParseResult<Self> {
        Parser::new(block).parse_document()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    /// Set `key` to `value`, appending it when absent.
    ///
    /// Setting a field to the value it already holds keeps its source text.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                if entry.value != value {
                    entry.value = value;
                    entry.source = None;
                }
            }
            None => self.entries.push(Entry {
                key,
                value,
                source: None,
                trailing: String::new(),
            }),
        }
    }

    /// Set a list that is always rendered as a block sequence, one `- item`
    /// per line. An empty list still renders as `[]`.
    pub fn set_block_list(&mut self, key: impl Into<String>, items: Vec<Value>) {
        let key = key.into();
        if items.is_empty() {
            self.set(key, Value::List(items));
            return;
        }
        let mut text = format!("{key}:\n");
        for item in &items {
            text.push_str(&format!("  - {}\n", render_scalar(item, false)));
        }
        self.set(key.clone(), Value::List(items));
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.source = Some(text);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(pos).value)
    }

    /// Set every key of a JSON object, in the object's order.
    pub fn merge_json(&mut self, data: &serde_json::Map<String, serde_json::Value>) {
        for (k, v) in data {
            self.set(k.clone(), Value::from_json(v));
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|e| (e.key.clone(), e.value.to_json()))
                .collect(),
        )
    }

    /// Render the block text (without delimiters).
    pub fn render(&self) -> String {
        let mut out = self.preamble.clone();
        for entry in &self.entries {
            match &entry.source {
                Some(src) => out.push_str(src),
                None => render_entry(&entry.key, &entry.value, 0, &mut out),
            }
            out.push_str(&entry.trailing);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Document-level contract
// ---------------------------------------------------------------------------

struct Span {
    block_start: usize,
    block_end: usize,
    body_start: usize,
}

fn locate(content: &str) -> Option<Span> {
    let block_start = if content.starts_with("---\n") {
        4
    } else if content.starts_with("---\r\n") {
        5
    } else {
        return None;
    };
    let mut offset = block_start;
    for line in content[block_start..].split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "---" {
            return Some(Span {
                block_start,
                block_end: offset,
                body_start: offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

/// Parse the leading frontmatter block, or `None` when the document has no
/// well-formed block.
pub fn extract(content: &str) -> Option<Frontmatter> {
    let span = locate(content)?;
    match Frontmatter::parse(&content[span.block_start..span.block_end]) {
        Ok(fm) => Some(fm),
        Err(e) => {
            tracing::debug!(error = %e, "malformed frontmatter");
            None
        }
    }
}

/// Like [`extract`], but reports why a present block failed to parse.
pub fn try_extract(content: &str) -> ParseResult<Option<Frontmatter>> {
    match locate(content) {
        Some(span) => Frontmatter::parse(&content[span.block_start..span.block_end]).map(Some),
        None => Ok(None),
    }
}

pub fn reconstruct(fields: &Frontmatter) -> String {
    fields.render()
}

/// Replace the frontmatter block of `content`, copying the body unchanged.
/// A document without a block gets one prepended.
pub fn splice(content: &str, fields: &Frontmatter) -> String {
    match locate(content) {
        Some(span) => {
            let mut out = String::with_capacity(content.len() + 64);
            out.push_str(&content[..span.block_start]);
            out.push_str(&fields.render());
            out.push_str(&content[span.block_end..]);
            out
        }
        None => format!("---\n{}---\n{}", fields.render(), content),
    }
}

/// Text following the closing delimiter, or the whole content when there is
/// no block.
pub fn body(content: &str) -> &str {
    match locate(content) {
        Some(span) => &content[span.body_start..],
        None => content,
    }
}

/// Build a complete document from fields and body text.
pub fn compose(fields: &Frontmatter, body: &str) -> String {
    format!("---\n{}---\n{}", fields.render(), body)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Line<'a> {
    /// 1-based line number within the block.
    number: usize,
    indent: usize,
    text: &'a str,
}

struct Parser<'a> {
    raw: Vec<&'a str>,
    pos: usize,
}

fn content_of(raw: &str) -> &str {
    raw.trim_end_matches(['\n', '\r'])
}

fn indent_of(text: &str) -> usize {
    text.len() - text.trim_start_matches([' ', '\t']).len()
}

fn is_trivia(raw: &str) -> bool {
    let t = content_of(raw).trim();
    t.is_empty() || t.starts_with('#')
}

impl<'a> Parser<'a> {
    fn new(block: &'a str) -> Self {
        Self {
            raw: block.split_inclusive('\n').collect(),
            pos: 0,
        }
    }

    fn parse_document(mut self) -> ParseResult<Frontmatter> {
        let mut fm = Frontmatter::new();
        fm.preamble = self.take_trivia();
        while self.pos < self.raw.len() {
            let start = self.pos;
            let text = content_of(self.raw[start]);
            if indent_of(text) > 0 {
                return Err(FrontmatterError::UnexpectedIndent { line: start + 1 });
            }
            let (key, rest) = split_key(text).ok_or(FrontmatterError::ExpectedKey { line: start + 1 })?;
            self.pos += 1;
            let value = if rest.is_empty() {
                let region = self.take_region();
                parse_region(&region)?
            } else {
                parse_inline(rest, start + 1)?
            };
            let source = self.raw[start..self.pos].concat();
            let trailing = self.take_trivia();
            fm.entries.push(Entry {
                key: key.to_string(),
                value,
                source: Some(source),
                trailing,
            });
        }
        Ok(fm)
    }

    fn take_trivia(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.raw.len() && is_trivia(self.raw[self.pos]) {
            self.pos += 1;
        }
        self.raw[start..self.pos].concat()
    }

    /// Consume the indented continuation of a `key:` line. Blank lines are
    /// only taken when more indented content follows them.
    fn take_region(&mut self) -> Vec<Line<'a>> {
        let mut lines = Vec::new();
        let mut cursor = self.pos;
        while cursor < self.raw.len() {
            let text = content_of(self.raw[cursor]);
            if text.trim().is_empty() {
                cursor += 1;
                continue;
            }
            if indent_of(text) == 0 {
                break;
            }
            cursor += 1;
            self.pos = cursor;
            if !text.trim_start().starts_with('#') {
                lines.push(Line {
                    number: cursor,
                    indent: indent_of(text),
                    text: text.trim(),
                });
            }
        }
        lines
    }
}

/// Split `key: rest` at the first colon followed by whitespace or end of line.
fn split_key(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b':' {
            continue;
        }
        let next = bytes.get(i + 1);
        if next.is_none() || matches!(next, Some(b' ') | Some(b'\t')) {
            let key = text[..i].trim();
            if key.is_empty() || key.starts_with(['-', '#', '"', '\'', '[', '{']) {
                return None;
            }
            return Some((key, text[i + 1..].trim()));
        }
    }
    None
}

fn is_list_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

/// Parse an indented region into a list or mapping. An empty region is null.
fn parse_region(lines: &[Line<'_>]) -> ParseResult<Value> {
    let Some(first) = lines.first() else {
        return Ok(Value::Null);
    };
    let base = first.indent;
    if is_list_item(first.text) {
        let mut items = Vec::new();
        for line in lines {
            if line.indent != base || !is_list_item(line.text) {
                return Err(FrontmatterError::UnexpectedIndent { line: line.number });
            }
            let item = line.text[1..].trim();
            items.push(if item.is_empty() {
                Value::Null
            } else {
                parse_inline(item, line.number)?
            });
        }
        return Ok(Value::List(items));
    }

    let mut entries = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if line.indent != base {
            return Err(FrontmatterError::UnexpectedIndent { line: line.number });
        }
        let (key, rest) =
            split_key(line.text).ok_or(FrontmatterError::ExpectedKey { line: line.number })?;
        let mut end = i + 1;
        while end < lines.len() && lines[end].indent > base {
            end += 1;
        }
        let nested = &lines[i + 1..end];
        let value = if rest.is_empty() {
            parse_region(nested)?
        } else if let Some(extra) = nested.first() {
            return Err(FrontmatterError::UnexpectedIndent { line: extra.number });
        } else {
            parse_inline(rest, line.number)?
        };
        entries.push((key.to_string(), value));
        i = end;
    }
    Ok(Value::Map(entries))
}

/// Parse a value written on the same line as its key or list marker.
fn parse_inline(text: &str, line: usize) -> ParseResult<Value> {
    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or(FrontmatterError::UnterminatedArray { line })?;
        if inner.trim().is_empty() {
            return Ok(Value::List(Vec::new()));
        }
        return split_flow_items(inner)
            .into_iter()
            .map(|item| parse_scalar(item.trim(), line))
            .collect::<ParseResult<Vec<_>>>()
            .map(Value::List);
    }
    if text == "{}" {
        return Ok(Value::Map(Vec::new()));
    }
    parse_scalar(text, line)
}

/// Split inline-array contents on commas that are outside quotes.
fn split_flow_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ',' => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            None => {}
        }
    }
    items.push(&inner[start..]);
    items
}

fn parse_scalar(text: &str, line: usize) -> ParseResult<Value> {
    if let Some(rest) = text.strip_prefix('"') {
        let inner = rest
            .strip_suffix('"')
            .ok_or(FrontmatterError::UnterminatedQuote { line })?;
        return Ok(Value::String(unescape_double(inner)));
    }
    if let Some(rest) = text.strip_prefix('\'') {
        let inner = rest
            .strip_suffix('\'')
            .ok_or(FrontmatterError::UnterminatedQuote { line })?;
        return Ok(Value::String(inner.replace("''", "'")));
    }
    Ok(plain_scalar(text))
}

fn plain_scalar(text: &str) -> Value {
    match text {
        "null" | "~" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match parse_number(text) {
            Some(n) => Value::Number(n),
            None => Value::String(text.to_string()),
        },
    }
}

/// A scalar is numeric only when its canonical rendering equals its text, so
/// zero-padded ids like `01` stay strings.
fn parse_number(text: &str) -> Option<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return (i.to_string() == text).then(|| Number::from(i));
    }
    let f = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
    let n = Number::from_f64(f)?;
    (n.to_string() == text).then_some(n)
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const SPECIAL_LEADING: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

fn needs_quotes(s: &str, in_flow: bool) -> bool {
    s.is_empty()
        || s.trim() != s
        || s.contains(':')
        || s.contains(" #")
        || s.contains('\n')
        || s.starts_with(SPECIAL_LEADING)
        || (in_flow && s.contains(','))
        || !matches!(plain_scalar(s), Value::String(_))
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("\"{escaped}\"")
}

fn render_scalar(v: &Value, in_flow: bool) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if needs_quotes(s, in_flow) => quote(s),
        Value::String(s) => s.clone(),
        Value::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|i| render_scalar(i, true))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Map(entries) if entries.is_empty() => "{}".to_string(),
        Value::Map(_) => quote(&v.to_json().to_string()),
    }
}

fn fits_inline(items: &[Value]) -> bool {
    if items.len() > 3 || items.iter().any(|i| matches!(i, Value::List(_) | Value::Map(_))) {
        return false;
    }
    let width: usize = items.iter().map(|i| render_scalar(i, true).len() + 2).sum();
    width < 60
}

fn render_entry(key: &str, value: &Value, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    match value {
        Value::Null => out.push_str(&format!("{pad}{key}:\n")),
        Value::List(items) if items.is_empty() || fits_inline(items) => {
            out.push_str(&format!("{pad}{key}: {}\n", render_scalar(value, false)));
        }
        Value::List(items) => {
            out.push_str(&format!("{pad}{key}:\n"));
            for item in items {
                out.push_str(&format!("{pad}  - {}\n", render_scalar(item, false)));
            }
        }
        Value::Map(entries) if entries.is_empty() => out.push_str(&format!("{pad}{key}: {{}}\n")),
        Value::Map(entries) => {
            out.push_str(&format!("{pad}{key}:\n"));
            for (k, v) in entries {
                render_entry(k, v, indent + 2, out);
            }
        }
        scalar => out.push_str(&format!("{pad}{key}: {}\n", render_scalar(scalar, false))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
