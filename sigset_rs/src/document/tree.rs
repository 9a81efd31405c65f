//! JSON syntax tree with byte spans.
//!
//! `serde_json` throws positions away, but diagnostics and auto-fix edits
//! need the exact byte range of every key and value. This parser keeps them.
//! It accepts `//` and `/* */` comments and trailing commas, the same
//! leniency editors apply to hand-written signal set files.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, SignalSetError};

const MAX_DEPTH: usize = 256;

/// Kind of syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Object,
    Array,
    /// `"key": value` inside an object. Children are `[key, value]`.
    Property,
    String,
    Number,
    Boolean,
    Null,
}

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub offset: usize,
    pub length: usize,
    /// Decoded scalar for string/number/boolean leaves, `Null` otherwise.
    pub value: Value,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(kind: NodeKind, offset: usize, length: usize, value: Value) -> Self {
        Self {
            kind,
            offset,
            length,
            value,
            children: Vec::new(),
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.offset, self.length)
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Raw source text covered by this node.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.offset..self.end()).unwrap_or("")
    }

    /// The `"key": value` property node for `key` in an object.
    pub fn property(&self, key: &str) -> Option<&Node> {
        if self.kind != NodeKind::Object {
            return None;
        }
        self.children
            .iter()
            .find(|prop| prop.key() == Some(key))
    }

    /// The value node for `key` in an object.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.property(key).and_then(Node::value_node)
    }

    /// Walk a path of object keys and array indices.
    pub fn find(&self, path: &[PathSegment<'_>]) -> Option<&Node> {
        let mut current = self;
        for segment in path {
            current = match segment {
                PathSegment::Key(key) => current.get(key)?,
                PathSegment::Index(idx) if current.kind == NodeKind::Array => {
                    current.children.get(*idx)?
                }
                PathSegment::Index(_) => return None,
            };
        }
        Some(current)
    }

    /// Property key, when this is a property node.
    pub fn key(&self) -> Option<&str> {
        if self.kind != NodeKind::Property {
            return None;
        }
        self.children.first().and_then(Node::as_str)
    }

    /// Property value, when this is a property node.
    pub fn value_node(&self) -> Option<&Node> {
        if self.kind != NodeKind::Property {
            return None;
        }
        self.children.get(1)
    }

    /// Array elements (empty for anything else).
    pub fn items(&self) -> &[Node] {
        if self.kind == NodeKind::Array {
            &self.children
        } else {
            &[]
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.kind {
            NodeKind::String => self.value.as_str(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Number => self.value.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            NodeKind::Boolean => self.value.as_bool(),
            _ => None,
        }
    }

    /// Rebuild the plain JSON value, for decoding into typed views.
    pub fn to_value(&self) -> Value {
        match self.kind {
            NodeKind::Object => {
                let mut map = Map::new();
                for prop in &self.children {
                    if let (Some(key), Some(value)) = (prop.key(), prop.value_node()) {
                        map.insert(key.to_string(), value.to_value());
                    }
                }
                Value::Object(map)
            }
            NodeKind::Array => Value::Array(self.children.iter().map(Node::to_value).collect()),
            NodeKind::Property => self
                .value_node()
                .map(Node::to_value)
                .unwrap_or(Value::Null),
            _ => self.value.clone(),
        }
    }
}

/// One step of a [`Node::find`] path.
#[derive(Debug, Clone, Copy)]
pub enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Parse text into a syntax tree. Fails on the first syntax error.
pub fn parse_tree(text: &str) -> Result<Node> {
    let mut parser = Parser::new(text);
    parser.skip_trivia()?;
    let root = parser.parse_value(0)?;
    parser.skip_trivia()?;
    if parser.pos < parser.bytes.len() {
        return Err(SignalSetError::parse(
            parser.pos,
            "unexpected content after the root value",
        ));
    }
    Ok(root)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') => match self.bytes.get(self.pos + 1) {
                    Some(b'/') => {
                        while let Some(b) = self.peek() {
                            if b == b'\n' {
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                    Some(b'*') => {
                        let start = self.pos;
                        self.pos += 2;
                        loop {
                            match self.peek() {
                                None => {
                                    return Err(SignalSetError::parse(
                                        start,
                                        "unterminated block comment",
                                    ));
                                }
                                Some(b'*') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                                    self.pos += 2;
                                    break;
                                }
                                Some(_) => self.pos += 1,
                            }
                        }
                    }
                    _ => return Ok(()),
                },
                // BOM at the very start of a file
                Some(0xEF) if self.pos == 0 && self.src.starts_with('\u{feff}') => {
                    self.pos += '\u{feff}'.len_utf8();
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{}'", byte as char)))
        }
    }

    fn unexpected(&self, what: &str) -> SignalSetError {
        match self.src.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(ch) => SignalSetError::parse(self.pos, format!("{what}, found '{ch}'")),
            None => SignalSetError::parse(self.pos, format!("{what}, found end of input")),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Node> {
        if depth > MAX_DEPTH {
            return Err(SignalSetError::parse(self.pos, "nesting too deep"));
        }
        match self.peek() {
            Some(b'{') => self.parse_object(depth),
            Some(b'[') => self.parse_array(depth),
            Some(b'"') => self.parse_string(),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b't') => self.parse_literal("true", NodeKind::Boolean, Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", NodeKind::Boolean, Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", NodeKind::Null, Value::Null),
            _ => Err(self.unexpected("expected a value")),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Node> {
        let start = self.pos;
        self.expect(b'{')?;
        let mut props = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                break;
            }
            if self.peek() != Some(b'"') {
                return Err(self.unexpected("expected a property name"));
            }
            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect(b':')?;
            self.skip_trivia()?;
            let value = self.parse_value(depth + 1)?;
            props.push(Node {
                kind: NodeKind::Property,
                offset: key.offset,
                length: value.end() - key.offset,
                value: Value::Null,
                children: vec![key, value],
            });
            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("expected ',' or '}'")),
            }
        }
        Ok(Node {
            kind: NodeKind::Object,
            offset: start,
            length: self.pos - start,
            value: Value::Null,
            children: props,
        })
    }

    fn parse_array(&mut self, depth: usize) -> Result<Node> {
        let start = self.pos;
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b']') {
                self.pos += 1;
                break;
            }
            items.push(self.parse_value(depth + 1)?);
            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("expected ',' or ']'")),
            }
        }
        Ok(Node {
            kind: NodeKind::Array,
            offset: start,
            length: self.pos - start,
            value: Value::Null,
            children: items,
        })
    }

    fn parse_string(&mut self) -> Result<Node> {
        let start = self.pos;
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let rest = self
                .src
                .get(self.pos..)
                .ok_or_else(|| SignalSetError::parse(self.pos, "invalid UTF-8 boundary"))?;
            let Some(ch) = rest.chars().next() else {
                return Err(SignalSetError::parse(start, "unterminated string"));
            };
            match ch {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\\' => {
                    self.pos += 1;
                    out.push(self.parse_escape()?);
                }
                '\n' | '\r' => {
                    return Err(SignalSetError::parse(self.pos, "newline inside string"));
                }
                _ => {
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        Ok(Node::leaf(
            NodeKind::String,
            start,
            self.pos - start,
            Value::String(out),
        ))
    }

    fn parse_escape(&mut self) -> Result<char> {
        let Some(byte) = self.peek() else {
            return Err(SignalSetError::parse(self.pos, "unterminated escape"));
        };
        self.pos += 1;
        let ch = match byte {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let high = self.parse_hex4()?;
                if (0xD800..0xDC00).contains(&high) {
                    if self.bytes.get(self.pos) == Some(&b'\\')
                        && self.bytes.get(self.pos + 1) == Some(&b'u')
                    {
                        self.pos += 2;
                        let low = self.parse_hex4()?;
                        let combined =
                            0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                        char::from_u32(combined).unwrap_or('\u{fffd}')
                    } else {
                        '\u{fffd}'
                    }
                } else {
                    char::from_u32(high).unwrap_or('\u{fffd}')
                }
            }
            _ => {
                return Err(SignalSetError::parse(
                    self.pos - 1,
                    format!("invalid escape '\\{}'", byte as char),
                ));
            }
        };
        Ok(ch)
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let digits = self
            .src
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| SignalSetError::parse(self.pos, "truncated unicode escape"))?;
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| SignalSetError::parse(self.pos, "invalid unicode escape"))?;
        self.pos += 4;
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<Node> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw = &self.src[start..self.pos];
        let value: Value = serde_json::from_str(raw)
            .map_err(|_| SignalSetError::parse(start, format!("invalid number '{raw}'")))?;
        if !value.is_number() {
            return Err(SignalSetError::parse(start, format!("invalid number '{raw}'")));
        }
        Ok(Node::leaf(NodeKind::Number, start, self.pos - start, value))
    }

    fn parse_literal(&mut self, word: &str, kind: NodeKind, value: Value) -> Result<Node> {
        let start = self.pos;
        if self.src[start..].starts_with(word) {
            self.pos += word.len();
            Ok(Node::leaf(kind, start, word.len(), value))
        } else {
            Err(self.unexpected(&format!("expected '{word}'")))
        }
    }
}
