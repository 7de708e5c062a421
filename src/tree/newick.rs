//! Newick serialization for rooted trees.
//!
//! The reader accepts the common dialect: nested parentheses, optional
//! labels on tips and internal nodes, optional `:length` suffixes,
//! single-quoted labels with `''` escapes, and bracketed comments. It is
//! written as an explicit-stack scanner, so deeply nested inputs do not
//! recurse. Labels are kept literally; underscores are not rewritten.

use crate::error::{Result, UniFracError};
use crate::source::Source;
use crate::tree::Tree;
use std::fs;
use std::path::Path;

/// Parse a single Newick tree from a string.
///
/// Branch lengths are optional and default to `0.0`; negative lengths are
/// rejected. Exactly one tree terminated by `;` is expected.
pub fn parse_newick(input: &str) -> Result<Tree> {
    Parser::new(input).parse()
}

/// Read and parse a Newick tree from a file.
pub fn read_newick_file<P: AsRef<Path>>(path: P) -> Result<Tree> {
    let text = fs::read_to_string(path)?;
    parse_newick(&text)
}

impl Tree {
    /// Resolve a tagged input into a tree, parsing Newick from a path.
    pub fn from_source(source: Source<Tree>) -> Result<Tree> {
        source.resolve_with("tree", |path| read_newick_file(path))
    }
}

/// Serialize a tree to Newick, ending with `;`.
///
/// Branch lengths are written for every non-root node; the root's length
/// is written only when nonzero. Labels containing structural characters
/// are single-quoted.
pub fn write_newick(tree: &Tree) -> String {
    let mut out = String::new();
    if tree.is_empty() {
        out.push(';');
        return out;
    }
    enum Step {
        Enter(usize),
        Exit(usize),
        Comma,
    }
    let root = tree.root();
    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Comma => out.push(','),
            Step::Exit(node) => {
                out.push(')');
                write_label(&mut out, tree, node, node != root);
            }
            Step::Enter(node) if tree.is_leaf(node) => {
                write_label(&mut out, tree, node, node != root);
            }
            Step::Enter(node) => {
                out.push('(');
                stack.push(Step::Exit(node));
                for (i, &child) in tree.children(node).iter().enumerate().rev() {
                    stack.push(Step::Enter(child));
                    if i > 0 {
                        stack.push(Step::Comma);
                    }
                }
            }
        }
    }
    out.push(';');
    out
}

fn write_label(out: &mut String, tree: &Tree, node: usize, always_length: bool) {
    if let Some(name) = tree.name(node) {
        if name.is_empty() || name.contains(needs_quoting) {
            out.push('\'');
            for ch in name.chars() {
                if ch == '\'' {
                    out.push('\'');
                }
                out.push(ch);
            }
            out.push('\'');
        } else {
            out.push_str(name);
        }
    }
    let length = tree.length(node);
    if always_length || length != 0.0 {
        out.push(':');
        out.push_str(&format!("{length}"));
    }
}

fn needs_quoting(ch: char) -> bool {
    matches!(ch, '(' | ')' | ',' | ':' | ';' | '[' | ']' | '\'') || ch.is_whitespace()
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn error<T>(&self, msg: impl Into<String>) -> Result<T> {
        Err(UniFracError::NewickParse {
            pos: self.pos,
            msg: msg.into(),
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skip whitespace and `[...]` comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'[') => {
                    let start = self.pos;
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b']' {
                            break;
                        }
                    }
                    if self.bytes.get(self.pos - 1) != Some(&b']') {
                        self.pos = start;
                        return self.error("unterminated comment");
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_label(&mut self) -> Result<Option<String>> {
        if self.peek() == Some(b'\'') {
            self.pos += 1;
            let mut label = String::new();
            loop {
                match self.peek() {
                    Some(b'\'') if self.bytes.get(self.pos + 1) == Some(&b'\'') => {
                        label.push('\'');
                        self.pos += 2;
                    }
                    Some(b'\'') => {
                        self.pos += 1;
                        return Ok(Some(label));
                    }
                    Some(_) => {
                        // Advance one char, not one byte.
                        let rest = &self.input[self.pos..];
                        let ch = rest.chars().next().ok_or(UniFracError::NewickParse {
                            pos: self.pos,
                            msg: "invalid UTF-8 boundary".to_string(),
                        })?;
                        label.push(ch);
                        self.pos += ch.len_utf8();
                    }
                    None => return self.error("unterminated quoted label"),
                }
            }
        }
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[' | b']')
                || b.is_ascii_whitespace()
            {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            Ok(None)
        } else {
            Ok(Some(self.input[start..self.pos].to_string()))
        }
    }

    fn read_length(&mut self) -> Result<f64> {
        self.skip_trivia()?;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        if text.is_empty() {
            return self.error("expected branch length after ':'");
        }
        let length: f64 = match text.parse() {
            Ok(v) => v,
            Err(_) => return self.error(format!("invalid branch length '{text}'")),
        };
        if length < 0.0 {
            return self.error(format!("negative branch length '{text}'"));
        }
        Ok(length)
    }

    /// Optional `label` and `:length` after a node.
    fn read_annotation(&mut self) -> Result<(Option<String>, f64)> {
        self.skip_trivia()?;
        let name = self.read_label()?;
        self.skip_trivia()?;
        let length = if self.peek() == Some(b':') {
            self.pos += 1;
            self.read_length()?
        } else {
            0.0
        };
        Ok((name, length))
    }

    fn parse(mut self) -> Result<Tree> {
        let mut tree = Tree::new();
        // Arena ids of internal nodes whose children are still open.
        let mut open: Vec<usize> = Vec::new();
        // True when a completed node (leaf or closed group) immediately
        // precedes the cursor, so a bare ',' or ')' does not imply an
        // anonymous leaf.
        let mut have_node = false;
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'(') => {
                    if have_node {
                        return self.error("unexpected '(' after a node");
                    }
                    self.pos += 1;
                    let id = tree.add_node(None, 0.0, open.last().copied());
                    open.push(id);
                }
                Some(b',') => {
                    let parent = match open.last().copied() {
                        Some(parent) => parent,
                        None => return self.error("',' outside parentheses"),
                    };
                    if !have_node {
                        tree.add_node(None, 0.0, Some(parent));
                    }
                    self.pos += 1;
                    have_node = false;
                }
                Some(b')') => {
                    let id = match open.pop() {
                        Some(id) => id,
                        None => return self.error("unmatched ')'"),
                    };
                    if !have_node {
                        tree.add_node(None, 0.0, Some(id));
                    }
                    self.pos += 1;
                    let (name, length) = self.read_annotation()?;
                    tree.set_name(id, name);
                    tree.set_length(id, length);
                    have_node = true;
                }
                Some(b';') => {
                    self.pos += 1;
                    if !open.is_empty() {
                        return self.error(format!("{} unclosed '('", open.len()));
                    }
                    if tree.is_empty() {
                        return self.error("empty tree");
                    }
                    self.skip_trivia()?;
                    if self.pos != self.bytes.len() {
                        return self.error("trailing characters after ';'");
                    }
                    return Ok(tree);
                }
                Some(_) => {
                    if have_node {
                        return self.error("expected ',', ')', or ';'");
                    }
                    let (name, length) = self.read_annotation()?;
                    tree.add_node(name, length, open.last().copied());
                    have_node = true;
                }
                None => {
                    if open.is_empty() {
                        return self.error("expected ';'");
                    }
                    return self.error(format!("unexpected end of input: {} unclosed '('", open.len()));
                }
            }
        }
    }
}
