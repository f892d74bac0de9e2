//! The path trie routes are stored in.
//!
//! Every node stands for one path segment. A node's children are split in
//! three disjoint groups: literal children keyed by their segment, at most one
//! named wildcard child (`:name`, exactly one non-empty segment) and at most
//! one catch-all child (`*name`, everything that is left of the path).
//!
//! Searching tries the groups in that order at every node, and backtracks
//! into the next group when a branch dead-ends or has no handler for the
//! method. So `/a/b` wins over `/a/:x` for the path `/a/b`, whatever the
//! registration order was.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write;

use percent_encoding::percent_decode_str;

use crate::error::RouteError;
use crate::method::Method;

/// Behavior switches of a [`PathTrie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieOptions {
    /// A `GET` registration also answers `HEAD`, until an explicit `HEAD` replaces it.
    pub head_can_use_get: bool,
    /// A catch-all matches an empty remainder, so `/files/*rest` matches `/files/`.
    pub catch_all_matches_empty: bool,
}

impl Default for TrieOptions {
    fn default() -> Self {
        Self { head_can_use_get: true, catch_all_matches_empty: false }
    }
}

#[derive(Debug)]
pub struct PathTrie<T> {
    root: Node<T>,
    options: TrieOptions,
}

#[derive(Debug)]
struct Node<T> {
    /// The segment as written in the pattern: `users`, `:id` or `*rest`
    segment: String,
    literals: BTreeMap<String, Node<T>>,
    wildcard: Option<Box<Node<T>>>,
    catch_all: Option<Box<Node<T>>>,
    handlers: BTreeMap<Method, T>,
    implicit_head: bool,
    /// Wildcard and catch-all names from the root down to this node
    wildcard_names: Vec<String>,
    add_slash: bool,
    is_catch_all: bool,
}

/// The outcome of a successful [`PathTrie::search`].
///
/// A match without a handler means the path is known but the method is not.
#[derive(Debug)]
pub struct TrieMatch<'t, T> {
    handler: Option<&'t T>,
    params: BTreeMap<String, String>,
    methods: Vec<Method>,
    add_slash: bool,
    is_catch_all: bool,
}

enum Segment<'p> {
    Literal(&'p str),
    Wildcard(&'p str),
    CatchAll(&'p str),
}

impl<T: Clone> PathTrie<T> {
    pub fn new(options: TrieOptions) -> Self {
        Self { root: Node::new(""), options }
    }

    pub fn options(&self) -> TrieOptions {
        self.options
    }

    /// Binds `handler` to `method` at `pattern`.
    ///
    /// # Errors
    ///
    /// - `InvalidPattern` when the pattern doesn't start with `/`, has an empty
    ///   segment or name, or a catch-all that is not the last segment
    /// - `PatternConflict` when a different wildcard name is already bound at
    ///   the same position, or the same route exists with a different trailing slash
    /// - `DuplicateRoute` when the method is already bound at that pattern
    pub fn insert(&mut self, method: Method, pattern: &str, handler: T) -> Result<(), RouteError> {
        let (segments, add_slash) = parse_pattern(pattern)?;

        let mut names = Vec::new();
        let mut node = &mut self.root;
        for segment in segments {
            node = match segment {
                Segment::Literal(literal) => node.literals.entry(literal.to_owned()).or_insert_with(|| Node::new(literal)),
                Segment::Wildcard(name) => {
                    names.push(name.to_owned());
                    param_child(&mut node.wildcard, format!(":{name}"), pattern)?
                }
                Segment::CatchAll(name) => {
                    names.push(name.to_owned());
                    param_child(&mut node.catch_all, format!("*{name}"), pattern)?
                }
            };
        }

        if !node.handlers.is_empty() && node.add_slash != add_slash {
            let existing = if node.add_slash { "the same route with a trailing slash" } else { "the same route without a trailing slash" };
            return Err(RouteError::pattern_conflict(pattern, existing));
        }
        node.add_slash = add_slash;
        node.wildcard_names = names;

        match node.handlers.get(&method) {
            Some(_) if method == Method::Head && node.implicit_head => node.implicit_head = false,
            Some(_) => return Err(RouteError::duplicate_route(method, pattern)),
            None => {}
        }

        if method == Method::Get && self.options.head_can_use_get && !node.handlers.contains_key(&Method::Head) {
            node.handlers.insert(Method::Head, handler.clone());
            node.implicit_head = true;
        }
        node.handlers.insert(method, handler);
        Ok(())
    }
}

impl<T> PathTrie<T> {
    /// Finds the node matching `path`, preferring one that has a handler for `method`.
    ///
    /// `path` is the raw request path, starting with `/`. Captured values are
    /// percent-decoded; a value that doesn't decode to UTF-8 is kept as is.
    pub fn search(&self, method: Method, path: &str) -> Option<TrieMatch<'_, T>> {
        let rest = path.strip_prefix('/')?;
        let rest = if rest.is_empty() { None } else { Some(rest) };

        let found = self.root.search(method, rest, self.options)?;
        let node = found.node;

        // values were collected deepest first
        let params = node.wildcard_names.iter().rev().cloned().zip(found.values).collect();

        Some(TrieMatch {
            handler: node.handlers.get(&method),
            params,
            methods: node.handlers.keys().copied().collect(),
            add_slash: node.add_slash,
            is_catch_all: node.is_catch_all,
        })
    }

    /// Renders the tree, one node per line, for diagnostics.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.root.dump(&mut out, 0);
        out
    }
}

impl<T> Node<T> {
    fn new(segment: impl Into<String>) -> Self {
        let segment = segment.into();
        let is_catch_all = segment.starts_with('*');
        Self {
            segment,
            literals: BTreeMap::new(),
            wildcard: None,
            catch_all: None,
            handlers: BTreeMap::new(),
            implicit_head: false,
            wildcard_names: Vec::new(),
            add_slash: false,
            is_catch_all,
        }
    }

    /// `rest` is what follows the `/` after this node's segment: `None` when
    /// the path ends right at this node, `Some("")` when it ends with a slash.
    fn search(&self, method: Method, rest: Option<&str>, options: TrieOptions) -> Option<Found<'_, T>> {
        let mut fallback = None;

        match rest {
            None => {
                if !self.handlers.is_empty()
                    && let Some(found) = settle(Found::at(self), method, &mut fallback)
                {
                    return Some(found);
                }
            }
            Some("") => {
                if self.add_slash
                    && !self.handlers.is_empty()
                    && let Some(found) = settle(Found::at(self), method, &mut fallback)
                {
                    return Some(found);
                }
            }
            Some(path) => {
                let (segment, next) = match path.split_once('/') {
                    Some((segment, next)) => (segment, Some(next)),
                    None => (path, None),
                };

                if let Some(found) = self.literals.get(segment).and_then(|child| child.search(method, next, options))
                    && let Some(found) = settle(found, method, &mut fallback)
                {
                    return Some(found);
                }

                if !segment.is_empty()
                    && let Some(mut found) = self.wildcard.as_ref().and_then(|child| child.search(method, next, options))
                {
                    found.values.push(decode(segment));
                    if let Some(found) = settle(found, method, &mut fallback) {
                        return Some(found);
                    }
                }
            }
        }

        if let Some(child) = &self.catch_all
            && let Some(remainder) = rest
            && !child.handlers.is_empty()
            && (!remainder.is_empty() || options.catch_all_matches_empty)
        {
            let found = Found { node: child, values: vec![decode(remainder)] };
            if let Some(found) = settle(found, method, &mut fallback) {
                return Some(found);
            }
        }

        fallback
    }

    fn dump(&self, out: &mut String, depth: usize) {
        let segment = if depth == 0 { "/" } else { &self.segment };
        let slash = if self.add_slash { "/" } else { "" };
        let _ = write!(out, "{:indent$}{segment}{slash}", "", indent = depth * 2);
        if !self.handlers.is_empty() {
            let methods: Vec<_> = self.handlers.keys().map(|method| method.as_str()).collect();
            let _ = write!(out, " [{}]", methods.join(", "));
        }
        out.push('\n');

        for child in self.literals.values() {
            child.dump(out, depth + 1);
        }
        for child in self.wildcard.iter().chain(self.catch_all.iter()) {
            child.dump(out, depth + 1);
        }
    }
}

struct Found<'t, T> {
    node: &'t Node<T>,
    values: Vec<String>,
}

impl<'t, T> Found<'t, T> {
    fn at(node: &'t Node<T>) -> Self {
        Self { node, values: Vec::new() }
    }
}

/// Returns the match when it has a handler for `method`; otherwise keeps it
/// as the fallback if it is the first node found.
fn settle<'t, T>(found: Found<'t, T>, method: Method, fallback: &mut Option<Found<'t, T>>) -> Option<Found<'t, T>> {
    if found.node.handlers.contains_key(&method) {
        return Some(found);
    }
    if fallback.is_none() {
        *fallback = Some(found);
    }
    None
}

fn param_child<'n, T>(slot: &'n mut Option<Box<Node<T>>>, segment: String, pattern: &str) -> Result<&'n mut Node<T>, RouteError> {
    let child = slot.get_or_insert_with(|| Box::new(Node::new(segment.clone())));
    if child.segment != segment {
        return Err(RouteError::pattern_conflict(pattern, &child.segment));
    }
    Ok(&mut **child)
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8().map_or_else(|_| value.to_owned(), Cow::into_owned)
}

fn parse_pattern(pattern: &str) -> Result<(Vec<Segment<'_>>, bool), RouteError> {
    let Some(rest) = pattern.strip_prefix('/') else {
        return Err(RouteError::invalid_pattern(pattern, "pattern must start with '/'"));
    };
    if rest.is_empty() {
        return Ok((Vec::new(), false));
    }

    let (rest, add_slash) = match rest.strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (rest, false),
    };

    let mut segments = Vec::new();
    let mut parts = rest.split('/').peekable();
    while let Some(part) = parts.next() {
        let segment = if let Some(name) = part.strip_prefix(':') {
            Segment::Wildcard(name)
        } else if let Some(name) = part.strip_prefix('*') {
            if parts.peek().is_some() || add_slash {
                return Err(RouteError::invalid_pattern(pattern, "catch-all must be the last segment"));
            }
            Segment::CatchAll(name)
        } else {
            Segment::Literal(part)
        };

        match segment {
            Segment::Literal("") => return Err(RouteError::invalid_pattern(pattern, "empty path segment")),
            Segment::Wildcard("") | Segment::CatchAll("") => {
                return Err(RouteError::invalid_pattern(pattern, "wildcard name must not be empty"));
            }
            segment => segments.push(segment),
        }
    }
    Ok((segments, add_slash))
}

impl<'t, T> TrieMatch<'t, T> {
    /// The handler bound to the searched method, if any.
    pub fn handler(&self) -> Option<&'t T> {
        self.handler
    }

    /// Captured values keyed by wildcard name.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }

    /// Every method registered at the matched node, sorted.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn add_slash(&self) -> bool {
        self.add_slash
    }

    pub fn is_catch_all(&self) -> bool {
        self.is_catch_all
    }
}
