//! Navigation state threaded through the resolver chain.
//!
//! A [`PathContext`] is a value: [`PathContext::for_path`] returns an
//! advanced copy and never touches the parent, so sibling branches of the
//! recursion cannot observe each other. The path registry is shared behind an
//! `Arc` and never copied; a record field that marks its own sub-path as a
//! collection pushes an entry onto a shared overlay chain instead.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use strata_types::{Value, DEFAULT_DELETE_MARKER};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Path segment that matches exactly one arbitrary segment.
pub const WILDCARD: &str = "$";

/// Name of the root segment unless configured otherwise.
pub const DEFAULT_ROOT_NAME: &str = "root";

/// Per-call switches carried by a context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextFlags {
    /// Capture the whole new value instead of diffing against the old one.
    /// Set for subtrees that did not exist in the old snapshot.
    pub force_full_snapshot: bool,
    /// Silence reindexing warnings.
    pub suppress_warnings: bool,
    /// Fail with `InvalidComparison` when two records of different types are
    /// compared.
    pub enforce_same_type: bool,
}

/// A registered path with wildcard segments.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PathPattern {
    /// `None` marks a wildcard segment.
    segments: Vec<Option<String>>,
}

impl PathPattern {
    fn compile(path: &str) -> Option<Self> {
        let segments: Vec<Option<String>> = path
            .split(PATH_SEPARATOR)
            .map(|s| (s != WILDCARD).then(|| s.to_owned()))
            .collect();
        segments.iter().any(Option::is_none).then_some(Self { segments })
    }

    fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(segments)
                .all(|(pattern, actual)| pattern.as_deref().map_or(true, |p| p == actual))
    }
}

#[derive(Debug, Default)]
struct PathRegistry {
    assoc_paths: HashSet<String>,
    assoc_patterns: Vec<PathPattern>,
    key_fields: HashMap<String, String>,
    key_field_patterns: Vec<(PathPattern, String)>,
}

impl PathRegistry {
    fn register_assoc(&mut self, full_path: &str) {
        match PathPattern::compile(full_path) {
            Some(pattern) => {
                if !self.assoc_patterns.contains(&pattern) {
                    self.assoc_patterns.push(pattern);
                }
            }
            None => {
                self.assoc_paths.insert(full_path.to_owned());
            }
        }
    }

    fn register_key_field(&mut self, full_path: &str, field: &str) {
        self.register_assoc(full_path);
        match PathPattern::compile(full_path) {
            Some(pattern) => self.key_field_patterns.push((pattern, field.to_owned())),
            None => {
                self.key_fields.insert(full_path.to_owned(), field.to_owned());
            }
        }
    }

    fn is_assoc(&self, path: &str) -> bool {
        self.assoc_paths.contains(path) || self.assoc_patterns.iter().any(|p| p.matches(path))
    }

    fn key_field(&self, path: &str) -> Option<&str> {
        self.key_fields.get(path).map(String::as_str).or_else(|| {
            self.key_field_patterns
                .iter()
                .find(|(pattern, _)| pattern.matches(path))
                .map(|(_, field)| field.as_str())
        })
    }
}

fn join(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_owned()
    } else if segment.is_empty() {
        base.to_owned()
    } else {
        format!("{base}{PATH_SEPARATOR}{segment}")
    }
}

/// A path marked as a collection while resolving, on top of the registry.
///
/// Entries form a persistent list: a child context extends its parent's chain
/// without copying it. The chain is as long as the number of collection
/// fields along the current branch.
#[derive(Debug)]
struct Overlay {
    path: String,
    key_field: Option<String>,
    parent: Option<Arc<Overlay>>,
}

impl Overlay {
    fn iter(head: Option<&Arc<Overlay>>) -> impl Iterator<Item = &Overlay> {
        std::iter::successors(head.map(Arc::as_ref), |entry| entry.parent.as_deref())
    }
}

/// Where the resolver currently is in the value graph, and how to treat it.
#[derive(Clone, Debug)]
pub struct PathContext {
    path: String,
    leaf: String,
    delete_marker: Value,
    registry: Arc<PathRegistry>,
    overlay: Option<Arc<Overlay>>,
    flags: ContextFlags,
}

impl Default for PathContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PathContext {
    /// A root context with default settings and no registered paths.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Advance into a child segment.
    pub fn for_path(&self, segment: impl fmt::Display) -> Self {
        let leaf = segment.to_string();
        Self {
            path: join(&self.path, &leaf),
            leaf,
            delete_marker: self.delete_marker.clone(),
            registry: Arc::clone(&self.registry),
            overlay: self.overlay.clone(),
            flags: self.flags,
        }
    }

    /// Dot-joined path from the root to the current position.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last segment of the path.
    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    pub fn delete_marker(&self) -> &Value {
        &self.delete_marker
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub fn force_full_snapshot(&self) -> bool {
        self.flags.force_full_snapshot
    }

    pub fn suppress_warnings(&self) -> bool {
        self.flags.suppress_warnings
    }

    pub fn enforce_same_type(&self) -> bool {
        self.flags.enforce_same_type
    }

    /// Copy of this context with the given flags.
    pub fn with_flags(&self, flags: ContextFlags) -> Self {
        Self {
            flags,
            ..self.clone()
        }
    }

    /// Copy of this context with `force_full_snapshot` switched.
    pub fn with_force_full_snapshot(&self, force: bool) -> Self {
        self.with_flags(ContextFlags {
            force_full_snapshot: force,
            ..self.flags
        })
    }

    /// Whether the collection at the current path is keyed (map semantics).
    ///
    /// Exact registrations are checked first, then wildcard patterns with the
    /// same number of segments.
    pub fn is_current_path_assoc(&self) -> bool {
        self.in_overlay(&self.path) || self.registry.is_assoc(&self.path)
    }

    /// Exact-match lookup of a full path in the associative registry.
    pub fn is_assoc(&self, path: &str) -> bool {
        self.in_overlay(path) || self.registry.assoc_paths.contains(path)
    }

    /// Identity field for items of the collection at the current path.
    pub fn key_field_for_current_path(&self) -> Option<&str> {
        Overlay::iter(self.overlay.as_ref())
            .filter(|entry| entry.path == self.path)
            .find_map(|entry| entry.key_field.as_deref())
            .or_else(|| self.registry.key_field(&self.path))
    }

    /// Copy of this context with the current path registered as associative,
    /// optionally keyed by `key_field`. The receiver is left untouched.
    pub fn as_collection(&self, key_field: Option<&str>) -> Self {
        let entry = Overlay {
            path: self.path.clone(),
            key_field: key_field.map(str::to_owned),
            parent: self.overlay.clone(),
        };
        Self {
            overlay: Some(Arc::new(entry)),
            ..self.clone()
        }
    }

    fn in_overlay(&self, path: &str) -> bool {
        Overlay::iter(self.overlay.as_ref()).any(|entry| entry.path == path)
    }
}

/// Builder for a root [`PathContext`].
///
/// Registered paths are relative to the root; `""` names the root itself and
/// a `$` segment matches any single segment.
#[derive(Clone, Debug)]
pub struct ContextBuilder {
    root_name: String,
    delete_marker: Value,
    assoc_paths: Vec<String>,
    key_fields: Vec<(String, String)>,
    flags: ContextFlags,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_owned(),
            delete_marker: Value::from(DEFAULT_DELETE_MARKER),
            assoc_paths: Vec::new(),
            key_fields: Vec::new(),
            flags: ContextFlags::default(),
        }
    }
}

impl ContextBuilder {
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn delete_marker(mut self, marker: impl Into<Value>) -> Self {
        self.delete_marker = marker.into();
        self
    }

    /// Declare a path (or wildcard pattern) associative.
    pub fn assoc_path(mut self, path: impl Into<String>) -> Self {
        self.assoc_paths.push(path.into());
        self
    }

    pub fn assoc_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assoc_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Declare the identity field for items at `path`. The path becomes
    /// associative as well.
    pub fn key_field(mut self, path: impl Into<String>, field: impl Into<String>) -> Self {
        self.key_fields.push((path.into(), field.into()));
        self
    }

    pub fn suppress_warnings(mut self, suppress: bool) -> Self {
        self.flags.suppress_warnings = suppress;
        self
    }

    pub fn enforce_same_type(mut self, enforce: bool) -> Self {
        self.flags.enforce_same_type = enforce;
        self
    }

    pub fn build(self) -> PathContext {
        let mut registry = PathRegistry::default();
        for path in &self.assoc_paths {
            registry.register_assoc(&join(&self.root_name, path));
        }
        for (path, field) in &self.key_fields {
            registry.register_key_field(&join(&self.root_name, path), field);
        }

        PathContext {
            path: self.root_name.clone(),
            leaf: self.root_name,
            delete_marker: self.delete_marker,
            registry: Arc::new(registry),
            overlay: None,
            flags: self.flags,
        }
    }
}
