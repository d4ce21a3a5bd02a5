//! Recipe values
//!
//! A recipe is a graph of `RecipeValue`s: plain data (null, booleans,
//! numbers, strings, lists, attribute sets) mixed with a handful of special
//! forms the expression language writes differently from a literal.
//!
//! Lists, attribute sets, wrappers and calls are reference counted, so the
//! same sub-graph can be bound under several keys. A value that references
//! itself can only be built through a [`Shared`] slot; the emitter detects
//! such cycles by identity.

use once_cell::sync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The universal recipe value
#[derive(Debug, Clone)]
pub enum RecipeValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    String(String),
    /// Ordered sequence
    List(Arc<Vec<RecipeValue>>),
    /// Keyed mapping (attribute set)
    Attrs(Arc<AttrSet>),
    /// Special form rendered differently from a literal
    Wrapper(Arc<Wrapper>),
    /// Function application preserved for the evaluator
    Call(Arc<DeferredCall>),
    /// Late-bound reference to another value
    Shared(Shared),
}

/// Special forms
#[derive(Debug, Clone, PartialEq)]
pub enum Wrapper {
    /// Expression text passed through verbatim
    Raw(String),
    /// URL literal
    Url(String),
    /// File relative to the module that declared it
    File(LocalFile),
    /// `import <value>`
    Import(RecipeValue),
    /// `rec { ... }`
    Recursive(AttrSet),
}

/// Application of `function` to `argument`
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCall {
    /// Function expression
    pub function: RecipeValue,
    /// Argument expression
    pub argument: RecipeValue,
}

/// A file path relative to the module that declared it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path as written in the recipe, usually relative
    pub value: String,
    /// Declaring module
    pub module: ModuleContext,
}

/// Where a recipe module lives on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContext {
    location: Option<PathBuf>,
}

impl ModuleContext {
    /// Context for a module stored at `location`
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: Some(location.into()),
        }
    }

    /// Context for a module whose location is not known
    pub fn unknown() -> Self {
        Self { location: None }
    }

    /// Location of the module file, if known
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

/// Attribute set that keeps bindings in insertion order
///
/// Equality ignores order: two sets are equal when they bind the same keys
/// to equal values.
#[derive(Debug, Clone, Default)]
pub struct AttrSet {
    entries: Vec<(String, RecipeValue)>,
}

impl AttrSet {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`; an existing binding keeps its position and gets the new value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RecipeValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RecipeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a binding
    pub fn get(&self, key: &str) -> Option<&RecipeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecipeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no bindings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for AttrSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<K: Into<String>, V: Into<RecipeValue>> FromIterator<(K, V)> for AttrSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = AttrSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Write-once slot holding a value bound after construction
///
/// Cloning a `Shared` clones the handle, not the value: every clone refers
/// to the same slot. Equality is identity.
#[derive(Clone, Default)]
pub struct Shared(Arc<OnceCell<RecipeValue>>);

impl Shared {
    /// Create an unbound slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the slot; fails with the rejected value if it is already bound
    pub fn bind(&self, value: impl Into<RecipeValue>) -> std::result::Result<(), RecipeValue> {
        self.0.set(value.into())
    }

    /// The bound value, if any
    pub fn get(&self) -> Option<&RecipeValue> {
        self.0.get()
    }

    /// Identity of the slot
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The slot may (indirectly) contain itself, so never print its contents.
        let state = if self.get().is_some() { "bound" } else { "unbound" };
        write!(f, "Shared(#{:x}, {})", self.id(), state)
    }
}

impl PartialEq for Shared {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl RecipeValue {
    /// String literal
    pub fn string(s: impl Into<String>) -> Self {
        RecipeValue::String(s.into())
    }

    /// List of values
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RecipeValue>,
    {
        RecipeValue::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Attribute set from `(key, value)` pairs
    pub fn attrs<I, K, V>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RecipeValue>,
    {
        RecipeValue::Attrs(Arc::new(bindings.into_iter().collect()))
    }

    /// Raw expression text, emitted unmodified
    pub fn raw(expression: impl Into<String>) -> Self {
        Self::wrap(Wrapper::Raw(expression.into()))
    }

    /// URL literal
    pub fn url(url: impl Into<String>) -> Self {
        Self::wrap(Wrapper::Url(url.into()))
    }

    /// File relative to `module`
    pub fn file(value: impl Into<String>, module: ModuleContext) -> Self {
        Self::wrap(Wrapper::File(LocalFile {
            value: value.into(),
            module,
        }))
    }

    /// `import <path>`
    pub fn import(path: impl Into<RecipeValue>) -> Self {
        Self::wrap(Wrapper::Import(path.into()))
    }

    /// `rec { ... }`
    pub fn recursive(attrs: AttrSet) -> Self {
        Self::wrap(Wrapper::Recursive(attrs))
    }

    /// Application of `function` to `argument`
    pub fn call(function: impl Into<RecipeValue>, argument: impl Into<RecipeValue>) -> Self {
        RecipeValue::Call(Arc::new(DeferredCall {
            function: function.into(),
            argument: argument.into(),
        }))
    }

    fn wrap(wrapper: Wrapper) -> Self {
        RecipeValue::Wrapper(Arc::new(wrapper))
    }

    /// Identity of a reference-counted node; `None` for scalars
    pub fn identity(&self) -> Option<usize> {
        match self {
            RecipeValue::List(items) => Some(Arc::as_ptr(items) as *const () as usize),
            RecipeValue::Attrs(attrs) => Some(Arc::as_ptr(attrs) as *const () as usize),
            RecipeValue::Wrapper(wrapper) => Some(Arc::as_ptr(wrapper) as *const () as usize),
            RecipeValue::Call(call) => Some(Arc::as_ptr(call) as *const () as usize),
            RecipeValue::Shared(slot) => Some(slot.id()),
            _ => None,
        }
    }

    /// Attribute set contents, looking through bound shared slots
    pub fn as_attrs(&self) -> Option<&AttrSet> {
        match self {
            RecipeValue::Attrs(attrs) => Some(attrs),
            RecipeValue::Shared(slot) => slot.get().and_then(RecipeValue::as_attrs),
            _ => None,
        }
    }

    /// Short name of the value's kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RecipeValue::Null => "null",
            RecipeValue::Bool(_) => "boolean",
            RecipeValue::Int(_) => "integer",
            RecipeValue::Float(_) => "float",
            RecipeValue::String(_) => "string",
            RecipeValue::List(_) => "list",
            RecipeValue::Attrs(_) => "attribute set",
            RecipeValue::Wrapper(w) => match **w {
                Wrapper::Raw(_) => "expression",
                Wrapper::Url(_) => "URL",
                Wrapper::File(_) => "file",
                Wrapper::Import(_) => "import",
                Wrapper::Recursive(_) => "recursive attribute set",
            },
            RecipeValue::Call(_) => "function call",
            RecipeValue::Shared(_) => "shared reference",
        }
    }
}

impl PartialEq for RecipeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecipeValue::Null, RecipeValue::Null) => true,
            (RecipeValue::Bool(a), RecipeValue::Bool(b)) => a == b,
            (RecipeValue::Int(a), RecipeValue::Int(b)) => a == b,
            (RecipeValue::Float(a), RecipeValue::Float(b)) => a == b,
            (RecipeValue::String(a), RecipeValue::String(b)) => a == b,
            (RecipeValue::List(a), RecipeValue::List(b)) => Arc::ptr_eq(a, b) || a == b,
            (RecipeValue::Attrs(a), RecipeValue::Attrs(b)) => Arc::ptr_eq(a, b) || a == b,
            (RecipeValue::Wrapper(a), RecipeValue::Wrapper(b)) => Arc::ptr_eq(a, b) || a == b,
            (RecipeValue::Call(a), RecipeValue::Call(b)) => Arc::ptr_eq(a, b) || a == b,
            (RecipeValue::Shared(a), RecipeValue::Shared(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for RecipeValue {
    fn from(b: bool) -> Self {
        RecipeValue::Bool(b)
    }
}

impl From<i64> for RecipeValue {
    fn from(n: i64) -> Self {
        RecipeValue::Int(n)
    }
}

impl From<i32> for RecipeValue {
    fn from(n: i32) -> Self {
        RecipeValue::Int(n.into())
    }
}

impl From<f64> for RecipeValue {
    fn from(n: f64) -> Self {
        RecipeValue::Float(n)
    }
}

impl From<&str> for RecipeValue {
    fn from(s: &str) -> Self {
        RecipeValue::String(s.to_string())
    }
}

impl From<String> for RecipeValue {
    fn from(s: String) -> Self {
        RecipeValue::String(s)
    }
}

impl From<Vec<RecipeValue>> for RecipeValue {
    fn from(items: Vec<RecipeValue>) -> Self {
        RecipeValue::List(Arc::new(items))
    }
}

impl From<AttrSet> for RecipeValue {
    fn from(attrs: AttrSet) -> Self {
        RecipeValue::Attrs(Arc::new(attrs))
    }
}

impl From<Shared> for RecipeValue {
    fn from(slot: Shared) -> Self {
        RecipeValue::Shared(slot)
    }
}

impl<T: Into<RecipeValue>> From<Option<T>> for RecipeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RecipeValue::Null, Into::into)
    }
}
