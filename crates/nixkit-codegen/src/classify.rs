//! Value classification
//!
//! Decides which emission rule applies to each value and guards the walk:
//! every reference-counted node entered is recorded by identity until it is
//! left again, so a value that contains itself is reported instead of being
//! expanded forever. Sub-graphs shared between siblings are fine; only a
//! node reached again from inside itself is a cycle.

use std::fmt;

use nixkit_core::{AttrSet, DeferredCall, LocalFile, RecipeValue, Wrapper};

use crate::error::{Error, Result};
use crate::syntax;

/// Emission rule for a single value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule<'a> {
    /// `null`
    Null,
    /// Boolean keyword
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Finite float literal
    Float(f64),
    /// String literal
    String(&'a str),
    /// List
    List(&'a [RecipeValue]),
    /// Attribute set, optionally `rec`
    Attrs {
        /// Bindings
        attrs: &'a AttrSet,
        /// Emit as `rec { ... }`
        recursive: bool,
    },
    /// Verbatim expression text
    Raw(&'a str),
    /// Valid URI literal
    Url(&'a str),
    /// File to resolve against its module
    File(&'a LocalFile),
    /// `import` of the inner value
    Import(&'a RecipeValue),
    /// Function application
    Call(&'a DeferredCall),
}

/// One step from the root to a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Attribute name
    Key(String),
    /// List position
    Index(usize),
    /// Function of an application
    Function,
    /// Argument of an application
    Argument,
    /// Operand of an import
    Import,
}

/// Position of a value, from the exported root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuePath(Vec<Segment>);

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<root>")?;
        for segment in &self.0 {
            match segment {
                Segment::Key(key) => write!(f, ".{}", syntax::attr_name(key))?,
                Segment::Index(i) => write!(f, "[{}]", i)?,
                Segment::Function => f.write_str(".<function>")?,
                Segment::Argument => f.write_str(".<argument>")?,
                Segment::Import => f.write_str(".<import>")?,
            }
        }
        Ok(())
    }
}

/// A classified value that has been entered; hand it back to
/// [`Classifier::leave`] once its children are done
#[derive(Debug)]
pub struct Entered<'a> {
    /// Rule to emit the value with
    pub rule: Rule<'a>,
    marks: usize,
}

/// Walk state: the current path and the identities of the nodes being expanded
#[derive(Debug, Default)]
pub struct Classifier {
    path: ValuePath,
    active: Vec<usize>,
}

impl Classifier {
    /// Fresh walk starting at the root
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `value` and mark it active
    pub fn enter<'a>(&mut self, value: &'a RecipeValue) -> Result<Entered<'a>> {
        let mut marks = 0;
        let mut current = value;

        let rule = loop {
            if let Some(id) = current.identity() {
                if self.active.contains(&id) {
                    self.active.truncate(self.active.len() - marks);
                    return Err(self.error(format!(
                        "cycle detected: {} contains itself",
                        current.kind()
                    )));
                }
                self.active.push(id);
                marks += 1;
            }

            match self.rule(current) {
                Ok(Some(rule)) => break rule,
                Ok(None) => {
                    // Shared slot: follow it to the bound value.
                    if let RecipeValue::Shared(slot) = current {
                        if let Some(bound) = slot.get() {
                            current = bound;
                            continue;
                        }
                    }
                    self.active.truncate(self.active.len() - marks);
                    return Err(self.error("reference is used before it is bound"));
                }
                Err(e) => {
                    self.active.truncate(self.active.len() - marks);
                    return Err(e);
                }
            }
        };

        Ok(Entered { rule, marks })
    }

    /// Leave a value entered with [`enter`](Self::enter)
    pub fn leave(&mut self, entered: Entered<'_>) {
        self.active.truncate(self.active.len() - entered.marks);
    }

    /// Descend into a child position
    pub fn push(&mut self, segment: Segment) {
        self.path.0.push(segment);
    }

    /// Return from a child position
    pub fn pop(&mut self) {
        self.path.0.pop();
    }

    /// Current position
    pub fn path(&self) -> &ValuePath {
        &self.path
    }

    /// A `ValueKind` error at the current position
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::ValueKind {
            path: self.path.to_string(),
            message: message.into(),
        }
    }

    /// `None` means "follow the shared slot"
    fn rule<'a>(&self, value: &'a RecipeValue) -> Result<Option<Rule<'a>>> {
        let rule = match value {
            RecipeValue::Null => Rule::Null,
            RecipeValue::Bool(b) => Rule::Bool(*b),
            RecipeValue::Int(n) => Rule::Int(*n),
            RecipeValue::Float(n) if n.is_finite() => Rule::Float(*n),
            RecipeValue::Float(n) => {
                return Err(self.error(format!("{} has no numeric literal", n)));
            }
            RecipeValue::String(s) => Rule::String(s),
            RecipeValue::List(items) => Rule::List(items),
            RecipeValue::Attrs(attrs) => Rule::Attrs {
                attrs,
                recursive: false,
            },
            RecipeValue::Wrapper(wrapper) => match &**wrapper {
                Wrapper::Raw(text) => Rule::Raw(text),
                Wrapper::Url(url) if syntax::is_uri(url) => Rule::Url(url),
                Wrapper::Url(url) => {
                    return Err(self.error(format!("'{}' is not a valid URL literal", url)));
                }
                Wrapper::File(file) => Rule::File(file),
                Wrapper::Import(inner) => Rule::Import(inner),
                Wrapper::Recursive(attrs) => Rule::Attrs {
                    attrs,
                    recursive: true,
                },
            },
            RecipeValue::Call(call) => Rule::Call(call),
            RecipeValue::Shared(_) => return Ok(None),
        };
        Ok(Some(rule))
    }
}

/// Check a whole graph without emitting it
pub fn validate(value: &RecipeValue) -> Result<()> {
    fn walk(classifier: &mut Classifier, value: &RecipeValue) -> Result<()> {
        let entered = classifier.enter(value)?;

        match entered.rule {
            Rule::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    child(classifier, Segment::Index(i), item)?;
                }
            }
            Rule::Attrs { attrs, .. } => {
                for (key, item) in attrs.iter() {
                    child(classifier, Segment::Key(key.to_string()), item)?;
                }
            }
            Rule::Import(inner) => child(classifier, Segment::Import, inner)?,
            Rule::Call(call) => {
                child(classifier, Segment::Function, &call.function)?;
                child(classifier, Segment::Argument, &call.argument)?;
            }
            _ => {}
        }

        classifier.leave(entered);
        Ok(())
    }

    fn child(classifier: &mut Classifier, segment: Segment, value: &RecipeValue) -> Result<()> {
        classifier.push(segment);
        let result = walk(classifier, value);
        classifier.pop();
        result
    }

    walk(&mut Classifier::new(), value)
}
