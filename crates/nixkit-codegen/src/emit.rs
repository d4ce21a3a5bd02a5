//! Nix expression emitter
//!
//! Renders a recipe value graph as Nix source. Emission is a pure function
//! of the value, the style and the resolver's base directory.

use nixkit_core::{AttrSet, RecipeValue};

use crate::classify::{Classifier, Rule, Segment};
use crate::error::{Error, Result};
use crate::resolver::ModuleResolver;
use crate::syntax;

/// Output layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Style {
    /// Single spaces between tokens
    #[default]
    Compact,
    /// One binding or element per line, two spaces per nesting level
    Pretty,
}

impl Style {
    /// `Pretty` when `pretty` is set
    pub fn from_pretty(pretty: bool) -> Self {
        if pretty { Style::Pretty } else { Style::Compact }
    }
}

/// Where a sub-expression appears; decides whether it needs parentheses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Binding value or top level
    Free,
    /// List element, function, argument or import operand
    Operand,
}

/// Renders recipe values
#[derive(Debug, Clone)]
pub struct Emitter<'r> {
    resolver: &'r ModuleResolver,
    style: Style,
}

impl<'r> Emitter<'r> {
    /// Emitter resolving files with `resolver`
    pub fn new(resolver: &'r ModuleResolver, style: Style) -> Self {
        Self { resolver, style }
    }

    /// Render `value` as a top-level expression
    pub fn emit(&self, value: &RecipeValue) -> Result<String> {
        self.emit_at(value, 0)
    }

    /// Render `value` as if it started `depth` levels deep (pretty style
    /// indents continuation lines accordingly)
    pub fn emit_at(&self, value: &RecipeValue, depth: usize) -> Result<String> {
        let mut writer = Writer {
            resolver: self.resolver,
            style: self.style,
            classifier: Classifier::new(),
            out: String::new(),
        };
        writer.value(value, Position::Free, depth)?;
        Ok(writer.out)
    }
}

struct Writer<'r> {
    resolver: &'r ModuleResolver,
    style: Style,
    classifier: Classifier,
    out: String,
}

impl Writer<'_> {
    fn value(&mut self, value: &RecipeValue, position: Position, depth: usize) -> Result<()> {
        let entered = self.classifier.enter(value)?;
        self.rule(entered.rule, position, depth)?;
        self.classifier.leave(entered);
        Ok(())
    }

    fn child(
        &mut self,
        segment: Segment,
        value: &RecipeValue,
        position: Position,
        depth: usize,
    ) -> Result<()> {
        self.classifier.push(segment);
        self.value(value, position, depth)?;
        self.classifier.pop();
        Ok(())
    }

    fn rule(&mut self, rule: Rule<'_>, position: Position, depth: usize) -> Result<()> {
        match rule {
            Rule::Null => self.out.push_str("null"),
            Rule::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
            Rule::Int(n) => self.number(syntax::int_literal(n), n < 0, position),
            Rule::Float(n) => self.number(syntax::float_literal(n), n.is_sign_negative(), position),
            Rule::String(s) => self.out.push_str(&syntax::string_literal(s)),
            Rule::Raw(text) => self.out.push_str(text),
            Rule::Url(url) => self.out.push_str(url),
            Rule::File(file) => {
                let path = self.resolver.resolve(file).map_err(|message| Error::Resolution {
                    file: file.value.clone(),
                    path: self.classifier.path().to_string(),
                    message,
                })?;
                let literal = syntax::path_literal(&path).ok_or_else(|| Error::Resolution {
                    file: file.value.clone(),
                    path: self.classifier.path().to_string(),
                    message: format!("'{}' is not valid UTF-8", path.display()),
                })?;
                tracing::trace!("Resolved {} to {}", file.value, literal);
                self.out.push_str(&literal);
            }
            Rule::List(items) => self.list(items, depth)?,
            Rule::Attrs { attrs, recursive } => {
                if recursive {
                    self.out.push_str("rec ");
                }
                self.attrs(attrs, depth)?;
            }
            Rule::Import(inner) => {
                self.parenthesized(position, |w| {
                    w.out.push_str("import ");
                    w.child(Segment::Import, inner, Position::Operand, depth)
                })?;
            }
            Rule::Call(call) => {
                self.parenthesized(position, |w| {
                    w.child(Segment::Function, &call.function, Position::Operand, depth)?;
                    w.out.push(' ');
                    w.child(Segment::Argument, &call.argument, Position::Operand, depth)
                })?;
            }
        }
        Ok(())
    }

    fn number(&mut self, literal: String, negative: bool, position: Position) {
        if negative && position == Position::Operand {
            self.out.push('(');
            self.out.push_str(&literal);
            self.out.push(')');
        } else {
            self.out.push_str(&literal);
        }
    }

    fn parenthesized(
        &mut self,
        position: Position,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let wrap = position == Position::Operand;
        if wrap {
            self.out.push('(');
        }
        body(self)?;
        if wrap {
            self.out.push(')');
        }
        Ok(())
    }

    fn list(&mut self, items: &[RecipeValue], depth: usize) -> Result<()> {
        if items.is_empty() {
            self.out.push_str("[]");
            return Ok(());
        }

        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            self.separator(depth + 1);
            self.child(Segment::Index(i), item, Position::Operand, depth + 1)?;
        }
        self.separator(depth);
        self.out.push(']');
        Ok(())
    }

    fn attrs(&mut self, attrs: &AttrSet, depth: usize) -> Result<()> {
        if attrs.is_empty() {
            self.out.push_str("{}");
            return Ok(());
        }

        self.out.push('{');
        for (key, value) in attrs.iter() {
            self.separator(depth + 1);
            self.out.push_str(&syntax::attr_name(key));
            self.out.push_str(" = ");
            self.child(Segment::Key(key.to_string()), value, Position::Free, depth + 1)?;
            self.out.push(';');
        }
        self.separator(depth);
        self.out.push('}');
        Ok(())
    }

    /// Whitespace before an element (or the closing delimiter) at `depth`
    fn separator(&mut self, depth: usize) {
        match self.style {
            Style::Compact => self.out.push(' '),
            Style::Pretty => {
                self.out.push('\n');
                self.out.push_str(&"  ".repeat(depth));
            }
        }
    }
}
