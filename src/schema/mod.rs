//! # Schema Document
//!
//! AST for directive-annotated schema definitions, plus SDL printing.

mod parser;

pub use parser::parse_schema;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Input,
    Interface,
    Enum,
    Union,
    Scalar,
}

impl TypeKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Object => "type",
            Self::Input => "input",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Union => "union",
            Self::Scalar => "scalar",
        }
    }
}

/// A directive argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// JSON view of this value; enum literals become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::String(s) | Self::Enum(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Enum(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<(String, Value)>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Named(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub arguments: Vec<InputValueDefinition>,
    pub ty: TypeRef,
    pub directives: Vec<Directive>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            ty,
            directives: Vec::new(),
        }
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub kind: TypeKind,
    pub name: String,
    pub extends: bool,
    pub implements: Vec<String>,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDefinition>,
    /// Enum values or union members.
    pub members: Vec<String>,
}

impl TypeDefinition {
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Object,
            name: name.into(),
            extends: false,
            implements: Vec::new(),
            directives: Vec::new(),
            fields: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Append a field unless one with the same name already exists.
    pub fn ensure_field(&mut self, field: FieldDefinition) {
        if self.field(&field.name).is_none() {
            self.fields.push(field);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    pub definitions: Vec<TypeDefinition>,
}

impl SchemaDocument {
    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.definitions.iter().find(|t| t.name == name && !t.extends)
    }

    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.definitions.iter_mut().find(|t| t.name == name && !t.extends)
    }

    /// Object types carrying the given directive, in declaration order.
    pub fn types_with_directive<'a>(&'a self, directive: &'a str) -> impl Iterator<Item = &'a TypeDefinition> {
        self.definitions
            .iter()
            .filter(move |t| t.kind == TypeKind::Object && t.has_directive(directive))
    }

    /// `(type, field)` pairs whose field carries the given directive.
    pub fn fields_with_directive<'a>(
        &'a self,
        directive: &'a str,
    ) -> impl Iterator<Item = (&'a TypeDefinition, &'a FieldDefinition)> {
        self.definitions.iter().flat_map(move |t| {
            t.fields
                .iter()
                .filter(move |f| f.has_directive(directive))
                .map(move |f| (t, f))
        })
    }

    /// Return the named object type, creating an empty one if absent.
    pub fn ensure_object_type(&mut self, name: &str) -> &mut TypeDefinition {
        let index = match self.definitions.iter().position(|t| t.name == name && !t.extends) {
            Some(index) => index,
            None => {
                self.definitions.push(TypeDefinition::object(name));
                self.definitions.len() - 1
            }
        };
        &mut self.definitions[index]
    }
}

fn write_directives(f: &mut fmt::Formatter<'_>, directives: &[Directive]) -> fmt::Result {
    for directive in directives {
        write!(f, " @{}", directive.name)?;
        if !directive.arguments.is_empty() {
            f.write_str("(")?;
            for (i, (name, value)) in directive.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", name, value)?;
            }
            f.write_str(")")?;
        }
    }
    Ok(())
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extends {
            f.write_str("extend ")?;
        }
        write!(f, "{} {}", self.kind.keyword(), self.name)?;
        if !self.implements.is_empty() {
            write!(f, " implements {}", self.implements.join(" & "))?;
        }
        write_directives(f, &self.directives)?;

        match self.kind {
            TypeKind::Scalar => Ok(()),
            TypeKind::Union => write!(f, " = {}", self.members.join(" | ")),
            TypeKind::Enum => {
                f.write_str(" {\n")?;
                for member in &self.members {
                    writeln!(f, "  {}", member)?;
                }
                f.write_str("}")
            }
            _ => {
                f.write_str(" {\n")?;
                for field in &self.fields {
                    write!(f, "  {}", field.name)?;
                    if !field.arguments.is_empty() {
                        f.write_str("(")?;
                        for (i, arg) in field.arguments.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}: {}", arg.name, arg.ty)?;
                            if let Some(default) = &arg.default_value {
                                write!(f, " = {}", default)?;
                            }
                        }
                        f.write_str(")")?;
                    }
                    write!(f, ": {}", field.ty)?;
                    write_directives(f, &field.directives)?;
                    f.write_str("\n")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, definition) in self.definitions.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{}", definition)?;
        }
        f.write_str("\n")
    }
}
