//! Type descriptors for the fixturegen framework.
//!
//! This module defines `TypeRef`, the reified description of a type that
//! fixtures are generated for. It stands in for runtime reflection: every
//! structural fact the node builder needs (generic arguments, container
//! element types, named user types) is explicit in the descriptor.
//!
//! # Text Format
//!
//! Descriptors have a compact text form that is used both in YAML files and
//! in selectors:
//!
//! ```text
//! i32                      leaf
//! Vec<String>              ordered sequence
//! Set<Uuid>                sequence of distinct elements
//! [f64]                    array
//! Map<String, Vec<i64>>    key-value mapping
//! Option<Address>          single-value wrapper
//! Pair<String, Item<i32>>  named (catalog) type with generic arguments
//! ? / ? extends Number     wildcard, optionally bounded
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Mapping from generic parameter name to its bound type.
pub type TypeBindings = IndexMap<String, TypeRef>;

/// Error type for descriptor parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    /// Input ended before a complete descriptor was read
    #[error("Unexpected end of type descriptor '{0}'")]
    UnexpectedEnd(String),

    /// An unexpected character was found
    #[error("Unexpected '{found}' at offset {offset} in type descriptor '{input}'")]
    UnexpectedChar {
        input: String,
        found: char,
        offset: usize,
    },

    /// A built-in type was given the wrong number of arguments
    #[error("Type '{name}' expects {expected} type argument(s), got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Leaf value kinds with a built-in generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Uuid,
    /// Calendar date (YYYY-MM-DD)
    Date,
    /// Time of day (HH:MM:SS)
    Time,
    /// UTC timestamp
    DateTime,
}

impl LeafType {
    /// Canonical descriptor name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String",
            Self::Uuid => "Uuid",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::DateTime => "DateTime",
        }
    }

    /// Look up a leaf type by its descriptor name.
    pub fn from_name(name: &str) -> Option<Self> {
        let leaf = match name {
            "bool" => Self::Bool,
            "char" => Self::Char,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "String" => Self::String,
            "Uuid" => Self::Uuid,
            "Date" => Self::Date,
            "Time" => Self::Time,
            "DateTime" => Self::DateTime,
            _ => return None,
        };
        Some(leaf)
    }

    /// Check if this is a signed or unsigned integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
        )
    }

    /// Check if this is a temporal type.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::DateTime)
    }
}

/// Flavour of an ordered, homogeneous sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqKind {
    /// `Vec<T>`
    List,
    /// `Set<T>`, elements are distinct
    Set,
    /// `[T]`
    Array,
}

/// Reified type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Built-in leaf value
    Leaf(LeafType),

    /// Homogeneous sequence
    Seq {
        kind: SeqKind,
        element: Box<TypeRef>,
    },

    /// Key-value mapping
    Map {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },

    /// Built-in single-value wrapper
    Option(Box<TypeRef>),

    /// User type defined in a `TypeCatalog`
    Named { name: String, args: Vec<TypeRef> },

    /// Generic parameter of the enclosing definition
    Param(String),

    /// Wildcard, optionally bounded (`? extends Bound`)
    Wildcard { bound: Option<Box<TypeRef>> },
}

impl TypeRef {
    /// Parse a descriptor from its text form.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let mut parser = Parser::new(input);
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        match parser.peek() {
            None => Ok(ty),
            Some(c) => Err(parser.unexpected(c)),
        }
    }

    /// Create a `Vec<T>` descriptor.
    pub fn list(element: TypeRef) -> Self {
        Self::Seq {
            kind: SeqKind::List,
            element: Box::new(element),
        }
    }

    /// Create a `Set<T>` descriptor.
    pub fn set(element: TypeRef) -> Self {
        Self::Seq {
            kind: SeqKind::Set,
            element: Box::new(element),
        }
    }

    /// Create a `[T]` descriptor.
    pub fn array(element: TypeRef) -> Self {
        Self::Seq {
            kind: SeqKind::Array,
            element: Box::new(element),
        }
    }

    /// Create a `Map<K, V>` descriptor.
    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Create an `Option<T>` descriptor.
    pub fn option(inner: TypeRef) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Create a named type descriptor.
    pub fn named(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    /// The raw (argument-free) name of this type, e.g. `Pair` for `Pair<String, i32>`.
    pub fn raw_name(&self) -> &str {
        match self {
            Self::Leaf(leaf) => leaf.name(),
            Self::Seq {
                kind: SeqKind::List,
                ..
            } => "Vec",
            Self::Seq {
                kind: SeqKind::Set, ..
            } => "Set",
            Self::Seq {
                kind: SeqKind::Array,
                ..
            } => "[]",
            Self::Map { .. } => "Map",
            Self::Option(_) => "Option",
            Self::Named { name, .. } => name,
            Self::Param(name) => name,
            Self::Wildcard { .. } => "?",
        }
    }

    /// Check that no generic parameter or wildcard remains anywhere in this type.
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Leaf(_) => true,
            Self::Seq { element, .. } => element.is_concrete(),
            Self::Map { key, value } => key.is_concrete() && value.is_concrete(),
            Self::Option(inner) => inner.is_concrete(),
            Self::Named { args, .. } => args.iter().all(TypeRef::is_concrete),
            Self::Param(_) | Self::Wildcard { .. } => false,
        }
    }

    /// Rewrite bare references to any of `params` into `Param` nodes.
    ///
    /// The parser cannot tell `T` from a user type called `T`; the enclosing
    /// definition knows which names are its parameters.
    pub fn with_params(self, params: &[String]) -> Self {
        match self {
            Self::Named { name, args } if args.is_empty() && params.contains(&name) => {
                Self::Param(name)
            }
            Self::Named { name, args } => Self::Named {
                name,
                args: args.into_iter().map(|a| a.with_params(params)).collect(),
            },
            Self::Seq { kind, element } => Self::Seq {
                kind,
                element: Box::new(element.with_params(params)),
            },
            Self::Map { key, value } => Self::Map {
                key: Box::new(key.with_params(params)),
                value: Box::new(value.with_params(params)),
            },
            Self::Option(inner) => Self::Option(Box::new(inner.with_params(params))),
            Self::Wildcard { bound } => Self::Wildcard {
                bound: bound.map(|b| Box::new(b.with_params(params))),
            },
            other => other,
        }
    }

    /// Visit the names of all named types referenced by this descriptor.
    pub fn named_types(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_named(&mut names);
        names
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Named { name, args } => {
                out.push(name);
                for arg in args {
                    arg.collect_named(out);
                }
            }
            Self::Seq { element, .. } => element.collect_named(out),
            Self::Map { key, value } => {
                key.collect_named(out);
                value.collect_named(out);
            }
            Self::Option(inner) => inner.collect_named(out),
            Self::Wildcard { bound: Some(b) } => b.collect_named(out),
            _ => {}
        }
    }
}

impl From<LeafType> for TypeRef {
    fn from(leaf: LeafType) -> Self {
        Self::Leaf(leaf)
    }
}

impl FromStr for TypeRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => f.write_str(leaf.name()),
            Self::Seq {
                kind: SeqKind::Array,
                element,
            } => write!(f, "[{element}]"),
            Self::Seq { element, .. } => write!(f, "{}<{element}>", self.raw_name()),
            Self::Map { key, value } => write!(f, "Map<{key}, {value}>"),
            Self::Option(inner) => write!(f, "Option<{inner}>"),
            Self::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Param(name) => f.write_str(name),
            Self::Wildcard { bound: None } => f.write_str("?"),
            Self::Wildcard { bound: Some(b) } => write!(f, "? extends {b}"),
        }
    }
}

// Descriptors serialize as their text form: `type: Map<String, Vec<i32>>`

impl Serialize for TypeRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct TypeRefVisitor;

        impl Visitor<'_> for TypeRefVisitor {
            type Value = TypeRef;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a type descriptor string such as \"Vec<String>\"")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                TypeRef::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TypeRefVisitor)
    }
}

/// Recursive-descent parser over the descriptor text form.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn unexpected(&self, found: char) -> TypeError {
        TypeError::UnexpectedChar {
            input: self.input.to_string(),
            found,
            offset: self.pos,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeError> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => {
                self.pos -= c.len_utf8();
                Err(self.unexpected(c))
            }
            None => Err(TypeError::UnexpectedEnd(self.input.to_string())),
        }
    }

    fn ident(&mut self) -> Result<&'a str, TypeError> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        if self.pos == start {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(TypeError::UnexpectedEnd(self.input.to_string())),
            };
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(TypeError::UnexpectedEnd(self.input.to_string())),
            Some('?') => {
                self.bump();
                self.skip_whitespace();
                if self.input[self.pos..].starts_with("extends") {
                    self.pos += "extends".len();
                    let bound = self.parse_type()?;
                    Ok(TypeRef::Wildcard {
                        bound: Some(Box::new(bound)),
                    })
                } else {
                    Ok(TypeRef::Wildcard { bound: None })
                }
            }
            Some('[') => {
                self.bump();
                let element = self.parse_type()?;
                self.expect(']')?;
                Ok(TypeRef::array(element))
            }
            Some(_) => {
                let name = self.ident()?;
                self.skip_whitespace();
                let args = if self.peek() == Some('<') {
                    self.bump();
                    let mut args = vec![self.parse_type()?];
                    loop {
                        self.skip_whitespace();
                        match self.peek() {
                            Some(',') => {
                                self.bump();
                                args.push(self.parse_type()?);
                            }
                            Some('>') => {
                                self.bump();
                                break;
                            }
                            Some(c) => return Err(self.unexpected(c)),
                            None => return Err(TypeError::UnexpectedEnd(self.input.to_string())),
                        }
                    }
                    args
                } else {
                    Vec::new()
                };
                build_type(name, args)
            }
        }
    }
}

fn build_type(name: &str, mut args: Vec<TypeRef>) -> Result<TypeRef, TypeError> {
    let arity = |expected: usize, args: &Vec<TypeRef>| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(TypeError::Arity {
                name: name.to_string(),
                expected,
                actual: args.len(),
            })
        }
    };

    if let Some(leaf) = LeafType::from_name(name) {
        arity(0, &args)?;
        return Ok(TypeRef::Leaf(leaf));
    }

    match name {
        "Vec" | "Set" | "Option" => {
            arity(1, &args)?;
            let inner = args.remove(0);
            Ok(match name {
                "Vec" => TypeRef::list(inner),
                "Set" => TypeRef::set(inner),
                _ => TypeRef::option(inner),
            })
        }
        "Map" => {
            arity(2, &args)?;
            let value = args.remove(1);
            let key = args.remove(0);
            Ok(TypeRef::map(key, value))
        }
        _ => Ok(TypeRef::named(name, args)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leaf_and_containers() {
        assert_eq!(TypeRef::parse("i32").unwrap(), TypeRef::Leaf(LeafType::I32));
        assert_eq!(
            TypeRef::parse("Vec<String>").unwrap(),
            TypeRef::list(LeafType::String.into())
        );
        assert_eq!(
            TypeRef::parse("Map< i32 , Option<Uuid> >").unwrap(),
            TypeRef::map(
                LeafType::I32.into(),
                TypeRef::option(LeafType::Uuid.into())
            )
        );
        assert_eq!(
            TypeRef::parse("[f64]").unwrap(),
            TypeRef::array(LeafType::F64.into())
        );
    }

    #[test]
    fn test_parse_named_generic() {
        let ty = TypeRef::parse("Pair<Item<String>, Foo<Vec<i32>>>").unwrap();
        assert_eq!(ty.raw_name(), "Pair");
        assert_eq!(ty.to_string(), "Pair<Item<String>, Foo<Vec<i32>>>");
        assert_eq!(ty.named_types(), vec!["Pair", "Item", "Foo"]);
    }

    #[test]
    fn test_parse_wildcards() {
        assert_eq!(
            TypeRef::parse("?").unwrap(),
            TypeRef::Wildcard { bound: None }
        );
        let bounded = TypeRef::parse("? extends Item<i64>").unwrap();
        assert_eq!(bounded.to_string(), "? extends Item<i64>");
        assert!(!bounded.is_concrete());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TypeRef::parse("Vec<String"),
            Err(TypeError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            TypeRef::parse("Map<String>"),
            Err(TypeError::Arity { expected: 2, .. })
        ));
        assert!(matches!(
            TypeRef::parse("i32<bool>"),
            Err(TypeError::Arity { expected: 0, .. })
        ));
        assert!(matches!(
            TypeRef::parse("Vec<i32> x"),
            Err(TypeError::UnexpectedChar { found: 'x', .. })
        ));
    }

    #[test]
    fn test_with_params() {
        let params = vec!["T".to_string()];
        let ty = TypeRef::parse("Map<T, Vec<Box<T>>>")
            .unwrap()
            .with_params(&params);
        assert_eq!(
            ty,
            TypeRef::map(
                TypeRef::Param("T".into()),
                TypeRef::list(TypeRef::named("Box", vec![TypeRef::Param("T".into())]))
            )
        );
        assert!(!ty.is_concrete());
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            #[serde(rename = "type")]
            ty: TypeRef,
        }

        let holder: Holder = serde_yaml::from_str("type: Map<String, Vec<i64>>").unwrap();
        assert_eq!(holder.ty.to_string(), "Map<String, Vec<i64>>");

        let yaml = serde_yaml::to_string(&holder).unwrap();
        assert!(yaml.contains("Map<String, Vec<i64>>"));
    }
}
