//! Union types as they appear in property declarations
//!
//! A declaration is a list of alternatives such as `["null", "string"]`,
//! `["int|float"]` or `["App\User[]"]`. Alternatives are split into
//! simple tokens and array-element tokens (those written with a trailing
//! `[]`).

use std::fmt;

use crate::error::TypeError;
use crate::ty::{PrimitiveType, TypeToken};

/// Union of simple and array-element type tokens
///
/// Token order is preserved (first occurrence wins on duplicates) because
/// cast resolution walks tokens in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeUnion {
    simple_types: Vec<TypeToken>,
    array_types: Vec<TypeToken>,
}

impl TypeUnion {
    /// Parse a list of declared alternatives
    ///
    /// Each entry may itself contain `|`-separated alternatives. `?T` is
    /// shorthand for `null|T`. An empty list declares `mixed`.
    pub fn parse<I, S>(declarations: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut union = TypeUnion::default();

        for declaration in declarations {
            let declaration = declaration.as_ref();
            for alternative in declaration.split('|') {
                union.push_alternative(declaration, alternative)?;
            }
        }

        if union.simple_types.is_empty() && union.array_types.is_empty() {
            union.simple_types.push(TypeToken::Primitive(PrimitiveType::Mixed));
        }

        Ok(union)
    }

    /// The `mixed` union
    pub fn mixed() -> Self {
        TypeUnion {
            simple_types: vec![TypeToken::Primitive(PrimitiveType::Mixed)],
            array_types: Vec::new(),
        }
    }

    fn push_alternative(&mut self, declaration: &str, alternative: &str) -> Result<(), TypeError> {
        let empty = || TypeError::EmptyToken {
            declaration: declaration.to_string(),
        };

        let alternative = alternative.trim();
        let (nullable, rest) = match alternative.strip_prefix('?') {
            Some(rest) => (true, rest.trim()),
            None => (false, alternative),
        };
        if rest.is_empty() {
            return Err(empty());
        }
        if nullable {
            push_unique(&mut self.simple_types, TypeToken::Primitive(PrimitiveType::Null));
        }

        match rest.strip_suffix("[]") {
            Some(element) => {
                let element = element.trim();
                if element.is_empty() {
                    return Err(empty());
                }
                // Nested lists (`Foo[][]`) are only checked one level deep
                let token = if element.ends_with("[]") {
                    TypeToken::Primitive(PrimitiveType::Array)
                } else {
                    TypeToken::parse(element)?
                };
                push_unique(&mut self.array_types, token);
            }
            None => push_unique(&mut self.simple_types, TypeToken::parse(rest)?),
        }

        Ok(())
    }

    /// Non-array tokens in declaration order
    pub fn simple_types(&self) -> &[TypeToken] {
        &self.simple_types
    }

    /// Array-element tokens in declaration order
    pub fn array_types(&self) -> &[TypeToken] {
        &self.array_types
    }

    /// Check if the union contains a primitive as a simple type
    pub fn contains(&self, primitive: PrimitiveType) -> bool {
        self.simple_types.iter().any(|t| t.is(primitive))
    }

    /// `null` or `mixed` is declared
    pub fn is_nullable(&self) -> bool {
        self.contains(PrimitiveType::Null) || self.is_mixed()
    }

    /// `mixed` is declared
    pub fn is_mixed(&self) -> bool {
        self.contains(PrimitiveType::Mixed)
    }

    /// `bool` is declared
    pub fn is_bool(&self) -> bool {
        self.contains(PrimitiveType::Bool)
    }

    /// `array` or any `T[]` is declared
    pub fn is_array(&self) -> bool {
        self.contains(PrimitiveType::Array) || !self.array_types.is_empty()
    }

    /// `string` is declared
    pub fn is_string(&self) -> bool {
        self.contains(PrimitiveType::String)
    }

    /// `int` is declared
    pub fn is_int(&self) -> bool {
        self.contains(PrimitiveType::Int)
    }

    /// Nested type names referenced as simple or array-element tokens
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.simple_types
            .iter()
            .chain(&self.array_types)
            .filter_map(TypeToken::as_class)
    }
}

fn push_unique(tokens: &mut Vec<TypeToken>, token: TypeToken) {
    if !tokens.contains(&token) {
        tokens.push(token);
    }
}

impl fmt::Display for TypeUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.simple_types {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}", token)?;
            first = false;
        }
        for token in &self.array_types {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}[]", token)?;
            first = false;
        }
        if first {
            write!(f, "mixed")?;
        }
        Ok(())
    }
}
