//! Core token definitions for property declarations

use std::fmt;

use crate::error::TypeError;

/// Primitive type keywords understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// The `string` type
    String,
    /// The `int` type (alias `integer`)
    Int,
    /// The `float` type (alias `double`)
    Float,
    /// The `bool` type (alias `boolean`)
    Bool,
    /// The `array` type: any list or map
    Array,
    /// The `null` type
    Null,
    /// The `mixed` type: accepts anything
    Mixed,
}

impl PrimitiveType {
    /// Resolve a keyword (case-insensitive, aliases included)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "string" => Some(PrimitiveType::String),
            "int" | "integer" => Some(PrimitiveType::Int),
            "float" | "double" => Some(PrimitiveType::Float),
            "bool" | "boolean" => Some(PrimitiveType::Bool),
            "array" => Some(PrimitiveType::Array),
            "null" => Some(PrimitiveType::Null),
            "mixed" => Some(PrimitiveType::Mixed),
            _ => None,
        }
    }

    /// Canonical keyword for this primitive
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Int => "int",
            PrimitiveType::Float => "float",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Array => "array",
            PrimitiveType::Null => "null",
            PrimitiveType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A single, non-array type token
///
/// Either a primitive keyword or the fully-qualified name of a nested type
/// (another declared class, a collection wrapper or an opaque object type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    /// Primitive keyword
    Primitive(PrimitiveType),
    /// Fully-qualified nested type name
    Class(String),
}

impl TypeToken {
    /// Parse a single token without `|` alternatives or `[]` suffix
    pub fn parse(token: &str) -> Result<Self, TypeError> {
        let token = token.trim();
        if let Some(primitive) = PrimitiveType::from_keyword(token) {
            return Ok(TypeToken::Primitive(primitive));
        }

        let name = token.strip_prefix('\\').unwrap_or(token);
        if !is_qualified_identifier(name) {
            return Err(TypeError::InvalidIdentifier {
                token: token.to_string(),
            });
        }
        Ok(TypeToken::Class(name.to_string()))
    }

    /// Check if this token is the given primitive
    pub fn is(&self, primitive: PrimitiveType) -> bool {
        matches!(self, TypeToken::Primitive(p) if *p == primitive)
    }

    /// Get the primitive if this is a primitive token
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeToken::Primitive(p) => Some(*p),
            TypeToken::Class(_) => None,
        }
    }

    /// Get the class name if this is a class token
    pub fn as_class(&self) -> Option<&str> {
        match self {
            TypeToken::Class(name) => Some(name),
            TypeToken::Primitive(_) => None,
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeToken::Primitive(p) => write!(f, "{}", p),
            TypeToken::Class(name) => write!(f, "{}", name),
        }
    }
}

/// `Segment(\Segment)*` where each segment is `[A-Za-z_][A-Za-z0-9_]*`
fn is_qualified_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('\\').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_aliases() {
        assert_eq!(PrimitiveType::from_keyword("integer"), Some(PrimitiveType::Int));
        assert_eq!(PrimitiveType::from_keyword("boolean"), Some(PrimitiveType::Bool));
        assert_eq!(PrimitiveType::from_keyword("double"), Some(PrimitiveType::Float));
        assert_eq!(PrimitiveType::from_keyword("String"), Some(PrimitiveType::String));
        assert_eq!(PrimitiveType::from_keyword("User"), None);
    }

    #[test]
    fn test_primitive_display() {
        assert_eq!(format!("{}", PrimitiveType::Int), "int");
        assert_eq!(format!("{}", PrimitiveType::Mixed), "mixed");
    }

    #[test]
    fn test_parse_class_token() {
        assert_eq!(
            TypeToken::parse("\\App\\Dto\\User").unwrap(),
            TypeToken::Class("App\\Dto\\User".to_string())
        );
        assert_eq!(TypeToken::parse("bool").unwrap().as_primitive(), Some(PrimitiveType::Bool));
    }

    #[test]
    fn test_parse_rejects_bad_identifiers() {
        assert!(TypeToken::parse("9lives").is_err());
        assert!(TypeToken::parse("App\\\\User").is_err());
        assert!(TypeToken::parse("user-name").is_err());
        assert!(TypeToken::parse("").is_err());
    }
}
