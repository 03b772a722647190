//! Behaviour flags for construction and instances
//!
//! Flags combine orthogonally, so they are an open bit-set rather than an
//! enum. [`DtoOptions`] exposes the same set as named booleans for callers
//! that would rather not compose bits.
//!
//! | Flag                           | Effect                                                   |
//! |--------------------------------|----------------------------------------------------------|
//! | `NONE`                         | immutable, strict, non-partial                           |
//! | `PARTIAL`                      | skip default filling and the required-property check     |
//! | `MUTABLE`                      | allow [`Dto::set`](crate::Dto::set) after construction   |
//! | `IGNORE_UNKNOWN_PROPERTIES`    | drop input keys without a matching property              |
//! | `TRACK_UNKNOWN_PROPERTIES`     | drop them but keep them on the instance                  |
//! | `ARRAY_DEFAULT_TO_EMPTY_ARRAY` | undefined array properties default to `[]`               |
//! | `NULLABLE_DEFAULT_TO_NULL`     | undefined nullable properties default to `null`          |
//! | `BOOL_DEFAULT_TO_FALSE`        | undefined bool properties default to `false`             |
//! | `WITH_DEFAULTS`                | resolve defaults even under `PARTIAL`                    |
//! | `NOT_NULLABLE` / `NULLABLE`    | override nullability for a single validation call        |

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DtoError;

/// Behaviour flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DtoFlags(u16);

impl DtoFlags {
    /// All defaults: immutable, strict, non-partial
    pub const NONE: Self = Self(0x000);
    /// Only supplied keys become defined; no defaults, no required check
    pub const PARTIAL: Self = Self(0x001);
    /// Permit writes after construction
    pub const MUTABLE: Self = Self(0x002);
    /// Drop unknown input keys instead of failing
    pub const IGNORE_UNKNOWN_PROPERTIES: Self = Self(0x004);
    /// Drop unknown input keys and keep them for inspection
    pub const TRACK_UNKNOWN_PROPERTIES: Self = Self(0x008);
    /// Undefined array properties default to an empty list
    pub const ARRAY_DEFAULT_TO_EMPTY_ARRAY: Self = Self(0x010);
    /// Undefined nullable properties default to null
    pub const NULLABLE_DEFAULT_TO_NULL: Self = Self(0x020);
    /// Undefined bool properties default to false
    pub const BOOL_DEFAULT_TO_FALSE: Self = Self(0x040);
    /// Resolve defaults even under `PARTIAL`
    pub const WITH_DEFAULTS: Self = Self(0x080);
    /// Treat the property as non-nullable for one validation call
    pub const NOT_NULLABLE: Self = Self(0x100);
    /// Treat the property as nullable for one validation call
    pub const NULLABLE: Self = Self(0x200);

    // Common combinations
    /// ARRAY_DEFAULT_TO_EMPTY_ARRAY | NULLABLE_DEFAULT_TO_NULL | BOOL_DEFAULT_TO_FALSE
    pub const IMPLICIT_DEFAULTS: Self = Self(0x070);
    /// IGNORE_UNKNOWN_PROPERTIES | TRACK_UNKNOWN_PROPERTIES
    pub const LENIENT_UNKNOWN: Self = Self(0x00C);
    /// NOT_NULLABLE | NULLABLE; never stored on an instance
    pub const TRANSIENT: Self = Self(0x300);

    const NAMED: [(&'static str, DtoFlags); 10] = [
        ("PARTIAL", Self::PARTIAL),
        ("MUTABLE", Self::MUTABLE),
        ("IGNORE_UNKNOWN_PROPERTIES", Self::IGNORE_UNKNOWN_PROPERTIES),
        ("TRACK_UNKNOWN_PROPERTIES", Self::TRACK_UNKNOWN_PROPERTIES),
        ("ARRAY_DEFAULT_TO_EMPTY_ARRAY", Self::ARRAY_DEFAULT_TO_EMPTY_ARRAY),
        ("NULLABLE_DEFAULT_TO_NULL", Self::NULLABLE_DEFAULT_TO_NULL),
        ("BOOL_DEFAULT_TO_FALSE", Self::BOOL_DEFAULT_TO_FALSE),
        ("WITH_DEFAULTS", Self::WITH_DEFAULTS),
        ("NOT_NULLABLE", Self::NOT_NULLABLE),
        ("NULLABLE", Self::NULLABLE),
    ];

    const COMBINED: [(&'static str, DtoFlags); 4] = [
        ("NONE", Self::NONE),
        ("IMPLICIT_DEFAULTS", Self::IMPLICIT_DEFAULTS),
        ("LENIENT_UNKNOWN", Self::LENIENT_UNKNOWN),
        ("TRANSIENT", Self::TRANSIENT),
    ];

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if every flag of `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any flag of `other` is set
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Check if no flag is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection of flags
    pub const fn intersection(&self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The flags without the call-scoped nullability overrides
    pub const fn without_transient(&self) -> Self {
        self.difference(Self::TRANSIENT)
    }

    /// Look up a single flag or combination by name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_uppercase();
        Self::NAMED
            .iter()
            .chain(Self::COMBINED.iter())
            .find(|(flag_name, _)| *flag_name == name)
            .map(|(_, flag)| *flag)
    }

    /// Parse combined flags from a pipe-separated string (`"PARTIAL|MUTABLE"`)
    pub fn from_combined_str(s: &str) -> Option<Self> {
        let mut result = Self::NONE;
        for part in s.split('|') {
            result = result.union(Self::from_name(part)?);
        }
        Some(result)
    }

    /// Names of the single flags that are set, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for DtoFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for DtoFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for DtoFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        write!(f, "{}", self.names().join("|"))
    }
}

impl FromStr for DtoFlags {
    type Err = DtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_combined_str(s)
            .ok_or_else(|| DtoError::Config(format!("unknown flags `{}`", s)))
    }
}

impl Serialize for DtoFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Accepted spellings of flags in configuration documents
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagsRepr {
    Combined(String),
    Names(Vec<String>),
    Options(DtoOptions),
}

impl<'de> Deserialize<'de> for DtoFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match FlagsRepr::deserialize(deserializer)? {
            FlagsRepr::Combined(s) => s.parse().map_err(D::Error::custom),
            FlagsRepr::Names(names) => names.iter().try_fold(DtoFlags::NONE, |acc, name| {
                DtoFlags::from_name(name)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| D::Error::custom(format!("unknown flag `{}`", name)))
            }),
            FlagsRepr::Options(options) => Ok(options.into()),
        }
    }
}

/// Named-boolean view of [`DtoFlags`]
///
/// The call-scoped nullability overrides are not part of this view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DtoOptions {
    /// See [`DtoFlags::PARTIAL`]
    pub partial: bool,
    /// See [`DtoFlags::MUTABLE`]
    pub mutable: bool,
    /// See [`DtoFlags::IGNORE_UNKNOWN_PROPERTIES`]
    pub ignore_unknown_properties: bool,
    /// See [`DtoFlags::TRACK_UNKNOWN_PROPERTIES`]
    pub track_unknown_properties: bool,
    /// See [`DtoFlags::ARRAY_DEFAULT_TO_EMPTY_ARRAY`]
    pub array_default_to_empty_array: bool,
    /// See [`DtoFlags::NULLABLE_DEFAULT_TO_NULL`]
    pub nullable_default_to_null: bool,
    /// See [`DtoFlags::BOOL_DEFAULT_TO_FALSE`]
    pub bool_default_to_false: bool,
    /// See [`DtoFlags::WITH_DEFAULTS`]
    pub with_defaults: bool,
}

impl From<DtoOptions> for DtoFlags {
    fn from(options: DtoOptions) -> Self {
        [
            (options.partial, DtoFlags::PARTIAL),
            (options.mutable, DtoFlags::MUTABLE),
            (options.ignore_unknown_properties, DtoFlags::IGNORE_UNKNOWN_PROPERTIES),
            (options.track_unknown_properties, DtoFlags::TRACK_UNKNOWN_PROPERTIES),
            (options.array_default_to_empty_array, DtoFlags::ARRAY_DEFAULT_TO_EMPTY_ARRAY),
            (options.nullable_default_to_null, DtoFlags::NULLABLE_DEFAULT_TO_NULL),
            (options.bool_default_to_false, DtoFlags::BOOL_DEFAULT_TO_FALSE),
            (options.with_defaults, DtoFlags::WITH_DEFAULTS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(DtoFlags::NONE, |acc, (_, flag)| acc | flag)
    }
}

impl From<DtoFlags> for DtoOptions {
    fn from(flags: DtoFlags) -> Self {
        DtoOptions {
            partial: flags.contains(DtoFlags::PARTIAL),
            mutable: flags.contains(DtoFlags::MUTABLE),
            ignore_unknown_properties: flags.contains(DtoFlags::IGNORE_UNKNOWN_PROPERTIES),
            track_unknown_properties: flags.contains(DtoFlags::TRACK_UNKNOWN_PROPERTIES),
            array_default_to_empty_array: flags.contains(DtoFlags::ARRAY_DEFAULT_TO_EMPTY_ARRAY),
            nullable_default_to_null: flags.contains(DtoFlags::NULLABLE_DEFAULT_TO_NULL),
            bool_default_to_false: flags.contains(DtoFlags::BOOL_DEFAULT_TO_FALSE),
            with_defaults: flags.contains(DtoFlags::WITH_DEFAULTS),
        }
    }
}
