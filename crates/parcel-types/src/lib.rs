//! Parcel Type Tokens
//!
//! Representation and parsing of the type tokens used in property
//! declarations (`string`, `null|int`, `App\User[]`).

#![warn(missing_docs)]

pub mod error;
pub mod ty;
pub mod union;

pub use error::TypeError;
pub use ty::{PrimitiveType, TypeToken};
pub use union::TypeUnion;
