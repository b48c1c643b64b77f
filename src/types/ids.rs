//! Strongly-typed identifiers.
//!
//! Wire identifiers are 32-bit; zero is the null id and never names an object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Macro to define a non-null 32-bit wire identifier.
///
/// Generates: struct, `new()`, `from_raw_nonzero()`, `get()`, Display.
macro_rules! define_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wrap a raw wire value. Returns `None` for the null id.
            pub fn new(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map(Self)
            }

            pub fn from_raw_nonzero(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "@{}"), self.0)
            }
        }
    };
}

define_id!(ObjectId, "object");

/// Encode an optional id as its raw wire value (0 for `None`).
pub fn raw_or_null(id: Option<ObjectId>) -> u32 {
    id.map(ObjectId::get).unwrap_or(0)
}
