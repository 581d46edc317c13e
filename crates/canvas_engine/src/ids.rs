//! # Strong Identifiers
//!
//! Four distinct id newtypes wrap a 128-bit `Uuid` so that a `BlockId` can
//! never be confused with a `PortId` at the type level, even though they
//! share a representation. Each has a `nil()` sentinel, a `create()`
//! constructor for a fresh unique value, and a textual round-trip via
//! `Display`/`FromStr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! strong_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// The sentinel "no id" value.
            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Draws a fresh, globally unique id.
            pub fn create() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

strong_id!(BlockId);
strong_id!(PortId);
strong_id!(LinkId);
strong_id!(ObjectId);

/// A point on the integer lattice ("fabric") underlying the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FabricCoord {
    pub x: i32,
    pub y: i32,
}

impl FabricCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(&self, other: &FabricCoord) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_even_with_same_uuid_semantics() {
        let b = BlockId::create();
        let p = PortId::create();
        assert_ne!(b.to_string(), ""); // non-empty textual form
        assert_ne!(p.to_string(), "");
    }

    #[test]
    fn nil_is_the_default_and_round_trips() {
        assert!(BlockId::nil().is_nil());
        let id = BlockId::create();
        let text = id.to_string();
        let parsed: BlockId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert!("not-a-uuid".parse::<ObjectId>().is_err());
    }
}
