//! Reference values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnionSqlError;

/// A reference to a schema object instance: the object's type code plus the
/// identity of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Schema type code of the referenced object.
    pub type_code: i32,
    /// Identity of the referenced row.
    pub identity: Uuid,
}

impl Default for Entity {
    fn default() -> Self {
        Entity::UNDEFINED
    }
}

impl Entity {
    /// The empty reference.
    pub const UNDEFINED: Entity = Entity {
        type_code: 0,
        identity: Uuid::nil(),
    };

    /// Creates a new reference value.
    #[must_use]
    pub fn new(type_code: i32, identity: Uuid) -> Self {
        Entity {
            type_code,
            identity,
        }
    }

    /// Creates a reference that only carries a type code.
    ///
    /// Used for compile-time reference types where no row is known yet.
    #[must_use]
    pub fn of_type(type_code: i32) -> Self {
        Entity {
            type_code,
            identity: Uuid::nil(),
        }
    }

    /// Returns true for [`Entity::UNDEFINED`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        *self == Entity::UNDEFINED
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.type_code, self.identity)
    }
}

impl FromStr for Entity {
    type Err = UnionSqlError;

    /// Parses the `{code:uuid}` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| UnionSqlError::InvalidLiteral {
            literal: s.to_string(),
            message: message.to_string(),
        };

        let inner = s
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| invalid("expected {code:uuid}"))?;

        let (code, identity) = inner
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;

        let type_code = code
            .trim()
            .parse::<i32>()
            .map_err(|e| invalid(&format!("bad type code: {e}")))?;
        let identity =
            Uuid::parse_str(identity.trim()).map_err(|e| invalid(&format!("bad identity: {e}")))?;

        Ok(Entity::new(type_code, identity))
    }
}
