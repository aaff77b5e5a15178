use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Catalog object identifier.
///
/// An opaque, session-local token: equality is meaningful only within one
/// extraction pass and the numeric value carries no ordering or structure.
/// The catalog's "no object" value (zero) is never wrapped; absent references
/// are `Option<Oid>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(u32);

impl Oid {
    pub fn from_raw(raw: u32) -> Option<Oid> {
        if raw == 0 { None } else { Some(Oid(raw)) }
    }

    pub fn as_u32(&self) -> u32 { self.0 }
}

impl Display for Oid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
