//! Correlation identifiers for WS-Security `Id`/`URI` wiring.
//!
//! Identifiers are UUIDv7 values rendered as 32 lowercase hex digits, so they
//! sort lexically by creation time and need no coordination between callers.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Role of the element an identifier is attached to.
///
/// The role only picks the human-readable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Body,
    SecurityToken,
    Signature,
}

impl Role {
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::Body => "Body",
            Role::SecurityToken => "SecurityToken",
            Role::Signature => "Signature",
        }
    }
}

/// A generated element identifier, e.g. `Body-01927c1e9f6b7cc3a3a1c6a2f4f7d0b1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Generates a fresh identifier for the given role.
    pub fn next(role: Role) -> Self {
        Self(format!("{}-{}", role.prefix(), Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The same-document reference form, `#<id>`.
    pub fn reference(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_role_prefix() {
        assert!(Identifier::next(Role::Body).as_str().starts_with("Body-"));
        assert!(
            Identifier::next(Role::SecurityToken)
                .as_str()
                .starts_with("SecurityToken-")
        );
        assert!(
            Identifier::next(Role::Signature)
                .as_str()
                .starts_with("Signature-")
        );
    }

    #[test]
    fn test_reference_form() {
        let id = Identifier::next(Role::Body);
        assert_eq!(id.reference(), format!("#{id}"));
    }

    #[test]
    fn test_sequential_ids_sort_by_creation() {
        let ids: Vec<_> = (0..100).map(|_| Identifier::next(Role::Body)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let ids: Vec<Identifier> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..250)
                            .map(|_| Identifier::next(Role::Body))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(ids.len(), 2000);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
