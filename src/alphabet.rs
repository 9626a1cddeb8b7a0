//! Relation alphabet: relation names with fixed arities.
//!
//! Every edge is an instance of a registered relation, and the number of
//! vertices it connects must equal the declared arity. The identity relation
//! `=` is pre-registered at arity 2 in every alphabet and cannot be redefined.
//!
//! Entries may carry free-form label metadata (string key/value pairs). The
//! calculus never interprets it; it is a hook for richer surface systems.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AlphabetError, GraphError};

/// Name of the identity relation.
pub const IDENTITY: &str = "=";

/// Result type for alphabet operations.
pub type AlphabetResult<T> = std::result::Result<T, AlphabetError>;

/// Declared signature of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSignature {
    /// Relation name.
    pub name: String,
    /// Number of vertices every instance connects.
    pub arity: usize,
    /// Uninterpreted label metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl RelationSignature {
    /// Whether this is the identity relation.
    pub fn is_identity(&self) -> bool {
        self.name == IDENTITY
    }
}

/// Registry of relation names to arities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphabet {
    relations: BTreeMap<String, RelationSignature>,
}

impl Alphabet {
    /// Create an alphabet containing only the identity relation.
    pub fn new() -> Self {
        let mut relations = BTreeMap::new();
        relations.insert(
            IDENTITY.to_string(),
            RelationSignature {
                name: IDENTITY.to_string(),
                arity: 2,
                metadata: BTreeMap::new(),
            },
        );
        Self { relations }
    }

    /// Create an alphabet from `(name, arity)` pairs.
    pub fn with_relations<'a>(
        pairs: impl IntoIterator<Item = (&'a str, usize)>,
    ) -> AlphabetResult<Self> {
        let mut alphabet = Self::new();
        for (name, arity) in pairs {
            alphabet.register(name, arity)?;
        }
        Ok(alphabet)
    }

    /// Register a relation.
    ///
    /// Re-registering a name with the same arity is a no-op; a different arity
    /// is rejected.
    pub fn register(&mut self, name: impl Into<String>, arity: usize) -> AlphabetResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(AlphabetError::EmptyName);
        }
        if arity == 0 {
            return Err(AlphabetError::ZeroArity { name });
        }
        if name == IDENTITY && arity != 2 {
            return Err(AlphabetError::IdentityRedefined { arity });
        }
        if let Some(existing) = self.relations.get(&name) {
            if existing.arity != arity {
                return Err(AlphabetError::ConflictingArity {
                    name,
                    registered: existing.arity,
                    requested: arity,
                });
            }
            return Ok(());
        }
        self.relations.insert(
            name.clone(),
            RelationSignature {
                name,
                arity,
                metadata: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Attach a metadata entry to a registered relation.
    ///
    /// Returns `false` if the relation is not registered.
    pub fn annotate(
        &mut self,
        name: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        match self.relations.get_mut(name) {
            Some(sig) => {
                sig.metadata.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Declared arity of a relation, if registered.
    pub fn arity_of(&self, name: &str) -> Option<usize> {
        self.relations.get(name).map(|sig| sig.arity)
    }

    /// Signature of a relation, if registered.
    pub fn get(&self, name: &str) -> Option<&RelationSignature> {
        self.relations.get(name)
    }

    /// Whether `(name, arity)` is a registered pair.
    pub fn accepts(&self, name: &str, arity: usize) -> bool {
        self.arity_of(name) == Some(arity)
    }

    /// Validate an edge's relation and arity.
    pub fn check(&self, name: &str, arity: usize) -> Result<(), GraphError> {
        if self.accepts(name, arity) {
            Ok(())
        } else {
            Err(GraphError::UnregisteredRelation {
                name: name.to_string(),
                arity,
            })
        }
    }

    /// All registered signatures, ordered by name.
    pub fn relations(&self) -> impl Iterator<Item = &RelationSignature> {
        self.relations.values()
    }

    /// Number of registered relations, identity included.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_preregistered() {
        let alphabet = Alphabet::new();
        assert_eq!(alphabet.arity_of(IDENTITY), Some(2));
        assert!(alphabet.get(IDENTITY).unwrap().is_identity());
        assert_eq!(alphabet.relation_count(), 1);
    }

    #[test]
    fn register_and_check() {
        let mut alphabet = Alphabet::new();
        alphabet.register("Mortal", 1).unwrap();
        assert!(alphabet.check("Mortal", 1).is_ok());
        let err = alphabet.check("Mortal", 2).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnregisteredRelation { ref name, arity: 2 } if name == "Mortal"
        ));
        assert!(alphabet.check("Human", 1).is_err());
    }

    #[test]
    fn re_registering_same_arity_is_noop() {
        let mut alphabet = Alphabet::new();
        alphabet.register("loves", 2).unwrap();
        alphabet.register("loves", 2).unwrap();
        assert_eq!(alphabet.relation_count(), 2);
    }

    #[test]
    fn conflicting_arity_rejected() {
        let mut alphabet = Alphabet::new();
        alphabet.register("loves", 2).unwrap();
        let err = alphabet.register("loves", 3).unwrap_err();
        assert!(matches!(
            err,
            AlphabetError::ConflictingArity {
                registered: 2,
                requested: 3,
                ..
            }
        ));
    }

    #[test]
    fn identity_cannot_be_redefined() {
        let mut alphabet = Alphabet::new();
        assert!(alphabet.register(IDENTITY, 2).is_ok());
        assert!(matches!(
            alphabet.register(IDENTITY, 3),
            Err(AlphabetError::IdentityRedefined { arity: 3 })
        ));
    }

    #[test]
    fn degenerate_registrations_rejected() {
        let mut alphabet = Alphabet::new();
        assert!(matches!(alphabet.register("", 1), Err(AlphabetError::EmptyName)));
        assert!(matches!(
            alphabet.register("P", 0),
            Err(AlphabetError::ZeroArity { .. })
        ));
    }

    #[test]
    fn with_relations_and_metadata() {
        let mut alphabet = Alphabet::with_relations([("Human", 1), ("between", 3)]).unwrap();
        assert_eq!(alphabet.arity_of("between"), Some(3));
        assert!(alphabet.annotate("Human", "order", "first"));
        assert!(!alphabet.annotate("Unknown", "order", "first"));
        assert_eq!(
            alphabet.get("Human").unwrap().metadata.get("order").map(String::as_str),
            Some("first")
        );
        let names: Vec<_> = alphabet.relations().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["=", "Human", "between"]);
    }
}
