//! Friendly alias <-> canonical feature name lookup.
//!
//! Clients may submit `"access_road"` instead of the training-time column
//! name `"Access Road"`. Resolution happens at the transport boundary, before
//! the mapper sees the request; ordering is not this module's concern.

use crate::feature_mapper::FeatureSet;
use crate::feature_schema::FeatureSchema;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("alias {0:?} is defined more than once")]
    DuplicateAlias(String),

    #[error("canonical feature {canonical:?} has two aliases: {first:?} and {second:?}")]
    DuplicateCanonical {
        canonical: String,
        first: String,
        second: String,
    },

    #[error("alias {alias:?} (for {canonical:?}) is itself an aliased canonical feature name")]
    ShadowsCanonical { alias: String, canonical: String },

    #[error("alias {alias:?} (for {canonical:?}) is a feature name of the model")]
    ShadowsSchemaFeature { alias: String, canonical: String },
}

/// Bidirectional alias table
#[derive(Debug, Clone, Default)]
pub struct FeatureAliases {
    to_canonical: HashMap<String, String>,
    to_alias: HashMap<String, String>,
}

impl FeatureAliases {
    /// Build the table from `(alias, canonical)` pairs
    pub fn new<I, A, C>(pairs: I) -> Result<Self, AliasError>
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
    {
        let mut aliases = Self::default();

        for (alias, canonical) in pairs {
            let (alias, canonical) = (alias.into(), canonical.into());

            // An alias equal to its own canonical name is a no-op.
            if alias == canonical {
                continue;
            }
            if aliases.to_canonical.contains_key(&alias) {
                return Err(AliasError::DuplicateAlias(alias));
            }
            if let Some(first) = aliases.to_alias.get(&canonical) {
                return Err(AliasError::DuplicateCanonical {
                    canonical,
                    first: first.clone(),
                    second: alias,
                });
            }

            aliases.to_alias.insert(canonical.clone(), alias.clone());
            aliases.to_canonical.insert(alias, canonical);
        }

        if let Some((alias, canonical)) = aliases
            .to_canonical
            .iter()
            .find(|(alias, _)| aliases.to_alias.contains_key(*alias))
        {
            return Err(AliasError::ShadowsCanonical {
                alias: alias.clone(),
                canonical: canonical.clone(),
            });
        }

        Ok(aliases)
    }

    /// Canonical name for a friendly alias
    pub fn canonical_for(&self, alias: &str) -> Option<&str> {
        self.to_canonical.get(alias).map(String::as_str)
    }

    /// Friendly alias for a canonical name
    pub fn alias_for(&self, canonical: &str) -> Option<&str> {
        self.to_alias.get(canonical).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_canonical.is_empty()
    }

    /// Rewrite alias keys to canonical names.
    ///
    /// A canonical key sent alongside its alias wins. Unknown keys are kept
    /// as-is.
    pub fn resolve(&self, input: FeatureSet) -> FeatureSet {
        if self.is_empty() {
            return input;
        }

        let mut resolved = FeatureSet::new();
        let mut aliased = Vec::new();

        for (key, value) in input {
            match self.to_canonical.get(&key) {
                Some(canonical) => aliased.push((canonical.clone(), value)),
                None => {
                    resolved.insert(key, value);
                }
            }
        }

        for (canonical, value) in aliased {
            resolved.entry(canonical).or_insert(value);
        }

        resolved
    }

    /// Reject aliases that are themselves feature names of `schema`.
    ///
    /// Such an alias would rename a canonical key sent by a client onto
    /// another feature.
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), AliasError> {
        let mut shadowing: Vec<(&String, &String)> = self
            .to_canonical
            .iter()
            .filter(|(alias, _)| schema.contains(alias))
            .collect();
        shadowing.sort_unstable();

        match shadowing.first() {
            Some((alias, canonical)) => Err(AliasError::ShadowsSchemaFeature {
                alias: (*alias).clone(),
                canonical: (*canonical).clone(),
            }),
            None => Ok(()),
        }
    }

    /// Aliases whose canonical name is not part of `schema`, sorted by alias
    pub fn unmatched(&self, schema: &FeatureSchema) -> Vec<(&str, &str)> {
        let mut unmatched: Vec<(&str, &str)> = self
            .to_canonical
            .iter()
            .filter(|(_, canonical)| !schema.contains(canonical))
            .map(|(alias, canonical)| (alias.as_str(), canonical.as_str()))
            .collect();
        unmatched.sort_unstable();
        unmatched
    }
}
