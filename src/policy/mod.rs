//! Role-based access filtering
//!
//! Every candidate list produced anywhere in the retrieval pipeline passes
//! through [`RolePolicy::filter`] before it reaches a caller. The filter is a
//! pure function and idempotent; it runs over each raw source's results and
//! again over the fused set.

use crate::config::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Access-control label attached to a chunk at creation time, never mutated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTag {
    Public,
    Internal,
    Restricted,
}

/// Anything that carries an access tag set and can be policy-filtered
pub trait Tagged {
    fn rbac_tags(&self) -> &BTreeSet<AccessTag>;
    /// Stable identifier used only for drop logging
    fn tag_subject(&self) -> &str;
}

/// Role to allowed-tag-set mapping
///
/// Unknown roles fall back to the least privileged set (public only).
#[derive(Debug, Clone)]
pub struct RolePolicy {
    config: PolicyConfig,
}

impl RolePolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Allowed tags for a role; unrecognized roles see public content only
    pub fn allowed_tags(&self, role: &str) -> BTreeSet<AccessTag> {
        self.config
            .roles
            .get(role)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([AccessTag::Public]))
    }

    /// Keep only candidates whose tag set intersects the role's allowed set
    ///
    /// Disallowed candidates are dropped silently (debug-logged, never an
    /// error). Filtering an already-filtered list changes nothing.
    pub fn filter<T: Tagged>(&self, candidates: Vec<T>, role: &str) -> Vec<T> {
        let allowed = self.allowed_tags(role);

        candidates
            .into_iter()
            .filter(|candidate| {
                let passes = candidate.rbac_tags().iter().any(|tag| allowed.contains(tag));
                if !passes {
                    tracing::debug!(
                        subject = candidate.tag_subject(),
                        role,
                        "dropped by access policy"
                    );
                }
                passes
            })
            .collect()
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}
