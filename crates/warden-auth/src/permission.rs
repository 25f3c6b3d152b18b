// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission tags and sets.
//!
//! A permission tag is an opaque string. Tags are flat: `bond:access` is a
//! tag of its own and implies nothing about other `bond:` tags. The only
//! special tag is [`PermissionTag::ALL`], which grants every capability.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Permission Tag
// =============================================================================

/// An atomic capability identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTag(String);

impl PermissionTag {
    /// Wildcard granting every capability.
    pub const ALL: &'static str = "all";
    /// Read dashboard data.
    pub const READ: &'static str = "read";
    /// Create and edit records.
    pub const WRITE: &'static str = "write";
    /// Delete records.
    pub const DELETE: &'static str = "delete";
    /// Administer user accounts.
    pub const MANAGE_USERS: &'static str = "manage_users";
    /// Administer role definitions.
    pub const MANAGE_ROLES: &'static str = "manage_roles";
    /// Open the bonds sub-app.
    pub const BOND_ACCESS: &'static str = "bond:access";

    /// Creates a tag. Surrounding whitespace is trimmed.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.len() == tag.len() {
            Self(tag)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The wildcard tag.
    pub fn all() -> Self {
        Self::new(Self::ALL)
    }

    /// Returns the tag as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the wildcard tag.
    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::ALL
    }

    /// Returns the namespace of a `ns:name` tag.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }

    /// Returns `true` if the tag is usable in a role definition.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
    }

    /// Returns the tags the dashboard itself checks for.
    pub fn known() -> &'static [&'static str] {
        &[
            Self::ALL,
            Self::READ,
            Self::WRITE,
            Self::DELETE,
            Self::MANAGE_USERS,
            Self::MANAGE_ROLES,
            Self::BOND_ACCESS,
        ]
    }
}

impl fmt::Display for PermissionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PermissionTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PermissionTag {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for PermissionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PermissionTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Permission Set
// =============================================================================

/// A set of permission tags.
///
/// [`contains`](Self::contains) is an exact lookup; [`grants`](Self::grants)
/// also honours the `all` wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    tags: BTreeSet<PermissionTag>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from tags.
    pub fn from_tags<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PermissionTag>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a tag.
    pub fn add(&mut self, tag: impl Into<PermissionTag>) {
        self.tags.insert(tag.into());
    }

    /// Removes a tag.
    pub fn remove(&mut self, tag: &str) {
        self.tags.remove(tag.trim());
    }

    /// Returns `true` if the exact tag is present.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Returns `true` if the set holds the wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.contains(PermissionTag::ALL)
    }

    /// Returns `true` if the tag is present or the wildcard is.
    pub fn grants(&self, tag: &str) -> bool {
        self.contains(tag) || self.has_wildcard()
    }

    /// Returns `true` if every tag is granted.
    pub fn grants_all(&self, tags: &[&str]) -> bool {
        tags.iter().all(|t| self.grants(t))
    }

    /// Returns `true` if at least one tag is granted.
    pub fn grants_any(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.grants(t))
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns an iterator over the tags, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionTag> {
        self.tags.iter()
    }

    /// Merges another set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.tags.extend(other.tags.iter().cloned());
    }
}

impl<T: Into<PermissionTag>> FromIterator<T> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_tags(iter)
    }
}

// =============================================================================
// Tests
// =============================================================================
