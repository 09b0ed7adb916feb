//! Relation membership records produced by ingestion.

use std::fmt;

use thiserror::Error;

use crate::OsmId;

/// OSM element type of a relation member. Stored as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MemberType {
    /// A node, e.g. a place label.
    Node,
    /// A way, e.g. part of a boundary.
    Way,
    /// A nested relation.
    Relation,
}

impl MemberType {
    /// Integer code used in storage.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Node => 0,
            Self::Way => 1,
            Self::Relation => 2,
        }
    }
}

/// Error returned for a member type code outside `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown relation member type code {0}")]
pub struct UnknownMemberType(pub i64);

impl TryFrom<i64> for MemberType {
    type Error = UnknownMemberType;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Node),
            1 => Ok(Self::Way),
            2 => Ok(Self::Relation),
            other => Err(UnknownMemberType(other)),
        }
    }
}

/// Member roles that make the member an alias of the relation's polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// The node carrying the place's label.
    Label,
    /// The node marking the administrative centre.
    AdminCenter,
}

impl LinkRole {
    /// Recognise a role string. Matching is exact; unknown roles yield `None`.
    ///
    /// # Examples
    /// ```
    /// use placetree_core::LinkRole;
    ///
    /// assert_eq!(LinkRole::from_role("label"), Some(LinkRole::Label));
    /// assert_eq!(LinkRole::from_role("outer"), None);
    /// ```
    #[must_use]
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "label" => Some(Self::Label),
            "admin_center" => Some(Self::AdminCenter),
            _ => None,
        }
    }

    /// Role string as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::AdminCenter => "admin_center",
        }
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of a relation, as imported.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationMember {
    /// Osm id of the owning relation.
    pub osm_id: OsmId,
    /// Osm id of the member element.
    pub member_id: OsmId,
    /// Element type of the member.
    pub member_type: MemberType,
    /// Free-form role string.
    pub role: String,
}

impl RelationMember {
    /// Construct a member record.
    #[must_use]
    pub fn new(
        osm_id: OsmId,
        member_id: OsmId,
        member_type: MemberType,
        role: impl Into<String>,
    ) -> Self {
        Self {
            osm_id,
            member_id,
            member_type,
            role: role.into(),
        }
    }

    /// Recognised link role, if any.
    #[must_use]
    pub fn link_role(&self) -> Option<LinkRole> {
        LinkRole::from_role(&self.role)
    }
}
