use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stored group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub external_id: String,
}

/// Attributes written on create and full replace.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct GroupFields {
    #[validate(length(min = 1, max = 150, message = "displayName must be 1 to 150 characters"))]
    pub name: String,
    pub external_id: String,
}

/// A group together with the ids of its member users.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupWithMembers {
    pub group: Group,
    pub members: BTreeSet<i64>,
}
