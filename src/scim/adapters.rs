//! Resource adapters.
//!
//! Translate stored users and groups to and from their SCIM representation,
//! and implement [`PatchAdapter`] for each resource type. Attribute dispatch
//! goes through closed setter tables keyed by attribute path.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use validator::{Validate, ValidateEmail};

use super::{
    attr_path::{AttrPath, AttrPathSegment},
    error::{ScimError, ScimResult},
    patch::{PatchAdapter, PatchTransaction, json_type_name},
    password::hash_password,
    types::{
        SCHEMA_GROUP, SCHEMA_USER, ScimEmail, ScimGroup, ScimMeta, ScimName, ScimResourceRef,
        ScimUser,
    },
};
use crate::models::{Group, GroupFields, GroupWithMembers, User, UserFields};

/// Builds resource URLs under `{base_location}/scim/v2`.
#[derive(Debug, Clone)]
pub struct Locations {
    root: String,
}

impl Locations {
    pub fn new(base_location: &str) -> Self {
        Self {
            root: format!("{}/scim/v2", base_location.trim_end_matches('/')),
        }
    }

    /// `{base}/scim/v2`
    pub fn root(&self) -> &str {
        &self.root
    }

    /// `{base}/scim/v2/{endpoint}`, e.g. `Users/.search`
    pub fn endpoint(&self, endpoint: &str) -> String {
        format!("{}/{}", self.root, endpoint)
    }

    pub fn user(&self, id: i64) -> String {
        format!("{}/Users/{}", self.root, id)
    }

    pub fn group(&self, id: i64) -> String {
        format!("{}/Groups/{}", self.root, id)
    }
}

// =============================================================================
// Wire conversion
// =============================================================================

/// SCIM representation of a user and the groups it belongs to.
pub fn user_to_scim(user: &User, groups: &[Group], locations: &Locations) -> ScimUser {
    let emails = if user.email.is_empty() {
        Vec::new()
    } else {
        vec![ScimEmail {
            value: user.email.clone(),
            primary: true,
        }]
    };

    ScimUser {
        schemas: vec![SCHEMA_USER.to_string()],
        id: user.id.to_string(),
        external_id: user.external_id.clone(),
        user_name: user.username.clone(),
        name: ScimName {
            given_name: user.first_name.clone(),
            family_name: user.last_name.clone(),
            formatted: user.formatted_name(),
        },
        display_name: user.display_name(),
        emails,
        active: user.is_active,
        groups: groups
            .iter()
            .map(|g| ScimResourceRef {
                value: g.id.to_string(),
                ref_uri: locations.group(g.id),
                display: g.name.clone(),
            })
            .collect(),
        meta: ScimMeta::new("User", locations.user(user.id))
            .with_timestamps(user.date_joined, user.date_joined),
    }
}

/// SCIM representation of a group and its members.
pub fn group_to_scim(group: &Group, members: &[User], locations: &Locations) -> ScimGroup {
    ScimGroup {
        schemas: vec![SCHEMA_GROUP.to_string()],
        id: group.id.to_string(),
        external_id: group.external_id.clone(),
        display_name: group.name.clone(),
        members: members
            .iter()
            .map(|u| ScimResourceRef {
                value: u.id.to_string(),
                ref_uri: locations.user(u.id),
                display: u.display_name(),
            })
            .collect(),
        meta: ScimMeta::new("Group", locations.group(group.id)),
    }
}

/// Reject body attributes whose JSON type is fixed and wrong.
pub fn validate_body(body: &Map<String, Value>) -> ScimResult<()> {
    if let Some(active) = body.get("active")
        && !active.is_boolean()
    {
        return Err(type_error("active", "boolean", active));
    }
    Ok(())
}

/// Overlay a create/replace body onto `base`.
///
/// Plain string attributes are always taken from the body (missing means
/// empty). `emails`, `password` and `active` keep their base value when the
/// body omits them.
pub fn user_fields_from_body(
    body: &Map<String, Value>,
    mut base: UserFields,
) -> ScimResult<UserFields> {
    validate_body(body)?;

    let name = body.get("name").and_then(Value::as_object);
    base.external_id = string_attr(body.get("externalId"), "externalId")?;
    base.username = string_attr(body.get("userName"), "userName")?;
    base.first_name = string_attr(name.and_then(|n| n.get("givenName")), "name.givenName")?;
    base.last_name = string_attr(name.and_then(|n| n.get("familyName")), "name.familyName")?;

    if let Some(emails) = body.get("emails").filter(|v| !v.is_null()) {
        base.email = parse_emails(emails)?;
    }
    if let Some(password) = body.get("password").filter(|v| !v.is_null()) {
        base.password = hash_optional(&string_attr(Some(password), "password")?);
    }
    if let Some(active) = body.get("active").and_then(Value::as_bool) {
        base.is_active = active;
    }

    base.validate()
        .map_err(|e| ScimError::bad_request(format!("Invalid user: {}", e)))?;
    Ok(base)
}

/// Group attributes from a create/replace body.
pub fn group_fields_from_body(body: &Map<String, Value>) -> ScimResult<GroupFields> {
    validate_body(body)?;

    let fields = GroupFields {
        name: string_attr(body.get("displayName"), "displayName")?,
        external_id: string_attr(body.get("externalId"), "externalId")?,
    };
    fields
        .validate()
        .map_err(|e| ScimError::bad_request(format!("Invalid group: {}", e)))?;
    Ok(fields)
}

/// Pick the email address to store from an `emails` value.
///
/// A list prefers primary entries, then the rest, each ordered by value. An
/// object (some clients send one instead of a list) contributes its `value`.
pub fn parse_emails(value: &Value) -> ScimResult<String> {
    let invalid = || ScimError::bad_request("Invalid email value");

    let email = match value {
        Value::Array(entries) => {
            let mut candidates: Vec<(bool, &str)> = Vec::with_capacity(entries.len());
            for entry in entries {
                let address = entry.get("value").and_then(Value::as_str).ok_or_else(invalid)?;
                let primary = entry.get("primary").and_then(Value::as_bool).unwrap_or(false);
                candidates.push((primary, address));
            }
            // primary first, then by address
            candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
            candidates.first().map(|(_, address)| address.to_string()).ok_or_else(invalid)?
        }
        Value::Object(entry) => entry
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        _ => return Err(invalid()),
    };

    if !email.validate_email() {
        return Err(invalid());
    }
    Ok(email)
}

fn string_attr(value: Option<&Value>, name: &str) -> ScimResult<String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(type_error(name, "string", other)),
    }
}

fn type_error(name: &str, expected: &str, value: &Value) -> ScimError {
    ScimError::bad_request(format!(
        "\"{}\" should be of type \"{}\". Got type \"{}\"",
        name,
        expected,
        json_type_name(value)
    ))
}

fn hash_optional(cleartext: &str) -> String {
    if cleartext.is_empty() {
        String::new()
    } else {
        hash_password(cleartext)
    }
}

// =============================================================================
// User PATCH
// =============================================================================

/// Writable user attributes reachable through PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserSetter {
    FamilyName,
    GivenName,
    Active,
    UserName,
    ExternalId,
    Emails,
    Password,
}

/// `(attribute, sub_attribute) -> setter`, compared case-insensitively.
const USER_SETTERS: &[(&str, Option<&str>, UserSetter)] = &[
    ("name", Some("familyName"), UserSetter::FamilyName),
    ("familyName", None, UserSetter::FamilyName),
    ("name", Some("givenName"), UserSetter::GivenName),
    ("givenName", None, UserSetter::GivenName),
    ("active", None, UserSetter::Active),
    ("userName", None, UserSetter::UserName),
    ("externalId", None, UserSetter::ExternalId),
    ("emails", None, UserSetter::Emails),
    ("password", None, UserSetter::Password),
];

impl UserSetter {
    fn lookup(segment: &AttrPathSegment) -> Option<Self> {
        if !segment.in_schema(SCHEMA_USER) {
            return None;
        }
        USER_SETTERS
            .iter()
            .find(|(attr, sub, _)| segment.matches(attr, *sub))
            .map(|(_, _, setter)| *setter)
    }

    fn apply(self, user: &mut User, path: &str, value: &Value) -> ScimResult<()> {
        match self {
            UserSetter::FamilyName => user.last_name = string_attr(Some(value), path)?,
            UserSetter::GivenName => user.first_name = string_attr(Some(value), path)?,
            UserSetter::UserName => user.username = string_attr(Some(value), path)?,
            UserSetter::ExternalId => user.external_id = string_attr(Some(value), path)?,
            UserSetter::Active => {
                user.is_active = value
                    .as_bool()
                    .ok_or_else(|| type_error(path, "boolean", value))?;
            }
            UserSetter::Emails => user.email = parse_emails(value)?,
            UserSetter::Password => {
                user.password = hash_optional(&string_attr(Some(value), path)?);
            }
        }
        Ok(())
    }
}

/// PATCH adapter over one user.
#[derive(Debug, Clone)]
pub struct UserAdapter {
    pub user: User,
}

impl UserAdapter {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    fn set(&mut self, path: &AttrPath, value: &Value) -> ScimResult<()> {
        if path.is_complex() {
            return Err(ScimError::not_implemented());
        }
        let segment = path.first_path();

        // `name` with an object value sets each sub-attribute
        if segment.matches("name", None)
            && segment.in_schema(SCHEMA_USER)
            && let Value::Object(parts) = value
        {
            for (sub, sub_value) in parts {
                let sub_segment = AttrPathSegment::new("name", Some(sub.as_str()), None);
                let setter =
                    UserSetter::lookup(&sub_segment).ok_or_else(ScimError::not_implemented)?;
                setter.apply(&mut self.user, &format!("name.{}", sub), sub_value)?;
            }
            return Ok(());
        }

        let setter = UserSetter::lookup(segment).ok_or_else(ScimError::not_implemented)?;
        setter.apply(&mut self.user, path.as_str(), value)
    }

    fn validate(&self) -> ScimResult<()> {
        self.user
            .fields()
            .validate()
            .map_err(|e| ScimError::bad_request(format!("Invalid user: {}", e)))
    }
}

#[async_trait::async_trait]
impl PatchAdapter for UserAdapter {
    async fn handle_add(
        &mut self,
        _tx: &mut dyn PatchTransaction,
        path: &AttrPath,
        value: &Value,
    ) -> ScimResult<()> {
        // single-valued attributes: add replaces
        self.set(path, value)
    }

    async fn handle_replace(
        &mut self,
        _tx: &mut dyn PatchTransaction,
        path: &AttrPath,
        value: &Value,
    ) -> ScimResult<()> {
        self.set(path, value)
    }

    async fn save(&self, tx: &mut dyn PatchTransaction) -> ScimResult<()> {
        self.validate()?;
        tx.save_user(&self.user).await?;
        Ok(())
    }
}

// =============================================================================
// Group PATCH
// =============================================================================

/// PATCH adapter over one group and its membership.
#[derive(Debug, Clone)]
pub struct GroupAdapter {
    pub group: GroupWithMembers,
}

impl GroupAdapter {
    pub fn new(group: Group, members: BTreeSet<i64>) -> Self {
        Self {
            group: GroupWithMembers { group, members },
        }
    }

    fn is_members_path(path: &AttrPath) -> bool {
        let segment = path.first_path();
        !path.is_complex() && segment.matches("members", None) && segment.in_schema(SCHEMA_GROUP)
    }

    /// Member ids named in a `[{"value": id}, ...]` list, verified to exist.
    async fn member_ids(
        tx: &mut dyn PatchTransaction,
        value: &Value,
        missing_message: &str,
    ) -> ScimResult<BTreeSet<i64>> {
        let entries = match value {
            Value::Null => return Ok(BTreeSet::new()),
            Value::Array(entries) => entries,
            other => return Err(type_error("members", "array", other)),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let id = match entry.get("value") {
                Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
                Some(Value::Number(n)) => n.as_i64(),
                _ => None,
            }
            .ok_or_else(|| ScimError::bad_request("Invalid member value"))?;
            ids.insert(id);
        }

        if ids.is_empty() {
            return Ok(ids);
        }
        let wanted: Vec<i64> = ids.iter().copied().collect();
        let existing = tx.existing_user_ids(&wanted).await?;
        if existing.len() != wanted.len() {
            return Err(ScimError::bad_request(missing_message));
        }
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl PatchAdapter for GroupAdapter {
    async fn handle_add(
        &mut self,
        tx: &mut dyn PatchTransaction,
        path: &AttrPath,
        value: &Value,
    ) -> ScimResult<()> {
        if !Self::is_members_path(path) {
            return Err(ScimError::not_implemented());
        }
        let ids = Self::member_ids(tx, value, "Can not add a non-existent user to group").await?;
        self.group.members.extend(ids);
        Ok(())
    }

    async fn handle_remove(
        &mut self,
        tx: &mut dyn PatchTransaction,
        path: &AttrPath,
        value: &Value,
    ) -> ScimResult<()> {
        if !Self::is_members_path(path) {
            return Err(ScimError::not_implemented());
        }
        let ids =
            Self::member_ids(tx, value, "Can not remove a non-existent user from group").await?;
        self.group.members.retain(|id| !ids.contains(id));
        Ok(())
    }

    async fn handle_replace(
        &mut self,
        _tx: &mut dyn PatchTransaction,
        path: &AttrPath,
        value: &Value,
    ) -> ScimResult<()> {
        let segment = path.first_path();
        if path.is_complex() || !segment.in_schema(SCHEMA_GROUP) {
            return Err(ScimError::not_implemented());
        }

        if segment.matches("name", None) {
            // `[{"value": "..."}]` or a plain string
            let name = match value {
                Value::Array(entries) => entries
                    .first()
                    .and_then(|e| e.get("value"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ScimError::bad_request("Invalid group name value"))?,
                other => string_attr(Some(other), path.as_str())?,
            };
            self.group.group.name = name;
        } else if segment.matches("displayName", None) {
            self.group.group.name = string_attr(Some(value), path.as_str())?;
        } else if segment.matches("externalId", None) {
            self.group.group.external_id = string_attr(Some(value), path.as_str())?;
        } else {
            return Err(ScimError::not_implemented());
        }
        Ok(())
    }

    async fn save(&self, tx: &mut dyn PatchTransaction) -> ScimResult<()> {
        GroupFields {
            name: self.group.group.name.clone(),
            external_id: self.group.group.external_id.clone(),
        }
        .validate()
        .map_err(|e| ScimError::bad_request(format!("Invalid group: {}", e)))?;
        tx.save_group(&self.group).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::scim::{
        PatchOperation,
        patch::{handle_operations, tests::FakeTransaction},
    };

    fn rford() -> User {
        User {
            id: 7,
            username: "rford".into(),
            external_id: String::new(),
            first_name: "Robert".into(),
            last_name: "Ford".into(),
            email: "rford@westworld.com".into(),
            password: String::new(),
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    fn ops(value: Value) -> Vec<PatchOperation> {
        serde_json::from_value(value).unwrap()
    }

    async fn patch_user(user: User, operations: Value) -> (UserAdapter, ScimResult<()>) {
        let mut adapter = UserAdapter::new(user);
        let (tx, _log) = FakeTransaction::boxed(vec![]);
        let result = handle_operations(&mut adapter, tx, &ops(operations)).await;
        (adapter, result)
    }

    #[test]
    fn test_user_to_scim() {
        let locations = Locations::new("https://idp.example.com/");
        let groups = vec![Group {
            id: 3,
            name: "Hosts".into(),
            external_id: String::new(),
        }];
        let scim = user_to_scim(&rford(), &groups, &locations);
        let json = serde_json::to_value(&scim).unwrap();

        assert_eq!(json["id"], "7");
        assert_eq!(json["userName"], "rford");
        assert_eq!(json["displayName"], "Robert Ford");
        assert_eq!(json["name"]["formatted"], "Robert Ford");
        assert_eq!(json["emails"][0]["value"], "rford@westworld.com");
        assert_eq!(json["emails"][0]["primary"], true);
        assert_eq!(json["groups"][0]["$ref"], "https://idp.example.com/scim/v2/Groups/3");
        assert_eq!(json["meta"]["location"], "https://idp.example.com/scim/v2/Users/7");
        assert_eq!(json["meta"]["resourceType"], "User");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_group_to_scim() {
        let locations = Locations::new("https://idp.example.com");
        let group = Group {
            id: 3,
            name: "Hosts".into(),
            external_id: "ext".into(),
        };
        let json = serde_json::to_value(group_to_scim(&group, &[rford()], &locations)).unwrap();
        assert_eq!(json["displayName"], "Hosts");
        assert_eq!(json["members"][0]["value"], "7");
        assert_eq!(json["members"][0]["display"], "Robert Ford");
        assert_eq!(json["members"][0]["$ref"], "https://idp.example.com/scim/v2/Users/7");
    }

    #[test]
    fn test_parse_emails_prefers_primary_then_value() {
        let emails = json!([
            {"value": "z@example.com", "primary": true},
            {"value": "a@example.com"},
            {"value": "b@example.com", "primary": true}
        ]);
        assert_eq!(parse_emails(&emails).unwrap(), "b@example.com");

        let emails = json!([{"value": "z@example.com"}, {"value": "a@example.com"}]);
        assert_eq!(parse_emails(&emails).unwrap(), "a@example.com");
    }

    #[test]
    fn test_parse_emails_object_form() {
        let email = json!({"value": "  onelogin@example.com ", "primary": true});
        assert_eq!(parse_emails(&email).unwrap(), "onelogin@example.com");
    }

    #[test]
    fn test_parse_emails_invalid() {
        for value in [json!([]), json!([{"value": "not-an-email"}]), json!("x@y.com"), json!({})] {
            assert_eq!(
                parse_emails(&value).unwrap_err().to_string(),
                "Invalid email value"
            );
        }
    }

    #[test]
    fn test_user_fields_from_body() {
        let body = json!({
            "userName": "dabernathy",
            "name": {"givenName": "Dolores", "familyName": "Abernathy"},
            "emails": [{"value": "dolores@westworld.com", "primary": true}],
            "password": "wyatt",
            "active": false
        });
        let fields = user_fields_from_body(body.as_object().unwrap(), UserFields::default()).unwrap();
        assert_eq!(fields.username, "dabernathy");
        assert_eq!(fields.first_name, "Dolores");
        assert_eq!(fields.email, "dolores@westworld.com");
        assert_eq!(fields.password, hash_password("wyatt"));
        assert!(!fields.is_active);
        assert_eq!(fields.external_id, "");
    }

    #[test]
    fn test_replace_body_keeps_omitted_password_and_email() {
        let base = rford().fields();
        let body = json!({"userName": "rford2"});
        let fields = user_fields_from_body(body.as_object().unwrap(), base).unwrap();
        assert_eq!(fields.email, "rford@westworld.com");
        assert_eq!(fields.first_name, "");
        assert!(fields.is_active);
    }

    #[test]
    fn test_body_active_must_be_boolean() {
        let body = json!({"userName": "x", "active": "yes"});
        let err = user_fields_from_body(body.as_object().unwrap(), UserFields::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"active\" should be of type \"boolean\". Got type \"string\""
        );
    }

    #[test]
    fn test_group_fields_require_name() {
        assert!(group_fields_from_body(json!({}).as_object().unwrap()).is_err());
        let fields =
            group_fields_from_body(json!({"displayName": "Hosts"}).as_object().unwrap()).unwrap();
        assert_eq!(fields.name, "Hosts");
    }

    #[tokio::test]
    async fn test_user_replace_paths() {
        let (adapter, result) = patch_user(
            rford(),
            json!([
                {"op": "replace", "path": "name.familyName", "value": "Lowe"},
                {"op": "replace", "path": "GIVENNAME", "value": "Bernard"},
                {"op": "replace", "path": "urn:ietf:params:scim:schemas:core:2.0:User:userName", "value": "blowe"},
                {"op": "add", "path": "externalId", "value": "00u1"},
                {"op": "replace", "path": "active", "value": false},
                {"op": "replace", "path": "password", "value": "arnold"}
            ]),
        )
        .await;
        result.unwrap();

        let user = adapter.user;
        assert_eq!(user.last_name, "Lowe");
        assert_eq!(user.first_name, "Bernard");
        assert_eq!(user.username, "blowe");
        assert_eq!(user.external_id, "00u1");
        assert!(!user.is_active);
        assert_eq!(user.password, hash_password("arnold"));
    }

    #[tokio::test]
    async fn test_user_replace_without_path_and_name_object() {
        let (adapter, result) = patch_user(
            rford(),
            json!([{"op": "replace", "value": {
                "name": {"givenName": "Arnold", "familyName": "Weber"},
                "emails": [{"value": "arnold@westworld.com", "primary": true}]
            }}]),
        )
        .await;
        result.unwrap();
        assert_eq!(adapter.user.first_name, "Arnold");
        assert_eq!(adapter.user.last_name, "Weber");
        assert_eq!(adapter.user.email, "arnold@westworld.com");
    }

    #[tokio::test]
    async fn test_user_patch_is_atomic() {
        let (adapter, result) = patch_user(
            rford(),
            json!([
                {"op": "replace", "path": "name.familyName", "value": "X"},
                {"op": "replace", "path": "emails", "value": [{"value": "nope"}]}
            ]),
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "Invalid email value");
        assert_eq!(adapter.user.last_name, "Ford");
        assert_eq!(adapter.user.email, "rford@westworld.com");
    }

    #[tokio::test]
    async fn test_user_unsupported_paths() {
        for operations in [
            json!([{"op": "replace", "path": "nickName", "value": "x"}]),
            json!([{"op": "replace", "path": "emails[type eq \"work\"].value", "value": "x@y.com"}]),
            json!([{"op": "remove", "path": "externalId"}]),
            json!([{"op": "replace", "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:department", "value": "x"}]),
        ] {
            let (_, result) = patch_user(rford(), operations).await;
            assert_eq!(result.unwrap_err(), ScimError::not_implemented());
        }
    }

    #[tokio::test]
    async fn test_user_active_type_error() {
        let (_, result) = patch_user(
            rford(),
            json!([{"op": "replace", "path": "active", "value": "False"}]),
        )
        .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "\"active\" should be of type \"boolean\". Got type \"string\""
        );
    }

    fn hosts() -> GroupAdapter {
        GroupAdapter::new(
            Group {
                id: 3,
                name: "Hosts".into(),
                external_id: String::new(),
            },
            BTreeSet::from([1]),
        )
    }

    #[tokio::test]
    async fn test_group_members_add_and_remove() {
        let mut adapter = hosts();
        let (tx, log) = FakeTransaction::boxed(vec![1, 2, 3]);
        let operations = ops(json!([
            {"op": "add", "path": "members", "value": [{"value": "2"}, {"value": 3}]},
            {"op": "remove", "path": "members", "value": [{"value": "1"}]}
        ]));

        handle_operations(&mut adapter, tx, &operations).await.unwrap();

        assert_eq!(adapter.group.members, BTreeSet::from([2, 3]));
        assert!(log.lock().unwrap().committed);
    }

    #[tokio::test]
    async fn test_group_add_unknown_member() {
        let mut adapter = hosts();
        let (tx, log) = FakeTransaction::boxed(vec![1, 2]);
        let operations = ops(json!([
            {"op": "replace", "path": "displayName", "value": "Guests"},
            {"op": "add", "path": "members", "value": [{"value": "2"}, {"value": "99"}]}
        ]));

        let err = handle_operations(&mut adapter, tx, &operations)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Can not add a non-existent user to group");
        assert_eq!(adapter.group.group.name, "Hosts");
        assert_eq!(adapter.group.members, BTreeSet::from([1]));
        assert!(log.lock().unwrap().rolled_back);
    }

    #[tokio::test]
    async fn test_group_remove_unknown_member() {
        let mut adapter = hosts();
        let (tx, _log) = FakeTransaction::boxed(vec![1]);
        let operations = ops(json!([{"op": "remove", "path": "members", "value": [{"value": "5"}]}]));

        let err = handle_operations(&mut adapter, tx, &operations)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Can not remove a non-existent user from group");
    }

    #[tokio::test]
    async fn test_group_replace_name_forms() {
        let mut adapter = hosts();
        let (tx, _log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([
            {"op": "replace", "path": "name", "value": [{"value": "Guests"}]},
            {"op": "replace", "path": "externalId", "value": "ext-9"}
        ]));
        handle_operations(&mut adapter, tx, &operations).await.unwrap();
        assert_eq!(adapter.group.group.name, "Guests");
        assert_eq!(adapter.group.group.external_id, "ext-9");

        let (tx, _log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([{"op": "replace", "value": {"displayName": "Admins"}}]));
        handle_operations(&mut adapter, tx, &operations).await.unwrap();
        assert_eq!(adapter.group.group.name, "Admins");
    }

    #[tokio::test]
    async fn test_group_unsupported_paths() {
        for operations in [
            json!([{"op": "remove", "path": "members[value eq \"1\"]"}]),
            json!([{"op": "replace", "path": "members", "value": []}]),
            json!([{"op": "add", "path": "displayName", "value": "x"}]),
        ] {
            let mut adapter = hosts();
            let (tx, _log) = FakeTransaction::boxed(vec![1]);
            let err = handle_operations(&mut adapter, tx, &ops(operations))
                .await
                .unwrap_err();
            assert_eq!(err, ScimError::not_implemented());
        }
    }
}
