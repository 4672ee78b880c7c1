//! SCIM 2.0 PATCH Operations
//!
//! Applies the operations of a PATCH request (RFC 7644 Section 3.5.2) to one
//! resource, all or nothing.
//!
//! For each operation:
//!
//! 1. the op code is lower-cased and checked (`add`, `remove`, `replace`);
//!    `remove` must carry a path,
//! 2. an operation without a path whose value is an object becomes one
//!    `(path, value)` pair per key,
//! 3. values of well-known attributes are type-checked,
//! 4. the pair is dispatched to the resource's [`PatchAdapter`].
//!
//! The adapter is saved once after every operation has applied, then the
//! [`PatchTransaction`] commits. Any failure rolls the transaction back and
//! restores the adapter to its state before the request.
//!
//! ## Example
//!
//! ```json
//! {
//!   "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!   "Operations": [
//!     { "op": "replace", "path": "name.familyName", "value": "Ford" },
//!     { "op": "Replace", "value": { "active": false, "externalId": "00u1" } },
//!     { "op": "add", "path": "members", "value": [{ "value": "42" }] }
//!   ]
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    attr_path::AttrPath,
    error::{ScimError, ScimResult},
    types::PatchOperation,
};
use crate::{
    db::DbResult,
    models::{GroupWithMembers, User},
};

/// PATCH op codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpCode {
    Add,
    Remove,
    Replace,
}

impl PatchOpCode {
    /// Case-insensitive op code lookup.
    pub fn parse(op: &str) -> ScimResult<Self> {
        match op.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOpCode::Add),
            "remove" => Ok(PatchOpCode::Remove),
            "replace" => Ok(PatchOpCode::Replace),
            other => Err(ScimError::bad_request(format!(
                "Unknown PATCH op \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for PatchOpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOpCode::Add => write!(f, "add"),
            PatchOpCode::Remove => write!(f, "remove"),
            PatchOpCode::Replace => write!(f, "replace"),
        }
    }
}

/// Store access available while a PATCH request is applied.
///
/// Everything written through one handle becomes visible atomically on
/// [`commit`](PatchTransaction::commit), or not at all.
#[async_trait]
pub trait PatchTransaction: Send {
    /// Read a user inside the transaction.
    async fn load_user(&mut self, id: i64) -> DbResult<Option<User>>;

    /// Read a group and its member ids inside the transaction.
    async fn load_group(&mut self, id: i64) -> DbResult<Option<GroupWithMembers>>;

    /// Which of the given user ids exist.
    async fn existing_user_ids(&mut self, ids: &[i64]) -> DbResult<Vec<i64>>;

    async fn save_user(&mut self, user: &User) -> DbResult<()>;

    /// Persist group attributes and replace its membership.
    async fn save_group(&mut self, group: &GroupWithMembers) -> DbResult<()>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Resource-specific PATCH handlers.
///
/// Adapters hold the in-memory resource being patched. Handlers that do not
/// support a path answer [`ScimError::NotImplemented`].
#[async_trait]
pub trait PatchAdapter: Clone + Send + Sync {
    async fn handle_add(
        &mut self,
        _tx: &mut dyn PatchTransaction,
        _path: &AttrPath,
        _value: &Value,
    ) -> ScimResult<()> {
        Err(ScimError::not_implemented())
    }

    async fn handle_remove(
        &mut self,
        _tx: &mut dyn PatchTransaction,
        _path: &AttrPath,
        _value: &Value,
    ) -> ScimResult<()> {
        Err(ScimError::not_implemented())
    }

    async fn handle_replace(
        &mut self,
        _tx: &mut dyn PatchTransaction,
        _path: &AttrPath,
        _value: &Value,
    ) -> ScimResult<()> {
        Err(ScimError::not_implemented())
    }

    /// Write the in-memory resource through the transaction.
    async fn save(&self, tx: &mut dyn PatchTransaction) -> ScimResult<()>;
}

/// Apply `operations` to `adapter` atomically.
///
/// On error the transaction is rolled back, `adapter` is restored and the
/// original error is returned.
pub async fn handle_operations<A: PatchAdapter>(
    adapter: &mut A,
    mut tx: Box<dyn PatchTransaction>,
    operations: &[PatchOperation],
) -> ScimResult<()> {
    let snapshot = adapter.clone();

    if let Err(err) = apply_operations(adapter, tx.as_mut(), operations).await {
        if let Err(rollback_err) = tx.rollback().await {
            tracing::warn!(error = %rollback_err, "Failed to roll back PATCH transaction");
        }
        *adapter = snapshot;
        return Err(err);
    }

    if let Err(err) = tx.commit().await {
        *adapter = snapshot;
        return Err(err.into());
    }

    Ok(())
}

async fn apply_operations<A: PatchAdapter>(
    adapter: &mut A,
    tx: &mut dyn PatchTransaction,
    operations: &[PatchOperation],
) -> ScimResult<()> {
    for operation in operations {
        let op = PatchOpCode::parse(&operation.op)?;
        if op == PatchOpCode::Remove && operation.path.is_none() {
            return Err(ScimError::no_target(
                "\"path\" must be specified during \"remove\" PATCH calls",
            ));
        }

        for (path, value) in normalize(operation)? {
            validate_value(&path, value)?;
            tracing::debug!(op = %op, path = %path, "Applying PATCH operation");

            match op {
                PatchOpCode::Add => adapter.handle_add(tx, &path, value).await?,
                PatchOpCode::Remove => adapter.handle_remove(tx, &path, value).await?,
                PatchOpCode::Replace => adapter.handle_replace(tx, &path, value).await?,
            }
        }
    }

    adapter.save(tx).await
}

/// Resolve the operation's path, or split a path-less object value into one
/// pair per key.
pub fn normalize(operation: &PatchOperation) -> ScimResult<Vec<(AttrPath, &Value)>> {
    match (&operation.path, &operation.value) {
        (Some(path), value) => Ok(vec![(AttrPath::parse(path)?, value)]),
        (None, Value::Object(map)) => map
            .iter()
            .map(|(key, value)| Ok((AttrPath::parse(key)?, value)))
            .collect(),
        (None, _) => Err(ScimError::bad_request(
            "No path and operation value is not an object. Can not determine attribute.",
        )),
    }
}

/// Type-check values of attributes with a fixed JSON type.
pub fn validate_value(path: &AttrPath, value: &Value) -> ScimResult<()> {
    if path.is_complex() {
        return Ok(());
    }

    let first = path.first_path();
    if first.matches("active", None) && first.uri.is_none() && !value.is_boolean() {
        return Err(ScimError::bad_request(format!(
            "\"{}\" should be of type \"boolean\". Got type \"{}\"",
            path,
            json_type_name(value)
        )));
    }

    Ok(())
}

/// JSON type name used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::scim::ScimErrorType;

    /// Records what the engine did with the transaction.
    #[derive(Debug, Default)]
    pub struct TxLog {
        pub committed: bool,
        pub rolled_back: bool,
        pub saved: usize,
    }

    pub struct FakeTransaction {
        pub log: Arc<Mutex<TxLog>>,
        pub known_users: Vec<i64>,
    }

    impl FakeTransaction {
        pub fn boxed(known_users: Vec<i64>) -> (Box<dyn PatchTransaction>, Arc<Mutex<TxLog>>) {
            let log = Arc::new(Mutex::new(TxLog::default()));
            let tx = Self {
                log: log.clone(),
                known_users,
            };
            (Box::new(tx), log)
        }
    }

    #[async_trait]
    impl PatchTransaction for FakeTransaction {
        async fn load_user(&mut self, _id: i64) -> DbResult<Option<User>> {
            Ok(None)
        }

        async fn load_group(&mut self, _id: i64) -> DbResult<Option<GroupWithMembers>> {
            Ok(None)
        }

        async fn existing_user_ids(&mut self, ids: &[i64]) -> DbResult<Vec<i64>> {
            Ok(ids
                .iter()
                .copied()
                .filter(|id| self.known_users.contains(id))
                .collect())
        }

        async fn save_user(&mut self, _user: &User) -> DbResult<()> {
            self.log.lock().unwrap().saved += 1;
            Ok(())
        }

        async fn save_group(&mut self, _group: &GroupWithMembers) -> DbResult<()> {
            self.log.lock().unwrap().saved += 1;
            Ok(())
        }

        async fn commit(self: Box<Self>) -> DbResult<()> {
            self.log.lock().unwrap().committed = true;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> DbResult<()> {
            self.log.lock().unwrap().rolled_back = true;
            Ok(())
        }
    }

    /// Adapter that records the (op, path) pairs it receives.
    #[derive(Debug, Clone, Default)]
    struct RecordingAdapter {
        seen: Vec<String>,
        fail_on: Option<String>,
    }

    impl RecordingAdapter {
        fn record(&mut self, op: &str, path: &AttrPath) -> ScimResult<()> {
            if self.fail_on.as_deref() == Some(path.as_str()) {
                return Err(ScimError::not_implemented());
            }
            self.seen.push(format!("{} {}", op, path));
            Ok(())
        }
    }

    #[async_trait]
    impl PatchAdapter for RecordingAdapter {
        async fn handle_add(
            &mut self,
            _tx: &mut dyn PatchTransaction,
            path: &AttrPath,
            _value: &Value,
        ) -> ScimResult<()> {
            self.record("add", path)
        }

        async fn handle_replace(
            &mut self,
            _tx: &mut dyn PatchTransaction,
            path: &AttrPath,
            _value: &Value,
        ) -> ScimResult<()> {
            self.record("replace", path)
        }

        async fn save(&self, tx: &mut dyn PatchTransaction) -> ScimResult<()> {
            tx.save_group(&GroupWithMembers {
                group: crate::models::Group {
                    id: 1,
                    name: "g".into(),
                    external_id: String::new(),
                },
                members: Default::default(),
            })
            .await?;
            Ok(())
        }
    }

    fn ops(value: Value) -> Vec<PatchOperation> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_and_single_save() {
        let mut adapter = RecordingAdapter::default();
        let (tx, log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([
            {"op": "Replace", "path": "userName", "value": "bob"},
            {"op": "add", "value": {"externalId": "x", "active": true}}
        ]));

        handle_operations(&mut adapter, tx, &operations).await.unwrap();

        assert_eq!(
            adapter.seen,
            vec!["replace userName", "add active", "add externalId"]
        );
        let log = log.lock().unwrap();
        assert!(log.committed);
        assert!(!log.rolled_back);
        assert_eq!(log.saved, 1);
    }

    #[tokio::test]
    async fn test_unknown_op() {
        let mut adapter = RecordingAdapter::default();
        let (tx, log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([{"op": "Merge", "path": "userName", "value": "x"}]));

        let err = handle_operations(&mut adapter, tx, &operations)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unknown PATCH op \"merge\"");
        assert!(log.lock().unwrap().rolled_back);
    }

    #[tokio::test]
    async fn test_remove_without_path_is_no_target() {
        let mut adapter = RecordingAdapter::default();
        let (tx, _log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([{"op": "remove", "value": {"members": []}}]));

        let err = handle_operations(&mut adapter, tx, &operations)
            .await
            .unwrap_err();

        assert_eq!(err.scim_type(), Some(ScimErrorType::NoTarget));
        assert_eq!(
            err.to_string(),
            "\"path\" must be specified during \"remove\" PATCH calls"
        );
    }

    #[tokio::test]
    async fn test_default_remove_is_not_implemented() {
        let mut adapter = RecordingAdapter::default();
        let (tx, _log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([{"op": "remove", "path": "userName"}]));

        let err = handle_operations(&mut adapter, tx, &operations)
            .await
            .unwrap_err();
        assert_eq!(err, ScimError::not_implemented());
    }

    #[tokio::test]
    async fn test_failure_restores_adapter() {
        let mut adapter = RecordingAdapter {
            seen: vec!["earlier".into()],
            fail_on: Some("nickName".into()),
        };
        let (tx, log) = FakeTransaction::boxed(vec![]);
        let operations = ops(json!([
            {"op": "replace", "path": "userName", "value": "bob"},
            {"op": "replace", "path": "nickName", "value": "b"}
        ]));

        handle_operations(&mut adapter, tx, &operations)
            .await
            .unwrap_err();

        assert_eq!(adapter.seen, vec!["earlier"]);
        let log = log.lock().unwrap();
        assert!(log.rolled_back);
        assert!(!log.committed);
        assert_eq!(log.saved, 0);
    }

    #[test]
    fn test_normalize_requires_object_without_path() {
        let op = PatchOperation::new("replace", None, json!("bob"));
        let err = normalize(&op).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let op = PatchOperation::new("replace", None, json!({"name.familyName": "Ford"}));
        let pairs = normalize(&op).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].0.first_path().matches("name", Some("familyName")));
    }

    #[test]
    fn test_normalize_keeps_client_key_order() {
        let op = PatchOperation::new(
            "replace",
            None,
            json!({"userName": "rford", "name.givenName": "Robert", "active": true}),
        );
        let paths: Vec<_> = normalize(&op)
            .unwrap()
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(paths, ["userName", "name.givenName", "active"]);
    }

    #[test]
    fn test_active_must_be_boolean() {
        let path = AttrPath::parse("active").unwrap();
        let err = validate_value(&path, &json!("false")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"active\" should be of type \"boolean\". Got type \"string\""
        );
        assert!(validate_value(&path, &json!(false)).is_ok());

        let other = AttrPath::parse("userName").unwrap();
        assert!(validate_value(&other, &json!(12)).is_ok());
    }

    #[test]
    fn test_json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
