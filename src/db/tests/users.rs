//! Shared tests for UserRepo implementations

use std::collections::BTreeSet;

use crate::{
    db::{
        error::DbError,
        repos::{GroupRepo, UserRepo},
    },
    models::{GroupFields, GroupWithMembers, UserFields},
    scim::{
        CompiledQuery, QuerySource, SelectQuery, compile, parse_user_filter,
        password::hash_password,
    },
};

// ============================================================================
// Test Input Helpers
// ============================================================================

fn user_input(username: &str) -> UserFields {
    UserFields {
        username: username.to_string(),
        ..Default::default()
    }
}

fn compiled(filter: &str) -> SelectQuery {
    let parsed = parse_user_filter(filter).expect("filter should parse");
    match compile(&parsed, &QuerySource::users()).expect("filter should compile") {
        CompiledQuery::Select(q) => q,
        CompiledQuery::Empty => panic!("{} compiled to an empty query", filter),
    }
}

pub struct UserTestContext<'a> {
    pub user_repo: &'a dyn UserRepo,
    pub group_repo: &'a dyn GroupRepo,
}

impl UserTestContext<'_> {
    async fn seed(&self, usernames: &[&str]) -> Vec<i64> {
        let mut ids = Vec::new();
        for username in usernames {
            let user = self
                .user_repo
                .create(user_input(username))
                .await
                .expect("Failed to create test user");
            ids.push(user.id);
        }
        ids
    }

    async fn search_usernames(&self, filter: &str) -> Vec<String> {
        self.user_repo
            .search(&compiled(filter), 100, 0)
            .await
            .expect("search should succeed")
            .items
            .into_iter()
            .map(|u| u.username)
            .collect()
    }
}

// ============================================================================
// CRUD
// ============================================================================

pub async fn test_create_and_get(ctx: &UserTestContext<'_>) {
    let input = UserFields {
        username: "rford".into(),
        external_id: "00u1".into(),
        first_name: "Robert".into(),
        last_name: "Ford".into(),
        email: "rford@example.com".into(),
        password: hash_password("pw"),
        is_active: true,
    };
    let created = ctx.user_repo.create(input.clone()).await.expect("create");
    assert!(created.id > 0);
    assert_eq!(created.fields(), input);

    let fetched = ctx
        .user_repo
        .get(created.id)
        .await
        .expect("get")
        .expect("user should exist");
    assert_eq!(fetched, created);
}

pub async fn test_get_missing(ctx: &UserTestContext<'_>) {
    assert!(ctx.user_repo.get(999).await.expect("get").is_none());
}

pub async fn test_duplicate_username_conflicts(ctx: &UserTestContext<'_>) {
    ctx.seed(&["rford"]).await;
    let err = ctx
        .user_repo
        .create(user_input("RFord"))
        .await
        .expect_err("usernames are unique regardless of case");
    assert!(matches!(err, DbError::Conflict(msg) if msg.contains("RFord")));
}

pub async fn test_update(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford", "dabernathy"]).await;
    let mut fields = user_input("robert");
    fields.is_active = false;

    let updated = ctx.user_repo.update(ids[0], fields).await.expect("update");
    assert_eq!(updated.username, "robert");
    assert!(!updated.is_active);

    let err = ctx
        .user_repo
        .update(ids[0], user_input("dabernathy"))
        .await
        .expect_err("rename onto an existing username");
    assert!(matches!(err, DbError::Conflict(_)));

    let err = ctx
        .user_repo
        .update(999, user_input("nobody"))
        .await
        .expect_err("missing user");
    assert!(matches!(err, DbError::NotFound));
}

pub async fn test_delete(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford"]).await;
    ctx.user_repo.delete(ids[0]).await.expect("delete");
    assert!(ctx.user_repo.get(ids[0]).await.expect("get").is_none());
    assert!(matches!(
        ctx.user_repo.delete(ids[0]).await,
        Err(DbError::NotFound)
    ));
}

// ============================================================================
// Listing and search
// ============================================================================

pub async fn test_list_pages_are_stable(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["a", "b", "c", "d"]).await;

    let first = ctx.user_repo.list(2, 0).await.expect("page 1");
    let second = ctx.user_repo.list(2, 2).await.expect("page 2");
    assert_eq!(first.total, 4);
    assert_eq!(second.total, 4);

    let seen: Vec<i64> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|u| u.id)
        .collect();
    assert_eq!(seen, ids);
}

pub async fn test_search_pages_are_stable(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["a", "b", "c", "d"]).await;
    let query = compiled("active eq true");

    let first = ctx.user_repo.search(&query, 2, 0).await.expect("page 1");
    let second = ctx.user_repo.search(&query, 2, 2).await.expect("page 2");
    assert_eq!(first.total, 4);

    let seen: Vec<i64> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|u| u.id)
        .collect();
    assert_eq!(seen, ids);
}

pub async fn test_search_username(ctx: &UserTestContext<'_>) {
    ctx.seed(&["rford", "dabernathy"]).await;
    assert_eq!(ctx.search_usernames(r#"userName eq "RFORD""#).await, ["rford"]);
    assert_eq!(
        ctx.search_usernames(r#"userName sw "dab""#).await,
        ["dabernathy"]
    );
    assert!(ctx.search_usernames(r#"userName co "%""#).await.is_empty());
}

pub async fn test_search_empty_store(ctx: &UserTestContext<'_>) {
    let page = ctx
        .user_repo
        .search(&compiled(r#"userName eq "rford""#), 50, 0)
        .await
        .expect("search");
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

pub async fn test_or_is_union_of_operands(ctx: &UserTestContext<'_>) {
    ctx.seed(&["rford", "dabernathy", "bernard", "maeve"]).await;

    let mut expected = ctx.search_usernames(r#"userName sw "r""#).await;
    expected.extend(ctx.search_usernames(r#"userName co "ber""#).await);
    let expected: BTreeSet<String> = expected.into_iter().collect();

    let union = ctx
        .search_usernames(r#"userName sw "r" or userName co "ber""#)
        .await;
    assert_eq!(union.iter().cloned().collect::<BTreeSet<_>>(), expected);
    assert_eq!(union.len(), expected.len());

    let page = ctx
        .user_repo
        .search(&compiled(r#"userName sw "r" or userName co "ber""#), 100, 0)
        .await
        .expect("search");
    assert_eq!(page.total as usize, expected.len());
}

pub async fn test_active_present_ignores_value(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford", "dabernathy"]).await;
    let mut fields = user_input("dabernathy");
    fields.is_active = false;
    ctx.user_repo.update(ids[1], fields).await.expect("update");

    assert_eq!(
        ctx.search_usernames("active pr").await,
        ["rford", "dabernathy"]
    );
    assert_eq!(ctx.search_usernames("active eq false").await, ["dabernathy"]);
}

pub async fn test_search_password(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford", "dabernathy"]).await;
    let mut fields = user_input("rford");
    fields.password = hash_password("secret");
    ctx.user_repo.update(ids[0], fields).await.expect("update");

    assert_eq!(
        ctx.search_usernames(r#"password eq "secret""#).await,
        ["rford"]
    );
    assert_eq!(
        ctx.search_usernames(r#"userName eq "rford" and password eq "secret""#)
            .await,
        ["rford"]
    );
    assert!(
        ctx.search_usernames(r#"userName eq "rford" and password eq "wrong""#)
            .await
            .is_empty()
    );
    assert_eq!(ctx.search_usernames("password pr").await, ["rford"]);
}

pub async fn test_search_created(ctx: &UserTestContext<'_>) {
    ctx.seed(&["rford"]).await;
    assert_eq!(
        ctx.search_usernames(r#"meta.created gt "2000-01-01T00:00:00Z""#)
            .await,
        ["rford"]
    );
    assert!(
        ctx.search_usernames(r#"meta.created lt "2000-01-01T00:00:00Z""#)
            .await
            .is_empty()
    );
}

pub async fn test_search_by_id(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford", "dabernathy"]).await;
    let filter = format!(r#"id eq "{}""#, ids[1]);
    assert_eq!(ctx.search_usernames(&filter).await, ["dabernathy"]);
}

// ============================================================================
// Groups and PATCH transactions
// ============================================================================

pub async fn test_groups_of(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford"]).await;
    let group = ctx
        .group_repo
        .create(GroupFields {
            name: "Hosts".into(),
            external_id: String::new(),
        })
        .await
        .expect("create group");

    let mut tx = ctx.group_repo.begin_patch().await.expect("begin");
    tx.save_group(&GroupWithMembers {
        group: group.clone(),
        members: [ids[0]].into_iter().collect(),
    })
    .await
    .expect("save group");
    tx.commit().await.expect("commit");

    let groups = ctx.user_repo.groups_of(ids[0]).await.expect("groups_of");
    assert_eq!(groups, vec![group]);

    // Deleting the user drops the membership
    ctx.user_repo.delete(ids[0]).await.expect("delete");
    assert!(
        ctx.group_repo
            .member_ids(groups[0].id)
            .await
            .expect("member ids")
            .is_empty()
    );
}

pub async fn test_patch_transaction_commit(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford"]).await;
    let mut user = ctx.user_repo.get(ids[0]).await.expect("get").expect("user");
    user.last_name = "Ford".into();

    let mut tx = ctx.user_repo.begin_patch().await.expect("begin");
    assert_eq!(
        tx.existing_user_ids(&[ids[0], 999]).await.expect("ids"),
        vec![ids[0]]
    );
    tx.save_user(&user).await.expect("save");
    tx.commit().await.expect("commit");

    let stored = ctx.user_repo.get(ids[0]).await.expect("get").expect("user");
    assert_eq!(stored.last_name, "Ford");
}

pub async fn test_patch_transaction_rollback(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford"]).await;
    let mut user = ctx.user_repo.get(ids[0]).await.expect("get").expect("user");
    user.last_name = "Ford".into();

    let mut tx = ctx.user_repo.begin_patch().await.expect("begin");
    tx.save_user(&user).await.expect("save");
    tx.rollback().await.expect("rollback");

    let stored = ctx.user_repo.get(ids[0]).await.expect("get").expect("user");
    assert_eq!(stored.last_name, "");
}

pub async fn test_patch_transaction_conflict(ctx: &UserTestContext<'_>) {
    let ids = ctx.seed(&["rford", "dabernathy"]).await;
    let mut user = ctx.user_repo.get(ids[0]).await.expect("get").expect("user");
    user.username = "dabernathy".into();

    let mut tx = ctx.user_repo.begin_patch().await.expect("begin");
    let err = tx.save_user(&user).await.expect_err("duplicate username");
    assert!(matches!(err, DbError::Conflict(_)));
    tx.rollback().await.expect("rollback");
}

// ============================================================================
// SQLite
// ============================================================================

mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::{SqliteGroupRepo, SqliteUserRepo},
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repos() -> (SqliteUserRepo, SqliteGroupRepo) {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        (SqliteUserRepo::new(pool.clone()), SqliteGroupRepo::new(pool))
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let (user_repo, group_repo) = create_repos().await;
                let ctx = UserTestContext {
                    user_repo: &user_repo,
                    group_repo: &group_repo,
                };
                super::$name(&ctx).await;
            }
        };
    }

    sqlite_test!(test_create_and_get);
    sqlite_test!(test_get_missing);
    sqlite_test!(test_duplicate_username_conflicts);
    sqlite_test!(test_update);
    sqlite_test!(test_delete);
    sqlite_test!(test_list_pages_are_stable);
    sqlite_test!(test_search_pages_are_stable);
    sqlite_test!(test_search_username);
    sqlite_test!(test_search_empty_store);
    sqlite_test!(test_or_is_union_of_operands);
    sqlite_test!(test_active_present_ignores_value);
    sqlite_test!(test_search_password);
    sqlite_test!(test_search_created);
    sqlite_test!(test_search_by_id);
    sqlite_test!(test_groups_of);
    sqlite_test!(test_patch_transaction_commit);
    sqlite_test!(test_patch_transaction_rollback);
    sqlite_test!(test_patch_transaction_conflict);
}
