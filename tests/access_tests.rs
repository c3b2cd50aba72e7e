// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use coinkeep::access::{Role, Session, resolve_role};
use coinkeep::errors::EngineError;
use rusqlite::Connection;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    coinkeep::db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO users(name) VALUES('alice');
        INSERT INTO users(name) VALUES('bob');
        INSERT INTO users(name) VALUES('carol');
        INSERT INTO users(name) VALUES('dave');
        INSERT INTO budgets(name,owner_id) VALUES('family',1);
        INSERT INTO memberships(budget_id,user_id,role) VALUES(1,1,'owner');
        INSERT INTO memberships(budget_id,user_id,role) VALUES(1,2,'editor');
        INSERT INTO memberships(budget_id,user_id,role) VALUES(1,3,'viewer');
        "#,
    )
    .unwrap();
    conn
}

#[test]
fn capability_table_is_fixed() {
    let cases = [
        // role, view, add, modify, manage, delete
        (Role::Owner, true, true, true, true, true),
        (Role::Editor, true, true, true, false, false),
        (Role::Viewer, true, false, false, false, false),
        (Role::NoAccess, false, false, false, false, false),
    ];
    for (role, view, add, modify, manage, delete) in cases {
        assert_eq!(role.can_view(), view, "{role} view");
        assert_eq!(role.can_add_transactions(), add, "{role} add");
        assert_eq!(role.can_modify_financial_data(), modify, "{role} modify");
        assert_eq!(role.can_manage_members(), manage, "{role} manage");
        assert_eq!(role.can_delete_budget(), delete, "{role} delete");
    }
}

#[test]
fn derived_capabilities() {
    assert!(Role::Owner.can_edit() && Role::Owner.is_owner());
    assert!(Role::Editor.can_edit() && !Role::Editor.is_owner());
    assert!(!Role::Viewer.can_edit() && !Role::Viewer.is_owner());
    assert!(!Role::NoAccess.can_edit() && !Role::NoAccess.is_owner());
}

#[test]
fn budget_owner_outranks_membership_rows() {
    let conn = setup();
    assert_eq!(resolve_role(&conn, 1, 1).unwrap(), Role::Owner);
}

#[test]
fn stored_roles_resolve() {
    let conn = setup();
    assert_eq!(resolve_role(&conn, 1, 2).unwrap(), Role::Editor);
    assert_eq!(resolve_role(&conn, 1, 3).unwrap(), Role::Viewer);
}

#[test]
fn non_member_has_no_access() {
    let conn = setup();
    assert_eq!(resolve_role(&conn, 1, 4).unwrap(), Role::NoAccess);
}

#[test]
fn unknown_budget_is_not_found() {
    let conn = setup();
    let err = resolve_role(&conn, 9, 1).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[test]
fn session_carries_resolved_role() {
    let conn = setup();
    let session = Session::resolve(&conn, 1, 2).unwrap();
    assert_eq!(session.user_id, 2);
    assert_eq!(session.budget_id, 1);
    assert_eq!(session.role, Role::Editor);
}

#[test]
fn role_strings_round_trip() {
    for role in [Role::Owner, Role::Editor, Role::Viewer, Role::NoAccess] {
        assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
    }
    assert!("admin".parse::<Role>().is_err());
}
