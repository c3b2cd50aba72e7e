// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{EngineError, EngineResult};
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt;
use std::str::FromStr;

/// Role a user holds on a budget. The capability table is fixed: a role is
/// a pure function of the stored string, re-derived on every budget switch
/// and never mutated by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Editor,
    Viewer,
    NoAccess,
}

impl Role {
    pub fn can_view(self) -> bool {
        !matches!(self, Role::NoAccess)
    }

    pub fn can_add_transactions(self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }

    pub fn can_modify_financial_data(self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }

    pub fn can_manage_members(self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn can_delete_budget(self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn can_edit(self) -> bool {
        self.can_add_transactions() || self.can_modify_financial_data()
    }

    pub fn is_owner(self) -> bool {
        self.can_manage_members() && self.can_delete_budget()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
            Role::NoAccess => "none",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            "none" => Ok(Role::NoAccess),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Explicit per-call context: current user, current budget, and the role
/// resolved for that pair. Passed into every engine call instead of being
/// held in session-global state.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub user_id: i64,
    pub budget_id: i64,
    pub role: Role,
}

impl Session {
    pub fn resolve(conn: &Connection, budget_id: i64, user_id: i64) -> EngineResult<Session> {
        let role = resolve_role(conn, budget_id, user_id)?;
        Ok(Session {
            user_id,
            budget_id,
            role,
        })
    }
}

/// Derive the caller's role on a budget. The budget owner is Owner
/// regardless of any membership row; everyone else gets their stored role
/// or NoAccess.
pub fn resolve_role(conn: &Connection, budget_id: i64, user_id: i64) -> EngineResult<Role> {
    let owner_id: Option<i64> = conn
        .query_row(
            "SELECT owner_id FROM budgets WHERE id=?1",
            params![budget_id],
            |r| r.get(0),
        )
        .optional()?;
    let owner_id = owner_id.ok_or_else(|| EngineError::NotFound(format!("budget {}", budget_id)))?;
    if owner_id == user_id {
        return Ok(Role::Owner);
    }

    let stored: Option<String> = conn
        .query_row(
            "SELECT role FROM memberships WHERE budget_id=?1 AND user_id=?2",
            params![budget_id, user_id],
            |r| r.get(0),
        )
        .optional()?;
    match stored {
        Some(s) => s
            .parse::<Role>()
            .map_err(EngineError::Configuration),
        None => Ok(Role::NoAccess),
    }
}
