// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod reports;
pub mod transactions;
pub mod users;

use anyhow::Result;
use rusqlite::Connection;

use crate::{store, utils};

/// The acting user comes from the global `--user` flag and is created on
/// first use; the core layers below only ever see the resolved id.
pub fn resolve_user(conn: &Connection, m: &clap::ArgMatches) -> Result<i64> {
    let name = m.get_one::<String>("user").unwrap();
    if let Some(id) = utils::find_user_id(conn, name)? {
        return Ok(id);
    }
    let user = store::create_user(conn, name)?;
    Ok(user.id)
}
