// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::store;
use crate::utils::pretty_table;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let user = store::create_user(conn, name)?;
            println!("Added user '{}' (id {})", user.name, user.id);
        }
        Some(("list", _)) => {
            let rows = store::list_users(conn)?
                .into_iter()
                .map(|u| vec![u.id.to_string(), u.name])
                .collect();
            println!("{}", pretty_table(&["Id", "Name"], rows));
        }
        _ => {}
    }
    Ok(())
}
