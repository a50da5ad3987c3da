// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::store;
use crate::utils::{parse_kind, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let kind = parse_kind(sub.get_one::<String>("kind").unwrap())?;
            let category = store::create_category(conn, name, kind)?;
            println!("Added {} category '{}'", category.kind.as_str(), category.name);
        }
        Some(("list", sub)) => {
            let kind = sub
                .get_one::<String>("kind")
                .map(|s| parse_kind(s))
                .transpose()?;
            let rows = store::list_categories(conn, kind)?
                .into_iter()
                .map(|c| vec![c.id.to_string(), c.name, c.kind.as_str().to_string()])
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Kind"], rows));
        }
        _ => {}
    }
    Ok(())
}
