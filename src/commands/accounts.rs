// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::utils::{fmt_money, id_for_account, maybe_print_json, parse_decimal, pretty_table};
use crate::{recorder, store};

pub fn handle(conn: &mut Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let opening = parse_decimal(sub.get_one::<String>("opening").unwrap())?;
            let account = store::create_account(conn, user_id, name, opening)?;
            println!(
                "Added account '{}' with opening balance {}",
                account.name,
                fmt_money(&account.balance)
            );
        }
        Some(("list", sub)) => {
            let accounts = store::list_accounts(conn, user_id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &accounts)? {
                let rows = accounts
                    .into_iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.name,
                            fmt_money(&a.balance),
                            a.status.as_str().to_string(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Id", "Name", "Balance", "Status"], rows));
            }
        }
        Some(("close", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let to = sub.get_one::<String>("to").unwrap();
            let account_id = id_for_account(conn, user_id, name)?;
            let to_id = id_for_account(conn, user_id, to)?;
            recorder::close_account(conn, user_id, account_id, to_id)?;
            println!("Closed account '{}', balance moved to '{}'", name, to);
        }
        Some(("deactivate", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let account_id = id_for_account(conn, user_id, name)?;
            recorder::deactivate_account(conn, user_id, account_id)?;
            println!("Deactivated account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
