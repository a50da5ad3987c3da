// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use tallybook::{cli, commands, db};

fn main() -> Result<()> {
    env_logger::init();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            commands::resolve_user(&conn, &matches)?;
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("user", sub)) => commands::users::handle(&conn, sub)?,
        Some(("account", sub)) => {
            let user_id = commands::resolve_user(&conn, &matches)?;
            commands::accounts::handle(&mut conn, user_id, sub)?;
        }
        Some(("category", sub)) => commands::categories::handle(&conn, sub)?,
        Some(("tx", sub)) => {
            let user_id = commands::resolve_user(&conn, &matches)?;
            commands::transactions::handle(&mut conn, user_id, sub)?;
        }
        Some(("budget", sub)) => {
            let user_id = commands::resolve_user(&conn, &matches)?;
            commands::budgets::handle(&conn, user_id, sub)?;
        }
        Some(("report", sub)) => {
            let user_id = commands::resolve_user(&conn, &matches)?;
            commands::reports::handle(&conn, user_id, sub)?;
        }
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
