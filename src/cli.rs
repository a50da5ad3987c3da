// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON instead of a table"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

fn range_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("start")
            .long("start")
            .required(true)
            .help("Range start, YYYY-MM-DD"),
    )
    .arg(
        Arg::new("end")
            .long("end")
            .required(true)
            .help("Range end, YYYY-MM-DD"),
    )
}

fn record_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("account").long("account").required(true))
        .arg(Arg::new("category").long("category").required(true))
        .arg(Arg::new("amount").long("amount").required(true))
        .arg(Arg::new("date").long("date").help("Defaults to today"))
        .arg(Arg::new("desc").long("desc").default_value(""))
}

pub fn build_cli() -> Command {
    Command::new("tallybook")
        .about("Personal income/expense ledger with budgets and trend reports")
        .version(clap::crate_version!())
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .default_value("default")
                .help("Acting user (created on first use)"),
        )
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("user")
                .about("Manage users")
                .subcommand(Command::new("add").arg(Arg::new("name").required(true)))
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("opening")
                                .long("opening")
                                .default_value("0")
                                .help("Opening balance"),
                        ),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("close")
                        .about("Transfer the remaining balance and mark inactive")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("to")
                                .long("to")
                                .required(true)
                                .help("Receiving account"),
                        ),
                )
                .subcommand(
                    Command::new("deactivate")
                        .about("Mark a zero-balance account inactive")
                        .arg(Arg::new("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add").arg(Arg::new("name").required(true)).arg(
                        Arg::new("kind")
                            .long("kind")
                            .required(true)
                            .value_parser(["income", "expense"]),
                    ),
                )
                .subcommand(
                    Command::new("list").arg(
                        Arg::new("kind")
                            .long("kind")
                            .value_parser(["income", "expense"]),
                    ),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and inspect transactions")
                .subcommand(record_args(Command::new("income")))
                .subcommand(record_args(Command::new("expense")))
                .subcommand(
                    Command::new("update")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("category").long("category")),
                )
                .subcommand(
                    Command::new("delete")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("keep-balances")
                                .long("keep-balances")
                                .action(ArgAction::SetTrue)
                                .help("Delete the record without reversing its effect"),
                        ),
                )
                .subcommand(
                    json_flags(Command::new("recent")).arg(
                        Arg::new("limit")
                            .long("limit")
                            .default_value("10")
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    json_flags(Command::new("list"))
                        .arg(
                            Arg::new("page")
                                .long("page")
                                .default_value("1")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("page-size")
                                .long("page-size")
                                .default_value("20")
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(range_args(Command::new("totals")))
                .subcommand(range_args(json_flags(Command::new("by-category"))).arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(["income", "expense"]),
                )),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage budgets and allocations")
                .subcommand(
                    Command::new("create")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("start").long("start").required(true))
                        .arg(
                            Arg::new("period")
                                .long("period")
                                .required(true)
                                .value_parser(["weekly", "monthly", "yearly"]),
                        )
                        .arg(Arg::new("total").long("total").required(true)),
                )
                .subcommand(
                    Command::new("allocate")
                        .arg(Arg::new("budget").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(range_args(json_flags(Command::new("execution")))),
        )
        .subcommand(
            Command::new("report")
                .about("Trend and distribution reports")
                .subcommand(range_args(json_flags(Command::new("trend"))).arg(
                    Arg::new("interval")
                        .long("interval")
                        .default_value("month")
                        .value_parser(["day", "week", "month", "year"]),
                ))
                .subcommand(
                    range_args(json_flags(Command::new("balance-trend"))).arg(
                        Arg::new("accounts")
                            .long("accounts")
                            .help("Comma-separated account names (default: all)"),
                    ),
                )
                .subcommand(range_args(json_flags(Command::new("distribution"))).arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(["income", "expense"]),
                ))
                .subcommand(
                    Command::new("networth")
                        .arg(Arg::new("as-of").long("as-of").help("Defaults to today")),
                ),
        )
}
