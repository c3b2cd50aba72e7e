// Copyright (c) 2025 Coinkeep Contributors.
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
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn session_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("user")
            .long("user")
            .required(true)
            .help("Acting user"),
    )
    .arg(
        Arg::new("budget")
            .long("budget")
            .required(true)
            .help("Current budget"),
    )
}

pub fn build_cli() -> Command {
    Command::new("coinkeep")
        .about("Shared-budget ledger with multi-currency accounts, goals, and recurring transactions")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("user")
                .about("Manage users")
                .subcommand(
                    Command::new("add").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage budgets and their members")
                .subcommand(
                    Command::new("create")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("owner").long("owner").required(true)),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("member")
                        .subcommand(
                            Command::new("add")
                                .arg(Arg::new("budget").long("budget").required(true))
                                .arg(Arg::new("user").long("user").required(true))
                                .arg(
                                    Arg::new("role")
                                        .long("role")
                                        .required(true)
                                        .help("owner|editor|viewer|none"),
                                ),
                        )
                        .subcommand(
                            Command::new("list")
                                .arg(Arg::new("budget").long("budget").required(true)),
                        ),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("budget").long("budget").required(true))
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(
                            Arg::new("shared")
                                .long("shared")
                                .action(ArgAction::SetTrue)
                                .help("Visible to budget members with edit rights"),
                        ),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("rm").arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("rm").arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and inspect transactions")
                .subcommand(session_args(
                    Command::new("add")
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("income|expense"),
                        )
                        .arg(
                            Arg::new("currency")
                                .long("currency")
                                .help("Defaults to the account currency"),
                        )
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("category").long("category")),
                ))
                .subcommand(session_args(
                    Command::new("edit")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("kind").long("kind"))
                        .arg(Arg::new("currency").long("currency"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("category").long("category")),
                ))
                .subcommand(session_args(Command::new("rm").arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )))
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(Arg::new("account").long("account"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("goal")
                .about("Savings goals")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("budget").long("budget").required(true))
                        .arg(Arg::new("target").long("target").required(true))
                        .arg(Arg::new("currency").long("currency").required(true)),
                )
                .subcommand(Command::new("list"))
                .subcommand(session_args(
                    Command::new("contribute")
                        .arg(Arg::new("goal").long("goal").required(true))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )),
        )
        .subcommand(
            Command::new("template")
                .about("Recurring transaction templates")
                .subcommand(session_args(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("kind").long("kind").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("currency")
                                .long("currency")
                                .help("Defaults to the account currency"),
                        )
                        .arg(
                            Arg::new("recurrence")
                                .long("recurrence")
                                .required(true)
                                .help("daily|weekly|monthly|yearly"),
                        )
                        .arg(
                            Arg::new("interval")
                                .long("interval")
                                .value_parser(value_parser!(u32))
                                .default_value("1")
                                .help("Every N periods"),
                        )
                        .arg(
                            Arg::new("anchor-day")
                                .long("anchor-day")
                                .value_parser(value_parser!(u32))
                                .help("Day of month 1-31 for monthly/yearly"),
                        )
                        .arg(
                            Arg::new("anchor-weekday")
                                .long("anchor-weekday")
                                .help("mon|tue|wed|thu|fri|sat|sun for weekly"),
                        )
                        .arg(Arg::new("start").long("start").required(true))
                        .arg(Arg::new("category").long("category")),
                ))
                .subcommand(Command::new("list"))
                .subcommand(session_args(
                    Command::new("run").arg(
                        Arg::new("today")
                            .long("today")
                            .help("Override today's date (YYYY-MM-DD)"),
                    ),
                )),
        )
        .subcommand(
            Command::new("import")
                .about("Bulk import")
                .subcommand(session_args(
                    Command::new("transactions")
                        .arg(Arg::new("path").long("path").required(true)),
                )),
        )
        .subcommand(
            Command::new("fx")
                .about("Exchange rates")
                .subcommand(
                    Command::new("set-base")
                        .arg(Arg::new("currency").long("currency").required(true)),
                )
                .subcommand(
                    Command::new("fetch").arg(
                        Arg::new("days")
                            .long("days")
                            .value_parser(value_parser!(usize))
                            .default_value("120"),
                    ),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("convert")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ),
        )
        .subcommand(Command::new("doctor").about("Audit ledger/balance consistency"))
}
