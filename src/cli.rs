// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

pub fn build_cli() -> Command {
    Command::new("upmirror")
        .version(crate_version!())
        .about("Mirror an Up Bank ledger into a local SQLite store")
        .subcommand(Command::new("init").about("Create the local store and print its path"))
        .subcommand(
            Command::new("sync")
                .about("Pull accounts, categories and transactions from the remote ledger")
                .subcommand(Command::new("full").about("Mirror the complete history"))
                .subcommand(
                    Command::new("incremental")
                        .about("Fetch transactions created since the last sync"),
                )
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .short('q')
                        .global(true)
                        .action(ArgAction::SetTrue)
                        .help("Suppress per-page progress lines"),
                ),
        )
        .subcommand(
            Command::new("status").about("Show watermarks and row counts").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Print as JSON"),
            ),
        )
        .subcommand(Command::new("ping").about("Check that the API token is accepted"))
        .subcommand(
            Command::new("reset")
                .about("Delete all mirrored data and watermarks")
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Confirm deletion"),
                ),
        )
}
