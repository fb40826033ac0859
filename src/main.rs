// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use upmirror::config::{self, Settings};
use upmirror::{cli, commands, db, logging};

fn main() -> Result<()> {
    logging::init();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let db_path = config::db_path_from_env()?;
    let mut conn = match &db_path {
        Some(p) => db::open_at(p)?,
        None => db::open_or_init()?,
    };

    match matches.subcommand() {
        Some(("init", _)) => {
            let path = match db_path {
                Some(p) => p,
                None => db::db_path()?,
            };
            println!("Database initialized at {}", path.display());
        }
        Some(("sync", sub)) => commands::sync::handle(&mut conn, &Settings::from_env()?, sub)?,
        Some(("status", sub)) => commands::status::handle(&conn, sub)?,
        Some(("ping", _)) => commands::ping::handle(&Settings::from_env()?)?,
        Some(("reset", sub)) => commands::reset::handle(&mut conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
