// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::clear_all_data;
use anyhow::{Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    if !m.get_flag("yes") {
        bail!("Refusing to delete mirrored data without --yes");
    }
    clear_all_data(conn)?;
    println!("Cleared all accounts, transactions, categories and watermarks.");
    Ok(())
}
