// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::SyncStatus;
use crate::sync::get_sync_status;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let status = get_sync_status(conn)?;
    if !maybe_print_json(m.get_flag("json"), &status)? {
        println!("{}", pretty_table(&["Field", "Value"], status_rows(&status)));
        if !status.is_initialized {
            println!("No full sync yet. Run `upmirror sync full` to populate the store.");
        }
    }
    Ok(())
}

pub fn status_rows(s: &SyncStatus) -> Vec<Vec<String>> {
    let never = || "never".to_string();
    vec![
        vec!["Initialized".into(), s.is_initialized.to_string()],
        vec![
            "Last full sync".into(),
            s.last_full_sync.clone().unwrap_or_else(never),
        ],
        vec![
            "Last incremental sync".into(),
            s.last_incremental_sync.clone().unwrap_or_else(never),
        ],
        vec!["Accounts".into(), s.total_accounts.to_string()],
        vec!["Transactions".into(), s.total_transactions.to_string()],
        vec!["Categories".into(), s.total_categories.to_string()],
    ]
}
