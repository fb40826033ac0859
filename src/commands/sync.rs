// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::error::{Error, ErrorKind};
use crate::models::{SyncProgress, SyncStage};
use crate::sync::{perform_full_sync, perform_incremental_sync};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, settings: &Settings, m: &clap::ArgMatches) -> Result<()> {
    let quiet = m.get_flag("quiet");
    let mut print_progress = |p: &SyncProgress| {
        if !quiet || p.stage == SyncStage::Complete {
            println!("{}", progress_line(p));
        }
    };
    match m.subcommand() {
        Some(("full", _)) => {
            perform_full_sync(conn, settings, Some(&mut print_progress)).map_err(explain)?;
        }
        Some(("incremental", _)) => {
            perform_incremental_sync(conn, settings, Some(&mut print_progress))
                .map_err(explain)?;
        }
        _ => {}
    }
    Ok(())
}

pub fn progress_line(p: &SyncProgress) -> String {
    match p.total {
        Some(total) => format!("[{}] {}/{} {}", p.stage, p.current, total, p.message),
        None => format!("[{}] {} {}", p.stage, p.current, p.message),
    }
}

/// Attach the next step the user should take to a sync error.
pub fn explain(e: Error) -> anyhow::Error {
    let hint = match (&e, e.kind()) {
        (Error::NoPriorSync, _) => "run `upmirror sync full` first",
        (Error::SyncInProgress, _) => "wait for the running sync to finish; a lock left by a crashed run expires after 15 minutes",
        (_, ErrorKind::Configuration) => "set UP_BANK_API_TOKEN and try again",
        (Error::RemoteApi { status: 401, .. }, _) => "the API token was rejected; generate a new one",
        (Error::Transport(_), _) => "check your network connection and retry",
        (_, ErrorKind::Remote) => "the bank API refused the request; retry later",
        (_, ErrorKind::Store) => "the local database could not be written; check disk space and permissions",
        (_, ErrorKind::Precondition) => "retry once the precondition holds",
    };
    anyhow!("{} ({})", e, hint)
}
