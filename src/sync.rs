// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Full and incremental reconciliation of the remote ledger into the store.
//!
//! Pages are upserted one at a time, so a failure midway leaves every earlier
//! page committed. Watermarks are written only after the stream is exhausted.

use crate::config::{MAX_PAGE_SIZE, Settings};
use crate::db::{self, LAST_FULL_SYNC, LAST_INCREMENTAL_SYNC};
use crate::error::{Error, Result};
use crate::models::{SyncProgress, SyncStage, SyncStatus};
use crate::remote::{LedgerSource, RemoteCategory, TransactionFilter, UpClient};
use crate::transform::{CategoryIndex, to_local_account, to_local_category, to_local_transaction};
use crate::utils::now_timestamp;
use rusqlite::Connection;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

pub type ProgressCallback<'a> = &'a mut dyn FnMut(&SyncProgress);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Accounts,
    Categories,
    Transactions,
    Complete,
    Failed,
}

static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

/// Store-wide claim on running a sync, recorded in `sync_metadata` so that
/// separate processes on the same file see each other.
///
/// Released explicitly with [`SyncGuard::release`]; a run that dies without
/// releasing leaves a lock that goes stale after
/// [`db::SYNC_LOCK_STALE_SECS`].
#[derive(Debug)]
pub struct SyncGuard {
    owner: String,
}

impl SyncGuard {
    pub fn acquire(conn: &Connection) -> Result<Self> {
        let owner = format!(
            "pid {} run {} at {}",
            process::id(),
            NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            now_timestamp()
        );
        if !db::try_acquire_sync_lock(conn, &owner)? {
            return Err(Error::SyncInProgress);
        }
        debug!(%owner, "sync lock acquired");
        Ok(Self { owner })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Keeps a long run from looking stale.
    pub fn heartbeat(&self, conn: &Connection) -> Result<()> {
        if !db::refresh_sync_lock(conn, &self.owner)? {
            warn!(owner = %self.owner, "sync lock was taken over");
        }
        Ok(())
    }

    pub fn release(self, conn: &Connection) {
        if let Err(e) = db::release_sync_lock(conn, &self.owner) {
            warn!(owner = %self.owner, error = %e, "could not release sync lock");
        }
    }
}

struct Reporter<'a> {
    cb: Option<ProgressCallback<'a>>,
}

impl Reporter<'_> {
    fn emit(&mut self, stage: SyncStage, current: u64, total: Option<u64>, message: String) {
        if let Some(cb) = self.cb.as_deref_mut() {
            cb(&SyncProgress {
                stage,
                current,
                total,
                message,
            });
        }
    }
}

pub struct SyncEngine<'c, S> {
    conn: &'c mut Connection,
    source: S,
    page_size: u32,
    state: SyncState,
}

impl<'c, S: LedgerSource> SyncEngine<'c, S> {
    pub fn new(conn: &'c mut Connection, source: S) -> Self {
        Self {
            conn,
            source,
            page_size: MAX_PAGE_SIZE,
            state: SyncState::Idle,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn status(&self) -> Result<SyncStatus> {
        db::get_sync_status(&*self.conn)
    }

    /// Mirrors everything and establishes both watermarks. Returns the number
    /// of transactions written.
    pub fn full_sync(&mut self, progress: Option<ProgressCallback<'_>>) -> Result<u64> {
        let guard = SyncGuard::acquire(&*self.conn)?;
        let mut reporter = Reporter { cb: progress };
        let result = self.run_full(&guard, &mut reporter);
        guard.release(&*self.conn);
        self.finish("full", result)
    }

    /// Pulls transactions created since the last incremental watermark.
    /// Fails with [`Error::NoPriorSync`] before touching the store if no full
    /// sync has run.
    pub fn incremental_sync(&mut self, progress: Option<ProgressCallback<'_>>) -> Result<u64> {
        let guard = SyncGuard::acquire(&*self.conn)?;
        let mut reporter = Reporter { cb: progress };
        let result = self.run_incremental(&guard, &mut reporter);
        guard.release(&*self.conn);
        self.finish("incremental", result)
    }

    fn run_full(&mut self, guard: &SyncGuard, reporter: &mut Reporter<'_>) -> Result<u64> {
        // Captured before the first request so nothing created mid-run falls
        // behind the watermark.
        let started = now_timestamp();
        info!(since = "beginning", "full sync started");

        self.sync_accounts(reporter)?;

        self.enter(SyncState::Categories);
        reporter.emit(SyncStage::Categories, 0, None, "Fetching categories...".into());
        let remote_categories = self.source.list_categories()?;
        let synced_at = now_timestamp();
        let categories: Vec<_> = remote_categories
            .iter()
            .map(|c| to_local_category(c, &synced_at))
            .collect();
        let n = db::upsert_categories(self.conn, &categories)? as u64;
        info!(stage = "categories", count = n, "categories synced");
        reporter.emit(
            SyncStage::Categories,
            n,
            Some(n),
            format!("Synced {} categories", n),
        );

        let filter = TransactionFilter {
            page_size: Some(self.page_size),
            ..Default::default()
        };
        let index = CategoryIndex::from_remote(&remote_categories);
        let total = self.sync_transactions(filter, &index, guard, reporter, "transactions")?;

        db::set_watermarks(
            self.conn,
            &[(LAST_FULL_SYNC, started.as_str()), (LAST_INCREMENTAL_SYNC, started.as_str())],
        )?;
        reporter.emit(
            SyncStage::Complete,
            total,
            Some(total),
            format!("Full sync complete! {} transactions synced.", total),
        );
        info!(count = total, watermark = %started, "full sync complete");
        Ok(total)
    }

    fn run_incremental(&mut self, guard: &SyncGuard, reporter: &mut Reporter<'_>) -> Result<u64> {
        let since = db::get_watermark(&*self.conn, LAST_INCREMENTAL_SYNC)?.ok_or(Error::NoPriorSync)?;
        let started = now_timestamp();
        info!(%since, "incremental sync started");

        self.sync_accounts(reporter)?;

        // Index only: categories are refreshed by full syncs.
        let remote_categories: Vec<RemoteCategory> = self.source.list_categories()?;
        let index = CategoryIndex::from_remote(&remote_categories);
        debug!(categories = remote_categories.len(), "category index rebuilt");

        let filter = TransactionFilter {
            since: Some(since),
            page_size: Some(self.page_size),
            ..Default::default()
        };
        let count = self.sync_transactions(filter, &index, guard, reporter, "new transactions")?;

        db::set_watermark(&*self.conn, LAST_INCREMENTAL_SYNC, &started)?;
        let message = if count > 0 {
            format!("Synced {} new transaction(s)", count)
        } else {
            "No new transactions".to_string()
        };
        reporter.emit(SyncStage::Complete, count, Some(count), message);
        info!(count, watermark = %started, "incremental sync complete");
        Ok(count)
    }

    fn sync_accounts(&mut self, reporter: &mut Reporter<'_>) -> Result<u64> {
        self.enter(SyncState::Accounts);
        reporter.emit(SyncStage::Accounts, 0, None, "Fetching accounts...".into());
        let synced_at = now_timestamp();
        let accounts: Vec<_> = self
            .source
            .list_accounts()?
            .iter()
            .map(|a| to_local_account(a, &synced_at))
            .collect();
        let n = db::upsert_accounts(self.conn, &accounts)? as u64;
        info!(stage = "accounts", count = n, "accounts synced");
        reporter.emit(
            SyncStage::Accounts,
            n,
            Some(n),
            format!("Synced {} account(s)", n),
        );
        Ok(n)
    }

    /// Drives the page stream to exhaustion, committing each page before the
    /// next is requested.
    fn sync_transactions(
        &mut self,
        filter: TransactionFilter,
        index: &CategoryIndex,
        guard: &SyncGuard,
        reporter: &mut Reporter<'_>,
        label: &str,
    ) -> Result<u64> {
        self.enter(SyncState::Transactions);
        reporter.emit(
            SyncStage::Transactions,
            0,
            None,
            format!("Fetching {}...", label),
        );

        let conn = &mut *self.conn;
        let mut synced = 0u64;
        for (page_no, page) in self.source.stream_transactions(filter).enumerate() {
            let page = page?;
            if page.transactions.is_empty() {
                continue;
            }
            let synced_at = now_timestamp();
            let rows: Vec<_> = page
                .transactions
                .iter()
                .map(|t| to_local_transaction(t, index, &synced_at))
                .collect();
            db::upsert_transactions(conn, &rows)?;
            guard.heartbeat(conn)?;
            synced += rows.len() as u64;
            debug!(page = page_no + 1, count = rows.len(), total = synced, "page committed");
            reporter.emit(
                SyncStage::Transactions,
                synced,
                None,
                format!("Synced {} {}...", synced, label),
            );
        }
        Ok(synced)
    }

    fn enter(&mut self, state: SyncState) {
        debug!(from = ?self.state, to = ?state, "sync state");
        self.state = state;
    }

    fn finish(&mut self, kind: &str, result: Result<u64>) -> Result<u64> {
        match result {
            Ok(n) => {
                self.enter(SyncState::Complete);
                Ok(n)
            }
            Err(e) => {
                error!(kind, error = %e, state = ?self.state, "sync failed");
                self.enter(SyncState::Failed);
                Err(e)
            }
        }
    }
}

/// Full sync against the configured remote. Fails with a configuration error
/// before any request if no token is set.
pub fn perform_full_sync(
    conn: &mut Connection,
    settings: &Settings,
    progress: Option<ProgressCallback<'_>>,
) -> Result<u64> {
    let client = UpClient::from_settings(settings)?;
    SyncEngine::new(conn, client)
        .with_page_size(settings.page_size)
        .full_sync(progress)
}

pub fn perform_incremental_sync(
    conn: &mut Connection,
    settings: &Settings,
    progress: Option<ProgressCallback<'_>>,
) -> Result<u64> {
    let client = UpClient::from_settings(settings)?;
    SyncEngine::new(conn, client)
        .with_page_size(settings.page_size)
        .incremental_sync(progress)
}

pub fn get_sync_status(conn: &Connection) -> Result<SyncStatus> {
    db::get_sync_status(conn)
}
