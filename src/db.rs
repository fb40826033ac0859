// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Result;
use crate::models::{Account, Category, SyncStatus, Transaction};
use crate::utils::{fmt_timestamp, now_timestamp};
use anyhow::Context;
use chrono::{Duration, Utc};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Upmirror", "upmirror"));

pub const LAST_FULL_SYNC: &str = "last_full_sync";
pub const LAST_INCREMENTAL_SYNC: &str = "last_incremental_sync";
/// `sync_metadata` key of the store-wide sync lock. Its value is the owner.
pub const SYNC_LOCK: &str = "sync_lock";
/// A lock not refreshed for this long belongs to a dead run and may be taken over.
pub const SYNC_LOCK_STALE_SECS: i64 = 15 * 60;

pub fn db_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("upmirror.sqlite"))
}

pub fn open_or_init() -> anyhow::Result<Connection> {
    let path = db_path()?;
    open_at(&path)
}

pub fn open_at(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Create data dir {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS accounts(
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        account_type TEXT NOT NULL CHECK(account_type IN ('SAVER','TRANSACTIONAL','HOME_LOAN')),
        ownership_type TEXT NOT NULL CHECK(ownership_type IN ('INDIVIDUAL','JOINT')),
        balance_value TEXT NOT NULL,
        balance_currency TEXT NOT NULL,
        balance_value_in_base_units INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        synced_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS categories(
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        parent_id TEXT,
        synced_at TEXT NOT NULL,
        FOREIGN KEY(parent_id) REFERENCES categories(id) DEFERRABLE INITIALLY DEFERRED
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('HELD','SETTLED')),
        raw_text TEXT,
        description TEXT NOT NULL,
        message TEXT,
        amount_value TEXT NOT NULL,
        amount_currency TEXT NOT NULL,
        amount_value_in_base_units INTEGER NOT NULL,
        foreign_amount_value TEXT,
        foreign_amount_currency TEXT,
        settled_at TEXT,
        created_at TEXT NOT NULL,
        category_id TEXT,
        category_name TEXT,
        parent_category_id TEXT,
        parent_category_name TEXT,
        synced_at TEXT NOT NULL,
        FOREIGN KEY(account_id) REFERENCES accounts(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at);
    CREATE INDEX IF NOT EXISTS idx_transactions_account_id ON transactions(account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_category_id ON transactions(category_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_category_name ON transactions(category_name);
    CREATE INDEX IF NOT EXISTS idx_transactions_description ON transactions(description);
    CREATE INDEX IF NOT EXISTS idx_transactions_amount ON transactions(amount_value_in_base_units);
    CREATE INDEX IF NOT EXISTS idx_transactions_status_date ON transactions(status, created_at);
    CREATE INDEX IF NOT EXISTS idx_transactions_status_amount ON transactions(status, amount_value_in_base_units);

    CREATE TABLE IF NOT EXISTS sync_metadata(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}

// Each upsert runs in one SQLite transaction: the batch lands whole or not at all.

pub fn upsert_accounts(conn: &mut Connection, accounts: &[Account]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO accounts(id, display_name, account_type, ownership_type,
                balance_value, balance_currency, balance_value_in_base_units, created_at, synced_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
             ON CONFLICT(id) DO UPDATE SET
                display_name=excluded.display_name,
                account_type=excluded.account_type,
                ownership_type=excluded.ownership_type,
                balance_value=excluded.balance_value,
                balance_currency=excluded.balance_currency,
                balance_value_in_base_units=excluded.balance_value_in_base_units,
                created_at=excluded.created_at,
                synced_at=excluded.synced_at",
        )?;
        for a in accounts {
            stmt.execute(params![
                a.id,
                a.display_name,
                a.account_type.as_str(),
                a.ownership_type.as_str(),
                a.balance_value,
                a.balance_currency,
                a.balance_value_in_base_units,
                a.created_at,
                a.synced_at
            ])?;
        }
    }
    tx.commit()?;
    Ok(accounts.len())
}

pub fn upsert_categories(conn: &mut Connection, categories: &[Category]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO categories(id, name, parent_id, synced_at) VALUES (?1,?2,?3,?4)
             ON CONFLICT(id) DO UPDATE SET
                name=excluded.name,
                parent_id=excluded.parent_id,
                synced_at=excluded.synced_at",
        )?;
        for c in categories {
            stmt.execute(params![c.id, c.name, c.parent_id, c.synced_at])?;
        }
    }
    tx.commit()?;
    Ok(categories.len())
}

pub fn upsert_transactions(conn: &mut Connection, transactions: &[Transaction]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions(id, account_id, status, raw_text, description, message,
                amount_value, amount_currency, amount_value_in_base_units,
                foreign_amount_value, foreign_amount_currency, settled_at, created_at,
                category_id, category_name, parent_category_id, parent_category_name, synced_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)
             ON CONFLICT(id) DO UPDATE SET
                account_id=excluded.account_id,
                status=excluded.status,
                raw_text=excluded.raw_text,
                description=excluded.description,
                message=excluded.message,
                amount_value=excluded.amount_value,
                amount_currency=excluded.amount_currency,
                amount_value_in_base_units=excluded.amount_value_in_base_units,
                foreign_amount_value=excluded.foreign_amount_value,
                foreign_amount_currency=excluded.foreign_amount_currency,
                settled_at=excluded.settled_at,
                created_at=excluded.created_at,
                category_id=excluded.category_id,
                category_name=excluded.category_name,
                parent_category_id=excluded.parent_category_id,
                parent_category_name=excluded.parent_category_name,
                synced_at=excluded.synced_at",
        )?;
        for t in transactions {
            stmt.execute(params![
                t.id,
                t.account_id,
                t.status.as_str(),
                t.raw_text,
                t.description,
                t.message,
                t.amount_value,
                t.amount_currency,
                t.amount_value_in_base_units,
                t.foreign_amount_value,
                t.foreign_amount_currency,
                t.settled_at,
                t.created_at,
                t.category_id,
                t.category_name,
                t.parent_category_id,
                t.parent_category_name,
                t.synced_at
            ])?;
        }
    }
    tx.commit()?;
    Ok(transactions.len())
}

pub fn get_watermark(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT value FROM sync_metadata WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_watermark(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_metadata(key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        params![key, value, now_timestamp()],
    )?;
    Ok(())
}

/// Writes several watermarks in one transaction.
pub fn set_watermarks(conn: &mut Connection, entries: &[(&str, &str)]) -> Result<()> {
    let tx = conn.transaction()?;
    let updated_at = now_timestamp();
    for (key, value) in entries {
        tx.execute(
            "INSERT INTO sync_metadata(key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
            params![key, value, updated_at],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Claims the sync lock for `owner`. Returns `false` while another owner holds
/// a lock refreshed within [`SYNC_LOCK_STALE_SECS`].
pub fn try_acquire_sync_lock(conn: &Connection, owner: &str) -> Result<bool> {
    let now = Utc::now();
    let stale_before = fmt_timestamp(now - Duration::seconds(SYNC_LOCK_STALE_SECS));
    let n = conn.execute(
        "INSERT INTO sync_metadata(key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at
         WHERE sync_metadata.updated_at < ?4",
        params![SYNC_LOCK, owner, fmt_timestamp(now), stale_before],
    )?;
    Ok(n == 1)
}

/// Bumps the lock's heartbeat. Returns `false` if `owner` no longer holds it.
pub fn refresh_sync_lock(conn: &Connection, owner: &str) -> Result<bool> {
    let n = conn.execute(
        "UPDATE sync_metadata SET updated_at=?3 WHERE key=?1 AND value=?2",
        params![SYNC_LOCK, owner, now_timestamp()],
    )?;
    Ok(n == 1)
}

pub fn release_sync_lock(conn: &Connection, owner: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM sync_metadata WHERE key=?1 AND value=?2",
        params![SYNC_LOCK, owner],
    )?;
    Ok(())
}

/// Table names are fixed; never pass user input here.
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n)
}

pub fn get_sync_status(conn: &Connection) -> Result<SyncStatus> {
    let last_full_sync = get_watermark(conn, LAST_FULL_SYNC)?;
    let last_incremental_sync = get_watermark(conn, LAST_INCREMENTAL_SYNC)?;
    Ok(SyncStatus {
        is_initialized: last_full_sync.is_some(),
        last_full_sync,
        last_incremental_sync,
        total_accounts: count_rows(conn, "accounts")?,
        total_transactions: count_rows(conn, "transactions")?,
        total_categories: count_rows(conn, "categories")?,
    })
}

fn parse_enum<T: std::str::FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e),
        )
    })
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, account_type, ownership_type, balance_value, balance_currency,
                balance_value_in_base_units, created_at, synced_at
         FROM accounts ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Account {
            id: r.get(0)?,
            display_name: r.get(1)?,
            account_type: parse_enum(r, 2)?,
            ownership_type: parse_enum(r, 3)?,
            balance_value: r.get(4)?,
            balance_currency: r.get(5)?,
            balance_value_in_base_units: r.get(6)?,
            created_at: r.get(7)?,
            synced_at: r.get(8)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let tx = conn
        .query_row(
            "SELECT id, account_id, status, raw_text, description, message,
                    amount_value, amount_currency, amount_value_in_base_units,
                    foreign_amount_value, foreign_amount_currency, settled_at, created_at,
                    category_id, category_name, parent_category_id, parent_category_name, synced_at
             FROM transactions WHERE id=?1",
            params![id],
            |r| {
                Ok(Transaction {
                    id: r.get(0)?,
                    account_id: r.get(1)?,
                    status: parse_enum(r, 2)?,
                    raw_text: r.get(3)?,
                    description: r.get(4)?,
                    message: r.get(5)?,
                    amount_value: r.get(6)?,
                    amount_currency: r.get(7)?,
                    amount_value_in_base_units: r.get(8)?,
                    foreign_amount_value: r.get(9)?,
                    foreign_amount_currency: r.get(10)?,
                    settled_at: r.get(11)?,
                    created_at: r.get(12)?,
                    category_id: r.get(13)?,
                    category_name: r.get(14)?,
                    parent_category_id: r.get(15)?,
                    parent_category_name: r.get(16)?,
                    synced_at: r.get(17)?,
                })
            },
        )
        .optional()?;
    Ok(tx)
}

/// Removes every mirrored row and watermark. A held sync lock is left alone.
pub fn clear_all_data(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "DELETE FROM transactions;
         DELETE FROM categories;
         DELETE FROM accounts;",
    )?;
    tx.execute("DELETE FROM sync_metadata WHERE key != ?1", params![SYNC_LOCK])?;
    tx.commit()?;
    Ok(())
}
