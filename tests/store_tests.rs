// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{count, store};
use upmirror::db;
use upmirror::models::{Account, AccountType, Category, OwnershipType, Transaction, TransactionStatus};

fn account(id: &str, base_units: i64) -> Account {
    Account {
        id: id.into(),
        display_name: "Spending".into(),
        account_type: AccountType::Transactional,
        ownership_type: OwnershipType::Joint,
        balance_value: format!("{}.00", base_units / 100),
        balance_currency: "AUD".into(),
        balance_value_in_base_units: base_units,
        created_at: "2023-01-01T00:00:00+11:00".into(),
        synced_at: "2025-01-01T00:00:00.000Z".into(),
    }
}

fn transaction(id: &str, description: &str, amount: i64) -> Transaction {
    Transaction {
        id: id.into(),
        account_id: "acc-1".into(),
        status: TransactionStatus::Settled,
        raw_text: Some("RAW".into()),
        description: description.into(),
        message: None,
        amount_value: format!("{}.00", amount / 100),
        amount_currency: "AUD".into(),
        amount_value_in_base_units: amount,
        foreign_amount_value: None,
        foreign_amount_currency: None,
        settled_at: Some("2025-02-01T00:00:00+11:00".into()),
        created_at: "2025-02-01T00:00:00+11:00".into(),
        category_id: None,
        category_name: None,
        parent_category_id: None,
        parent_category_name: None,
        synced_at: "2025-02-02T00:00:00.000Z".into(),
    }
}

#[test]
fn upserting_same_id_overwrites_without_duplicating() {
    let mut conn = store();
    db::upsert_accounts(&mut conn, &[account("acc-1", 0)]).unwrap();
    db::upsert_transactions(&mut conn, &[transaction("t1", "Coffee", -500)]).unwrap();

    let mut changed = transaction("t1", "Coffee Club", -700);
    changed.category_id = Some("restaurants-and-cafes".into());
    changed.category_name = Some("Restaurants & Cafes".into());
    db::upsert_transactions(&mut conn, &[changed.clone()]).unwrap();

    assert_eq!(count(&conn, "transactions"), 1);
    let stored = db::get_transaction(&conn, "t1").unwrap().unwrap();
    assert_eq!(stored, changed);
}

#[test]
fn account_refresh_keeps_dependent_transactions() {
    let mut conn = store();
    db::upsert_accounts(&mut conn, &[account("acc-1", 1_000)]).unwrap();
    db::upsert_transactions(&mut conn, &[transaction("t1", "Rent", -100_000)]).unwrap();

    db::upsert_accounts(&mut conn, &[account("acc-1", 9_900)]).unwrap();

    let accounts = db::list_accounts(&conn).unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].balance_value_in_base_units, 9_900);
    assert_eq!(accounts[0].ownership_type, OwnershipType::Joint);
    assert_eq!(count(&conn, "transactions"), 1);
}

#[test]
fn failing_row_rolls_back_whole_batch() {
    let mut conn = store();
    db::upsert_accounts(&mut conn, &[account("acc-1", 0)]).unwrap();

    let mut orphan = transaction("t2", "Orphan", -1);
    orphan.account_id = "nope".into();
    let res = db::upsert_transactions(&mut conn, &[transaction("t1", "Fine", -1), orphan]);

    assert!(res.is_err());
    assert_eq!(count(&conn, "transactions"), 0);
}

#[test]
fn categories_may_list_children_before_parents() {
    let mut conn = store();
    let child = Category {
        id: "groceries".into(),
        name: "Groceries".into(),
        parent_id: Some("good-life".into()),
        synced_at: "2025-01-01T00:00:00.000Z".into(),
    };
    let parent = Category {
        id: "good-life".into(),
        name: "Good Life".into(),
        parent_id: None,
        synced_at: "2025-01-01T00:00:00.000Z".into(),
    };
    db::upsert_categories(&mut conn, &[child, parent]).unwrap();
    assert_eq!(count(&conn, "categories"), 2);
}

#[test]
fn dangling_category_parent_is_rejected() {
    let mut conn = store();
    let child = Category {
        id: "groceries".into(),
        name: "Groceries".into(),
        parent_id: Some("missing".into()),
        synced_at: "2025-01-01T00:00:00.000Z".into(),
    };
    assert!(db::upsert_categories(&mut conn, &[child]).is_err());
    assert_eq!(count(&conn, "categories"), 0);
}

#[test]
fn watermarks_read_back_and_overwrite() {
    let mut conn = store();
    assert_eq!(db::get_watermark(&conn, db::LAST_FULL_SYNC).unwrap(), None);

    db::set_watermark(&conn, db::LAST_FULL_SYNC, "2025-01-01T00:00:00.000Z").unwrap();
    db::set_watermark(&conn, db::LAST_FULL_SYNC, "2025-06-01T00:00:00.000Z").unwrap();
    assert_eq!(
        db::get_watermark(&conn, db::LAST_FULL_SYNC).unwrap().as_deref(),
        Some("2025-06-01T00:00:00.000Z")
    );

    db::set_watermarks(
        &mut conn,
        &[
            (db::LAST_FULL_SYNC, "2025-07-01T00:00:00.000Z"),
            (db::LAST_INCREMENTAL_SYNC, "2025-07-01T00:00:00.000Z"),
        ],
    )
    .unwrap();
    assert_eq!(count(&conn, "sync_metadata"), 2);
}

#[test]
fn status_is_initialized_only_after_full_watermark() {
    let mut conn = store();
    db::upsert_accounts(&mut conn, &[account("acc-1", 0)]).unwrap();
    db::set_watermark(&conn, db::LAST_INCREMENTAL_SYNC, "2025-01-01T00:00:00.000Z").unwrap();

    let status = db::get_sync_status(&conn).unwrap();
    assert!(!status.is_initialized);
    assert_eq!(status.total_accounts, 1);
    assert_eq!(status.last_full_sync, None);

    db::set_watermark(&conn, db::LAST_FULL_SYNC, "2025-01-01T00:00:00.000Z").unwrap();
    assert!(db::get_sync_status(&conn).unwrap().is_initialized);
}

#[test]
fn clear_all_data_empties_every_table() {
    let mut conn = store();
    db::upsert_accounts(&mut conn, &[account("acc-1", 0)]).unwrap();
    db::upsert_transactions(&mut conn, &[transaction("t1", "x", -1)]).unwrap();
    db::set_watermark(&conn, db::LAST_FULL_SYNC, "2025-01-01T00:00:00.000Z").unwrap();

    db::clear_all_data(&mut conn).unwrap();

    let status = db::get_sync_status(&conn).unwrap();
    assert!(!status.is_initialized);
    assert_eq!(status.total_accounts + status.total_transactions + status.total_categories, 0);
}

#[test]
fn sync_lock_is_exclusive_until_released() {
    let mut conn = store();
    assert!(db::try_acquire_sync_lock(&conn, "run-a").unwrap());
    assert!(!db::try_acquire_sync_lock(&conn, "run-b").unwrap());
    assert!(db::refresh_sync_lock(&conn, "run-a").unwrap());
    assert!(!db::refresh_sync_lock(&conn, "run-b").unwrap());

    db::clear_all_data(&mut conn).unwrap();
    assert!(!db::try_acquire_sync_lock(&conn, "run-b").unwrap());

    db::release_sync_lock(&conn, "run-b").unwrap();
    assert!(!db::try_acquire_sync_lock(&conn, "run-b").unwrap());
    db::release_sync_lock(&conn, "run-a").unwrap();
    assert!(db::try_acquire_sync_lock(&conn, "run-b").unwrap());
}

#[test]
fn schema_creates_analytics_indexes() {
    let conn = store();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='transactions'")
        .unwrap();
    let names: Vec<String> = stmt
        .query_map([], |r| r.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    for idx in [
        "idx_transactions_created_at",
        "idx_transactions_account_id",
        "idx_transactions_category_id",
        "idx_transactions_category_name",
        "idx_transactions_status_date",
        "idx_transactions_amount",
    ] {
        assert!(names.iter().any(|n| n == idx), "missing {}", idx);
    }
}
