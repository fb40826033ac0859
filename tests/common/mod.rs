// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use chrono::DateTime;
use rusqlite::Connection;
use std::cell::RefCell;
use upmirror::error::{Error, Result};
use upmirror::models::{AccountType, OwnershipType, TransactionStatus};
use upmirror::remote::{
    AccountAttributes, AccountRelationship, CategoryAttributes, CategoryRelationships,
    LedgerSource, MoneyObject, PageCursor, PageRequest, Relationship, RemoteAccount,
    RemoteCategory, RemoteTransaction, ResourceRef, TransactionAttributes, TransactionPage,
    TransactionRelationships,
};

const CURSOR_PREFIX: &str = "fake://transactions?page=";

/// In-process stand-in for the remote ledger. Pages are cut from a snapshot
/// taken when the first page is requested.
#[derive(Default)]
pub struct FakeLedger {
    pub accounts: RefCell<Vec<RemoteAccount>>,
    pub categories: RefCell<Vec<RemoteCategory>>,
    pub transactions: RefCell<Vec<RemoteTransaction>>,
    pub fail_at_page: Option<usize>,
    pub requests: RefCell<Vec<PageRequest>>,
    snapshot: RefCell<(Vec<RemoteTransaction>, usize)>,
}

impl FakeLedger {
    pub fn new(
        accounts: Vec<RemoteAccount>,
        categories: Vec<RemoteCategory>,
        transactions: Vec<RemoteTransaction>,
    ) -> Self {
        Self {
            accounts: RefCell::new(accounts),
            categories: RefCell::new(categories),
            transactions: RefCell::new(transactions),
            ..Default::default()
        }
    }

    pub fn push(&self, tx: RemoteTransaction) {
        self.transactions.borrow_mut().push(tx);
    }

    pub fn page_requests(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl LedgerSource for FakeLedger {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        Ok(self.accounts.borrow().clone())
    }

    fn list_categories(&self) -> Result<Vec<RemoteCategory>> {
        Ok(self.categories.borrow().clone())
    }

    fn transaction_page(&self, request: &PageRequest) -> Result<TransactionPage> {
        self.requests.borrow_mut().push(request.clone());
        let page_no = match request {
            PageRequest::First(filter) => {
                let since = filter
                    .since
                    .as_deref()
                    .map(|s| DateTime::parse_from_rfc3339(s).expect("since is RFC 3339"));
                let rows: Vec<_> = self
                    .transactions
                    .borrow()
                    .iter()
                    .filter(|t| match since {
                        Some(s) => {
                            DateTime::parse_from_rfc3339(&t.attributes.created_at)
                                .expect("created_at is RFC 3339")
                                >= s
                        }
                        None => true,
                    })
                    .cloned()
                    .collect();
                let size = filter.page_size.unwrap_or(100) as usize;
                *self.snapshot.borrow_mut() = (rows, size);
                0
            }
            PageRequest::Next(PageCursor(c)) => c
                .strip_prefix(CURSOR_PREFIX)
                .and_then(|n| n.parse().ok())
                .expect("cursor issued by this fake"),
        };

        if self.fail_at_page == Some(page_no) {
            return Err(Error::RemoteApi {
                status: 503,
                body: r#"{"errors":[{"status":"503"}]}"#.into(),
            });
        }

        let snap = self.snapshot.borrow();
        let (rows, size) = (&snap.0, snap.1);
        let start = (page_no * size).min(rows.len());
        let end = (start + size).min(rows.len());
        let next = (end < rows.len()).then(|| PageCursor(format!("{}{}", CURSOR_PREFIX, page_no + 1)));
        Ok(TransactionPage {
            transactions: rows[start..end].to_vec(),
            next,
        })
    }
}

pub fn store() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    upmirror::db::init_schema(&conn).unwrap();
    conn
}

pub fn money(base_units: i64) -> MoneyObject {
    let sign = if base_units < 0 { "-" } else { "" };
    let abs = base_units.abs();
    MoneyObject {
        currency_code: "AUD".into(),
        value: format!("{}{}.{:02}", sign, abs / 100, abs % 100),
        value_in_base_units: base_units,
    }
}

pub fn account(id: &str, balance: i64) -> RemoteAccount {
    RemoteAccount {
        id: id.into(),
        attributes: AccountAttributes {
            display_name: format!("Account {}", id),
            account_type: AccountType::Transactional,
            ownership_type: OwnershipType::Individual,
            balance: money(balance),
            created_at: "2023-01-01T09:00:00+11:00".into(),
        },
    }
}

pub fn category(id: &str, name: &str, parent: Option<&str>) -> RemoteCategory {
    RemoteCategory {
        id: id.into(),
        attributes: CategoryAttributes { name: name.into() },
        relationships: CategoryRelationships {
            parent: parent.map(Relationship::to),
        },
    }
}

pub fn tx(id: &str, account_id: &str, created_at: &str, amount: i64) -> RemoteTransaction {
    RemoteTransaction {
        id: id.into(),
        attributes: TransactionAttributes {
            status: TransactionStatus::Settled,
            raw_text: None,
            description: format!("Merchant {}", id),
            message: None,
            amount: money(amount),
            foreign_amount: None,
            settled_at: Some(created_at.to_string()),
            created_at: created_at.into(),
        },
        relationships: TransactionRelationships {
            account: AccountRelationship {
                data: ResourceRef {
                    id: account_id.into(),
                },
            },
            category: None,
            parent_category: None,
        },
    }
}

pub fn categorised(mut t: RemoteTransaction, category: &str, parent: &str) -> RemoteTransaction {
    t.relationships.category = Some(Relationship::to(category));
    t.relationships.parent_category = Some(Relationship::to(parent));
    t
}

pub fn held(mut t: RemoteTransaction) -> RemoteTransaction {
    t.attributes.status = TransactionStatus::Held;
    t.attributes.settled_at = None;
    t
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    upmirror::db::count_rows(conn, table).unwrap()
}
