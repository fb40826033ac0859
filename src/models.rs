// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Saver,
    Transactional,
    HomeLoan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipType {
    Individual,
    Joint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Held,
    Settled,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Saver => "SAVER",
            AccountType::Transactional => "TRANSACTIONAL",
            AccountType::HomeLoan => "HOME_LOAN",
        }
    }
}

impl OwnershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipType::Individual => "INDIVIDUAL",
            OwnershipType::Joint => "JOINT",
        }
    }
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Held => "HELD",
            TransactionStatus::Settled => "SETTLED",
        }
    }
}

impl FromStr for AccountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAVER" => Ok(AccountType::Saver),
            "TRANSACTIONAL" => Ok(AccountType::Transactional),
            "HOME_LOAN" => Ok(AccountType::HomeLoan),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

impl FromStr for OwnershipType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDIVIDUAL" => Ok(OwnershipType::Individual),
            "JOINT" => Ok(OwnershipType::Joint),
            other => Err(format!("unknown ownership type '{}'", other)),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HELD" => Ok(TransactionStatus::Held),
            "SETTLED" => Ok(TransactionStatus::Settled),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// Locally stored account row. `balance_value_in_base_units` is authoritative;
/// `balance_value` mirrors it for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub account_type: AccountType,
    pub ownership_type: OwnershipType,
    pub balance_value: String,
    pub balance_currency: String,
    pub balance_value_in_base_units: i64,
    pub created_at: String,
    pub synced_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub synced_at: String,
}

/// Locally stored transaction row. Negative amounts are outflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub status: TransactionStatus,
    pub raw_text: Option<String>,
    pub description: String,
    pub message: Option<String>,
    pub amount_value: String,
    pub amount_currency: String,
    pub amount_value_in_base_units: i64,
    pub foreign_amount_value: Option<String>,
    pub foreign_amount_currency: Option<String>,
    pub settled_at: Option<String>,
    pub created_at: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub parent_category_id: Option<String>,
    pub parent_category_name: Option<String>,
    pub synced_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_initialized: bool,
    pub last_full_sync: Option<String>,
    pub last_incremental_sync: Option<String>,
    pub total_accounts: i64,
    pub total_transactions: i64,
    pub total_categories: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    Accounts,
    Categories,
    Transactions,
    Complete,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStage::Accounts => "accounts",
            SyncStage::Categories => "categories",
            SyncStage::Transactions => "transactions",
            SyncStage::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Progress event emitted at each stage and page boundary. `total` is `None`
/// whenever the item count is not known up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub stage: SyncStage,
    pub current: u64,
    pub total: Option<u64>,
    pub message: String,
}
