// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Wire entities to store rows.
//!
//! Category and parent-category names are copied onto each transaction here so
//! read queries never need to join against `categories`.

use crate::models::{Account, Category, Transaction};
use crate::remote::{MoneyObject, RemoteAccount, RemoteCategory, RemoteTransaction};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Category id to display name, built once per sync pass.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    names: HashMap<String, String>,
}

impl CategoryIndex {
    pub fn from_remote(categories: &[RemoteCategory]) -> Self {
        let names = categories
            .iter()
            .map(|c| (c.id.clone(), c.attributes.name.clone()))
            .collect();
        Self { names }
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(|s| s.as_str())
    }
}

/// Decimal places of the currency's minor unit (ISO 4217), if known.
pub fn minor_unit_exponent(currency: &str) -> Option<u32> {
    let exp = match currency.to_ascii_uppercase().as_str() {
        "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF" | "UGX"
        | "UYI" | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
        "AUD" | "CAD" | "CHF" | "CNY" | "DKK" | "EUR" | "FJD" | "GBP" | "HKD" | "IDR" | "INR"
        | "MXN" | "MYR" | "NOK" | "NZD" | "PGK" | "PHP" | "SEK" | "SGD" | "THB" | "TWD"
        | "USD" | "WST" | "ZAR" => 2,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
        "CLF" | "UYW" => 4,
        _ => return None,
    };
    Some(exp)
}

/// Display string for `money`.
///
/// With a known exponent the integer amount is authoritative and a
/// disagreeing string is rebuilt from it. Unknown currencies pass through
/// unchanged, checked only against the string's own scale.
fn display_value(money: &MoneyObject, owner: &str) -> String {
    let parsed = money.value.parse::<Decimal>().ok();
    match minor_unit_exponent(&money.currency_code) {
        Some(exp) => {
            let authoritative = Decimal::new(money.value_in_base_units, exp);
            if parsed == Some(authoritative) {
                return money.value.clone();
            }
            warn!(
                owner,
                value = %money.value,
                base_units = money.value_in_base_units,
                currency = %money.currency_code,
                "money value disagrees with base units; using base units"
            );
            authoritative.to_string()
        }
        None => {
            let consistent =
                parsed.is_some_and(|d| Decimal::new(money.value_in_base_units, d.scale()) == d);
            if !consistent {
                warn!(
                    owner,
                    value = %money.value,
                    base_units = money.value_in_base_units,
                    currency = %money.currency_code,
                    "cannot check money value in unknown currency; keeping remote value"
                );
            }
            money.value.clone()
        }
    }
}

pub fn to_local_account(remote: &RemoteAccount, synced_at: &str) -> Account {
    let a = &remote.attributes;
    Account {
        id: remote.id.clone(),
        display_name: a.display_name.clone(),
        account_type: a.account_type,
        ownership_type: a.ownership_type,
        balance_value: display_value(&a.balance, &remote.id),
        balance_currency: a.balance.currency_code.clone(),
        balance_value_in_base_units: a.balance.value_in_base_units,
        created_at: a.created_at.clone(),
        synced_at: synced_at.to_string(),
    }
}

pub fn to_local_category(remote: &RemoteCategory, synced_at: &str) -> Category {
    Category {
        id: remote.id.clone(),
        name: remote.attributes.name.clone(),
        parent_id: remote.parent_id().map(str::to_string),
        synced_at: synced_at.to_string(),
    }
}

/// Unknown category ids leave the name fields `None`.
pub fn to_local_transaction(
    remote: &RemoteTransaction,
    categories: &CategoryIndex,
    synced_at: &str,
) -> Transaction {
    let a = &remote.attributes;
    let category_id = remote.category_id();
    let parent_category_id = remote.parent_category_id();

    let category_name = category_id.and_then(|id| categories.name(id)).map(str::to_string);
    let parent_category_name = parent_category_id
        .and_then(|id| categories.name(id))
        .map(str::to_string);
    if category_id.is_some() && category_name.is_none() {
        warn!(tx = %remote.id, category = ?category_id, "category not in index");
    }

    Transaction {
        id: remote.id.clone(),
        account_id: remote.relationships.account.data.id.clone(),
        status: a.status,
        raw_text: a.raw_text.clone(),
        description: a.description.clone(),
        message: a.message.clone(),
        amount_value: display_value(&a.amount, &remote.id),
        amount_currency: a.amount.currency_code.clone(),
        amount_value_in_base_units: a.amount.value_in_base_units,
        foreign_amount_value: a.foreign_amount.as_ref().map(|m| m.value.clone()),
        foreign_amount_currency: a.foreign_amount.as_ref().map(|m| m.currency_code.clone()),
        settled_at: a.settled_at.clone(),
        created_at: a.created_at.clone(),
        category_id: category_id.map(str::to_string),
        category_name,
        parent_category_id: parent_category_id.map(str::to_string),
        parent_category_name,
        synced_at: synced_at.to_string(),
    }
}
