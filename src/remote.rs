// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Client for the remote ledger.
//!
//! The engine only sees [`LedgerSource`]; [`UpClient`] is the HTTP
//! implementation. Transaction history is exposed as a lazy sequence of pages
//! ([`TransactionPages`]) that can be restarted from any [`PageCursor`].

use crate::config::{MAX_PAGE_SIZE, Settings};
use crate::error::{Error, Result};
use crate::models::{AccountType, OwnershipType, TransactionStatus};
use crate::utils::http_client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyObject {
    pub currency_code: String,
    pub value: String,
    pub value_in_base_units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

impl Relationship {
    pub fn to(id: &str) -> Self {
        Self {
            data: Some(ResourceRef { id: id.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAttributes {
    pub display_name: String,
    pub account_type: AccountType,
    pub ownership_type: OwnershipType,
    pub balance: MoneyObject,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub id: String,
    pub attributes: AccountAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRelationships {
    #[serde(default)]
    pub parent: Option<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCategory {
    pub id: String,
    pub attributes: CategoryAttributes,
    #[serde(default)]
    pub relationships: CategoryRelationships,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAttributes {
    pub status: TransactionStatus,
    #[serde(default)]
    pub raw_text: Option<String>,
    pub description: String,
    #[serde(default)]
    pub message: Option<String>,
    pub amount: MoneyObject,
    #[serde(default)]
    pub foreign_amount: Option<MoneyObject>,
    #[serde(default)]
    pub settled_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRelationship {
    pub data: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRelationships {
    pub account: AccountRelationship,
    #[serde(default)]
    pub category: Option<Relationship>,
    #[serde(default)]
    pub parent_category: Option<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTransaction {
    pub id: String,
    pub attributes: TransactionAttributes,
    pub relationships: TransactionRelationships,
}

impl RemoteTransaction {
    pub fn category_id(&self) -> Option<&str> {
        relationship_id(self.relationships.category.as_ref())
    }

    pub fn parent_category_id(&self) -> Option<&str> {
        relationship_id(self.relationships.parent_category.as_ref())
    }
}

impl RemoteCategory {
    pub fn parent_id(&self) -> Option<&str> {
        relationship_id(self.relationships.parent.as_ref())
    }
}

fn relationship_id(rel: Option<&Relationship>) -> Option<&str> {
    rel.and_then(|r| r.data.as_ref()).map(|d| d.id.as_str())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Deserialize)]
struct PingResponse {
    meta: PingMeta,
}

#[derive(Debug, Deserialize)]
struct PingMeta {
    id: String,
}

/// Opaque continuation token handed out with each page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Inclusive lower bound on creation time, RFC 3339.
    pub since: Option<String>,
    pub until: Option<String>,
    pub page_size: Option<u32>,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    First(TransactionFilter),
    Next(PageCursor),
}

#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<RemoteTransaction>,
    pub next: Option<PageCursor>,
}

pub trait LedgerSource {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>>;
    fn list_categories(&self) -> Result<Vec<RemoteCategory>>;
    fn transaction_page(&self, request: &PageRequest) -> Result<TransactionPage>;

    fn stream_transactions(&self, filter: TransactionFilter) -> TransactionPages<'_, Self>
    where
        Self: Sized,
    {
        TransactionPages::new(self, filter)
    }
}

impl<T: LedgerSource + ?Sized> LedgerSource for &T {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        (**self).list_accounts()
    }
    fn list_categories(&self) -> Result<Vec<RemoteCategory>> {
        (**self).list_categories()
    }
    fn transaction_page(&self, request: &PageRequest) -> Result<TransactionPage> {
        (**self).transaction_page(request)
    }
}

/// Pulls one page per `next()` call. Exhausted once a page arrives without a
/// cursor; fused after the first error.
pub struct TransactionPages<'a, S: ?Sized> {
    source: &'a S,
    pending: Option<PageRequest>,
}

impl<'a, S: LedgerSource + ?Sized> TransactionPages<'a, S> {
    pub fn new(source: &'a S, filter: TransactionFilter) -> Self {
        Self {
            source,
            pending: Some(PageRequest::First(filter)),
        }
    }

    pub fn resume(source: &'a S, cursor: PageCursor) -> Self {
        Self {
            source,
            pending: Some(PageRequest::Next(cursor)),
        }
    }

    /// Cursor of the page that the next call will fetch, if it is a continuation.
    pub fn cursor(&self) -> Option<&PageCursor> {
        match &self.pending {
            Some(PageRequest::Next(c)) => Some(c),
            _ => None,
        }
    }
}

impl<S: LedgerSource + ?Sized> Iterator for TransactionPages<'_, S> {
    type Item = Result<TransactionPage>;

    fn next(&mut self) -> Option<Self::Item> {
        let request = self.pending.take()?;
        match self.source.transaction_page(&request) {
            Ok(page) => {
                self.pending = page.next.clone().map(PageRequest::Next);
                Some(Ok(page))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

pub struct UpClient {
    http: reqwest::blocking::Client,
    base: String,
    token: String,
}

impl UpClient {
    pub fn new(base: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Config("API token is empty".into()));
        }
        Ok(Self {
            http: http_client()?,
            base: base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.api_base, settings.require_token()?)
    }

    /// Checks the token against the remote and returns the ping id.
    pub fn ping(&self) -> Result<String> {
        let resp: PingResponse = self.get_json(&self.endpoint("/util/ping")?)?;
        Ok(resp.meta.id)
    }

    /// Resolves `path` against the API base. Absolute links are only followed
    /// when they point back under the base, so the token never leaves it.
    fn endpoint(&self, path: &str) -> Result<String> {
        if !(path.starts_with("http://") || path.starts_with("https://")) {
            return Ok(format!("{}{}", self.base, path));
        }
        let under_base = path
            .strip_prefix(self.base.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']));
        if !under_base {
            return Err(Error::Decode(format!(
                "refusing to follow link outside {}: {}",
                self.base, path
            )));
        }
        Ok(path.to_string())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(Error::RemoteApi {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{}: {}", url, e)))
    }

    fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut url = Some(self.endpoint(path)?);
        while let Some(u) = url.take() {
            let page: ListResponse<T> = self.get_json(&u)?;
            out.extend(page.data);
            url = page.links.next.map(|next| self.endpoint(&next)).transpose()?;
        }
        Ok(out)
    }
}

/// URL of the first transaction page for `filter`.
pub fn transactions_url(base: &str, filter: &TransactionFilter) -> Result<reqwest::Url> {
    let base = base.trim_end_matches('/');
    let path = match &filter.account_id {
        Some(acct) => format!("{}/accounts/{}/transactions", base, acct),
        None => format!("{}/transactions", base),
    };
    let page_size = filter.page_size.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(since) = &filter.since {
        params.push(("filter[since]", since.clone()));
    }
    if let Some(until) = &filter.until {
        params.push(("filter[until]", until.clone()));
    }
    params.push(("page[size]", page_size.to_string()));
    reqwest::Url::parse_with_params(&path, &params)
        .map_err(|e| Error::Config(format!("invalid API base '{}': {}", base, e)))
}

impl LedgerSource for UpClient {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        self.list_all("/accounts")
    }

    fn list_categories(&self) -> Result<Vec<RemoteCategory>> {
        self.list_all("/categories")
    }

    fn transaction_page(&self, request: &PageRequest) -> Result<TransactionPage> {
        let url = match request {
            PageRequest::First(filter) => transactions_url(&self.base, filter)?.to_string(),
            PageRequest::Next(PageCursor(next)) => self.endpoint(next)?,
        };
        let page: ListResponse<RemoteTransaction> = self.get_json(&url)?;
        Ok(TransactionPage {
            transactions: page.data,
            next: page.links.next.map(PageCursor),
        })
    }
}
