// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse grouping of [`Error`] for callers that render a message per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Remote,
    Precondition,
    Store,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote API rejected request with HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("remote API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode remote response: {0}")]
    Decode(String),

    #[error("no previous sync found; run a full sync first")]
    NoPriorSync,

    #[error("another sync is already running")]
    SyncInProgress,

    #[error("local store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::RemoteApi { .. } | Error::Transport(_) | Error::Decode(_) => ErrorKind::Remote,
            Error::NoPriorSync | Error::SyncInProgress => ErrorKind::Precondition,
            Error::Store(_) => ErrorKind::Store,
        }
    }

    /// HTTP status of a rejected remote request, if that is what this is.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Error::RemoteApi { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
