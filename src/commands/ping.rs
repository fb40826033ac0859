// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::sync::explain;
use crate::config::Settings;
use crate::remote::UpClient;
use anyhow::Result;

pub fn handle(settings: &Settings) -> Result<()> {
    let client = UpClient::from_settings(settings).map_err(explain)?;
    let id = client.ping().map_err(explain)?;
    println!("Token OK (ping id {})", id);
    Ok(())
}
