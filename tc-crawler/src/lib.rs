use std::path::PathBuf;

use anyhow::{bail, Result};
use itertools::Itertools;
use reqwest::Client;
use twitter::TwitterClient;

use crate::config::twitter::TwitterConfig;
use crate::crawler::{Crawler, SaveOptions};
use crate::db::Database;
use crate::delete::{DeleteFilter, Target};
use crate::progress::Spinner;

pub mod config;
pub mod crawler;
pub mod db;
pub mod delete;
pub mod download;
pub mod logging;
pub mod progress;

/// Save the media of `ids`, or of the configured collections if none given
pub async fn save_collections(
    reqwest_client: &Client,
    conf: &TwitterConfig,
    ids: &[String],
    output: Option<PathBuf>,
) -> Result<()> {
    let ids = if ids.is_empty() {
        &conf.collections[..]
    } else {
        ids
    };
    if ids.is_empty() {
        bail!("No collections given on the command line or in the config file");
    }

    let client = TwitterClient::new(reqwest_client, conf.backend()?, &conf.credentials())?;
    let store = Database::open_at(conf.database_path()).await?;
    let options = SaveOptions {
        download_path: output.unwrap_or_else(|| conf.download_path.clone()),
        max_connections: Some(conf.max_connections),
        existing_files: conf.existing_files,
        media_policy: conf.media_policy(),
    };
    tracing::info!("saving collections {}", ids.iter().join(", "));

    for id in ids {
        let spinner = Spinner::new(&format!("Collection {}", id));
        let result = Crawler::new(&client, reqwest_client, &store, &spinner, options.clone())
            .save_collection(id)
            .await;
        match result {
            Ok(n) => spinner.succeed(&format!("Collection {}: saved {} files", id, n)),
            Err(e) => {
                spinner.fail();
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Delete tweets or likes of `user` matching `filter`
pub async fn remove(
    reqwest_client: &Client,
    conf: &TwitterConfig,
    target: Target,
    user: &str,
    filter: &DeleteFilter,
    dry_run: bool,
) -> Result<()> {
    let client = TwitterClient::new(reqwest_client, conf.backend()?, &conf.credentials())?;

    let spinner = Spinner::new(&format!("Looking up {}", user));
    let result = delete::delete(
        &client,
        target,
        user,
        filter,
        dry_run,
        Some(conf.max_connections),
        &spinner,
    )
    .await;
    match result {
        Ok(n) if dry_run => spinner.succeed(&format!("{} tweets match", n)),
        Ok(n) => spinner.succeed(&format!("Removed {} tweets", n)),
        Err(e) => {
            spinner.fail();
            return Err(e);
        }
    }

    Ok(())
}
