use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use tc_crawler::config::{default_config_path, Config};
use tc_crawler::delete::{parse_date, parse_keyword, DeleteFilter, Target};
use time::Date;

/// Save the media of Twitter collections
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Config file location
    #[clap(short, long, default_value_os_t = default_config_path(), value_parser)]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download media of collections and record them as processed
    Save {
        /// Collection id, may be repeated. Defaults to the configured collections
        #[clap(short = 'i', long = "id", value_parser)]
        ids: Vec<String>,

        /// Save into this directory instead of the configured one
        #[clap(short, long, value_parser)]
        output: Option<PathBuf>,
    },
    /// Delete your own tweets
    DeleteTweets {
        #[clap(value_parser)]
        user: String,

        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Remove your likes
    DeleteLikes {
        #[clap(value_parser)]
        user: String,

        #[clap(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only tweets created on or after this day (YYYY-MM-DD)
    #[clap(long, value_parser = date_arg)]
    since: Option<Date>,

    /// Only tweets created on or before this day (YYYY-MM-DD)
    #[clap(long, value_parser = date_arg)]
    until: Option<Date>,

    /// Only tweets whose text matches this regex, case insensitive
    #[clap(long)]
    keyword: Option<String>,

    /// List matching tweets without removing them
    #[clap(long)]
    dry_run: bool,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<DeleteFilter> {
        Ok(DeleteFilter {
            since: self.since,
            until: self.until,
            keyword: self.keyword.as_deref().map(parse_keyword).transpose()?,
        })
    }
}

fn date_arg(s: &str) -> Result<Date, String> {
    parse_date(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    tc_crawler::logging::init_logging();

    match run().await {
        Ok(_) => process::exit(0),
        Err(err) => {
            eprintln!("Error: {}", err.chain().join(": "));
            process::exit(1);
        }
    }
}

async fn run() -> Result<()> {
    let args = Cli::parse();
    let conf = Config::read(&args.config)?
        .twitter
        .ok_or_else(|| anyhow!("Missing twitter section in config file"))?;
    let reqwest_client = reqwest::Client::new();

    match args.command {
        Command::Save { ids, output } => {
            tc_crawler::save_collections(&reqwest_client, &conf, &ids, output).await?;
        }
        Command::DeleteTweets { user, filter } => {
            let f = filter.to_filter()?;
            tc_crawler::remove(&reqwest_client, &conf, Target::Tweets, &user, &f, filter.dry_run)
                .await?;
        }
        Command::DeleteLikes { user, filter } => {
            let f = filter.to_filter()?;
            tc_crawler::remove(&reqwest_client, &conf, Target::Likes, &user, &f, filter.dry_run)
                .await?;
        }
    }

    Ok(())
}
