use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shopdesk")]
#[command(author, version, about = "Admin bot for a Telegram shop: promo codes, actions, client messaging and sales statistics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Apply pending database migrations and exit
    Migrate,

    /// Copy the database into the backup directory
    Backup,

    /// Print sales statistics for a date range
    Stats {
        /// First day, YYYY-MM-DD (default: first day of the current month)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD (default: today)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
