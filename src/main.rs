use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::update_listeners::Polling;
use teloxide::{ApiError, RequestError};
use tokio::time::sleep;

use shopdesk::cli::{Cli, Commands};
use shopdesk::core::{config, init_logger, log_startup_configuration, today};
use shopdesk::storage::backup::create_backup;
use shopdesk::storage::{create_pool, get_connection, stats as sales};
use shopdesk::telegram::notifications::notify_admin_startup;
use shopdesk::telegram::stats::render_summary;
use shopdesk::telegram::{
    create_bot, schema, setup_bot_commands, DialogueStorage, HandlerDeps, HandlerError, State,
};

/// `getMe` attempts before giving up while the Bot API server starts
const STARTUP_ATTEMPTS: u32 = 60;
const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Parses the command line and runs the requested subcommand (the bot by default)
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    install_panic_hook();

    // .env is optional; real environment variables win
    let _ = dotenvy::dotenv();
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        None | Some(Commands::Run) => run_bot().await,
        Some(Commands::Migrate) => run_migrate(),
        Some(Commands::Backup) => run_backup(),
        Some(Commands::Stats { from, to, json }) => run_stats(from, to, json),
    }
}

/// Sends panics from handler tasks to the log file as well
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string payload>".to_string());
        match info.location() {
            Some(at) => log::error!("💥 Panic at {}:{}: {}", at.file(), at.line(), message),
            None => log::error!("💥 Panic: {}", message),
        }
    }));
}

/// Opening the pool applies pending migrations
fn run_migrate() -> Result<()> {
    create_pool(&config::DATABASE_PATH).context("migrate database")?;
    log::info!("✅ Database {} is up to date", config::DATABASE_PATH.as_str());
    Ok(())
}

fn run_backup() -> Result<()> {
    let path = create_backup(&config::DATABASE_PATH, Path::new(config::BACKUP_DIR.as_str()))?;
    log::info!("✅ Backup created: {}", path.display());
    Ok(())
}

fn run_stats(from: Option<NaiveDate>, to: Option<NaiveDate>, json: bool) -> Result<()> {
    let today = today();
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| to.with_day(1).unwrap_or(to));
    if from > to {
        anyhow::bail!("--from {} is after --to {}", from, to);
    }

    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;
    if json {
        let summary = sales::sales_summary(&conn, from, to)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&conn, from, to)?);
    }
    Ok(())
}

async fn run_bot() -> Result<()> {
    let started = Instant::now();
    log::info!("🚀 Starting shopdesk bot...");
    log_startup_configuration();

    let db_pool = Arc::new(create_pool(&config::DATABASE_PATH).context("open shop database")?);
    let bot = create_bot()?;

    let me = wait_for_bot_api(&bot).await?;
    let bot_username = me.username.clone();
    log::info!("🤖 Logged in as @{} (id {})", bot_username.as_deref().unwrap_or("?"), me.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }
    notify_admin_startup(&bot, bot_username.as_deref()).await;

    let handler = schema(HandlerDeps::new(db_pool, bot_username));
    // One storage for every dispatcher run: a restart does not lose open wizards
    let storage = InMemStorage::<State>::new();

    log::info!("✅ Ready in {:.2}s, polling for updates", started.elapsed().as_secs_f64());
    supervise_dispatcher(bot, handler, storage).await;
    Ok(())
}

/// Errors worth waiting out at startup: the network or a (local) Bot API server that is still coming up
fn is_transient(err: &RequestError) -> bool {
    match err {
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_) => true,
        RequestError::Api(ApiError::Unknown(text)) => text.contains("restart"),
        _ => false,
    }
}

/// Calls `getMe` until the Bot API answers, giving up on permanent errors
async fn wait_for_bot_api(bot: &Bot) -> Result<Me> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match bot.get_me().await {
            Ok(me) => return Ok(me),
            Err(e) if is_transient(&e) && attempt < STARTUP_ATTEMPTS => {
                log::warn!(
                    "Bot API not reachable (attempt {}/{}): {}. Next try in {}s",
                    attempt,
                    STARTUP_ATTEMPTS,
                    e,
                    STARTUP_RETRY_DELAY.as_secs()
                );
                sleep(STARTUP_RETRY_DELAY).await;
            }
            Err(e) => anyhow::bail!("Bot API unavailable after {} attempt(s): {}", attempt, e),
        }
    }
}

/// Runs the dispatcher in its own task and restarts it after a panic, with
/// exponential backoff, up to `MAX_DISPATCHER_RETRIES` times
async fn supervise_dispatcher(bot: Bot, handler: UpdateHandler<HandlerError>, storage: Arc<DialogueStorage>) {
    let mut restarts = 0;
    loop {
        let run = tokio::spawn({
            let bot = bot.clone();
            let handler = handler.clone();
            let storage = Arc::clone(&storage);
            async move {
                let mut polling = Polling::builder(bot.clone());
                if *config::network::DROP_PENDING_UPDATES {
                    polling = polling.drop_pending_updates();
                }
                let listener = polling.build();
                Dispatcher::builder(bot, handler)
                    .dependencies(dptree::deps![storage])
                    .enable_ctrlc_handler()
                    .build()
                    .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("Update listener error"))
                    .await
            }
        });

        match run.await {
            Ok(()) => {
                log::info!("👋 Dispatcher stopped");
                return;
            }
            Err(e) if e.is_panic() && restarts < config::retry::MAX_DISPATCHER_RETRIES => {
                restarts += 1;
                log::error!(
                    "💥 Dispatcher panicked: {}. Restart {}/{}",
                    e,
                    restarts,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                exponential_backoff(restarts).await;
                sleep(config::retry::dispatcher_delay()).await;
            }
            Err(e) if e.is_panic() => {
                log::error!("💥 Dispatcher panicked again ({}), giving up", e);
                return;
            }
            Err(e) => {
                log::warn!("Dispatcher task cancelled: {}", e);
                return;
            }
        }
    }
}

async fn exponential_backoff(attempt: u32) {
    let secs = config::retry::EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt);
    sleep(Duration::from_secs(secs)).await;
}
