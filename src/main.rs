use anyhow::{Context, Result};
use homework_bot::bot;
use homework_bot::config::AppConfig;
use homework_bot::db;
use homework_bot::dialogue::HomeworkDialogueState;
use homework_bot::localization;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load and validate configuration early
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate()?;
    let config = Arc::new(config);

    info!(database_path = %config.database.path, "Initializing database connection");

    // Create database connection pool and prepare the schema
    let pool = db::connect(&config.database.path, config.database.max_connections).await?;
    db::init_database_schema(&pool).await?;

    // Make sure the configured admin chat can approve registrations
    db::ensure_admin_user(&pool, config.admin.chat_id).await?;

    // Wrap pool in Arc for sharing across async tasks
    let shared_pool = Arc::new(pool);

    // Initialize localization manager
    let localization_manager = localization::create_localization_manager()?;

    // Initialize the bot with custom client configuration for better reliability
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let bot = Bot::with_client(config.bot.token.clone(), client);

    info!("Bot initialized with 30s timeout, starting dispatcher");

    // Create shared dialogue storage
    let dialogue_storage = InMemStorage::<HomeworkDialogueState>::new();

    // Set up the dispatcher with shared dependencies
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let pool = Arc::clone(&shared_pool);
            let storage = dialogue_storage.clone();
            let localization = Arc::clone(&localization_manager);
            move |bot: Bot, msg: Message| {
                let pool = Arc::clone(&pool);
                let storage = storage.clone();
                let localization = Arc::clone(&localization);
                async move { bot::message_handler(bot, msg, pool, localization, storage).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let pool = Arc::clone(&shared_pool);
            let storage = dialogue_storage.clone();
            let localization = Arc::clone(&localization_manager);
            let config = Arc::clone(&config);
            move |bot: Bot, q: CallbackQuery| {
                let pool = Arc::clone(&pool);
                let storage = storage.clone();
                let localization = Arc::clone(&localization);
                let config = Arc::clone(&config);
                async move {
                    bot::callback_handler(bot, q, pool, localization, config, storage).await
                }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
