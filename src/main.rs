mod bot;
mod broadcast;
mod config;
mod error;
mod quiz;
mod store;

use std::sync::Arc;

use dotenv::dotenv;
use log::{error, info, warn};
use teloxide::{
    dispatching::dialogue::{ErasedStorage, InMemStorage, Storage},
    prelude::*,
};

use bot::{ChatState, Links, TelegramNotifier};
use config::Config;
use quiz::ident::RandomIds;
use quiz::SessionRouter;
use store::{QuizStore, SqliteStore};

type DialogueStorage = Arc<ErasedStorage<ChatState>>;

#[tokio::main]
async fn main() {
    let dotenv_loaded = dotenv().is_ok();
    pretty_env_logger::init();
    if !dotenv_loaded {
        info!("No .env file, using the process environment");
    }

    if let Err(e) = run().await {
        error!("bot stopped: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    info!("Starting friendship quiz bot...");

    let bot = Bot::from_env();

    info!("Opening the database at {}", config.database_path);
    let store: Arc<dyn QuizStore> =
        Arc::new(SqliteStore::open(&config.database_path, config.store_timeout)?);

    let bot_username = match config.bot_username.clone() {
        Some(name) => name,
        None => bot.get_me().await?.username().to_string(),
    };
    let links = Arc::new(Links::new(bot_username));

    let router = Arc::new(SessionRouter::with_ids(
        store.clone(),
        Box::new(RandomIds),
        config.id_attempts,
    ));

    // Sessions are deliberately kept in memory only: a restart just means
    // answering the questions again.
    let sessions: DialogueStorage = InMemStorage::<ChatState>::new().erase();

    let broadcast = match config.broadcast_interval {
        Some(period) => {
            info!("Broadcasting every {period:?}");
            Some(broadcast::spawn(
                store.clone(),
                Arc::new(TelegramNotifier::new(bot.clone())),
                config.broadcast_message.clone(),
                period,
                config.broadcast_concurrency,
            ))
        }
        None => {
            warn!("Broadcast is disabled");
            None
        }
    };

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![sessions, router, links])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    if let Some(handle) = broadcast {
        handle.abort();
    }
    info!("Bye");
    Ok(())
}
