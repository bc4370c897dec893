//! Telegram side of the bot: turns updates into router events and outcomes
//! into messages.

pub mod keyboards;
pub mod texts;

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use teloxide::{
    dispatching::{
        dialogue::{self, ErasedStorage},
        UpdateHandler,
    },
    prelude::*,
    types::{ParseMode, ReplyMarkup},
    utils::command::BotCommands,
};

use crate::broadcast::{Notifier, NotifyError};
use crate::quiz::{Event, Outcome, QuizId, Session, SessionRouter, UserId};
use keyboards::MenuItem;

pub type FriendDialogue = Dialogue<ChatState, ErasedStorage<ChatState>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// What the dialogue storage keeps per chat.
#[derive(Clone, Default, Debug, serde::Serialize, serde::Deserialize)]
pub enum ChatState {
    #[default]
    Idle,
    InFlow(Session),
}

impl ChatState {
    fn into_session(self) -> Option<Session> {
        match self {
            ChatState::Idle => None,
            ChatState::InFlow(session) => Some(session),
        }
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "open the menu, or start a quiz from a link.")]
    Start(String),
    #[command(description = "stop the current quiz.")]
    Cancel,
    #[command(description = "explain how it works.")]
    Help,
    #[command(description = "get occasional reminders.")]
    Subscribe,
    #[command(description = "stop the reminders.")]
    Unsubscribe,
}

/// Builds `t.me` deep links that open the bot with a quiz id.
pub struct Links {
    bot_username: String,
}

impl Links {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
        }
    }

    pub fn quiz(&self, id: &QuizId) -> String {
        format!("https://t.me/{}?start={id}", self.bot_username)
    }
}

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = teloxide::filter_command::<Command, _>().endpoint(on_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::endpoint(on_message));

    let callback_handler = Update::filter_callback_query().endpoint(on_callback);

    dialogue::enter::<Update, ErasedStorage<ChatState>, ChatState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}

/// Feeds one event through the router, stores the resulting session and
/// replies with the outcome.
async fn respond(
    bot: &Bot,
    dialogue: &FriendDialogue,
    router: &SessionRouter,
    links: &Links,
    user: UserId,
    session: Option<Session>,
    event: Event,
) -> HandlerResult {
    let (session, outcome) = router.handle_event(user, session, event).await;
    let answer_pending = session.is_some();
    match session {
        Some(session) => dialogue.update(ChatState::InFlow(session)).await?,
        None => dialogue.exit().await?,
    }

    let chat = dialogue.chat_id();
    let (text, markup): (String, Option<ReplyMarkup>) = match &outcome {
        Outcome::Prompt(prompt) => (
            texts::question(*prompt),
            Some(keyboards::for_step(prompt.step)),
        ),
        Outcome::ValidationRejected(err) => (texts::rejection(err), None),
        Outcome::QuizCreated(id) => (
            texts::quiz_created(&links.quiz(id)),
            Some(keyboards::main_menu()),
        ),
        Outcome::ScoreReported { score, owner_name } => (
            texts::score(*score, owner_name),
            Some(keyboards::main_menu()),
        ),
        Outcome::TargetNotFound => (texts::NOT_FOUND.into(), Some(keyboards::main_menu())),
        Outcome::ContextError => (texts::NO_FLOW.into(), Some(keyboards::main_menu())),
        Outcome::Cancelled => (texts::CANCELLED.into(), Some(keyboards::main_menu())),
        Outcome::CreationFailed => (texts::CREATION_FAILED.into(), Some(keyboards::main_menu())),
        Outcome::SubmissionFailed => (
            texts::SUBMISSION_FAILED.into(),
            Some(keyboards::main_menu()),
        ),
        Outcome::StoreFailure => (texts::store_failure(answer_pending).into(), None),
    };
    send(bot, chat, text, markup).await?;

    if let Some(offer) = outcome.follow_up().and_then(keyboards::follow_up) {
        send(bot, chat, texts::FOLLOW_UP.into(), Some(offer)).await?;
    }
    Ok(())
}

async fn send(
    bot: &Bot,
    chat: ChatId,
    text: String,
    markup: Option<ReplyMarkup>,
) -> HandlerResult {
    let mut request = bot.send_message(chat, text).parse_mode(ParseMode::Html);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

async fn on_command(
    bot: Bot,
    dialogue: FriendDialogue,
    state: ChatState,
    router: Arc<SessionRouter>,
    links: Arc<Links>,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = UserId(from.id.0);

    match cmd {
        Command::Start(payload) => {
            if let Err(e) = router.register_user(user, &from.first_name).await {
                warn!("could not register user {user}: {e}");
            }
            let payload = payload.trim();
            if payload.is_empty() {
                dialogue.exit().await?;
                send(&bot, msg.chat.id, texts::GREETING.into(), Some(keyboards::main_menu()))
                    .await?;
                return Ok(());
            }
            match QuizId::parse(payload) {
                Some(quiz_id) => {
                    let event = Event::BeginTaking { quiz_id };
                    respond(&bot, &dialogue, &router, &links, user, None, event).await?;
                }
                None => {
                    dialogue.exit().await?;
                    send(&bot, msg.chat.id, texts::NOT_FOUND.into(), Some(keyboards::main_menu()))
                        .await?;
                }
            }
        }
        Command::Cancel => {
            respond(&bot, &dialogue, &router, &links, user, state.into_session(), Event::Cancel)
                .await?;
        }
        Command::Help => {
            let commands = Command::descriptions().to_string();
            send(&bot, msg.chat.id, format!("{}\n\n{commands}", texts::ABOUT), None).await?;
        }
        Command::Subscribe => toggle_reminders(&bot, &router, msg.chat.id, user, true).await?,
        Command::Unsubscribe => toggle_reminders(&bot, &router, msg.chat.id, user, false).await?,
    }
    Ok(())
}

async fn toggle_reminders(
    bot: &Bot,
    router: &SessionRouter,
    chat: ChatId,
    user: UserId,
    on: bool,
) -> HandlerResult {
    let reply = match router.set_subscribed(user, on).await {
        Ok(()) if on => texts::SUBSCRIBED,
        Ok(()) => texts::UNSUBSCRIBED,
        Err(e) => {
            warn!("could not change subscription of {user}: {e}");
            texts::TRY_AGAIN
        }
    };
    send(bot, chat, reply.into(), None).await
}

async fn on_message(
    bot: Bot,
    dialogue: FriendDialogue,
    state: ChatState,
    router: Arc<SessionRouter>,
    links: Arc<Links>,
    msg: Message,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = UserId(from.id.0);
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, texts::TEXT_ONLY).await?;
        return Ok(());
    };

    // While a flow runs every message is an answer, menu labels included.
    if let ChatState::InFlow(session) = state {
        let answer = keyboards::resolve(session.step, text);
        return respond(&bot, &dialogue, &router, &links, user, Some(session), Event::Answer(answer))
            .await;
    }

    match MenuItem::from_label(text) {
        Some(MenuItem::CreateQuiz) => {
            respond(&bot, &dialogue, &router, &links, user, None, Event::BeginAuthoring).await?;
        }
        Some(MenuItem::TakeQuiz) => {
            send(&bot, msg.chat.id, texts::TAKE_HINT.into(), None).await?;
        }
        Some(MenuItem::MyQuizzes) => {
            let reply = match router.quizzes_of(user).await {
                Ok(quizzes) if quizzes.is_empty() => texts::NO_QUIZZES.to_string(),
                Ok(quizzes) => texts::my_quizzes(&quizzes, |quiz| links.quiz(&quiz.id)),
                Err(e) => {
                    warn!("could not list quizzes of {user}: {e}");
                    texts::TRY_AGAIN.to_string()
                }
            };
            send(&bot, msg.chat.id, reply, None).await?;
        }
        Some(MenuItem::About) => {
            send(&bot, msg.chat.id, texts::ABOUT.into(), None).await?;
        }
        None => {
            let event = Event::Answer(text.to_string());
            respond(&bot, &dialogue, &router, &links, user, None, event).await?;
        }
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    dialogue: FriendDialogue,
    state: ChatState,
    router: Arc<SessionRouter>,
    links: Arc<Links>,
    q: CallbackQuery,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    if q.data.as_deref() != Some(keyboards::BEGIN_AUTHORING) {
        return Ok(());
    }
    let user = UserId(q.from.id.0);
    respond(
        &bot,
        &dialogue,
        &router,
        &links,
        user,
        state.into_session(),
        Event::BeginAuthoring,
    )
    .await
}

/// Broadcast delivery through the Bot API. In private chats the chat id is
/// the user id.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError> {
        self.bot.send_message(ChatId(user.0 as i64), text).await?;
        Ok(())
    }
}
