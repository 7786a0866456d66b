use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use log::{debug, info, warn};
use selfcheck_bot::actions::{Action, Command};
use selfcheck_bot::config::Config;
use selfcheck_bot::locale::{Locale, UiStrings};
use selfcheck_bot::profile::{self, ProfileDialogue, ProfileStorage};
use selfcheck_bot::quiz::{
    self, scoring, AdvanceResult, Catalog, CurrentQuestion, MemorySessionStore, QuizEngine,
    QuizError,
};
use selfcheck_bot::render;
use teloxide::{
    dispatching::dialogue::{serializer::Json, SqliteStorage, Storage},
    error_handlers::LoggingErrorHandler,
    prelude::*,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();
    info!("Starting self-check bot...");

    let config = Config::from_env()?;

    let catalog = Arc::new(match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::embedded()?,
    });
    let locale = Arc::new(match &config.strings_path {
        Some(path) => Locale::from_path(path, &catalog)?,
        None => Locale::embedded(&catalog)?,
    });
    info!("Questionnaires and UI strings loaded");

    let sessions = Arc::new(match config.session_ttl {
        Some(ttl) => MemorySessionStore::with_ttl(ttl),
        None => MemorySessionStore::new(),
    });
    if let Some(ttl) = sessions.ttl() {
        info!("Idle quiz sessions expire after {}s", ttl.as_secs());
        let sweeper = sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_PERIOD);
            loop {
                interval.tick().await;
                let evicted = sweeper.evict_expired();
                if evicted > 0 {
                    debug!("Evicted {evicted} idle sessions");
                }
            }
        });
    }
    let engine = Arc::new(QuizEngine::new(catalog, sessions));

    info!("Opening dialogue storage at {}", config.dialogue_db.display());
    let storage: ProfileStorage =
        SqliteStorage::open(&config.dialogue_db.to_string_lossy(), Json)
            .await?
            .erase();

    let bot = Bot::from_env();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("Dispatching updates");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![storage, engine, locale])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn on_command(
    bot: Bot,
    storage: ProfileStorage,
    msg: Message,
    cmd: Command,
    engine: Arc<QuizEngine>,
    locale: Arc<Locale>,
) -> HandlerResult {
    let sender = msg.from();
    let profile = profile::profile(storage, sender.map(|user| user.id), msg.chat.id);
    let client_code = sender.and_then(|user| user.language_code.as_deref());
    match cmd {
        Command::Start | Command::Lang => {
            bot.send_message(msg.chat.id, locale.language_prompt())
                .reply_markup(render::language_keyboard(&locale))
                .await?;
        }
        Command::Help => {
            let lang = profile::resolve_language(&profile, client_code).await?;
            bot.send_message(msg.chat.id, &locale.get(lang).help).await?;
        }
        Command::Check => {
            let lang = profile::resolve_language(&profile, client_code).await?;
            let strings = locale.get(lang);
            bot.send_message(msg.chat.id, &strings.choose_quiz)
                .reply_markup(render::quiz_keyboard(strings, engine.catalog(), lang))
                .await?;
        }
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    storage: ProfileStorage,
    q: CallbackQuery,
    engine: Arc<QuizEngine>,
    locale: Arc<Locale>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let action = match data.parse::<Action>() {
        Ok(action) => action,
        Err(err) => {
            warn!("Ignoring callback from user {}: {err}", q.from.id);
            return Ok(());
        }
    };
    let Some(message) = q.message.as_ref() else {
        warn!("Callback from user {} has no message attached", q.from.id);
        return Ok(());
    };
    let user = quiz::UserId(q.from.id.0);
    let profile = profile::profile(storage, Some(q.from.id), message.chat.id);
    let client_code = q.from.language_code.as_deref();

    match action {
        Action::PickLanguage(lang) => {
            profile::set_language(&profile, lang).await?;
            let strings = locale.get(lang);
            bot.edit_message_text(message.chat.id, message.id, &strings.lang_set)
                .await?;
            bot.send_message(message.chat.id, &strings.welcome).await?;
        }
        Action::StartQuiz(choice) => {
            let lang = profile::resolve_language(&profile, client_code).await?;
            let quizzes = choice.quizzes(engine.catalog(), lang);
            let session = engine.start_session(user, lang, &quizzes)?;
            let question = engine.question_for(&session)?;
            edit_question(&bot, message, locale.get(lang), &question).await?;
        }
        Action::Answer(points) => {
            on_answer(&bot, &profile, client_code, message, user, points, &engine, &locale).await?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn on_answer(
    bot: &Bot,
    profile: &ProfileDialogue,
    client_code: Option<&str>,
    message: &Message,
    user: quiz::UserId,
    points: u32,
    engine: &QuizEngine,
    locale: &Locale,
) -> HandlerResult {
    let advanced = match engine.record_answer(user, points) {
        Ok(advanced) => advanced,
        Err(QuizError::NoActiveSession(_)) => {
            warn!("Answer from user {user} without an active session");
            let lang = profile::resolve_language(profile, client_code).await?;
            bot.edit_message_text(message.chat.id, message.id, &locale.get(lang).session_expired)
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let finished = match advanced {
        AdvanceResult::NextQuestion => {
            let session = engine.session(user)?;
            let question = engine.question_for(&session)?;
            return edit_question(bot, message, locale.get(session.lang()), &question).await;
        }
        AdvanceResult::QuizFinished(finished) => finished,
    };

    let catalog = engine.catalog();
    let strings = locale.get(finished.lang);
    let quiz = catalog.get_quiz(finished.lang, &finished.quiz)?;
    let score = scoring::score(catalog, finished.lang, &finished.quiz, &finished.answers)?;
    info!(
        "User {user} finished {} with {}/{}",
        finished.quiz, score.total, score.max
    );

    bot.edit_message_text(message.chat.id, message.id, render::result_text(strings, quiz, &score))
        .await?;
    bot.send_message(message.chat.id, render::reflection_text(strings, quiz))
        .await?;

    if finished.has_next() {
        bot.send_message(message.chat.id, &strings.start_next).await?;
        let question = engine.current_question(user)?;
        bot.send_message(message.chat.id, render::question_text(strings, &question))
            .reply_markup(render::scale_keyboard(strings))
            .await?;
        return Ok(());
    }

    let snapshot = scoring::composite_indices(catalog, finished.lang, &finished.totals)?;
    if !snapshot.is_empty() {
        bot.send_message(message.chat.id, render::snapshot_text(strings, &snapshot))
            .await?;
    }
    bot.send_message(message.chat.id, &strings.cmd_again).await?;
    Ok(())
}

async fn edit_question(
    bot: &Bot,
    message: &Message,
    strings: &UiStrings,
    question: &CurrentQuestion,
) -> HandlerResult {
    bot.edit_message_text(message.chat.id, message.id, render::question_text(strings, question))
        .reply_markup(render::scale_keyboard(strings))
        .await?;
    Ok(())
}
