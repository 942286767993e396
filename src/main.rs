use std::sync::Arc;

use dotenv::dotenv;
use quiz_group_bot::event::{Event, Incoming};
use quiz_group_bot::{storage, telegram, App, Config};
use teloxide::{prelude::*, types::ChatId};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting quiz group bot...");

    let config = Config::from_env()?;
    let repo = storage::connect(&config.database_url).await?;
    let app = Arc::new(App::new(repo, config));

    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        dptree::entry()
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_callback_query().endpoint(on_callback)),
    )
    .dependencies(dptree::deps![app])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

async fn on_message(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    let (Some(user), Some(text)) = (msg.from(), msg.text()) else {
        bot.send_message(msg.chat.id, "Please send text.").await?;
        return Ok(());
    };

    let incoming = telegram::incoming(user, Event::from_text(text));
    deliver(&bot, msg.chat.id, &app, incoming).await
}

async fn on_callback(bot: Bot, q: CallbackQuery, app: Arc<App>) -> HandlerResult {
    // Stops the client-side spinner; the reply itself follows as a message.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(token) = q.data.clone() else {
        return Ok(());
    };
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(ChatId(q.from.id.0 as i64));

    let incoming = telegram::incoming(&q.from, Event::Callback { token });
    deliver(&bot, chat_id, &app, incoming).await
}

async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    app: &App,
    incoming: Incoming,
) -> HandlerResult {
    for reply in app.handle(incoming).await {
        let request = bot.send_message(chat_id, reply.body);
        match reply.buttons {
            Some(buttons) => request.reply_markup(telegram::reply_markup(&buttons)).await?,
            None => request.await?,
        };
    }
    Ok(())
}
