use std::sync::Arc;

use crate::config::Config;
use crate::error::{BotError, BotResult};
use crate::event::{CallbackAction, Event, Incoming, OutboundMessage};
use crate::session::{self, SessionDialogue, SessionStorage, State};
use crate::storage::Repository;
use crate::{admin, authoring, quiz};

pub const MENU_START: &str = "🧪 Start test";
pub const MENU_SCORE: &str = "📊 My score";
pub const MENU_STOP: &str = "⏹ Stop";
pub const MENU_NEW_TEST: &str = "🆕 Create test";
pub const MENU_ADD_LINK: &str = "🔗 Add link";

const HINT: &str = "🤖 Pick an option from the menu, or use /newtest if you are an admin.";

/// Shared state of the bot: storage, configuration and the per-user sessions.
pub struct App {
    repo: Arc<dyn Repository>,
    config: Config,
    sessions: Arc<SessionStorage>,
}

impl App {
    pub fn new(repo: Arc<dyn Repository>, config: Config) -> Self {
        Self {
            repo,
            config,
            sessions: session::in_memory_storage(),
        }
    }

    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialogue(&self, user_id: i64) -> SessionDialogue {
        session::dialogue_for(&self.sessions, user_id)
    }

    /// The stored session of a user, `None` when there is none.
    pub async fn session(&self, user_id: i64) -> BotResult<Option<State>> {
        Ok(self.dialogue(user_id).get().await?)
    }

    /// Handles one inbound event and returns the replies in delivery order.
    /// Failures are turned into a reply; nothing here is fatal.
    pub async fn handle(&self, incoming: Incoming) -> Vec<OutboundMessage> {
        let dialogue = self.dialogue(incoming.user_id);
        match self.route(&incoming, &dialogue).await {
            Ok(replies) => replies,
            Err(err) => self.recover(&incoming, &dialogue, err).await,
        }
    }

    async fn route(
        &self,
        incoming: &Incoming,
        dialogue: &SessionDialogue,
    ) -> BotResult<Vec<OutboundMessage>> {
        match &incoming.event {
            Event::Command { name, args } => {
                self.on_command(incoming, dialogue, name, args).await
            }
            Event::Text { body } => self.on_text(incoming, dialogue, body).await,
            Event::Callback { token } => self.on_callback(incoming, dialogue, token).await,
        }
    }

    async fn on_command(
        &self,
        incoming: &Incoming,
        dialogue: &SessionDialogue,
        name: &str,
        args: &[String],
    ) -> BotResult<Vec<OutboundMessage>> {
        let user_id = incoming.user_id;
        log::debug!("user {} sent /{} {:?}", user_id, name, args);
        match name {
            "start" => quiz::offer_tests(self).await,
            "help" => Ok(vec![admin::help(self.config.is_admin(user_id))]),
            "newtest" => authoring::begin(self, dialogue, user_id).await,
            "done" => authoring::finish(dialogue).await,
            "cancel" => cancel(dialogue).await,
            "myscore" => admin::my_score(self, user_id).await,
            "showtests" => {
                admin::require_admin(self, user_id)?;
                admin::show_tests(self).await
            }
            "deletetest" => {
                admin::require_admin(self, user_id)?;
                admin::delete_test(self, args).await
            }
            "showquestions" => {
                admin::require_admin(self, user_id)?;
                admin::show_questions(self, args).await
            }
            "delquestion" => {
                admin::require_admin(self, user_id)?;
                admin::delete_question(self, args).await
            }
            "addlink" => {
                admin::require_admin(self, user_id)?;
                admin::add_link(self, args).await
            }
            "dellink" => {
                admin::require_admin(self, user_id)?;
                admin::delete_link(self, args).await
            }
            "showlinks" => {
                admin::require_admin(self, user_id)?;
                admin::show_links(self).await
            }
            "stats" => {
                admin::require_admin(self, user_id)?;
                admin::stats(self).await
            }
            _ => Ok(vec![OutboundMessage::text(HINT)]),
        }
    }

    async fn on_text(
        &self,
        incoming: &Incoming,
        dialogue: &SessionDialogue,
        body: &str,
    ) -> BotResult<Vec<OutboundMessage>> {
        let state = session::current_state(dialogue).await?;
        if state.is_authoring() {
            return authoring::handle_text(self, dialogue, state, body).await;
        }

        let user_id = incoming.user_id;
        match body {
            MENU_START => quiz::offer_tests(self).await,
            MENU_SCORE => admin::my_score(self, user_id).await,
            MENU_STOP => cancel(dialogue).await,
            MENU_NEW_TEST => authoring::begin(self, dialogue, user_id).await,
            MENU_ADD_LINK => {
                admin::require_admin(self, user_id)?;
                Ok(vec![OutboundMessage::text(admin::ADD_LINK_USAGE)])
            }
            _ => Ok(vec![OutboundMessage::text(HINT)]),
        }
    }

    async fn on_callback(
        &self,
        incoming: &Incoming,
        dialogue: &SessionDialogue,
        token: &str,
    ) -> BotResult<Vec<OutboundMessage>> {
        match CallbackAction::parse(token) {
            Some(CallbackAction::Answer(choice)) => {
                quiz::submit_answer(self, dialogue, incoming.user_id, &choice).await
            }
            Some(CallbackAction::StartTest(raw_id)) => {
                let test_id = raw_id
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| BotError::validation("❌ Invalid test id."))?;
                quiz::start_test(self, dialogue, incoming, test_id).await
            }
            None => Err(BotError::validation("❌ Unknown action.")),
        }
    }

    async fn recover(
        &self,
        incoming: &Incoming,
        dialogue: &SessionDialogue,
        err: BotError,
    ) -> Vec<OutboundMessage> {
        if err.is_user_error() {
            log::warn!("user {}: {}", incoming.user_id, err);
        } else {
            log::error!("user {}: {:?}", incoming.user_id, err);
        }

        if matches!(err, BotError::NoActiveSession) {
            if let Err(clear_err) = session::clear(dialogue).await {
                log::error!(
                    "could not clear the session of {}: {}",
                    incoming.user_id,
                    clear_err
                );
            }
        }

        vec![OutboundMessage::text(err.user_message())]
    }
}

/// Drops whatever the user was doing.
async fn cancel(dialogue: &SessionDialogue) -> BotResult<Vec<OutboundMessage>> {
    session::clear(dialogue).await?;
    Ok(vec![OutboundMessage::text("Test cancelled.")])
}
