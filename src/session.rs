use std::sync::Arc;

use teloxide::dispatching::dialogue::{Dialogue, ErasedStorage, InMemStorage, Storage};
use teloxide::types::ChatId;

use crate::error::BotResult;
use crate::models::Question;

pub type SessionStorage = ErasedStorage<State>;
pub type SessionDialogue = Dialogue<State, SessionStorage>;

/// The authoring working test and how many questions it already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DraftTarget {
    pub test_id: i64,
    pub count: usize,
}

/// A fully buffered question waiting for its correct letter.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub options: [String; 4],
}

/// Per-user mode. Exactly one is active at a time, and each variant carries
/// only what is meaningful in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Idle,
    AwaitingCode,
    AwaitingTestName,
    AwaitingQuestion {
        test: DraftTarget,
    },
    AwaitingOptionA {
        test: DraftTarget,
        text: String,
    },
    AwaitingOptionB {
        test: DraftTarget,
        text: String,
        a: String,
    },
    AwaitingOptionC {
        test: DraftTarget,
        text: String,
        a: String,
        b: String,
    },
    AwaitingOptionD {
        test: DraftTarget,
        text: String,
        a: String,
        b: String,
        c: String,
    },
    AwaitingCorrect {
        test: DraftTarget,
        draft: QuestionDraft,
    },
    Presenting {
        test_id: i64,
        questions: Vec<Question>,
        cursor: usize,
        score: u32,
    },
}

impl State {
    pub fn is_authoring(&self) -> bool {
        !matches!(self, State::Idle | State::Presenting { .. })
    }
}

/// Process-lifetime session storage; nothing survives a restart.
pub fn in_memory_storage() -> Arc<SessionStorage> {
    InMemStorage::<State>::new().erase()
}

pub fn dialogue_for(storage: &Arc<SessionStorage>, user_id: i64) -> SessionDialogue {
    Dialogue::new(storage.clone(), ChatId(user_id))
}

pub async fn current_state(dialogue: &SessionDialogue) -> BotResult<State> {
    Ok(dialogue.get().await?.unwrap_or_default())
}

/// Drops the user's session. Clearing an empty session does nothing.
pub async fn clear(dialogue: &SessionDialogue) -> BotResult<()> {
    if dialogue.get().await?.is_some() {
        dialogue.exit().await?;
        log::debug!("session of {} cleared", dialogue.chat_id().0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clearing_an_empty_session_is_a_no_op() {
        let storage = in_memory_storage();
        let dialogue = dialogue_for(&storage, 42);

        clear(&dialogue).await.unwrap();
        assert_eq!(dialogue.get().await.unwrap(), None);
        assert_eq!(current_state(&dialogue).await.unwrap(), State::Idle);
    }

    #[tokio::test]
    async fn sessions_are_per_user() {
        let storage = in_memory_storage();
        let alice = dialogue_for(&storage, 1);
        let bob = dialogue_for(&storage, 2);

        alice.update(State::AwaitingCode).await.unwrap();

        assert_eq!(current_state(&alice).await.unwrap(), State::AwaitingCode);
        assert_eq!(current_state(&bob).await.unwrap(), State::Idle);

        clear(&alice).await.unwrap();
        assert_eq!(alice.get().await.unwrap(), None);
    }
}
