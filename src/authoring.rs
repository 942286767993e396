use crate::admin;
use crate::app::App;
use crate::error::{BotError, BotResult};
use crate::event::OutboundMessage;
use crate::models::{AnswerLetter, NewQuestion};
use crate::session::{self, DraftTarget, QuestionDraft, SessionDialogue, State};

/// Starts building a new test. Only admins get as far as the code prompt.
pub async fn begin(
    app: &App,
    dialogue: &SessionDialogue,
    user_id: i64,
) -> BotResult<Vec<OutboundMessage>> {
    admin::require_admin(app, user_id)?;
    dialogue.update(State::AwaitingCode).await?;
    Ok(reply("🔑 Please enter the admin code:"))
}

/// Ends authoring from any step. Questions already saved stay; a half-entered
/// one is dropped. Outside authoring this does nothing.
pub async fn finish(dialogue: &SessionDialogue) -> BotResult<Vec<OutboundMessage>> {
    let state = session::current_state(dialogue).await?;
    if !state.is_authoring() {
        return Ok(Vec::new());
    }
    session::clear(dialogue).await?;
    log::debug!("authoring finished by {}", dialogue.chat_id().0);
    Ok(reply("✅ Test creation finished."))
}

/// Advances the authoring flow by one text input. Invalid input leaves the
/// state untouched so the same prompt applies again.
pub async fn handle_text(
    app: &App,
    dialogue: &SessionDialogue,
    state: State,
    text: &str,
) -> BotResult<Vec<OutboundMessage>> {
    let config = app.config();
    match state {
        State::AwaitingCode => {
            if text != config.admin_code {
                return Err(BotError::validation("❌ Wrong code."));
            }
            dialogue.update(State::AwaitingTestName).await?;
            Ok(reply(format!(
                "✅ Code accepted. Enter the test name (max {} characters):",
                config.test_name_max_len
            )))
        }
        State::AwaitingTestName => {
            let name: String = non_empty(text, "Test name")?
                .chars()
                .take(config.test_name_max_len)
                .collect();
            let test = app.repo().create_test(&name).await?;
            log::info!("test {} ({:?}) created", test.id, test.name);
            dialogue
                .update(State::AwaitingQuestion {
                    test: DraftTarget {
                        test_id: test.id,
                        count: 0,
                    },
                })
                .await?;
            Ok(reply(format!(
                "✅ Test created (id={}). Now enter question 1:",
                test.id
            )))
        }
        State::AwaitingQuestion { test } => {
            if test.count >= config.max_questions {
                return Err(BotError::validation(format!(
                    "❌ The test already has the maximum of {} questions. Send /done to finish.",
                    config.max_questions
                )));
            }
            let text = non_empty(text, "Question text")?.to_string();
            dialogue.update(State::AwaitingOptionA { test, text }).await?;
            Ok(reply("Enter option A:"))
        }
        State::AwaitingOptionA { test, text: question } => {
            let a = non_empty(text, "Option A")?.to_string();
            dialogue
                .update(State::AwaitingOptionB {
                    test,
                    text: question,
                    a,
                })
                .await?;
            Ok(reply("Enter option B:"))
        }
        State::AwaitingOptionB {
            test,
            text: question,
            a,
        } => {
            let b = non_empty(text, "Option B")?.to_string();
            dialogue
                .update(State::AwaitingOptionC {
                    test,
                    text: question,
                    a,
                    b,
                })
                .await?;
            Ok(reply("Enter option C:"))
        }
        State::AwaitingOptionC {
            test,
            text: question,
            a,
            b,
        } => {
            let c = non_empty(text, "Option C")?.to_string();
            dialogue
                .update(State::AwaitingOptionD {
                    test,
                    text: question,
                    a,
                    b,
                    c,
                })
                .await?;
            Ok(reply("Enter option D:"))
        }
        State::AwaitingOptionD {
            test,
            text: question,
            a,
            b,
            c,
        } => {
            let d = non_empty(text, "Option D")?.to_string();
            dialogue
                .update(State::AwaitingCorrect {
                    test,
                    draft: QuestionDraft {
                        text: question,
                        options: [a, b, c, d],
                    },
                })
                .await?;
            Ok(reply("Enter the correct answer (A/B/C/D):"))
        }
        State::AwaitingCorrect { test, draft } => {
            let correct = AnswerLetter::parse(text).ok_or_else(|| {
                BotError::validation("❌ The correct answer must be A, B, C or D.")
            })?;
            app.repo()
                .add_question(NewQuestion {
                    test_id: test.test_id,
                    text: draft.text,
                    options: draft.options,
                    correct,
                })
                .await?;

            let test = DraftTarget {
                count: test.count + 1,
                ..test
            };
            log::debug!("test {} now has {} questions", test.test_id, test.count);
            dialogue.update(State::AwaitingQuestion { test }).await?;

            if test.count >= config.max_questions {
                Ok(reply(format!(
                    "✅ Question added. Total questions: {}. That is the maximum, send /done to finish.",
                    test.count
                )))
            } else {
                Ok(reply(format!(
                    "✅ Question added. Total questions: {}. Send the next question or /done.",
                    test.count
                )))
            }
        }
        State::Idle | State::Presenting { .. } => Ok(Vec::new()),
    }
}

fn non_empty<'t>(text: &'t str, what: &str) -> BotResult<&'t str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(BotError::validation(format!("❌ {} cannot be empty.", what)));
    }
    Ok(trimmed)
}

fn reply(body: impl Into<String>) -> Vec<OutboundMessage> {
    vec![OutboundMessage::text(body)]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::error::STORAGE_FAILURE_MESSAGE;
    use crate::event::{Event, Incoming};
    use crate::storage::testing::FaultyRepository;
    use crate::storage::Repository;

    const ADMIN: i64 = 1;

    fn app(repo: FaultyRepository) -> App {
        let config = Config::from_lookup(|key| match key {
            "ADMIN_CODE" => Some("secret".to_string()),
            "ADMIN_IDS" => Some(ADMIN.to_string()),
            _ => None,
        })
        .unwrap();
        App::new(Arc::new(repo), config)
    }

    async fn say(app: &App, event: Event) -> Vec<OutboundMessage> {
        app.handle(Incoming::new(ADMIN, "Admin", event)).await
    }

    async fn text(app: &App, body: &str) -> Vec<OutboundMessage> {
        say(
            app,
            Event::Text {
                body: body.to_string(),
            },
        )
        .await
    }

    #[tokio::test]
    async fn failed_question_insert_keeps_the_step() {
        let app = app(FaultyRepository {
            fail_question_inserts: true,
            ..Default::default()
        });
        say(
            &app,
            Event::Command {
                name: "newtest".to_string(),
                args: Vec::new(),
            },
        )
        .await;
        for input in ["secret", "Fractions", "1 + 1?", "1", "2", "3", "4"] {
            text(&app, input).await;
        }

        let replies = text(&app, "B").await;

        assert_eq!(replies, vec![OutboundMessage::text(STORAGE_FAILURE_MESSAGE)]);
        let Some(State::AwaitingCorrect { test, draft }) = app.session(ADMIN).await.unwrap()
        else {
            panic!("authoring step was not kept");
        };
        assert_eq!(test.count, 0);
        assert_eq!(draft.text, "1 + 1?");
        assert_eq!(app.repo().count_questions(test.test_id).await.unwrap(), 0);
    }
}
