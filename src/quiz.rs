use crate::app::App;
use crate::error::{BotError, BotResult};
use crate::event::{
    answer_token, start_test_token, Buttons, ChoiceButton, Incoming, OutboundMessage,
};
use crate::models::{AnswerLetter, Question};
use crate::scoring;
use crate::session::{self, SessionDialogue, State};

/// Lists the available tests as buttons that start them.
pub async fn offer_tests(app: &App) -> BotResult<Vec<OutboundMessage>> {
    let tests = app.repo().list_tests().await?;
    if tests.is_empty() {
        return Ok(vec![OutboundMessage::text("❌ There are no tests yet.")]);
    }

    let rows = tests
        .into_iter()
        .map(|test| vec![ChoiceButton::new(test.name, start_test_token(test.id))])
        .collect();
    Ok(vec![OutboundMessage::with_buttons(
        "Please choose the test you want to take:",
        Buttons::Choices(rows),
    )])
}

/// Loads the questions of `test_id` and presents the first one.
/// An empty test is refused before any session exists.
pub async fn start_test(
    app: &App,
    dialogue: &SessionDialogue,
    incoming: &Incoming,
    test_id: i64,
) -> BotResult<Vec<OutboundMessage>> {
    let questions = app.repo().list_questions(test_id).await?;
    if questions.is_empty() {
        return Err(BotError::EmptyTest(test_id));
    }

    app.repo()
        .upsert_user(incoming.user_id, &incoming.display_name)
        .await?;

    let prompt = question_prompt(&questions, 0);
    log::info!(
        "user {} started test {} ({} questions)",
        incoming.user_id,
        test_id,
        questions.len()
    );
    dialogue
        .update(State::Presenting {
            test_id,
            questions,
            cursor: 0,
            score: 0,
        })
        .await?;
    Ok(vec![prompt])
}

/// Scores one answer. The feedback always comes first, followed by either the
/// next question or the final summary.
pub async fn submit_answer(
    app: &App,
    dialogue: &SessionDialogue,
    user_id: i64,
    choice: &str,
) -> BotResult<Vec<OutboundMessage>> {
    let State::Presenting {
        test_id,
        questions,
        cursor,
        score,
    } = session::current_state(dialogue).await?
    else {
        return Err(BotError::NoActiveSession);
    };
    let Some(question) = questions.get(cursor) else {
        return Err(BotError::NoActiveSession);
    };

    let correct = question.is_correct(choice);
    let score = score + u32::from(correct);
    let feedback = if correct {
        OutboundMessage::text("✅ Correct!")
    } else {
        OutboundMessage::text(format!("❌ Wrong. Correct answer: {}", question.correct))
    };

    let cursor = cursor + 1;
    let mut replies = vec![feedback];
    if cursor == questions.len() {
        let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
        replies.push(scoring::finish(app, dialogue, user_id, test_id, score, total).await);
    } else {
        let prompt = question_prompt(&questions, cursor);
        dialogue
            .update(State::Presenting {
                test_id,
                questions,
                cursor,
                score,
            })
            .await?;
        replies.push(prompt);
    }
    Ok(replies)
}

fn question_prompt(questions: &[Question], cursor: usize) -> OutboundMessage {
    let question = &questions[cursor];
    let mut body = format!(
        "❓ Question {}/{}:\n\n{}\n",
        cursor + 1,
        questions.len(),
        question.text
    );
    for (letter, option) in AnswerLetter::ALL.iter().zip(&question.options) {
        body.push_str(&format!("\n{}) {}", letter, option));
    }
    OutboundMessage::with_buttons(body, answer_buttons())
}

fn answer_buttons() -> Buttons {
    let button =
        |letter: AnswerLetter| ChoiceButton::new(letter.as_str(), answer_token(letter.as_str()));
    Buttons::Choices(vec![
        vec![button(AnswerLetter::A), button(AnswerLetter::B)],
        vec![button(AnswerLetter::C), button(AnswerLetter::D)],
    ])
}
