use crate::allocator::{Allocation, GroupAllocator};
use crate::app::App;
use crate::error::BotResult;
use crate::event::OutboundMessage;
use crate::models::{score_percentage, NewResult, QuizResult, RoutingLetter};
use crate::session::{self, SessionDialogue};

/// What a finished quiz produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub letter: RoutingLetter,
    /// `None` when no group could be reserved; the result is recorded anyway.
    pub allocation: Option<Allocation>,
    pub result: QuizResult,
}

impl Completion {
    pub fn message(&self) -> OutboundMessage {
        let mut body = format!(
            "✅ Test finished!\nResult: {}/{} ({}%)\n",
            self.score, self.total, self.percentage
        );
        match &self.allocation {
            Some(allocation) => {
                body.push_str(&format!(
                    "You joined the {} group {}.\n👉 {}",
                    self.letter, allocation.group.label, allocation.group.url
                ));
                if allocation.created {
                    body.push_str("\n(A new group was created automatically)");
                }
            }
            None => body.push_str(&format!(
                "No free slot was found in the {} groups right now.",
                self.letter
            )),
        }
        OutboundMessage::text(body)
    }
}

/// Scores, routes and records a finished quiz.
/// A failed allocation degrades to a result without a group.
pub async fn record(
    app: &App,
    user_id: i64,
    test_id: i64,
    score: u32,
    total: u32,
) -> BotResult<Completion> {
    let percentage = score_percentage(score, total);
    let letter = RoutingLetter::for_score(score, total, app.config().a_threshold);

    let allocation = match GroupAllocator::new(app.repo(), app.config())
        .allocate(letter)
        .await
    {
        Ok(allocation) => Some(allocation),
        Err(err) => {
            log::error!(
                "no {} group for user {} after test {}: {}",
                letter,
                user_id,
                test_id,
                err
            );
            None
        }
    };
    let group_id = allocation.as_ref().map(|a| a.group.id);

    let result = app
        .repo()
        .insert_result(NewResult {
            user_id,
            score,
            total,
            group_id,
        })
        .await?;
    app.repo()
        .record_quiz_outcome(user_id, score, group_id)
        .await?;

    log::info!(
        "user {} finished test {}: {}/{} ({}%), routed to {}",
        user_id,
        test_id,
        score,
        total,
        percentage,
        allocation
            .as_ref()
            .map_or_else(|| format!("{} (no slot)", letter), |a| a.group.label.clone())
    );

    Ok(Completion {
        score,
        total,
        percentage,
        letter,
        allocation,
        result,
    })
}

/// Records the quiz and drops the quiz session, whether or not recording worked.
pub async fn finish(
    app: &App,
    dialogue: &SessionDialogue,
    user_id: i64,
    test_id: i64,
    score: u32,
    total: u32,
) -> OutboundMessage {
    let outcome = record(app, user_id, test_id, score, total).await;

    if let Err(err) = session::clear(dialogue).await {
        log::error!("could not clear the session of {}: {}", user_id, err);
    }

    match outcome {
        Ok(completion) => completion.message(),
        Err(err) => {
            log::error!("could not record the result of user {}: {:?}", user_id, err);
            OutboundMessage::text(err.user_message())
        }
    }
}
