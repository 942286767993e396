#![allow(dead_code)]

use std::sync::Arc;

use quiz_group_bot::event::{Event, Incoming, OutboundMessage};
use quiz_group_bot::models::{AnswerLetter, NewQuestion, Test};
use quiz_group_bot::storage::{MemoryRepository, Repository};
use quiz_group_bot::{App, Config};

pub const ADMIN: i64 = 100;
pub const PARTICIPANT: i64 = 200;
pub const ADMIN_CODE: &str = "open-sesame";

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "ADMIN_CODE" => Some(ADMIN_CODE.to_string()),
        "ADMIN_IDS" => Some(ADMIN.to_string()),
        _ => None,
    })
    .expect("test configuration")
}

pub struct TestApp {
    pub app: App,
    pub repo: Arc<MemoryRepository>,
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(test_config())
}

pub fn create_test_app_with(config: Config) -> TestApp {
    let _ = pretty_env_logger::try_init();
    let repo = Arc::new(MemoryRepository::new());
    let app = App::new(repo.clone(), config);
    TestApp { app, repo }
}

impl TestApp {
    pub async fn command(&self, user_id: i64, name: &str, args: &[&str]) -> Vec<OutboundMessage> {
        self.send(
            user_id,
            Event::Command {
                name: name.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        )
        .await
    }

    pub async fn text(&self, user_id: i64, body: &str) -> Vec<OutboundMessage> {
        self.send(
            user_id,
            Event::Text {
                body: body.to_string(),
            },
        )
        .await
    }

    pub async fn callback(&self, user_id: i64, token: &str) -> Vec<OutboundMessage> {
        self.send(
            user_id,
            Event::Callback {
                token: token.to_string(),
            },
        )
        .await
    }

    pub async fn send(&self, user_id: i64, event: Event) -> Vec<OutboundMessage> {
        self.app
            .handle(Incoming::new(user_id, format!("User {}", user_id), event))
            .await
    }

    /// Seeds a test whose questions have the given correct letters.
    pub async fn seed_test(&self, name: &str, answers: &[AnswerLetter]) -> Test {
        let test = self.repo.create_test(name).await.unwrap();
        for (i, correct) in answers.iter().enumerate() {
            self.repo
                .add_question(NewQuestion {
                    test_id: test.id,
                    text: format!("Question {}", i + 1),
                    options: [
                        format!("Option A{}", i + 1),
                        format!("Option B{}", i + 1),
                        format!("Option C{}", i + 1),
                        format!("Option D{}", i + 1),
                    ],
                    correct: *correct,
                })
                .await
                .unwrap();
        }
        test
    }
}

pub fn bodies(replies: &[OutboundMessage]) -> Vec<&str> {
    replies.iter().map(|r| r.body.as_str()).collect()
}
