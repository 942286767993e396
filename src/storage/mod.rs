use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{
    Group, NewGroup, NewQuestion, NewResult, Question, QuizResult, Test, TestSummary, User,
};

pub mod memory;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

pub type StorageResult<T> = Result<T, StorageError>;

/// CRUD access to everything the bot persists.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_test(&self, name: &str) -> StorageResult<Test>;
    async fn get_test(&self, test_id: i64) -> StorageResult<Option<Test>>;
    async fn list_tests(&self) -> StorageResult<Vec<TestSummary>>;
    /// Deletes the test together with its questions. Returns false if it did not exist.
    async fn delete_test(&self, test_id: i64) -> StorageResult<bool>;

    async fn add_question(&self, question: NewQuestion) -> StorageResult<Question>;
    /// Questions of a test in creation order.
    async fn list_questions(&self, test_id: i64) -> StorageResult<Vec<Question>>;
    async fn get_question(&self, question_id: i64) -> StorageResult<Option<Question>>;
    async fn delete_question(&self, question_id: i64) -> StorageResult<bool>;
    async fn count_questions(&self, test_id: i64) -> StorageResult<usize>;

    /// Groups whose label starts with `prefix` (all groups for `None`), ascending by id.
    async fn list_groups(&self, prefix: Option<char>) -> StorageResult<Vec<Group>>;
    async fn get_group(&self, group_id: i64) -> StorageResult<Option<Group>>;
    /// Inserts a group with an empty roster. Returns `None` if the label is taken.
    async fn create_group(&self, group: NewGroup) -> StorageResult<Option<Group>>;
    async fn delete_group(&self, group_id: i64) -> StorageResult<bool>;
    /// Highest numeric suffix ever used for `letter`, including deleted groups.
    async fn highest_suffix(&self, letter: char) -> StorageResult<u32>;
    /// Takes one slot if `current_count < capacity`, as a single atomic step.
    /// Returns the updated group, or `None` when it is full or gone.
    async fn try_reserve_slot(
        &self,
        group_id: i64,
        default_capacity: u32,
    ) -> StorageResult<Option<Group>>;

    async fn upsert_user(&self, user_id: i64, display_name: &str) -> StorageResult<()>;
    async fn get_user(&self, user_id: i64) -> StorageResult<Option<User>>;
    /// Adds `score` to the cumulative score and, when given, records the last group.
    async fn record_quiz_outcome(
        &self,
        user_id: i64,
        score: u32,
        group_id: Option<i64>,
    ) -> StorageResult<()>;

    async fn insert_result(&self, result: NewResult) -> StorageResult<QuizResult>;
    /// All results, newest first.
    async fn list_results(&self) -> StorageResult<Vec<QuizResult>>;
}

/// Opens the repository named by `database_url`; `memory` keeps everything in process.
pub async fn connect(database_url: &str) -> StorageResult<Arc<dyn Repository>> {
    if database_url == "memory" {
        log::warn!("using the in-memory repository, nothing will be persisted");
        return Ok(Arc::new(MemoryRepository::new()));
    }
    let repo = SqliteRepository::connect(database_url).await?;
    Ok(Arc::new(repo))
}

/// Highest suffix among `labels` that belong to `letter`.
pub(crate) fn max_suffix<'a>(letter: char, labels: impl Iterator<Item = &'a str>) -> u32 {
    labels
        .filter_map(crate::models::parse_label)
        .filter(|(l, _)| *l == letter)
        .map(|(_, suffix)| suffix)
        .max()
        .unwrap_or(0)
}
