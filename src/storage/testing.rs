use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{MemoryRepository, Repository, StorageResult};
use crate::error::StorageError;
use crate::models::{
    Group, NewGroup, NewQuestion, NewResult, Question, QuizResult, Test, TestSummary, User,
};

/// A `MemoryRepository` with switchable faults.
#[derive(Default)]
pub(crate) struct FaultyRepository {
    pub inner: MemoryRepository,
    pub fail_group_listing: bool,
    pub fail_question_inserts: bool,
    /// While set, group listings come back empty and `highest_suffix` is 0,
    /// as seen by a finisher that read just before someone else created a
    /// group. The next `create_group` clears it.
    pub stale_groups: AtomicBool,
}

fn broken(what: &str) -> StorageError {
    StorageError::Corrupt(format!("{} unavailable", what))
}

#[async_trait]
impl Repository for FaultyRepository {
    async fn create_test(&self, name: &str) -> StorageResult<Test> {
        self.inner.create_test(name).await
    }

    async fn get_test(&self, test_id: i64) -> StorageResult<Option<Test>> {
        self.inner.get_test(test_id).await
    }

    async fn list_tests(&self) -> StorageResult<Vec<TestSummary>> {
        self.inner.list_tests().await
    }

    async fn delete_test(&self, test_id: i64) -> StorageResult<bool> {
        self.inner.delete_test(test_id).await
    }

    async fn add_question(&self, question: NewQuestion) -> StorageResult<Question> {
        if self.fail_question_inserts {
            return Err(broken("questions"));
        }
        self.inner.add_question(question).await
    }

    async fn list_questions(&self, test_id: i64) -> StorageResult<Vec<Question>> {
        self.inner.list_questions(test_id).await
    }

    async fn get_question(&self, question_id: i64) -> StorageResult<Option<Question>> {
        self.inner.get_question(question_id).await
    }

    async fn delete_question(&self, question_id: i64) -> StorageResult<bool> {
        self.inner.delete_question(question_id).await
    }

    async fn count_questions(&self, test_id: i64) -> StorageResult<usize> {
        self.inner.count_questions(test_id).await
    }

    async fn list_groups(&self, prefix: Option<char>) -> StorageResult<Vec<Group>> {
        if self.fail_group_listing {
            return Err(broken("groups"));
        }
        if self.stale_groups.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner.list_groups(prefix).await
    }

    async fn get_group(&self, group_id: i64) -> StorageResult<Option<Group>> {
        self.inner.get_group(group_id).await
    }

    async fn create_group(&self, group: NewGroup) -> StorageResult<Option<Group>> {
        self.stale_groups.store(false, Ordering::SeqCst);
        self.inner.create_group(group).await
    }

    async fn delete_group(&self, group_id: i64) -> StorageResult<bool> {
        self.inner.delete_group(group_id).await
    }

    async fn highest_suffix(&self, letter: char) -> StorageResult<u32> {
        if self.stale_groups.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner.highest_suffix(letter).await
    }

    async fn try_reserve_slot(
        &self,
        group_id: i64,
        default_capacity: u32,
    ) -> StorageResult<Option<Group>> {
        self.inner.try_reserve_slot(group_id, default_capacity).await
    }

    async fn upsert_user(&self, user_id: i64, display_name: &str) -> StorageResult<()> {
        self.inner.upsert_user(user_id, display_name).await
    }

    async fn get_user(&self, user_id: i64) -> StorageResult<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn record_quiz_outcome(
        &self,
        user_id: i64,
        score: u32,
        group_id: Option<i64>,
    ) -> StorageResult<()> {
        self.inner
            .record_quiz_outcome(user_id, score, group_id)
            .await
    }

    async fn insert_result(&self, result: NewResult) -> StorageResult<QuizResult> {
        self.inner.insert_result(result).await
    }

    async fn list_results(&self) -> StorageResult<Vec<QuizResult>> {
        self.inner.list_results().await
    }
}
