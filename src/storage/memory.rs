use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{max_suffix, Repository, StorageResult};
use crate::models::{
    parse_label, Group, NewGroup, NewQuestion, NewResult, Question, QuizResult, Test, TestSummary,
    User,
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    tests: BTreeMap<i64, Test>,
    questions: BTreeMap<i64, Question>,
    groups: BTreeMap<i64, Group>,
    label_marks: HashMap<char, u32>,
    users: HashMap<i64, User>,
    results: Vec<QuizResult>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-process repository. Every call holds the lock for its whole duration,
/// so each operation is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_test(&self, name: &str) -> StorageResult<Test> {
        let mut tables = self.tables.lock().await;
        let test = Test {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.tests.insert(test.id, test.clone());
        Ok(test)
    }

    async fn get_test(&self, test_id: i64) -> StorageResult<Option<Test>> {
        Ok(self.tables.lock().await.tests.get(&test_id).cloned())
    }

    async fn list_tests(&self) -> StorageResult<Vec<TestSummary>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tests
            .values()
            .map(|test| TestSummary {
                id: test.id,
                name: test.name.clone(),
                question_count: tables
                    .questions
                    .values()
                    .filter(|q| q.test_id == test.id)
                    .count(),
            })
            .collect())
    }

    async fn delete_test(&self, test_id: i64) -> StorageResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.tests.remove(&test_id).is_none() {
            return Ok(false);
        }
        tables.questions.retain(|_, q| q.test_id != test_id);
        Ok(true)
    }

    async fn add_question(&self, question: NewQuestion) -> StorageResult<Question> {
        let mut tables = self.tables.lock().await;
        let question = Question {
            id: tables.next_id(),
            test_id: question.test_id,
            text: question.text,
            options: question.options,
            correct: question.correct,
        };
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn list_questions(&self, test_id: i64) -> StorageResult<Vec<Question>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| q.test_id == test_id)
            .cloned()
            .collect())
    }

    async fn get_question(&self, question_id: i64) -> StorageResult<Option<Question>> {
        Ok(self.tables.lock().await.questions.get(&question_id).cloned())
    }

    async fn delete_question(&self, question_id: i64) -> StorageResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .questions
            .remove(&question_id)
            .is_some())
    }

    async fn count_questions(&self, test_id: i64) -> StorageResult<usize> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| q.test_id == test_id)
            .count())
    }

    async fn list_groups(&self, prefix: Option<char>) -> StorageResult<Vec<Group>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .groups
            .values()
            .filter(|g| prefix.map_or(true, |p| g.label.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn get_group(&self, group_id: i64) -> StorageResult<Option<Group>> {
        Ok(self.tables.lock().await.groups.get(&group_id).cloned())
    }

    async fn create_group(&self, group: NewGroup) -> StorageResult<Option<Group>> {
        let mut tables = self.tables.lock().await;
        if tables.groups.values().any(|g| g.label == group.label) {
            return Ok(None);
        }
        if let Some((letter, suffix)) = parse_label(&group.label) {
            let mark = tables.label_marks.entry(letter).or_insert(0);
            *mark = (*mark).max(suffix);
        }
        let group = Group {
            id: tables.next_id(),
            label: group.label,
            url: group.url,
            capacity: group.capacity,
            current_count: 0,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(Some(group))
    }

    async fn delete_group(&self, group_id: i64) -> StorageResult<bool> {
        Ok(self.tables.lock().await.groups.remove(&group_id).is_some())
    }

    async fn highest_suffix(&self, letter: char) -> StorageResult<u32> {
        let tables = self.tables.lock().await;
        let live = max_suffix(letter, tables.groups.values().map(|g| g.label.as_str()));
        let mark = tables.label_marks.get(&letter).copied().unwrap_or(0);
        Ok(live.max(mark))
    }

    async fn try_reserve_slot(
        &self,
        group_id: i64,
        default_capacity: u32,
    ) -> StorageResult<Option<Group>> {
        let mut tables = self.tables.lock().await;
        match tables.groups.get_mut(&group_id) {
            Some(group) if group.has_room(default_capacity) => {
                group.current_count += 1;
                Ok(Some(group.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn upsert_user(&self, user_id: i64, display_name: &str) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .users
            .entry(user_id)
            .and_modify(|user| user.display_name = display_name.to_string())
            .or_insert_with(|| User {
                id: user_id,
                display_name: display_name.to_string(),
                score: 0,
                last_group_id: None,
            });
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> StorageResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn record_quiz_outcome(
        &self,
        user_id: i64,
        score: u32,
        group_id: Option<i64>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        let user = tables.users.entry(user_id).or_insert_with(|| User {
            id: user_id,
            display_name: String::new(),
            score: 0,
            last_group_id: None,
        });
        user.score += i64::from(score);
        if group_id.is_some() {
            user.last_group_id = group_id;
        }
        Ok(())
    }

    async fn insert_result(&self, result: NewResult) -> StorageResult<QuizResult> {
        let mut tables = self.tables.lock().await;
        let result = QuizResult {
            id: tables.next_id(),
            user_id: result.user_id,
            score: result.score,
            total: result.total,
            group_id: result.group_id,
            created_at: Utc::now(),
        };
        tables.results.push(result.clone());
        Ok(result)
    }

    async fn list_results(&self) -> StorageResult<Vec<QuizResult>> {
        let tables = self.tables.lock().await;
        Ok(tables.results.iter().rev().cloned().collect())
    }
}
