use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use super::{max_suffix, Repository, StorageResult};
use crate::error::StorageError;
use crate::models::{
    parse_label, AnswerLetter, Group, NewGroup, NewQuestion, NewResult, Question, QuizResult, Test,
    TestSummary, User,
};

const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS tests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        test_id INTEGER NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
        question TEXT NOT NULL,
        option_a TEXT NOT NULL,
        option_b TEXT NOT NULL,
        option_c TEXT NOT NULL,
        option_d TEXT NOT NULL,
        correct TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chat_groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL UNIQUE,
        url TEXT NOT NULL,
        capacity INTEGER,
        current_count INTEGER NOT NULL DEFAULT 0 CHECK (current_count >= 0)
    )",
    "CREATE TABLE IF NOT EXISTS group_label_marks (
        letter TEXT PRIMARY KEY,
        last_suffix INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        display_name TEXT NOT NULL DEFAULT '',
        score INTEGER NOT NULL DEFAULT 0,
        last_group_id INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        score INTEGER NOT NULL,
        total INTEGER NOT NULL,
        group_id INTEGER,
        created_at TEXT NOT NULL
    )",
];

const GROUP_COLUMNS: &str = "id, label, url, capacity, current_count";
const QUESTION_COLUMNS: &str =
    "id, test_id, question, option_a, option_b, option_c, option_d, correct";
const RESULT_COLUMNS: &str = "id, user_id, score, total, group_id, created_at";

#[derive(FromRow)]
struct TestRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<TestRow> for Test {
    fn from(row: TestRow) -> Self {
        Test {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct TestSummaryRow {
    id: i64,
    name: String,
    question_count: i64,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    test_id: i64,
    question: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct: String,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StorageError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let correct = AnswerLetter::parse(&row.correct).ok_or_else(|| {
            StorageError::Corrupt(format!(
                "question {} has correct answer {:?}",
                row.id, row.correct
            ))
        })?;
        Ok(Question {
            id: row.id,
            test_id: row.test_id,
            text: row.question,
            options: [row.option_a, row.option_b, row.option_c, row.option_d],
            correct,
        })
    }
}

#[derive(FromRow)]
struct GroupRow {
    id: i64,
    label: String,
    url: String,
    capacity: Option<i64>,
    current_count: i64,
}

impl TryFrom<GroupRow> for Group {
    type Error = StorageError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: &str| StorageError::Corrupt(format!("group {} has a bad {}", row.id, what));
        let capacity = row
            .capacity
            .map(u32::try_from)
            .transpose()
            .map_err(|_| corrupt("capacity"))?;
        let current_count = u32::try_from(row.current_count).map_err(|_| corrupt("count"))?;
        Ok(Group {
            id: row.id,
            label: row.label,
            url: row.url,
            capacity,
            current_count,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    display_name: String,
    score: i64,
    last_group_id: Option<i64>,
}

#[derive(FromRow)]
struct ResultRow {
    id: i64,
    user_id: i64,
    score: i64,
    total: i64,
    group_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for QuizResult {
    type Error = StorageError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let corrupt = || StorageError::Corrupt(format!("result {} has a bad score", row.id));
        Ok(QuizResult {
            id: row.id,
            user_id: row.user_id,
            score: u32::try_from(row.score).map_err(|_| corrupt())?,
            total: u32::try_from(row.total).map_err(|_| corrupt())?,
            group_id: row.group_id,
            created_at: row.created_at,
        })
    }
}

/// SQLite-backed repository.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects and creates the schema if needed. `sqlite::memory:` gets a single
    /// long-lived connection so the database is not lost between queries.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        log::info!("database ready at {}", url);

        Ok(Self { pool })
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn create_test(&self, name: &str) -> StorageResult<Test> {
        let row = sqlx::query_as::<_, TestRow>(
            "INSERT INTO tests (name, created_at) VALUES (?, ?) RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_test(&self, test_id: i64) -> StorageResult<Option<Test>> {
        let row = sqlx::query_as::<_, TestRow>(
            "SELECT id, name, created_at FROM tests WHERE id = ?",
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Test::from))
    }

    async fn list_tests(&self) -> StorageResult<Vec<TestSummary>> {
        let rows = sqlx::query_as::<_, TestSummaryRow>(
            "SELECT t.id, t.name, COUNT(q.id) AS question_count
             FROM tests t LEFT JOIN questions q ON q.test_id = t.id
             GROUP BY t.id ORDER BY t.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| TestSummary {
                id: row.id,
                name: row.name,
                question_count: row.question_count.max(0) as usize,
            })
            .collect())
    }

    async fn delete_test(&self, test_id: i64) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM questions WHERE test_id = ?")
            .bind(test_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM tests WHERE id = ?")
            .bind(test_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn add_question(&self, question: NewQuestion) -> StorageResult<Question> {
        let [a, b, c, d] = question.options;
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "INSERT INTO questions (test_id, question, option_a, option_b, option_c, option_d, correct)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(question.test_id)
        .bind(question.text)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(question.correct.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_questions(&self, test_id: i64) -> StorageResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE test_id = ? ORDER BY id",
            QUESTION_COLUMNS
        ))
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Question::try_from).collect()
    }

    async fn get_question(&self, question_id: i64) -> StorageResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE id = ?",
            QUESTION_COLUMNS
        ))
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Question::try_from).transpose()
    }

    async fn delete_question(&self, question_id: i64) -> StorageResult<bool> {
        let deleted = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(question_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn count_questions(&self, test_id: i64) -> StorageResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE test_id = ?")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn list_groups(&self, prefix: Option<char>) -> StorageResult<Vec<Group>> {
        let rows = match prefix {
            Some(letter) => {
                sqlx::query_as::<_, GroupRow>(&format!(
                    "SELECT {} FROM chat_groups WHERE substr(label, 1, 1) = ? ORDER BY id",
                    GROUP_COLUMNS
                ))
                .bind(letter.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, GroupRow>(&format!(
                    "SELECT {} FROM chat_groups ORDER BY id",
                    GROUP_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Group::try_from).collect()
    }

    async fn get_group(&self, group_id: i64) -> StorageResult<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {} FROM chat_groups WHERE id = ?",
            GROUP_COLUMNS
        ))
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Group::try_from).transpose()
    }

    async fn create_group(&self, group: NewGroup) -> StorageResult<Option<Group>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "INSERT INTO chat_groups (label, url, capacity, current_count) VALUES (?, ?, ?, 0)
             ON CONFLICT(label) DO NOTHING RETURNING {}",
            GROUP_COLUMNS
        ))
        .bind(&group.label)
        .bind(&group.url)
        .bind(group.capacity.map(i64::from))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some((letter, suffix)) = parse_label(&row.label) {
            sqlx::query(
                "INSERT INTO group_label_marks (letter, last_suffix) VALUES (?, ?)
                 ON CONFLICT(letter) DO UPDATE SET last_suffix = MAX(last_suffix, excluded.last_suffix)",
            )
            .bind(letter.to_string())
            .bind(i64::from(suffix))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Group::try_from(row).map(Some)
    }

    async fn delete_group(&self, group_id: i64) -> StorageResult<bool> {
        let deleted = sqlx::query("DELETE FROM chat_groups WHERE id = ?")
            .bind(group_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn highest_suffix(&self, letter: char) -> StorageResult<u32> {
        let labels: Vec<String> =
            sqlx::query_scalar("SELECT label FROM chat_groups WHERE substr(label, 1, 1) = ?")
                .bind(letter.to_string())
                .fetch_all(&self.pool)
                .await?;
        let mark: Option<i64> =
            sqlx::query_scalar("SELECT last_suffix FROM group_label_marks WHERE letter = ?")
                .bind(letter.to_string())
                .fetch_optional(&self.pool)
                .await?;

        let live = max_suffix(letter, labels.iter().map(String::as_str));
        let mark = mark.and_then(|m| u32::try_from(m).ok()).unwrap_or(0);
        Ok(live.max(mark))
    }

    async fn try_reserve_slot(
        &self,
        group_id: i64,
        default_capacity: u32,
    ) -> StorageResult<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "UPDATE chat_groups SET current_count = current_count + 1
             WHERE id = ? AND current_count < COALESCE(capacity, ?)
             RETURNING {}",
            GROUP_COLUMNS
        ))
        .bind(group_id)
        .bind(i64::from(default_capacity))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Group::try_from).transpose()
    }

    async fn upsert_user(&self, user_id: i64, display_name: &str) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO users (id, display_name) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
        )
        .bind(user_id)
        .bind(display_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, display_name, score, last_group_id FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| User {
            id: row.id,
            display_name: row.display_name,
            score: row.score,
            last_group_id: row.last_group_id,
        }))
    }

    async fn record_quiz_outcome(
        &self,
        user_id: i64,
        score: u32,
        group_id: Option<i64>,
    ) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO users (id, score, last_group_id) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                score = score + excluded.score,
                last_group_id = COALESCE(excluded.last_group_id, last_group_id)",
        )
        .bind(user_id)
        .bind(i64::from(score))
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_result(&self, result: NewResult) -> StorageResult<QuizResult> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "INSERT INTO results (user_id, score, total, group_id, created_at)
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            RESULT_COLUMNS
        ))
        .bind(result.user_id)
        .bind(i64::from(result.score))
        .bind(i64::from(result.total))
        .bind(result.group_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_results(&self) -> StorageResult<Vec<QuizResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {} FROM results ORDER BY id DESC",
            RESULT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(QuizResult::try_from).collect()
    }
}
