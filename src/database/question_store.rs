use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{FromRow, PgPool, Row};

use crate::error::{Error, Result};
use crate::models::domain::Domain;
use crate::models::question::{
    Accuracy, AnswerLetter, AnswerOptions, GradingUpdate, QuestionRecord,
};

/// Per-domain grading tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyCounts {
    pub total: i64,
    pub graded: i64,
    pub correct: i64,
    pub incorrect: i64,
}

/// Repository over domain-partitioned question records.
///
/// Grading only ever touches the derived fields through `update_grading`;
/// records are created and owned by the loader.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn sample_one(&self, domain: Domain) -> Result<Option<QuestionRecord>>;

    async fn find_by_id(&self, domain: Domain, id: i64) -> Result<Option<QuestionRecord>>;

    /// Every record of the domain, in store-defined order.
    async fn find_all(&self, domain: Domain) -> Result<Vec<QuestionRecord>>;

    /// Writes all derived fields in one statement. `None` if the record is absent.
    async fn update_grading(
        &self,
        domain: Domain,
        id: i64,
        update: &GradingUpdate,
    ) -> Result<Option<QuestionRecord>>;

    async fn average_response_time(&self, domain: Domain) -> Result<Option<f64>>;

    async fn accuracy_counts(&self, domain: Domain) -> Result<AccuracyCounts>;
}

#[derive(Debug, FromRow)]
struct QuestionRow {
    id: i64,
    question: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: String,
    model_response: Option<String>,
    accuracy: Option<String>,
    response_time_ms: Option<i64>,
    graded_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuestionRow> for QuestionRecord {
    type Error = Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        Ok(QuestionRecord {
            id: row.id,
            question: row.question,
            options: AnswerOptions {
                a: row.option_a,
                b: row.option_b,
                c: row.option_c,
                d: row.option_d,
            },
            correct_answer: row.correct_answer.parse::<AnswerLetter>()?,
            model_response: row.model_response,
            accuracy: row
                .accuracy
                .as_deref()
                .map(str::parse::<Accuracy>)
                .transpose()?,
            response_time_ms: row.response_time_ms,
            graded_at: row.graded_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, question, option_a, option_b, option_c, option_d, correct_answer,
           model_response, accuracy, response_time_ms, graded_at
    FROM questions
"#;

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn sample_one(&self, domain: Domain) -> Result<Option<QuestionRecord>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM questions WHERE domain = $1")
            .bind(domain.partition())
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;
        if total == 0 {
            return Ok(None);
        }

        let offset = rand::thread_rng().gen_range(0..total);
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "{} WHERE domain = $1 ORDER BY id OFFSET $2 LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(domain.partition())
        .bind(offset)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionRecord::try_from).transpose()
    }

    async fn find_by_id(&self, domain: Domain, id: i64) -> Result<Option<QuestionRecord>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "{} WHERE domain = $1 AND id = $2",
            SELECT_COLUMNS
        ))
        .bind(domain.partition())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionRecord::try_from).transpose()
    }

    async fn find_all(&self, domain: Domain) -> Result<Vec<QuestionRecord>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "{} WHERE domain = $1 ORDER BY id",
            SELECT_COLUMNS
        ))
        .bind(domain.partition())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuestionRecord::try_from).collect()
    }

    async fn update_grading(
        &self,
        domain: Domain,
        id: i64,
        update: &GradingUpdate,
    ) -> Result<Option<QuestionRecord>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            UPDATE questions
            SET model_response = $3,
                accuracy = $4,
                response_time_ms = $5,
                graded_at = $6
            WHERE domain = $1 AND id = $2
            RETURNING id, question, option_a, option_b, option_c, option_d, correct_answer,
                      model_response, accuracy, response_time_ms, graded_at
            "#,
        )
        .bind(domain.partition())
        .bind(id)
        .bind(&update.model_response)
        .bind(update.accuracy.as_str())
        .bind(update.response_time_ms)
        .bind(update.graded_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionRecord::try_from).transpose()
    }

    async fn average_response_time(&self, domain: Domain) -> Result<Option<f64>> {
        let avg: Option<f64> = sqlx::query(
            r#"
            SELECT AVG(response_time_ms)::DOUBLE PRECISION AS avg_ms
            FROM questions
            WHERE domain = $1 AND response_time_ms IS NOT NULL
            "#,
        )
        .bind(domain.partition())
        .fetch_one(&self.pool)
        .await?
        .try_get("avg_ms")?;
        Ok(avg)
    }

    async fn accuracy_counts(&self, domain: Domain) -> Result<AccuracyCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(accuracy) AS graded,
                   COUNT(*) FILTER (WHERE accuracy = 'Correct') AS correct,
                   COUNT(*) FILTER (WHERE accuracy = 'Incorrect') AS incorrect
            FROM questions
            WHERE domain = $1
            "#,
        )
        .bind(domain.partition())
        .fetch_one(&self.pool)
        .await?;

        Ok(AccuracyCounts {
            total: row.try_get("total")?,
            graded: row.try_get("graded")?,
            correct: row.try_get("correct")?,
            incorrect: row.try_get("incorrect")?,
        })
    }
}
