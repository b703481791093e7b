use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::database::question_store::QuestionStore;
use crate::error::{Error, Result};
use crate::models::domain::Domain;
use crate::models::question::{Accuracy, GradingUpdate, QuestionRecord};
use crate::services::ai_service::CompletionClient;
use crate::services::answer_extractor::extract_answer;
use crate::utils::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum GradingStatus {
    Graded,
    ServiceUnavailable,
}

#[derive(Debug, Clone)]
pub struct GradingOutcome {
    /// Extracted letter, or empty when nothing matched or the call failed.
    pub model_response: String,
    pub accuracy: Accuracy,
    pub response_time_ms: i64,
    pub status: GradingStatus,
    /// The stored record after this attempt; unchanged if nothing was persisted.
    pub record: QuestionRecord,
}

impl GradingOutcome {
    pub fn persisted(&self) -> bool {
        self.status == GradingStatus::Graded
    }
}

#[derive(Clone)]
pub struct GradingService {
    store: Arc<dyn QuestionStore>,
    completion: Arc<dyn CompletionClient>,
}

impl GradingService {
    pub fn new(store: Arc<dyn QuestionStore>, completion: Arc<dyn CompletionClient>) -> Self {
        Self { store, completion }
    }

    pub async fn grade_by_id(&self, domain: Domain, id: i64) -> Result<GradingOutcome> {
        let record = self
            .store
            .find_by_id(domain, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found in {}", id, domain)))?;
        self.grade(domain, &record).await
    }

    /// Asks the completion service to answer `record` and stores the verdict.
    ///
    /// A failed completion call is not an error: it yields an empty,
    /// `Incorrect` outcome with status `ServiceUnavailable` and leaves the
    /// stored record untouched. Storage failures are returned.
    pub async fn grade(&self, domain: Domain, record: &QuestionRecord) -> Result<GradingOutcome> {
        validate_record(record)?;
        let prompt = build_prompt(record);

        let started = Instant::now();
        let completion = self.completion.complete(&prompt).await;
        let response_time_ms = time::elapsed_millis(started);

        let raw = match completion {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    %domain,
                    question_id = record.id,
                    response_time_ms,
                    error = %err,
                    "completion service unavailable, grading skipped"
                );
                return Ok(GradingOutcome {
                    model_response: String::new(),
                    accuracy: Accuracy::Incorrect,
                    response_time_ms,
                    status: GradingStatus::ServiceUnavailable,
                    record: record.clone(),
                });
            }
        };

        let extracted = extract_answer(&raw);
        if extracted.is_none() {
            tracing::debug!(%domain, question_id = record.id, raw = %raw, "no answer letter in completion");
        }
        let accuracy = Accuracy::judge(extracted, record.correct_answer);
        let update = GradingUpdate {
            model_response: extracted.map(|l| l.to_string()).unwrap_or_default(),
            accuracy,
            response_time_ms,
            graded_at: time::now(),
        };

        let updated = self
            .store
            .update_grading(domain, record.id, &update)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found in {}", record.id, domain)))?;

        tracing::info!(
            %domain,
            question_id = record.id,
            model_response = %update.model_response,
            accuracy = accuracy.as_str(),
            response_time_ms,
            "question graded"
        );

        Ok(GradingOutcome {
            model_response: update.model_response,
            accuracy,
            response_time_ms,
            status: GradingStatus::Graded,
            record: updated,
        })
    }
}

fn validate_record(record: &QuestionRecord) -> Result<()> {
    if record.question.trim().is_empty() {
        return Err(Error::InvalidInput(format!(
            "Question {} has no question text",
            record.id
        )));
    }
    if let Some((letter, _)) = record.options.labeled().find(|(_, text)| text.trim().is_empty()) {
        return Err(Error::InvalidInput(format!(
            "Question {} has an empty option {}",
            record.id, letter
        )));
    }
    Ok(())
}

pub fn build_prompt(record: &QuestionRecord) -> String {
    let mut prompt = String::from(
        "Answer the following multiple-choice question. \
         Reply with exactly one letter (A, B, C, or D) and nothing else.\n\n",
    );
    prompt.push_str("Question: ");
    prompt.push_str(record.question.trim());
    prompt.push('\n');
    for (letter, text) in record.options.labeled() {
        prompt.push_str(&format!("{}: {}\n", letter, text.trim()));
    }
    prompt.push_str("Answer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::question_store::MockQuestionStore;
    use crate::models::question::{AnswerLetter, AnswerOptions};
    use crate::services::ai_service::{CompletionError, MockCompletionClient};
    use mockall::predicate::eq;

    fn record(id: i64, correct: AnswerLetter) -> QuestionRecord {
        QuestionRecord {
            id,
            question: "Which port does HTTPS use by default?".into(),
            options: AnswerOptions {
                a: "21".into(),
                b: "80".into(),
                c: "443".into(),
                d: "8080".into(),
            },
            correct_answer: correct,
            model_response: None,
            accuracy: None,
            response_time_ms: None,
            graded_at: None,
        }
    }

    fn completion_returning(text: &'static str) -> MockCompletionClient {
        let mut completion = MockCompletionClient::new();
        completion
            .expect_complete()
            .times(1)
            .returning(move |_| Ok(text.to_string()));
        completion
    }

    fn store_echoing_update(id: i64, correct: AnswerLetter) -> MockQuestionStore {
        let mut store = MockQuestionStore::new();
        store
            .expect_update_grading()
            .with(eq(Domain::ComputerSecurity), eq(id), mockall::predicate::always())
            .times(1)
            .returning(move |_, id, update| {
                let mut updated = record(id, correct);
                updated.apply(update);
                Ok(Some(updated))
            });
        store
    }

    #[test]
    fn prompt_embeds_question_and_labeled_options() {
        let prompt = build_prompt(&record(1, AnswerLetter::C));
        assert!(prompt.contains("Question: Which port does HTTPS use by default?"));
        assert!(prompt.contains("A: 21\nB: 80\nC: 443\nD: 8080\n"));
        assert!(prompt.contains("exactly one letter"));
        assert_eq!(prompt, build_prompt(&record(1, AnswerLetter::C)));
    }

    #[tokio::test]
    async fn matching_letter_is_graded_correct_and_persisted() {
        let svc = GradingService::new(
            Arc::new(store_echoing_update(7, AnswerLetter::C)),
            Arc::new(completion_returning("C: 443")),
        );

        let outcome = svc
            .grade(Domain::ComputerSecurity, &record(7, AnswerLetter::C))
            .await
            .unwrap();

        assert_eq!(outcome.status, GradingStatus::Graded);
        assert_eq!(outcome.model_response, "C");
        assert_eq!(outcome.accuracy, Accuracy::Correct);
        assert!(outcome.persisted());
        assert_eq!(outcome.record.model_response.as_deref(), Some("C"));
        assert_eq!(outcome.record.accuracy, Some(Accuracy::Correct));
        assert_eq!(outcome.record.response_time_ms, Some(outcome.response_time_ms));
    }

    #[tokio::test]
    async fn unparseable_completion_is_incorrect_with_empty_response() {
        let svc = GradingService::new(
            Arc::new(store_echoing_update(7, AnswerLetter::C)),
            Arc::new(completion_returning("I think the answer is C")),
        );

        let outcome = svc
            .grade(Domain::ComputerSecurity, &record(7, AnswerLetter::C))
            .await
            .unwrap();

        assert_eq!(outcome.status, GradingStatus::Graded);
        assert_eq!(outcome.model_response, "");
        assert_eq!(outcome.accuracy, Accuracy::Incorrect);
        assert_eq!(outcome.record.model_response.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn completion_failure_is_recovered_without_persisting() {
        let mut store = MockQuestionStore::new();
        store.expect_update_grading().never();
        let mut completion = MockCompletionClient::new();
        completion
            .expect_complete()
            .times(1)
            .returning(|_| Err(CompletionError::Timeout));

        let svc = GradingService::new(Arc::new(store), Arc::new(completion));
        let original = record(3, AnswerLetter::A);
        let outcome = svc.grade(Domain::ComputerSecurity, &original).await.unwrap();

        assert_eq!(outcome.status, GradingStatus::ServiceUnavailable);
        assert!(!outcome.persisted());
        assert_eq!(outcome.model_response, "");
        assert_eq!(outcome.accuracy, Accuracy::Incorrect);
        assert_eq!(outcome.record, original);
    }

    #[tokio::test]
    async fn empty_option_is_rejected_before_calling_the_service() {
        let mut store = MockQuestionStore::new();
        store.expect_update_grading().never();
        let mut completion = MockCompletionClient::new();
        completion.expect_complete().never();

        let svc = GradingService::new(Arc::new(store), Arc::new(completion));
        let mut invalid = record(3, AnswerLetter::A);
        invalid.options.d = "  ".into();

        let err = svc.grade(Domain::ComputerSecurity, &invalid).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("option D")));
    }

    #[tokio::test]
    async fn empty_question_text_is_rejected() {
        let mut completion = MockCompletionClient::new();
        completion.expect_complete().never();
        let svc = GradingService::new(Arc::new(MockQuestionStore::new()), Arc::new(completion));
        let mut invalid = record(3, AnswerLetter::A);
        invalid.question = String::new();

        let err = svc.grade(Domain::History, &invalid).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let mut store = MockQuestionStore::new();
        store
            .expect_update_grading()
            .returning(|_, _, _| Err(Error::Database(sqlx::Error::PoolTimedOut)));

        let svc = GradingService::new(Arc::new(store), Arc::new(completion_returning("A")));
        let err = svc
            .grade(Domain::ComputerSecurity, &record(3, AnswerLetter::A))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_without_calling_the_service() {
        let mut store = MockQuestionStore::new();
        store
            .expect_find_by_id()
            .with(eq(Domain::History), eq(99))
            .returning(|_, _| Ok(None));
        store.expect_update_grading().never();
        let mut completion = MockCompletionClient::new();
        completion.expect_complete().never();

        let svc = GradingService::new(Arc::new(store), Arc::new(completion));
        let err = svc.grade_by_id(Domain::History, 99).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
