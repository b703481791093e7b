#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

use llm_eval_backend::database::question_store::{AccuracyCounts, QuestionStore};
use llm_eval_backend::error::Result;
use llm_eval_backend::models::domain::Domain;
use llm_eval_backend::models::question::{
    Accuracy, AnswerLetter, AnswerOptions, GradingUpdate, QuestionRecord,
};
use llm_eval_backend::services::ai_service::{CompletionClient, CompletionError};
use llm_eval_backend::services::batch_service::BatchSettings;
use llm_eval_backend::{routes, AppState};

pub fn question(id: i64, correct: AnswerLetter) -> QuestionRecord {
    QuestionRecord {
        id,
        question: format!("Question number {}?", id),
        options: AnswerOptions {
            a: "first".into(),
            b: "second".into(),
            c: "third".into(),
            d: "fourth".into(),
        },
        correct_answer: correct,
        model_response: None,
        accuracy: None,
        response_time_ms: None,
        graded_at: None,
    }
}

/// Store double keeping records in memory and counting every call.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<Domain, Vec<QuestionRecord>>>,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn with(domain: Domain, records: Vec<QuestionRecord>) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(domain, records);
        store
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, domain: Domain, id: i64) -> Option<QuestionRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&domain)
            .and_then(|rs| rs.iter().find(|r| r.id == id).cloned())
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionStore for InMemoryStore {
    async fn sample_one(&self, domain: Domain) -> Result<Option<QuestionRecord>> {
        self.hit();
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&domain)
            .and_then(|rs| rs.first().cloned()))
    }

    async fn find_by_id(&self, domain: Domain, id: i64) -> Result<Option<QuestionRecord>> {
        self.hit();
        Ok(self.get(domain, id))
    }

    async fn find_all(&self, domain: Domain) -> Result<Vec<QuestionRecord>> {
        self.hit();
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_grading(
        &self,
        domain: Domain,
        id: i64,
        update: &GradingUpdate,
    ) -> Result<Option<QuestionRecord>> {
        self.hit();
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&domain)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == id));
        Ok(record.map(|r| {
            r.apply(update);
            r.clone()
        }))
    }

    async fn average_response_time(&self, domain: Domain) -> Result<Option<f64>> {
        self.hit();
        let records = self.records.lock().unwrap();
        let times: Vec<i64> = records
            .get(&domain)
            .map(|rs| rs.iter().filter_map(|r| r.response_time_ms).collect())
            .unwrap_or_default();
        if times.is_empty() {
            return Ok(None);
        }
        Ok(Some(times.iter().sum::<i64>() as f64 / times.len() as f64))
    }

    async fn accuracy_counts(&self, domain: Domain) -> Result<AccuracyCounts> {
        self.hit();
        let records = self.records.lock().unwrap();
        let mut counts = AccuracyCounts::default();
        for r in records.get(&domain).into_iter().flatten() {
            counts.total += 1;
            match r.accuracy {
                Some(Accuracy::Correct) => {
                    counts.graded += 1;
                    counts.correct += 1;
                }
                Some(Accuracy::Incorrect) => {
                    counts.graded += 1;
                    counts.incorrect += 1;
                }
                None => {}
            }
        }
        Ok(counts)
    }
}

/// Completion double replaying scripted replies, then a fallback reply.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<std::result::Result<String, CompletionError>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn always(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, reply: std::result::Result<&str, CompletionError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub fn fast_settings() -> BatchSettings {
    BatchSettings {
        group_size: 10,
        group_delay: Duration::from_millis(20),
    }
}

pub fn app(
    store: Arc<InMemoryStore>,
    completion: Arc<ScriptedCompletion>,
    settings: BatchSettings,
) -> Router {
    let state = AppState::from_parts(store, completion, settings, CancellationToken::new());
    routes::router(state, 1_000)
}
