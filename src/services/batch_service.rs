use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::database::question_store::QuestionStore;
use crate::error::{Error, Result};
use crate::models::domain::Domain;
use crate::models::question::Accuracy;
use crate::services::grading_service::{GradingService, GradingStatus};

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub group_size: usize,
    pub group_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            group_size: 10,
            group_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub domain: Domain,
    pub total: usize,
    pub attempted: usize,
    pub graded: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub service_failures: usize,
    pub failed: usize,
    pub groups: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    fn new(domain: Domain, total: usize, groups: usize) -> Self {
        Self {
            domain,
            total,
            attempted: 0,
            graded: 0,
            correct: 0,
            incorrect: 0,
            service_failures: 0,
            failed: 0,
            groups,
            cancelled: false,
        }
    }
}

/// Grades every question of a domain, one at a time, pausing between groups.
#[derive(Clone)]
pub struct BatchService {
    store: Arc<dyn QuestionStore>,
    grader: GradingService,
    settings: BatchSettings,
    locks: Arc<HashMap<Domain, Arc<Mutex<()>>>>,
    shutdown: CancellationToken,
}

impl BatchService {
    pub fn new(
        store: Arc<dyn QuestionStore>,
        grader: GradingService,
        settings: BatchSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let locks = Domain::ALL
            .into_iter()
            .map(|d| (d, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            store,
            grader,
            settings: BatchSettings {
                group_size: settings.group_size.max(1),
                ..settings
            },
            locks: Arc::new(locks),
            shutdown,
        }
    }

    pub async fn run(&self, domain: Domain) -> Result<BatchSummary> {
        let lock = self
            .locks
            .get(&domain)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("No run lock for domain {}", domain)))?;
        let _guard = lock
            .try_lock_owned()
            .map_err(|_| Error::BatchInProgress(domain))?;

        let records = self.store.find_all(domain).await?;
        if records.is_empty() {
            return Err(Error::NoQuestions(domain));
        }

        let groups: Vec<_> = records.chunks(self.settings.group_size).collect();
        let mut summary = BatchSummary::new(domain, records.len(), groups.len());
        tracing::info!(
            %domain,
            total = summary.total,
            groups = summary.groups,
            group_size = self.settings.group_size,
            "starting batch grading"
        );

        'groups: for (index, group) in groups.iter().enumerate() {
            for record in group.iter() {
                if self.shutdown.is_cancelled() {
                    summary.cancelled = true;
                    break 'groups;
                }

                summary.attempted += 1;
                match self.grader.grade(domain, record).await {
                    Ok(outcome) => match outcome.status {
                        GradingStatus::Graded => {
                            summary.graded += 1;
                            match outcome.accuracy {
                                Accuracy::Correct => summary.correct += 1,
                                Accuracy::Incorrect => summary.incorrect += 1,
                            }
                        }
                        GradingStatus::ServiceUnavailable => summary.service_failures += 1,
                    },
                    Err(err) => {
                        summary.failed += 1;
                        tracing::error!(
                            %domain,
                            question_id = record.id,
                            error = %err,
                            "grading failed, continuing with next question"
                        );
                    }
                }
            }

            tracing::debug!(%domain, group = index + 1, of = summary.groups, "group finished");

            if index + 1 < groups.len() {
                let cancelled = tokio::select! {
                    _ = tokio::time::sleep(self.settings.group_delay) => false,
                    _ = self.shutdown.cancelled() => true,
                };
                if cancelled {
                    summary.cancelled = true;
                    break 'groups;
                }
            }
        }

        if summary.cancelled {
            tracing::warn!(%domain, attempted = summary.attempted, "batch grading cancelled");
        } else {
            tracing::info!(
                %domain,
                graded = summary.graded,
                correct = summary.correct,
                service_failures = summary.service_failures,
                failed = summary.failed,
                "batch grading finished"
            );
        }
        Ok(summary)
    }
}
