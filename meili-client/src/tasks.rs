//! Task endpoints and the completion poller.
//!
//! Mutating operations only enqueue work; the server answers with a
//! [`TaskInfo`] whose uid is then re-fetched until the task reaches a terminal
//! status.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};
use url::form_urlencoded;

use crate::errors::MeiliError;
use crate::executor::Executor;
use crate::http::HttpRequests;
use meili_shared::{TaskInfo, TaskList, TaskResult, TaskStatus};

/// Default time to wait for a task.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default delay between two fetches of a task.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(50);

/// How long and how often to poll a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Deadline measured from the first fetch; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub interval: Duration,
    /// Raise [`MeiliError::TaskFailed`] when the task ends up `failed`.
    pub raise_for_status: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_WAIT_TIMEOUT),
            interval: DEFAULT_WAIT_INTERVAL,
            raise_for_status: false,
        }
    }
}

impl WaitOptions {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn raise_for_status(mut self, raise: bool) -> Self {
        self.raise_for_status = raise;
        self
    }
}

/// Filters for listing, canceling and deleting tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub uids: Vec<u64>,
    pub index_uids: Vec<String>,
    pub statuses: Vec<TaskStatus>,
    pub types: Vec<String>,
    pub canceled_by: Vec<u64>,
    pub before_enqueued_at: Option<DateTime<Utc>>,
    pub after_enqueued_at: Option<DateTime<Utc>>,
    pub before_started_at: Option<DateTime<Utc>>,
    pub after_started_at: Option<DateTime<Utc>>,
    pub before_finished_at: Option<DateTime<Utc>>,
    pub after_finished_at: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub from: Option<u64>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uids(mut self, uids: impl IntoIterator<Item = u64>) -> Self {
        self.uids = uids.into_iter().collect();
        self
    }

    pub fn with_index_uids<S: Into<String>>(mut self, uids: impl IntoIterator<Item = S>) -> Self {
        self.index_uids = uids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Encode the filter as a query string, without the leading `?`.
    pub fn to_query(&self) -> String {
        fn join<T: ToString>(items: &[T]) -> Option<String> {
            if items.is_empty() {
                None
            } else {
                Some(
                    items
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(","),
                )
            }
        }
        fn date(value: &Option<DateTime<Utc>>) -> Option<String> {
            value.map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
        }

        let statuses: Vec<&str> = self.statuses.iter().map(TaskStatus::as_str).collect();
        let params = [
            ("uids", join(&self.uids)),
            ("indexUids", join(&self.index_uids)),
            ("statuses", join(&statuses)),
            ("types", join(&self.types)),
            ("canceledBy", join(&self.canceled_by)),
            ("beforeEnqueuedAt", date(&self.before_enqueued_at)),
            ("afterEnqueuedAt", date(&self.after_enqueued_at)),
            ("beforeStartedAt", date(&self.before_started_at)),
            ("afterStartedAt", date(&self.after_started_at)),
            ("beforeFinishedAt", date(&self.before_finished_at)),
            ("afterFinishedAt", date(&self.after_finished_at)),
            ("limit", self.limit.map(|v| v.to_string())),
            ("from", self.from.map(|v| v.to_string())),
        ];

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            if let Some(value) = value {
                serializer.append_pair(key, &value);
            }
        }
        serializer.finish()
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn with_query(path: &str, query: String) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

/// Task endpoints bound to a client's connection.
#[derive(Debug, Clone)]
pub struct Tasks {
    http: HttpRequests,
    executor: Executor,
}

impl Tasks {
    pub fn new(http: HttpRequests, executor: Executor) -> Self {
        Self { http, executor }
    }

    /// Fetch the current state of a task.
    pub async fn get_task(&self, task_uid: u64) -> Result<TaskResult, MeiliError> {
        self.http.get(&format!("tasks/{}", task_uid)).await
    }

    /// List tasks matching `filter`.
    pub async fn get_tasks(&self, filter: &TaskFilter) -> Result<TaskList, MeiliError> {
        self.http.get(&with_query("tasks", filter.to_query())).await
    }

    /// Cancel the tasks matching `filter`.
    ///
    /// An empty filter cancels every enqueued or processing task.
    pub async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo, MeiliError> {
        let filter = if filter.is_empty() {
            TaskFilter::new().with_statuses([TaskStatus::Enqueued, TaskStatus::Processing])
        } else {
            filter.clone()
        };
        self.http
            .post::<(), _>(&with_query("tasks/cancel", filter.to_query()), None, false)
            .await
    }

    /// Delete the tasks matching `filter`.
    ///
    /// An empty filter deletes tasks in every status.
    pub async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo, MeiliError> {
        let filter = if filter.is_empty() {
            TaskFilter::new().with_statuses([
                TaskStatus::Canceled,
                TaskStatus::Enqueued,
                TaskStatus::Failed,
                TaskStatus::Processing,
                TaskStatus::Succeeded,
            ])
        } else {
            filter.clone()
        };
        self.http
            .delete(&with_query("tasks", filter.to_query()))
            .await
    }

    /// Poll a task until it reaches a terminal status.
    ///
    /// # Errors
    ///
    /// * [`MeiliError::TimeoutError`] - the deadline elapsed first; the task
    ///   may still complete server-side
    /// * [`MeiliError::TaskFailed`] - the task failed and
    ///   `options.raise_for_status` is set
    /// * any transport error, unchanged
    #[instrument(skip(self, options), fields(timeout = ?options.timeout))]
    pub async fn wait_for_task(
        &self,
        task_uid: u64,
        options: &WaitOptions,
    ) -> Result<TaskResult, MeiliError> {
        let start = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let task = self.get_task(task_uid).await?;
            polls += 1;

            if task.is_terminal() {
                debug!(status = task.status.as_str(), polls, "Task reached terminal status");
                if task.status == TaskStatus::Failed {
                    warn!(error = ?task.error, "Task failed");
                    if options.raise_for_status {
                        return Err(MeiliError::TaskFailed(task_uid));
                    }
                }
                return Ok(task);
            }

            sleep(options.interval).await;

            if let Some(timeout) = options.timeout {
                if start.elapsed() >= timeout {
                    warn!(polls, "Timed out waiting for task");
                    return Err(MeiliError::TimeoutError {
                        task_uid,
                        timeout_ms: timeout.as_millis(),
                    });
                }
            }
        }
    }

    /// Wait for several tasks, results in the order of `tasks`.
    pub async fn wait_for_tasks(
        &self,
        tasks: &[TaskInfo],
        options: &WaitOptions,
    ) -> Result<Vec<TaskResult>, MeiliError> {
        self.executor
            .join_all(
                tasks
                    .iter()
                    .map(|task| self.wait_for_task(task.task_uid, options)),
            )
            .await
    }
}
