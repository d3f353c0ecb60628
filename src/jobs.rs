//! Periodic deadline reminders.
//!
//! The jobs only read task state and hand events to the notifier; they never
//! change a task.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, SqlitePool};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::AppError;
use crate::notify::Outbox;
use crate::utils::{env_flag, env_u64, utc_now};

const DEFAULT_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl ReminderConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let enabled = env_flag("REMINDERS_ENABLED", false)?;
        let secs = env_u64("REMINDER_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        if secs == 0 {
            return Err(AppError::configuration("REMINDER_INTERVAL_SECS must be greater than zero"));
        }
        Ok(Self {
            enabled,
            interval: Duration::from_secs(secs),
        })
    }
}

#[derive(Debug, FromRow)]
struct OpenTask {
    title: String,
    deadline: Option<DateTime<Utc>>,
    assigned_to_id: Option<Uuid>,
    company_name: Option<String>,
}

/// Start the reminder loop, or nothing when disabled.
pub fn spawn(pool: SqlitePool, config: ReminderConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        tracing::debug!("deadline reminders disabled");
        return None;
    }
    tracing::info!(interval_secs = config.interval.as_secs(), "deadline reminders enabled");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        loop {
            ticker.tick().await;
            let now = utc_now();
            if let Err(err) = run_deadline_reminders(&pool, now).await {
                tracing::warn!(error = %err, "deadline reminder run failed");
            }
            if let Err(err) = run_overdue_alerts(&pool, now).await {
                tracing::warn!(error = %err, "overdue alert run failed");
            }
        }
    }))
}

/// Notify assignees of open tasks due today or tomorrow (UTC).
pub async fn run_deadline_reminders(pool: &SqlitePool, now: DateTime<Utc>) -> Result<usize, AppError> {
    let mut outbox = Outbox::system();
    for task in open_tasks(pool).await? {
        if let Some(deadline) = task.deadline.filter(|d| is_due_soon(now, *d)) {
            outbox.deadline_approaching(task.assigned_to_id, &task.title, task.company_name.as_deref(), deadline);
        }
    }
    deliver(pool, outbox, "deadline reminders").await
}

/// Notify assignees of open tasks whose deadline has passed.
pub async fn run_overdue_alerts(pool: &SqlitePool, now: DateTime<Utc>) -> Result<usize, AppError> {
    let mut outbox = Outbox::system();
    for task in open_tasks(pool).await? {
        if task.deadline.is_some_and(|d| d < now) {
            outbox.overdue(task.assigned_to_id, &task.title, task.company_name.as_deref());
        }
    }
    deliver(pool, outbox, "overdue alerts").await
}

/// Start of today through the end of tomorrow.
fn is_due_soon(now: DateTime<Utc>, deadline: DateTime<Utc>) -> bool {
    let start = Utc.from_utc_datetime(&now.date_naive().and_time(chrono::NaiveTime::MIN));
    let end = start + chrono::Duration::days(2);
    deadline >= start && deadline < end
}

async fn open_tasks(pool: &SqlitePool) -> Result<Vec<OpenTask>, AppError> {
    let tasks = sqlx::query_as::<_, OpenTask>(
        "SELECT t.title, t.deadline, t.assigned_to_id, c.name AS company_name \
         FROM tasks t LEFT JOIN companies c ON t.company_id = c.id \
         WHERE t.status != 'Completed' AND t.deadline IS NOT NULL AND t.assigned_to_id IS NOT NULL \
         ORDER BY t.deadline ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(tasks)
}

async fn deliver(pool: &SqlitePool, outbox: Outbox, job: &'static str) -> Result<usize, AppError> {
    if outbox.is_empty() {
        tracing::debug!(job, "nothing to send");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let sent = match outbox.flush(&mut tx).await {
        Ok(sent) => sent,
        Err(err) => {
            tracing::error!(job, error = %err, "failed to record notifications");
            return Err(err);
        }
    };
    tx.commit().await?;
    tracing::info!(job, sent, "notifications sent");
    Ok(sent)
}
