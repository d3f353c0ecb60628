//! Workflow notifications.
//!
//! Handlers describe what happened through an [`Outbox`], which turns each
//! workflow event into one [`NotificationEvent`] per affected user and drops
//! any event that would be addressed to the actor. The outbox is flushed in
//! the same transaction as the state change it describes.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::utc_now;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub recipient_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Outbox {
    actor: Option<Uuid>,
    actor_name: String,
    events: Vec<NotificationEvent>,
}

impl Outbox {
    pub fn from_actor(actor: Uuid, actor_name: impl Into<String>) -> Self {
        Self {
            actor: Some(actor),
            actor_name: actor_name.into(),
            events: Vec::new(),
        }
    }

    /// Events raised by background jobs have no actor.
    pub fn system() -> Self {
        Self {
            actor: None,
            actor_name: "System".to_string(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[NotificationEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, recipient: Option<Uuid>, message: String) {
        let Some(recipient_id) = recipient else {
            return;
        };
        if Some(recipient_id) == self.actor {
            return;
        }
        let event = NotificationEvent { recipient_id, message };
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }

    pub fn task_assigned(&mut self, assignee: Option<Uuid>, title: &str) {
        let message = format!("{} assigned you a new task: \"{}\"", self.actor_name, title);
        self.push(assignee, message);
    }

    /// A task update. A changed assignee hears about the assignment, the
    /// previous one about losing it; an unchanged assignee gets the update.
    pub fn task_updated(&mut self, previous: Option<Uuid>, current: Option<Uuid>, title: &str) {
        if previous != current {
            self.task_assigned(current, title);
            let message = format!("{} reassigned task \"{}\" to someone else", self.actor_name, title);
            self.push(previous, message);
        } else {
            let message = format!("{} updated task: \"{}\"", self.actor_name, title);
            self.push(current, message);
        }
    }

    pub fn ticket_raised(&mut self, assignee: Option<Uuid>, title: &str, company_name: Option<&str>) {
        let message = format!(
            "{} raised a ticket{}: \"{}\" and assigned it to you",
            self.actor_name,
            company_suffix(company_name),
            title
        );
        self.push(assignee, message);
    }

    pub fn ticket_reassigned(&mut self, previous: Option<Uuid>, current: Option<Uuid>, title: &str) {
        if previous == current {
            return;
        }
        let message = format!("{} assigned you a ticket: \"{}\"", self.actor_name, title);
        self.push(current, message);
    }

    pub fn ticket_resolved(&mut self, raised_by: Option<Uuid>, title: &str) {
        let message = format!("{} resolved your ticket: \"{}\"", self.actor_name, title);
        self.push(raised_by, message);
    }

    pub fn company_finalized(
        &mut self,
        company_name: &str,
        data_collector: Option<Uuid>,
        converter: Option<Uuid>,
    ) {
        for recipient in [data_collector, converter] {
            let message = format!("{} finalized company \"{}\"", self.actor_name, company_name);
            self.push(recipient, message);
        }
    }

    pub fn deadline_approaching(
        &mut self,
        assignee: Option<Uuid>,
        title: &str,
        company_name: Option<&str>,
        deadline: DateTime<Utc>,
    ) {
        let message = format!(
            "Deadline Alert: Task \"{}\"{} is due on {}",
            title,
            company_suffix(company_name),
            deadline.format("%b %-d, %Y %H:%M UTC")
        );
        self.push(assignee, message);
    }

    pub fn overdue(&mut self, assignee: Option<Uuid>, title: &str, company_name: Option<&str>) {
        let message = format!(
            "OVERDUE: Task \"{}\"{} is past its deadline!",
            title,
            company_suffix(company_name)
        );
        self.push(assignee, message);
    }

    /// Write every pending event. Call inside the transaction that made the
    /// change being reported.
    pub async fn flush(self, conn: &mut SqliteConnection) -> Result<usize, AppError> {
        let count = self.events.len();
        let now = utc_now();
        for event in self.events {
            sqlx::query("INSERT INTO notifications (id, user_id, message, is_read, created_at) VALUES (?, ?, ?, 0, ?)")
                .bind(Uuid::new_v4())
                .bind(event.recipient_id)
                .bind(&event.message)
                .bind(now)
                .execute(&mut *conn)
                .await?;
        }
        if count > 0 {
            tracing::debug!(count, "notifications recorded");
        }
        Ok(count)
    }
}

fn company_suffix(company_name: Option<&str>) -> String {
    match company_name {
        Some(name) if !name.is_empty() => format!(" for {name}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_never_notifies_themselves() {
        let actor = Uuid::new_v4();
        let mut outbox = Outbox::from_actor(actor, "Alice");
        outbox.task_assigned(Some(actor), "Call ACME");
        outbox.ticket_resolved(Some(actor), "Broken link");
        outbox.company_finalized("ACME", Some(actor), Some(actor));
        assert!(outbox.is_empty());
    }

    #[test]
    fn assignment_message_names_the_actor() {
        let assignee = Uuid::new_v4();
        let mut outbox = Outbox::from_actor(Uuid::new_v4(), "Alice");
        outbox.task_assigned(Some(assignee), "Call ACME");
        assert_eq!(
            outbox.events(),
            &[NotificationEvent {
                recipient_id: assignee,
                message: "Alice assigned you a new task: \"Call ACME\"".to_string(),
            }]
        );
    }

    #[test]
    fn reassignment_reaches_both_assignees() {
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        let mut outbox = Outbox::from_actor(Uuid::new_v4(), "Bob");
        outbox.task_updated(Some(old), Some(new), "Visit");
        let recipients: Vec<Uuid> = outbox.events().iter().map(|e| e.recipient_id).collect();
        assert_eq!(recipients, vec![new, old]);
    }

    #[test]
    fn finalization_notifies_each_assignee_once() {
        let person = Uuid::new_v4();
        let mut outbox = Outbox::from_actor(Uuid::new_v4(), "Mia");
        outbox.company_finalized("ACME", Some(person), Some(person));
        assert_eq!(outbox.events().len(), 1);
    }

    #[test]
    fn ticket_message_mentions_the_company() {
        let mut outbox = Outbox::from_actor(Uuid::new_v4(), "Alice");
        outbox.ticket_raised(Some(Uuid::new_v4()), "Wrong phone", Some("ACME"));
        assert_eq!(
            outbox.events()[0].message,
            "Alice raised a ticket for ACME: \"Wrong phone\" and assigned it to you"
        );
    }

    #[test]
    fn unassigned_records_produce_nothing() {
        let mut outbox = Outbox::system();
        outbox.overdue(None, "Visit", None);
        assert!(outbox.is_empty());
    }
}
