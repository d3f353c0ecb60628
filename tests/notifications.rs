mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{id_of, TestApp};
use refined_crm::authz::Role;
use refined_crm::jobs::{run_deadline_reminders, run_overdue_alerts};

#[tokio::test]
async fn inbox_is_private_to_its_owner() -> Result<()> {
    let t = TestApp::new().await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;
    let converter = t.user("Cody Converter", Role::Converter).await?;

    for title in ["First", "Second"] {
        let (status, _) = t
            .post("/tasks", &manager, json!({ "title": title, "assignedToId": collector.id }))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, inbox) = t.get("/notifications", &collector).await?;
    assert_eq!(status, StatusCode::OK);
    let items = inbox.as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|n| n["isRead"] == false));
    assert!(items.iter().all(|n| n["userId"] == json!(collector.id)));

    let (_, others) = t.get("/notifications", &manager).await?;
    assert_eq!(others, json!([]), "the actor is never notified of their own action");

    let first = id_of(&items[0])?;
    let (status, _) = t
        .put(&format!("/notifications/{first}/read"), &converter, json!({}))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "someone else's notification looks missing");
    let (status, _) = t
        .put(&format!("/notifications/{first}/read"), &collector, json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.put("/notifications/mark-all-read", &collector, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, inbox) = t.get("/notifications", &collector).await?;
    assert!(inbox
        .as_array()
        .map(|items| items.iter().all(|n| n["isRead"] == true))
        .unwrap_or(false));

    let (status, _) = t.delete(&format!("/notifications/{first}"), &converter).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.delete(&format!("/notifications/{first}"), &collector).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, inbox) = t.get("/notifications", &collector).await?;
    assert_eq!(inbox.as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn reminder_jobs_notify_assignees_of_open_tasks() -> Result<()> {
    let t = TestApp::new().await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;
    let company_id = t.company(&manager, json!({ "name": "ACME" })).await?;

    let now = Utc::now();
    let tomorrow_noon = (now.date_naive() + Duration::days(1))
        .and_hms_opt(12, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    let last_week = now - Duration::days(7);

    let tasks = [
        json!({ "title": "Send quote", "deadline": tomorrow_noon, "companyId": company_id, "assignedToId": collector.id }),
        json!({ "title": "Chase invoice", "deadline": last_week, "assignedToId": collector.id }),
        json!({ "title": "Done already", "deadline": last_week, "status": "Completed", "assignedToId": collector.id }),
        json!({ "title": "Nobody's", "deadline": last_week }),
    ];
    for task in tasks {
        let (status, body) = t.post("/tasks", &manager, task).await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    sqlx::query("DELETE FROM notifications").execute(&t.pool).await?;

    assert_eq!(run_deadline_reminders(&t.pool, now).await?, 1);
    assert_eq!(run_overdue_alerts(&t.pool, now).await?, 1);

    let inbox = t.notifications_of(collector.id).await?;
    assert_eq!(inbox.len(), 2, "{inbox:?}");
    assert!(
        inbox[0].starts_with("Deadline Alert: Task \"Send quote\" for ACME is due on "),
        "{}",
        inbox[0]
    );
    assert_eq!(inbox[1], "OVERDUE: Task \"Chase invoice\" is past its deadline!");

    Ok(())
}
