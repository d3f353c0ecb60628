mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use refined_crm::authz::Role;

#[tokio::test]
async fn converter_writes_are_limited_to_status_on_assigned_companies() -> Result<()> {
    let t = TestApp::new().await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let converter = t.user("Cody Converter", Role::Converter).await?;
    let other_converter = t.user("Olga Converter", Role::Converter).await?;

    let company_id = t
        .company(
            &manager,
            json!({ "name": "ACME", "phone": "555-0100", "assigned_converter_id": converter.id }),
        )
        .await?;
    let uri = format!("/companies/{company_id}");
    let (_, before) = t.get(&uri, &manager).await?;

    // Anything besides conversionStatus is refused and nothing is written.
    let (status, body) = t
        .put(&uri, &converter, json!({ "name": "Renamed", "conversionStatus": "Confirmed" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "restricted_field_violation");
    assert_eq!(body["fields"], json!(["name"]));
    let (_, after) = t.get(&uri, &manager).await?;
    assert_eq!(before, after, "a rejected update must leave the row untouched");

    // Not assigned: ownership violation.
    let (status, body) = t
        .put(&uri, &other_converter, json!({ "conversionStatus": "Confirmed" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "ownership_violation");

    // Assigned converter may move the status.
    let (status, body) = t.put(&uri, &converter, json!({ "conversionStatus": "Confirmed" })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["conversionStatus"], "Confirmed");
    assert_eq!(body["phone"], "555-0100", "untouched fields keep their values");
    assert_eq!(body["version"], 2);

    // But never straight to Finalized.
    let (status, body) = t.put(&uri, &converter, json!({ "conversionStatus": "Finalized" })).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    Ok(())
}

#[tokio::test]
async fn finalization_is_one_way_and_locks_the_record() -> Result<()> {
    let t = TestApp::new().await?;
    let admin = t.user("Ada Admin", Role::Admin).await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;
    let converter = t.user("Cody Converter", Role::Converter).await?;

    let company_id = t
        .company(
            &collector,
            json!({
                "name": "ACME",
                "assigned_data_collector_id": collector.id,
                "assigned_converter_id": converter.id
            }),
        )
        .await?;
    let uri = format!("/companies/{company_id}");
    let finalize_uri = format!("/companies/{company_id}/finalize");

    // Still Waiting.
    let (status, body) = t.put(&finalize_uri, &manager, json!({})).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap_or_default().contains("not confirmed yet"), "{body}");

    // Data collectors may not finalize at all.
    let (status, _) = t.put(&uri, &collector, json!({ "conversionStatus": "Confirmed" })).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.put(&finalize_uri, &collector, json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.put(&finalize_uri, &manager, json!({})).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["company"]["finalization_status"], "Finalized");
    assert_eq!(body["company"]["finalized_by_id"], json!(manager.id));

    // Only once.
    let (status, body) = t.put(&finalize_uri, &manager, json!({})).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap_or_default().contains("already finalized"), "{body}");

    // Both assignees heard about it.
    for user in [&collector, &converter] {
        let messages = t.notifications_of(user.id).await?;
        assert_eq!(messages, vec!["Mona Manager finalized company \"ACME\"".to_string()]);
    }

    // The finalizer cannot edit afterwards, the administrator can.
    let (status, _) = t.put(&uri, &manager, json!({ "phone": "555-0199" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.put(&uri, &collector, json!({ "phone": "555-0199" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.delete(&uri, &collector).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = t.put(&uri, &admin, json!({ "phone": "555-0199" })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["finalization_status"], "Finalized");

    Ok(())
}

#[tokio::test]
async fn read_only_roles_cannot_write_companies() -> Result<()> {
    let t = TestApp::new().await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let head = t.user("Hana Head", Role::Head).await?;

    let (status, _) = t.post("/companies", &head, json!({ "name": "Nope" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let company_id = t.company(&manager, json!({ "name": "ACME" })).await?;
    let (status, _) = t
        .put(&format!("/companies/{company_id}"), &head, json!({ "phone": "1" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .post("/companies", &manager, json!({ "name": "Shortcut", "conversionStatus": "Finalized" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    Ok(())
}
