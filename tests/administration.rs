mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{id_of, TestApp};
use refined_crm::authz::Role;

#[tokio::test]
async fn user_management_respects_the_admin_boundary() -> Result<()> {
    let t = TestApp::new().await?;
    let admin = t.user("Ada Admin", Role::Admin).await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;

    let (status, users) = t.get("/users", &manager).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().map(Vec::len), Some(3));
    let (status, _) = t.get("/users", &collector).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Everyone can pick assignees from the directory.
    let (status, directory) = t.get("/users/list", &collector).await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = directory
        .as_array()
        .map(|items| items.iter().filter_map(|u| u["full_name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Ada Admin", "Dina Collector", "Mona Manager"]);
    assert!(directory[0].get("role").is_none());

    let collector_uri = format!("/users/{}", collector.id);
    let (status, body) = t.put(&collector_uri, &manager, json!({ "role": "Converter" })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "Converter");

    let (status, _) = t.put(&collector_uri, &manager, json!({ "role": "Admin" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "only administrators grant Admin");
    let (status, _) = t
        .put(&format!("/users/{}", admin.id), &manager, json!({ "full_name": "Renamed" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "only administrators edit Admin accounts");

    let (_, admin_profile) = t.get(&format!("/users/{}", admin.id), &manager).await?;
    let (status, _) = t
        .put(&collector_uri, &manager, json!({ "email": admin_profile["email"] }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t.delete(&collector_uri, &manager).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.delete(&format!("/users/{}", admin.id), &admin).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t.delete(&collector_uri, &admin).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.get(&collector_uri, &admin).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn custom_fields_are_managed_by_their_group() -> Result<()> {
    let t = TestApp::new().await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;
    let head = t.user("Hana Head", Role::Head).await?;

    let field = json!({ "label": "Industry", "type": "text" });
    let (status, _) = t.post("/custom-fields", &collector, field.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = t.post("/custom-fields", &manager, field.clone()).await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["type"], "text");
    let (status, _) = t.post("/custom-fields", &manager, field).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = t
        .post("/custom-fields", &manager, json!({ "label": "Budget", "type": "currency" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("currency")), "{body}");

    let (status, list) = t.get("/custom-fields", &head).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let uri = format!("/custom-fields/{}", id_of(&created)?);
    let (status, _) = t.delete(&uri, &manager).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.delete(&uri, &manager).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn contacts_are_data_entry() -> Result<()> {
    let t = TestApp::new().await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;
    let head = t.user("Hana Head", Role::Head).await?;
    let company_id = t.company(&collector, json!({ "name": "ACME" })).await?;

    let (status, _) = t.post("/contacts", &head, json!({ "name": "Pat" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .post("/contacts", &collector, json!({ "name": "Pat", "companyId": Uuid::new_v4() }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, contact) = t
        .post("/contacts", &collector, json!({ "name": "Pat", "phone": "555-0101", "companyId": company_id }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{contact}");
    let uri = format!("/contacts/{}", id_of(&contact)?);

    let (status, body) = t
        .put(&uri, &collector, json!({ "name": "Pat Doe", "companyId": company_id }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pat Doe");
    assert_eq!(body["companyId"], json!(company_id));

    let (status, list) = t.get("/contacts", &head).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = t.delete(&uri, &collector).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn finalizers_cannot_be_deleted_out_from_under_their_stamp() -> Result<()> {
    let t = TestApp::new().await?;
    let admin = t.user("Ada Admin", Role::Admin).await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;

    let company_id = t
        .company(&manager, json!({ "name": "ACME", "conversionStatus": "Confirmed" }))
        .await?;
    let company_uri = format!("/companies/{company_id}");
    let (status, _) = t.put(&format!("{company_uri}/finalize"), &manager, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, before) = t.get(&company_uri, &admin).await?;

    let (status, body) = t.delete(&format!("/users/{}", manager.id), &admin).await?;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (_, after) = t.get(&company_uri, &admin).await?;
    assert_eq!(after["finalized_by_id"], json!(manager.id));
    assert_eq!(after["version"], before["version"]);

    Ok(())
}
