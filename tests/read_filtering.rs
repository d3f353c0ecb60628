mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{id_of, TestApp};
use refined_crm::authz::Role;

fn names(list: &Value) -> Vec<String> {
    let mut names: Vec<String> = list
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn each_role_sees_its_slice_of_companies() -> Result<()> {
    let t = TestApp::new().await?;
    let admin = t.user("Ada Admin", Role::Admin).await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let collector = t.user("Dina Collector", Role::DataCollector).await?;
    let head = t.user("Hana Head", Role::Head).await?;
    let converter = t.user("Cody Converter", Role::Converter).await?;

    let assigned = t
        .company(&manager, json!({ "name": "Waiting Assigned", "assigned_converter_id": converter.id }))
        .await?;
    t.company(&manager, json!({ "name": "Waiting Co" })).await?;
    t.company(&manager, json!({ "name": "NoReach Co", "conversionStatus": "NoReach" })).await?;
    t.company(&manager, json!({ "name": "Confirmed Co", "conversionStatus": "Confirmed" })).await?;
    let locked = t
        .company(
            &manager,
            json!({ "name": "Locked Co", "conversionStatus": "Confirmed", "assigned_converter_id": converter.id }),
        )
        .await?;
    let reopened = t
        .company(&manager, json!({ "name": "Reopened Co", "conversionStatus": "Confirmed" }))
        .await?;
    for id in [&locked, &reopened] {
        let (status, _) = t.put(&format!("/companies/{id}/finalize"), &manager, json!({})).await?;
        assert_eq!(status, StatusCode::OK);
    }
    // Only an administrator can move a finalized record's conversion status.
    let (status, body) = t
        .put(&format!("/companies/{reopened}"), &admin, json!({ "conversionStatus": "Waiting" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["finalization_status"], "Finalized");

    let everything = vec!["Confirmed Co", "Locked Co", "NoReach Co", "Reopened Co", "Waiting Assigned", "Waiting Co"];
    let pending = vec!["Confirmed Co", "NoReach Co", "Waiting Assigned", "Waiting Co"];
    let finalized = vec!["Locked Co", "Reopened Co"];

    for viewer in [&admin, &manager] {
        let (_, all) = t.get("/companies", viewer).await?;
        assert_eq!(names(&all), everything);
        let (_, list) = t.get("/companies/finalized/list", viewer).await?;
        assert_eq!(names(&list), finalized);
    }

    // Data collectors work on pending records only.
    let (_, collectors_view) = t.get("/companies", &collector).await?;
    assert_eq!(names(&collectors_view), pending);
    let (_, list) = t.get("/companies/finalized/list", &collector).await?;
    assert_eq!(names(&list), Vec::<String>::new());
    let (status, _) = t.get(&format!("/companies/{locked}"), &collector).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Heads only see finalized records, whatever their conversion status.
    let (_, heads_view) = t.get("/companies", &head).await?;
    assert_eq!(names(&heads_view), finalized);
    let (_, list) = t.get("/companies/finalized/list", &head).await?;
    assert_eq!(names(&list), finalized);
    let (status, _) = t.get(&format!("/companies/{assigned}"), &head).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Converters only see what is assigned to them, and never finalized data.
    let (_, converters_view) = t.get("/companies", &converter).await?;
    assert_eq!(names(&converters_view), vec!["Waiting Assigned"]);
    let (status, _) = t.get(&format!("/companies/{locked}"), &converter).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = t.get("/companies/finalized/list", &converter).await?;
    assert_eq!(names(&list), Vec::<String>::new());

    Ok(())
}

#[tokio::test]
async fn comments_follow_visibility_and_authorship() -> Result<()> {
    let t = TestApp::new().await?;
    let admin = t.user("Ada Admin", Role::Admin).await?;
    let manager = t.user("Mona Manager", Role::Manager).await?;
    let head = t.user("Hana Head", Role::Head).await?;
    let converter = t.user("Cody Converter", Role::Converter).await?;

    let open = t.company(&manager, json!({ "name": "Open Co" })).await?;
    let locked = t
        .company(&manager, json!({ "name": "Locked Co", "conversionStatus": "Confirmed" }))
        .await?;
    t.put(&format!("/companies/{locked}/finalize"), &manager, json!({})).await?;

    // A read-only role with comment rights.
    let (status, comment) = t
        .post("/comments", &head, json!({ "content": "Numbers look right.", "company_id": locked }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{comment}");
    assert_eq!(comment["user_name"], "Hana Head");
    assert_eq!(comment["user_role"], "Head");
    let comment_uri = format!("/comments/{}", id_of(&comment)?);

    let (status, _) = t
        .post("/comments", &converter, json!({ "content": "Me too", "company_id": open }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.get(&format!("/comments/company/{open}"), &head).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "comments follow company visibility");
    let (status, _) = t
        .post("/comments", &head, json!({ "content": "Hidden from me", "company_id": open }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "cannot comment on a company it cannot see");
    let (status, thread) = t.get(&format!("/comments/company/{locked}"), &head).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread.as_array().map(Vec::len), Some(1));

    // Only the author or an administrator changes a comment.
    let (status, body) = t.put(&comment_uri, &manager, json!({ "content": "Edited" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "ownership_violation");
    let (status, body) = t.put(&comment_uri, &head, json!({ "content": "Numbers confirmed." })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Numbers confirmed.");
    let (status, _) = t.delete(&comment_uri, &admin).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}
