mod common;

use anyhow::Result;
use axum::http::StatusCode;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

use common::{TestApp, TEST_SECRET};
use refined_crm::jwt::Claims;

#[tokio::test]
async fn auth_edge_cases() -> Result<()> {
    let t = TestApp::new().await?;

    // 1. Register with short password
    let short_pass_body = json!({
        "full_name": "Short Pass",
        "email": "short@example.com",
        "password": "short"
    });
    let (status, _) = t.request("POST", "/auth/register", None, Some(short_pass_body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "Should fail with bad request for short password");

    // 2. Register with valid user; a requested role is ignored
    let valid_body = json!({
        "full_name": "Valid User",
        "email": "Valid@Example.com",
        "password": "password123",
        "role": "Admin"
    });
    let (status, body) = t.request("POST", "/auth/register", None, Some(valid_body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "DataCollector");
    assert_eq!(body["user"]["email"], "valid@example.com");

    // 3. Same email again
    let dup_body = json!({
        "full_name": "Again",
        "email": "valid@example.com",
        "password": "password123"
    });
    let (status, _) = t.request("POST", "/auth/register", None, Some(dup_body)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // 4. Login with wrong password
    let wrong_pass_body = json!({
        "email": "valid@example.com",
        "password": "wrongpassword"
    });
    let (status, _) = t.request("POST", "/auth/login", None, Some(wrong_pass_body)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "Should fail with unauthorized for wrong password");

    // 5. Login with non-existent email
    let no_user_body = json!({
        "email": "nobody@example.com",
        "password": "password123"
    });
    let (status, _) = t.request("POST", "/auth/login", None, Some(no_user_body)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "Should fail with unauthorized for non-existent user");

    // 6. Access protected route without token, or with garbage
    let (status, body) = t.request("GET", "/companies", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "Should fail with unauthorized for missing token");
    assert_eq!(body["error"], "unauthorized");
    let (status, _) = t.request("GET", "/companies", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 7. Correct login works and the token is usable
    let login_body = json!({
        "email": "valid@example.com",
        "password": "password123"
    });
    let (status, body) = t.request("POST", "/auth/login", None, Some(login_body)).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap_or_default().to_string();
    let (status, me) = t.request("GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["full_name"], "Valid User");

    // 8. A body of the wrong shape still gets the JSON error envelope
    let (status, body) = t.request("POST", "/auth/login", None, Some(json!("not an object"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    Ok(())
}

#[tokio::test]
async fn unknown_role_in_token_fails_closed() -> Result<()> {
    let t = TestApp::new().await?;

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: Uuid::new_v4(),
        role: "SuperUser".to_string(),
        exp: now + 3600,
        iat: now,
    };
    let token = jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes()))?;

    let (status, _) = t.request("GET", "/companies", Some(&token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t
        .request("POST", "/tickets", Some(&token), Some(json!({ "title": "Help" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "open gates stay closed to unrecognized roles");

    let (status, body) = t.request("GET", "/auth/permissions", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], serde_json::Value::Null);
    assert_eq!(body["permissions"]["canRead"], false);

    Ok(())
}

#[tokio::test]
async fn permissions_endpoint_reflects_the_matrix() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.user("Hana Head", refined_crm::authz::Role::Head).await?;

    let (status, body) = t.get("/auth/permissions", &head).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Head");
    assert_eq!(body["permissions"]["canComment"], true);
    assert_eq!(body["permissions"]["canEdit"], false);
    assert_eq!(body["catalog_version"], 1);
    let groups: Vec<&str> = body["groups"]
        .as_array()
        .map(|a| a.iter().filter_map(|g| g.as_str()).collect())
        .unwrap_or_default();
    assert!(groups.contains(&"READ_ONLY_WITH_COMMENTS"), "groups: {groups:?}");

    Ok(())
}
