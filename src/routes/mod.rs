use std::sync::Arc;

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{authorize_operation, AuthenticatedActor, OperationRule, RoleCatalog};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

pub mod auth;
pub mod comments;
pub mod companies;
pub mod contacts;
pub mod custom_fields;
pub mod health;
pub mod notifications;
pub mod rbac;
pub mod tasks;
pub mod tickets;
pub mod users;

/// Snapshot the live catalog and run the operation-level checks. Every
/// further decision in the handler uses the same snapshot.
pub(crate) fn authorize(
    state: &AppState,
    auth: &AuthUser,
    rule: &OperationRule,
) -> AppResult<(Arc<RoleCatalog>, AuthenticatedActor)> {
    let catalog = state.policy.snapshot();
    let actor = authorize_operation(&catalog, Some(&auth.actor), rule)?;
    Ok((catalog, actor))
}

/// Display name used in notification sentences.
pub(crate) async fn display_name(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<String> {
    let name: Option<String> = sqlx::query_scalar("SELECT full_name FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(name.unwrap_or_else(|| "Someone".to_string()))
}

pub(crate) async fn company_name(conn: &mut SqliteConnection, company_id: Option<Uuid>) -> AppResult<Option<String>> {
    let Some(company_id) = company_id else {
        return Ok(None);
    };
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM companies WHERE id = ?")
        .bind(company_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(name)
}

pub(crate) async fn ensure_company_exists(conn: &mut SqliteConnection, company_id: Option<Uuid>) -> AppResult<()> {
    if company_id.is_some() && company_name(conn, company_id).await?.is_none() {
        return Err(AppError::bad_request("company does not exist"));
    }
    Ok(())
}

/// Reject references to users that do not exist.
pub(crate) async fn ensure_users_exist(conn: &mut SqliteConnection, user_ids: &[Option<Uuid>]) -> AppResult<()> {
    for user_id in user_ids.iter().flatten() {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
        if found.is_none() {
            return Err(AppError::bad_request(format!("user {user_id} does not exist")));
        }
    }
    Ok(())
}
