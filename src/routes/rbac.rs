//! Permission matrix administration
//!
//! Every edit is copy-on-write against the version the caller last saw:
//! the new catalog is validated, persisted as the next version, and only
//! then swapped in. Requests already running keep their snapshot.

use axum::extract::{Path, State};
use axum::Json;

use crate::app::AppState;
use crate::authz::{ops, AuthenticatedActor, Role, RoleCatalog};
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::rbac::{MatrixResetRequest, MatrixResponse, MatrixUpdateRequest};
use crate::routes::authorize;

#[utoipa::path(
    get,
    path = "/rbac/matrix",
    tag = "RBAC",
    responses(
        (status = 200, description = "Live permission matrix", body = MatrixResponse),
        (status = 403, description = "Role may not view the matrix")
    )
)]
pub async fn get_matrix(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MatrixResponse>> {
    let (catalog, _actor) = authorize(&state, &auth, &ops::CATALOG_READ)?;
    Ok(Json(MatrixResponse::from(catalog.as_ref())))
}

/// Flip capabilities of one role. The Admin vector cannot be edited.
#[utoipa::path(
    put,
    path = "/rbac/matrix/{role}",
    tag = "RBAC",
    params(("role" = String, Path, description = "Role name, e.g. Manager")),
    request_body = MatrixUpdateRequest,
    responses(
        (status = 200, description = "Matrix committed", body = MatrixResponse),
        (status = 400, description = "Unknown role or invalid matrix"),
        (status = 403, description = "Only administrators edit the matrix; Admin is immutable"),
        (status = 409, description = "Matrix changed since expected_version")
    )
)]
pub async fn update_role_vector(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role): Path<String>,
    JsonBody(payload): JsonBody<MatrixUpdateRequest>,
) -> AppResult<Json<MatrixResponse>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::CATALOG_UPDATE)?;
    let role: Role = role.parse().map_err(|err| AppError::bad_request(format!("{err}")))?;

    let next = catalog.with_override(role, &payload.capabilities, payload.expected_version)?;
    let committed = commit(&state, &actor, next).await?;
    tracing::info!(
        actor_id = %actor.id,
        role = %role,
        changes = payload.capabilities.len(),
        version = committed.version,
        "role vector updated"
    );
    Ok(Json(committed))
}

#[utoipa::path(
    post,
    path = "/rbac/matrix/reset",
    tag = "RBAC",
    request_body = MatrixResetRequest,
    responses(
        (status = 200, description = "Canonical matrix committed", body = MatrixResponse),
        (status = 403, description = "Only administrators edit the matrix"),
        (status = 409, description = "Matrix changed since expected_version")
    )
)]
pub async fn reset_matrix(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<MatrixResetRequest>,
) -> AppResult<Json<MatrixResponse>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::CATALOG_UPDATE)?;

    let next = catalog.reset(payload.expected_version)?;
    let committed = commit(&state, &actor, next).await?;
    tracing::info!(actor_id = %actor.id, version = committed.version, "role catalog reset");
    Ok(Json(committed))
}

/// The stored version row is the arbiter between concurrent editors.
async fn commit(state: &AppState, actor: &AuthenticatedActor, next: RoleCatalog) -> AppResult<MatrixResponse> {
    state.catalogs.save(&next, Some(actor.id)).await?;
    let live = state.policy.commit(next)?;
    Ok(MatrixResponse::from(live.as_ref()))
}
