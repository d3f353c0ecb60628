use std::sync::Arc;

use axum::http::Method;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{load_or_seed, CatalogStore, PolicyStore, SqliteCatalogStore};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::rate_limit::{self, RateLimitConfig, RateLimits};
use crate::routes::{
    auth, comments, companies, contacts, custom_fields, health, notifications, rbac, tasks, tickets, users,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<PolicyStore>,
    pub catalogs: Arc<dyn CatalogStore>,
    pub limits: Arc<RateLimits>,
}

impl AppState {
    pub async fn new(pool: SqlitePool, jwt: JwtConfig, limits: RateLimits) -> Result<Self, AppError> {
        let catalogs: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::new(pool.clone()));
        let catalog = load_or_seed(catalogs.as_ref()).await?;

        Ok(Self {
            pool,
            jwt: Arc::new(jwt),
            policy: Arc::new(PolicyStore::new(catalog)),
            catalogs,
            limits: Arc::new(limits),
        })
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let limits = RateLimits::new(RateLimitConfig::from_env()?)?;
    let state = AppState::new(pool, jwt_config, limits).await?;
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let api_limit = middleware::from_fn_with_state(state.limits.clone(), rate_limit::limit_api);
    let auth_limit = middleware::from_fn_with_state(state.limits.clone(), rate_limit::limit_auth);

    let auth_routes = Router::new()
        .route("/register", post(auth::register).layer(auth_limit.clone()))
        .route("/login", post(auth::login).layer(auth_limit))
        .route("/me", get(auth::me))
        .route("/permissions", get(auth::permissions));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/list", get(users::directory))
        .route("/:id", get(users::get_user))
        .route("/:id", put(users::update_user))
        .route("/:id", delete(users::delete_user));

    let company_routes = Router::new()
        .route("/", get(companies::list_companies))
        .route("/", post(companies::create_company))
        .route("/finalized/list", get(companies::list_finalized))
        .route("/:id", get(companies::get_company))
        .route("/:id", put(companies::update_company))
        .route("/:id", delete(companies::delete_company))
        .route("/:id/finalize", put(companies::finalize_company));

    let contact_routes = Router::new()
        .route("/", get(contacts::list_contacts))
        .route("/", post(contacts::create_contact))
        .route("/:id", get(contacts::get_contact))
        .route("/:id", put(contacts::update_contact))
        .route("/:id", delete(contacts::delete_contact));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/", post(tasks::create_task))
        .route("/:id", get(tasks::get_task))
        .route("/:id", put(tasks::update_task))
        .route("/:id", delete(tasks::delete_task));

    let ticket_routes = Router::new()
        .route("/", get(tickets::list_tickets))
        .route("/", post(tickets::create_ticket))
        .route("/:id", get(tickets::get_ticket))
        .route("/:id", put(tickets::update_ticket))
        .route("/:id", delete(tickets::delete_ticket));

    let comment_routes = Router::new()
        .route("/", post(comments::create_comment))
        .route("/company/:company_id", get(comments::list_company_comments))
        .route("/:id", put(comments::update_comment))
        .route("/:id", delete(comments::delete_comment));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/mark-all-read", put(notifications::mark_all_read))
        .route("/:id/read", put(notifications::mark_read))
        .route("/:id", delete(notifications::delete_notification));

    let custom_field_routes = Router::new()
        .route("/", get(custom_fields::list_custom_fields))
        .route("/", post(custom_fields::create_custom_field))
        .route("/:id", delete(custom_fields::delete_custom_field));

    let rbac_routes = Router::new()
        .route("/matrix", get(rbac::get_matrix))
        .route("/matrix/reset", post(rbac::reset_matrix))
        .route("/matrix/:role", put(rbac::update_role_vector));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/companies", company_routes)
        .nest("/contacts", contact_routes)
        .nest("/tasks", task_routes)
        .nest("/tickets", ticket_routes)
        .nest("/comments", comment_routes)
        .nest("/notifications", notification_routes)
        .nest("/custom-fields", custom_field_routes)
        .nest("/rbac", rbac_routes)
        .with_state(state)
        .layer(api_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
