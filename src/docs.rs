use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::permissions,
		routes::users::list_users,
		routes::users::directory,
		routes::users::get_user,
		routes::users::update_user,
		routes::users::delete_user,
		routes::companies::list_companies,
		routes::companies::list_finalized,
		routes::companies::get_company,
		routes::companies::create_company,
		routes::companies::update_company,
		routes::companies::delete_company,
		routes::companies::finalize_company,
		routes::contacts::list_contacts,
		routes::contacts::get_contact,
		routes::contacts::create_contact,
		routes::contacts::update_contact,
		routes::contacts::delete_contact,
		routes::tasks::list_tasks,
		routes::tasks::get_task,
		routes::tasks::create_task,
		routes::tasks::update_task,
		routes::tasks::delete_task,
		routes::tickets::list_tickets,
		routes::tickets::get_ticket,
		routes::tickets::create_ticket,
		routes::tickets::update_ticket,
		routes::tickets::delete_ticket,
		routes::comments::list_company_comments,
		routes::comments::create_comment,
		routes::comments::update_comment,
		routes::comments::delete_comment,
		routes::notifications::list_notifications,
		routes::notifications::mark_read,
		routes::notifications::mark_all_read,
		routes::notifications::delete_notification,
		routes::custom_fields::list_custom_fields,
		routes::custom_fields::create_custom_field,
		routes::custom_fields::delete_custom_field,
		routes::rbac::get_matrix,
		routes::rbac::update_role_vector,
		routes::rbac::reset_matrix
	),
	components(
		schemas(
			authz::Role,
			authz::Capability,
			authz::PermissionVector,
			authz::RoleGroup,
			authz::ConversionStatus,
			authz::FinalizationStatus,
			routes::health::HealthResponse,
			models::MessageResponse,
			models::user::User,
			models::user::UserSummary,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::UserUpdateRequest,
			models::user::PermissionsResponse,
			models::company::Company,
			models::company::CompanyCreateRequest,
			models::company::CompanyPatch,
			models::company::FinalizeResponse,
			models::contact::Contact,
			models::contact::ContactRequest,
			models::task::TaskStatus,
			models::task::Task,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::ticket::Ticket,
			models::ticket::TicketCreateRequest,
			models::ticket::TicketUpdateRequest,
			models::comment::Comment,
			models::comment::CommentCreateRequest,
			models::comment::CommentUpdateRequest,
			models::notification::Notification,
			models::custom_field::CustomFieldType,
			models::custom_field::CustomFieldDefinition,
			models::custom_field::CustomFieldCreateRequest,
			models::rbac::GroupMembership,
			models::rbac::MatrixResponse,
			models::rbac::MatrixUpdateRequest,
			models::rbac::MatrixResetRequest
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Auth", description = "Authentication and caller permissions"),
		(name = "Users", description = "User management"),
		(name = "Companies", description = "Company records and finalization"),
		(name = "Contacts", description = "Contact people"),
		(name = "Tasks", description = "Assigned work"),
		(name = "Tickets", description = "Issues raised against records"),
		(name = "Comments", description = "Company discussion threads"),
		(name = "Notifications", description = "Per-user inbox"),
		(name = "Custom Fields", description = "Extra company attributes"),
		(name = "RBAC", description = "Permission matrix administration")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc)?;
	ensure_global_security(&mut doc)?;
	mark_public_operations(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: &utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?;

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	Ok(())
}

fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}

/// Sign-up, login and health need no token.
fn mark_public_operations(doc: &mut Value) {
	const PUBLIC: [(&str, &str); 3] = [
		("/auth/register", "post"),
		("/auth/login", "post"),
		("/api/health", "get"),
	];

	let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else {
		return;
	};
	for (path, method) in PUBLIC {
		if let Some(operation) = paths.get_mut(path).and_then(|item| item.get_mut(method)) {
			operation["security"] = json!([]);
		}
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_has_bearer_scheme_and_public_login() {
		let doc = build_openapi(8000).unwrap();
		let value = serde_json::to_value(&doc).unwrap();

		assert_eq!(value["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
		assert_eq!(value["paths"]["/auth/login"]["post"]["security"], json!([]));
		assert_eq!(value["servers"][0]["url"], "http://localhost:8000");
	}

	#[test]
	fn every_route_family_is_documented() {
		let value = serde_json::to_value(ApiDoc::openapi()).unwrap();
		let paths = value["paths"].as_object().unwrap();
		for path in [
			"/companies/{id}/finalize",
			"/tasks/{id}",
			"/tickets",
			"/comments/company/{company_id}",
			"/notifications/mark-all-read",
			"/custom-fields",
			"/rbac/matrix/{role}",
		] {
			assert!(paths.contains_key(path), "missing {path}");
		}
	}
}
