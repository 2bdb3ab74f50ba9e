use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use demodeck_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

use cors::build_cors_layer;

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let admin_routes = Router::new()
        .route(
            "/api/admin/permission-cache",
            get(handlers::admin::permission_cache_handler)
                .delete(handlers::admin::clear_permission_cache_handler),
        )
        .route(
            "/api/admin/projects/{project_id}/users/{user_id}",
            put(handlers::admin::grant_user_project_role_handler)
                .delete(handlers::admin::revoke_user_project_role_handler),
        )
        .route(
            "/api/admin/projects/{project_id}/groups/{group_id}",
            put(handlers::admin::grant_group_project_role_handler)
                .delete(handlers::admin::revoke_group_project_role_handler),
        )
        .route(
            "/api/admin/groups/{group_id}/members/{user_id}",
            put(handlers::admin::add_group_member_handler)
                .delete(handlers::admin::remove_group_member_handler),
        )
        .route(
            "/api/deployment-audits",
            get(handlers::audits::list_audits_handler),
        )
        .route(
            "/api/deployment-audits/stats",
            get(handlers::audits::audit_stats_handler),
        )
        .route(
            "/api/deployment-audits/{audit_id}",
            get(handlers::audits::get_audit_handler),
        )
        .route(
            "/api/deployment-audits/{audit_id}/re-execute",
            post(handlers::audits::re_execute_audit_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_administrator,
        ));

    let protected_routes = Router::new()
        .route(
            "/api/projects/accessible",
            get(handlers::projects::accessible_projects_handler),
        )
        .route(
            "/api/deployments/trigger",
            post(handlers::deployments::trigger_deployment_handler),
        )
        .route(
            "/api/demo-configs/{demo_config_id}/files",
            get(handlers::artifacts::demo_config_file_handler),
        )
        .route(
            "/demo/{project_name}/{branch}",
            get(handlers::artifacts::demo_root_handler),
        )
        .route(
            "/demo/{project_name}/{branch}/",
            get(handlers::artifacts::demo_root_handler),
        )
        .route(
            "/demo/{project_name}/{branch}/{*sub_path}",
            get(handlers::artifacts::demo_file_handler),
        )
        .merge(admin_routes)
        .route_layer(from_fn(middleware::require_auth));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/api/webhook/github",
            get(handlers::webhook::webhook_test_handler)
                .post(handlers::webhook::github_webhook_handler),
        )
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(frontend_url)?)
        .layer(session_layer)
        .with_state(app_state))
}
