pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::GatewayConfig;
use crate::services::auth_service::AuthService;
use crate::services::file_service::FileService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state, map_response_with_state},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::files::get_upload_url,
        api::handlers::files::get_download_url,
        api::handlers::files::list_files,
        api::handlers::files::delete_file,
        api::handlers::files::get_file_metadata,
    ),
    components(
        schemas(
            api::handlers::auth::RegisterRequest,
            api::handlers::auth::LoginRequest,
            api::handlers::files::UploadUrlRequest,
            api::handlers::health::HealthResponse,
            services::auth_service::AuthSession,
            services::auth_service::UserProfile,
            models::FileRecord,
            models::UploadUrlData,
            models::DownloadUrlData,
            models::FileListData,
            models::DeletedFileData,
            models::FileMetadataData,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "files", description = "Pre-signed upload/download URLs and file management"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageService>,
    pub file_service: Arc<FileService>,
    pub auth_service: Arc<AuthService>,
    pub config: GatewayConfig,
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let files = Router::new()
        .route("/", get(api::handlers::files::list_files))
        .route("/upload-url", post(api::handlers::files::get_upload_url))
        .route("/:file_id", delete(api::handlers::files::delete_file))
        .route(
            "/:file_id/download-url",
            get(api::handlers::files::get_download_url),
        )
        .route(
            "/:file_id/metadata",
            get(api::handlers::files::get_file_metadata),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    let mut router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/auth/register", post(api::handlers::auth::register))
        .route("/api/auth/login", post(api::handlers::auth::login))
        .nest("/api/files", files);

    if let Some(dir) = &state.config.static_dir {
        info!("🗂️  Serving UI from {}", dir);
        let index = format!("{}/index.html", dir.trim_end_matches('/'));
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(map_response_with_state(
            state.clone(),
            api::middleware::error_detail::expose_error_details,
        ))
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Request-id propagation plus per-request tracing spans.
pub fn with_tracing(app: Router) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(&api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    app.layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
}
