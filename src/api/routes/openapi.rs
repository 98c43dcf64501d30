//! OpenAPI specification endpoints.
//!
//! Serves the generated document as JSON plus a small landing page.

use axum::{
    Router,
    response::{Html, Json},
    routing::get,
};
use utoipa::OpenApi;

use super::super::openapi::ApiDoc;
use super::app_state::AppState;

pub fn openapi_router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(serve_openapi_json))
        .route("/swagger", get(serve_swagger_html))
}

/// GET /openapi.json - Serve the OpenAPI specification as JSON
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "OpenAPI",
    responses(
        (status = 200, description = "OpenAPI specification", body = Object)
    )
)]
pub async fn serve_openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// GET /swagger - Serve a simple HTML page linking the OpenAPI document
pub async fn serve_swagger_html() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html>
<head>
    <title>Critique Sessions API - OpenAPI Documentation</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            max-width: 800px;
            margin: 50px auto;
            padding: 20px;
        }
        a.download {
            display: inline-block;
            margin-top: 20px;
            padding: 10px 20px;
            background-color: #007bff;
            color: white;
            text-decoration: none;
            border-radius: 5px;
        }
    </style>
</head>
<body>
    <h1>Critique Sessions API Documentation</h1>
    <p>The OpenAPI document can be loaded into Swagger UI, Postman or any other OpenAPI tool.</p>
    <a class="download" href="/openapi.json">Download openapi.json</a>
</body>
</html>
"#,
    )
}
