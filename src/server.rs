use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config;
use crate::context::AppContext;
use crate::monitor::hpa_cache::HpaIdentity;
use crate::utils::metrics_builder::{Metrics, Timestamp};
use crate::utils::prometheus_format::PrometheusFormat;

const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Extract HPA key (`namespace/name`) from query parameters
#[derive(Deserialize)]
pub struct HpaQuery {
    hpa: Option<String>,
}

/// Create the HTTP server router
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    let app_context_clone1 = app_context.clone();
    let app_context_clone2 = app_context.clone();
    let app_context_clone3 = app_context.clone();

    Router::new()
        .route("/", get(index_page))
        .route(
            config::METRICS_URL,
            get(move |Query(params): Query<HpaQuery>| async move {
                metrics_handler(app_context_clone1.clone(), params).await
            }),
        )
        .route(
            config::HPAS_URL,
            get(move || async move { hpas_handler(app_context_clone2.clone()).await }),
        )
        .route(
            config::PAYLOAD_URL,
            get(move |Query(params): Query<HpaQuery>| async move {
                payload_handler(app_context_clone3.clone(), params).await
            }),
        )
}

/// Index page handler
async fn index_page() -> impl IntoResponse {
    info!("Index page request received");
    let html = r#"<html>
    <head><title>HPA Pulse</title></head>
    <body>
    <h1>Available HTTP endpoints:</h1>
    <ul>
    <li><b><a href='/metrics'>/metrics</a></b>: HPA metrics in Prometheus format (<code>?hpa=namespace/name</code> for one HPA)</li>
    <li><b><a href='/hpas'>/hpas</a></b>: List all loaded HorizontalPodAutoscalers</li>
    <li><b><a href='/payload'>/payload</a></b>: Structured metrics payload as JSON</li>
    </ul>
    </body>
    </html>"#;
    Html(html).into_response()
}

fn text_response(status: StatusCode, body: String) -> Response {
    (status, [("Content-Type", TEXT_CONTENT_TYPE)], body).into_response()
}

/// Gather the requested payloads: one HPA when `hpa` is set, all of them otherwise
///
/// Returns an error response when nothing can be served.
async fn select_payloads(ctx: &AppContext, params: HpaQuery) -> Result<Vec<Metrics>, Response> {
    let metrics_cache = ctx.metrics_cache();

    if let Some(key) = params.hpa {
        debug!(hpa = %key, "Fetching metrics for specific HPA");
        return match metrics_cache.get_metrics(&key).await {
            Some(cached) => Ok(vec![cached.metrics]),
            None => {
                warn!(hpa = %key, "No cached metrics available for HPA");
                Err(text_response(
                    StatusCode::NOT_FOUND,
                    format!("No cached metrics available for HPA {}", key),
                ))
            }
        };
    }

    let all = metrics_cache.get_all().await;
    if all.is_empty() {
        warn!("No cached metrics available");
        return Err(text_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "No cached metrics available".to_string(),
        ));
    }
    Ok(all.into_iter().map(|(_, cached)| cached.metrics).collect())
}

/// Metrics endpoint handler
async fn metrics_handler(ctx: Arc<AppContext>, params: HpaQuery) -> Response {
    info!("Metrics request received");

    let payloads = match select_payloads(&ctx, params).await {
        Ok(payloads) => payloads,
        Err(response) => return response,
    };

    let merged = Metrics {
        resource_metrics: payloads
            .into_iter()
            .flat_map(|m| m.resource_metrics)
            .collect(),
    };
    let output = merged.to_prometheus_format();
    info!(output_size = output.len(), "Returning metrics");
    text_response(StatusCode::OK, output)
}

/// Structured payload handler
async fn payload_handler(ctx: Arc<AppContext>, params: HpaQuery) -> Response {
    info!("Payload request received");

    let payloads = match select_payloads(&ctx, params).await {
        Ok(payloads) => payloads,
        Err(response) => return response,
    };

    match serde_json::to_string(&payloads) {
        Ok(json) => (StatusCode::OK, [("Content-Type", JSON_CONTENT_TYPE)], json).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize payload");
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to serialize payload".to_string(),
            )
        }
    }
}

/// One entry of the `/hpas` listing
#[derive(Serialize)]
struct HpaEntry {
    key: String,
    #[serde(flatten)]
    identity: HpaIdentity,
    /// Tick of the payload currently served, absent before the first collection
    collected_at: Option<Timestamp>,
}

/// HPA listing handler
async fn hpas_handler(ctx: Arc<AppContext>) -> impl IntoResponse {
    info!("HPA listing request received");
    let identities = ctx.hpa_cache().get_hpas_with_identity().await;
    let metrics_cache = ctx.metrics_cache();

    let mut hpas = Vec::with_capacity(identities.len());
    for (key, identity) in identities {
        let collected_at = metrics_cache
            .get_metrics(&key)
            .await
            .map(|cached| cached.collected_at);
        hpas.push(HpaEntry {
            key,
            identity,
            collected_at,
        });
    }
    info!(hpa_count = hpas.len(), "Returning list of HPAs");

    let json_output = serde_json::to_string(&hpas).unwrap_or_else(|e| {
        warn!("Failed to serialize HPAs: {}", e);
        "[]".to_string()
    });

    (
        StatusCode::OK,
        [("Content-Type", JSON_CONTENT_TYPE)],
        json_output,
    )
        .into_response()
}

/// Start the HTTP server
pub async fn start_server(listen_address: &str, app_context: AppContext) -> anyhow::Result<()> {
    let app_context = Arc::new(app_context);
    let router = create_router(app_context);

    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    info!("Server listening on {}", listen_address);

    axum::serve(listener, router).await?;

    Ok(())
}
