// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::api::api_router;
use super::auth::{CALLBACK_ROUTE, discord_auth_route, login_route, logout_route};
use super::error::ApiError;
use super::session::DatabaseStore;
use super::state::AppState;
use crate::context::BotContext;
use axum::Router;
use axum::routing::get;
use miette::IntoDiagnostic;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::service::SessionManagerLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_server_task(ctx: Arc<BotContext>) {
	let task_result = run_server(ctx).await;
	if let Err(error) = task_result {
		tracing::error!(source = ?error, "Web server failed to run");
	}
}

fn router(ctx: Arc<BotContext>) -> Router {
	let session_store = DatabaseStore::new(ctx.db_connection_pool.clone());
	let session_layer = SessionManagerLayer::new(session_store).with_same_site(SameSite::Lax);

	let app_state = AppState { ctx };

	Router::new()
		.route("/login", get(login_route))
		.route(CALLBACK_ROUTE, get(discord_auth_route))
		.route("/logout", get(logout_route))
		.nest("/api", api_router())
		.fallback(|| async { ApiError::NotFound })
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(REQUEST_TIMEOUT))
				.layer(session_layer),
		)
		.with_state(app_state)
}

async fn run_server(ctx: Arc<BotContext>) -> miette::Result<()> {
	let bind_addr = ctx.config.web.bind_addr.clone();
	let app = router(ctx);

	let listener = TcpListener::bind(&bind_addr).await.into_diagnostic()?;
	tracing::info!(address = %bind_addr, "Dashboard API listening");
	axum::serve(listener, app.into_make_service()).await.into_diagnostic()?;

	Ok(())
}
