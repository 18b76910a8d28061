// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::ApiError;
use super::session_key::{AUTH_CALLBACK_PATH, AUTH_CSRF_STATE, AUTH_CSRF_VERIFIER, DISCORD_USER, MANAGEABLE_GUILDS};
use super::state::AppState;
use crate::config::ConfigData;
use axum::extract::{FromRequestParts, Query, RawPathParams, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use miette::IntoDiagnostic;
use oauth2::basic::BasicClient;
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
	PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tower_sessions::Session;
use twilight_http::client::Client;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

pub const DISCORD_AUTH_URL: &str = "https://discord.com/oauth2/authorize";
pub const DISCORD_AUTH_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
pub const CALLBACK_ROUTE: &str = "/discord_auth_callback";

type DiscordOAuthClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Gets the OAuth client object for interacting with Discord as an OAuth2 client
fn discord_oauth_client(config: &ConfigData) -> miette::Result<DiscordOAuthClient> {
	let auth_url = AuthUrl::new(DISCORD_AUTH_URL.to_string()).into_diagnostic()?;
	let token_url = TokenUrl::new(DISCORD_AUTH_TOKEN_URL.to_string()).into_diagnostic()?;
	let redirect_url = RedirectUrl::new(format!("{}{}", config.web.base_url, CALLBACK_ROUTE)).into_diagnostic()?;

	let client = BasicClient::new(ClientId::new(config.discord.client_id.clone()))
		.set_client_secret(ClientSecret::new(config.discord.client_secret.clone()))
		.set_auth_uri(auth_url)
		.set_token_uri(token_url)
		.set_redirect_uri(redirect_url);
	Ok(client)
}

/// Whether a user with the given standing in a guild may change its settings from the dashboard
pub fn is_manageable(owner: bool, permissions: Permissions) -> bool {
	owner || permissions.intersects(Permissions::ADMINISTRATOR | Permissions::MANAGE_GUILD)
}

/// Only same-site paths are followed after login.
fn local_redirect_path(requested: Option<&str>) -> String {
	match requested {
		Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
		_ => String::from("/"),
	}
}

#[derive(Debug, Deserialize)]
pub struct LoginArgs {
	redirect: Option<String>,
}

/// Starts a dashboard login by sending the user to Discord's OAuth consent page
pub async fn login_route(Query(query): Query<LoginArgs>, session: Session, State(state): State<AppState>) -> Response {
	let redirect_path = local_redirect_path(query.redirect.as_deref());
	if let Err(error) = session.insert(AUTH_CALLBACK_PATH, redirect_path).await {
		tracing::error!(source = ?error, "Failed to set callback path to session");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}

	let oauth_client = match discord_oauth_client(&state.ctx.config) {
		Ok(client) => client,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to set up oauth client");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let (code_challenge, code_verifier) = PkceCodeChallenge::new_random_sha256();

	let (oauth_url, csrf_state) = oauth_client
		.authorize_url(CsrfToken::new_random)
		.add_scope(Scope::new(String::from("identify")))
		.add_scope(Scope::new(String::from("guilds")))
		.set_pkce_challenge(code_challenge)
		.url();

	let insert_result = session.insert(AUTH_CSRF_STATE, csrf_state.secret().clone()).await;
	if let Err(error) = insert_result {
		tracing::error!(source = ?error, "Failed to set oauth validation info to session");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}
	let insert_result = session.insert(AUTH_CSRF_VERIFIER, code_verifier.secret().clone()).await;
	if let Err(error) = insert_result {
		tracing::error!(source = ?error, "Failed to set oauth validation info to session");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}

	Redirect::to(oauth_url.as_str()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackArgs {
	code: String,
	state: String,
}

/// Route function for the OAuth login callback
pub async fn discord_auth_route(
	Query(query): Query<CallbackArgs>,
	session: Session,
	State(state): State<AppState>,
) -> Response {
	let csrf_state: Option<String> = match session.remove(AUTH_CSRF_STATE).await {
		Ok(state) => state,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get CSRF state for login callback");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let code_verifier: Option<String> = match session.remove(AUTH_CSRF_VERIFIER).await {
		Ok(verifier) => verifier,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get CSRF code verifier for login callback");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let redirect_path: Option<String> = match session.remove(AUTH_CALLBACK_PATH).await {
		Ok(path) => path,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get callback redirect path for login callback");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let (Some(csrf_state), Some(code_verifier)) = (csrf_state, code_verifier) else {
		return StatusCode::BAD_REQUEST.into_response();
	};
	if csrf_state != query.state {
		return StatusCode::BAD_REQUEST.into_response();
	}

	let oauth_client = match discord_oauth_client(&state.ctx.config) {
		Ok(client) => client,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to set up oauth client");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	// No redirects during the token exchange
	let http_client = match oauth2::reqwest::ClientBuilder::new()
		.redirect(oauth2::reqwest::redirect::Policy::none())
		.build()
	{
		Ok(client) => client,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to set up oauth HTTP client");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let token_response = oauth_client
		.exchange_code(AuthorizationCode::new(query.code))
		.set_pkce_verifier(PkceCodeVerifier::new(code_verifier))
		.request_async(&http_client)
		.await;
	let token_response = match token_response {
		Ok(response) => response,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get token response for oauth");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let discord_user_client = Client::builder()
		.token(format!("Bearer {}", token_response.access_token().secret()))
		.build();
	let discord_user = match discord_user_client.current_user().await {
		Ok(response) => response.model().await,
		Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
	};
	let discord_user = match discord_user {
		Ok(user) => user,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to extract Discord user info");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let user_guilds = match discord_user_client.current_user_guilds().await {
		Ok(response) => response.models().await,
		Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
	};
	let user_guilds = match user_guilds {
		Ok(guilds) => guilds,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to extract Discord guild list");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let manageable_guilds: Vec<Id<GuildMarker>> = user_guilds
		.iter()
		.filter(|guild| is_manageable(guild.owner, guild.permissions))
		.map(|guild| guild.id)
		.collect();

	if let Err(error) = session.cycle_id().await {
		tracing::error!(source = ?error, "Failed to rotate session ID at login");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}
	if let Err(error) = session.insert(DISCORD_USER, discord_user.id).await {
		tracing::error!(source = ?error, "Failed to store Discord user ID");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}
	if let Err(error) = session.insert(MANAGEABLE_GUILDS, &manageable_guilds).await {
		tracing::error!(source = ?error, "Failed to store manageable guilds");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}
	tracing::info!(user = %discord_user.id, guilds = manageable_guilds.len(), "Dashboard login");

	let redirect_path = local_redirect_path(redirect_path.as_deref());
	Redirect::to(&redirect_path).into_response()
}

pub async fn logout_route(session: Session) -> Response {
	if let Err(error) = session.flush().await {
		tracing::error!(source = ?error, "Failed to end session at logout");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}
	Redirect::to("/").into_response()
}

/// The logged-in dashboard user
pub struct DashboardUser {
	pub user_id: Id<UserMarker>,
	pub session: Session,
}

impl<S: Send + Sync> FromRequestParts<S> for DashboardUser {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let session = Session::from_request_parts(parts, state)
			.await
			.map_err(|(_, reason)| {
				tracing::error!(reason, "Session layer missing for API request");
				ApiError::Internal
			})?;
		let user_id: Option<Id<UserMarker>> = session.get(DISCORD_USER).await.map_err(|error| {
			tracing::error!(source = ?error, "Failed to retrieve user ID from session");
			ApiError::Internal
		})?;
		match user_id {
			Some(user_id) => Ok(Self { user_id, session }),
			None => Err(ApiError::Unauthorized),
		}
	}
}

impl DashboardUser {
	pub async fn manageable_guilds(&self) -> Result<Vec<Id<GuildMarker>>, ApiError> {
		let guilds: Option<Vec<Id<GuildMarker>>> = self.session.get(MANAGEABLE_GUILDS).await.map_err(|error| {
			tracing::error!(source = ?error, "Failed to retrieve manageable guilds from session");
			ApiError::Internal
		})?;
		Ok(guilds.unwrap_or_default())
	}
}

/// A request for a guild the logged-in user may manage. Requires a `{guild_id}` route parameter.
pub struct GuildAccess {
	pub guild_id: Id<GuildMarker>,
	pub user_id: Id<UserMarker>,
}

fn guild_id_param(params: &RawPathParams) -> Option<Id<GuildMarker>> {
	params
		.iter()
		.find(|(key, _)| *key == "guild_id")
		.and_then(|(_, value)| value.parse::<u64>().ok())
		.and_then(Id::new_checked)
}

impl<S: Send + Sync> FromRequestParts<S> for GuildAccess {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let user = DashboardUser::from_request_parts(parts, state).await?;
		let params = RawPathParams::from_request_parts(parts, state)
			.await
			.map_err(|_| ApiError::NotFound)?;
		let guild_id = guild_id_param(&params).ok_or(ApiError::NotFound)?;

		if !user.manageable_guilds().await?.contains(&guild_id) {
			return Err(ApiError::Forbidden);
		}
		Ok(Self {
			guild_id,
			user_id: user.user_id,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn owners_and_managers_can_manage() {
		assert!(is_manageable(true, Permissions::empty()));
		assert!(is_manageable(false, Permissions::ADMINISTRATOR));
		assert!(is_manageable(false, Permissions::MANAGE_GUILD | Permissions::SEND_MESSAGES));
		assert!(!is_manageable(false, Permissions::MANAGE_CHANNELS | Permissions::BAN_MEMBERS));
	}

	#[test]
	fn login_redirects_stay_on_site() {
		assert_eq!(local_redirect_path(Some("/api/stats")), "/api/stats");
		assert_eq!(local_redirect_path(Some("//evil.example")), "/");
		assert_eq!(local_redirect_path(Some("https://evil.example")), "/");
		assert_eq!(local_redirect_path(Some("/\\evil.example")), "/");
		assert_eq!(local_redirect_path(None), "/");
	}
}
