// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::ValidationError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// A failed dashboard API request
#[derive(Debug)]
pub enum ApiError {
	/// No one is logged in
	Unauthorized,
	/// The logged-in user can't manage the requested guild
	Forbidden,
	NotFound,
	Invalid(ValidationError),
	Conflict(&'static str),
	/// An external service (like a YouTube feed) couldn't be reached
	Upstream(&'static str),
	/// Details are logged, not returned
	Internal,
}

#[derive(Serialize)]
struct ErrorBody {
	error: String,
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::Forbidden => StatusCode::FORBIDDEN,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::Invalid(_) => StatusCode::BAD_REQUEST,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::Upstream(_) => StatusCode::BAD_GATEWAY,
			Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn message(&self) -> String {
		match self {
			Self::Unauthorized => String::from("Not logged in"),
			Self::Forbidden => String::from("You can't manage this server"),
			Self::NotFound => String::from("Not found"),
			Self::Invalid(error) => error.to_string(),
			Self::Conflict(message) | Self::Upstream(message) => message.to_string(),
			Self::Internal => String::from("Internal server error"),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error: self.message() };
		(self.status(), Json(body)).into_response()
	}
}

impl From<ValidationError> for ApiError {
	fn from(error: ValidationError) -> Self {
		Self::Invalid(error)
	}
}

impl From<diesel::result::Error> for ApiError {
	fn from(error: diesel::result::Error) -> Self {
		tracing::error!(source = ?error, "Database query failed during API request");
		Self::Internal
	}
}

impl From<diesel::r2d2::PoolError> for ApiError {
	fn from(error: diesel::r2d2::PoolError) -> Self {
		tracing::error!(source = ?error, "Couldn't get a database connection for API request");
		Self::Internal
	}
}

impl From<miette::Report> for ApiError {
	fn from(error: miette::Report) -> Self {
		tracing::error!(source = ?error, "API request failed");
		Self::Internal
	}
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validation_errors_are_bad_requests_with_their_message() {
		let error = ApiError::from(ValidationError::InvalidLevel(0));
		assert_eq!(error.status(), StatusCode::BAD_REQUEST);
		assert_eq!(error.message(), ValidationError::InvalidLevel(0).to_string());
	}

	#[test]
	fn internal_errors_hide_details() {
		let error = ApiError::from(diesel::result::Error::NotFound);
		assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(error.message(), "Internal server error");
	}
}
