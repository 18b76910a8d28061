// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::{DbConnection, DbPool};
use crate::model::Session;
use crate::schema::sessions;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{SessionStore, session_store};

/// Keeps dashboard sessions in the `sessions` table.
#[derive(Clone, Debug)]
pub struct DatabaseStore {
	db_connection_pool: DbPool,
}

impl DatabaseStore {
	pub fn new(db_connection_pool: DbPool) -> Self {
		Self { db_connection_pool }
	}

	fn connection(&self) -> session_store::Result<DbConnection> {
		self.db_connection_pool
			.get()
			.map_err(|error| session_store::Error::Backend(format!("Couldn't get database connection: {}", error)))
	}
}

fn session_row(record: &Record) -> session_store::Result<Session> {
	let data = serde_json::to_string(&record.data).map_err(|error| session_store::Error::Encode(format!("{:?}", error)))?;
	let expires = expiry_to_chrono(record.expiry_date)?;
	Ok(Session {
		session_id: BigDecimal::from(record.id.0),
		data,
		expires,
	})
}

fn expiry_to_chrono(expiry_date: OffsetDateTime) -> session_store::Result<DateTime<Utc>> {
	let nanos = i64::try_from(expiry_date.unix_timestamp_nanos())
		.map_err(|error| session_store::Error::Backend(format!("Timestamp out of bounds: {}", error)))?;
	Ok(DateTime::from_timestamp_nanos(nanos))
}

fn expiry_from_chrono(expires: DateTime<Utc>) -> session_store::Result<OffsetDateTime> {
	let Some(nanos) = expires.timestamp_nanos_opt() else {
		return Err(session_store::Error::Backend(String::from(
			"Out of range expiration timestamp",
		)));
	};
	OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
		.map_err(|error| session_store::Error::Backend(format!("Timestamp conversion error: {}", error)))
}

#[async_trait]
impl SessionStore for DatabaseStore {
	async fn create(&self, record: &mut Record) -> session_store::Result<()> {
		let mut db_connection = self.connection()?;
		loop {
			let row = session_row(record)?;
			let inserted = diesel::insert_into(sessions::table)
				.values(row)
				.on_conflict_do_nothing()
				.execute(&mut db_connection)
				.map_err(|error| session_store::Error::Backend(format!("Failed to create new session: {}", error)))?;
			if inserted > 0 {
				return Ok(());
			}
			record.id = Id::default();
		}
	}

	async fn save(&self, record: &Record) -> session_store::Result<()> {
		let mut db_connection = self.connection()?;
		let row = session_row(record)?;
		diesel::insert_into(sessions::table)
			.values(&row)
			.on_conflict(sessions::session_id)
			.do_update()
			.set((sessions::data.eq(&row.data), sessions::expires.eq(row.expires)))
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to update session: {}", error)))?;
		Ok(())
	}

	async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
		let mut db_connection = self.connection()?;

		diesel::delete(sessions::table)
			.filter(sessions::expires.le(Utc::now()))
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to expire old sessions: {}", error)))?;

		let session: Option<Session> = sessions::table
			.find(BigDecimal::from(session_id.0))
			.first(&mut db_connection)
			.optional()
			.map_err(|error| {
				session_store::Error::Backend(format!("Couldn't retrieve session from database: {}", error))
			})?;
		let Some(session) = session else {
			return Ok(None);
		};

		let data =
			serde_json::from_str(&session.data).map_err(|error| session_store::Error::Decode(format!("{:?}", error)))?;
		Ok(Some(Record {
			id: *session_id,
			data,
			expiry_date: expiry_from_chrono(session.expires)?,
		}))
	}

	async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
		let mut db_connection = self.connection()?;
		diesel::delete(sessions::table)
			.filter(sessions::session_id.eq(BigDecimal::from(session_id.0)))
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to delete session: {}", error)))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expiry_survives_conversion() {
		let expiry = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
		let converted = expiry_to_chrono(expiry).unwrap();
		assert_eq!(converted.timestamp(), 1_700_000_000);
		assert_eq!(expiry_from_chrono(converted).unwrap(), expiry);
	}
}
