// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod discord;
pub mod error;
pub mod guilds;
pub mod leveling;
pub mod model;
pub mod restrictions;
pub mod scheduler;
pub mod schema;
pub mod stats;
pub mod web;
