// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod content;
pub mod enforce;
mod evaluate;
pub mod store;

pub use content::{ContentClassifier, ContentTypeFlags, MessageContent};
pub use evaluate::{BlockCause, Decision, RestrictionMasks, evaluate, redirect_notice};
