// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use crate::services::formatter::Violation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Valid,
    Malformed(Vec<Violation>),
    TransportFailure(String),
}

/// One round trip to the text generator for a partition.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub number: u32,
    pub prompt: String,
    pub raw_response: Option<String>,
    pub outcome: AttemptOutcome,
}

impl GenerationAttempt {
    pub fn is_valid(&self) -> bool {
        self.outcome == AttemptOutcome::Valid
    }
}
