// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

pub mod approval;
pub mod classifier;
pub mod context;
pub mod diff;
pub mod formatter;
pub mod generator;
pub mod git;
pub mod llm;
pub mod sanitizer;
pub mod splitter;
