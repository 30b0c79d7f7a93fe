// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

mod attempt;
mod change;
mod commit;
mod context;
mod partition;

pub use attempt::*;
pub use change::*;
pub use commit::*;
pub use context::*;
pub use partition::*;
