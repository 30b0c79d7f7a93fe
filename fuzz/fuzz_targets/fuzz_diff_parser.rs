// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

#![no_main]

use libfuzzer_sys::fuzz_target;

use commitsplit::services::diff::DiffParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data)
        && let Ok(units) = DiffParser::parse(raw)
    {
        for unit in &units {
            let counted: usize = unit.hunks.iter().map(|h| h.added + h.removed).sum();
            assert_eq!(counted, unit.changed_lines());
        }
    }
});
