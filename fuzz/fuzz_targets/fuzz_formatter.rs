// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

#![no_main]

use libfuzzer_sys::fuzz_target;

use commitsplit::services::formatter::Formatter;

// Anything the formatter accepts must render back to text it accepts again.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let formatter = Formatter::default();
        if let Ok(message) = formatter.validate(text) {
            let rendered = Formatter::render(&message);
            assert!(formatter.validate(&rendered).is_ok());
        }
    }
});
