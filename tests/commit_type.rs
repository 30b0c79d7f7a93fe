// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use commitsplit::domain::{Category, CommitType};

#[test]
fn every_listed_type_parses_back() {
    assert_eq!(CommitType::ALL.len(), 11);
    for name in CommitType::ALL {
        let parsed = CommitType::parse(name).unwrap_or_else(|| panic!("{name} does not parse"));
        assert_eq!(parsed.as_str(), *name);
        assert_eq!(parsed.to_string(), *name);
        assert!(!parsed.description().is_empty());
    }
}

#[test]
fn parsing_is_exact() {
    for invalid in ["yolo", "", "FEAT", "Fix", " feat", "feature"] {
        assert_eq!(CommitType::parse(invalid), None, "{invalid:?} should not parse");
    }
}

#[test]
fn category_commit_order() {
    assert_eq!(
        Category::ORDER,
        [
            Category::Build,
            Category::Ci,
            Category::Config,
            Category::Source,
            Category::Test,
            Category::Docs,
            Category::Other,
        ]
    );
    assert!(Category::Build.priority() < Category::Source.priority());
}

#[test]
fn dominant_category_by_line_weight() {
    assert_eq!(
        Category::dominant([(Category::Docs, 30), (Category::Source, 10), (Category::Docs, 5)]),
        Some(Category::Docs)
    );
    assert_eq!(Category::dominant(Vec::<(Category, usize)>::new()), None);
}

#[test]
fn dominant_category_ties_prefer_source() {
    assert_eq!(
        Category::dominant([(Category::Test, 20), (Category::Source, 20)]),
        Some(Category::Source)
    );
    assert_eq!(
        Category::dominant([(Category::Docs, 20), (Category::Config, 20)]),
        Some(Category::Config)
    );
}
