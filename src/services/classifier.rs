// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::{Category, Classification, Confidence, DiffUnit};
use crate::error::{Error, Result};

/// One entry of the ordered rule list: any glob match assigns the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub category: Category,
    pub globs: Vec<String>,
}

/// Built-in rules, evaluated top to bottom after any user rules.
const DEFAULT_RULES: &[(Category, &[&str])] = &[
    (
        Category::Test,
        &[
            "tests/**",
            "**/tests/**",
            "test/**",
            "**/test/**",
            "spec/**",
            "**/__tests__/**",
            "**/*_test.*",
            "**/*.test.*",
            "**/*_spec.*",
            "**/*.spec.*",
            "**/test_*",
            "**/*Test.java",
            "**/*Test.kt",
            "**/*Tests.cs",
        ],
    ),
    (
        Category::Build,
        &[
            "**/Cargo.toml",
            "**/Cargo.lock",
            "**/build.rs",
            "**/package.json",
            "**/package-lock.json",
            "**/yarn.lock",
            "**/pnpm-lock.yaml",
            "**/bun.lockb",
            "**/requirements*.txt",
            "**/setup.py",
            "**/setup.cfg",
            "**/pyproject.toml",
            "**/poetry.lock",
            "**/go.mod",
            "**/go.sum",
            "**/pom.xml",
            "**/build.gradle*",
            "**/settings.gradle*",
            "**/Gemfile",
            "**/Gemfile.lock",
            "**/Makefile",
            "**/CMakeLists.txt",
            "**/justfile",
            "**/Dockerfile*",
            "**/docker-compose*.yml",
            "**/docker-compose*.yaml",
            "**/.dockerignore",
        ],
    ),
    (
        Category::Ci,
        &[
            ".github/workflows/**",
            ".github/actions/**",
            ".gitlab-ci.yml",
            ".gitlab-ci/**",
            ".circleci/**",
            ".travis.yml",
            ".buildkite/**",
            "azure-pipelines.yml",
            "bitbucket-pipelines.yml",
            "**/Jenkinsfile",
        ],
    ),
    (
        Category::Docs,
        &[
            "docs/**",
            "doc/**",
            "**/*.md",
            "**/*.mdx",
            "**/*.rst",
            "**/*.adoc",
            "**/*.txt",
            "**/README*",
            "**/CHANGELOG*",
            "**/LICENSE*",
            "**/CONTRIBUTING*",
        ],
    ),
    (
        Category::Config,
        &[
            "**/*.json",
            "**/*.yaml",
            "**/*.yml",
            "**/*.toml",
            "**/*.ini",
            "**/*.cfg",
            "**/*.conf",
            "**/.env*",
            "**/.gitignore",
            "**/.gitattributes",
            "**/.editorconfig",
            "**/.prettierrc*",
            "**/.eslintrc*",
        ],
    ),
    (
        Category::Other,
        &[
            "**/*.png", "**/*.jpg", "**/*.jpeg", "**/*.gif", "**/*.ico", "**/*.svg", "**/*.webp",
            "**/*.woff", "**/*.woff2", "**/*.ttf", "**/*.otf", "**/*.pdf", "**/*.zip",
            "**/*.tar", "**/*.gz",
        ],
    ),
    (
        Category::Source,
        &[
            "**/*.rs", "**/*.py", "**/*.js", "**/*.mjs", "**/*.ts", "**/*.jsx", "**/*.tsx",
            "**/*.vue", "**/*.java", "**/*.kt", "**/*.scala", "**/*.go", "**/*.c", "**/*.h",
            "**/*.cc", "**/*.cpp", "**/*.hpp", "**/*.cs", "**/*.rb", "**/*.php", "**/*.swift",
            "**/*.ex", "**/*.exs", "**/*.erl", "**/*.hs", "**/*.clj", "**/*.sh", "**/*.sql",
            "**/*.html", "**/*.css", "**/*.scss",
        ],
    ),
];

pub fn default_rules() -> Vec<ClassifierRule> {
    DEFAULT_RULES
        .iter()
        .map(|(category, globs)| ClassifierRule {
            category: *category,
            globs: globs.iter().map(|g| g.to_string()).collect(),
        })
        .collect()
}

/// Ordered, first-match-wins path classifier with a comment-only content fallback.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<(Category, GlobSet)>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&[]).expect("built-in classifier globs are valid")
    }
}

impl Classifier {
    /// Compile `extra` rules ahead of the built-in list.
    pub fn new(extra: &[ClassifierRule]) -> Result<Self> {
        let mut rules = Vec::with_capacity(extra.len() + DEFAULT_RULES.len());
        for rule in extra.iter().cloned().chain(default_rules()) {
            rules.push((rule.category, Self::compile(&rule.globs)?));
        }
        Ok(Self { rules })
    }

    fn compile(globs: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in globs {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(!has_camel_case_suffix(pattern))
                .build()
                .map_err(|e| Error::Config(format!("invalid classifier glob '{pattern}': {e}")))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build classifier rules: {e}")))
    }

    /// Category from the first matching path rule, if any.
    pub fn classify_path(&self, path: &std::path::Path) -> Option<Category> {
        self.rules
            .iter()
            .find(|(_, set)| set.is_match(path))
            .map(|(category, _)| *category)
    }

    pub fn classify(&self, unit: &DiffUnit) -> Classification {
        let (path_category, confidence) = match self.classify_path(&unit.path) {
            Some(category) => (category, Confidence::High),
            None => (Category::Source, Confidence::Low),
        };

        if unit.is_binary || matches!(path_category, Category::Docs | Category::Other) {
            return Classification {
                category: path_category,
                confidence,
            };
        }

        let (comment_lines, code_lines) = comment_weights(unit);
        let category = Category::dominant([
            (path_category, code_lines),
            (Category::Docs, comment_lines),
        ])
        .unwrap_or(path_category);

        if category == path_category {
            Classification {
                category,
                confidence,
            }
        } else {
            Classification {
                category,
                confidence: Confidence::Low,
            }
        }
    }
}

/// `*Test.java` style patterns: a wildcard directly followed by an uppercase
/// letter only matches that exact casing, so `Latest.java` stays source.
fn has_camel_case_suffix(pattern: &str) -> bool {
    pattern
        .as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'*' && pair[1].is_ascii_uppercase())
}

/// Count changed lines that are comments vs. code; blank lines count as neither.
fn comment_weights(unit: &DiffUnit) -> (usize, usize) {
    let mut comments = 0;
    let mut code = 0;

    for line in unit.hunks.iter().flat_map(|h| h.changes()) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_comment(trimmed) {
            comments += 1;
        } else {
            code += 1;
        }
    }

    (comments, code)
}

fn is_comment(line: &str) -> bool {
    const PREFIXES: &[&str] = &["//", "/*", "*/", "* ", "<!--", "\"\"\"", "'''", "-- ", ";;"];

    if line == "*" || PREFIXES.iter().any(|p| line.starts_with(p)) {
        return true;
    }

    // `#` comments, but not attributes, shebangs or preprocessor directives.
    match line.strip_prefix('#') {
        Some(rest) => !rest.starts_with(['[', '!']) && !is_directive(rest),
        None => false,
    }
}

fn is_directive(rest: &str) -> bool {
    const DIRECTIVES: &[&str] = &[
        "include", "define", "undef", "ifdef", "ifndef", "if", "elif", "else", "endif",
        "pragma", "error", "warning", "line", "import", "region", "endregion",
    ];

    let word = rest
        .trim_start()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default();
    DIRECTIVES.contains(&word)
}
