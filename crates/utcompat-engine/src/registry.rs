//! Test case descriptors and test-spec filtering.

use serde::Serialize;

use crate::assertion::SourceLineInfo;

/// Metadata of a registered test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseInfo {
    pub name: String,
    /// Description with the `[tag]` groups removed.
    pub description: String,
    pub tags: Vec<String>,
    pub line_info: SourceLineInfo,
}

impl TestCaseInfo {
    /// Build test metadata, splitting `[tag]` groups out of `description`.
    #[must_use]
    pub fn new(name: impl Into<String>, description: &str, line_info: SourceLineInfo) -> Self {
        let (description, tags) = split_tags(description);
        Self {
            name: name.into(),
            description,
            tags,
            line_info,
        }
    }

    /// Hidden tests (tag `[.]`, `[.name]` or `[hide]`) only run when a test
    /// spec names them explicitly.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.tags
            .iter()
            .any(|tag| tag.starts_with('.') || tag.eq_ignore_ascii_case("hide"))
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// A registered test case: metadata plus the body to run.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub info: TestCaseInfo,
    body: fn(),
}

impl TestCase {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: &str,
        line_info: SourceLineInfo,
        body: fn(),
    ) -> Self {
        Self {
            info: TestCaseInfo::new(name, description, line_info),
            body,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Run the test body on the calling thread.
    pub fn invoke(&self) {
        (self.body)();
    }
}

fn split_tags(raw: &str) -> (String, Vec<String>) {
    let mut description = String::new();
    let mut tags = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        description.push_str(&rest[..open]);
        let tag = rest[open + 1..open + close].trim();
        if !tag.is_empty() {
            tags.push(tag.to_string());
        }
        rest = &rest[open + close + 1..];
    }
    description.push_str(rest);

    (description.trim().to_string(), tags)
}

/// One pattern of a test spec.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    /// Name match with optional leading/trailing `*`.
    Name(String),
    /// All listed tags must be present.
    Tags(Vec<String>),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            let (_, tags) = split_tags(trimmed);
            return Self::Tags(tags);
        }
        Self::Name(trimmed.to_ascii_lowercase())
    }

    fn matches(&self, info: &TestCaseInfo) -> bool {
        match self {
            Self::Name(pattern) => wildcard_match(pattern, &info.name.to_ascii_lowercase()),
            Self::Tags(tags) => !tags.is_empty() && tags.iter().all(|tag| info.has_tag(tag)),
        }
    }
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    let (starts, rest) = match pattern.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let (ends, core) = match rest.strip_suffix('*') {
        Some(core) => (true, core),
        None => (false, rest),
    };

    match (starts, ends) {
        (true, true) => name.contains(core),
        (true, false) => name.ends_with(core),
        (false, true) => name.starts_with(core),
        (false, false) => name == core,
    }
}

/// Which tests a run selects.
///
/// Each entry is a name pattern (`*` allowed at either end), a tag pattern
/// (`[a][b]`), or either of those prefixed with `~` to exclude. A test runs
/// when it matches any inclusion (or there are none and it is not hidden) and
/// no exclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSpec {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl TestSpec {
    #[must_use]
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut spec = Self::default();
        for entry in entries {
            for part in entry.as_ref().split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                match part.strip_prefix('~') {
                    Some(negated) => spec.exclude.push(Pattern::parse(negated)),
                    None => spec.include.push(Pattern::parse(part)),
                }
            }
        }
        spec
    }

    /// Returns true if any inclusion patterns were given.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.include.is_empty()
    }

    #[must_use]
    pub fn matches(&self, info: &TestCaseInfo) -> bool {
        let included = if self.include.is_empty() {
            !info.is_hidden()
        } else {
            self.include.iter().any(|p| p.matches(info))
        };
        included && !self.exclude.iter().any(|p| p.matches(info))
    }
}
