//! Include/exclude filtering of dependency names

use regex::{Regex, RegexBuilder};

/// A name pattern: `/regex/` (optionally `/regex/i`) or a glob using `*`
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = pattern.trim();

        let regex = if let Some(body) = pattern.strip_prefix('/')
            && let Some(end) = body.rfind('/')
        {
            let flags = &body[end + 1..];
            RegexBuilder::new(&body[..end])
                .case_insensitive(flags.contains('i'))
                .build()?
        } else {
            let escaped = pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            Regex::new(&format!("^{escaped}$"))?
        };

        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Decides which dependencies are eligible for an update
#[derive(Debug, Clone, Default)]
pub struct DependencyFilter {
    include: Vec<NamePattern>,
    exclude: Vec<NamePattern>,
}

impl DependencyFilter {
    pub fn new(include: Vec<NamePattern>, exclude: Vec<NamePattern>) -> Self {
        Self { include, exclude }
    }

    /// Compile include/exclude pattern lists
    pub fn compile(include: &[String], exclude: &[String]) -> Result<Self, regex::Error> {
        let compile_all = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| NamePattern::compile(p))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Self::new(compile_all(include)?, compile_all(exclude)?))
    }

    /// An empty include list admits every name
    pub fn should_update(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(name));
        included && !self.exclude.iter().any(|p| p.matches(name))
    }
}
