/// Normalized form of a log line: trimmed and case-folded.
pub fn normalize_log_line(line: &str) -> String {
    line.trim().to_lowercase()
}

/// Case-insensitive substring patterns matched against log lines.
///
/// Used for boot banners (`boot:`, `esp-rom`) and crash banners
/// (`guru meditation`, `rebooting`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    patterns: Vec<String>,
}

impl SignatureSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| normalize_log_line(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }

    pub fn matches_any<S: AsRef<str>>(&self, lines: &[S]) -> bool {
        lines.iter().any(|l| self.matches(l.as_ref()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
