//! Inline suppression directives.
//!
//! Supported forms, in `#`, `//` or `/* */` comments:
//! - `smellcheck:ignore <rule|*> - reason` on the offending line, or alone
//!   on the line above it
//! - `smellcheck:ignore-next-line <rule|*>`
//! - `smellcheck:ignore-file <rule|*>` in the file header
//!
//! Comment markers inside string literals on the same line are not
//! directives.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Finding, SuppressedFinding};

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:#|//|/\*)\s*smellcheck:(ignore-file|ignore-next-line|ignore)\s+([A-Za-z_*]+)(?:\s+-\s*(.*?))?\s*(?:\*/\s*)?$",
    )
    .expect("suppression directive pattern is valid")
});

/// File-level directives are only honoured this far into a file, or
/// anywhere in the leading comment block.
const FILE_HEADER_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionScope {
    Line,
    NextLine,
    File,
}

/// A parsed suppression comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    /// Rule id or `*`.
    pub rule: String,
    pub reason: Option<String>,
    /// 1-based line of the comment.
    pub line: usize,
    pub scope: SuppressionScope,
}

impl Suppression {
    pub fn matches(&self, finding: &Finding) -> bool {
        if self.rule != "*" && self.rule != finding.rule.as_str() {
            return false;
        }
        match self.scope {
            SuppressionScope::File => true,
            SuppressionScope::Line => finding.line() == self.line,
            SuppressionScope::NextLine => finding.line() == self.line + 1,
        }
    }
}

/// Extract every suppression directive from `source`.
pub fn parse_suppressions(source: &str) -> Vec<Suppression> {
    let mut out = Vec::new();
    let mut in_header = true;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if in_header && !is_comment_or_blank(trimmed) {
            in_header = false;
        }

        let found = comment_markers(line)
            .into_iter()
            .find_map(|at| DIRECTIVE.captures(&line[at..]).map(|caps| (at, caps)));
        let Some((start, caps)) = found else {
            continue;
        };
        let (Some(kind), Some(rule)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let reason = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .filter(|r| !r.is_empty());

        let scope = match kind.as_str() {
            "ignore-file" => {
                if !in_header && line_no > FILE_HEADER_LINES {
                    tracing::debug!(line = line_no, "ignoring file directive outside header");
                    continue;
                }
                SuppressionScope::File
            }
            "ignore-next-line" => SuppressionScope::NextLine,
            // A bare directive on its own line covers the line below
            _ if line[..start].trim().is_empty() => SuppressionScope::NextLine,
            _ => SuppressionScope::Line,
        };

        out.push(Suppression {
            rule: rule.as_str().to_string(),
            reason,
            line: line_no,
            scope,
        });
    }

    out
}

/// Byte offsets of `#`, `//` and `/*` outside string literals.
fn comment_markers(line: &str) -> Vec<usize> {
    let bytes = line.as_bytes();
    let mut markers = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'#' => markers.push(i),
                b'/' if matches!(bytes.get(i + 1), Some(b'/' | b'*')) => {
                    markers.push(i);
                    i += 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    markers
}

fn is_comment_or_blank(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("//")
        || line.starts_with("/*")
        || line.starts_with('*')
}

/// Split `findings` into those still active and those suppressed.
pub fn apply_suppressions(
    findings: Vec<Finding>,
    suppressions: &[Suppression],
) -> (Vec<Finding>, Vec<SuppressedFinding>) {
    if suppressions.is_empty() {
        return (findings, Vec::new());
    }

    let mut active = Vec::with_capacity(findings.len());
    let mut suppressed = Vec::new();

    for finding in findings {
        match suppressions.iter().find(|s| s.matches(&finding)) {
            Some(s) => suppressed.push(SuppressedFinding {
                finding,
                suppression_line: s.line,
                reason: s.reason.clone(),
            }),
            None => active.push(finding),
        }
    }

    (active, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{RuleId, Severity};
    use crate::tree::Span;

    fn finding_at(rule: RuleId, line: usize) -> Finding {
        let span = Span {
            start_line: line,
            end_line: line,
            start_col: 1,
            end_col: 5,
            ..Span::default()
        };
        Finding::new(rule, Severity::Warning, "a.py", span, "m")
    }

    #[test]
    fn test_pattern_compiles() {
        assert!(DIRECTIVE.is_match("# smellcheck:ignore *"));
    }

    #[test]
    fn test_same_line_directive() {
        let source = "x = 1\nkey = \"abc\"  # smellcheck:ignore hardcoded_secret - test fixture\n";
        let sups = parse_suppressions(source);
        assert_eq!(sups.len(), 1);
        assert_eq!(sups[0].scope, SuppressionScope::Line);
        assert_eq!(sups[0].line, 2);
        assert_eq!(sups[0].rule, "hardcoded_secret");
        assert_eq!(sups[0].reason.as_deref(), Some("test fixture"));
    }

    #[test]
    fn test_standalone_directive_covers_next_line() {
        let source = "def f():\n    // smellcheck:ignore *\n    return 1\n";
        let sups = parse_suppressions(source);
        assert_eq!(sups[0].scope, SuppressionScope::NextLine);
        assert!(sups[0].reason.is_none());

        let explicit = parse_suppressions("/* smellcheck:ignore-next-line magic_literal */\n");
        assert_eq!(explicit[0].scope, SuppressionScope::NextLine);
        assert_eq!(explicit[0].rule, "magic_literal");
    }

    #[test]
    fn test_file_directive_only_in_header() {
        let header = "#!/usr/bin/env python\n# smellcheck:ignore-file unused_binding\nimport os\n";
        assert_eq!(parse_suppressions(header)[0].scope, SuppressionScope::File);

        let mut late = "x = 1\n".repeat(12);
        late.push_str("# smellcheck:ignore-file unused_binding\n");
        assert!(parse_suppressions(&late).is_empty());
    }

    #[test]
    fn test_apply_splits_findings() {
        let sups = parse_suppressions("# smellcheck:ignore complexity - legacy\nx\ny\n");
        let findings = vec![
            finding_at(RuleId::Complexity, 2),
            finding_at(RuleId::Complexity, 3),
            finding_at(RuleId::MagicLiteral, 2),
        ];
        let (active, suppressed) = apply_suppressions(findings, &sups);
        assert_eq!(active.len(), 2);
        assert_eq!(suppressed.len(), 1);
        assert_eq!(suppressed[0].finding.line(), 2);
        assert_eq!(suppressed[0].suppression_line, 1);
        assert_eq!(suppressed[0].reason.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_plain_text_is_not_a_directive() {
        assert!(parse_suppressions("print('smellcheck:ignore all')\n").is_empty());
    }

    #[test]
    fn test_directive_inside_string_is_ignored() {
        assert!(parse_suppressions("msg = \"# smellcheck:ignore *\"\n").is_empty());
        assert!(parse_suppressions("const s = '// smellcheck:ignore unsafe_sink';\n").is_empty());
        assert!(parse_suppressions("doc = \"\"\"# smellcheck:ignore *\"\"\"\n").is_empty());

        let sups = parse_suppressions(
            "q = 'a # smellcheck:ignore *'  # smellcheck:ignore magic_literal - real one\n",
        );
        assert_eq!(sups.len(), 1);
        assert_eq!(sups[0].rule, "magic_literal");
        assert_eq!(sups[0].scope, SuppressionScope::Line);
        assert_eq!(sups[0].reason.as_deref(), Some("real one"));
    }

    #[test]
    fn test_floor_division_before_directive() {
        let sups = parse_suppressions("half = total // 2  # smellcheck:ignore magic_literal\n");
        assert_eq!(sups.len(), 1);
        assert_eq!(sups[0].rule, "magic_literal");
        assert_eq!(sups[0].scope, SuppressionScope::Line);
    }
}
