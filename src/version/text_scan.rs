//! Static version extraction from module source text
//!
//! Finds the first version-assignment line and evaluates only that line with
//! the restricted evaluator. Supported forms:
//! - `our $VERSION = '1.23';`
//! - `$Foo::Bar::VERSION = "1.23";`
//! - `use vars qw($VERSION); $VERSION = 1.23;`
//! - `package Foo::Bar 1.23;`
//!
//! POD blocks and comment lines are ignored, and scanning stops at
//! `__END__` / `__DATA__`.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::VERSION_VARIABLE;
use crate::version::expr::evaluate;
use crate::version::outcome::VersionOutcome;

/// A version declaration found in module source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionLine {
    /// Right-hand side of a `$VERSION = ...` assignment, still to be evaluated
    Assignment { line: usize, expr: String },
    /// Literal from a `package NAME VERSION` declaration
    Package { line: usize, version: String },
}

/// Scanner for version lines in module source
pub struct TextScanner {
    /// Match: [our|my|local] [(] $[Pkg::]VERSION [)] = expr
    assignment_re: Regex,
    /// Match: package Foo::Bar 1.23; / package Foo::Bar v1.2.3 {
    package_re: Regex,
}

impl TextScanner {
    pub fn new() -> Self {
        Self {
            assignment_re: Regex::new(&format!(
                r"[$*](?:[\w']*(?:::|'))*{VERSION_VARIABLE}\b\s*\)?\s*=\s*(?P<expr>[^=~\s].*)$"
            ))
            .unwrap(),
            package_re: Regex::new(
                r"^\s*package\s+[\w:']+\s+(?P<version>v?\d[\d._]*)\s*[;{]",
            )
            .unwrap(),
        }
    }

    /// Find the first version declaration in `content`
    pub fn find_version_line(&self, content: &str) -> Option<VersionLine> {
        let mut in_pod = false;

        for (line_num, line) in content.lines().enumerate() {
            if in_pod {
                in_pod = !line.starts_with("=cut");
                continue;
            }
            if line.starts_with('=') && line[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                in_pod = !line.starts_with("=cut");
                continue;
            }

            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with("__END__") || trimmed.starts_with("__DATA__") {
                break;
            }

            if let Some(caps) = self.package_re.captures(line) {
                return Some(VersionLine::Package {
                    line: line_num,
                    version: caps["version"].to_string(),
                });
            }
            if let Some(caps) = self.assignment_re.captures(line) {
                return Some(VersionLine::Assignment {
                    line: line_num,
                    expr: caps["expr"].to_string(),
                });
            }
        }

        None
    }

    /// Extract the version value from module source text
    ///
    /// Returns `None` when the source has no version line or the line cannot
    /// be evaluated by the restricted grammar.
    pub fn extract(&self, content: &str) -> Option<String> {
        let value = match self.find_version_line(content)? {
            VersionLine::Package { version, .. } => version,
            VersionLine::Assignment { line, expr } => match evaluate(&expr) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Cannot evaluate version line {}: {} ({})", line + 1, expr, e);
                    return None;
                }
            },
        };
        strip_annotation(&value)
    }

    /// Resolve the version of the module stored at `file`
    pub async fn scan_file(&self, file: &Path) -> VersionOutcome {
        match tokio::fs::read(file).await {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                VersionOutcome::loaded(self.extract(&content))
            }
            Err(e) => {
                debug!("Failed to read {}: {}", file.display(), e);
                VersionOutcome::failed()
            }
        }
    }
}

impl Default for TextScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop anything after the version token, e.g. `1.23 (Foo::Bar)` -> `1.23`
fn strip_annotation(value: &str) -> Option<String> {
    value.split_whitespace().next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("our $VERSION = '1.23';", Some("1.23"))]
    #[case("$VERSION = \"2.0\";", Some("2.0"))]
    #[case("  our $VERSION='0.01';", Some("0.01"))]
    #[case("$Foo::Bar::VERSION = '3.4';", Some("3.4"))]
    #[case("use vars qw($VERSION); $VERSION = 1.10;", Some("1.1"))]
    #[case("our ($VERSION) = '5.6';", Some("5.6"))]
    #[case("local $VERSION = q(7);", Some("7"))]
    #[case("package Foo::Bar 1.23;", Some("1.23"))]
    #[case("package Foo::Bar v1.2.3 {", Some("v1.2.3"))]
    #[case("our $VERSION = '1.23 (Foo::Bar)';", Some("1.23"))]
    #[case("our $VERSION = '';", None)]
    #[case("our $VERSION = $Other::VERSION;", None)]
    #[case("our $VERSION = compute();", None)]
    fn extract_evaluates_the_version_line(#[case] line: &str, #[case] expected: Option<&str>) {
        let scanner = TextScanner::new();
        let content = format!("package Foo;\nuse strict;\n{line}\n1;\n");

        assert_eq!(scanner.extract(&content).as_deref(), expected);
    }

    #[test]
    fn extract_uses_only_the_first_matching_line() {
        let scanner = TextScanner::new();
        let content = "package Foo;\nour $VERSION = '1.02_01';\n$VERSION = eval $VERSION;\n1;\n";

        assert_eq!(scanner.extract(content), Some("1.02_01".to_string()));
    }

    #[rstest]
    #[case("if ($VERSION == 2) { warn }")]
    #[case("$VERSION =~ s/_//;")]
    #[case("my $VERSION_STRING = '1.0';")]
    #[case("print \"VERSION\\n\";")]
    fn find_version_line_ignores_non_assignments(#[case] line: &str) {
        let scanner = TextScanner::new();
        assert_eq!(scanner.find_version_line(line), None);
    }

    #[test]
    fn find_version_line_skips_pod_and_comments() {
        let scanner = TextScanner::new();
        let content = "\
package Foo;
# our $VERSION = '0.1';

=head1 SYNOPSIS

  our $VERSION = '0.2';

=cut

our $VERSION = '0.3';
";

        assert_eq!(
            scanner.find_version_line(content),
            Some(VersionLine::Assignment {
                line: 9,
                expr: "'0.3';".to_string()
            })
        );
    }

    #[test]
    fn find_version_line_stops_at_end_marker() {
        let scanner = TextScanner::new();
        let content = "package Foo;\n1;\n__END__\nour $VERSION = '9.9';\n";

        assert_eq!(scanner.find_version_line(content), None);
    }

    #[tokio::test]
    async fn scan_file_reports_unknown_without_version_line() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("Foo.pm");
        std::fs::write(&file, "package Foo;\n1;\n").unwrap();

        let outcome = TextScanner::new().scan_file(&file).await;

        assert_eq!(outcome, VersionOutcome::loaded(None));
    }

    #[tokio::test]
    async fn scan_file_fails_for_unreadable_file() {
        let temp_dir = TempDir::new().unwrap();

        let outcome = TextScanner::new()
            .scan_file(&temp_dir.path().join("Missing.pm"))
            .await;

        assert_eq!(outcome, VersionOutcome::failed());
    }
}
