//! The problem ledger. Everything that goes wrong short of a fatal error is
//! accumulated here for the lifetime of the process and reported at
//! shutdown; the exit code is derived from whether it is empty.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    NotFound,
    HttpError,
    XmlParseError,
    DigestMismatch,
    SignatureInvalid,
    SignatureKeyMissing,
    UnresolvedProperty,
    LicenseRejected,
    VersionRangeUnsupported,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::NotFound => "not_found",
            ProblemKind::HttpError => "http_error",
            ProblemKind::XmlParseError => "xml_parse_error",
            ProblemKind::DigestMismatch => "digest_mismatch",
            ProblemKind::SignatureInvalid => "signature_invalid",
            ProblemKind::SignatureKeyMissing => "signature_key_missing",
            ProblemKind::UnresolvedProperty => "unresolved_property",
            ProblemKind::LicenseRejected => "license_rejected",
            ProblemKind::VersionRangeUnsupported => "version_range_unsupported",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub coordinate: Option<String>,
    pub url: Option<String>,
    pub message: String,
    pub recoverable: bool,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.recoverable {
            write!(f, "VIOLATION ")?;
        }
        let subject = self
            .coordinate
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("-");
        write!(f, "{} [{}] - {}", subject, self.kind.as_str(), self.message)
    }
}

pub struct ProblemLedger {
    entries: Mutex<Vec<Problem>>,
}

impl ProblemLedger {
    pub fn new() -> ProblemLedger {
        ProblemLedger {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append a problem. Returns false when a problem with the same
    /// (kind, coordinate, url) triple was already recorded.
    pub fn record(&self, problem: Problem) -> bool {
        let mut entries = match self.entries.lock() {
            Ok(e) => e,
            Err(poisoned) => poisoned.into_inner(),
        };
        let duplicate = entries.iter().any(|p| {
            p.kind == problem.kind
                && p.coordinate == problem.coordinate
                && p.url == problem.url
        });
        if duplicate {
            return false;
        }
        entries.push(problem);
        true
    }

    pub fn is_empty(&self) -> bool {
        match self.entries.lock() {
            Ok(e) => e.is_empty(),
            Err(poisoned) => poisoned.into_inner().is_empty(),
        }
    }

    pub fn snapshot(&self) -> Vec<Problem> {
        match self.entries.lock() {
            Ok(e) => e.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Append the ledger to the report file: a JSON array for `.json` paths,
    /// one problem per line otherwise.
    pub fn write_report(&self, path: &Path) -> anyhow::Result<()> {
        use std::io::Write;

        let problems = self.snapshot();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open problem file {}", path.display()))?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            let json = serde_json::to_string_pretty(&problems)?;
            writeln!(file, "{}", json)?;
        } else {
            for problem in &problems {
                writeln!(file, "{}", problem)?;
            }
        }
        Ok(())
    }
}

impl Default for ProblemLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(kind: ProblemKind, coordinate: &str) -> Problem {
        Problem {
            kind,
            coordinate: Some(coordinate.to_string()),
            url: None,
            message: "something happened".to_string(),
            recoverable: true,
        }
    }

    #[test]
    fn test_record_deduplicates_triples() {
        let ledger = ProblemLedger::new();
        assert!(ledger.record(sample(ProblemKind::NotFound, "a:b:1")));
        assert!(!ledger.record(sample(ProblemKind::NotFound, "a:b:1")));
        assert!(ledger.record(sample(ProblemKind::NotFound, "a:b:2")));
        assert!(ledger.record(sample(ProblemKind::DigestMismatch, "a:b:1")));
        assert_eq!(ledger.snapshot().len(), 3);
    }

    #[test]
    fn test_empty_until_recorded() {
        let ledger = ProblemLedger::new();
        assert!(ledger.is_empty());
        ledger.record(sample(ProblemKind::HttpError, "a:b:1"));
        assert!(!ledger.is_empty());
    }

    #[test]
    fn test_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("problems.json");
        let ledger = ProblemLedger::new();
        ledger.record(sample(ProblemKind::LicenseRejected, "a:b:1"));
        ledger.write_report(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("license_rejected"));
        assert!(text.contains("a:b:1"));
    }

    #[test]
    fn test_text_report_marks_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("problems.txt");
        let ledger = ProblemLedger::new();
        let mut problem = sample(ProblemKind::DigestMismatch, "a:b:1");
        problem.recoverable = false;
        ledger.record(problem);
        ledger.write_report(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("VIOLATION a:b:1"));
    }
}
