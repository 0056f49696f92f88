//! License policy. Declared licenses are matched against the configured
//! whitelists before an artifact's files may be persisted; the POM itself is
//! always kept so the dependency graph can still be walked.

use crate::config::Configuration;
use crate::maven::pom::License;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseDecision {
    Accepted,
    /// Allowed through a permissive gate; worth a recoverable problem entry.
    Tolerated { message: String },
    /// Files must not be persisted.
    Rejected { message: String },
}

pub fn evaluate(licenses: &[License], config: &Configuration) -> LicenseDecision {
    if licenses.is_empty() {
        if config.allow_no_license && !config.require_license {
            return LicenseDecision::Tolerated {
                message: "No license declared.".to_string(),
            };
        }
        return LicenseDecision::Rejected {
            message: "No license declared in violation of license restriction.".to_string(),
        };
    }

    let mut unacceptable: Vec<String> = Vec::new();
    let mut acceptable = false;
    for license in licenses {
        let url_ok = !license.url.is_empty()
            && config
                .acceptable_license_urls
                .iter()
                .any(|allowed| url_matches(&license.url, allowed));
        let name_ok = !url_ok
            && !license.name.is_empty()
            && config
                .acceptable_license_names
                .iter()
                .any(|allowed| name_matches(&license.name, allowed));
        if url_ok || name_ok {
            acceptable = true;
        } else {
            unacceptable.push(format!("{} ({})", license.name, license.url));
        }
    }

    if acceptable {
        return LicenseDecision::Accepted;
    }
    let detail = format!("Not an acceptable license ({})", unacceptable.join(", "));
    if config.allow_unacceptable_licenses {
        LicenseDecision::Tolerated { message: detail }
    } else {
        LicenseDecision::Rejected {
            message: format!("{} in violation of license restriction", detail),
        }
    }
}

fn url_matches(declared: &str, allowed: &str) -> bool {
    declared.to_lowercase() == allowed.to_lowercase()
}

/// Names match loosely: whitespace runs collapse, case is ignored, and the
/// declared name only has to contain the whitelisted one.
fn name_matches(declared: &str, allowed: &str) -> bool {
    normalise(declared).contains(&normalise(allowed))
}

fn normalise(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Configuration;

    fn license(name: &str, url: &str) -> License {
        License {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_url_match_accepts() {
        let config = Configuration::default();
        let decision = evaluate(
            &[license("", "https://www.apache.org/licenses/LICENSE-2.0.txt")],
            &config,
        );
        assert_eq!(decision, LicenseDecision::Accepted);
    }

    #[test]
    fn test_url_match_is_case_insensitive() {
        let config = Configuration::default();
        let decision = evaluate(
            &[license("", "https://www.apache.org/licenses/LICENSE-2.0.TXT")],
            &config,
        );
        assert_eq!(decision, LicenseDecision::Accepted);
    }

    #[test]
    fn test_name_match_accepts_superstring() {
        let config = Configuration::default();
        let decision = evaluate(
            &[license("The Apache License, Version 2.0  (2004)", "")],
            &config,
        );
        assert_eq!(decision, LicenseDecision::Accepted);
    }

    #[test]
    fn test_unknown_license_tolerated_by_default() {
        let config = Configuration::default();
        let decision = evaluate(&[license("Proprietary", "https://example.com/eula")], &config);
        assert!(matches!(decision, LicenseDecision::Tolerated { .. }));
    }

    #[test]
    fn test_unknown_license_rejected_when_strict() {
        let config = Configuration {
            allow_unacceptable_licenses: false,
            ..Configuration::default()
        };
        let decision = evaluate(&[license("Proprietary", "https://example.com/eula")], &config);
        assert!(matches!(decision, LicenseDecision::Rejected { .. }));
    }

    #[test]
    fn test_any_acceptable_license_suffices() {
        let config = Configuration {
            allow_unacceptable_licenses: false,
            ..Configuration::default()
        };
        let decision = evaluate(
            &[
                license("Proprietary", "https://example.com/eula"),
                license("MIT License", ""),
            ],
            &config,
        );
        assert_eq!(decision, LicenseDecision::Accepted);
    }

    #[test]
    fn test_missing_license_gates() {
        let tolerant = Configuration::default();
        assert!(matches!(
            evaluate(&[], &tolerant),
            LicenseDecision::Tolerated { .. }
        ));

        let strict = Configuration {
            allow_no_license: false,
            ..Configuration::default()
        };
        assert!(matches!(evaluate(&[], &strict), LicenseDecision::Rejected { .. }));

        let required = Configuration {
            require_license: true,
            ..Configuration::default()
        };
        assert!(matches!(
            evaluate(&[], &required),
            LicenseDecision::Rejected { .. }
        ));
    }
}
