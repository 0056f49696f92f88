//! Maven 2 repository layout: where an artifact's directory lives below a
//! repository base URL, and what its published files are called.

use crate::maven::coordinates::MavenCoordinates;

/// Directory holding every published file of the artifact:
/// `<base>/<group with dots as slashes>/<artifact>/<version>/`.
pub fn directory_url(base_url: &str, coordinates: &MavenCoordinates) -> String {
    let mut url = base_url.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    format!(
        "{}{}/{}/{}/",
        url,
        coordinates.group_id.0.replace('.', "/"),
        coordinates.artifact_id.0,
        coordinates.version,
    )
}

/// File extension of the primary artifact for a packaging. OSGi bundles and
/// Maven plugins publish plain jars.
pub fn primary_extension(packaging: &str) -> &str {
    match packaging {
        "bundle" | "maven-plugin" => "jar",
        other => other,
    }
}

pub fn primary_file_name(
    coordinates: &MavenCoordinates,
    classifier: Option<&str>,
    packaging: &str,
) -> String {
    let classifier_part = match classifier {
        Some(c) => format!("-{}", c),
        None => String::new(),
    };
    format!(
        "{}-{}{}.{}",
        coordinates.artifact_id.0,
        coordinates.version,
        classifier_part,
        primary_extension(packaging),
    )
}

pub fn pom_file_name(coordinates: &MavenCoordinates) -> String {
    format!(
        "{}-{}.pom",
        coordinates.artifact_id.0, coordinates.version
    )
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;
    use crate::maven::coordinates::MavenCoordinates;

    #[rstest]
    #[case::with_trailing_slash("https://repo1.maven.org/maven2/")]
    #[case::without_trailing_slash("https://repo1.maven.org/maven2")]
    fn test_directory_url(#[case] base: &str) {
        let coordinates = MavenCoordinates::new("org.apache.logging.log4j", "log4j-api", "2.12.1");
        assert_eq!(
            directory_url(base, &coordinates),
            "https://repo1.maven.org/maven2/org/apache/logging/log4j/log4j-api/2.12.1/"
        );
    }

    #[rstest]
    #[case::jar(None, "jar", "log4j-api-2.12.1.jar")]
    #[case::war(None, "war", "log4j-api-2.12.1.war")]
    #[case::bundle_is_jar(None, "bundle", "log4j-api-2.12.1.jar")]
    #[case::plugin_is_jar(None, "maven-plugin", "log4j-api-2.12.1.jar")]
    #[case::classifier(Some("sources"), "jar", "log4j-api-2.12.1-sources.jar")]
    fn test_primary_file_name(
        #[case] classifier: Option<&str>,
        #[case] packaging: &str,
        #[case] expected: &str,
    ) {
        let coordinates = MavenCoordinates::new("org.apache.logging.log4j", "log4j-api", "2.12.1");
        assert_eq!(
            primary_file_name(&coordinates, classifier, packaging),
            expected
        );
    }

    #[test]
    fn test_pom_file_name() {
        let coordinates = MavenCoordinates::new("org.apache.logging.log4j", "log4j-api", "2.12.1");
        assert_eq!(pom_file_name(&coordinates), "log4j-api-2.12.1.pom");
    }
}
