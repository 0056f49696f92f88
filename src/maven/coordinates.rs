use std::collections::BTreeMap;
use std::fmt;

use anyhow::{anyhow, bail};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenGroupId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenArtifactId(pub String);

/// The identity of an artifact within the Maven universe. Two coordinates
/// with the same group, artifact, and version are the same artifact for
/// deduplication purposes regardless of classifier or packaging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinates {
    pub group_id: MavenGroupId,
    pub artifact_id: MavenArtifactId,
    pub version: String,
}

impl MavenCoordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> MavenCoordinates {
        MavenCoordinates {
            group_id: MavenGroupId(group_id.to_string()),
            artifact_id: MavenArtifactId(artifact_id.to_string()),
            version: version.to_string(),
        }
    }

    /// Deduplication key for the resolution map.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.group_id.0, self.artifact_id.0, self.version)
    }
}

impl fmt::Display for MavenCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id.0, self.artifact_id.0, self.version
        )
    }
}

/// A coordinate as the user (or a POM dependency) asked for it, with the
/// optional classifier and packaging that select the primary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub coordinates: MavenCoordinates,
    pub classifier: Option<String>,
    pub packaging: Option<String>,
}

impl ArtifactRequest {
    pub fn new(coordinates: MavenCoordinates) -> ArtifactRequest {
        ArtifactRequest {
            coordinates,
            classifier: None,
            packaging: None,
        }
    }

    /// Parse a command-line artifact argument: either
    /// `group:artifact:version[:classifier[:packaging]]` or a full URL into
    /// one of the known repositories.
    pub fn parse(spec: &str, known_repo_urls: &[String]) -> anyhow::Result<ArtifactRequest> {
        let spec = spec.trim();
        if spec.starts_with("http://") || spec.starts_with("https://") {
            return Self::parse_url(spec, known_repo_urls);
        }

        let parts: Vec<&str> = spec.split(':').collect();
        if !(3..=5).contains(&parts.len()) || parts[..3].iter().any(|p| p.is_empty()) {
            bail!(
                "unknown artifact format {:?}: expected a Maven repo URL or group:artifact:version",
                spec
            );
        }
        Ok(ArtifactRequest {
            coordinates: MavenCoordinates::new(parts[0], parts[1], parts[2]),
            classifier: parts.get(3).filter(|c| !c.is_empty()).map(|c| c.to_string()),
            packaging: parts.get(4).filter(|p| !p.is_empty()).map(|p| p.to_string()),
        })
    }

    /// Heuristic for URL arguments: strip the matching repository prefix and
    /// read the remaining path as group/artifact/version. Some hosts keep
    /// the group dot-separated in the path, so a dotted first segment is
    /// expanded back into group segments.
    fn parse_url(url: &str, known_repo_urls: &[String]) -> anyhow::Result<ArtifactRequest> {
        let base = known_repo_urls
            .iter()
            .find(|base| url.starts_with(base.as_str()))
            .ok_or_else(|| anyhow!("unknown source repository for {:?}", url))?;

        let mut parts: Vec<String> = url[base.len()..]
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();
        if let Some(last) = parts.last() {
            if last.ends_with(".jar") || last.ends_with(".pom") {
                parts.pop();
            }
        }
        if let Some(first) = parts.first() {
            if first.contains('.') {
                let expanded: Vec<String> = first.split('.').map(|p| p.to_string()).collect();
                parts.splice(0..1, expanded);
            }
        }
        if parts.len() < 3 {
            bail!("not a valid Maven artifact URL: {:?}", url);
        }

        let version = parts.pop().unwrap_or_default();
        let artifact = parts.pop().unwrap_or_default();
        Ok(ArtifactRequest::new(MavenCoordinates::new(
            &parts.join("."),
            &artifact,
            &version,
        )))
    }

    /// Rewrite mislabeled groups before the first repository lookup. A table
    /// key matching a prefix of `group + "."` replaces the group and prepends
    /// the configured artifact prefix.
    pub fn canonicalised(&self, rewrites: &BTreeMap<String, (String, String)>) -> ArtifactRequest {
        let dotted_group = format!("{}.", self.coordinates.group_id.0);
        for (prefix, (new_group, artifact_prefix)) in rewrites {
            if dotted_group.starts_with(prefix.as_str()) {
                let mut rewritten = self.clone();
                rewritten.coordinates.group_id = MavenGroupId(new_group.clone());
                rewritten.coordinates.artifact_id = MavenArtifactId(format!(
                    "{}{}",
                    artifact_prefix, self.coordinates.artifact_id.0
                ));
                return rewritten;
            }
        }
        self.clone()
    }
}

impl fmt::Display for ArtifactRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.coordinates.fmt(f)
    }
}
