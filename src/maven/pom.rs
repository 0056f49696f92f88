//! POM parsing. The raw XML is deserialised through quick-xml into a
//! tolerant shape (everything optional, unknown elements ignored) and then
//! converted into the model the resolver works with.
//!
//! Published POMs are sometimes garbage: a few well-known bad entities are
//! fixed up before parsing rather than teaching the parser about them.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;

use crate::maven::coordinates::MavenCoordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyScope {
    Compile,
    Runtime,
    Test,
    Provided,
    System,
    Import,
}

impl DependencyScope {
    fn parse(raw: Option<&str>) -> DependencyScope {
        match raw.map(str::trim) {
            Some("runtime") => DependencyScope::Runtime,
            Some("test") => DependencyScope::Test,
            Some("provided") => DependencyScope::Provided,
            Some("system") => DependencyScope::System,
            Some("import") => DependencyScope::Import,
            _ => DependencyScope::Compile,
        }
    }

    /// Only compile and runtime dependencies are followed when recursing.
    pub fn feeds_recursion(self) -> bool {
        matches!(self, DependencyScope::Compile | DependencyScope::Runtime)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl PomParentRef {
    pub fn coordinates(&self) -> MavenCoordinates {
        MavenCoordinates::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

#[derive(Debug, Clone)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    /// Empty when the POM leaves the version to dependency management.
    pub version: String,
    pub scope: DependencyScope,
    pub optional: bool,
    pub dep_type: Option<String>,
    pub classifier: Option<String>,
}

impl PomDependency {
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Clone)]
pub struct PomFile {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub parent: Option<PomParentRef>,
    pub properties: BTreeMap<String, String>,
    pub managed_dependencies: Vec<PomDependency>,
    pub dependencies: Vec<PomDependency>,
    pub licenses: Vec<License>,
}

impl PomFile {
    pub fn coordinates(&self) -> MavenCoordinates {
        MavenCoordinates::new(&self.group_id, &self.artifact_id, &self.version)
    }

    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawProject {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    packaging: Option<String>,
    parent: Option<RawParent>,
    properties: Option<BTreeMap<String, String>>,
    dependency_management: Option<RawDependencyManagement>,
    dependencies: Option<RawDependencies>,
    licenses: Option<RawLicenses>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawParent {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDependencyManagement {
    dependencies: Option<RawDependencies>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDependencies {
    #[serde(rename = "dependency")]
    entries: Vec<RawDependency>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDependency {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    scope: Option<String>,
    optional: Option<String>,
    #[serde(rename = "type")]
    dep_type: Option<String>,
    classifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLicenses {
    #[serde(rename = "license")]
    entries: Vec<RawLicense>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLicense {
    name: Option<String>,
    url: Option<String>,
}

pub fn parse_pom(text: &str) -> anyhow::Result<PomFile> {
    let cleaned = clean_pom_text(text);
    let raw: RawProject =
        quick_xml::de::from_str(&cleaned).context("cannot parse POM XML")?;
    Ok(build_pom(raw))
}

/// Known-bad content in published POMs: HTML entities XML does not define
/// (plexus 1.0.3, javax portlet-api) and leading byte-order marks.
fn clean_pom_text(text: &str) -> String {
    text.trim_start_matches('\u{feff}')
        .replace("&oslash;", "o")
        .replace("&nbsp;", " ")
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn build_pom(raw: RawProject) -> PomFile {
    let parent = raw.parent.map(|p| PomParentRef {
        group_id: trimmed(p.group_id),
        artifact_id: trimmed(p.artifact_id),
        version: trimmed(p.version),
    });

    let mut group_id = trimmed(raw.group_id);
    let artifact_id = trimmed(raw.artifact_id);
    let mut version = trimmed(raw.version);
    if let Some(p) = &parent {
        if group_id.is_empty() {
            group_id = p.group_id.clone();
        }
        if version.is_empty() {
            version = p.version.clone();
        }
    }

    let mut packaging = trimmed(raw.packaging);
    if packaging.is_empty() {
        packaging = "jar".to_string();
    }

    let properties = raw
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.trim().to_string()))
        .collect();

    let managed_dependencies = raw
        .dependency_management
        .and_then(|dm| dm.dependencies)
        .map(|d| d.entries)
        .unwrap_or_default()
        .into_iter()
        .map(build_dependency)
        .collect();
    let dependencies = raw
        .dependencies
        .map(|d| d.entries)
        .unwrap_or_default()
        .into_iter()
        .map(build_dependency)
        .collect();

    let licenses = raw
        .licenses
        .map(|l| l.entries)
        .unwrap_or_default()
        .into_iter()
        .map(|l| License {
            name: trimmed(l.name),
            url: trimmed(l.url),
        })
        .collect();

    let mut pom = PomFile {
        group_id,
        artifact_id,
        version,
        packaging,
        parent,
        properties,
        managed_dependencies,
        dependencies,
        licenses,
    };
    // a POM declaring itself as its parent would loop forever
    if let Some(p) = &pom.parent {
        if p.coordinates() == pom.coordinates() {
            pom.parent = None;
        }
    }
    pom
}

fn build_dependency(raw: RawDependency) -> PomDependency {
    PomDependency {
        group_id: trimmed(raw.group_id),
        artifact_id: trimmed(raw.artifact_id),
        version: trimmed(raw.version),
        scope: DependencyScope::parse(raw.scope.as_deref()),
        optional: raw.optional.map(|o| o.trim() == "true").unwrap_or(false),
        dep_type: raw.dep_type.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        classifier: raw
            .classifier
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>example-parent</artifactId>
    <version>7</version>
  </parent>
  <artifactId>example-lib</artifactId>
  <version>1.2.3</version>
  <properties>
    <slf4j.version>1.7.30</slf4j.version>
    <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
  </properties>
  <licenses>
    <license>
      <name>Apache License, Version 2.0</name>
      <url>https://www.apache.org/licenses/LICENSE-2.0.txt</url>
    </license>
  </licenses>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.slf4j</groupId>
        <artifactId>slf4j-api</artifactId>
        <version>${slf4j.version}</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13</version>
      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>optional-helper</artifactId>
      <version>2.0</version>
      <optional>true</optional>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn test_parse_sample() {
        let pom = parse_pom(SAMPLE).unwrap();
        assert_eq!(pom.group_id, "org.example");
        assert_eq!(pom.artifact_id, "example-lib");
        assert_eq!(pom.version, "1.2.3");
        assert_eq!(pom.packaging, "jar");

        let parent = pom.parent.as_ref().unwrap();
        assert_eq!(parent.artifact_id, "example-parent");
        assert_eq!(parent.version, "7");

        assert_eq!(pom.properties.get("slf4j.version").map(String::as_str), Some("1.7.30"));

        assert_eq!(pom.managed_dependencies.len(), 1);
        assert_eq!(pom.managed_dependencies[0].version, "${slf4j.version}");

        assert_eq!(pom.dependencies.len(), 3);
        assert_eq!(pom.dependencies[0].artifact_id, "slf4j-api");
        assert_eq!(pom.dependencies[0].version, "");
        assert_eq!(pom.dependencies[0].scope, DependencyScope::Compile);
        assert_eq!(pom.dependencies[1].scope, DependencyScope::Test);
        assert!(pom.dependencies[2].optional);

        assert_eq!(pom.licenses.len(), 1);
        assert_eq!(pom.licenses[0].name, "Apache License, Version 2.0");
    }

    #[test]
    fn test_group_and_version_inherit_from_parent() {
        let pom = parse_pom(
            r#"<project>
                 <parent>
                   <groupId>org.example</groupId>
                   <artifactId>example-parent</artifactId>
                   <version>7</version>
                 </parent>
                 <artifactId>child</artifactId>
               </project>"#,
        )
        .unwrap();
        assert_eq!(pom.group_id, "org.example");
        assert_eq!(pom.version, "7");
    }

    #[test]
    fn test_pom_packaging() {
        let pom = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
                 <packaging>pom</packaging>
               </project>"#,
        )
        .unwrap();
        assert_eq!(pom.packaging, "pom");
    }

    #[test]
    fn test_self_parent_is_dropped() {
        let pom = parse_pom(
            r#"<project>
                 <parent>
                   <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
                 </parent>
                 <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
               </project>"#,
        )
        .unwrap();
        assert!(pom.parent.is_none());
    }

    #[test]
    fn test_import_scope() {
        let pom = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
                 <dependencyManagement><dependencies><dependency>
                   <groupId>io.netty</groupId>
                   <artifactId>netty-bom</artifactId>
                   <version>4.1.50.Final</version>
                   <type>pom</type>
                   <scope>import</scope>
                 </dependency></dependencies></dependencyManagement>
               </project>"#,
        )
        .unwrap();
        let entry = &pom.managed_dependencies[0];
        assert_eq!(entry.scope, DependencyScope::Import);
        assert_eq!(entry.dep_type.as_deref(), Some("pom"));
    }

    #[test]
    fn test_bad_entities_are_cleaned() {
        let pom = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
                 <licenses><license><name>S&oslash;ren's&nbsp;License</name></license></licenses>
               </project>"#,
        )
        .unwrap();
        assert_eq!(pom.licenses[0].name, "Soren's License");
    }

    #[test]
    fn test_unparseable_is_an_error() {
        assert!(parse_pom("<project><dependencies></project>").is_err());
    }

    #[test]
    fn test_unknown_elements_are_ignored() {
        let pom = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
                 <build><plugins><plugin><artifactId>whatever</artifactId></plugin></plugins></build>
               </project>"#,
        )
        .unwrap();
        assert_eq!(pom.id(), "g:a:1");
        assert!(pom.dependencies.is_empty());
    }
}
