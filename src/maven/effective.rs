//! Effective-POM composition: parent merging, `${property}` substitution,
//! and managed-version lookup. These are the pure pieces; fetching parents
//! and import BOMs is the resolver's job.

use std::collections::BTreeMap;

use crate::maven::pom::{PomDependency, PomFile};

/// Safety cap for the substitution fix-point; a POM whose properties still
/// change after this many passes is self-referential.
pub const MAX_SUBSTITUTION_PASSES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substituted {
    pub value: String,
    /// No `${…}` references remain.
    pub resolved: bool,
    pub pass_cap_hit: bool,
}

/// Merge a resolved parent into its child. Child entries win everywhere:
/// properties only fill gaps, managed dependencies are appended after the
/// child's own (lookups take the first match), licenses are inherited only
/// when the child declares none.
pub fn merge_parent(child: &mut PomFile, parent: &PomFile) {
    if child.group_id.is_empty() {
        child.group_id = parent.group_id.clone();
    }
    if child.version.is_empty() {
        child.version = parent.version.clone();
    }
    for (key, value) in &parent.properties {
        child
            .properties
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    child
        .properties
        .insert("project.parent.groupId".to_string(), parent.group_id.clone());
    child.properties.insert(
        "project.parent.artifactId".to_string(),
        parent.artifact_id.clone(),
    );
    child
        .properties
        .insert("project.parent.version".to_string(), parent.version.clone());

    child
        .managed_dependencies
        .extend(parent.managed_dependencies.iter().cloned());
    if child.licenses.is_empty() {
        child.licenses = parent.licenses.clone();
    }
}

/// The substitution sources for a POM: its declared properties plus the
/// `project.*` (and legacy `pom.*`) built-ins. Empty coordinate pieces are
/// left out so a half-inherited POM does not substitute empty strings.
pub fn substitution_context(pom: &PomFile) -> BTreeMap<String, String> {
    let mut context = pom.properties.clone();
    for prefix in ["project", "pom"] {
        for (suffix, value) in [
            ("groupId", &pom.group_id),
            ("artifactId", &pom.artifact_id),
            ("version", &pom.version),
            ("packaging", &pom.packaging),
        ] {
            if !value.is_empty() {
                context.insert(format!("{}.{}", prefix, suffix), value.clone());
            }
        }
    }
    if let Some(parent) = &pom.parent {
        for (key, value) in [
            ("project.parent.groupId", &parent.group_id),
            ("project.parent.artifactId", &parent.artifact_id),
            ("project.parent.version", &parent.version),
        ] {
            if !value.is_empty() {
                context
                    .entry(key.to_string())
                    .or_insert_with(|| value.clone());
            }
        }
    }
    context
}

/// Replace `${key}` references until a fixed point (or the pass cap).
pub fn substitute(value: &str, properties: &BTreeMap<String, String>) -> Substituted {
    let mut current = value.to_string();
    let mut pass_cap_hit = false;
    if current.contains("${") {
        for pass in 0.. {
            if pass >= MAX_SUBSTITUTION_PASSES {
                pass_cap_hit = true;
                break;
            }
            let before = current.clone();
            for (key, replacement) in properties {
                let token = format!("${{{}}}", key);
                if current.contains(&token) {
                    current = current.replace(&token, replacement);
                }
            }
            if current == before {
                break;
            }
        }
    }
    let resolved = !current.contains("${");
    Substituted {
        value: current,
        resolved,
        pass_cap_hit,
    }
}

/// Substitute a dependency's coordinate fields in place. Returns false when
/// any `${…}` reference could not be resolved.
pub fn apply_properties(
    dependency: &mut PomDependency,
    properties: &BTreeMap<String, String>,
) -> bool {
    let mut resolved = true;
    for field in [
        &mut dependency.group_id,
        &mut dependency.artifact_id,
        &mut dependency.version,
    ] {
        let outcome = substitute(field, properties);
        resolved &= outcome.resolved && !outcome.pass_cap_hit;
        *field = outcome.value;
    }
    resolved
}

/// First managed entry for (group, artifact); child entries precede parent
/// entries, so the first match is the overriding one.
pub fn managed_entry<'a>(
    managed: &'a [PomDependency],
    group_id: &str,
    artifact_id: &str,
) -> Option<&'a PomDependency> {
    managed
        .iter()
        .find(|m| m.group_id == group_id && m.artifact_id == artifact_id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::maven::pom::parse_pom;

    fn properties(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_simple() {
        let props = properties(&[("slf4j.version", "1.7.30")]);
        let outcome = substitute("${slf4j.version}", &props);
        assert_eq!(outcome.value, "1.7.30");
        assert!(outcome.resolved);
    }

    #[test]
    fn test_substitute_chains_to_fixpoint() {
        let props = properties(&[("a", "${b}"), ("b", "${c}"), ("c", "3")]);
        let outcome = substitute("v${a}", &props);
        assert_eq!(outcome.value, "v3");
        assert!(outcome.resolved);
    }

    #[test]
    fn test_substitute_is_idempotent() {
        let props = properties(&[("a", "${b}"), ("b", "2")]);
        let first = substitute("${a}.${b}", &props);
        let second = substitute(&first.value, &props);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn test_substitute_leaves_unknown_references() {
        let props = properties(&[]);
        let outcome = substitute("${mystery}", &props);
        assert_eq!(outcome.value, "${mystery}");
        assert!(!outcome.resolved);
        assert!(!outcome.pass_cap_hit);
    }

    #[test]
    fn test_substitute_caps_self_reference() {
        let props = properties(&[("a", "x${a}")]);
        let outcome = substitute("${a}", &props);
        assert!(outcome.pass_cap_hit);
    }

    #[test]
    fn test_merge_parent_child_wins() {
        let mut child = parse_pom(
            r#"<project>
                 <parent><groupId>g</groupId><artifactId>p</artifactId><version>7</version></parent>
                 <artifactId>child</artifactId>
                 <properties><shared>child-value</shared></properties>
               </project>"#,
        )
        .unwrap();
        let parent = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>p</artifactId><version>7</version>
                 <properties><shared>parent-value</shared><only.parent>x</only.parent></properties>
                 <licenses><license><name>MIT License</name></license></licenses>
                 <dependencyManagement><dependencies><dependency>
                   <groupId>org.slf4j</groupId><artifactId>slf4j-api</artifactId><version>1.7.30</version>
                 </dependency></dependencies></dependencyManagement>
               </project>"#,
        )
        .unwrap();

        merge_parent(&mut child, &parent);

        assert_eq!(child.group_id, "g");
        assert_eq!(child.version, "7");
        assert_eq!(child.properties.get("shared").map(String::as_str), Some("child-value"));
        assert_eq!(child.properties.get("only.parent").map(String::as_str), Some("x"));
        assert_eq!(
            child.properties.get("project.parent.version").map(String::as_str),
            Some("7")
        );
        assert_eq!(child.managed_dependencies.len(), 1);
        assert_eq!(child.licenses[0].name, "MIT License");
    }

    #[test]
    fn test_managed_entry_first_match_wins() {
        let mut child = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>c</artifactId><version>1</version>
                 <dependencyManagement><dependencies><dependency>
                   <groupId>org.slf4j</groupId><artifactId>slf4j-api</artifactId><version>1.7.30</version>
                 </dependency></dependencies></dependencyManagement>
               </project>"#,
        )
        .unwrap();
        let parent = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>p</artifactId><version>7</version>
                 <dependencyManagement><dependencies><dependency>
                   <groupId>org.slf4j</groupId><artifactId>slf4j-api</artifactId><version>1.5.0</version>
                 </dependency></dependencies></dependencyManagement>
               </project>"#,
        )
        .unwrap();
        merge_parent(&mut child, &parent);

        let entry = managed_entry(&child.managed_dependencies, "org.slf4j", "slf4j-api").unwrap();
        assert_eq!(entry.version, "1.7.30");
    }

    #[test]
    fn test_substitution_context_has_builtins() {
        let pom = parse_pom(
            r#"<project>
                 <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
               </project>"#,
        )
        .unwrap();
        let context = substitution_context(&pom);
        assert_eq!(context.get("project.groupId").map(String::as_str), Some("g"));
        assert_eq!(context.get("pom.version").map(String::as_str), Some("1"));
    }
}
