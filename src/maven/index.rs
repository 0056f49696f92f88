//! Directory-index scraping. Maven repositories expose artifact directories
//! only as HTML pages, so the file list is recovered from the `href`
//! attributes of the anchor tags.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref A_TAG_REGEX: Regex = Regex::new(r"(?s)<a\s+([^>]*?)>").unwrap();
    static ref HREF_REGEX: Regex = Regex::new(r#"href\s*=\s*["']([^"']*)["']"#).unwrap();
}

/// Checksum/signature companions that may exist for any published file even
/// when the index page does not list them.
pub const VERIFICATION_EXTENSIONS: [&str; 5] = [".md5", ".sha1", ".asc", ".asc.md5", ".asc.sha1"];

// Some artifacts publish checksums of checksums (and signatures of
// signatures), which is clearly wrong. Those never count as published files.
const GARBAGE_EXTENSIONS: [&str; 13] = [
    ".md5.md5",
    ".md5.sha1",
    ".sha1.md5",
    ".sha1.sha1",
    ".asc.asc",
    ".md5.asc",
    ".sha1.asc",
    ".asc.asc.md5",
    ".asc.asc.sha1",
    ".md5.asc.md5",
    ".md5.asc.sha1",
    ".sha1.asc.md5",
    ".sha1.asc.sha1",
];

pub fn is_published_file_name(name: &str) -> bool {
    !GARBAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Extract the file names linked from a directory index page.
///
/// Absolute links are kept only when they point below `directory_url`;
/// relative links are taken verbatim. Sub-directories, parent links, index
/// sort links, and garbage checksum-of-checksum names are dropped.
pub fn extract_file_names(html: &str, directory_url: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in A_TAG_REGEX.captures_iter(html) {
        let attributes = &captures[1];
        let href = match HREF_REGEX.captures(attributes) {
            Some(h) => h[1].to_string(),
            None => continue,
        };

        let mut name = if href.starts_with("http://") || href.starts_with("https://") {
            match href.strip_prefix(directory_url) {
                Some(tail) => tail.to_string(),
                None => continue,
            }
        } else {
            href
        };
        // some repositories put extra junk in front of the link
        while name.starts_with(':') || name.starts_with('/') {
            name.remove(0);
        }

        if name.is_empty()
            || name.ends_with('/')
            || name.starts_with("..")
            || name.starts_with('?')
            || name.starts_with('#')
            || name.contains("://")
            || !is_published_file_name(&name)
        {
            continue;
        }
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Pair each name with whether the index actually listed it, adding the
/// verification companions some repositories serve without listing. Guessed
/// entries are not required to exist.
pub fn with_verification_siblings(names: &[String]) -> Vec<(String, bool)> {
    let mut result: Vec<(String, bool)> = names.iter().map(|n| (n.clone(), true)).collect();
    for name in names {
        for ext in VERIFICATION_EXTENSIONS {
            if name.ends_with(ext) {
                continue;
            }
            let guessed = format!("{}{}", name, ext);
            if names.contains(&guessed) || !is_published_file_name(&guessed) {
                continue;
            }
            result.push((guessed, false));
        }
    }
    result
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    const DIR_URL: &str = "https://repo1.maven.org/maven2/org/slf4j/slf4j-api/1.7.30/";

    #[test]
    fn test_extract_relative_links() {
        let html = r#"
            <html><body><h1>Index of /org/slf4j/slf4j-api/1.7.30</h1>
            <a href="../">Parent Directory</a>
            <a href="slf4j-api-1.7.30.jar">slf4j-api-1.7.30.jar</a>
            <a href="slf4j-api-1.7.30.jar.sha1">slf4j-api-1.7.30.jar.sha1</a>
            <a href="subdir/">subdir/</a>
            <a href="?C=N;O=D">Name</a>
            </body></html>
        "#;
        assert_eq!(
            extract_file_names(html, DIR_URL),
            vec!["slf4j-api-1.7.30.jar", "slf4j-api-1.7.30.jar.sha1"]
        );
    }

    #[test]
    fn test_extract_absolute_links_under_directory() {
        let html = format!(
            r#"<a href="{0}slf4j-api-1.7.30.pom">pom</a>
               <a href="https://other.example/elsewhere.jar">foreign</a>"#,
            DIR_URL
        );
        assert_eq!(extract_file_names(&html, DIR_URL), vec!["slf4j-api-1.7.30.pom"]);
    }

    #[test]
    fn test_extract_strips_leading_colon() {
        let html = r#"<a href=":slf4j-api-1.7.30.jar">jar</a>"#;
        assert_eq!(extract_file_names(html, DIR_URL), vec!["slf4j-api-1.7.30.jar"]);
    }

    #[test]
    fn test_extract_single_quoted_href() {
        let html = r#"<a class="f" href='slf4j-api-1.7.30.jar'>jar</a>"#;
        assert_eq!(extract_file_names(html, DIR_URL), vec!["slf4j-api-1.7.30.jar"]);
    }

    #[rstest]
    #[case::checksum_of_checksum("a-1.0.jar.md5.md5", false)]
    #[case::checksum_of_signature("a-1.0.jar.md5.asc", false)]
    #[case::signature_of_signature("a-1.0.jar.asc.asc", false)]
    #[case::deep_garbage("a-1.0.jar.sha1.asc.sha1", false)]
    #[case::jar("a-1.0.jar", true)]
    #[case::checksum("a-1.0.jar.sha1", true)]
    #[case::signature_checksum("a-1.0.jar.asc.sha1", true)]
    fn test_is_published_file_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_published_file_name(name), expected);
    }

    #[test]
    fn test_verification_siblings_are_guessed_once() {
        let names = vec!["a-1.0.jar".to_string(), "a-1.0.jar.sha1".to_string()];
        let with_siblings = with_verification_siblings(&names);
        // listed entries stay required
        assert!(with_siblings.contains(&("a-1.0.jar".to_string(), true)));
        assert!(with_siblings.contains(&("a-1.0.jar.sha1".to_string(), true)));
        // unlisted companions are guessed, not required
        assert!(with_siblings.contains(&("a-1.0.jar.md5".to_string(), false)));
        assert!(with_siblings.contains(&("a-1.0.jar.asc".to_string(), false)));
        // the listed sha1 is not guessed a second time
        let sha1_count = with_siblings
            .iter()
            .filter(|(n, _)| n == "a-1.0.jar.sha1")
            .count();
        assert_eq!(sha1_count, 1);
        // no checksum-of-checksum guesses
        assert!(!with_siblings.iter().any(|(n, _)| n == "a-1.0.jar.sha1.md5"));
    }
}
