//! User configuration. A plain value handed to the resolver; settable
//! through a strict-JSON configuration file and overridden per-flag by the
//! CLI. No module-level state anywhere.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".mvn2get.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(rename = "outdir")]
    pub output_dir: PathBuf,
    pub show_progress: bool,
    pub log_level: LogLevel,
    pub problem_file: Option<PathBuf>,
    pub recursive: bool,
    pub overwrite: bool,
    pub do_remote_download: bool,
    pub include_dep_management: bool,
    pub check_in_local: bool,
    pub no_pgp: bool,
    pub progress_indicators: String,
    pub remote_repo_urls: Vec<String>,
    pub local_repo_urls: Vec<String>,
    pub pgp_key_servers: Vec<String>,
    pub acceptable_license_urls: Vec<String>,
    pub acceptable_license_names: Vec<String>,
    pub allow_unacceptable_licenses: bool,
    pub allow_no_license: bool,
    pub require_license: bool,
    /// artifact-group prefix -> (replacement group, artifact prefix)
    pub mislabeled_artifact_groups: BTreeMap<String, (String, String)>,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            output_dir: PathBuf::from("."),
            show_progress: false,
            log_level: LogLevel::Warn,
            problem_file: None,
            recursive: false,
            overwrite: false,
            do_remote_download: true,
            include_dep_management: false,
            check_in_local: true,
            no_pgp: false,
            progress_indicators: "|/-\\".to_string(),
            remote_repo_urls: vec![
                "https://repo1.maven.org/maven2/".to_string(),
                "https://plugins.gradle.org/m2/".to_string(),
            ],
            local_repo_urls: Vec::new(),
            pgp_key_servers: vec![
                "hkp://pool.sks-keyservers.net".to_string(),
                "hkps://hkps.pool.sks-keyservers.net".to_string(),
            ],
            acceptable_license_urls: default_license_urls(),
            acceptable_license_names: default_license_names(),
            allow_unacceptable_licenses: true,
            allow_no_license: true,
            require_license: false,
            mislabeled_artifact_groups: default_mislabeled_groups(),
        }
    }
}

impl Configuration {
    /// Load from an explicit path, or the first of `./.mvn2get.json` and
    /// `~/.mvn2get.json` that exists; later candidates are not consulted.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Configuration> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        candidates.push(PathBuf::from(CONFIG_FILE_NAME));
        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(Path::new(&home).join(CONFIG_FILE_NAME));
        }

        for candidate in candidates {
            if candidate.is_file() {
                return Self::load_file(&candidate);
            }
        }
        Ok(Configuration::default())
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Configuration> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {}", path.display()))?;
        let mut config: Configuration = serde_json::from_str(&text)
            .with_context(|| format!("invalid configuration file {}", path.display()))?;
        config.normalise();
        Ok(config)
    }

    /// Repository base URLs must end in `/` for path concatenation.
    pub fn normalise(&mut self) {
        for url in self
            .remote_repo_urls
            .iter_mut()
            .chain(self.local_repo_urls.iter_mut())
        {
            if !url.ends_with('/') {
                url.push('/');
            }
        }
    }

    /// All repository bases, remote and local, for seed-URL recognition.
    pub fn known_repo_urls(&self) -> Vec<String> {
        self.remote_repo_urls
            .iter()
            .chain(self.local_repo_urls.iter())
            .cloned()
            .collect()
    }
}

fn default_mislabeled_groups() -> BTreeMap<String, (String, String)> {
    let mut groups = BTreeMap::new();
    groups.insert(
        "org.apache.felix.".to_string(),
        ("org.apache.felix".to_string(), String::new()),
    );
    groups.insert(
        "org.osgi.".to_string(),
        ("org.osgi".to_string(), "org.osgi.".to_string()),
    );
    groups.insert(
        "wagon-http-shared".to_string(),
        (
            "org.apache.maven.wagon".to_string(),
            "wagon-http-shared".to_string(),
        ),
    );
    groups
}

fn default_license_urls() -> Vec<String> {
    [
        // Apache Software License, versions 1.1 and 2
        "http://www.apache.org/licenses/",
        "http://www.apache.org/licenses/LICENSE-1.1",
        "http://www.apache.org/licenses/LICENSE-2.0",
        "http://www.apache.org/licenses/LICENSE-2.0.txt",
        "http://www.apache.org/licenses/LICENSE-2.0.html",
        "https://www.apache.org/licenses/LICENSE-2.0",
        "https://www.apache.org/licenses/LICENSE-2.0.txt",
        "http://opensource.org/licenses/Apache-2.0",
        "http://opensource.org/licenses/apache2.0.php",
        "http://www.scala-lang.org/downloads/license.html",
        // BSD variants
        "http://www.opensource.org/licenses/bsd-license.php",
        "http://opensource.org/licenses/BSD-2-Clause",
        "http://opensource.org/licenses/BSD-3-Clause",
        "http://www.scala-lang.org/license.html",
        "http://asm.ow2.org/license.html",
        "https://asm.ow2.io/license.html",
        "http://antlr.org/license.html",
        "http://www.antlr.org/license.html",
        "https://jdbc.postgresql.org/about/license.html",
        // MIT
        "http://www.opensource.org/licenses/mit-license.php",
        "http://opensource.org/licenses/MIT",
        "https://opensource.org/licenses/MIT",
        "https://github.com/mockito/mockito/blob/master/LICENSE",
        // Eclipse
        "http://www.eclipse.org/legal/epl-v10.html",
        "http://www.eclipse.org/legal/epl-v20.html",
        "https://www.eclipse.org/legal/epl-v20.html",
        "http://www.eclipse.org/org/documents/edl-v10.php",
        // CDDL (+ GPLv2 with classpath exception)
        "https://glassfish.dev.java.net/public/CDDLv1.0.html",
        "https://oss.oracle.com/licenses/CDDL+GPL-1.1",
        "https://glassfish.dev.java.net/public/CDDL+GPL.html",
        "https://glassfish.java.net/public/CDDL+GPL_1_1.html",
        // Mozilla
        "http://www.mozilla.org/MPL/MPL-1.1.html",
        "http://www.mozilla.org/MPL/2.0/",
        "http://www.mozilla.org/MPL/2.0/index.txt",
        // others
        "http://www.bouncycastle.org/licence.html",
        "http://www.postgresql.org/about/licence/",
        "http://json.org/license.html",
        "http://hsqldb.org/web/hsqlLicense.html",
        "http://creativecommons.org/licenses/publicdomain",
        "http://creativecommons.org/publicdomain/zero/1.0/",
        "http://www.gnu.org/licenses/lgpl-2.1.html",
        "http://www.gnu.org/licenses/lgpl.txt",
        "http://h2database.com/html/license.html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_license_names() -> Vec<String> {
    [
        "Apache License",
        "Apache License Version 2.0",
        "Apache License, Version 2.0",
        "The Apache Software License, Version 2.0",
        "Public Domain",
        "BSD",
        "BSD License",
        "The BSD 2-Clause License",
        "The New BSD License",
        "The MIT License",
        "MIT License",
        "CDDL + GPLv2 with classpath exception",
        "CDDL/GPLv2+CE",
        "Eclipse Public License",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
