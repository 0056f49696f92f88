//! The resolver engine: a FIFO worklist of coordinates and a resolution map
//! keyed by `group:artifact:version`. The map is checked before anything is
//! enqueued, so diamonds and cycles in the dependency graph collapse without
//! the graph ever being materialised.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Configuration;
use crate::events::EventSink;
use crate::license::{self, LicenseDecision};
use crate::maven::coordinates::{ArtifactRequest, MavenCoordinates};
use crate::maven::effective;
use crate::maven::index;
use crate::maven::paths;
use crate::maven::pom::{self, DependencyScope, PomFile};
use crate::maven::version;
use crate::problems::{Problem, ProblemKind, ProblemLedger};
use crate::store::FsArtifactStore;
use crate::util::digest::{self, DigestKind};
use crate::util::http::{HttpFetcher, HttpResponse};
use crate::util::signature::{SignatureVerdict, SignatureVerifier};

/// Per-coordinate lifecycle. Transitions are monotonic; the three terminal
/// states are absorbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRecord {
    Queued,
    InProgress,
    Resolved { repo_url: String, files: Vec<String> },
    NotFound,
    Failed { reason: String },
}

impl ResolutionRecord {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionRecord::Resolved { .. }
                | ResolutionRecord::NotFound
                | ResolutionRecord::Failed { .. }
        )
    }
}

/// What became of one published file (and its verification companions).
enum FileOutcome {
    /// Content plus every companion that checked out, ready to persist.
    Verified(Vec<(String, Bytes)>),
    Missing,
    TransportFailed,
    DigestMismatch,
    SignatureRejected,
}

pub struct Resolver {
    config: Configuration,
    http: Arc<dyn HttpFetcher>,
    signatures: Arc<dyn SignatureVerifier>,
    store: FsArtifactStore,
    sink: Arc<dyn EventSink>,
    ledger: ProblemLedger,
    records: HashMap<String, ResolutionRecord>,
    worklist: VecDeque<ArtifactRequest>,
    pom_cache: HashMap<String, Option<PomFile>>,
}

impl Resolver {
    pub fn new(
        config: Configuration,
        http: Arc<dyn HttpFetcher>,
        signatures: Arc<dyn SignatureVerifier>,
        sink: Arc<dyn EventSink>,
    ) -> Resolver {
        let mut config = config;
        config.normalise();
        if !signatures.is_enabled() {
            config.no_pgp = true;
        }
        let store = FsArtifactStore::new(&config.output_dir);
        Resolver {
            config,
            http,
            signatures,
            store,
            sink,
            ledger: ProblemLedger::new(),
            records: HashMap::new(),
            worklist: VecDeque::new(),
            pom_cache: HashMap::new(),
        }
    }

    pub fn ledger(&self) -> &ProblemLedger {
        &self.ledger
    }

    pub fn resolution(&self, coordinates: &MavenCoordinates) -> Option<&ResolutionRecord> {
        self.records.get(&coordinates.key())
    }

    pub fn resolutions(&self) -> &HashMap<String, ResolutionRecord> {
        &self.records
    }

    /// Drain the worklist, starting from the seeds. Side effects are files
    /// in the output directory and entries in the problem ledger; the only
    /// hard errors out of here are filesystem ones.
    pub async fn resolve(&mut self, seeds: Vec<ArtifactRequest>) -> anyhow::Result<()> {
        for seed in seeds {
            self.enqueue(seed);
        }
        while let Some(request) = self.worklist.pop_front() {
            let key = request.coordinates.key();
            if matches!(self.records.get(&key), Some(r) if r.is_terminal()) {
                continue;
            }
            self.records.insert(key.clone(), ResolutionRecord::InProgress);
            self.sink
                .progress(&format!("resolving {}", request.coordinates));
            let record = self.resolve_one(&request).await?;
            self.records.insert(key, record);
        }
        Ok(())
    }

    fn enqueue(&mut self, request: ArtifactRequest) {
        let request = request.canonicalised(&self.config.mislabeled_artifact_groups);
        let key = request.coordinates.key();
        if self.records.contains_key(&key) {
            return;
        }
        self.sink.debug(&format!("queueing {}", request.coordinates));
        self.records.insert(key, ResolutionRecord::Queued);
        self.worklist.push_back(request);
    }

    fn add_problem(
        &self,
        kind: ProblemKind,
        coordinate: Option<String>,
        url: Option<String>,
        message: String,
        recoverable: bool,
    ) {
        let problem = Problem {
            kind,
            coordinate,
            url,
            message,
            recoverable,
        };
        if self.ledger.record(problem.clone()) {
            self.sink.problem(&problem);
        }
    }

    async fn resolve_one(&mut self, request: &ArtifactRequest) -> anyhow::Result<ResolutionRecord> {
        let coords = &request.coordinates;
        self.sink.info(&coords.to_string());

        if self.config.check_in_local {
            for base in self.config.local_repo_urls.clone() {
                if let Some(record) = self.try_repository(&base, request, true).await? {
                    return Ok(record);
                }
            }
        }
        for base in self.config.remote_repo_urls.clone() {
            if let Some(record) = self.try_repository(&base, request, false).await? {
                return Ok(record);
            }
        }

        self.add_problem(
            ProblemKind::NotFound,
            Some(coords.key()),
            None,
            format!("did not find {} in any configured repository", coords),
            false,
        );
        Ok(ResolutionRecord::NotFound)
    }

    /// Probe one repository. `None` means "not here, try the next one";
    /// `Some` means this repository claimed the coordinate, for better or
    /// worse.
    async fn try_repository(
        &mut self,
        base: &str,
        request: &ArtifactRequest,
        local: bool,
    ) -> anyhow::Result<Option<ResolutionRecord>> {
        let coords = request.coordinates.clone();
        let directory_url = paths::directory_url(base, &coords);

        if local {
            // cheap probe before scraping a directory that may not exist
            match self.http.head(&directory_url).await {
                Ok(status) if (200..400).contains(&status) => {}
                _ => return Ok(None),
            }
        }

        let listing = match self.list_directory(&directory_url).await {
            Some(listing) => listing,
            None => return Ok(None),
        };

        let pom_name = paths::pom_file_name(&coords);
        if !listing.contains(&pom_name) {
            self.sink
                .debug(&format!("{} does not list {}", directory_url, pom_name));
            return Ok(None);
        }

        let pom_url = format!("{}{}", directory_url, pom_name);
        let pom_response = match self.fetch_with_retry(&pom_url).await {
            Ok(response) => response,
            Err(e) => {
                self.add_problem(
                    ProblemKind::HttpError,
                    Some(coords.key()),
                    Some(pom_url.clone()),
                    format!("failed to download POM: {:#}", e),
                    false,
                );
                return Ok(Some(ResolutionRecord::Failed {
                    reason: "POM download failed".to_string(),
                }));
            }
        };
        if pom_response.is_not_found() {
            return Ok(None);
        }
        if !pom_response.is_success() {
            self.add_problem(
                ProblemKind::HttpError,
                Some(coords.key()),
                Some(pom_url.clone()),
                format!("HTTP {} downloading POM", pom_response.status),
                false,
            );
            return Ok(Some(ResolutionRecord::Failed {
                reason: format!("HTTP {} downloading POM", pom_response.status),
            }));
        }

        let pom_text = String::from_utf8_lossy(&pom_response.body).into_owned();
        let parsed = match pom::parse_pom(&pom_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.add_problem(
                    ProblemKind::XmlParseError,
                    Some(coords.key()),
                    Some(pom_url),
                    format!("failed to parse POM: {:#}", e),
                    false,
                );
                return Ok(Some(ResolutionRecord::Failed {
                    reason: "unparseable POM".to_string(),
                }));
            }
        };

        let packaging = request
            .packaging
            .clone()
            .unwrap_or_else(|| parsed.packaging.clone());
        let needs_primary = packaging != "pom";
        let primary_name =
            paths::primary_file_name(&coords, request.classifier.as_deref(), &packaging);
        if needs_primary && !listing.contains(&primary_name) {
            self.sink.debug(&format!(
                "{} does not list {}; trying the next repository",
                directory_url, primary_name
            ));
            return Ok(None);
        }

        let record = if local {
            self.complete_local(base, parsed).await
        } else {
            self.complete_remote(
                base,
                &directory_url,
                &listing,
                parsed,
                &pom_name,
                pom_response.body,
                needs_primary.then_some(primary_name.as_str()),
            )
            .await?
        };
        Ok(Some(record))
    }

    /// A local-repository hit suppresses downloads, but the POM is still
    /// parsed so recursion stays transitive across local and remote.
    async fn complete_local(&mut self, base: &str, parsed: PomFile) -> ResolutionRecord {
        self.sink.info(&format!(
            "  *> using local repository artifact {} from {}",
            parsed.id(),
            base
        ));
        let effective_pom = self.effective_pom(parsed).await;
        match license::evaluate(&effective_pom.licenses, &self.config) {
            LicenseDecision::Accepted => {}
            LicenseDecision::Tolerated { message } => {
                self.add_problem(
                    ProblemKind::LicenseRejected,
                    Some(effective_pom.id()),
                    None,
                    message,
                    true,
                );
            }
            LicenseDecision::Rejected { message } => {
                self.add_problem(
                    ProblemKind::LicenseRejected,
                    Some(effective_pom.id()),
                    None,
                    message,
                    false,
                );
            }
        }
        self.expand_dependencies(&effective_pom);
        ResolutionRecord::Resolved {
            repo_url: base.to_string(),
            files: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn complete_remote(
        &mut self,
        base: &str,
        directory_url: &str,
        listing: &[String],
        parsed: PomFile,
        pom_name: &str,
        pom_bytes: Bytes,
        primary_name: Option<&str>,
    ) -> anyhow::Result<ResolutionRecord> {
        let coords = parsed.coordinates();
        let candidates = index::with_verification_siblings(listing);
        let mut persisted: Vec<String> = Vec::new();

        // The POM first: it is mandatory, and it must be on disk even when
        // the license policy later rejects the artifact, because dependency
        // expansion needs it.
        let pom_bundle = match self
            .fetch_and_verify(
                directory_url,
                &candidates,
                pom_name,
                Some(pom_bytes),
                &coords,
                true,
            )
            .await
        {
            FileOutcome::Verified(bundle) => bundle,
            FileOutcome::DigestMismatch => {
                return Ok(ResolutionRecord::Failed {
                    reason: format!("checksum mismatch on {}", pom_name),
                })
            }
            FileOutcome::SignatureRejected => {
                return Ok(ResolutionRecord::Failed {
                    reason: format!("signature rejected on {}", pom_name),
                })
            }
            FileOutcome::Missing | FileOutcome::TransportFailed => {
                return Ok(ResolutionRecord::Failed {
                    reason: format!("could not download {}", pom_name),
                })
            }
        };
        if self.config.do_remote_download {
            for (name, data) in &pom_bundle {
                if self.store.write(name, data, self.config.overwrite).await? {
                    persisted.push(name.clone());
                }
            }
        }

        let effective_pom = self.effective_pom(parsed).await;

        let persist_rest = match license::evaluate(&effective_pom.licenses, &self.config) {
            LicenseDecision::Accepted => true,
            LicenseDecision::Tolerated { message } => {
                self.add_problem(
                    ProblemKind::LicenseRejected,
                    Some(coords.key()),
                    None,
                    message,
                    true,
                );
                true
            }
            LicenseDecision::Rejected { message } => {
                self.add_problem(
                    ProblemKind::LicenseRejected,
                    Some(coords.key()),
                    None,
                    message,
                    false,
                );
                self.sink.warn(&format!(
                    "{} - license rejected; keeping only the POM",
                    coords
                ));
                false
            }
        };

        // remaining content files, primary first so a bad mandatory file
        // fails the coordinate before effort goes into auxiliaries
        let mut content_names: Vec<String> = listing
            .iter()
            .filter(|name| {
                name.as_str() != pom_name
                    && !name.ends_with(".md5")
                    && !name.ends_with(".sha1")
                    && !name.ends_with(".asc")
            })
            .cloned()
            .collect();
        content_names.sort_by_key(|name| Some(name.as_str()) != primary_name);

        let mut failure: Option<String> = None;
        for name in &content_names {
            let mandatory = Some(name.as_str()) == primary_name;
            if !self.config.overwrite && self.store.has(name).await {
                self.sink.debug(&format!("skipping existing file {}", name));
                persisted.push(name.clone());
                continue;
            }
            match self
                .fetch_and_verify(directory_url, &candidates, name, None, &coords, mandatory)
                .await
            {
                FileOutcome::Verified(bundle) => {
                    if persist_rest && self.config.do_remote_download {
                        for (file_name, data) in &bundle {
                            if self
                                .store
                                .write(file_name, data, self.config.overwrite)
                                .await?
                            {
                                persisted.push(file_name.clone());
                            }
                        }
                    }
                }
                FileOutcome::Missing | FileOutcome::TransportFailed => {
                    if mandatory {
                        failure = Some(format!("could not download {}", name));
                        break;
                    }
                    self.sink
                        .info(&format!("  !> auxiliary file {} not downloaded", name));
                }
                FileOutcome::DigestMismatch => {
                    if mandatory {
                        failure = Some(format!("checksum mismatch on {}", name));
                        break;
                    }
                }
                FileOutcome::SignatureRejected => {
                    if mandatory {
                        failure = Some(format!("signature rejected on {}", name));
                        break;
                    }
                }
            }
        }
        if let Some(reason) = failure {
            return Ok(ResolutionRecord::Failed { reason });
        }

        self.expand_dependencies(&effective_pom);
        self.sink.info(&format!(
            "  -> {} resolved from {} ({} files)",
            coords,
            base,
            persisted.len()
        ));
        Ok(ResolutionRecord::Resolved {
            repo_url: base.to_string(),
            files: persisted,
        })
    }

    /// Fetch one content file and its checksum/signature companions, and
    /// verify everything that arrived. A missing checksum file is only a
    /// warning; a checksum that disagrees with the payload is not.
    async fn fetch_and_verify(
        &self,
        directory_url: &str,
        candidates: &[(String, bool)],
        name: &str,
        preloaded: Option<Bytes>,
        coords: &MavenCoordinates,
        mandatory: bool,
    ) -> FileOutcome {
        let body = match preloaded {
            Some(body) => body,
            None => {
                let url = format!("{}{}", directory_url, name);
                self.sink.progress(&format!("downloading {}", url));
                match self.fetch_with_retry(&url).await {
                    Ok(response) if response.is_success() => response.body,
                    Ok(response) if response.is_not_found() => {
                        if mandatory {
                            self.add_problem(
                                ProblemKind::NotFound,
                                Some(coords.key()),
                                Some(url),
                                format!("listed file {} was not downloadable", name),
                                false,
                            );
                        }
                        return FileOutcome::Missing;
                    }
                    Ok(response) => {
                        self.add_problem(
                            ProblemKind::HttpError,
                            Some(coords.key()),
                            Some(url),
                            format!("HTTP {} downloading {}", response.status, name),
                            !mandatory,
                        );
                        return FileOutcome::TransportFailed;
                    }
                    Err(e) => {
                        self.add_problem(
                            ProblemKind::HttpError,
                            Some(coords.key()),
                            Some(url),
                            format!("failed to download {}: {:#}", name, e),
                            !mandatory,
                        );
                        return FileOutcome::TransportFailed;
                    }
                }
            }
        };

        let mut bundle: Vec<(String, Bytes)> = vec![(name.to_string(), body.clone())];

        for kind in [DigestKind::Md5, DigestKind::Sha1] {
            match self
                .check_digest(directory_url, candidates, name, &body, kind, coords, mandatory)
                .await
            {
                Ok(Some(companion)) => bundle.push(companion),
                Ok(None) => {}
                Err(()) => return FileOutcome::DigestMismatch,
            }
        }

        let signature_name = format!("{}.asc", name);
        if let Some((_, _listed)) = candidates.iter().find(|(n, _)| n == &signature_name) {
            let url = format!("{}{}", directory_url, signature_name);
            match self.fetch_with_retry(&url).await {
                Ok(response) if response.is_success() => {
                    let signature = response.body;
                    // signature files carry their own checksums
                    for kind in [DigestKind::Md5, DigestKind::Sha1] {
                        match self
                            .check_digest(
                                directory_url,
                                candidates,
                                &signature_name,
                                &signature,
                                kind,
                                coords,
                                false,
                            )
                            .await
                        {
                            Ok(Some(companion)) => bundle.push(companion),
                            Ok(None) => {}
                            Err(()) => {}
                        }
                    }
                    if !self.config.no_pgp {
                        match self
                            .signatures
                            .verify(&body, &signature, &self.config.pgp_key_servers)
                            .await
                        {
                            SignatureVerdict::Valid => {
                                self.sink
                                    .debug(&format!("  ~> PGP signature valid for {}", name));
                            }
                            SignatureVerdict::Skipped | SignatureVerdict::Unavailable => {
                                self.sink
                                    .debug(&format!("  - skipped PGP signature check of {}", name));
                            }
                            SignatureVerdict::InvalidSignature => {
                                self.add_problem(
                                    ProblemKind::SignatureInvalid,
                                    Some(coords.key()),
                                    Some(url),
                                    format!("PGP signature validation failed for {}", name),
                                    !mandatory,
                                );
                                return FileOutcome::SignatureRejected;
                            }
                            SignatureVerdict::KeyNotFound => {
                                self.add_problem(
                                    ProblemKind::SignatureKeyMissing,
                                    Some(coords.key()),
                                    Some(url),
                                    format!("no public key to validate signature of {}", name),
                                    !mandatory,
                                );
                                return FileOutcome::SignatureRejected;
                            }
                        }
                    }
                    bundle.push((signature_name, signature));
                }
                _ => {
                    self.sink
                        .debug(&format!("  - no signature published for {}", name));
                }
            }
        }

        FileOutcome::Verified(bundle)
    }

    /// `Ok(Some(..))` hands back a matching checksum file for persistence,
    /// `Ok(None)` means no usable checksum exists, `Err` is a mismatch.
    #[allow(clippy::too_many_arguments)]
    async fn check_digest(
        &self,
        directory_url: &str,
        candidates: &[(String, bool)],
        name: &str,
        body: &Bytes,
        kind: DigestKind,
        coords: &MavenCoordinates,
        mandatory: bool,
    ) -> Result<Option<(String, Bytes)>, ()> {
        let sibling = format!("{}.{}", name, kind.file_extension());
        let listed = match candidates.iter().find(|(n, _)| n == &sibling) {
            Some((_, listed)) => *listed,
            None => return Ok(None),
        };
        let url = format!("{}{}", directory_url, sibling);
        let response = match self.fetch_with_retry(&url).await {
            Ok(response) if response.is_success() => response,
            _ => {
                if listed {
                    self.sink.info(&format!(
                        "  !> {} has no {} file",
                        name,
                        kind.file_extension()
                    ));
                }
                return Ok(None);
            }
        };
        self.sink
            .progress(&format!("verify {} {}", kind.file_extension(), name));
        let text = String::from_utf8_lossy(&response.body);
        match digest::matches(body, kind, &text) {
            Some(true) => Ok(Some((sibling, response.body))),
            Some(false) => {
                self.add_problem(
                    ProblemKind::DigestMismatch,
                    Some(coords.key()),
                    Some(url),
                    format!(
                        "{} does not match its downloaded {} checksum",
                        name,
                        kind.file_extension()
                    ),
                    !mandatory,
                );
                Err(())
            }
            None => {
                self.add_problem(
                    ProblemKind::DigestMismatch,
                    Some(coords.key()),
                    Some(url),
                    format!("{} holds no usable {} digest", sibling, kind.file_extension()),
                    !mandatory,
                );
                Err(())
            }
        }
    }

    async fn list_directory(&self, directory_url: &str) -> Option<Vec<String>> {
        self.sink.progress(&format!("listing {}", directory_url));
        let response = match self.fetch_with_retry(directory_url).await {
            Ok(response) => response,
            Err(e) => {
                self.add_problem(
                    ProblemKind::HttpError,
                    None,
                    Some(directory_url.to_string()),
                    format!("failed to list directory: {:#}", e),
                    true,
                );
                return None;
            }
        };
        if !response.is_success() || response.body.is_empty() {
            return None;
        }
        let html = String::from_utf8_lossy(&response.body);
        let names = index::extract_file_names(&html, directory_url);
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }

    async fn fetch_with_retry(&self, url: &str) -> anyhow::Result<HttpResponse> {
        match self.http.get(url).await {
            Ok(response) => Ok(response),
            Err(first) => {
                self.sink
                    .debug(&format!("retrying {} after error: {:#}", url, first));
                self.http.get(url).await
            }
        }
    }

    /// Compose the effective POM: walk and merge the parent chain, then pull
    /// managed entries out of import-scoped BOMs.
    async fn effective_pom(&mut self, parsed: PomFile) -> PomFile {
        let mut pom = parsed;
        self.merge_parent_chain(&mut pom).await;

        let mut seen_imports: HashSet<String> = HashSet::new();
        loop {
            let context = effective::substitution_context(&pom);
            let imports: Vec<MavenCoordinates> = pom
                .managed_dependencies
                .iter()
                .filter(|m| {
                    m.scope == DependencyScope::Import && m.dep_type.as_deref() == Some("pom")
                })
                .filter_map(|m| {
                    let mut entry = m.clone();
                    effective::apply_properties(&mut entry, &context);
                    let complete = !entry.group_id.is_empty()
                        && !entry.artifact_id.is_empty()
                        && !entry.version.is_empty()
                        && !entry.version.contains("${")
                        && !version::is_version_range(&entry.version);
                    complete.then(|| {
                        MavenCoordinates::new(&entry.group_id, &entry.artifact_id, &entry.version)
                    })
                })
                .filter(|c| !seen_imports.contains(&c.key()))
                .collect();
            if imports.is_empty() {
                break;
            }
            for bom_coords in imports {
                seen_imports.insert(bom_coords.key());
                match self.load_merged_pom(&bom_coords).await {
                    Some(bom) => {
                        self.sink
                            .debug(&format!("importing managed entries from {}", bom_coords));
                        let bom_context = effective::substitution_context(&bom);
                        for mut entry in bom.managed_dependencies {
                            effective::apply_properties(&mut entry, &bom_context);
                            pom.managed_dependencies.push(entry);
                        }
                    }
                    None => {
                        self.add_problem(
                            ProblemKind::NotFound,
                            Some(pom.id()),
                            None,
                            format!("could not find imported BOM {}", bom_coords),
                            true,
                        );
                    }
                }
            }
        }
        pom
    }

    /// Parents form a finite chain; fetch it iteratively (memoised) and fold
    /// the topmost ancestor downwards so child entries always win.
    async fn merge_parent_chain(&mut self, pom: &mut PomFile) {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(pom.coordinates().key());

        let mut chain: Vec<PomFile> = Vec::new();
        let mut next = pom.parent.clone();
        while let Some(parent_ref) = next {
            if parent_ref.group_id.is_empty()
                || parent_ref.artifact_id.is_empty()
                || parent_ref.version.is_empty()
            {
                self.sink.warn(&format!(
                    "{} declares an incomplete parent reference",
                    pom.id()
                ));
                break;
            }
            let parent_coords = parent_ref.coordinates();
            if !visited.insert(parent_coords.key()) {
                self.sink
                    .warn(&format!("parent cycle detected at {}", parent_coords));
                break;
            }
            match self.load_pom(&parent_coords).await {
                Some(parent) => {
                    next = parent.parent.clone();
                    chain.push(parent);
                }
                None => {
                    self.add_problem(
                        ProblemKind::NotFound,
                        Some(pom.id()),
                        None,
                        format!("could not find declared parent {}", parent_coords),
                        true,
                    );
                    break;
                }
            }
        }

        for i in (1..chain.len()).rev() {
            let (descendants, ancestors) = chain.split_at_mut(i);
            effective::merge_parent(&mut descendants[i - 1], &ancestors[0]);
        }
        if let Some(parent) = chain.first() {
            effective::merge_parent(pom, parent);
        }
    }

    async fn load_merged_pom(&mut self, coords: &MavenCoordinates) -> Option<PomFile> {
        let mut pom = self.load_pom(coords).await?;
        self.merge_parent_chain(&mut pom).await;
        Some(pom)
    }

    /// Fetch and parse a POM without resolving the whole artifact: from the
    /// output directory if already downloaded, then local repositories, then
    /// remote ones. Negative results are cached too.
    async fn load_pom(&mut self, coords: &MavenCoordinates) -> Option<PomFile> {
        let key = coords.key();
        if let Some(cached) = self.pom_cache.get(&key) {
            return cached.clone();
        }
        let loaded = self.load_pom_uncached(coords).await;
        self.pom_cache.insert(key, loaded.clone());
        loaded
    }

    async fn load_pom_uncached(&self, coords: &MavenCoordinates) -> Option<PomFile> {
        self.sink.progress(&format!("loading pom {}", coords));
        let pom_name = paths::pom_file_name(coords);

        if self.store.has(&pom_name).await {
            if let Ok(text) = tokio::fs::read_to_string(self.store.file_path(&pom_name)).await {
                return self.parse_loaded_pom(coords, &text, None);
            }
        }

        let mut bases: Vec<String> = Vec::new();
        if self.config.check_in_local {
            bases.extend(self.config.local_repo_urls.iter().cloned());
        }
        bases.extend(self.config.remote_repo_urls.iter().cloned());
        for base in bases {
            let url = format!("{}{}", paths::directory_url(&base, coords), pom_name);
            match self.fetch_with_retry(&url).await {
                Ok(response) if response.is_success() && !response.body.is_empty() => {
                    let text = String::from_utf8_lossy(&response.body).into_owned();
                    return self.parse_loaded_pom(coords, &text, Some(url));
                }
                _ => continue,
            }
        }
        None
    }

    fn parse_loaded_pom(
        &self,
        coords: &MavenCoordinates,
        text: &str,
        url: Option<String>,
    ) -> Option<PomFile> {
        match pom::parse_pom(text) {
            Ok(mut parsed) => {
                // half-declared POMs inherit their identity from the lookup
                if parsed.group_id.is_empty() {
                    parsed.group_id = coords.group_id.0.clone();
                }
                if parsed.version.is_empty() {
                    parsed.version = coords.version.clone();
                }
                Some(parsed)
            }
            Err(e) => {
                self.add_problem(
                    ProblemKind::XmlParseError,
                    Some(coords.key()),
                    url,
                    format!("failed to parse POM: {:#}", e),
                    true,
                );
                None
            }
        }
    }

    /// Turn the effective POM's dependency list into new worklist entries.
    fn expand_dependencies(&mut self, pom: &PomFile) {
        let context = effective::substitution_context(pom);
        let mut candidates = pom.dependencies.clone();
        if self.config.include_dep_management {
            candidates.extend(pom.managed_dependencies.iter().cloned());
        }

        let mut edges: Vec<ArtifactRequest> = Vec::new();
        for mut dep in candidates {
            if dep.optional {
                self.sink
                    .debug(&format!("skipping optional dependency {}", dep.id()));
                continue;
            }
            if !dep.scope.feeds_recursion() {
                self.sink
                    .debug(&format!("skipping non-runtime dependency {}", dep.id()));
                continue;
            }
            effective::apply_properties(&mut dep, &context);
            if dep.group_id.is_empty() {
                dep.group_id = pom.group_id.clone();
            }
            if dep.version.is_empty() {
                if let Some(managed) =
                    effective::managed_entry(&pom.managed_dependencies, &dep.group_id, &dep.artifact_id)
                {
                    let outcome = effective::substitute(&managed.version, &context);
                    dep.version = outcome.value;
                }
            }
            if dep.version.is_empty() && dep.group_id == pom.group_id {
                dep.version = pom.version.clone();
            }
            if dep.version.is_empty() {
                self.sink.debug(&format!(
                    "skipping dependency {} without a resolvable version",
                    dep.id()
                ));
                continue;
            }
            if [&dep.group_id, &dep.artifact_id, &dep.version]
                .iter()
                .any(|field| field.contains("${"))
            {
                self.add_problem(
                    ProblemKind::UnresolvedProperty,
                    Some(dep.id()),
                    None,
                    format!("unresolved property in dependency of {}", pom.id()),
                    true,
                );
                continue;
            }
            if version::is_version_range(&dep.version) {
                self.add_problem(
                    ProblemKind::VersionRangeUnsupported,
                    Some(dep.id()),
                    None,
                    format!("version ranges are not supported (declared by {})", pom.id()),
                    true,
                );
                continue;
            }
            edges.push(ArtifactRequest {
                coordinates: MavenCoordinates::new(&dep.group_id, &dep.artifact_id, &dep.version),
                classifier: dep.classifier.clone(),
                packaging: dep.dep_type.clone(),
            });
        }

        if self.config.recursive {
            for edge in edges {
                self.enqueue(edge);
            }
        } else if !edges.is_empty() {
            self.sink.debug(&format!(
                "not recursing into {} dependencies of {}",
                edges.len(),
                pom.id()
            ));
        }
    }
}
