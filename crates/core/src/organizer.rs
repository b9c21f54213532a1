use crate::classifier::{build_prompt, parse_destinations, LanguageModel};
use crate::config::{OrganizerConfig, PlacementMode, UnclassifiedPolicy};
use crate::error::OrganizeError;
use crate::extractor::{extract_document, PdfExtractor};
use crate::models::{FileOutcome, FileStage, NormalizedLocation, PlaceOutcome, Placement};
use crate::normalize::normalize_location;
use crate::placer::{place_file, plan_placement, sanitize_component, Transfer};
use crate::run_log::RunLog;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// PDFs directly inside `folder`, sorted by path. Subfolders are not visited.
///
/// A folder that cannot be read at all is an error; an entry inside it that
/// cannot be read is logged and skipped.
pub fn discover_pdf_files(folder: &Path) -> Result<Vec<PathBuf>, OrganizeError> {
    let mut files = Vec::new();

    for item in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => {
                return Err(OrganizeError::SourceListing {
                    path: folder.to_path_buf(),
                    source: error,
                });
            }
            Err(error) => {
                warn!(
                    path = ?error.path(),
                    error = %error,
                    "skipping unreadable source entry"
                );
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|file| predicate(&file.outcome)).count()
    }

    pub fn placed(&self) -> usize {
        self.count(|outcome| match outcome {
            FileOutcome::Placed { results, .. } => !all_refused(results),
            _ => false,
        })
    }

    /// Files whose every destination already held a different file of the same name.
    pub fn refused(&self) -> usize {
        self.count(|outcome| match outcome {
            FileOutcome::Placed { results, .. } => all_refused(results),
            _ => false,
        })
    }

    pub fn ignored(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Ignored { .. }))
    }

    pub fn unclassified(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Unclassified { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Failed { .. }))
    }

    pub fn summary(&self) -> String {
        format!(
            "files={} placed={} refused={} ignored={} unclassified={} failed={}",
            self.files.len(),
            self.placed(),
            self.refused(),
            self.ignored(),
            self.unclassified(),
            self.failed()
        )
    }
}

fn all_refused(results: &[PlaceOutcome]) -> bool {
    !results.is_empty()
        && results
            .iter()
            .all(|result| matches!(result, PlaceOutcome::Refused(_)))
}

/// Runs every PDF of the source folder through extract, classify, normalize
/// and place, one file at a time. A failing file never stops the batch.
pub struct Organizer<E, M>
where
    E: PdfExtractor,
    M: LanguageModel,
{
    config: OrganizerConfig,
    extractor: E,
    model: M,
}

impl<E, M> Organizer<E, M>
where
    E: PdfExtractor,
    M: LanguageModel,
{
    pub fn new(config: OrganizerConfig, extractor: E, model: M) -> Self {
        Self {
            config,
            extractor,
            model,
        }
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Fails only when the source folder itself cannot be listed; every
    /// per-file problem ends up in the report instead.
    pub fn run(&self, log: &mut RunLog) -> Result<BatchReport, OrganizeError> {
        log.header("START");
        let files = match discover_pdf_files(&self.config.source_dir) {
            Ok(files) => files,
            Err(error) => {
                warn!(error = %error, "run aborted");
                log.general(&format!("[ABORTED] {error}"));
                log.header("END");
                return Err(error);
            }
        };
        info!(
            source = %self.config.source_dir.display(),
            file_count = files.len(),
            dry_run = self.config.dry_run,
            run_id = %log.run_id(),
            "organizing pdf files"
        );

        let mut report = BatchReport::default();
        for path in files {
            let outcome = self.process_file(&path, log);
            report.files.push(FileReport { path, outcome });
        }

        log.general(&format!("[SUMMARY] {}", report.summary()));
        log.header("END");
        Ok(report)
    }

    pub fn process_file(&self, path: &Path, log: &mut RunLog) -> FileOutcome {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        if let Some(keyword) = self.config.matching_ignore_keyword(&file_name) {
            info!(file = %file_name, keyword, "ignored by keyword");
            log.general(&format!("[IGNORED] {file_name} (keyword \"{keyword}\")"));
            return FileOutcome::Ignored {
                keyword: keyword.to_string(),
            };
        }

        match self.classify_and_place(path, &file_name, log) {
            Ok(outcome) => outcome,
            Err(error) => {
                let stage = error.stage();
                warn!(file = %file_name, stage = %stage, kind = error.kind(), error = %error, "file failed");
                log.general(&format!(
                    "[FAILED stage={stage} kind={}] {file_name}: {error}",
                    error.kind()
                ));
                FileOutcome::Failed {
                    stage,
                    kind: error.kind(),
                    reason: error.to_string(),
                }
            }
        }
    }

    fn classify_and_place(
        &self,
        path: &Path,
        file_name: &str,
        log: &mut RunLog,
    ) -> Result<FileOutcome, OrganizeError> {
        let source_name = path
            .file_name()
            .ok_or_else(|| OrganizeError::MissingFileName(path.display().to_string()))?;
        let document = extract_document(&self.extractor, path)?;
        debug!(file = %file_name, stage = %FileStage::Extracted, chars = document.text.len(), "text extracted");

        let prompt = build_prompt(&document, self.config.max_prompt_chars);
        log.general(&format!("\n[PDF] {file_name}"));
        let raw = self.model.generate(&prompt)?;
        log.raw_response(file_name, &raw);

        let parsed = match parse_destinations(&raw) {
            Ok(parsed) => parsed,
            Err(OrganizeError::Parse { reason, raw }) => {
                log.json_error(file_name, &reason, &raw);
                let reason = format!("unparseable reply: {reason}");
                return self.unclassified(path, source_name, file_name, reason, log);
            }
            Err(error) => return Err(error),
        };
        for entry in &parsed.incomplete {
            log.incomplete(file_name, entry);
        }
        debug!(file = %file_name, stage = %FileStage::Classified, destinations = parsed.classifications.len(), "reply parsed");

        let mut locations: Vec<NormalizedLocation> = Vec::new();
        for classification in &parsed.classifications {
            let location = normalize_location(classification);
            if !locations.contains(&location) {
                locations.push(location);
            }
        }
        if locations.is_empty() {
            let reason = "no destinations detected".to_string();
            return self.unclassified(path, source_name, file_name, reason, log);
        }
        debug!(file = %file_name, stage = %FileStage::Normalized, destinations = locations.len(), "destinations normalized");

        let targets: &[NormalizedLocation] = match self.config.placement {
            PlacementMode::Move => &locations[..1],
            PlacementMode::CopyToAll => &locations,
        };

        let mut results = Vec::new();
        for location in targets {
            let placement = plan_placement(&self.config.destination_dir, location, source_name);
            let outcome = match place_file(path, &placement, self.config.collision, self.transfer()) {
                Ok(outcome) => outcome,
                Err(error) => {
                    if !results.is_empty() {
                        log.general(&format!(
                            "[PARTIAL] {file_name}: {} destination(s) placed before failure",
                            results.len()
                        ));
                    }
                    return Err(error);
                }
            };
            self.log_placement(file_name, location, &outcome, log);
            results.push(outcome);
        }

        Ok(FileOutcome::Placed { locations, results })
    }

    fn unclassified(
        &self,
        path: &Path,
        source_name: &OsStr,
        file_name: &str,
        reason: String,
        log: &mut RunLog,
    ) -> Result<FileOutcome, OrganizeError> {
        let bucket = match &self.config.unclassified {
            UnclassifiedPolicy::LeaveInSource => None,
            UnclassifiedPolicy::MoveToBucket { name } => {
                let placement = Placement {
                    directory: self.config.destination_dir.join(sanitize_component(name)),
                    file_name: source_name.to_os_string(),
                };
                Some(place_file(path, &placement, self.config.collision, self.transfer())?)
            }
        };

        match &bucket {
            Some(outcome) => {
                info!(file = %file_name, reason = %reason, target = %outcome.path().display(), "unclassified, sent to bucket");
                log.general(&format!(
                    "[UNCLASSIFIED] {file_name}: {reason} -> {} ({})",
                    outcome.path().display(),
                    outcome.label()
                ));
            }
            None => {
                info!(file = %file_name, reason = %reason, "unclassified, left in source");
                log.general(&format!("[UNCLASSIFIED] {file_name}: {reason} (left in source)"));
            }
        }

        Ok(FileOutcome::Unclassified { reason, bucket })
    }

    fn transfer(&self) -> Transfer {
        if self.config.dry_run {
            return Transfer::DryRun;
        }
        match self.config.placement {
            PlacementMode::Move => Transfer::Move,
            PlacementMode::CopyToAll => Transfer::Copy,
        }
    }

    fn log_placement(
        &self,
        file_name: &str,
        location: &NormalizedLocation,
        outcome: &PlaceOutcome,
        log: &mut RunLog,
    ) {
        let target = outcome.path().display();
        match outcome {
            PlaceOutcome::Refused(_) => {
                warn!(file = %file_name, target = %target, "name collision, file left in place");
                log.general(&format!("[COLLISION] {file_name} -> {target} (refused)"));
            }
            PlaceOutcome::AlreadyPresent(_) => {
                info!(file = %file_name, target = %target, "identical file already placed");
                log.general(&format!("[SKIPPED] {file_name} already at {target}"));
            }
            _ => {
                info!(file = %file_name, location = %location, target = %target, action = outcome.label(), "file placed");
                log.general(&format!(
                    "[PLACED] {file_name} -> {target} ({})",
                    outcome.label()
                ));
            }
        }
    }
}
