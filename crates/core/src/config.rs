use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_UNCLASSIFIED_BUCKET: &str = "Unclassified";

/// What to do when the target folder already holds a different file with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Append ` (1)`, ` (2)`, ... to the file stem until the name is free.
    #[default]
    Rename,
    /// Leave the source where it is and log the collision.
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnclassifiedPolicy {
    #[default]
    LeaveInSource,
    /// Move the file to `destination_dir/<name>/`.
    MoveToBucket { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementMode {
    /// Move the file into the first destination the model reported.
    #[default]
    Move,
    /// Copy the file into every reported destination and keep the source.
    CopyToAll,
}

/// Everything a run needs. Built once at startup and borrowed by every stage.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub log_dir: PathBuf,
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub ignore_keywords: Vec<String>,
    pub page_limit: usize,
    pub max_prompt_chars: usize,
    pub collision: CollisionPolicy,
    pub unclassified: UnclassifiedPolicy,
    pub placement: PlacementMode,
    pub dry_run: bool,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("PDFsForOrganizer"),
            destination_dir: PathBuf::from("OrganizerPdfs"),
            log_dir: PathBuf::from("Logs"),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 60,
            ignore_keywords: Vec::new(),
            page_limit: 2,
            max_prompt_chars: 12_000,
            collision: CollisionPolicy::Rename,
            unclassified: UnclassifiedPolicy::LeaveInSource,
            placement: PlacementMode::Move,
            dry_run: false,
        }
    }
}

impl OrganizerConfig {
    /// Checks the settings that must hold before any file is touched.
    ///
    /// Blank ignore keywords are dropped here: an empty substring matches every
    /// file name and would silently skip the whole batch.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.api_key = self.api_key.trim().to_string();
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingCredential);
        }

        if !self.source_dir.exists() {
            return Err(ConfigError::MissingSourceFolder(self.source_dir));
        }
        if !self.source_dir.is_dir() {
            return Err(ConfigError::SourceNotADirectory(self.source_dir));
        }

        if self.page_limit == 0 {
            return Err(ConfigError::InvalidArgument(
                "page limit must be at least 1".to_string(),
            ));
        }
        if self.max_prompt_chars == 0 {
            return Err(ConfigError::InvalidArgument(
                "max prompt chars must be at least 1".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidArgument("model name is empty".to_string()));
        }

        if let UnclassifiedPolicy::MoveToBucket { name } = &self.unclassified {
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed == ".." {
                return Err(ConfigError::InvalidArgument(format!(
                    "unclassified bucket must be a plain folder name: {name:?}"
                )));
            }
        }

        self.ignore_keywords = self
            .ignore_keywords
            .into_iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();

        Ok(self)
    }

    /// First ignore keyword contained in `file_name`, compared case-insensitively.
    pub fn matching_ignore_keyword(&self, file_name: &str) -> Option<&str> {
        let lowered = file_name.to_lowercase();
        self.ignore_keywords
            .iter()
            .map(String::as_str)
            .filter(|keyword| !keyword.is_empty())
            .find(|keyword| lowered.contains(&keyword.to_lowercase()))
    }
}
