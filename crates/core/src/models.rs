use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder used for any location segment the model could not resolve.
pub const UNKNOWN: &str = "Unknown";

/// A PDF and the text pulled out of its first pages.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    /// Display form of the file name; non-UTF-8 bytes are replaced.
    pub file_name: String,
    pub text: String,
}

/// One destination exactly as the model reported it, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub continent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl Classification {
    pub fn new(
        continent: impl Into<String>,
        country: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            continent: Some(continent.into()),
            country: Some(country.into()),
            city: Some(city.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.continent.is_none() && self.country.is_none() && self.city.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedLocation {
    pub continent: String,
    pub country: String,
    pub city: String,
}

impl fmt::Display for NormalizedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.continent, self.country, self.city)
    }
}

/// Where a file is going: the computed folder plus the final file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub directory: PathBuf,
    /// The source's own file name, byte for byte.
    pub file_name: OsString,
}

impl Placement {
    pub fn target(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Pending,
    Extracted,
    Classified,
    Normalized,
    Placed,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::Pending => "pending",
            FileStage::Extracted => "extracted",
            FileStage::Classified => "classified",
            FileStage::Normalized => "normalized",
            FileStage::Placed => "placed",
        };
        f.write_str(name)
    }
}

/// Result of putting one file into one destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOutcome {
    Moved(PathBuf),
    Copied(PathBuf),
    /// Same name and same content already present; source left untouched.
    AlreadyPresent(PathBuf),
    /// Same name, different content, and the collision policy refuses renames.
    Refused(PathBuf),
    /// Dry run: the file would land here.
    Planned(PathBuf),
}

impl PlaceOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PlaceOutcome::Moved(path)
            | PlaceOutcome::Copied(path)
            | PlaceOutcome::AlreadyPresent(path)
            | PlaceOutcome::Refused(path)
            | PlaceOutcome::Planned(path) => path,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaceOutcome::Moved(_) => "moved",
            PlaceOutcome::Copied(_) => "copied",
            PlaceOutcome::AlreadyPresent(_) => "already-present",
            PlaceOutcome::Refused(_) => "refused",
            PlaceOutcome::Planned(_) => "planned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Ignored {
        keyword: String,
    },
    Placed {
        locations: Vec<NormalizedLocation>,
        results: Vec<PlaceOutcome>,
    },
    Unclassified {
        reason: String,
        bucket: Option<PlaceOutcome>,
    },
    Failed {
        stage: FileStage,
        kind: &'static str,
        reason: String,
    },
}
