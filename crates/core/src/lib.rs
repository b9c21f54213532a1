pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod normalize;
pub mod organizer;
pub mod placer;
pub mod run_log;

pub use classifier::{
    build_prompt, parse_destinations, GeminiClient, LanguageModel, ParsedDestinations,
    ALLOWED_CONTINENTS,
};
pub use config::{CollisionPolicy, OrganizerConfig, PlacementMode, UnclassifiedPolicy};
pub use error::{ConfigError, OrganizeError, Result};
pub use extractor::{extract_document, LopdfExtractor, PageText, PdfExtractor};
pub use models::{
    Classification, Document, FileOutcome, FileStage, NormalizedLocation, PlaceOutcome,
    Placement, UNKNOWN,
};
pub use normalize::{normalize_city, normalize_continent, normalize_country, normalize_location};
pub use organizer::{discover_pdf_files, BatchReport, FileReport, Organizer};
pub use placer::{destination_dir, place_file, plan_placement, sanitize_component, Transfer};
pub use run_log::RunLog;
