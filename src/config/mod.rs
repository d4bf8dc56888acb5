pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{apply_patches, check_patches, ApplicationError, PatchReport, PatchResult};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{Metadata, PatchConfig, PatchDefinition, ValidationError, ValidationIssue};
pub use version::{matches_requirement, parse_host_version, VersionError};
