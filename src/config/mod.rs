//! Configuration module: the persisted shortcut document and its store.
//!
//! Loading is lenient (any file is repaired into a usable document), while
//! explicit submissions go through strict validation that reports every
//! violation.

mod normalize;
mod path;
mod schema;
mod settings;
mod store;
mod validate;

pub use normalize::{Normalized, normalize_lenient};
pub use path::{CONFIG_FILE, ICONS_PREFIX, StorePaths, sanitize_icon_path};
pub use schema::{
    ActionType, CONFIG_VERSION, Configuration, KEY_COUNT, MAX_LABEL_LEN, ProfileId, Shortcut,
    default_shortcuts,
};
pub use settings::{SETTINGS_FILE, Settings};
pub use store::{ConfigStore, ReadOutcome};
pub use validate::{validate_strict, validate_strict_error};
