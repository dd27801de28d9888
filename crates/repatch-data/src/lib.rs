pub mod loader;
pub mod schema;

pub use loader::{RuleLoadError, load_rule_file, load_rule_set};
