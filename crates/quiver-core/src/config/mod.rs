mod dirs;
mod settings;

pub use dirs::Directories;
pub use settings::{CatalogConfig, Config, SearchConfig};
