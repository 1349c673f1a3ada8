use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directories following XDG spec
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/quiver)
    pub config: PathBuf,

    /// Data directory (~/.local/share/quiver)
    pub data: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Indexed catalog file
    pub catalog_file: PathBuf,

    /// Executed-command history file
    pub history_file: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with standard XDG paths.
    ///
    /// # Panics
    ///
    /// Panics if the system's project directories cannot be determined.
    #[must_use]
    pub fn new() -> Self {
        let project =
            ProjectDirs::from("", "", "quiver").expect("Failed to determine project directories");

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();

        Self {
            config_file: config.join("config.json"),
            catalog_file: data.join("catalog.json"),
            history_file: data.join("history.json"),
            config,
            data,
        }
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            catalog_file: base.join("catalog.json"),
            history_file: base.join("history.json"),
            config: base.clone(),
            data: base,
        }
    }

    /// Ensure all directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.data)?;
        Ok(())
    }
}

impl Default for Directories {
    fn default() -> Self {
        Self::new()
    }
}
