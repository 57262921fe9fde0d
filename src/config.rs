use std::path::PathBuf;

/// Server configuration, loaded from environment variables with defaults
/// suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to bind (PORT)
    pub port: u16,
    /// SQLite database path (DATABASE_PATH)
    pub database_path: String,
    /// Directory served as the site root (STATIC_DIR)
    pub static_dir: PathBuf,
    /// Directory uploaded files are written to, under the static root so
    /// they are directly downloadable.
    pub upload_dir: PathBuf,
}

impl ServerConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "medcase.db".to_string());
        let static_dir =
            PathBuf::from(std::env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()));
        let upload_dir = static_dir.join("uploads");

        Self {
            port,
            database_path,
            static_dir,
            upload_dir,
        }
    }
}
