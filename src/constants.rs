//! Application-wide constants
//!
//! Storage keys, paths and environment variable names used by both sessions,
//! kept in one place so the on-disk format has a single source of truth.

/// Persisted storage keys (one JSON record per session)
pub mod storage {
    /// Key holding the layout session's config record
    pub const LAYOUT_KEY: &str = "appMainLayoutConfig";

    /// Key holding the theme session's config record
    pub const THEME_KEY: &str = "appThemeConfig";

    /// Extension used by the file-backed store for each key
    pub const FILE_EXTENSION: &str = "json";
}

/// Filesystem locations
pub mod paths {
    /// Directory under the platform config dir holding the stored records
    pub const APP_DIR: &str = "appshell-prefs";
}

/// Environment variables read by the CLI
pub mod env {
    /// Log level override (trace, debug, info, warn, error)
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Override for the store directory
    pub const STORE_DIR: &str = "APPSHELL_PREFS_DIR";
}

/// Theme surface constants
pub mod theme {
    /// Class present on the document root while dark mode is displayed
    pub const DARK_CLASS: &str = "app-dark";

    /// Default design preset
    pub const DEFAULT_PRESET: &str = "Aura";

    /// Default primary palette
    pub const DEFAULT_PRIMARY: &str = "emerald";
}
