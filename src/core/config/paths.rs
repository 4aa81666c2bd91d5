use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_path: PathBuf,
    pub memory_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Lay out every path under an explicit data directory.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let memory_dir = user_data_dir.join("memory");
        let index_path = user_data_dir.join("index.db");
        let secrets_path = user_data_dir.join("secrets.yaml");

        // Best effort; opening the index or a session file reports real failures.
        for dir in [&user_data_dir, &log_dir, &memory_dir] {
            let _ = fs::create_dir_all(dir);
        }

        Self {
            index_path,
            memory_dir,
            secrets_path,
            log_dir,
            user_data_dir,
            project_root,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// `BUDDY_ROOT`, else the crate directory when it holds a `config.yml`,
/// else the working directory.
fn discover_project_root() -> PathBuf {
    if let Some(root) = env::var_os("BUDDY_ROOT") {
        return PathBuf::from(root);
    }
    let crate_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    if crate_dir.join("config.yml").is_file() {
        return crate_dir.to_path_buf();
    }
    env::current_dir().unwrap_or_else(|_| crate_dir.to_path_buf())
}

/// `BUDDY_DATA_DIR`, else `<root>/data` in debug builds, else the platform's
/// per-user data directory.
fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Some(dir) = env::var_os("BUDDY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if cfg!(debug_assertions) {
        return project_root.join("data");
    }
    platform_data_dir()
}

fn platform_data_dir() -> PathBuf {
    let var = |name: &str| env::var_os(name).map(PathBuf::from);
    let home = var("HOME").or_else(|| var("USERPROFILE")).unwrap_or_else(|| PathBuf::from("."));

    if cfg!(target_os = "windows") {
        var("LOCALAPPDATA").unwrap_or(home).join("AlsBuddy")
    } else if cfg!(target_os = "macos") {
        home.join("Library/Application Support/AlsBuddy")
    } else {
        var("XDG_DATA_HOME")
            .unwrap_or_else(|| home.join(".local/share"))
            .join("als-buddy")
    }
}
