pub mod build_info;
pub mod persistence;

use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Once,
};

use dirs::home_dir;

use crate::errors::Result;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIR_NAME: &str = ".settle_core";
const GROUPS_DIR: &str = "groups";
const HOME_ENV: &str = "SETTLE_CORE_HOME";
const TMP_SUFFIX: &str = "tmp";

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "settle_core=info".parse() {
            filter = filter.add_directive(directive);
        }

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Application data directory, `$SETTLE_CORE_HOME` or `~/.settle_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Directory holding saved groups.
pub fn groups_dir() -> PathBuf {
    app_data_dir().join(GROUPS_DIR)
}

/// Canonical file path for a saved group name.
pub fn group_file(name: &str) -> PathBuf {
    groups_dir().join(format!("{}.json", canonical_name(name)))
}

/// Lowercases and dashes a display name so it is safe as a file stem.
pub fn canonical_name(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "group".into()
    } else {
        slug
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Writes `data` next to `path` first, then renames it into place.
pub fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_slugs_display_names() {
        assert_eq!(canonical_name("Ski Trip 2024!"), "ski-trip-2024");
        assert_eq!(canonical_name("  "), "group");
    }

    #[test]
    fn tmp_path_keeps_original_extension() {
        assert_eq!(
            tmp_path(Path::new("groups/ski.json")),
            PathBuf::from("groups/ski.json.tmp")
        );
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
