// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::path::{Path, PathBuf};

use path_clean::clean;

pub const DEFAULT_CONFIG_NAME: &str = "shade.config.yaml";

pub type FindInParent = fn(&Path, &str) -> Option<PathBuf>;

/// Walk up from `start` until a file called `filename` exists.
pub fn find_in_parent(start: &Path, filename: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.exists())
}

/// Pick the config file to load.
///
/// An explicit file wins (relative paths are taken from `cwd`), then the first
/// `filename` found walking up from `cwd`, then `filename` inside `default_dir`.
pub fn resolve_config_path(
    find: FindInParent,
    cwd: &Path,
    default_dir: &Path,
    filename: &str,
    explicit: Option<&Path>,
) -> PathBuf {
    match explicit {
        Some(file) if file.is_absolute() => file.to_path_buf(),
        Some(file) => clean(cwd.join(file)),
        None => find(cwd, filename).unwrap_or_else(|| clean(default_dir.join(filename))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn not_found(_: &Path, _: &str) -> Option<PathBuf> {
        None
    }

    fn found(_: &Path, _: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/work/shade.config.yaml"))
    }

    #[test]
    fn test_resolve_order() {
        let cwd = Path::new("/work/app");
        let defaults = Path::new("/home/me/.config/shade");

        let path = resolve_config_path(not_found, cwd, defaults, DEFAULT_CONFIG_NAME, None);
        assert_eq!(path, defaults.join(DEFAULT_CONFIG_NAME));

        let path = resolve_config_path(found, cwd, defaults, DEFAULT_CONFIG_NAME, None);
        assert_eq!(path, PathBuf::from("/work/shade.config.yaml"));

        let path = resolve_config_path(
            found,
            cwd,
            defaults,
            DEFAULT_CONFIG_NAME,
            Some(Path::new("/etc/shade.yaml")),
        );
        assert_eq!(path, PathBuf::from("/etc/shade.yaml"));

        let path = resolve_config_path(
            found,
            cwd,
            defaults,
            DEFAULT_CONFIG_NAME,
            Some(Path::new("../conf/shade.yaml")),
        );
        assert_eq!(path, PathBuf::from("/work/conf/shade.yaml"));
    }

    #[test]
    fn test_find_in_parent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(dir.path().join("a").join(DEFAULT_CONFIG_NAME), "chain: {}")?;

        let found = find_in_parent(&nested, DEFAULT_CONFIG_NAME);
        assert_eq!(found, Some(dir.path().join("a").join(DEFAULT_CONFIG_NAME)));
        assert_eq!(find_in_parent(&nested, "missing.yaml"), None);
        Ok(())
    }
}
