// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{fs, path::Path};

use anyhow::{Context, Result};

/// Read a yaml file and substitute `${VAR}` references from the environment.
pub fn load_yaml_with_env(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)?;
    substitute_env(&raw).with_context(|| format!("Could not expand variables in {:?}", path))
}

pub fn substitute_env(raw: &str) -> Result<String> {
    let expanded = shellexpand::env(raw).map_err(|e| {
        anyhow::anyhow!("environment variable '{}' is not set: {}", e.var_name, e.cause)
    })?;
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_is_named() {
        let err = substitute_env("url: ${SHADE_TEST_SURELY_UNSET_VAR}").unwrap_err();
        assert!(err.to_string().contains("SHADE_TEST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn test_plain_yaml_is_untouched() -> Result<()> {
        assert_eq!(substitute_env("chain_id: 31337")?, "chain_id: 31337");
        Ok(())
    }
}
