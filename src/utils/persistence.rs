use std::{fs, path::Path};

use tracing::debug;

use crate::{
    errors::{LedgerError, Result},
    ledger::group::{Group, CURRENT_SCHEMA_VERSION},
};

use super::write_atomic;

/// Writes the provided group to disk atomically by staging to a temporary file.
pub fn save_group_to_file(group: &Group, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(group)?;
    write_atomic(path, &json)?;
    debug!(path = %path.display(), transactions = group.transaction_count(), "group saved");
    Ok(())
}

/// Loads a group snapshot from disk and re-checks its roster invariants.
pub fn load_group_from_file(path: &Path) -> Result<Group> {
    let data = fs::read_to_string(path)?;
    let group: Group = serde_json::from_str(&data)?;
    if group.schema_version() > CURRENT_SCHEMA_VERSION {
        return Err(LedgerError::InvalidGroup(format!(
            "{} uses schema v{} but only v{} is supported",
            path.display(),
            group.schema_version(),
            CURRENT_SCHEMA_VERSION
        )));
    }
    group.validate()?;
    Ok(group)
}
