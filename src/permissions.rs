//! Which fields the command line lets a user edit.
//!
//! Stored as a JSON object mapping field names to booleans, e.g. `{"Name": true, "Amount": false}`.
//! The ledger does not consult this store, it is applied by the caller before
//! [`crate::ledger::Ledger::update_field`].

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::RecordKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
struct Settings(BTreeMap<String, bool>);

#[derive(Debug, Clone)]
pub struct Permissions {
    path: PathBuf,
    settings: Settings,
}

/// Every field name that is editable on at least one record kind.
pub fn configurable_fields() -> Vec<&'static str> {
    RecordKind::ALL
        .iter()
        .flat_map(|k| k.mutable_fields().iter().copied())
        .unique()
        .collect()
}

impl Permissions {
    /// Loads the store at `path`. A missing file, or a field missing from it, means editable.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut settings = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!("no settings at {}, using defaults", path.display());
            Settings::default()
        };
        for field in configurable_fields() {
            settings.0.entry(field.to_owned()).or_insert(true);
        }
        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unknown and automatic fields are never editable.
    pub fn is_editable(&self, field: &str) -> bool {
        configurable_fields().contains(&field)
            && self.settings.0.get(field).copied().unwrap_or(true)
    }

    pub fn set(&mut self, field: &str, editable: bool) -> Result<()> {
        if !configurable_fields().contains(&field) {
            return Err(Error::NotConfigurable(field.to_owned()));
        }
        self.settings.0.insert(field.to_owned(), editable);
        Ok(())
    }

    /// Configurable fields with their current setting, in name order.
    pub fn fields(&self) -> Vec<(&str, bool)> {
        self.settings
            .0
            .iter()
            .filter(|(name, _)| configurable_fields().contains(&name.as_str()))
            .map(|(name, editable)| (name.as_str(), *editable))
            .collect()
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.settings)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        info!("settings saved to {}", self.path.display());
        Ok(())
    }
}
