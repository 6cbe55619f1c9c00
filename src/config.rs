use std::path::PathBuf;

pub const DEFAULT_TRANSACTION_LIMIT: usize = 20_000;
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";
pub const SETTINGS_PATH_ENV: &str = "FIXED_LEDGER_SETTINGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum number of transaction records a file may hold.
    pub transaction_limit: usize,
}

impl LedgerConfig {
    pub fn new(transaction_limit: usize) -> Self {
        Self { transaction_limit }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSACTION_LIMIT)
    }
}

/// Location of the field permission store: `FIXED_LEDGER_SETTINGS` if set, `settings.json`
/// otherwise.
pub fn settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}
