pub mod codec;
pub mod config;
pub mod error;
pub mod ledger;
pub mod permissions;
pub mod schema;
pub mod validate;

pub use codec::{decode, encode, Fields};
pub use config::LedgerConfig;
pub use error::{Error, Result};
pub use ledger::{Contents, Ledger};
pub use permissions::Permissions;
pub use schema::RecordKind;
pub use validate::{ValidationReport, Validator};
