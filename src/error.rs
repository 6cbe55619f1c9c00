use thiserror::Error;

use crate::schema::RecordKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transaction limit exceeded: {count} transactions, limit is {limit}")]
    TransactionLimitExceeded { count: usize, limit: usize },

    #[error("unrecognized currency {currency:?}, valid currencies are: {allowed}")]
    UnrecognizedCurrency { currency: String, allowed: String },

    #[error("unknown field {field:?} for {kind} record")]
    UnknownField { kind: RecordKind, field: String },

    #[error("invalid field {field:?} for record kind {record}")]
    InvalidField { record: RecordKind, field: String },

    #[error("field {0:?} is maintained automatically and cannot be edited")]
    AutomaticField(String),

    #[error("footer field {0:?} is derived from the transactions and cannot be edited")]
    FooterNotEditable(String),

    #[error("unknown record type {0:?}, expected header, transaction or footer")]
    UnknownRecordType(String),

    #[error("field {0:?} has no editable permission setting")]
    NotConfigurable(String),

    #[error("a transaction counter is required to edit a transaction")]
    MissingCounter,

    #[error("transaction not found: {0:?}")]
    TransactionNotFound(String),

    #[error("type conversion error: cannot convert {value:?} for field {field:?} to {target}")]
    TypeConversion {
        field: String,
        target: &'static str,
        value: String,
    },

    #[error("value for field {field:?} is {len} characters long, maximum is {max}")]
    FieldTooLong { field: String, len: usize, max: usize },

    #[error("invalid value {value:?} for field {field:?}")]
    InvalidValue { field: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
