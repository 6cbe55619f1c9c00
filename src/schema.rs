//! Static layout of the three record kinds.
//!
//! Every record is exactly [`LINE_WIDTH`] characters wide. Fields are addressed by byte range,
//! there are no delimiters.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

pub const LINE_WIDTH: usize = 120;

pub const FIELD_ID: &str = "Field ID";
pub const NAME: &str = "Name";
pub const SURNAME: &str = "Surname";
pub const PATRONYMIC: &str = "Patronymic";
pub const ADDRESS: &str = "Address";
pub const COUNTER: &str = "Counter";
pub const AMOUNT: &str = "Amount";
pub const CURRENCY: &str = "Currency";
pub const RESERVED: &str = "Reserved";
pub const TOTAL_COUNTER: &str = "Total Counter";
pub const CONTROL_SUM: &str = "Control sum";

/// Fields maintained by the ledger itself. They can never be set by a caller.
pub const AUTOMATIC_FIELDS: [&str; 4] = [FIELD_ID, COUNTER, TOTAL_COUNTER, CONTROL_SUM];

pub const CURRENCIES: [&str; 40] = [
    "USD", "EUR", "JPY", "GBP", "AUD", "CAD", "CHF", "CNY", "SEK", "NZD", //
    "MXN", "SGD", "HKD", "NOK", "KRW", "TRY", "RUB", "INR", "BRL", "ZAR", //
    "PLN", "DKK", "CZK", "HUF", "ILS", "THB", "IDR", "MYR", "PHP", "AED", //
    "SAR", "CLP", "COP", "ARS", "TWD", "EGP", "VND", "NGN", "KZT", "UAH",
];

lazy_static! {
    // ASCII only, so that a field's byte width and character width agree
    static ref ALPHABETIC: Regex = Regex::new(r"(?-u)^[A-Za-z\s]+$").unwrap();
    static ref ADDRESS_TEXT: Regex = Regex::new(r"(?-u)^[\w\s,.]+$").unwrap();
    static ref DIGITS_6: Regex = Regex::new(r"(?-u)^\d{6}$").unwrap();
    static ref DIGITS_12: Regex = Regex::new(r"(?-u)^\d{12}$").unwrap();
}

pub fn is_valid_currency(code: &str) -> bool {
    CURRENCIES.contains(&code)
}

/// Comma separated list of every accepted currency code.
pub fn currency_list() -> String {
    CURRENCIES.iter().join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Header,
    Transaction,
    Footer,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Header,
        RecordKind::Transaction,
        RecordKind::Footer,
    ];

    /// The two character Field-ID every line of this kind starts with.
    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::Header => "01",
            RecordKind::Transaction => "02",
            RecordKind::Footer => "03",
        }
    }

    pub fn from_tag(tag: &str) -> Option<RecordKind> {
        RecordKind::ALL.into_iter().find(|k| k.tag() == tag)
    }

    pub fn fields(&self) -> &'static [FieldDesc] {
        match self {
            RecordKind::Header => &HEADER_FIELDS,
            RecordKind::Transaction => &TRANSACTION_FIELDS,
            RecordKind::Footer => &FOOTER_FIELDS,
        }
    }

    /// Looks up a field descriptor, failing with [`Error::UnknownField`] for names this kind does
    /// not define.
    pub fn field(&self, name: &str) -> Result<&'static FieldDesc> {
        self.fields()
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UnknownField {
                kind: *self,
                field: name.to_owned(),
            })
    }

    /// Fields a caller may edit on this kind of record.
    pub fn mutable_fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Header => &[NAME, SURNAME, PATRONYMIC, ADDRESS],
            RecordKind::Transaction => &[AMOUNT, CURRENCY],
            RecordKind::Footer => &[],
        }
    }

    pub fn is_mutable(&self, name: &str) -> bool {
        self.mutable_fields().contains(&name)
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Header => write!(f, "header"),
            RecordKind::Transaction => write!(f, "transaction"),
            RecordKind::Footer => write!(f, "footer"),
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(RecordKind::Header),
            "transaction" => Ok(RecordKind::Transaction),
            "footer" => Ok(RecordKind::Footer),
            _ => Err(Error::UnknownRecordType(s.to_owned())),
        }
    }
}

pub fn is_automatic(name: &str) -> bool {
    AUTOMATIC_FIELDS.contains(&name)
}

/// Semantic type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// Decimal amount stored as an integer number of minor units (value x 100).
    FixedPoint,
    Unsigned,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::FixedPoint => "fixed-point amount",
            FieldType::Unsigned => "unsigned integer",
        }
    }

    /// Numeric fields are zero-padded on the left, everything else is space-padded on the right.
    pub fn zero_padded(&self) -> bool {
        !matches!(self, FieldType::Text)
    }
}

/// Value-shape predicate of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Alphabetic,
    Address,
    Digits6,
    Digits12,
    Currency,
}

impl Shape {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Shape::Alphabetic => ALPHABETIC.is_match(value),
            Shape::Address => ADDRESS_TEXT.is_match(value),
            Shape::Digits6 => DIGITS_6.is_match(value),
            Shape::Digits12 => DIGITS_12.is_match(value),
            Shape::Currency => is_valid_currency(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
    pub ty: FieldType,
    pub shape: Option<Shape>,
}

impl FieldDesc {
    const fn new(
        name: &'static str,
        start: usize,
        end: usize,
        ty: FieldType,
        shape: Option<Shape>,
    ) -> Self {
        Self {
            name,
            start,
            end,
            ty,
            shape,
        }
    }

    pub fn width(&self) -> usize {
        self.end - self.start
    }
}

static HEADER_FIELDS: [FieldDesc; 5] = [
    FieldDesc::new(FIELD_ID, 0, 2, FieldType::Text, None),
    FieldDesc::new(NAME, 2, 30, FieldType::Text, Some(Shape::Alphabetic)),
    FieldDesc::new(SURNAME, 30, 60, FieldType::Text, Some(Shape::Alphabetic)),
    FieldDesc::new(PATRONYMIC, 60, 90, FieldType::Text, Some(Shape::Alphabetic)),
    FieldDesc::new(ADDRESS, 90, 120, FieldType::Text, Some(Shape::Address)),
];

static TRANSACTION_FIELDS: [FieldDesc; 5] = [
    FieldDesc::new(FIELD_ID, 0, 2, FieldType::Text, None),
    FieldDesc::new(COUNTER, 2, 8, FieldType::Unsigned, Some(Shape::Digits6)),
    FieldDesc::new(AMOUNT, 8, 20, FieldType::FixedPoint, Some(Shape::Digits12)),
    FieldDesc::new(CURRENCY, 20, 23, FieldType::Text, Some(Shape::Currency)),
    FieldDesc::new(RESERVED, 23, 120, FieldType::Text, None),
];

static FOOTER_FIELDS: [FieldDesc; 4] = [
    FieldDesc::new(FIELD_ID, 0, 2, FieldType::Text, None),
    FieldDesc::new(TOTAL_COUNTER, 2, 8, FieldType::Unsigned, Some(Shape::Digits6)),
    FieldDesc::new(CONTROL_SUM, 8, 20, FieldType::FixedPoint, Some(Shape::Digits12)),
    FieldDesc::new(RESERVED, 20, 120, FieldType::Text, None),
];
