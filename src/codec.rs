//! Conversion between raw fixed-width lines and field maps.

use std::collections::BTreeMap;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::schema::{currency_list, FieldDesc, FieldType, RecordKind, Shape};

/// Field name to trimmed value.
pub type Fields = BTreeMap<String, String>;

/// Slices `line` along the byte ranges of `kind` and trims every slice.
///
/// The content is not validated. Ranges that fall outside the line (or off a char boundary)
/// decode as empty strings.
pub fn decode(line: &str, kind: RecordKind) -> Fields {
    kind.fields()
        .iter()
        .map(|f| (f.name.to_owned(), raw_field(line, f).trim().to_owned()))
        .collect()
}

/// The untrimmed slice of `line` covered by `desc`.
pub fn raw_field<'a>(line: &'a str, desc: &FieldDesc) -> &'a str {
    let end = desc.end.min(line.len());
    line.get(desc.start..end).unwrap_or("")
}

/// Renders `fields` as one line of exactly [`crate::schema::LINE_WIDTH`] ASCII characters.
///
/// Absent fields are rendered empty. Values wider than their field are rejected with
/// [`Error::FieldTooLong`] instead of being truncated, and non-ASCII values with
/// [`Error::InvalidValue`].
pub fn encode(fields: &Fields, kind: RecordKind) -> Result<String> {
    let mut line = String::with_capacity(crate::schema::LINE_WIDTH);
    for desc in kind.fields() {
        let value = fields.get(desc.name).map(String::as_str).unwrap_or("");
        if !value.is_ascii() {
            return Err(Error::InvalidValue {
                field: desc.name.to_owned(),
                value: value.to_owned(),
            });
        }
        check_length(desc, value)?;
        let pad = desc.width() - value.len();
        if desc.ty.zero_padded() {
            line.extend(std::iter::repeat('0').take(pad));
            line.push_str(value);
        } else {
            line.push_str(value);
            line.extend(std::iter::repeat(' ').take(pad));
        }
    }
    Ok(line)
}

/// Fails with [`Error::FieldTooLong`] when `value` does not fit into `field` of `kind`.
pub fn check_field_length(kind: RecordKind, field: &str, value: &str) -> Result<()> {
    check_length(kind.field(field)?, value)
}

fn check_length(desc: &FieldDesc, value: &str) -> Result<()> {
    if value.len() > desc.width() {
        return Err(Error::FieldTooLong {
            field: desc.name.to_owned(),
            len: value.len(),
            max: desc.width(),
        });
    }
    Ok(())
}

/// Fails when `value` does not have the shape `field` of `kind` requires.
pub fn validate_field_value(kind: RecordKind, field: &str, value: &str) -> Result<()> {
    let desc = kind.field(field)?;
    match desc.shape {
        Some(Shape::Currency) if !Shape::Currency.matches(value) => {
            Err(Error::UnrecognizedCurrency {
                currency: value.to_owned(),
                allowed: currency_list(),
            })
        }
        Some(shape) if !shape.matches(value) => Err(Error::InvalidValue {
            field: desc.name.to_owned(),
            value: value.to_owned(),
        }),
        _ => Ok(()),
    }
}

/// Converts caller input into the stored form of `desc`'s semantic type.
///
/// Fixed-point input is a decimal amount (`"2.50"`) and is stored as zero-padded minor units
/// (`"000000000250"`).
pub fn convert_value(desc: &FieldDesc, raw: &str) -> Result<String> {
    let raw = raw.trim();
    let conversion_error = || Error::TypeConversion {
        field: desc.name.to_owned(),
        target: desc.ty.name(),
        value: raw.to_owned(),
    };
    let converted = match desc.ty {
        FieldType::Text => raw.to_owned(),
        FieldType::FixedPoint => {
            let amount = Decimal::from_str(raw).map_err(|_| conversion_error())?;
            let minor = to_minor_units(amount).ok_or_else(conversion_error)?;
            format_minor_units(minor, desc.width())
        }
        FieldType::Unsigned => {
            let n: u64 = raw.parse().map_err(|_| conversion_error())?;
            format!("{:0width$}", n, width = desc.width())
        }
    };
    check_length(desc, &converted)?;
    Ok(converted)
}

/// `round(amount * 100)`, or None for negative or overflowing amounts.
pub fn to_minor_units(amount: Decimal) -> Option<u64> {
    amount.checked_mul(Decimal::ONE_HUNDRED)?.round().to_u64()
}

pub fn format_minor_units(minor: u64, width: usize) -> String {
    format!("{:0width$}", minor, width = width)
}
