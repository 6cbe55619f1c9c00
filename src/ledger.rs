//! The ledger file: one header, any number of transactions and one footer.
//!
//! Every mutation is a full load, change in memory, full rewrite cycle. The footer aggregates are
//! never taken from the caller: [`Ledger::save`] derives them from the transaction list.

use std::{
    fs,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use crate::codec::{self, Fields};
use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::schema::*;

/// In-memory copy of a ledger file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Contents {
    pub header: Fields,
    pub transactions: Vec<Fields>,
    pub footer: Fields,
}

impl Contents {
    /// Sum of every transaction amount, in minor units.
    pub fn control_sum(&self) -> Result<u64> {
        let target = RecordKind::Transaction.field(AMOUNT)?.ty.name();
        let mut sum: u64 = 0;
        for t in &self.transactions {
            let raw = t.get(AMOUNT).map(String::as_str).unwrap_or("");
            let amount: u64 = raw.parse().map_err(|_| Error::TypeConversion {
                field: AMOUNT.to_owned(),
                target,
                value: raw.to_owned(),
            })?;
            // an overflowing sum cannot fit the footer and is rejected by encode
            sum = sum.saturating_add(amount);
        }
        Ok(sum)
    }

    /// Rewrites the footer aggregates and every Field-ID from the current records.
    fn refresh_automatic_fields(&mut self) -> Result<()> {
        let control_sum = self.control_sum()?;
        let footer = RecordKind::Footer;
        let total_width = footer.field(TOTAL_COUNTER)?.width();
        self.footer.insert(
            TOTAL_COUNTER.to_owned(),
            format!("{:0w$}", self.transactions.len(), w = total_width),
        );
        self.footer.insert(
            CONTROL_SUM.to_owned(),
            codec::format_minor_units(control_sum, footer.field(CONTROL_SUM)?.width()),
        );

        self.header.insert(FIELD_ID.to_owned(), RecordKind::Header.tag().to_owned());
        for t in &mut self.transactions {
            t.insert(FIELD_ID.to_owned(), RecordKind::Transaction.tag().to_owned());
        }
        self.footer.insert(FIELD_ID.to_owned(), footer.tag().to_owned());
        Ok(())
    }
}

/// Handle on a ledger file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, LedgerConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: LedgerConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Reads the whole file and sorts its lines into header, transactions and footer by Field-ID.
    ///
    /// The Reserved field is dropped from transactions and the footer. Lines with an unknown
    /// Field-ID are skipped.
    pub fn load(&self) -> Result<Contents> {
        let file = fs::File::open(&self.path)?;
        let mut contents = Contents::default();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            let tag = line.get(0..2).unwrap_or("");
            let Some(kind) = RecordKind::from_tag(tag) else {
                warn!("skipping line {}: unknown Field ID {:?}", i + 1, tag);
                continue;
            };
            let mut fields = codec::decode(line, kind);
            debug!("line {}: {} {:?}", i + 1, kind, fields);
            match kind {
                RecordKind::Header => contents.header = fields,
                RecordKind::Transaction => {
                    fields.remove(RESERVED);
                    contents.transactions.push(fields);
                }
                RecordKind::Footer => {
                    fields.remove(RESERVED);
                    contents.footer = fields;
                }
            }
        }
        self.check_capacity(contents.transactions.len())?;
        info!("File successfully loaded");
        Ok(contents)
    }

    /// Recomputes the footer from `contents.transactions` and replaces the file with `contents`.
    ///
    /// Lines are written to a sibling temporary file which is then renamed over the ledger, so a
    /// failed save leaves the previous file in place.
    pub fn save(&self, contents: &mut Contents) -> Result<()> {
        self.check_capacity(contents.transactions.len())?;
        contents.refresh_automatic_fields()?;

        let mut lines = Vec::with_capacity(contents.transactions.len() + 2);
        lines.push(codec::encode(&contents.header, RecordKind::Header)?);
        for t in &contents.transactions {
            lines.push(codec::encode(t, RecordKind::Transaction)?);
        }
        lines.push(codec::encode(&contents.footer, RecordKind::Footer)?);
        for line in &lines {
            debug!("writing {}", line.trim_end());
        }

        let tmp_path = self.tmp_path();
        if let Err(err) = write_lines(&tmp_path, &lines) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        info!("File successfully wrote");
        Ok(())
    }

    /// Appends a transaction with the next counter and saves. Returns the new record.
    pub fn add_transaction(&self, amount: Decimal, currency: &str) -> Result<Fields> {
        self.try_add_transaction(amount, currency)
            .map_err(|err| log_rejected("add transaction", err))
    }

    fn try_add_transaction(&self, amount: Decimal, currency: &str) -> Result<Fields> {
        if !is_valid_currency(currency) {
            return Err(Error::UnrecognizedCurrency {
                currency: currency.to_owned(),
                allowed: currency_list(),
            });
        }
        let amount_desc = RecordKind::Transaction.field(AMOUNT)?;
        let minor = codec::to_minor_units(amount).ok_or_else(|| Error::TypeConversion {
            field: AMOUNT.to_owned(),
            target: amount_desc.ty.name(),
            value: amount.to_string(),
        })?;

        let mut contents = self.load()?;
        let counter = contents.transactions.len() + 1;
        let transaction: Fields = [
            (FIELD_ID, RecordKind::Transaction.tag().to_owned()),
            (
                COUNTER,
                format!(
                    "{:0w$}",
                    counter,
                    w = RecordKind::Transaction.field(COUNTER)?.width()
                ),
            ),
            (AMOUNT, codec::format_minor_units(minor, amount_desc.width())),
            (CURRENCY, currency.to_owned()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
        codec::check_field_length(RecordKind::Transaction, COUNTER, &transaction[COUNTER])?;
        codec::check_field_length(RecordKind::Transaction, AMOUNT, &transaction[AMOUNT])?;

        contents.transactions.push(transaction.clone());
        self.save(&mut contents)?;
        info!(
            "added transaction {} ({} {})",
            transaction[COUNTER], transaction[AMOUNT], transaction[CURRENCY]
        );
        Ok(transaction)
    }

    /// Sets one caller-editable field and saves.
    ///
    /// `counter` selects the transaction and is compared verbatim with the stored Counter. Footer
    /// fields are always derived and are rejected here.
    pub fn update_field(
        &self,
        kind: RecordKind,
        field: &str,
        value: &str,
        counter: Option<&str>,
    ) -> Result<()> {
        self.try_update_field(kind, field, value, counter)
            .map_err(|err| log_rejected("update field", err))
    }

    fn try_update_field(
        &self,
        kind: RecordKind,
        field: &str,
        value: &str,
        counter: Option<&str>,
    ) -> Result<()> {
        if is_automatic(field) {
            return Err(Error::AutomaticField(field.to_owned()));
        }
        if field == CURRENCY && !is_valid_currency(value.trim()) {
            return Err(Error::UnrecognizedCurrency {
                currency: value.trim().to_owned(),
                allowed: currency_list(),
            });
        }
        if kind == RecordKind::Footer {
            return Err(Error::FooterNotEditable(field.to_owned()));
        }
        let invalid_field = || Error::InvalidField {
            record: kind,
            field: field.to_owned(),
        };
        if !kind.is_mutable(field) {
            return Err(invalid_field());
        }
        let desc = kind.field(field).map_err(|_| invalid_field())?;
        let converted = codec::convert_value(desc, value)?;
        codec::validate_field_value(kind, field, &converted)?;

        let mut contents = self.load()?;
        match kind {
            RecordKind::Header => {
                contents.header.insert(field.to_owned(), converted);
            }
            RecordKind::Transaction => {
                let counter = counter.ok_or(Error::MissingCounter)?;
                let transaction = contents
                    .transactions
                    .iter_mut()
                    .find(|t| t.get(COUNTER).map(String::as_str) == Some(counter))
                    .ok_or_else(|| Error::TransactionNotFound(counter.to_owned()))?;
                transaction.insert(field.to_owned(), converted);
            }
            RecordKind::Footer => return Err(Error::FooterNotEditable(field.to_owned())),
        }
        self.save(&mut contents)?;
        info!("updated {} field {:?}", kind, field);
        Ok(())
    }

    fn check_capacity(&self, count: usize) -> Result<()> {
        if count > self.config.transaction_limit {
            error!(
                "transaction limit exceeded: {} > {}",
                count, self.config.transaction_limit
            );
            return Err(Error::TransactionLimitExceeded {
                count,
                limit: self.config.transaction_limit,
            });
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()
}

fn log_rejected(operation: &str, err: Error) -> Error {
    error!("{} failed: {}", operation, err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn transaction(counter: &str, amount: &str) -> Fields {
        [(COUNTER, counter), (AMOUNT, amount), (CURRENCY, "USD")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[googletest::test]
    fn control_sum_adds_minor_units() -> anyhow::Result<()> {
        let contents = Contents {
            transactions: vec![
                transaction("000001", "000000000100"),
                transaction("000002", "000000000250"),
            ],
            ..Default::default()
        };
        expect_that!(contents.control_sum()?, eq(350));
        Ok(())
    }

    #[test]
    fn control_sum_rejects_non_numeric_amounts() {
        let contents = Contents {
            transactions: vec![transaction("000001", "12AB")],
            ..Default::default()
        };
        assert!(matches!(
            contents.control_sum(),
            Err(Error::TypeConversion { target: "fixed-point amount", .. })
        ));
    }

    #[test]
    fn refresh_overrides_caller_footer() {
        let mut contents = Contents {
            transactions: vec![transaction("000001", "000000000100")],
            ..Default::default()
        };
        contents
            .footer
            .insert(CONTROL_SUM.to_owned(), "999999999999".to_owned());
        contents.refresh_automatic_fields().unwrap();
        assert_eq!(contents.footer[TOTAL_COUNTER], "000001");
        assert_eq!(contents.footer[CONTROL_SUM], "000000000100");
        assert_eq!(contents.footer[FIELD_ID], "03");
        assert_eq!(contents.transactions[0][FIELD_ID], "02");
        assert_eq!(contents.header[FIELD_ID], "01");
    }

    #[test]
    fn tmp_path_is_a_sibling() {
        let ledger = Ledger::new("/data/ledger.fwf");
        assert_eq!(ledger.tmp_path(), PathBuf::from("/data/ledger.fwf.tmp"));
    }

    #[googletest::test]
    fn save_then_load_round_trips() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let ledger = Ledger::new(dir.path().join("ledger.fwf"));
        let mut contents = Contents {
            transactions: vec![transaction("000001", "000000000100")],
            ..Default::default()
        };
        contents.header.insert(NAME.to_owned(), "John".to_owned());
        ledger.save(&mut contents)?;
        let loaded = ledger.load()?;
        expect_that!(loaded.header[NAME], eq("John"));
        expect_that!(loaded.transactions, len(eq(1)));
        expect_that!(loaded.footer[CONTROL_SUM], eq("000000000100"));
        expect_that!(dir.path().join("ledger.fwf.tmp").exists(), eq(false));
        Ok(())
    }

    #[test]
    fn failed_rename_removes_the_temporary_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.fwf");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "").unwrap();

        let mut contents = Contents::default();
        let result = Ledger::new(&path).save(&mut contents);
        assert!(matches!(result, Err(Error::Io(_))), "{:?}", result);
        assert!(!dir.path().join("ledger.fwf.tmp").exists());
        assert!(path.join("occupied").exists());
    }

    #[test]
    fn load_skips_unknown_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.fwf");
        fs::write(&path, "01John\n99garbage\n02000001000000000100USD\n03000001000000000100\n")
            .unwrap();
        let contents = Ledger::new(&path).load().unwrap();
        assert_eq!(contents.header[NAME], "John");
        assert_eq!(contents.transactions.len(), 1);
        assert!(!contents.transactions[0].contains_key(RESERVED));
        assert!(!contents.footer.contains_key(RESERVED));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("missing.fwf"));
        assert!(matches!(ledger.load(), Err(Error::Io(_))));
    }
}
