//! Structural and cross-record checks over the raw lines of a ledger file.
//!
//! The validator works on the text alone and does not rely on the ledger having kept its own
//! invariants, so it can be run on files edited by other tools. Problems are reported as data in a
//! [`ValidationReport`], never as errors.

use std::path::Path;

use log::debug;

use crate::codec::raw_field;
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::schema::*;

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
}

impl ValidationReport {
    /// True when every check passed.
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }

    fn pass(&mut self, message: impl Into<String>) {
        self.push(true, message.into());
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.push(false, message.into());
    }

    fn push(&mut self, passed: bool, message: String) {
        debug!("{}: {}", if passed { "ok" } else { "failed" }, message);
        self.checks.push(CheckOutcome { passed, message });
    }
}

#[derive(Debug, Default, Clone)]
pub struct Validator {
    config: LedgerConfig,
}

impl Validator {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn validate_file(&self, path: &Path) -> Result<ValidationReport> {
        let content = std::fs::read_to_string(path)?;
        let lines: Vec<&str> = content.lines().collect();
        Ok(self.validate_lines(&lines))
    }

    /// Validates a whole file given as lines, terminators excluded.
    ///
    /// The first line is the header group, the last line the footer group and everything in
    /// between the transaction group. Within a record, checking stops at the first problem.
    pub fn validate_lines<S: AsRef<str>>(&self, lines: &[S]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let lines: Vec<&str> = lines
            .iter()
            .map(|l| l.as_ref().trim_end_matches(['\r', '\n']))
            .collect();

        let mut lengths_ok = true;
        for (i, line) in lines.iter().enumerate() {
            let width = line.chars().count();
            if width != LINE_WIDTH {
                lengths_ok = false;
                report.fail(format!(
                    "Line {}: line length mismatch, expected {}, got {}",
                    i + 1,
                    LINE_WIDTH,
                    width
                ));
            }
        }
        if !lengths_ok {
            return report;
        }
        report.pass(format!("All lines are {} characters long", LINE_WIDTH));

        if lines.len() < 2 {
            report.fail("File must contain a header and a footer record");
            return report;
        }
        let header = lines[0];
        let footer = lines[lines.len() - 1];
        let transactions = &lines[1..lines.len() - 1];

        if transactions.len() > self.config.transaction_limit {
            report.fail(format!(
                "Transaction limit exceeded: {} transactions, limit is {}",
                transactions.len(),
                self.config.transaction_limit
            ));
        }

        match check_header(header) {
            Ok(()) => report.pass("Header is valid"),
            Err(msg) => report.fail(format!("Header: {}", msg)),
        }

        let mut control_sum: u64 = 0;
        for (i, line) in transactions.iter().enumerate() {
            match check_transaction(line) {
                Ok(amount) => {
                    control_sum = control_sum.saturating_add(amount);
                    report.pass(format!("Transaction {} is valid", i + 1));
                }
                Err(msg) => report.fail(format!("Transaction {}: {}", i + 1, msg)),
            }
        }

        match check_footer(footer, transactions.len(), control_sum) {
            Ok(()) => report.pass("Footer is valid"),
            Err(msg) => report.fail(format!("Footer: {}", msg)),
        }
        report
    }
}

fn field<'a>(line: &'a str, kind: RecordKind, name: &str) -> std::result::Result<&'a str, String> {
    kind.field(name)
        .map(|desc| raw_field(line, desc))
        .map_err(|e| e.to_string())
}

fn check_field_id(line: &str, kind: RecordKind) -> std::result::Result<(), String> {
    let id = field(line, kind, FIELD_ID)?;
    if id != kind.tag() {
        return Err(format!("Field ID must be {}, got {:?}", kind.tag(), id));
    }
    Ok(())
}

fn check_shape(line: &str, kind: RecordKind, name: &str) -> std::result::Result<String, String> {
    let desc = kind.field(name).map_err(|e| e.to_string())?;
    let value = raw_field(line, desc);
    match desc.shape {
        Some(shape) if !shape.matches(value) => {
            Err(format!("{} has an invalid value: {:?}", name, value.trim_end()))
        }
        _ => Ok(value.to_owned()),
    }
}

fn check_header(line: &str) -> std::result::Result<(), String> {
    check_field_id(line, RecordKind::Header)?;
    for name in [NAME, SURNAME, PATRONYMIC, ADDRESS] {
        check_shape(line, RecordKind::Header, name)?;
    }
    Ok(())
}

/// Returns the amount in minor units.
fn check_transaction(line: &str) -> std::result::Result<u64, String> {
    check_field_id(line, RecordKind::Transaction)?;
    check_shape(line, RecordKind::Transaction, COUNTER)?;
    let amount = check_shape(line, RecordKind::Transaction, AMOUNT)?;
    let currency = field(line, RecordKind::Transaction, CURRENCY)?;
    if !is_valid_currency(currency) {
        return Err(format!("unrecognized currency {:?}", currency));
    }
    parse_digits(AMOUNT, &amount)
}

fn check_footer(line: &str, count: usize, control_sum: u64) -> std::result::Result<(), String> {
    check_field_id(line, RecordKind::Footer)?;
    let total = check_shape(line, RecordKind::Footer, TOTAL_COUNTER)?;
    if parse_digits(TOTAL_COUNTER, &total)? != count as u64 {
        return Err(format!(
            "Total Counter does not match: expected {}, got {}",
            count, total
        ));
    }
    let sum = check_shape(line, RecordKind::Footer, CONTROL_SUM)?;
    if parse_digits(CONTROL_SUM, &sum)? != control_sum {
        return Err(format!(
            "Control sum does not match: expected {}, got {}",
            control_sum, sum
        ));
    }
    Ok(())
}

fn parse_digits(name: &str, value: &str) -> std::result::Result<u64, String> {
    value
        .parse()
        .map_err(|_| format!("{} is not a number: {:?}", name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;

    fn header() -> String {
        format!(
            "01{:<28}{:<30}{:<30}{:<30}",
            "John", "Smith", "Paul", "1 Main St."
        )
    }

    fn transaction(counter: u32, amount: u64, currency: &str) -> String {
        format!("02{:06}{:012}{}{:97}", counter, amount, currency, "")
    }

    fn footer(total: u32, sum: u64) -> String {
        format!("03{:06}{:012}{:100}", total, sum, "")
    }

    fn messages(report: &ValidationReport) -> Vec<String> {
        report.failures().map(|c| c.message.clone()).collect()
    }

    #[googletest::test]
    fn accepts_file_without_transactions() {
        let report = Validator::default().validate_lines(&[header(), footer(0, 0)]);
        expect_that!(messages(&report), empty());
        expect_that!(report.is_valid(), eq(true));
    }

    #[googletest::test]
    fn accepts_consistent_file() {
        let lines = [
            header(),
            transaction(1, 100, "USD"),
            transaction(2, 250, "EUR"),
            footer(2, 350),
        ];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(messages(&report), empty());
        expect_that!(report.checks, len(eq(5)));
    }

    #[googletest::test]
    fn reports_line_length_mismatch() {
        let lines = [header(), "03000000".to_string()];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(report.is_valid(), eq(false));
        expect_that!(
            messages(&report),
            elements_are![eq("Line 2: line length mismatch, expected 120, got 8")]
        );
    }

    #[googletest::test]
    fn ignores_line_terminators() {
        let lines = [format!("{}\r\n", header()), format!("{}\n", footer(0, 0))];
        expect_that!(Validator::default().validate_lines(&lines).is_valid(), eq(true));
    }

    #[googletest::test]
    fn reports_invalid_header_name() {
        let bad = format!("01{:<28}{:<30}{:<30}{:<30}", "John7", "Smith", "", "x");
        let report = Validator::default().validate_lines(&[bad, footer(0, 0)]);
        expect_that!(
            messages(&report),
            elements_are![starts_with("Header: Name has an invalid value")]
        );
    }

    #[googletest::test]
    fn reports_wrong_field_ids() {
        let lines = [footer(0, 0), header()];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![
                starts_with("Header: Field ID must be 01"),
                starts_with("Footer: Field ID must be 03")
            ]
        );
    }

    #[googletest::test]
    fn reports_wrong_transaction_field_id() {
        let lines = [
            header(),
            format!("04{:06}{:012}USD{:97}", 1, 100, ""),
            footer(1, 0),
        ];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![eq("Transaction 1: Field ID must be 02, got \"04\"")]
        );
    }

    #[googletest::test]
    fn reports_malformed_transaction_counter() {
        let lines = [
            header(),
            format!("02{:>6}{:012}USD{:97}", "00000A", 100, ""),
            footer(1, 0),
        ];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![eq("Transaction 1: Counter has an invalid value: \"00000A\"")]
        );
    }

    #[googletest::test]
    fn reports_malformed_transaction_amount() {
        let lines = [
            header(),
            format!("02000001{:>12}USD{:97}", "12AB", ""),
            footer(1, 0),
        ];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![eq(
                "Transaction 1: Amount has an invalid value: \"        12AB\""
            )]
        );
    }

    #[googletest::test]
    fn reports_malformed_footer_total_counter() {
        let lines = [header(), format!("03{:>6}{:012}{:100}", "1A", 0, "")];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![eq("Footer: Total Counter has an invalid value: \"    1A\"")]
        );
    }

    #[googletest::test]
    fn reports_malformed_footer_control_sum() {
        let lines = [header(), format!("03{:06}{:>12}{:100}", 0, "12.34", "")];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![eq(
                "Footer: Control sum has an invalid value: \"       12.34\""
            )]
        );
    }

    #[googletest::test]
    fn counts_characters_and_rejects_non_ascii_text() {
        let header = format!(
            "01{:<28}{:<30}{:<30}{:<30}",
            "John", "Smith", "Paul", "Zürich"
        );
        let report = Validator::default().validate_lines(&[header, footer(0, 0)]);
        expect_that!(
            messages(&report),
            elements_are![eq("Header: Address has an invalid value: \"Zürich\"")]
        );
    }

    #[googletest::test]
    fn reports_unknown_currency() {
        let lines = [header(), transaction(1, 100, "XXX"), footer(1, 100)];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            contains(eq("Transaction 1: unrecognized currency \"XXX\""))
        );
    }

    #[googletest::test]
    fn reports_total_counter_mismatch() {
        let lines = [header(), transaction(1, 100, "USD"), footer(2, 100)];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![contains_substring("Total Counter does not match")]
        );
    }

    #[googletest::test]
    fn reports_control_sum_mismatch() {
        let lines = [header(), transaction(1, 100, "USD"), footer(1, 101)];
        let report = Validator::default().validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![contains_substring("Control sum does not match")]
        );
    }

    #[googletest::test]
    fn reports_missing_footer() {
        let report = Validator::default().validate_lines(&[header()]);
        expect_that!(report.is_valid(), eq(false));
    }

    #[googletest::test]
    fn enforces_transaction_limit() {
        let lines = [
            header(),
            transaction(1, 1, "USD"),
            transaction(2, 1, "USD"),
            footer(2, 2),
        ];
        let report = Validator::new(LedgerConfig::new(1)).validate_lines(&lines);
        expect_that!(
            messages(&report),
            elements_are![starts_with("Transaction limit exceeded")]
        );
    }
}
