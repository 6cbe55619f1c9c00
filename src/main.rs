use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fixed_ledger::{config, Fields, Ledger, Permissions, RecordKind, Validator};
use rust_decimal::Decimal;

/// Reads, validates and edits 120-column fixed-width ledger files.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the field permission store
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every record of a ledger file and validate it
    Read { filepath: PathBuf },
    /// Append a transaction
    Add { filepath: PathBuf },
    /// Change a header or transaction field
    Update { filepath: PathBuf },
    /// Show and toggle which fields may be edited
    Settings,
}

struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        write!(self.output, "{}: ", question)?;
        self.output.flush()?;
        let mut line = String::new();
        let n = self.input.read_line(&mut line)?;
        anyhow::ensure!(n > 0, "unexpected end of input");
        Ok(line.trim().to_owned())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = args.settings.unwrap_or_else(config::settings_path);
    let stdin = io::stdin();
    let mut prompt = Prompt {
        input: stdin.lock(),
        output: io::stdout(),
    };

    match args.command {
        Command::Read { filepath } => read(&filepath),
        Command::Add { filepath } => add(&Ledger::new(filepath), &mut prompt),
        Command::Update { filepath } => update(&Ledger::new(filepath), &settings, &mut prompt),
        Command::Settings => edit_settings(&settings, &mut prompt),
    }
}

fn print_record(kind: RecordKind, fields: &Fields) {
    for desc in kind.fields() {
        if let Some(value) = fields.get(desc.name) {
            println!("  {}: {}", desc.name, value);
        }
    }
}

fn read(filepath: &Path) -> anyhow::Result<()> {
    let ledger = Ledger::new(filepath);
    let contents = ledger
        .load()
        .with_context(|| format!("failed to load {}", filepath.display()))?;
    println!("Header:");
    print_record(RecordKind::Header, &contents.header);
    for t in &contents.transactions {
        println!("Transaction:");
        print_record(RecordKind::Transaction, t);
    }
    println!("Footer:");
    print_record(RecordKind::Footer, &contents.footer);

    let report = Validator::new(*ledger.config()).validate_file(filepath)?;
    println!("Validation:");
    for check in &report.checks {
        println!("  [{}] {}", if check.passed { "ok" } else { "FAIL" }, check.message);
    }
    anyhow::ensure!(report.is_valid(), "{} is not a valid ledger file", filepath.display());
    Ok(())
}

fn add<R: BufRead, W: Write>(ledger: &Ledger, prompt: &mut Prompt<R, W>) -> anyhow::Result<()> {
    let amount = prompt.ask("Amount")?;
    let amount =
        Decimal::from_str(&amount).with_context(|| format!("invalid amount {:?}", amount))?;
    let currency = prompt.ask("Currency")?.to_ascii_uppercase();
    let transaction = ledger.add_transaction(amount, &currency)?;
    println!("Added transaction:");
    print_record(RecordKind::Transaction, &transaction);
    Ok(())
}

fn update<R: BufRead, W: Write>(
    ledger: &Ledger,
    settings: &Path,
    prompt: &mut Prompt<R, W>,
) -> anyhow::Result<()> {
    let permissions = Permissions::load(settings)?;
    let kind: RecordKind = prompt.ask("Record type (header, transaction)")?.parse()?;
    let field = prompt.ask("Field")?;
    anyhow::ensure!(
        permissions.is_editable(&field),
        "field {:?} is not editable, see the settings command",
        field
    );
    let counter = match kind {
        RecordKind::Transaction => Some(prompt.ask("Transaction counter")?),
        _ => None,
    };
    let value = prompt.ask("New value")?;
    ledger.update_field(kind, &field, &value, counter.as_deref())?;
    println!("Updated {} field {:?}", kind, field);
    Ok(())
}

fn edit_settings<R: BufRead, W: Write>(
    settings: &Path,
    prompt: &mut Prompt<R, W>,
) -> anyhow::Result<()> {
    let mut permissions = Permissions::load(settings)?;
    loop {
        println!("Editable fields ({}):", permissions.path().display());
        for (name, editable) in permissions.fields() {
            println!("  {}: {}", name, if editable { "yes" } else { "no" });
        }
        let field = prompt.ask("Field to toggle (empty to finish)")?;
        if field.is_empty() {
            break;
        }
        let editable = permissions.is_editable(&field);
        permissions.set(&field, !editable)?;
    }
    permissions.save()?;
    Ok(())
}
