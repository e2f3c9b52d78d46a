use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use kicho_core::{to_mf_csv, ColumnMapping, ConversionRules, CorrectionRule, DateFormat, JournalField};
use kicho_import::{learn_patterns_from_mf_csv, ConversionOutcome, ConversionSession, MAPPING_PRESETS};
use kicho_ocr::adapter::journal_rows_from_document;
use kicho_ocr::service::{process_document, ExtractionClient, ProgressReporter};
use kicho_storage::{DbPool, TemplateData};

#[derive(Parser)]
#[command(name = "kicho", version, about = "仕訳データ変換ツール: 通帳・カード明細・領収書をMF仕訳CSVに変換する")]
pub struct Cli {
    /// Database file (defaults to the platform data directory).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a tabular export (bank, card, expense, sales) to MF journal CSV.
    Convert(ConvertArgs),
    /// Extract journal rows from a scanned document image.
    Scan(ScanArgs),
    /// Learn journal patterns from an existing MF journal CSV.
    Learn(LearnArgs),
    /// Manage correction rules.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Manage learned journal patterns.
    Pattern {
        #[command(subcommand)]
        action: PatternAction,
    },
    /// Manage companies and their settings.
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Input file (CSV or TSV).
    pub file: PathBuf,
    /// Company whose rules and patterns apply.
    #[arg(long)]
    pub company: Option<String>,
    /// Force a mapping preset (bank, creditcard, expense, sales).
    #[arg(long)]
    pub preset: Option<String>,
    /// Field delimiter; sniffed when omitted.
    #[arg(long)]
    pub delimiter: Option<char>,
    /// Treat the first data row as data, not a header.
    #[arg(long)]
    pub no_header: bool,
    /// Source date format (e.g. yyyy/MM/dd, wareki, M/d).
    #[arg(long)]
    pub format: Option<DateFormat>,
    /// Write the CSV here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Apply a saved template's column mapping (requires --company).
    #[arg(long)]
    pub template: Option<String>,
    /// Save the resulting mapping under this template name (requires --company).
    #[arg(long)]
    pub save_template: Option<String>,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Image or PDF of a receipt, invoice or statement.
    pub file: PathBuf,
    /// Company whose rules and patterns apply.
    #[arg(long)]
    pub company: Option<String>,
    /// Extraction service API key; falls back to $KICHO_API_KEY.
    #[arg(long)]
    pub api_key: Option<String>,
    /// Write the CSV here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct LearnArgs {
    /// Previously exported MF journal CSV.
    pub file: PathBuf,
    #[arg(long)]
    pub company: String,
}

#[derive(Subcommand)]
pub enum RuleAction {
    /// Add or update a correction (same company+field+from updates the replacement).
    Add {
        #[arg(long)]
        company: String,
        /// Target field (e.g. debit_account, description).
        field: JournalField,
        from: String,
        to: String,
    },
    List {
        #[arg(long)]
        company: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum PatternAction {
    List {
        #[arg(long)]
        company: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CompanyAction {
    List,
    /// Delete a company and everything stored for it.
    Delete { name: String },
    SetIndustry { name: String, industry: String },
    SetCredit { name: String, account: String },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(args) => convert(cli.db, args).await,
        Command::Scan(args) => scan(cli.db, args).await,
        Command::Learn(args) => learn(cli.db, args).await,
        Command::Rule { action } => rule(cli.db, action).await,
        Command::Pattern { action } => pattern(cli.db, action).await,
        Command::Company { action } => company(cli.db, action).await,
    }
}

async fn open_db(path: Option<PathBuf>) -> Result<DbPool> {
    let path = match path {
        Some(p) => p,
        None => {
            let dirs = directories::ProjectDirs::from("jp", "kicho", "kicho")
                .context("could not determine the data directory")?;
            let dir = dirs.data_dir().to_path_buf();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            dir.join("kicho.db")
        }
    };
    debug!(path = %path.display(), "opening database");
    let pool = kicho_storage::create_db(&path)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    Ok(pool)
}

async fn rules_for(db: Option<PathBuf>, company: Option<&str>) -> Result<ConversionRules> {
    match company {
        Some(name) => {
            let pool = open_db(db).await?;
            Ok(kicho_storage::load_company_rules(&pool, name).await?)
        }
        None => Ok(ConversionRules::default()),
    }
}

async fn convert(db: Option<PathBuf>, args: ConvertArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let mut rules = rules_for(db.clone(), args.company.as_deref()).await?;
    if let Some(format) = args.format {
        rules.date_format = format;
    }

    let delimiter = args.delimiter.map(ascii_delimiter).transpose()?;
    let mut session = ConversionSession::with_options(&text, rules, delimiter, !args.no_header)?;

    if let Some(id) = &args.preset {
        if !session.apply_preset_by_id(id) {
            let known: Vec<&str> = MAPPING_PRESETS.iter().map(|p| p.id).collect();
            bail!("unknown preset '{id}' (available: {})", known.join(", "));
        }
    }

    if let Some(name) = &args.template {
        let company = args
            .company
            .as_deref()
            .context("--template requires --company")?;
        let pool = open_db(db.clone()).await?;
        let data = kicho_storage::get_template(&pool, company, name)
            .await?
            .with_context(|| format!("no template '{name}' for company '{company}'"))?;
        let mut mapping = ColumnMapping::new();
        for (column, field) in data.mapping {
            mapping.insert_if_free(column, field);
        }
        session.set_mapping(mapping);
        if args.format.is_none() && data.rules.date_format != DateFormat::Auto {
            session.rules.date_format = data.rules.date_format;
        }
        for (field, value) in data.rules.fixed_values {
            session.rules.set_fixed_value(field, &value);
        }
    }

    if !session.is_mapping_complete() {
        bail!(
            "could not locate a date or amount column; use --preset, --template or check --no-header"
        );
    }

    if let Some(label) = session.preset_label {
        eprintln!("プリセット: {label}");
    }
    let outcome = session.convert()?;
    report_outcome(&outcome);

    if let Some(name) = &args.save_template {
        let company = args
            .company
            .as_deref()
            .context("--save-template requires --company")?;
        let pool = open_db(db).await?;
        let data = TemplateData {
            mapping: session.mapping.iter().collect(),
            rules: session.rules.clone(),
            source_headers: session.headers().to_vec(),
        };
        kicho_storage::save_template(&pool, company, name, &data).await?;
        eprintln!("テンプレート '{name}' を保存しました");
    }

    write_csv(&session.export(&outcome), args.output.as_deref())
}

struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, status: &str, fraction: f32) {
        eprintln!("[{:>3.0}%] {status}", fraction * 100.0);
    }
}

fn ascii_delimiter(c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        bail!("delimiter must be an ASCII character, got '{c}'");
    }
}

fn mime_for_path(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    Ok(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        other => bail!("unsupported document type '.{other}' (jpg, png, webp, pdf)"),
    })
}

async fn scan(db: Option<PathBuf>, args: ScanArgs) -> Result<()> {
    let image = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mime = mime_for_path(&args.file)?;

    let api_key = match args.api_key {
        Some(key) => key,
        None => std::env::var("KICHO_API_KEY")
            .context("no API key; pass --api-key or set KICHO_API_KEY")?,
    };

    let rules = rules_for(db, args.company.as_deref()).await?;
    let client = ExtractionClient::new(api_key);
    let doc = process_document(&client, &image, mime, &StderrProgress).await?;
    eprintln!(
        "書類: {} (信頼度 {:.0}%)",
        doc.document_type.label(),
        doc.confidence * 100.0
    );

    let result = journal_rows_from_document(&doc, &rules, 1);
    eprintln!("{} 行を抽出しました", result.rows.len());
    write_csv(&to_mf_csv(&result.rows), args.output.as_deref())
}

async fn learn(db: Option<PathBuf>, args: LearnArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let patterns = learn_patterns_from_mf_csv(&text)?;
    if patterns.is_empty() {
        bail!("no usable journal rows in {}", args.file.display());
    }

    let pool = open_db(db).await?;
    kicho_storage::save_journal_patterns(&pool, &args.company, &patterns).await?;
    eprintln!("{} 件のパターンを学習しました", patterns.len());
    Ok(())
}

async fn rule(db: Option<PathBuf>, action: RuleAction) -> Result<()> {
    let pool = open_db(db).await?;
    match action {
        RuleAction::Add {
            company,
            field,
            from,
            to,
        } => {
            let rule = CorrectionRule {
                id: None,
                company: company.clone(),
                field,
                from,
                to,
            };
            kicho_storage::save_correction_rule(&pool, &company, &rule).await?;
        }
        RuleAction::List { company } => {
            for rule in kicho_storage::get_correction_rules(&pool, &company).await? {
                println!(
                    "{}\t{}\t{} → {}",
                    rule.id.unwrap_or(0),
                    rule.field.label(),
                    rule.from,
                    rule.to
                );
            }
        }
        RuleAction::Delete { id } => {
            if !kicho_storage::delete_correction_rule(&pool, id).await? {
                bail!("no correction rule with id {id}");
            }
        }
    }
    Ok(())
}

async fn pattern(db: Option<PathBuf>, action: PatternAction) -> Result<()> {
    let pool = open_db(db).await?;
    match action {
        PatternAction::List { company } => {
            for p in kicho_storage::get_journal_patterns(&pool, &company).await? {
                println!(
                    "{}\t{}\t{} / {}\t×{}",
                    p.id.unwrap_or(0),
                    p.keyword,
                    p.debit_account,
                    p.credit_account,
                    p.count
                );
            }
        }
        PatternAction::Delete { id } => {
            if !kicho_storage::delete_journal_pattern(&pool, id).await? {
                bail!("no journal pattern with id {id}");
            }
        }
    }
    Ok(())
}

async fn company(db: Option<PathBuf>, action: CompanyAction) -> Result<()> {
    let pool = open_db(db).await?;
    match action {
        CompanyAction::List => {
            for c in kicho_storage::list_companies(&pool).await? {
                println!(
                    "{}\t{}\t{}",
                    c.name,
                    if c.industry.is_empty() { "-" } else { &c.industry },
                    if c.default_credit_account.is_empty() {
                        "-"
                    } else {
                        &c.default_credit_account
                    }
                );
            }
        }
        CompanyAction::Delete { name } => {
            if !kicho_storage::delete_company(&pool, &name).await? {
                bail!("no company named '{name}'");
            }
        }
        CompanyAction::SetIndustry { name, industry } => {
            kicho_storage::set_company_industry(&pool, &name, &industry).await?;
        }
        CompanyAction::SetCredit { name, account } => {
            kicho_storage::set_company_credit_account(&pool, &name, &account).await?;
        }
    }
    Ok(())
}

fn report_outcome(outcome: &ConversionOutcome) {
    eprintln!(
        "{} 行を変換、{} 行をスキップ、{} 件の警告",
        outcome.rows.len(),
        outcome.skipped_rows,
        outcome.errors.len()
    );
    for error in &outcome.errors {
        eprintln!("  行{}: {} [{}]", error.row, error.message, error.field.label());
    }
}

fn write_csv(csv: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} に書き出しました", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Delimiter parsing ───────────────────────────────────────────────

    #[test]
    fn ascii_delimiters_pass_through() {
        assert_eq!(ascii_delimiter(',').unwrap(), b',');
        assert_eq!(ascii_delimiter('\t').unwrap(), b'\t');
        assert_eq!(ascii_delimiter(';').unwrap(), b';');
    }

    #[test]
    fn wide_delimiter_is_rejected_not_truncated() {
        // '、' (U+3001) truncates to 0x01 when cast to u8.
        assert!(ascii_delimiter('、').is_err());
        assert!(ascii_delimiter('！').is_err());
    }

    // ── Document types ──────────────────────────────────────────────────

    #[test]
    fn mime_lookup_covers_supported_extensions() {
        assert_eq!(mime_for_path(Path::new("a.JPG")).unwrap(), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.pdf")).unwrap(), "application/pdf");
        assert!(mime_for_path(Path::new("a.gif")).is_err());
    }
}
