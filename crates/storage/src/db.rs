use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;

use kicho_core::{ConversionRules, CorrectionRule, JournalField, JournalPattern};

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("template payload error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown journal field in database: '{0}'")]
    UnknownField(String),
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    init_pool(&pool).await?;
    Ok(pool)
}

/// In-memory database, used by tests.
pub async fn create_memory_db() -> Result<DbPool, StorageError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_pool(&pool).await?;
    Ok(pool)
}

async fn init_pool(pool: &DbPool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;

    run_migrations(pool).await?;
    Ok(())
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS company_settings (
            company_id INTEGER PRIMARY KEY,
            industry TEXT NOT NULL DEFAULT '',
            default_credit_account TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS correction_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            field TEXT NOT NULL,
            from_value TEXT NOT NULL,
            to_value TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (company_id, field, from_value),
            FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS journal_patterns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            keyword TEXT NOT NULL,
            debit_account TEXT NOT NULL DEFAULT '',
            credit_account TEXT NOT NULL DEFAULT '',
            debit_tax TEXT NOT NULL DEFAULT '',
            credit_tax TEXT NOT NULL DEFAULT '',
            debit_sub_account TEXT NOT NULL DEFAULT '',
            credit_sub_account TEXT NOT NULL DEFAULT '',
            count INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (company_id, keyword),
            FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (company_id, name),
            FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ── Companies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyInfo {
    pub id: i64,
    pub name: String,
    pub industry: String,
    pub default_credit_account: String,
}

/// Insert the company if it does not exist yet and return its id.
pub async fn ensure_company(pool: &DbPool, name: &str) -> Result<i64, StorageError> {
    sqlx::query("INSERT OR IGNORE INTO companies (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    let (id,): (i64,) = sqlx::query_as("SELECT id FROM companies WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

pub async fn list_companies(pool: &DbPool) -> Result<Vec<CompanyInfo>, StorageError> {
    let rows = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>)>(
        r#"
        SELECT c.id, c.name, s.industry, s.default_credit_account
        FROM companies c
        LEFT JOIN company_settings s ON s.company_id = c.id
        ORDER BY c.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, industry, credit)| CompanyInfo {
            id,
            name,
            industry: industry.unwrap_or_default(),
            default_credit_account: credit.unwrap_or_default(),
        })
        .collect())
}

/// Returns false if no such company existed. Settings, correction rules,
/// patterns and templates go with it.
pub async fn delete_company(pool: &DbPool, name: &str) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM companies WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_company_industry(
    pool: &DbPool,
    company: &str,
    industry: &str,
) -> Result<(), StorageError> {
    let company_id = ensure_company(pool, company).await?;
    sqlx::query(
        r#"
        INSERT INTO company_settings (company_id, industry) VALUES (?, ?)
        ON CONFLICT (company_id) DO UPDATE SET industry = excluded.industry
        "#,
    )
    .bind(company_id)
    .bind(industry)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_company_credit_account(
    pool: &DbPool,
    company: &str,
    account: &str,
) -> Result<(), StorageError> {
    let company_id = ensure_company(pool, company).await?;
    sqlx::query(
        r#"
        INSERT INTO company_settings (company_id, default_credit_account) VALUES (?, ?)
        ON CONFLICT (company_id) DO UPDATE
            SET default_credit_account = excluded.default_credit_account
        "#,
    )
    .bind(company_id)
    .bind(account)
    .execute(pool)
    .await?;
    Ok(())
}

// ── Correction rules ────────────────────────────────────────────────────

/// Upsert on (company, field, from): re-adding the same correction updates
/// the replacement value.
pub async fn save_correction_rule(
    pool: &DbPool,
    company: &str,
    rule: &CorrectionRule,
) -> Result<(), StorageError> {
    let company_id = ensure_company(pool, company).await?;
    sqlx::query(
        r#"
        INSERT INTO correction_rules (company_id, field, from_value, to_value)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (company_id, field, from_value)
            DO UPDATE SET to_value = excluded.to_value
        "#,
    )
    .bind(company_id)
    .bind(rule.field.as_str())
    .bind(&rule.from)
    .bind(&rule.to)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_correction_rules(
    pool: &DbPool,
    company: &str,
) -> Result<Vec<CorrectionRule>, StorageError> {
    let rows = sqlx::query_as::<_, (i64, String, String, String)>(
        r#"
        SELECT r.id, r.field, r.from_value, r.to_value
        FROM correction_rules r
        JOIN companies c ON c.id = r.company_id
        WHERE c.name = ?
        ORDER BY r.id
        "#,
    )
    .bind(company)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, field, from, to)| {
            let field = JournalField::from_str(&field)
                .map_err(|_| StorageError::UnknownField(field.clone()))?;
            Ok(CorrectionRule {
                id: Some(id),
                company: company.to_string(),
                field,
                from,
                to,
            })
        })
        .collect()
}

pub async fn delete_correction_rule(pool: &DbPool, id: i64) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM correction_rules WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Journal patterns ────────────────────────────────────────────────────

/// Upsert on (company, keyword). An existing pattern absorbs the incoming
/// one: non-empty fields win, occurrence counts add up.
pub async fn save_journal_pattern(
    pool: &DbPool,
    company: &str,
    pattern: &JournalPattern,
) -> Result<(), StorageError> {
    let company_id = ensure_company(pool, company).await?;

    let existing = sqlx::query_as::<_, PatternRow>(
        "SELECT id, keyword, debit_account, credit_account, debit_tax, credit_tax,
                debit_sub_account, credit_sub_account, count
         FROM journal_patterns WHERE company_id = ? AND keyword = ?",
    )
    .bind(company_id)
    .bind(&pattern.keyword)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some(row) => {
            let mut merged = row.into_pattern();
            merged.absorb(pattern);
            sqlx::query(
                r#"
                UPDATE journal_patterns
                SET debit_account = ?, credit_account = ?, debit_tax = ?, credit_tax = ?,
                    debit_sub_account = ?, credit_sub_account = ?, count = ?,
                    updated_at = datetime('now')
                WHERE id = ?
                "#,
            )
            .bind(&merged.debit_account)
            .bind(&merged.credit_account)
            .bind(&merged.debit_tax)
            .bind(&merged.credit_tax)
            .bind(&merged.debit_sub_account)
            .bind(&merged.credit_sub_account)
            .bind(merged.count as i64)
            .bind(merged.id)
            .execute(pool)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO journal_patterns
                    (company_id, keyword, debit_account, credit_account, debit_tax,
                     credit_tax, debit_sub_account, credit_sub_account, count)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(company_id)
            .bind(&pattern.keyword)
            .bind(&pattern.debit_account)
            .bind(&pattern.credit_account)
            .bind(&pattern.debit_tax)
            .bind(&pattern.credit_tax)
            .bind(&pattern.debit_sub_account)
            .bind(&pattern.credit_sub_account)
            .bind(pattern.count.max(1) as i64)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

pub async fn save_journal_patterns(
    pool: &DbPool,
    company: &str,
    patterns: &[JournalPattern],
) -> Result<(), StorageError> {
    for pattern in patterns {
        save_journal_pattern(pool, company, pattern).await?;
    }
    Ok(())
}

pub async fn get_journal_patterns(
    pool: &DbPool,
    company: &str,
) -> Result<Vec<JournalPattern>, StorageError> {
    let rows = sqlx::query_as::<_, PatternRow>(
        r#"
        SELECT p.id, p.keyword, p.debit_account, p.credit_account, p.debit_tax,
               p.credit_tax, p.debit_sub_account, p.credit_sub_account, p.count
        FROM journal_patterns p
        JOIN companies c ON c.id = p.company_id
        WHERE c.name = ?
        ORDER BY p.count DESC, p.keyword
        "#,
    )
    .bind(company)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PatternRow::into_pattern).collect())
}

pub async fn delete_journal_pattern(pool: &DbPool, id: i64) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM journal_patterns WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    id: i64,
    keyword: String,
    debit_account: String,
    credit_account: String,
    debit_tax: String,
    credit_tax: String,
    debit_sub_account: String,
    credit_sub_account: String,
    count: i64,
}

impl PatternRow {
    fn into_pattern(self) -> JournalPattern {
        JournalPattern {
            id: Some(self.id),
            keyword: self.keyword,
            debit_account: self.debit_account,
            credit_account: self.credit_account,
            debit_tax: self.debit_tax,
            credit_tax: self.credit_tax,
            debit_sub_account: self.debit_sub_account,
            credit_sub_account: self.credit_sub_account,
            count: self.count.max(1) as u32,
        }
    }
}

// ── Templates ───────────────────────────────────────────────────────────

/// Saved per-source conversion setup: which column carries which field,
/// the rules to apply, and the header row it was built against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateData {
    pub mapping: Vec<(usize, JournalField)>,
    pub rules: ConversionRules,
    pub source_headers: Vec<String>,
}

pub async fn save_template(
    pool: &DbPool,
    company: &str,
    name: &str,
    data: &TemplateData,
) -> Result<(), StorageError> {
    let company_id = ensure_company(pool, company).await?;
    let payload = serde_json::to_string(data)?;
    sqlx::query(
        r#"
        INSERT INTO templates (company_id, name, payload) VALUES (?, ?, ?)
        ON CONFLICT (company_id, name) DO UPDATE SET payload = excluded.payload
        "#,
    )
    .bind(company_id)
    .bind(name)
    .bind(&payload)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_template(
    pool: &DbPool,
    company: &str,
    name: &str,
) -> Result<Option<TemplateData>, StorageError> {
    let row = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT t.payload FROM templates t
        JOIN companies c ON c.id = t.company_id
        WHERE c.name = ? AND t.name = ?
        "#,
    )
    .bind(company)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

pub async fn list_templates(pool: &DbPool, company: &str) -> Result<Vec<String>, StorageError> {
    let rows = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT t.name FROM templates t
        JOIN companies c ON c.id = t.company_id
        WHERE c.name = ?
        ORDER BY t.name
        "#,
    )
    .bind(company)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

pub async fn delete_template(
    pool: &DbPool,
    company: &str,
    name: &str,
) -> Result<bool, StorageError> {
    let result = sqlx::query(
        r#"
        DELETE FROM templates
        WHERE name = ?
          AND company_id = (SELECT id FROM companies WHERE name = ?)
        "#,
    )
    .bind(name)
    .bind(company)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ── Rule assembly ───────────────────────────────────────────────────────

/// Assemble the per-company configuration bundle the conversion engine
/// receives. Unknown companies yield default rules.
pub async fn load_company_rules(
    pool: &DbPool,
    company: &str,
) -> Result<ConversionRules, StorageError> {
    let settings = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT s.industry, s.default_credit_account
        FROM company_settings s
        JOIN companies c ON c.id = s.company_id
        WHERE c.name = ?
        "#,
    )
    .bind(company)
    .fetch_optional(pool)
    .await?;

    let mut rules = ConversionRules::default();
    if let Some((industry, credit)) = settings {
        rules.industry = industry;
        rules.default_credit_account = credit;
    }
    rules.correction_rules = get_correction_rules(pool, company).await?;
    rules.journal_patterns = get_journal_patterns(pool, company).await?;
    Ok(rules)
}
