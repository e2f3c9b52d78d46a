pub mod db;

pub use db::{
    create_db, create_memory_db, delete_company, delete_correction_rule, delete_journal_pattern,
    delete_template, ensure_company, get_correction_rules, get_journal_patterns, get_template,
    list_companies, list_templates, load_company_rules, save_correction_rule,
    save_journal_pattern, save_journal_patterns, save_template, set_company_credit_account,
    set_company_industry, CompanyInfo, DbPool, StorageError, TemplateData,
};
