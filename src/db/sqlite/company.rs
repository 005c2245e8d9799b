//! Company registry

use super::constraints::translate_write_error;
use super::models::{Company, CompanyDraft, NewCompany};
use crate::error::{AppError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

const COMPANY_COLUMNS: &str =
    "company_id, company_name, country, status, created_at, updated_at";

fn map_company(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        company_id: row.get(0)?,
        company_name: row.get(1)?,
        country: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Create a new company
///
/// Fails with `DuplicateEntity` when a company with the same name exists.
pub fn create_company(conn: &Connection, fields: NewCompany) -> Result<Company> {
    let draft = fields.into_draft()?;

    if let Some(existing) = find_company_by_name(conn, &draft.company_name)? {
        tracing::warn!(
            "Rejected company '{}': name taken by company {}",
            draft.company_name,
            existing.company_id
        );
        return Err(AppError::duplicate(
            "company",
            &["company_name"],
            existing.company_name,
        ));
    }

    insert_company(conn, &draft)
}

/// Insert a validated company, relying on the schema for uniqueness
fn insert_company(conn: &Connection, draft: &CompanyDraft) -> Result<Company> {
    conn.execute(
        "INSERT INTO companies (company_name, country, status) VALUES (?1, ?2, ?3)",
        params![draft.company_name, draft.country, draft.status],
    )
    .map_err(|e| translate_write_error(e, "company", &draft.company_name))?;

    let id = conn.last_insert_rowid();
    tracing::info!("Created company: {} ({})", draft.company_name, id);

    get_company_by_id(conn, id)
}

/// Reload a company by ID (used after insert)
fn get_company_by_id(conn: &Connection, id: i64) -> Result<Company> {
    let sql = format!("SELECT {} FROM companies WHERE company_id = ?1", COMPANY_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_company)?)
}

/// Get company by ID
pub fn get_company(conn: &Connection, id: i64) -> Result<Option<Company>> {
    let sql = format!("SELECT {} FROM companies WHERE company_id = ?1", COMPANY_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_company).optional()?)
}

/// Check whether a company ID exists
pub fn company_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE company_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Find company by exact name
pub fn find_company_by_name(conn: &Connection, name: &str) -> Result<Option<Company>> {
    let sql = format!("SELECT {} FROM companies WHERE company_name = ?1", COMPANY_COLUMNS);
    Ok(conn.query_row(&sql, params![name], map_company).optional()?)
}

/// Get all companies
pub fn list_companies(conn: &Connection) -> Result<Vec<Company>> {
    let sql = format!("SELECT {} FROM companies ORDER BY company_id", COMPANY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    let companies = stmt
        .query_map([], map_company)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(companies)
}

/// Get company count
pub fn count_companies(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
    Ok(count)
}
