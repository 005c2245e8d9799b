//! SQLite database models

use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Enumerations
// ============================================================================

/// Supported markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Country {
    CoteDIvoire,
    Benin,
    BurkinaFaso,
    GuineaBissau,
    Mali,
    Niger,
    Senegal,
    Togo,
}

impl Country {
    pub const ALL: [Country; 8] = [
        Country::CoteDIvoire,
        Country::Benin,
        Country::BurkinaFaso,
        Country::GuineaBissau,
        Country::Mali,
        Country::Niger,
        Country::Senegal,
        Country::Togo,
    ];

    /// Stored code
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::CoteDIvoire => "COTE_D_IVOIRE",
            Country::Benin => "BENIN",
            Country::BurkinaFaso => "BURKINA_FASO",
            Country::GuineaBissau => "GUINEA_BISSAU",
            Country::Mali => "MALI",
            Country::Niger => "NIGER",
            Country::Senegal => "SENEGAL",
            Country::Togo => "TOGO",
        }
    }

    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            Country::CoteDIvoire => "Côte d'Ivoire",
            Country::Benin => "Bénin",
            Country::BurkinaFaso => "Burkina Faso",
            Country::GuineaBissau => "Guinée-Bissau",
            Country::Mali => "Mali",
            Country::Niger => "Niger",
            Country::Senegal => "Sénégal",
            Country::Togo => "Togo",
        }
    }
}

impl FromStr for Country {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Country::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s) || c.label() == s)
            .ok_or_else(|| invalid("country", s))
    }
}

/// Company listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyStatus {
    #[default]
    Active,
    Inactive,
    Delisted,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "ACTIVE",
            CompanyStatus::Inactive => "INACTIVE",
            CompanyStatus::Delisted => "DELISTED",
        }
    }
}

impl FromStr for CompanyStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(CompanyStatus::Active),
            "INACTIVE" => Ok(CompanyStatus::Inactive),
            "DELISTED" => Ok(CompanyStatus::Delisted),
            _ => Err(invalid("status", s)),
        }
    }
}

/// Equity trading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingStatus {
    #[default]
    Active,
    Suspended,
    Delisted,
}

impl TradingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingStatus::Active => "ACTIVE",
            TradingStatus::Suspended => "SUSPENDED",
            TradingStatus::Delisted => "DELISTED",
        }
    }
}

impl FromStr for TradingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(TradingStatus::Active),
            "SUSPENDED" => Ok(TradingStatus::Suspended),
            "DELISTED" => Ok(TradingStatus::Delisted),
            _ => Err(invalid("trading_status", s)),
        }
    }
}

fn invalid(field: &str, value: &str) -> AppError {
    AppError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

// Enums are stored as their TEXT code
macro_rules! text_column {
    ($($ty:ty),+) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
            }
        }
    )+};
}

text_column!(Country, CompanyStatus, TradingStatus);

// ============================================================================
// Entities
// ============================================================================

/// Company model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: i64,
    pub company_name: String,
    pub country: Country,
    pub status: CompanyStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Equity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    pub equity_id: i64,
    pub company_id: i64,
    pub ticker: String,
    pub isin: String,
    pub listing_date: Option<NaiveDate>,
    pub trading_status: TradingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Trading calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDay {
    pub trading_id: i64,
    pub trading_date: NaiveDate,
    pub is_open: bool,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// End-of-day price record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityEodPrice {
    pub eod_price_id: i64,
    pub equity_id: i64,
    pub trading_date: NaiveDate,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: f64,
    pub volume: Option<i64>,
    pub traded_value: Option<f64>,
    pub full_data_flag: bool,
    pub data_source: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ============================================================================
// Create requests
// ============================================================================

/// Parse a create request from caller-supplied JSON
///
/// Unknown enum values and malformed dates are rejected here, before any
/// store access.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Create request for a company
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCompany {
    pub company_name: Option<String>,
    pub country: Option<Country>,
    /// Defaults to `ACTIVE`
    pub status: Option<CompanyStatus>,
}

/// Validated company insert
#[derive(Debug, Clone)]
pub struct CompanyDraft {
    pub company_name: String,
    pub country: Country,
    pub status: CompanyStatus,
}

impl NewCompany {
    pub fn new(company_name: impl Into<String>, country: Country) -> Self {
        Self {
            company_name: Some(company_name.into()),
            country: Some(country),
            status: None,
        }
    }

    pub fn with_status(mut self, status: CompanyStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check required fields and apply defaults
    pub fn into_draft(self) -> Result<CompanyDraft> {
        let mut missing = Vec::new();
        if is_blank(&self.company_name) {
            missing.push("company_name");
        }
        if self.country.is_none() {
            missing.push("country");
        }

        match (self.company_name, self.country) {
            (Some(company_name), Some(country)) if missing.is_empty() => Ok(CompanyDraft {
                company_name: company_name.trim().to_string(),
                country,
                status: self.status.unwrap_or_default(),
            }),
            _ => Err(AppError::missing(&missing)),
        }
    }
}

/// Create request for an equity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEquity {
    pub company_id: Option<i64>,
    pub ticker: Option<String>,
    pub isin: Option<String>,
    pub listing_date: Option<NaiveDate>,
    /// Defaults to `ACTIVE`
    pub trading_status: Option<TradingStatus>,
}

/// Validated equity insert
#[derive(Debug, Clone)]
pub struct EquityDraft {
    pub company_id: i64,
    pub ticker: String,
    pub isin: String,
    pub listing_date: Option<NaiveDate>,
    pub trading_status: TradingStatus,
}

impl NewEquity {
    pub fn new(company_id: i64, ticker: impl Into<String>, isin: impl Into<String>) -> Self {
        Self {
            company_id: Some(company_id),
            ticker: Some(ticker.into()),
            isin: Some(isin.into()),
            ..Default::default()
        }
    }

    pub fn with_listing_date(mut self, date: NaiveDate) -> Self {
        self.listing_date = Some(date);
        self
    }

    pub fn with_trading_status(mut self, status: TradingStatus) -> Self {
        self.trading_status = Some(status);
        self
    }

    /// Check required fields and apply defaults
    pub fn into_draft(self) -> Result<EquityDraft> {
        let mut missing = Vec::new();
        if self.company_id.is_none() {
            missing.push("company_id");
        }
        if is_blank(&self.ticker) {
            missing.push("ticker");
        }
        if is_blank(&self.isin) {
            missing.push("isin");
        }

        match (self.company_id, self.ticker, self.isin) {
            (Some(company_id), Some(ticker), Some(isin)) if missing.is_empty() => {
                Ok(EquityDraft {
                    company_id,
                    ticker: ticker.trim().to_string(),
                    isin: isin.trim().to_string(),
                    listing_date: self.listing_date,
                    trading_status: self.trading_status.unwrap_or_default(),
                })
            }
            _ => Err(AppError::missing(&missing)),
        }
    }
}

/// Get-or-create request for a trading day
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTradingDay {
    pub trading_date: Option<NaiveDate>,
    /// Defaults to `true`
    pub is_open: Option<bool>,
    pub note: Option<String>,
}

/// Validated trading day insert
#[derive(Debug, Clone)]
pub struct TradingDayDraft {
    pub trading_date: NaiveDate,
    pub is_open: bool,
    pub note: Option<String>,
}

impl NewTradingDay {
    pub fn new(trading_date: NaiveDate) -> Self {
        Self {
            trading_date: Some(trading_date),
            ..Default::default()
        }
    }

    pub fn closed(mut self) -> Self {
        self.is_open = Some(false);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn into_draft(self) -> Result<TradingDayDraft> {
        let trading_date = self
            .trading_date
            .ok_or_else(|| AppError::missing(&["trading_date"]))?;

        Ok(TradingDayDraft {
            trading_date,
            is_open: self.is_open.unwrap_or(true),
            note: self.note,
        })
    }
}

/// Create request for an EOD price
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEodPrice {
    pub equity_id: Option<i64>,
    pub trading_date: Option<NaiveDate>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub volume: Option<i64>,
    pub traded_value: Option<f64>,
    /// Defaults to `false`
    pub full_data_flag: Option<bool>,
    pub data_source: Option<String>,
}

/// Validated EOD price insert
#[derive(Debug, Clone)]
pub struct EodPriceDraft {
    pub equity_id: i64,
    pub trading_date: NaiveDate,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: f64,
    pub volume: Option<i64>,
    pub traded_value: Option<f64>,
    pub full_data_flag: bool,
    pub data_source: Option<String>,
}

impl NewEodPrice {
    pub fn new(equity_id: i64, trading_date: NaiveDate, close_price: f64) -> Self {
        Self {
            equity_id: Some(equity_id),
            trading_date: Some(trading_date),
            close_price: Some(close_price),
            ..Default::default()
        }
    }

    pub fn into_draft(self) -> Result<EodPriceDraft> {
        let mut missing = Vec::new();
        if self.equity_id.is_none() {
            missing.push("equity_id");
        }
        if self.trading_date.is_none() {
            missing.push("trading_date");
        }
        if self.close_price.is_none() {
            missing.push("close_price");
        }

        match (self.equity_id, self.trading_date, self.close_price) {
            (Some(equity_id), Some(trading_date), Some(close_price)) => Ok(EodPriceDraft {
                equity_id,
                trading_date,
                open_price: self.open_price,
                high_price: self.high_price,
                low_price: self.low_price,
                close_price,
                volume: self.volume,
                traded_value: self.traded_value,
                full_data_flag: self.full_data_flag.unwrap_or(false),
                data_source: self.data_source,
            }),
            _ => Err(AppError::missing(&missing)),
        }
    }
}
