//! # Tariff Schedule Import
//!
//! Reads the published tariff schedule CSV and upserts it by item number.
//!
//! ```text
//! Codigo,partida,dai,isc,ispc,isv,padre,nivel
//! 8471.30.00.00,Máquinas portátiles,0.00,0,0,0.15,8471.30,4
//!       │            │               └──┴──┴──┴── fractions (0.15 = 15%)
//!       │            └── description
//!       └── item_no (also the tariff code)
//! ```
//! Empty, `-` and `nan` rate cells read as zero.

use std::io::Read;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::tariff::TariffRepository;
use sicarga_core::tariff::derive_hierarchy;
use sicarga_core::{TariffItem, TariffRates, TaxRate};

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    #[serde(rename = "Codigo")]
    codigo: String,
    partida: String,
    #[serde(default)]
    dai: String,
    #[serde(default)]
    isc: String,
    #[serde(default)]
    ispc: String,
    #[serde(default)]
    isv: String,
    #[serde(default)]
    padre: Option<String>,
    #[serde(default)]
    nivel: Option<String>,
}

/// Rows written and rows skipped by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

fn rate(field: &str, text: &str) -> Result<TaxRate, String> {
    let text = text.trim();
    if text.is_empty() || text == "-" || text.eq_ignore_ascii_case("nan") {
        return Ok(TaxRate::zero());
    }

    // Spreadsheet exports pad fractions ("0.150000")
    let text = match text.split_once('.') {
        Some((int, frac)) => {
            let int = if int.is_empty() { "0" } else { int };
            match frac.trim_end_matches('0') {
                "" => int.to_string(),
                frac => format!("{int}.{frac}"),
            }
        }
        None => text.to_string(),
    };

    TaxRate::parse_fraction(field, &text).map_err(|e| e.to_string())
}

fn to_item(row: ScheduleRow) -> Result<Option<TariffItem>, String> {
    let item_no = row.codigo.trim();
    if item_no.is_empty() {
        return Ok(None);
    }

    let description = match row.partida.trim() {
        "" => "Sin descripción",
        text => text,
    };

    let rates = TariffRates {
        dai: rate("dai", &row.dai)?,
        isc: rate("isc", &row.isc)?,
        ispc: rate("ispc", &row.ispc)?,
        isv: rate("isv", &row.isv)?,
    };

    let mut item = TariffItem::new(item_no, description, rates);
    item.parent_code = row
        .padre
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("nan"));
    item.hierarchy_level = row
        .nivel
        .and_then(|n| n.trim().parse::<i64>().ok())
        .unwrap_or_else(|| derive_hierarchy(item_no).level);

    Ok(Some(item))
}

/// Parses a schedule CSV into tariff lines.
///
/// Rows without an item number are skipped; any other malformed row fails
/// the whole read with its line number.
pub fn read_schedule<R: Read>(reader: R) -> DbResult<(Vec<TariffItem>, usize)> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| DbError::ImportFailed {
            line: 1,
            message: e.to_string(),
        })?
        .clone();

    let mut items = Vec::new();
    let mut skipped = 0;

    for record in csv.records() {
        let record = record.map_err(|e| DbError::ImportFailed {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let row: ScheduleRow = record
            .deserialize(Some(&headers))
            .map_err(|e| DbError::ImportFailed {
                line,
                message: e.to_string(),
            })?;

        match to_item(row).map_err(|message| DbError::ImportFailed { line, message })? {
            Some(item) => items.push(item),
            None => {
                warn!(line, "Skipping row without Codigo");
                skipped += 1;
            }
        }
    }

    Ok((items, skipped))
}

/// Reads a schedule and upserts every line.
pub async fn import_schedule<R: Read>(repo: &TariffRepository, reader: R) -> DbResult<ImportSummary> {
    let (items, skipped) = read_schedule(reader)?;
    let mut summary = ImportSummary {
        skipped,
        ..Default::default()
    };

    for item in &items {
        let (_, inserted) = repo.upsert_by_item_no(item).await?;
        if inserted {
            summary.inserted += 1;
        } else {
            summary.updated += 1;
        }
    }

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        "Tariff schedule imported"
    );
    Ok(summary)
}

// =============================================================================
// Unit Tests
// =============================================================================
