//! Row/column cell store used by the HP adjustment and inventory commands.
//!
//! The engine never touches battle state from here; these commands only read
//! and write ledger cells through [`Ledger`].

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Blank rows tolerated before a column scan stops.
pub const LEDGER_SCAN_GAP: u32 = 32;

const NAME_COLUMN: u32 = 2; // B
const HP_COLUMN: u32 = 4; // D
const ITEMS_COLUMN: u32 = 6; // F

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("'{name}' not found in sheet '{sheet}'")]
    NameNotFound { sheet: String, name: String },

    #[error("'{0}' has no items")]
    EmptyInventory(String),

    #[error("'{name}' does not have '{item}'")]
    ItemNotFound { name: String, item: String },

    #[error("amount must be a positive integer, got '{0}'")]
    InvalidAmount(String),

    #[error("HP for '{0}' is out of range")]
    HpOverflow(String),

    #[error("ledger storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A1-style cell address, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl FromStr for CellRef {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| LedgerError::InvalidAddress(s.to_string()))?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::InvalidAddress(s.to_string()));
        }
        let col = letters.chars().try_fold(0u32, |acc, c| {
            let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            acc.checked_mul(26).and_then(|v| v.checked_add(digit))
        });
        let row: Option<u32> = digits.parse().ok();
        match (col, row) {
            (Some(col), Some(row)) if row > 0 => Ok(Self { col, row }),
            _ => Err(LedgerError::InvalidAddress(s.to_string())),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters = Vec::new();
        let mut n = self.col;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        let col: String = letters.into_iter().rev().collect();
        write!(f, "{}{}", col, self.row)
    }
}

pub trait Ledger {
    fn get_cell(&self, sheet: &str, cell: &CellRef) -> Result<Option<String>>;

    fn set_cell(&mut self, sheet: &str, cell: &CellRef, value: &str) -> Result<()>;

    /// Values of column `col` from row 1 down to the last non-empty cell
    /// before a run of `LEDGER_SCAN_GAP` blanks.
    fn column_values(&self, sheet: &str, col: u32) -> Result<Vec<String>> {
        let mut values = Vec::new();
        let mut blanks = 0;
        let mut row = 1;
        while blanks < LEDGER_SCAN_GAP {
            match self.get_cell(sheet, &CellRef::new(col, row))? {
                Some(value) if !value.trim().is_empty() => {
                    values.extend(std::iter::repeat_n(String::new(), blanks as usize));
                    values.push(value);
                    blanks = 0;
                }
                _ => blanks += 1,
            }
            row += 1;
        }
        Ok(values)
    }
}

/// In-memory sheets, serializable as `{sheet: {address: value}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryLedger {
    sheets: IndexMap<String, IndexMap<String, String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let ledger: Self =
            serde_json::from_str(text).map_err(|e| LedgerError::Storage(e.to_string()))?;
        // Normalize keys so `d2` and `D2` address the same cell.
        let mut normalized = Self::new();
        for (sheet, cells) in ledger.sheets {
            for (address, value) in cells {
                let cell: CellRef = address.parse()?;
                normalized.set_cell(&sheet, &cell, &value)?;
            }
        }
        Ok(normalized)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Storage(e.to_string()))
    }
}

impl Ledger for MemoryLedger {
    fn get_cell(&self, sheet: &str, cell: &CellRef) -> Result<Option<String>> {
        Ok(self
            .sheets
            .get(sheet)
            .and_then(|cells| cells.get(&cell.to_string()))
            .cloned())
    }

    fn set_cell(&mut self, sheet: &str, cell: &CellRef, value: &str) -> Result<()> {
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .insert(cell.to_string(), value.to_string());
        Ok(())
    }

    fn column_values(&self, sheet: &str, col: u32) -> Result<Vec<String>> {
        let Some(cells) = self.sheets.get(sheet) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<(u32, &String)> = cells
            .iter()
            .filter_map(|(address, value)| {
                let cell: CellRef = address.parse().ok()?;
                (cell.col == col).then_some((cell.row, value))
            })
            .collect();
        rows.sort_by_key(|(row, _)| *row);
        let last = rows.last().map(|(row, _)| *row).unwrap_or(0);
        let mut values = vec![String::new(); last as usize];
        for (row, value) in rows {
            values[row as usize - 1] = value.clone();
        }
        Ok(values)
    }
}

/// Where the HP and inventory commands look in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerLayout {
    /// Names in column B, HP in column D.
    pub hp_sheet: String,
    /// Names in column B, comma separated items in column F.
    pub roster_sheet: String,
    /// `(label, address)` pairs read by [`summary`].
    pub summary_cells: Vec<(String, String)>,
    /// Scratch sheet written by [`check_connection`].
    pub check_sheet: String,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            hp_sheet: "hp".to_string(),
            roster_sheet: "roster".to_string(),
            summary_cells: vec![
                ("A".to_string(), "G2".to_string()),
                ("B".to_string(), "I2".to_string()),
            ],
            check_sheet: "check".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HpAdjustment {
    pub row: u32,
    pub before: i64,
    pub after: i64,
}

/// Accepts decimal digits only, so signs and blanks are rejected.
pub fn parse_amount(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(LedgerError::InvalidAmount(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| LedgerError::InvalidAmount(raw.to_string()))
}

fn find_row(ledger: &impl Ledger, sheet: &str, name: &str) -> Result<u32> {
    let target = name.trim();
    ledger
        .column_values(sheet, NAME_COLUMN)?
        .iter()
        .position(|value| value.trim() == target)
        .map(|idx| idx as u32 + 1)
        .ok_or_else(|| LedgerError::NameNotFound {
            sheet: sheet.to_string(),
            name: target.to_string(),
        })
}

fn normalize_items(raw: Option<String>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Add `delta` to the HP in column D on `name`'s row. Blank or non-numeric
/// cells count as 0.
pub fn adjust_hp(
    ledger: &mut impl Ledger,
    layout: &LedgerLayout,
    name: &str,
    delta: i64,
) -> Result<HpAdjustment> {
    let sheet = layout.hp_sheet.as_str();
    let row = find_row(&*ledger, sheet, name)?;
    let cell = CellRef::new(HP_COLUMN, row);
    let before = ledger
        .get_cell(sheet, &cell)?
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let after = before
        .checked_add(delta)
        .ok_or_else(|| LedgerError::HpOverflow(name.trim().to_string()))?;
    ledger.set_cell(sheet, &cell, &after.to_string())?;
    info!(target: "duel.ledger", player = name, row, before, after, "hp adjusted");
    Ok(HpAdjustment { row, before, after })
}

pub fn summary(ledger: &impl Ledger, layout: &LedgerLayout) -> Result<Vec<(String, String)>> {
    layout
        .summary_cells
        .iter()
        .map(|(label, address)| {
            let cell: CellRef = address.parse()?;
            let value = ledger.get_cell(&layout.hp_sheet, &cell)?.unwrap_or_default();
            Ok((label.clone(), value))
        })
        .collect()
}

/// Append `item` to `name`'s inventory; returns the new list.
pub fn add_item(
    ledger: &mut impl Ledger,
    layout: &LedgerLayout,
    name: &str,
    item: &str,
) -> Result<Vec<String>> {
    let sheet = layout.roster_sheet.as_str();
    let row = find_row(&*ledger, sheet, name)?;
    let cell = CellRef::new(ITEMS_COLUMN, row);
    let mut items = normalize_items(ledger.get_cell(sheet, &cell)?);
    let item = item.trim();
    if !item.is_empty() {
        items.push(item.to_string());
    }
    ledger.set_cell(sheet, &cell, &items.join(","))?;
    info!(target: "duel.ledger", player = name, item, "item added");
    Ok(items)
}

/// Remove one copy of `item` from `name`'s inventory; returns the new list.
pub fn use_item(
    ledger: &mut impl Ledger,
    layout: &LedgerLayout,
    name: &str,
    item: &str,
) -> Result<Vec<String>> {
    let sheet = layout.roster_sheet.as_str();
    let row = find_row(&*ledger, sheet, name)?;
    let cell = CellRef::new(ITEMS_COLUMN, row);
    let mut items = normalize_items(ledger.get_cell(sheet, &cell)?);
    if items.is_empty() {
        return Err(LedgerError::EmptyInventory(name.trim().to_string()));
    }
    let item = item.trim();
    let idx = items
        .iter()
        .position(|held| held == item)
        .ok_or_else(|| LedgerError::ItemNotFound {
            name: name.trim().to_string(),
            item: item.to_string(),
        })?;
    items.remove(idx);
    ledger.set_cell(sheet, &cell, &items.join(","))?;
    info!(target: "duel.ledger", player = name, item, "item used");
    Ok(items)
}

/// Write a stamped marker to A1 of the check sheet and return what reads back.
pub fn check_connection(
    ledger: &mut impl Ledger,
    layout: &LedgerLayout,
    stamp: &str,
) -> Result<String> {
    let cell = CellRef::new(1, 1);
    let sheet = layout.check_sheet.as_str();
    ledger.set_cell(sheet, &cell, &format!("connection OK @ {}", stamp))?;
    let value = ledger.get_cell(sheet, &cell)?.ok_or_else(|| {
        LedgerError::Storage(format!("{}!{} did not read back", sheet, cell))
    })?;
    info!(target: "duel.ledger", sheet, value = %value, "connection checked");
    Ok(value)
}
