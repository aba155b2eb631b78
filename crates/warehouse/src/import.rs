//! Bulk item import.
//!
//! Rows arrive as a spreadsheet would give them: name, quantity, unit and
//! minimum, optionally a number and placement. Every row is checked before
//! any item is built, so an import either creates all of its items or none.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    ClassificationId, DepartmentId, DomainError, DomainResult, LocationId, UserId,
};

use crate::{InventoryItem, NewInventoryItem};

/// Largest batch a single import accepts.
pub const MAX_IMPORT_ROWS: usize = 1000;

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    /// Generated when absent.
    #[serde(default)]
    pub item_number: Option<String>,
    pub item_name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub classification_id: Option<ClassificationId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

/// `IT-YYYYMMDD-XXXXXXXX`.
pub fn import_item_number(date: NaiveDate, suffix: &str) -> String {
    format!("IT-{}-{suffix}", date.format("%Y%m%d"))
}

/// Eight random upper-case letters and digits.
pub fn random_import_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

fn number_key(number: &str) -> String {
    number.trim().to_ascii_uppercase()
}

/// Builds the items for `rows`, or reports every bad row at once.
///
/// Item numbers must be unique within the department (`existing`) and within
/// the batch, compared case-insensitively. `suffix` supplies the random part
/// of generated numbers.
pub fn plan_import(
    department_id: DepartmentId,
    rows: Vec<ImportRow>,
    existing: &[InventoryItem],
    created_by: UserId,
    now: DateTime<Utc>,
    mut suffix: impl FnMut() -> String,
) -> DomainResult<Vec<InventoryItem>> {
    if rows.is_empty() {
        return Err(DomainError::validation("an import needs at least one row"));
    }
    if rows.len() > MAX_IMPORT_ROWS {
        return Err(DomainError::validation(format!(
            "an import takes at most {MAX_IMPORT_ROWS} rows, got {}",
            rows.len()
        )));
    }

    let mut taken: HashSet<String> = existing
        .iter()
        .filter(|i| i.department_id == department_id)
        .map(|i| number_key(&i.item_number))
        .collect();
    let mut problems = Vec::new();
    let mut items = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        // One-based, as a spreadsheet shows it.
        let line = index + 1;
        let item_number = match row.item_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => {
                if !taken.insert(number_key(number)) {
                    problems.push(format!("row {line}: item number {number} already exists"));
                    continue;
                }
                number.to_string()
            }
            _ => loop {
                let generated = import_item_number(now.date_naive(), &suffix());
                if taken.insert(number_key(&generated)) {
                    break generated;
                }
            },
        };

        let input = NewInventoryItem {
            item_number,
            item_name: row.item_name,
            quantity: row.quantity,
            min_quantity: row.min_quantity,
            unit: row.unit,
            location: row.location,
            classification_id: row.classification_id,
            location_id: row.location_id,
            image_url: None,
        };
        match InventoryItem::create(department_id, input, created_by, now) {
            Ok(item) => items.push(item),
            Err(e) => problems.push(format!("row {line}: {}", e.message())),
        }
    }

    if !problems.is_empty() {
        return Err(DomainError::validation(problems.join("; ")));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, number: Option<&str>, quantity: i64) -> ImportRow {
        ImportRow {
            item_number: number.map(Into::into),
            item_name: name.into(),
            quantity,
            min_quantity: 1,
            unit: Some("pcs".into()),
            ..Default::default()
        }
    }

    fn fixed_suffixes(values: &[&'static str]) -> impl FnMut() -> String {
        let mut values = values.iter();
        move || values.next().copied().unwrap_or("ZZZZZZZZ").to_string()
    }

    #[test]
    fn numbers_follow_the_dated_format() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        assert_eq!(import_item_number(date, "AB12CD34"), "IT-20260108-AB12CD34");
        let suffix = random_import_suffix();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)));
    }

    #[test]
    fn every_bad_row_is_reported_and_nothing_is_built() {
        let dept = DepartmentId::new();
        let rows = vec![
            row("Laptop", None, 3),
            row("", None, 1),
            row("Monitor", Some("MON-1"), -2),
            row("Dock", Some("mon-1"), 1),
        ];
        let err = plan_import(dept, rows, &[], UserId::new(), Utc::now(), random_import_suffix)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 2"), "{message}");
        assert!(message.contains("row 3"), "{message}");
        assert!(message.contains("row 4"), "{message}");
        assert!(!message.contains("row 1"), "{message}");
    }

    #[test]
    fn existing_numbers_in_the_department_are_refused() {
        let dept = DepartmentId::new();
        let now = Utc::now();
        let user = UserId::new();
        let plan = |dept, rows, existing: &[InventoryItem]| {
            plan_import(dept, rows, existing, user, now, random_import_suffix)
        };
        let existing = plan(dept, vec![row("Router", Some("RT-1"), 1)], &[]).unwrap();

        assert!(plan(dept, vec![row("Switch", Some("rt-1"), 1)], &existing).is_err());
        // Another department may reuse the number.
        assert!(plan(DepartmentId::new(), vec![row("Switch", Some("RT-1"), 1)], &existing).is_ok());
    }

    #[test]
    fn generated_numbers_skip_collisions() {
        let dept = DepartmentId::new();
        let now = Utc::now();
        let items = plan_import(
            dept,
            vec![row("Mouse", None, 5), row("Keyboard", None, 5)],
            &[],
            UserId::new(),
            now,
            fixed_suffixes(&["AAAAAAAA", "AAAAAAAA", "BBBBBBBB"]),
        )
        .unwrap();
        let date = now.date_naive();
        assert_eq!(items[0].item_number, import_item_number(date, "AAAAAAAA"));
        assert_eq!(items[1].item_number, import_item_number(date, "BBBBBBBB"));
        assert_eq!(items[1].unit.as_deref(), Some("pcs"));
    }

    #[test]
    fn empty_imports_are_rejected() {
        let empty = plan_import(
            DepartmentId::new(),
            Vec::new(),
            &[],
            UserId::new(),
            Utc::now(),
            random_import_suffix,
        );
        assert!(empty.is_err());
    }
}
