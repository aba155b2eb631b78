use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    ClassificationId, DepartmentId, DomainError, DomainResult, Entity, LocationId, UserId,
    optional_text, require_hex_color, require_text,
};

use crate::InventoryItem;

pub const DEFAULT_FOLDER_ICON: &str = "Folder";
pub const DEFAULT_FOLDER_COLOR: &str = "#6366F1";

/// Top-level warehouse folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub id: ClassificationId,
    pub department_id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: String,
    pub sort_order: i32,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Classification {
    type Id = ClassificationId;
    const KIND: &'static str = "warehouse_classifications";

    fn id(&self) -> ClassificationId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

/// Shelf/bin inside a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub classification_id: ClassificationId,
    pub department_id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub min_items: i64,
    pub sort_order: i32,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Location {
    type Id = LocationId;
    const KIND: &'static str = "warehouse_locations";

    fn id(&self) -> LocationId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClassification {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_items: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub min_items: Option<i64>,
    pub sort_order: Option<i32>,
}

/// One past the highest existing order; 1 for the first sibling.
pub fn next_sort_order(existing: impl IntoIterator<Item = i32>) -> i32 {
    existing.into_iter().max().unwrap_or(0).max(0) + 1
}

fn min_items(value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation("min_items cannot be negative"));
    }
    Ok(value)
}

impl Classification {
    pub fn create(
        department_id: DepartmentId,
        input: NewClassification,
        sort_order: i32,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let color = match optional_text(input.color) {
            Some(c) => require_hex_color("color", &c)?,
            None => DEFAULT_FOLDER_COLOR.to_string(),
        };
        Ok(Self {
            id: ClassificationId::new(),
            department_id,
            name: require_text("name", &input.name)?,
            description: optional_text(input.description),
            icon: optional_text(input.icon).unwrap_or_else(|| DEFAULT_FOLDER_ICON.to_string()),
            color,
            sort_order,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ClassificationPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = require_text("name", &name)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if let Some(icon) = optional_text(patch.icon) {
            next.icon = icon;
        }
        if let Some(color) = optional_text(patch.color) {
            next.color = require_hex_color("color", &color)?;
        }
        if let Some(order) = patch.sort_order {
            next.sort_order = order;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Folders still holding locations or items cannot be removed.
    pub fn ensure_deletable(&self, location_count: usize, item_count: usize) -> DomainResult<()> {
        if location_count > 0 || item_count > 0 {
            return Err(DomainError::conflict(format!(
                "classification '{}' still has {location_count} locations and {item_count} items",
                self.name
            )));
        }
        Ok(())
    }
}

impl Location {
    pub fn create(
        classification: &Classification,
        input: NewLocation,
        sort_order: i32,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: LocationId::new(),
            classification_id: classification.id,
            department_id: classification.department_id,
            name: require_text("name", &input.name)?,
            description: optional_text(input.description),
            min_items: min_items(input.min_items.unwrap_or(0))?,
            sort_order,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: LocationPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = require_text("name", &name)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if let Some(v) = patch.min_items {
            next.min_items = min_items(v)?;
        }
        if let Some(order) = patch.sort_order {
            next.sort_order = order;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn ensure_deletable(&self, item_count: usize) -> DomainResult<()> {
        if item_count > 0 {
            return Err(DomainError::conflict(format!(
                "location '{}' still holds {item_count} items",
                self.name
            )));
        }
        Ok(())
    }
}

/// Folder card figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderStats {
    pub location_count: usize,
    pub item_count: usize,
    pub total_quantity: i64,
    pub low_stock_count: usize,
}

fn item_figures<'a>(items: impl Iterator<Item = &'a InventoryItem>) -> FolderStats {
    items.fold(FolderStats::default(), |mut s, i| {
        s.item_count += 1;
        s.total_quantity += i.quantity;
        if i.quantity <= i.min_quantity {
            s.low_stock_count += 1;
        }
        s
    })
}

pub fn classification_stats(
    classification: &Classification,
    locations: &[Location],
    items: &[InventoryItem],
) -> FolderStats {
    let mut stats = item_figures(
        items
            .iter()
            .filter(|i| i.classification_id == Some(classification.id)),
    );
    stats.location_count = locations
        .iter()
        .filter(|l| l.classification_id == classification.id)
        .count();
    stats
}

pub fn location_stats(location: &Location, items: &[InventoryItem]) -> FolderStats {
    item_figures(items.iter().filter(|i| i.location_id == Some(location.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewInventoryItem;

    fn folder() -> Classification {
        Classification::create(
            DepartmentId::new(),
            NewClassification {
                name: "Spare Parts".into(),
                ..Default::default()
            },
            1,
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn defaults_icon_and_colour() {
        let c = folder();
        assert_eq!(c.icon, DEFAULT_FOLDER_ICON);
        assert_eq!(c.color, DEFAULT_FOLDER_COLOR);
    }

    #[test]
    fn sort_order_follows_max() {
        assert_eq!(next_sort_order([]), 1);
        assert_eq!(next_sort_order([3, 1, 7]), 8);
    }

    #[test]
    fn folders_with_children_are_not_deletable() {
        let c = folder();
        assert!(c.ensure_deletable(0, 0).is_ok());
        assert!(matches!(c.ensure_deletable(1, 0), Err(DomainError::Conflict(_))));
        assert!(matches!(c.ensure_deletable(0, 2), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn location_rejects_negative_minimum() {
        let c = folder();
        let input = NewLocation {
            name: "Rack A".into(),
            min_items: Some(-1),
            ..Default::default()
        };
        assert!(Location::create(&c, input, 1, UserId::new(), Utc::now()).is_err());
    }

    #[test]
    fn stats_count_low_stock_at_or_below_minimum() {
        let c = folder();
        let loc = Location::create(
            &c,
            NewLocation {
                name: "Rack A".into(),
                ..Default::default()
            },
            1,
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        let mk = |qty: i64, min: i64| {
            let mut i = InventoryItem::create(
                c.department_id,
                NewInventoryItem {
                    item_number: format!("P-{qty}-{min}"),
                    item_name: "Filter".into(),
                    quantity: qty,
                    min_quantity: min,
                    location: "Rack A".into(),
                    classification_id: Some(c.id),
                    location_id: Some(loc.id),
                    ..Default::default()
                },
                UserId::new(),
                Utc::now(),
            )
            .unwrap();
            i.location_id = Some(loc.id);
            i
        };
        let items = vec![mk(5, 5), mk(6, 5), mk(0, 0)];

        let s = classification_stats(&c, std::slice::from_ref(&loc), &items);
        assert_eq!(s.location_count, 1);
        assert_eq!(s.item_count, 3);
        assert_eq!(s.total_quantity, 11);
        assert_eq!(s.low_stock_count, 2);
        assert_eq!(location_stats(&loc, &items), FolderStats { location_count: 0, ..s });
    }
}
