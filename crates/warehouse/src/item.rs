use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    ClassificationId, DepartmentId, DomainError, DomainResult, Entity, ItemId, LocationId, Page,
    PageRequest, UserId, matches_query, optional_text, paginate, require_text,
};

use crate::Location;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub department_id: DepartmentId,
    pub item_number: String,
    pub item_name: String,
    pub quantity: i64,
    pub min_quantity: i64,
    pub unit: Option<String>,
    /// Free-text location label shown on cards.
    pub location: String,
    pub classification_id: Option<ClassificationId>,
    pub location_id: Option<LocationId>,
    pub image_url: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for InventoryItem {
    type Id = ItemId;
    const KIND: &'static str = "inventory_items";

    fn id(&self) -> ItemId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub item_number: String,
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
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub item_number: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<i64>,
    pub min_quantity: Option<i64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub classification_id: Option<ClassificationId>,
    pub location_id: Option<LocationId>,
    pub image_url: Option<String>,
}

fn non_negative(field: &str, value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

impl InventoryItem {
    pub fn create(
        department_id: DepartmentId,
        input: NewInventoryItem,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: ItemId::new(),
            department_id,
            item_number: require_text("item_number", &input.item_number)?,
            item_name: require_text("item_name", &input.item_name)?,
            quantity: non_negative("quantity", input.quantity)?,
            min_quantity: non_negative("min_quantity", input.min_quantity)?,
            unit: optional_text(input.unit),
            location: input.location.trim().to_string(),
            classification_id: input.classification_id,
            location_id: input.location_id,
            image_url: optional_text(input.image_url),
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ItemPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(v) = patch.item_number {
            next.item_number = require_text("item_number", &v)?;
        }
        if let Some(v) = patch.item_name {
            next.item_name = require_text("item_name", &v)?;
        }
        if let Some(v) = patch.quantity {
            next.quantity = non_negative("quantity", v)?;
        }
        if let Some(v) = patch.min_quantity {
            next.min_quantity = non_negative("min_quantity", v)?;
        }
        if patch.unit.is_some() {
            next.unit = optional_text(patch.unit);
        }
        if let Some(v) = patch.location {
            next.location = v.trim().to_string();
        }
        if patch.classification_id.is_some() {
            next.classification_id = patch.classification_id;
        }
        if patch.location_id.is_some() {
            next.location_id = patch.location_id;
        }
        if patch.image_url.is_some() {
            next.image_url = optional_text(patch.image_url);
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// A set `location_id` must name a location of the item's classification
    /// and department.
    pub fn check_placement(&self, location: Option<&Location>) -> DomainResult<()> {
        let Some(location_id) = self.location_id else {
            return Ok(());
        };
        let location = location
            .filter(|l| l.id == location_id)
            .ok_or_else(|| DomainError::not_found(format!("location {location_id}")))?;
        if location.department_id != self.department_id
            || Some(location.classification_id) != self.classification_id
        {
            return Err(DomainError::validation(
                "location must belong to the item's classification",
            ));
        }
        Ok(())
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

/// Item listing filter: text search plus folder narrowing, ordered by item number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub classification_id: Option<ClassificationId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

impl ItemQuery {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if self.classification_id.is_some() && item.classification_id != self.classification_id {
            return false;
        }
        if self.location_id.is_some() && item.location_id != self.location_id {
            return false;
        }
        matches_query(
            self.search.as_deref().unwrap_or_default(),
            [
                item.item_name.as_str(),
                item.item_number.as_str(),
                item.location.as_str(),
            ],
        )
    }

    pub fn page_request(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(default.page),
            self.per_page.unwrap_or(default.per_page),
        )
    }

    pub fn apply(&self, items: Vec<InventoryItem>) -> Page<InventoryItem> {
        let mut out: Vec<InventoryItem> = items.into_iter().filter(|i| self.matches(i)).collect();
        out.sort_by(|a, b| a.item_number.cmp(&b.item_number));
        paginate(out, self.page_request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Classification, NewClassification, NewLocation};

    fn item(dept: DepartmentId, number: &str, name: &str) -> InventoryItem {
        InventoryItem::create(
            dept,
            NewInventoryItem {
                item_number: number.into(),
                item_name: name.into(),
                quantity: 4,
                location: "Bay 2".into(),
                ..Default::default()
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn quantities_cannot_start_negative() {
        let input = NewInventoryItem {
            item_number: "X".into(),
            item_name: "Y".into(),
            quantity: -1,
            ..Default::default()
        };
        assert!(InventoryItem::create(DepartmentId::new(), input, UserId::new(), Utc::now()).is_err());
    }

    #[test]
    fn placement_must_match_classification() {
        let dept = DepartmentId::new();
        let now = Utc::now();
        let folder = Classification::create(
            dept,
            NewClassification {
                name: "Tools".into(),
                ..Default::default()
            },
            1,
            UserId::new(),
            now,
        )
        .unwrap();
        let other = Classification::create(
            dept,
            NewClassification {
                name: "Chemicals".into(),
                ..Default::default()
            },
            2,
            UserId::new(),
            now,
        )
        .unwrap();
        let loc = Location::create(
            &folder,
            NewLocation {
                name: "Shelf 1".into(),
                ..Default::default()
            },
            1,
            UserId::new(),
            now,
        )
        .unwrap();

        let mut i = item(dept, "T-1", "Torque wrench");
        i.classification_id = Some(folder.id);
        i.location_id = Some(loc.id);
        assert!(i.check_placement(Some(&loc)).is_ok());

        i.classification_id = Some(other.id);
        assert!(i.check_placement(Some(&loc)).is_err());
        assert!(matches!(i.check_placement(None), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn query_orders_by_item_number_and_pages() {
        let dept = DepartmentId::new();
        let items = vec![
            item(dept, "C-3", "Cable"),
            item(dept, "A-1", "Anchor bolt"),
            item(dept, "B-2", "Bearing"),
        ];
        let q = ItemQuery {
            per_page: Some(2),
            ..Default::default()
        };
        let page = q.apply(items.clone());
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        let numbers: Vec<_> = page.items.iter().map(|i| i.item_number.as_str()).collect();
        assert_eq!(numbers, vec!["A-1", "B-2"]);

        let q = ItemQuery {
            search: Some("bear".into()),
            ..Default::default()
        };
        assert_eq!(q.apply(items).items.len(), 1);
    }
}
