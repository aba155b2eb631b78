//! Warehouse: folders, items, stock movements, item requests, approvers
//! and the derived views.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use opsconsole_auth::{
    AppRole, Principal, authorize, authorize_in_department,
    permissions::{
        WAREHOUSE_APPROVERS_MANAGE, WAREHOUSE_READ, WAREHOUSE_REQUESTS_CREATE,
        WAREHOUSE_STRUCTURE_MANAGE, WAREHOUSE_WRITE,
    },
};
use opsconsole_core::{
    ApproverId, ClassificationId, DepartmentId, DomainError, ExpectedVersion, ItemId,
    ItemRequestId, LocationId, Page,
};
use opsconsole_notifications::{NewNotification, NotificationKind};
use opsconsole_warehouse::{
    Approver, ApproverPatch, Classification, ClassificationPatch, FolderStats, ImportRow,
    InventoryItem, InventoryStats, ItEquipmentEntry, ItemPatch, ItemQuery, ItemRequest, Location,
    LocationPatch, LowStockReport, NewApprover, NewClassification, NewInventoryItem, NewItemRequest, NewLocation,
    StockMovement, StockTransaction, TransactionQuery, TransactionType, active_by_name,
    classification_stats, crossed_min_threshold, inventory_stats, it_equipment, location_stats,
    low_stock_report, next_sort_order, plan_import, random_import_suffix,
};

use super::{
    Change, MAX_WRITE_ATTEMPTS, ServiceError, ServiceResult, Services, ensure_record_access,
    target_department,
};
use crate::store::WriteBatch;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateClassification {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub classification: NewClassification,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateItem {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub item: NewInventoryItem,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportItems {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub request: NewItemRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationCard {
    #[serde(flatten)]
    pub classification: Classification,
    pub stats: FolderStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationCard {
    #[serde(flatten)]
    pub location: Location,
    pub stats: FolderStats,
}

/// The stored request with the stock movements it caused.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRequestReceipt {
    pub request: ItemRequest,
    pub transactions: Vec<StockTransaction>,
}

impl Services {
    async fn department_items(&self, department: DepartmentId) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.stores.items.list_by_department(&[department]).await?)
    }

    async fn scoped_items(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<Vec<InventoryItem>> {
        authorize(principal, &WAREHOUSE_READ)?;
        Ok(self
            .scoped(&self.stores.items, principal)
            .await?
            .into_iter()
            .filter(|i| department.is_none_or(|d| i.department_id == d))
            .collect())
    }

    /// Tell the department's supervisors when stock drops to its minimum.
    async fn alert_low_stock(&self, actor: &Principal, item: &InventoryItem, previous: i64) {
        if !crossed_min_threshold(previous, item.quantity, item.min_quantity) {
            return;
        }
        let recipients = match self
            .department_members(item.department_id, AppRole::Supervisor)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "low-stock recipients lookup failed");
                return;
            }
        };
        tracing::info!(item_id = %item.id, quantity = item.quantity, "item reached minimum stock");
        self.notify(
            recipients.into_iter().filter(|u| *u != actor.user_id),
            NewNotification::new(NotificationKind::Stock, format!("Low stock: {}", item.item_name))
                .with_message(format!(
                    "{} is down to {} (minimum {})",
                    item.item_number, item.quantity, item.min_quantity
                ))
                .with_link(format!("/warehouse/items/{}", item.id)),
        )
        .await;
    }

    async fn ensure_item_number_free(
        &self,
        department: DepartmentId,
        number: &str,
        except: Option<ItemId>,
    ) -> ServiceResult<()> {
        let number = number.trim();
        let taken = self
            .department_items(department)
            .await?
            .iter()
            .any(|i| Some(i.id) != except && i.item_number.eq_ignore_ascii_case(number));
        if taken {
            return Err(DomainError::conflict(format!("item number {number} already exists")).into());
        }
        Ok(())
    }

    /// Folder and shelf must exist in the item's department, and the shelf
    /// must sit in the folder.
    async fn check_item_placement(&self, item: &InventoryItem) -> ServiceResult<()> {
        if let Some(classification) = item.classification_id {
            let folder = self.stores.classifications.require(classification).await?;
            if folder.department_id != item.department_id {
                return Err(DomainError::validation(
                    "classification belongs to another department",
                )
                .into());
            }
        }
        let location = match item.location_id {
            Some(id) => self.stores.locations.get(id).await?,
            None => None,
        };
        item.check_placement(location.as_ref())?;
        Ok(())
    }

    // ── folders ────────────────────────────────────────────────────────────

    pub async fn list_classifications(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<Vec<ClassificationCard>> {
        let items = self.scoped_items(principal, department).await?;
        let locations = self.scoped(&self.stores.locations, principal).await?;
        let mut cards: Vec<ClassificationCard> = self
            .scoped(&self.stores.classifications, principal)
            .await?
            .into_iter()
            .filter(|c| department.is_none_or(|d| c.department_id == d))
            .map(|c| ClassificationCard {
                stats: classification_stats(&c, &locations, &items),
                classification: c,
            })
            .collect();
        cards.sort_by(|a, b| {
            a.classification
                .sort_order
                .cmp(&b.classification.sort_order)
                .then_with(|| a.classification.name.cmp(&b.classification.name))
        });
        Ok(cards)
    }

    pub async fn create_classification(
        &self,
        principal: &Principal,
        input: CreateClassification,
    ) -> ServiceResult<Classification> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &WAREHOUSE_STRUCTURE_MANAGE, department)?;
        self.stores.departments.require(department).await?;

        let siblings = self
            .stores
            .classifications
            .list_by_department(&[department])
            .await?;
        let folder = Classification::create(
            department,
            input.classification,
            next_sort_order(siblings.iter().map(|c| c.sort_order)),
            principal.user_id,
            Utc::now(),
        )?;
        self.stores.classifications.insert(folder.clone()).await?;
        self.journal(principal, Change::insert(&folder)).await;
        Ok(folder)
    }

    pub async fn update_classification(
        &self,
        principal: &Principal,
        id: ClassificationId,
        patch: ClassificationPatch,
    ) -> ServiceResult<Classification> {
        let before = self.stores.classifications.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_STRUCTURE_MANAGE, &before)?;
        let mut folder = before.clone();
        folder.apply(patch, Utc::now())?;
        self.stores.classifications.update(folder.clone()).await?;
        self.journal(principal, Change::update(&before, &folder)).await;
        Ok(folder)
    }

    pub async fn delete_classification(
        &self,
        principal: &Principal,
        id: ClassificationId,
    ) -> ServiceResult<()> {
        let folder = self.stores.classifications.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_STRUCTURE_MANAGE, &folder)?;
        let department = [folder.department_id];
        let locations = self
            .stores
            .locations
            .list_by_department(&department)
            .await?
            .iter()
            .filter(|l| l.classification_id == id)
            .count();
        let items = self
            .department_items(folder.department_id)
            .await?
            .iter()
            .filter(|i| i.classification_id == Some(id))
            .count();
        folder.ensure_deletable(locations, items)?;

        self.stores.classifications.delete(id).await?;
        self.journal(principal, Change::delete(&folder)).await;
        Ok(())
    }

    pub async fn list_locations(
        &self,
        principal: &Principal,
        classification_id: ClassificationId,
    ) -> ServiceResult<Vec<LocationCard>> {
        let folder = self.stores.classifications.require(classification_id).await?;
        ensure_record_access(principal, &WAREHOUSE_READ, &folder)?;
        let items = self.department_items(folder.department_id).await?;
        let mut cards: Vec<LocationCard> = self
            .stores
            .locations
            .list_by_department(&[folder.department_id])
            .await?
            .into_iter()
            .filter(|l| l.classification_id == classification_id)
            .map(|l| LocationCard {
                stats: location_stats(&l, &items),
                location: l,
            })
            .collect();
        cards.sort_by(|a, b| {
            a.location
                .sort_order
                .cmp(&b.location.sort_order)
                .then_with(|| a.location.name.cmp(&b.location.name))
        });
        Ok(cards)
    }

    pub async fn create_location(
        &self,
        principal: &Principal,
        classification_id: ClassificationId,
        input: NewLocation,
    ) -> ServiceResult<Location> {
        let folder = self.stores.classifications.require(classification_id).await?;
        ensure_record_access(principal, &WAREHOUSE_STRUCTURE_MANAGE, &folder)?;
        let siblings = self
            .stores
            .locations
            .list_by_department(&[folder.department_id])
            .await?;
        let location = Location::create(
            &folder,
            input,
            next_sort_order(
                siblings
                    .iter()
                    .filter(|l| l.classification_id == classification_id)
                    .map(|l| l.sort_order),
            ),
            principal.user_id,
            Utc::now(),
        )?;
        self.stores.locations.insert(location.clone()).await?;
        self.journal(principal, Change::insert(&location)).await;
        Ok(location)
    }

    pub async fn update_location(
        &self,
        principal: &Principal,
        id: LocationId,
        patch: LocationPatch,
    ) -> ServiceResult<Location> {
        let before = self.stores.locations.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_STRUCTURE_MANAGE, &before)?;
        let mut location = before.clone();
        location.apply(patch, Utc::now())?;
        self.stores.locations.update(location.clone()).await?;
        self.journal(principal, Change::update(&before, &location)).await;
        Ok(location)
    }

    pub async fn delete_location(&self, principal: &Principal, id: LocationId) -> ServiceResult<()> {
        let location = self.stores.locations.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_STRUCTURE_MANAGE, &location)?;
        let items = self
            .department_items(location.department_id)
            .await?
            .iter()
            .filter(|i| i.location_id == Some(id))
            .count();
        location.ensure_deletable(items)?;
        self.stores.locations.delete(id).await?;
        self.journal(principal, Change::delete(&location)).await;
        Ok(())
    }

    // ── items ──────────────────────────────────────────────────────────────

    pub async fn list_items(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
        query: &ItemQuery,
    ) -> ServiceResult<Page<InventoryItem>> {
        Ok(query.apply(self.scoped_items(principal, department).await?))
    }

    pub async fn get_item(&self, principal: &Principal, id: ItemId) -> ServiceResult<InventoryItem> {
        let item = self.stores.items.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_READ, &item)?;
        Ok(item)
    }

    pub async fn create_item(&self, principal: &Principal, input: CreateItem) -> ServiceResult<InventoryItem> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &WAREHOUSE_WRITE, department)?;
        self.stores.departments.require(department).await?;

        let item = InventoryItem::create(department, input.item, principal.user_id, Utc::now())?;
        self.check_item_placement(&item).await?;
        self.ensure_item_number_free(department, &item.item_number, None).await?;

        self.stores.items.insert(item.clone()).await?;
        self.journal(principal, Change::insert(&item)).await;
        tracing::info!(item_id = %item.id, item_number = %item.item_number, "inventory item created");
        Ok(item)
    }

    pub async fn update_item(
        &self,
        principal: &Principal,
        id: ItemId,
        patch: ItemPatch,
    ) -> ServiceResult<InventoryItem> {
        let before = self.stores.items.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_WRITE, &before)?;
        let mut item = before.clone();
        item.apply(patch, Utc::now())?;
        self.check_item_placement(&item).await?;
        if item.item_number != before.item_number {
            self.ensure_item_number_free(item.department_id, &item.item_number, Some(id))
                .await?;
        }

        self.stores.items.update(item.clone()).await?;
        self.journal(principal, Change::update(&before, &item)).await;
        self.alert_low_stock(principal, &item, before.quantity).await;
        Ok(item)
    }

    /// Create many items at once. Every row is validated, numbered and
    /// placed before the first insert; the items land in one commit.
    pub async fn import_items(
        &self,
        principal: &Principal,
        input: ImportItems,
    ) -> ServiceResult<Vec<InventoryItem>> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &WAREHOUSE_WRITE, department)?;
        self.stores.departments.require(department).await?;

        let existing = self.department_items(department).await?;
        let items = plan_import(
            department,
            input.rows,
            &existing,
            principal.user_id,
            Utc::now(),
            random_import_suffix,
        )?;
        let mut batch = WriteBatch::new();
        for item in &items {
            self.check_item_placement(item).await?;
            batch.insert(item)?;
        }
        self.commit(batch).await?;

        for item in &items {
            self.journal(principal, Change::insert(item)).await;
        }
        tracing::info!(%department, count = items.len(), "inventory items imported");
        Ok(items)
    }

    pub async fn delete_item(&self, principal: &Principal, id: ItemId) -> ServiceResult<()> {
        let item = self.stores.items.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_WRITE, &item)?;
        self.stores.items.delete(id).await?;
        self.journal(principal, Change::delete(&item)).await;
        tracing::info!(item_id = %id, "inventory item deleted");
        Ok(())
    }

    /// Stock in or out for one item. A rejected movement changes nothing.
    ///
    /// The quantity is checked against the version read; a concurrent
    /// movement forces a re-read, so two stock-outs can never both draw on
    /// the same units.
    pub async fn move_stock(
        &self,
        principal: &Principal,
        item_id: ItemId,
        movement: StockMovement,
    ) -> ServiceResult<StockTransaction> {
        let mut attempt = 1;
        let (before, item, tx) = loop {
            let read = self.stores.items.require_versioned(item_id).await?;
            ensure_record_access(principal, &WAREHOUSE_WRITE, &read.record)?;

            let mut item = read.record.clone();
            let tx = movement.clone().apply(&mut item, principal.user_id, Utc::now())?;

            let mut batch = WriteBatch::new();
            batch.update(&item, read.expected())?;
            batch.insert(&tx)?;
            match self.commit(batch).await {
                Ok(()) => break (read.record, item, tx),
                Err(ServiceError::Store(e)) if e.is_stale() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(item_id = %item_id, attempt, "stock changed during movement, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        self.journal(principal, Change::update(&before, &item)).await;
        self.journal(principal, Change::insert(&tx)).await;
        tracing::info!(
            item_id = %item.id,
            kind = ?tx.transaction_type,
            quantity = tx.quantity,
            new_quantity = tx.new_quantity,
            "stock moved"
        );

        if tx.transaction_type == TransactionType::Out {
            self.alert_low_stock(principal, &item, tx.previous_quantity).await;
        }
        Ok(tx)
    }

    pub async fn list_transactions(
        &self,
        principal: &Principal,
        query: &TransactionQuery,
    ) -> ServiceResult<Vec<StockTransaction>> {
        authorize(principal, &WAREHOUSE_READ)?;
        let txs = self.scoped(&self.stores.transactions, principal).await?;
        Ok(query.apply(txs, Utc::now()))
    }

    // ── item requests ──────────────────────────────────────────────────────

    /// Record a signed-off request: every line is checked against current
    /// stock before any quantity moves.
    pub async fn record_item_request(
        &self,
        principal: &Principal,
        input: CreateItemRequest,
    ) -> ServiceResult<ItemRequestReceipt> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &WAREHOUSE_REQUESTS_CREATE, department)?;
        let approver = self
            .stores
            .approvers
            .get(input.request.approved_by_id)
            .await?
            .ok_or_else(|| DomainError::validation("approver must be an active approver"))?;

        let mut attempt = 1;
        let (stock, recorded) = loop {
            let mut stock = HashMap::new();
            let mut versions = HashMap::new();
            for line in &input.request.items {
                if let Some(read) = self.stores.items.get_versioned(line.item_id).await? {
                    versions.insert(line.item_id, read.expected());
                    stock.insert(line.item_id, read.record);
                }
            }
            let recorded = ItemRequest::record(
                department,
                principal.user_id,
                input.request.clone(),
                &approver,
                &stock,
                Utc::now(),
            )?;

            let mut batch = WriteBatch::new();
            for item in &recorded.updated_items {
                let expected = versions.get(&item.id).copied().unwrap_or(ExpectedVersion::Any);
                batch.update(item, expected)?;
            }
            for tx in &recorded.transactions {
                batch.insert(tx)?;
            }
            batch.insert(&recorded.request)?;
            match self.commit(batch).await {
                Ok(()) => break (stock, recorded),
                Err(ServiceError::Store(e)) if e.is_stale() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(attempt, "stock changed while recording request, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        for item in &recorded.updated_items {
            if let Some(before) = stock.get(&item.id) {
                self.journal(principal, Change::update(before, item)).await;
                self.alert_low_stock(principal, item, before.quantity).await;
            }
        }
        for tx in &recorded.transactions {
            self.journal(principal, Change::insert(tx)).await;
        }
        self.journal(principal, Change::insert(&recorded.request)).await;
        tracing::info!(
            request_id = %recorded.request.id,
            lines = recorded.request.requested_items.len(),
            quantity = recorded.request.quantity_requested,
            "item request recorded"
        );

        Ok(ItemRequestReceipt {
            request: recorded.request,
            transactions: recorded.transactions,
        })
    }

    /// Requests, newest first.
    pub async fn list_item_requests(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<Vec<ItemRequest>> {
        authorize(principal, &WAREHOUSE_READ)?;
        let mut requests: Vec<ItemRequest> = self
            .scoped(&self.stores.item_requests, principal)
            .await?
            .into_iter()
            .filter(|r| department.is_none_or(|d| r.department_id == d))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    pub async fn get_item_request(
        &self,
        principal: &Principal,
        id: ItemRequestId,
    ) -> ServiceResult<ItemRequest> {
        let request = self.stores.item_requests.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_READ, &request)?;
        Ok(request)
    }

    /// Removes the record only; issued stock stays issued.
    pub async fn delete_item_request(&self, principal: &Principal, id: ItemRequestId) -> ServiceResult<()> {
        let request = self.stores.item_requests.require(id).await?;
        ensure_record_access(principal, &WAREHOUSE_WRITE, &request)?;
        self.stores.item_requests.delete(id).await?;
        self.journal(principal, Change::delete(&request)).await;
        Ok(())
    }

    // ── approvers ──────────────────────────────────────────────────────────

    pub async fn list_approvers(
        &self,
        principal: &Principal,
        include_inactive: bool,
    ) -> ServiceResult<Vec<Approver>> {
        authorize(principal, &WAREHOUSE_READ)?;
        let all = self.stores.approvers.list().await?;
        if include_inactive {
            let mut all = all;
            all.sort_by(|a, b| a.full_name.cmp(&b.full_name));
            return Ok(all);
        }
        Ok(active_by_name(all))
    }

    pub async fn create_approver(&self, principal: &Principal, input: NewApprover) -> ServiceResult<Approver> {
        authorize(principal, &WAREHOUSE_APPROVERS_MANAGE)?;
        let approver = Approver::create(input, Utc::now())?;
        self.stores.approvers.insert(approver.clone()).await?;
        self.journal(principal, Change::insert(&approver)).await;
        Ok(approver)
    }

    pub async fn update_approver(
        &self,
        principal: &Principal,
        id: ApproverId,
        patch: ApproverPatch,
    ) -> ServiceResult<Approver> {
        authorize(principal, &WAREHOUSE_APPROVERS_MANAGE)?;
        let before = self.stores.approvers.require(id).await?;
        let mut approver = before.clone();
        approver.apply(patch, Utc::now())?;
        self.stores.approvers.update(approver.clone()).await?;
        self.journal(principal, Change::update(&before, &approver)).await;
        Ok(approver)
    }

    /// Soft delete: the approver stays referenced by past requests.
    pub async fn deactivate_approver(&self, principal: &Principal, id: ApproverId) -> ServiceResult<Approver> {
        authorize(principal, &WAREHOUSE_APPROVERS_MANAGE)?;
        let before = self.stores.approvers.require(id).await?;
        let mut approver = before.clone();
        approver.deactivate(Utc::now());
        self.stores.approvers.update(approver.clone()).await?;
        self.journal(principal, Change::update(&before, &approver)).await;
        Ok(approver)
    }

    // ── views ──────────────────────────────────────────────────────────────

    pub async fn inventory_stats(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<InventoryStats> {
        Ok(inventory_stats(&self.scoped_items(principal, department).await?))
    }

    pub async fn low_stock_report(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<LowStockReport> {
        Ok(low_stock_report(&self.scoped_items(principal, department).await?))
    }

    /// Items of the configured IT folder with their latest movement; empty
    /// when no folder is configured.
    pub async fn it_equipment(&self, principal: &Principal) -> ServiceResult<Vec<ItEquipmentEntry>> {
        let Some(folder) = self.config.it_equipment_classification_id else {
            return Ok(Vec::new());
        };
        let items = self.scoped_items(principal, None).await?;
        let txs = self.scoped(&self.stores.transactions, principal).await?;
        Ok(it_equipment(folder, &items, &txs))
    }
}
