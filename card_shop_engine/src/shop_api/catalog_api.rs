use std::{collections::BTreeMap, fmt::Debug};

use log::*;

use crate::{
    db::traits::ShopDatabase,
    db_types::{CardSecretStatus, NewProduct, Product, ProductDeletion, ProductStatus},
    shop_api::{
        errors::CatalogError,
        order_objects::{
            CardSecretInventory,
            CardSecretUploadRow,
            Category,
            ProductQuery,
            ProductSort,
            ProductUpdate,
            UploadResults,
            UploadRowError,
        },
    },
};

/// The product catalogue and card-secret inventory.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CatalogApi<B>
where B: ShopDatabase
{
    /// Storefront listing: active products only, filtered and sorted.
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let mut products = self
            .db
            .fetch_products()
            .await?
            .into_iter()
            .filter(|p| p.status == ProductStatus::Active)
            .filter(|p| query.category.as_ref().map_or(true, |c| c.is_empty() || &p.category == c))
            .filter(|p| query.subcategory.as_ref().map_or(true, |c| c.is_empty() || &p.subcategory == c))
            .collect::<Vec<_>>();
        sort_products(&mut products, query.sort);
        Ok(products)
    }

    /// Admin listing: every product regardless of status, newest first.
    pub async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.db.fetch_products().await?)
    }

    pub async fn product(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self.db.fetch_product(id).await?)
    }

    /// Category tree of the active catalogue, alphabetical.
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let products = self.list_products(&ProductQuery::default()).await?;
        let mut tree: BTreeMap<String, (Vec<String>, usize)> = BTreeMap::new();
        for product in products.into_iter().filter(|p| !p.category.is_empty()) {
            let (subs, count) = tree.entry(product.category).or_default();
            *count += 1;
            if !product.subcategory.is_empty() && !subs.contains(&product.subcategory) {
                subs.push(product.subcategory);
            }
        }
        Ok(tree
            .into_iter()
            .map(|(name, (mut subcategories, product_count))| {
                subcategories.sort();
                Category { name, subcategories, product_count }
            })
            .collect())
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        validate(&product.title, product.price.value(), product.stock)?;
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product {} ({}) added to the catalogue", product.title, product.id);
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> Result<Product, CatalogError> {
        validate_update(&update)?;
        let product = self
            .db
            .update_product_fields(id, update)
            .await?
            .ok_or_else(|| CatalogError::ProductNotFound(id.to_string()))?;
        debug!("📦️ Product {id} updated");
        Ok(product)
    }

    /// Deletes a product, or deactivates it if any order refers to it.
    pub async fn delete_product(&self, id: &str) -> Result<ProductDeletion, CatalogError> {
        self.db.delete_product(id).await?.ok_or_else(|| CatalogError::ProductNotFound(id.to_string()))
    }

    pub async fn update_stock(&self, id: &str, stock: i64) -> Result<Product, CatalogError> {
        if stock < 0 {
            return Err(CatalogError::InvalidProduct("stock cannot be negative".into()));
        }
        self.db.update_product_stock(id, stock).await?.ok_or_else(|| CatalogError::ProductNotFound(id.to_string()))
    }

    /// Adds card secrets to a product's inventory, row by row. A bad row is reported and skipped; it never aborts
    /// the upload. The product's stock grows by the number of rows stored.
    pub async fn upload_card_secrets(
        &self,
        product_id: &str,
        rows: Vec<CardSecretUploadRow>,
    ) -> Result<UploadResults, CatalogError> {
        let product = self.fetch(product_id).await?;
        let mut results = UploadResults { total: rows.len(), ..Default::default() };
        for (i, row) in rows.into_iter().enumerate() {
            let row_number = i + 1;
            let outcome = match row.into_new_card_secret(product_id, &product.quality_guarantee) {
                Ok(secret) => self.db.insert_card_secret(secret).await.map(|_| ()).map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => results.successful += 1,
                Err(error) => {
                    debug!("📦️ Card secret upload row {row_number} rejected: {error}");
                    results.failed += 1;
                    results.errors.push(UploadRowError { row: row_number, error });
                },
            }
        }
        if results.successful > 0 {
            #[allow(clippy::cast_possible_wrap)]
            let added = results.successful as i64;
            self.db.adjust_product_stock(product_id, added).await?;
        }
        info!(
            "📦️ Card secret upload for {product_id}: {} of {} rows stored, {} failed",
            results.successful, results.total, results.failed
        );
        Ok(results)
    }

    pub async fn card_secrets_for_product(
        &self,
        product_id: &str,
        status: Option<CardSecretStatus>,
    ) -> Result<CardSecretInventory, CatalogError> {
        self.fetch(product_id).await?;
        let all = self.db.fetch_card_secrets_for_product(product_id, None).await?;
        let available = all.iter().filter(|s| s.status == CardSecretStatus::Available).count();
        let sold = all.len() - available;
        let card_secrets = match status {
            Some(st) => all.into_iter().filter(|s| s.status == st).collect(),
            None => all,
        };
        Ok(CardSecretInventory { total: available + sold, available, sold, card_secrets })
    }

    /// Deletes an unsold card secret and takes it out of the product's stock.
    pub async fn delete_card_secret(&self, id: &str) -> Result<(), CatalogError> {
        let secret =
            self.db.fetch_card_secret(id).await?.ok_or_else(|| CatalogError::CardSecretNotFound(id.to_string()))?;
        if !self.db.delete_card_secret(id).await? {
            return Err(CatalogError::CardSecretNotFound(id.to_string()));
        }
        self.db.adjust_product_stock(&secret.product_id, -1).await?;
        debug!("📦️ Card secret {id} removed from product {}", secret.product_id);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Product, CatalogError> {
        self.db.fetch_product(id).await?.ok_or_else(|| CatalogError::ProductNotFound(id.to_string()))
    }
}

fn validate(title: &str, price: i64, stock: i64) -> Result<(), CatalogError> {
    if title.trim().is_empty() {
        return Err(CatalogError::InvalidProduct("title is required".into()));
    }
    if price < 0 {
        return Err(CatalogError::InvalidProduct("price cannot be negative".into()));
    }
    if stock < 0 {
        return Err(CatalogError::InvalidProduct("stock cannot be negative".into()));
    }
    Ok(())
}

fn validate_update(update: &ProductUpdate) -> Result<(), CatalogError> {
    validate(
        update.title.as_deref().unwrap_or("-"),
        update.price.map_or(0, |p| p.value()),
        update.stock.unwrap_or(0),
    )
}

fn sort_products(products: &mut [Product], sort: ProductSort) {
    match sort {
        ProductSort::Sales => products.sort_by(|a, b| b.sold_count.cmp(&a.sold_count)),
        ProductSort::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
        ProductSort::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
        ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}
