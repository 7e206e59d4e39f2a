use crate::{
    db::StoreError,
    db_types::{NewProduct, Product, ProductDeletion, ProductUpdate},
};

#[allow(async_fn_in_trait)]
pub trait ProductManagement {
    /// All products, newest first.
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Inserts the product, or replaces the stored record with the same id. `updated_at` is refreshed; `created_at`
    /// is kept when the record already exists. A replacement that would lower the stored `sold_count` is refused with
    /// [`StoreError::InvalidRecord`].
    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError>;

    /// Hard-deletes the product and its card secrets unless an order references it, in which case it is only
    /// deactivated.
    async fn delete_product(&self, id: &str) -> Result<Option<ProductDeletion>, StoreError>;

    /// Applies a partial update in one atomic step. Fields absent from the update, and the sales counter, are left
    /// as stored.
    async fn update_product_fields(&self, id: &str, update: ProductUpdate) -> Result<Option<Product>, StoreError>;

    async fn update_product_stock(&self, id: &str, stock: i64) -> Result<Option<Product>, StoreError>;

    /// Moves the stock by `delta`, atomically. The result is floored at zero.
    async fn adjust_product_stock(&self, id: &str, delta: i64) -> Result<Option<Product>, StoreError>;
}
