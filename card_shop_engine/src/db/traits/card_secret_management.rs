use crate::{
    db::StoreError,
    db_types::{CardSecret, CardSecretStatus, NewCardSecret},
};

#[allow(async_fn_in_trait)]
pub trait CardSecretManagement {
    async fn fetch_card_secrets(&self) -> Result<Vec<CardSecret>, StoreError>;

    async fn fetch_card_secret(&self, id: &str) -> Result<Option<CardSecret>, StoreError>;

    /// Secrets for one product, newest first, optionally filtered by status.
    async fn fetch_card_secrets_for_product(
        &self,
        product_id: &str,
        status: Option<CardSecretStatus>,
    ) -> Result<Vec<CardSecret>, StoreError>;

    async fn insert_card_secret(&self, secret: NewCardSecret) -> Result<CardSecret, StoreError>;

    /// Used by the migration tool and admin edits. Refuses to re-assign a secret that is already sold to another
    /// order.
    async fn upsert_card_secret(&self, secret: CardSecret) -> Result<CardSecret, StoreError>;

    /// Deletes an `available` secret. Sold secrets are kept forever and produce [`StoreError::CardSecretSold`].
    async fn delete_card_secret(&self, id: &str) -> Result<bool, StoreError>;
}
