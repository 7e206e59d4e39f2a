use card_shop_engine::test_utils::prepare_env::seed_product;
use cucumber::given;

use crate::cucumber::{shop_world::ShopSystem, ShopWorld};

#[given("a fresh install")]
async fn fresh_install(world: &mut ShopWorld) {
    let system = ShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a product {string} priced at {int} cents with {int} card secrets")]
async fn product_with_secrets(world: &mut ShopWorld, title: String, price: i64, secrets: usize) {
    let product = seed_product(world.catalog().db(), &title, price, secrets).await;
    world.products.insert(title, product);
}
