use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use storefront::cart::{CartEvent, CartStore, FavoritesStore, ProductSnapshot};
use storefront::storage::{FileStorage, MemoryStorage, StorageBackend};

fn pendant(price: i64) -> ProductSnapshot {
    ProductSnapshot::new("p1", "Opal Pendant Light", Decimal::from(price))
        .with_category("pendants")
        .with_image("/images/p1.jpg")
}

#[test]
fn test_repeated_adds_collapse_into_one_line() {
    let mut cart = CartStore::open(Arc::new(MemoryStorage::new()));

    cart.add_to_cart(&pendant(100), 2);
    cart.add_to_cart(&pendant(100), 3);

    let items = cart.get_cart();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "p1");
    assert_eq!(items[0].quantity, 5);

    let summary = cart.summary();
    assert_eq!(summary.total_items, 5);
    assert_eq!(summary.total_price, Decimal::from(500));
}

#[test]
fn test_quantity_sum_over_many_adds() {
    let mut cart = CartStore::open(Arc::new(MemoryStorage::new()));
    let quantities = [1, 4, 2, 7, 1];

    for q in quantities {
        cart.add_to_cart(&pendant(12), q);
    }

    assert_eq!(cart.get_cart().len(), 1);
    assert_eq!(cart.get_item_quantity("p1"), quantities.iter().sum::<u32>());
}

#[test]
fn test_cart_persists_to_disk_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.path()));

    {
        let mut cart = CartStore::open(backend.clone());
        cart.add_to_cart(&pendant(100), 1);
        cart.add_to_cart(
            &ProductSnapshot::new("bulb", "Filament Bulb", Decimal::new(650, 2)),
            6,
        );
        cart.update_quantity("p1", 2);
    }

    let cart = CartStore::open(backend.clone());
    assert_eq!(cart.get_item_quantity("p1"), 2);
    assert_eq!(cart.get_item_quantity("bulb"), 6);
    assert_eq!(cart.summary().total_price, Decimal::from(239));

    let raw = backend.get("cart").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored[0]["product"]["name"], "Opal Pendant Light");
    assert!(stored[0]["addedAt"].is_string());
}

#[test]
fn test_cart_and_favorites_use_separate_slots() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let mut cart = CartStore::open(backend.clone());
    let mut favorites = FavoritesStore::open(backend.clone());

    cart.add_to_cart(&pendant(100), 1);
    favorites.toggle("p1");
    cart.clear_cart();

    assert!(FavoritesStore::open(backend).is_favorite("p1"));
}

#[test]
fn test_two_stores_last_write_wins() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let mut first = CartStore::open(backend.clone());
    let mut second = CartStore::open(backend.clone());

    first.add_to_cart(&pendant(100), 1);
    second.add_to_cart(&ProductSnapshot::new("p2", "Wall Sconce", Decimal::from(45)), 1);

    // The second writer never saw p1, so its write replaced it
    let reopened = CartStore::open(backend);
    assert!(!reopened.is_in_cart("p1"));
    assert!(reopened.is_in_cart("p2"));

    // The first store catches up on reload
    let ids: Vec<String> = first.reload().iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids, vec!["p2".to_string()]);
}

#[test]
fn test_notifications_follow_call_order() {
    let mut cart = CartStore::open(Arc::new(MemoryStorage::new()));
    let log = Arc::new(Mutex::new(Vec::new()));

    let sink = log.clone();
    let _sub = cart.subscribe(move |event| match event {
        CartEvent::Updated { items } => sink.lock().push(format!("updated:{}", items.len())),
        CartEvent::Notice(notice) => sink.lock().push(format!("notice:{:?}", notice.level)),
    });

    cart.add_to_cart(&pendant(100), 1);
    cart.remove_from_cart("p1");
    cart.remove_from_cart("p1");

    assert_eq!(
        *log.lock(),
        vec![
            "updated:1".to_string(),
            "notice:Success".to_string(),
            "updated:0".to_string(),
            "notice:Info".to_string(),
        ]
    );
}

#[test]
fn test_oversized_stored_prices_do_not_crash_summary() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    backend
        .set(
            "cart",
            r#"[{"id":"p1","product":{"id":"p1","name":"Gold Chandelier","price":5e28},"quantity":2,"addedAt":"2024-05-01T12:00:00Z"}]"#,
        )
        .unwrap();

    let mut cart = CartStore::open(backend);
    assert!(cart.get_cart().is_empty());
    assert_eq!(cart.summary().final_total, Decimal::ZERO);

    // The same price added at runtime saturates instead of panicking
    let huge = Decimal::from_scientific("5e28").unwrap();
    cart.add_to_cart(&ProductSnapshot::new("p1", "Gold Chandelier", huge), 2);
    assert_eq!(cart.summary().total_price, Decimal::MAX);
}
