//! Read-after-write consistency of the order cache through the service

use std::sync::Arc;
use storefront_core::{
    CacheConfig, CacheInvalidationPolicy, EvictionPolicyKind, InMemoryOrderRepository,
    MutationKind, OrderCache, OrderService,
};

fn service_with(config: &CacheConfig) -> (OrderService, Arc<CacheInvalidationPolicy>) {
    let cache = Arc::new(OrderCache::new(config));
    let invalidation = Arc::new(CacheInvalidationPolicy::new_default(cache));
    let service = OrderService::new(
        Arc::new(InMemoryOrderRepository::new()),
        Arc::clone(&invalidation),
    );
    (service, invalidation)
}

#[tokio::test]
async fn test_read_after_write_sees_new_order() {
    let (service, _) = service_with(&CacheConfig::default());
    let laptop = service.create_product("Laptop", 1000.0).await.unwrap();

    assert!(service
        .find_orders_by_product_name("Laptop")
        .await
        .unwrap()
        .is_empty());

    service.create_order("Alice", &[laptop.id]).await.unwrap();
    let orders = service.find_orders_by_product_name("Laptop").await.unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].customer_name, "Alice");
}

#[tokio::test]
async fn test_rename_moves_orders_between_keys() {
    let (service, invalidation) = service_with(&CacheConfig::default());
    let product = service.create_product("Laptop", 1000.0).await.unwrap();
    service.create_order("Alice", &[product.id]).await.unwrap();

    service.find_orders_by_product_name("Laptop").await.unwrap();
    service.find_orders_by_product_name("Notebook").await.unwrap();

    service
        .update_product(product.id, "Notebook", 1000.0)
        .await
        .unwrap();

    assert!(service
        .find_orders_by_product_name("Laptop")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        service
            .find_orders_by_product_name("Notebook")
            .await
            .unwrap()
            .len(),
        1
    );

    let event = &invalidation.recent_events(1)[0];
    assert_eq!(event.kind, MutationKind::ProductUpdated);
    assert_eq!(event.removed_keys, vec!["Laptop", "Notebook"]);
}

#[tokio::test]
async fn test_size_policy_service_round_trip() {
    let config = CacheConfig {
        policy: EvictionPolicyKind::Size,
        max_bytes: 2048,
        order_weight_bytes: 512,
        ..CacheConfig::default()
    };
    let (service, invalidation) = service_with(&config);
    let laptop = service.create_product("Laptop", 1000.0).await.unwrap();
    let mouse = service.create_product("Mouse", 20.0).await.unwrap();
    for customer in ["Alice", "Bob", "Carol"] {
        service
            .create_order(customer, &[laptop.id, mouse.id])
            .await
            .unwrap();
    }

    service.find_orders_by_product_name("Laptop").await.unwrap();
    service.find_orders_by_product_name("Mouse").await.unwrap();

    let cache = invalidation.cache();
    assert!(cache.stats().estimated_bytes <= 2048);
    assert!(cache.contains("Mouse"));
    assert!(!cache.contains("Laptop"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_do_not_mask_writes() {
    let (service, _) = service_with(&CacheConfig::default());
    let service = Arc::new(service);
    let laptop = service.create_product("Laptop", 1000.0).await.unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                for _ in 0..50 {
                    service.find_orders_by_product_name("Laptop").await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for i in 0..10 {
        service
            .create_order(format!("Customer {i}"), &[laptop.id])
            .await
            .unwrap();
        let seen = service.find_orders_by_product_name("Laptop").await.unwrap();
        assert!(seen.len() > i);
    }

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(
        service
            .find_orders_by_product_name("Laptop")
            .await
            .unwrap()
            .len(),
        10
    );
}
