//! Paging, filtering, sorting and random-pick tests.

mod common;

use std::sync::Arc;

use bson::doc;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use mongodb_persistence::backends::memory::MemoryBackend;
use mongodb_persistence::core::Identifiable;
use mongodb_persistence::persistence::IdentifiableMongoDbPersistence;
use mongodb_persistence::types::{FilterParams, PagingParams, SortField, SortParams};

use common::*;

// ============================================================================
// Filters
// ============================================================================

#[tokio::test]
async fn test_page_by_key_filter_returns_single_item() {
    let (_backend, persistence) = open_persistence().await;
    persistence.create(dummy1()).await.unwrap();
    persistence.create(dummy2()).await.unwrap();

    let page = persistence
        .get_page_by_filter(&FilterParams::from_tuples([("key", "Key 1")]), None, None)
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].key, "Key 1");
    assert!(page.total.is_none());
}

#[tokio::test]
async fn test_membership_filter() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 4).await;

    let found = persistence
        .get_list_by_filter(&FilterParams::from_tuples([("key", "Key 2, Key 4")]), None)
        .await
        .unwrap();

    assert_eq!(keys(&found), vec!["Key 2", "Key 4"]);
}

#[tokio::test]
async fn test_ids_filter() {
    let (_backend, persistence) = open_persistence().await;
    let created = seed(&persistence, 3).await;
    let ids = format!(
        "{},{}",
        created[0].id.as_deref().unwrap(),
        created[1].id.as_deref().unwrap()
    );

    let found = persistence
        .get_list_by_filter(&FilterParams::from_tuples([("ids", ids)]), None)
        .await
        .unwrap();

    assert_eq!(keys(&found), vec!["Key 1", "Key 2"]);
}

#[tokio::test]
async fn test_single_id_filter() {
    let (_backend, persistence) = open_persistence().await;
    let created = seed(&persistence, 2).await;

    let filter = FilterParams::new().with("ids", created[1].id.clone().unwrap());
    let found = persistence.get_list_by_filter(&filter, None).await.unwrap();

    assert_eq!(keys(&found), vec!["Key 2"]);
}

#[tokio::test]
async fn test_dot_path_filter() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 3).await;

    let found = persistence
        .get_list_by_filter(
            &FilterParams::from_tuples([("inner_dummy.name", "Inner 3")]),
            None,
        )
        .await
        .unwrap();

    assert_eq!(keys(&found), vec!["Key 3"]);
}

#[tokio::test]
async fn test_empty_filter_matches_all() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 3).await;

    let found = persistence
        .get_list_by_filter(&FilterParams::new(), None)
        .await
        .unwrap();

    assert_eq!(keys(&found), vec!["Key 1", "Key 2", "Key 3"]);
}

#[tokio::test]
async fn test_filter_is_not_mutated() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 2).await;

    let filter = FilterParams::from_tuples([("key", "Key 1,Key 2"), ("ids", "a,b")]);
    let before = filter.clone();
    persistence.get_list_by_filter(&filter, None).await.unwrap();

    assert_eq!(filter, before);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Counter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    count: i32,
    active: bool,
    owner: ObjectId,
}

impl Identifiable<String> for Counter {
    fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[tokio::test]
async fn test_filter_on_typed_fields() {
    let mut persistence: IdentifiableMongoDbPersistence<Counter, String> =
        IdentifiableMongoDbPersistence::new("counters", Arc::new(MemoryBackend::new()));
    persistence.configure(&default_config());
    persistence.open().await.unwrap();

    let owner = ObjectId::new();
    for (count, active) in [(5, true), (5, false), (7, true)] {
        persistence
            .create(Counter { id: None, count, active, owner })
            .await
            .unwrap();
    }

    let by_count = persistence
        .get_list_by_filter(&FilterParams::new().with("count", 5), None)
        .await
        .unwrap();
    assert_eq!(by_count.len(), 2);
    assert!(by_count.iter().all(|c| c.count == 5));

    let by_flag = persistence
        .get_count_by_filter(&FilterParams::new().with("active", true))
        .await
        .unwrap();
    assert_eq!(by_flag, 2);

    let both = persistence
        .get_list_by_filter(
            &FilterParams::new().with("count", 5).with("active", false),
            None,
        )
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert!(!both[0].active);

    let by_owner = persistence
        .get_count_by_filter(&FilterParams::new().with("owner", owner))
        .await
        .unwrap();
    assert_eq!(by_owner, 3);

    // A string never equals a number of the same digits.
    let as_text = persistence
        .get_count_by_filter(&FilterParams::from_tuples([("count", "5")]))
        .await
        .unwrap();
    assert_eq!(as_text, 0);
}

#[tokio::test]
async fn test_count_by_filter() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 5).await;

    let all = persistence
        .get_count_by_filter(&FilterParams::new())
        .await
        .unwrap();
    let some = persistence
        .get_count_by_filter(&FilterParams::from_tuples([("key", "Key 1,Key 5,Key 9")]))
        .await
        .unwrap();

    assert_eq!(all, 5);
    assert_eq!(some, 2);
}

// ============================================================================
// Paging
// ============================================================================

#[tokio::test]
async fn test_take_limits_page_and_total_counts_all() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 5).await;

    let paging = PagingParams::default().with_take(2).with_total();
    let page = persistence
        .get_page_by_filter(&FilterParams::new(), Some(&paging), None)
        .await
        .unwrap();

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.total, Some(5));
    assert!(page.total.unwrap() >= page.data.len() as u64);
}

#[tokio::test]
async fn test_skip_and_take_walk_all_items() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 5).await;
    let sort = SortParams::new().with(SortField::asc("key"));

    let mut seen = Vec::new();
    for skip in (0..6).step_by(2) {
        let paging = PagingParams::default().with_skip(skip).with_take(2);
        let page = persistence
            .get_page_by_filter(&FilterParams::new(), Some(&paging), Some(&sort))
            .await
            .unwrap();
        assert!(page.data.len() <= 2);
        seen.extend(page.data.into_iter().map(|d| d.key));
    }

    assert_eq!(seen, vec!["Key 1", "Key 2", "Key 3", "Key 4", "Key 5"]);
}

#[tokio::test]
async fn test_take_is_capped_by_max_page_size() {
    let (_backend, persistence) = open_persistence_with(default_config().with_max_page_size(3)).await;
    seed(&persistence, 5).await;

    let unpaged = persistence
        .get_page_by_filter(&FilterParams::new(), None, None)
        .await
        .unwrap();
    assert_eq!(unpaged.data.len(), 3);

    let paging = PagingParams::default().with_take(10).with_total();
    let oversized = persistence
        .get_page_by_filter(&FilterParams::new(), Some(&paging), None)
        .await
        .unwrap();
    assert_eq!(oversized.data.len(), 3);
    assert_eq!(oversized.total, Some(5));
}

#[tokio::test]
async fn test_zero_take_uses_max_page_size() {
    let (_backend, persistence) = open_persistence_with(default_config().with_max_page_size(2)).await;
    seed(&persistence, 3).await;

    let paging = PagingParams::new(Some(0), Some(0), false);
    let page = persistence
        .get_page_by_filter(&FilterParams::new(), Some(&paging), None)
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
}

#[tokio::test]
async fn test_zero_max_page_size_falls_back_to_default() {
    let (_backend, built) = open_persistence_with(default_config().with_max_page_size(0)).await;
    let mut raw_config = default_config();
    raw_config.options.max_page_size = 0;
    let (_other, raw) = open_persistence_with(raw_config).await;

    for persistence in [&built, &raw] {
        seed(persistence, 3).await;
        let paging = PagingParams::default().with_total();
        let page = persistence
            .get_page_by_filter(&FilterParams::new(), Some(&paging), None)
            .await
            .unwrap();

        assert_eq!(page.data.len(), 3);
        assert_eq!(page.total, Some(3));
    }
}

#[tokio::test]
async fn test_skip_past_end_is_empty() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 2).await;

    let paging = PagingParams::default().with_skip(10).with_total();
    let page = persistence
        .get_page_by_filter(&FilterParams::new(), Some(&paging), None)
        .await
        .unwrap();

    assert!(page.data.is_empty());
    assert_eq!(page.total, Some(2));
}

// ============================================================================
// Sorting
// ============================================================================

#[tokio::test]
async fn test_sort_descending() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 3).await;

    let found = persistence
        .get_list_by_filter(&FilterParams::new(), Some(&SortParams::parse("-key")))
        .await
        .unwrap();

    let keys: Vec<_> = found.iter().map(|d| d.key.as_str()).collect();
    assert_eq!(keys, vec!["Key 3", "Key 2", "Key 1"]);
}

#[tokio::test]
async fn test_sort_multi_key_precedence() {
    let (_backend, persistence) = open_persistence().await;
    persistence.create(Dummy::new("B", "2")).await.unwrap();
    persistence.create(Dummy::new("A", "2")).await.unwrap();
    persistence.create(Dummy::new("B", "1")).await.unwrap();
    persistence.create(Dummy::new("A", "1")).await.unwrap();

    let sort = SortParams::new()
        .with(SortField::desc("content"))
        .with(SortField::asc("key"));
    let found = persistence
        .get_list_by_filter(&FilterParams::new(), Some(&sort))
        .await
        .unwrap();

    let order: Vec<_> = found
        .iter()
        .map(|d| format!("{}{}", d.key, d.content))
        .collect();
    assert_eq!(order, vec!["A2", "B2", "A1", "B1"]);
}

#[tokio::test]
async fn test_empty_sort_is_natural_order() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 3).await;

    let found = persistence
        .get_list_by_filter(&FilterParams::new(), Some(&SortParams::new()))
        .await
        .unwrap();

    assert_eq!(keys(&found), vec!["Key 1", "Key 2", "Key 3"]);
}

// ============================================================================
// Random pick
// ============================================================================

#[tokio::test]
async fn test_random_on_empty_is_none() {
    let (_backend, persistence) = open_persistence().await;

    let picked = persistence.get_one_random(&FilterParams::new()).await.unwrap();
    assert!(picked.is_none());
}

#[tokio::test]
async fn test_random_single_match() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 3).await;

    let picked = persistence
        .get_one_random(&FilterParams::from_tuples([("key", "Key 2")]))
        .await
        .unwrap();
    assert_eq!(picked.map(|d| d.key), Some("Key 2".to_string()));
}

/// The random offset is drawn from `[0, count - 1)`, so the last item in
/// natural order is never picked when more than one item matches.
#[tokio::test]
async fn test_random_never_picks_last_item() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 3).await;

    for _ in 0..50 {
        let picked = persistence
            .get_one_random(&FilterParams::new())
            .await
            .unwrap()
            .expect("Something should be picked");
        assert_ne!(picked.key, "Key 3");
    }
}

// ============================================================================
// Raw queries on the base component
// ============================================================================

#[tokio::test]
async fn test_base_query_with_operators() {
    let (_backend, persistence) = open_persistence().await;
    seed(&persistence, 5).await;

    let base = persistence.base();
    let filter = doc! { "key": { "$gt": "Key 2", "$lte": "Key 4" } };

    let page = base
        .get_page_by_query(
            filter.clone(),
            Some(&PagingParams::default().with_total()),
            Some(doc! { "key": -1 }),
        )
        .await
        .unwrap();
    let keys: Vec<_> = page.data.iter().map(|d| d.key.as_str()).collect();
    assert_eq!(keys, vec!["Key 4", "Key 3"]);
    assert_eq!(page.total, Some(2));

    assert_eq!(base.get_count_by_query(filter.clone()).await.unwrap(), 2);
    assert_eq!(base.delete_by_query(filter).await.unwrap(), 2);
    assert_eq!(base.get_count_by_query(doc! {}).await.unwrap(), 3);
}
