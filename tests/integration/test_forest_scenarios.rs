//! Search and recommendation behavior on small hand-made data sets.

use std::sync::Arc;

use discogs_rec::forest::codec;
use discogs_rec::{
    ForestBuilder, ForestParams, IndexHandle, RecommendConfig, RecommendError, Recommender,
    ReleaseQuery, SearchEngine, VectorDimension, VectorStore,
};

use crate::common::{Fixture, build_snapshot, release_id, sample_fixtures};

#[test]
fn test_four_point_search_returns_exact_match_then_closest_angle() {
    let store = VectorStore::from_items(
        VectorDimension::new(2).unwrap(),
        vec![
            (release_id(1), vec![1.0, 0.0]),
            (release_id(2), vec![0.9, 0.1]),
            (release_id(3), vec![0.0, 1.0]),
            (release_id(4), vec![-1.0, 0.0]),
        ],
    )
    .unwrap();
    let forest = ForestBuilder::new(ForestParams::new(1, 1).unwrap())
        .build_seeded(&store, 3)
        .unwrap();

    let results = SearchEngine::new(&forest, &store)
        .unwrap()
        .search(&[1.0, 0.0], 2)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].index.get(), 0);
    assert_eq!(results[0].distance, 0.0);
    assert_eq!(results[1].index.get(), 1);
}

#[test]
fn test_unknown_release_is_reported_as_unknown_item() {
    let snapshot = build_snapshot(&sample_fixtures(), ForestParams::new(5, 2).unwrap(), 1);
    let recommender = Recommender::new(
        Arc::new(IndexHandle::new(snapshot)),
        RecommendConfig::default(),
    );

    let result = recommender.recommend(ReleaseQuery::from(release_id(999_999)), 5);
    assert!(matches!(
        result,
        Err(RecommendError::UnknownItem { release_id }) if release_id.get() == 999_999
    ));

    let result = recommender.recommend_input("https://www.discogs.com/release/999999-Nothing", 5);
    assert!(matches!(result, Err(RecommendError::UnknownItem { .. })));
}

#[test]
fn test_fewer_artists_than_requested_returns_short_list() {
    let fixtures = vec![
        Fixture::new(1, "Query Artist", "Seed", &[1.0, 0.0, 0.0]),
        Fixture::new(2, "Artist A", "A1", &[0.9, 0.1, 0.0]),
        Fixture::new(3, "Artist A", "A2", &[0.8, 0.2, 0.0]),
        Fixture::new(4, "Artist B", "B1", &[0.7, 0.0, 0.3]),
        Fixture::new(5, "artist b ", "B2", &[0.6, 0.1, 0.3]),
        Fixture::new(6, "Artist C", "C1", &[0.0, 1.0, 0.0]),
    ];
    let snapshot = build_snapshot(&fixtures, ForestParams::new(8, 1).unwrap(), 11);
    let recommender = Recommender::new(
        Arc::new(IndexHandle::new(snapshot)),
        RecommendConfig::default(),
    );

    let items = recommender
        .recommend(ReleaseQuery::from(release_id(1)), 5)
        .unwrap();

    assert_eq!(items.len(), 3);
    let artists: Vec<&str> = items.iter().map(|item| item.artist.as_str()).collect();
    assert_eq!(artists, vec!["Artist A", "Artist B", "Artist C"]);
    assert!(items.iter().all(|item| item.release_id != release_id(1)));
    assert!(
        items
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance)
    );
}

#[test]
fn test_recommendations_stay_in_cluster_and_skip_repeat_artists() {
    let snapshot = build_snapshot(&sample_fixtures(), ForestParams::new(20, 2).unwrap(), 5);
    let recommender = Recommender::new(
        Arc::new(IndexHandle::new(snapshot)),
        RecommendConfig::default(),
    );

    let items = recommender.recommend_input("249504", 3).unwrap();

    assert_eq!(items.len(), 3);
    let mut artists: Vec<&str> = items.iter().map(|item| item.artist.as_str()).collect();
    artists.sort_unstable();
    artists.dedup();
    assert_eq!(artists.len(), 3, "one release per artist");
    assert!(items.iter().all(|item| item.release_id.get() < 300_000));
    assert!(
        items[0]
            .url
            .starts_with("https://www.discogs.com/release/2495")
    );
}

#[test]
fn test_seeded_builds_are_identical() {
    let (store, _) = crate::common::store_and_catalog(&sample_fixtures());
    let params = ForestParams::new(12, 2).unwrap();

    let first = ForestBuilder::new(params)
        .with_threads(1)
        .build_seeded(&store, 42)
        .unwrap();
    let second = ForestBuilder::new(params)
        .with_threads(4)
        .build_seeded(&store, 42)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        codec::encode_to_vec(&first).unwrap(),
        codec::encode_to_vec(&second).unwrap()
    );
}
