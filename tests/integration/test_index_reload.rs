//! Swapping a rebuilt index under live readers.

use std::sync::Arc;

use discogs_rec::{
    ForestParams, IndexHandle, IndexPersistence, RecommendConfig, Recommender, ReleaseQuery,
};

use crate::common::{ExportedInputs, Fixture, build_snapshot, release_id, sample_fixtures};

#[test]
fn test_reload_swaps_in_rebuilt_index() {
    let inputs = ExportedInputs::write(&sample_fixtures());
    let persistence = IndexPersistence::new(inputs.index_path());
    let params = ForestParams::new(10, 2).unwrap();

    persistence
        .save(&build_snapshot(&sample_fixtures(), params, 1))
        .unwrap();
    let handle = Arc::new(IndexHandle::new(persistence.load().unwrap()));
    let recommender = Recommender::new(Arc::clone(&handle), RecommendConfig::default());

    let new_release = release_id(300005);
    assert!(
        recommender
            .recommend(ReleaseQuery::from(new_release), 3)
            .is_err()
    );
    let in_flight = handle.snapshot();

    let mut fixtures = sample_fixtures();
    fixtures.push(Fixture::new(
        300005,
        "Thelonious Monk",
        "Brilliant Corners",
        &[0.0, 0.1, 0.9, 0.2],
    ));
    persistence
        .save(&build_snapshot(&fixtures, params, 2))
        .unwrap();
    let previous = handle.reload(&persistence).unwrap();

    assert_eq!(previous.store().len(), 10);
    assert_eq!(in_flight.store().len(), 10);
    assert_eq!(handle.snapshot().store().len(), 11);

    let items = recommender
        .recommend(ReleaseQuery::from(new_release), 3)
        .unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| item.release_id.get() >= 300_000));
}
