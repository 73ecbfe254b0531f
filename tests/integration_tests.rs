// Gateway file to expose integration tests from the integration/ subdirectory

mod common;

#[path = "integration/test_forest_scenarios.rs"]
mod test_forest_scenarios;

#[path = "integration/test_build_and_recommend.rs"]
mod test_build_and_recommend;

#[path = "integration/test_index_reload.rs"]
mod test_index_reload;
