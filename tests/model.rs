use mves::asset::AssetGroup;
use mves::model::Model;
use std::path::{Path, PathBuf};

/// Get the path to a bundled demo model.
fn get_model_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

/// An integration test which attempts to load the demo models
#[test]
fn test_model_from_path() {
    let model = Model::from_path(get_model_dir("simple")).unwrap();
    assert_eq!(model.periods(), 168);
    assert_eq!(model.days(), 7);
    assert!(model.assets.get_by_label("pv").is_some());
    assert!(model.assets.get_by_label("dso_consumption").is_some());
    assert!(model.assets.get_by_label("dso_feedin").is_some());
    assert_eq!(
        model
            .assets
            .iter_group(&AssetGroup::Excess)
            .count(),
        model.buses.len()
    );

    let model = Model::from_path(get_model_dir("sector_coupling")).unwrap();
    assert_eq!(model.buses.len(), 2);
    assert_eq!(model.fixcosts.len(), 1);
}
