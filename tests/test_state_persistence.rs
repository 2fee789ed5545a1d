mod common;

use sargeom::{
    GeometricSarSensorModel, GroundPoint, ImagePoint, Keywordlist, MissionAdapter, SarError,
    SolverConfig, SrgrRecord,
};
use tempfile::TempDir;

fn optimised_model() -> GeometricSarSensorModel {
    let mut model = common::synthetic_model()
        .with_solver(SolverConfig {
            max_iterations: 12,
            ..SolverConfig::default()
        })
        .expect("valid solver");
    let points = [
        ImagePoint::new(40.0, 60.0),
        ImagePoint::new(510.0, 1400.0),
        ImagePoint::new(960.0, 300.0),
    ];
    let ground: Vec<GroundPoint> = points
        .iter()
        .map(|p| model.line_sample_height_to_world(p, 75.0).expect("forward"))
        .collect();
    let image: Vec<ImagePoint> = points
        .iter()
        .map(|p| ImagePoint::new(p.line + 0.75, p.col - 1.5))
        .collect();
    model.optimize_model(&ground, &image).expect("optimisation");
    model
}

fn assert_same_geometry(a: &GeometricSarSensorModel, b: &GeometricSarSensorModel) {
    for image in common::test_points() {
        let ga = a.line_sample_height_to_world(&image, 25.0).expect("forward");
        let gb = b.line_sample_height_to_world(&image, 25.0).expect("forward");
        assert_eq!(ga, gb);
        assert_eq!(
            a.world_to_line_sample(&ga).expect("inverse"),
            b.world_to_line_sample(&gb).expect("inverse")
        );
    }
}

#[test]
fn test_save_and_load_through_a_file() {
    common::init_logging();
    let model = optimised_model();
    let mut kwl = Keywordlist::new();
    model.save_state(&mut kwl, "");

    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("model.kwl");
    kwl.save(&path).expect("write");
    let reloaded = Keywordlist::load(&path).expect("read");
    assert_eq!(reloaded, kwl);

    let restored = GeometricSarSensorModel::load_state(&reloaded, "").expect("load state");
    assert_eq!(restored.correction(), model.correction());
    assert_eq!(restored.gcp_list(), model.gcp_list());
    assert_eq!(restored.solver(), model.solver());
    assert_eq!(restored.ref_point(), model.ref_point());
    assert_eq!(restored.platform(), model.platform());
    assert_eq!(restored.sensor_params(), model.sensor_params());
    assert_same_geometry(&model, &restored);
}

#[test]
fn test_state_under_a_prefix() {
    let model = optimised_model();
    let mut kwl = Keywordlist::new();
    kwl.add("product.name", "synthetic");
    model.save_state(&mut kwl, "model.");
    assert_eq!(kwl.find("model.type"), Some("GeometricSarSensorModel"));
    assert_eq!(kwl.find("model.gcp.count"), Some("3"));

    let restored = GeometricSarSensorModel::load_state(&kwl, "model.").expect("load state");
    assert_same_geometry(&model, &restored);

    // Nothing saved under another prefix
    assert!(GeometricSarSensorModel::load_state(&kwl, "other.").is_err());
}

#[test]
fn test_display_text_parses_back() {
    let model = optimised_model();
    let text = model.to_string();
    assert!(text.lines().all(|l| l.contains(": ")));

    let kwl: Keywordlist = text.parse().expect("parses");
    let restored = GeometricSarSensorModel::load_state(&kwl, "").expect("load state");
    assert_eq!(restored.to_string(), text);
}

#[test]
fn test_ground_range_product_persists() {
    let mut sensor = common::synthetic_sensor();
    let start = sensor.azimuth_start();
    sensor
        .set_adapter(MissionAdapter::GroundRange {
            pixel_spacing: 2.5,
            records: vec![SrgrRecord {
                azimuth_time: start,
                ground_range_origin: 0.0,
                coefficients: vec![850e3, 0.8, 1e-7],
            }],
        })
        .expect("valid adapter");
    let platform = sargeom::PlatformPosition::new(common::synthetic_orbit()).expect("orbit");
    let model = common::model_from(platform, sensor);

    let mut kwl = Keywordlist::new();
    model.save_state(&mut kwl, "");
    let restored = GeometricSarSensorModel::load_state(&kwl, "").expect("load state");
    assert!(restored.sensor_params().is_georeferenced());
    assert_same_geometry(&model, &restored);
}

#[test]
fn test_corrupted_state_is_rejected() {
    let model = optimised_model();
    let mut kwl = Keywordlist::new();
    model.save_state(&mut kwl, "");

    let mut wrong_type = kwl.clone();
    wrong_type.add("type", "SomeOtherModel");
    assert!(matches!(
        GeometricSarSensorModel::load_state(&wrong_type, ""),
        Err(SarError::Keyword { .. })
    ));

    let mut bad_number = kwl.clone();
    bad_number.add("sensor.prf", "fast");
    assert!(GeometricSarSensorModel::load_state(&bad_number, "").is_err());

    let mut missing_gcp = kwl;
    missing_gcp.add("gcp.count", 4);
    assert!(GeometricSarSensorModel::load_state(&missing_gcp, "").is_err());
}
