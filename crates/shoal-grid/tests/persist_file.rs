use shoal_compute::SoftwareBackend;
use shoal_grid::{GridConfig, PersistError, SimulationGrid};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("shoal-{}-{name}.shlh", std::process::id()))
}

#[test]
fn file_round_trip_reproduces_buffer() {
    let mut backend = SoftwareBackend::new();
    let mut cfg = GridConfig::new(6, 12.0);
    cfg.layers = 2;
    let mut a = SimulationGrid::init(&cfg, &mut backend).unwrap();
    for (i, v) in a.height.active_mut().data_mut().iter_mut().enumerate() {
        *v = (i as f32).sin() * 3.0;
    }
    let path = temp_path("round-trip");
    a.save_height(&path).unwrap();

    let mut b = SimulationGrid::init(&cfg, &mut backend).unwrap();
    b.load_height(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let bits = |g: &SimulationGrid| -> Vec<u32> {
        g.height.active().data().iter().map(|v| v.to_bits()).collect()
    };
    assert_eq!(bits(&a), bits(&b));
}

#[test]
fn missing_file_is_an_io_error() {
    let mut backend = SoftwareBackend::new();
    let mut g = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
    let err = g.load_height(temp_path("does-not-exist")).unwrap_err();
    assert!(matches!(err, PersistError::Io(_)));
}
