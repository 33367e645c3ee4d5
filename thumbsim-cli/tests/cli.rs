use std::process::Command;

use image::Rgb;
use thumbsim_cli::thumbsim_core::{OrbConfig, RasterImage};
use thumbsim_cli::PipelineConfig;

fn thumbsim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_thumbsim"))
}

fn small_config() -> PipelineConfig {
    PipelineConfig {
        target_width: 160,
        target_height: 120,
        orb: OrbConfig {
            patch_size: 15,
            edge_threshold: 16,
            n_levels: 3,
            max_features: 100,
            n_threads: 2,
            ..OrbConfig::default()
        },
        ..PipelineConfig::default()
    }
}

fn create_test_image(shift: u32) -> RasterImage {
    RasterImage::from_fn(240, 180, |x, y| {
        if ((x + shift) / 24 + y / 24) % 2 == 0 {
            Rgb([210, 180, 40])
        } else {
            Rgb([20, 40, 90])
        }
    })
}

#[test]
fn info_prints_descriptor_and_health() {
    let output = thumbsim().arg("info").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("/api/compare"));
    assert!(stdout.contains("healthy"));
}

#[test]
fn config_prints_parseable_toml() {
    let output = thumbsim().arg("config").output().unwrap();
    assert!(output.status.success());
    let parsed = PipelineConfig::from_toml(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(parsed.target_size(), (800, 600));
}

#[test]
fn compare_writes_report_and_images() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.jpg");
    let report = dir.path().join("report.json");
    let images = dir.path().join("images");

    small_config().save_toml(&config).unwrap();
    create_test_image(0).save(&first).unwrap();
    create_test_image(7).save(&second).unwrap();

    let output = thumbsim()
        .arg("--config")
        .arg(&config)
        .arg("compare")
        .arg(&first)
        .arg(&second)
        .arg("--output")
        .arg(&report)
        .arg("--write-images")
        .arg(&images)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8(output.stdout).unwrap().contains("Overall similarity"));

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["success"], true);

    let comparison = image::open(images.join("overall_comparison.png")).unwrap();
    assert_eq!((comparison.width(), comparison.height()), (480, 120));
    assert!(images.join("feature_matches.png").exists());
}

#[test]
fn compare_rejects_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.bmp");
    create_test_image(0).save(&first).unwrap();
    create_test_image(0).save(&second).unwrap();

    let output = thumbsim().arg("compare").arg(&first).arg(&second).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("detail"));
    assert!(stderr.contains("400"));
}
