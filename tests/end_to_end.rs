//! End-to-end runs on synthetic dunking data.

use std::fs;
use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use dunk_analytics::classify::{select_best_model, Feature};
use dunk_analytics::config::{
    AnalysisConfig, ClassifierConfig, ForestGrid, McmcConfig, NestedConfig, PhysicalConstants,
    SeriesAssignment, SvmGrid,
};
use dunk_analytics::data::{read_measurements, read_microscopy, read_series, Frame, TimeSeries};
use dunk_analytics::pipeline::{analyze, run_analysis, AnalysisInputs};
use dunk_analytics::report::{COMPARISON_HEADER, RADIUS_HEADER};
use dunk_analytics::washburn::WashburnModel;

const BISCUITS: [(&str, f64); 3] = [("Digestive", 2.0e-7), ("Hobnob", 4.0e-7), ("Rich Tea", 6.0e-7)];
const CORRECTION: f64 = 1.2;

fn washburn() -> WashburnModel {
    WashburnModel::new(&PhysicalConstants::default()).expect("reference constants")
}

/// Header plus rows with the radius jittered by up to `spread`.
fn trials_csv(per_label: usize, spread: f64, with_radius: bool, seed: u64) -> String {
    let model = washburn();
    let c = PhysicalConstants::default();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut out = if with_radius {
        String::from("gamma,phi,eta,L,t,r\n")
    } else {
        String::from("gamma,phi,eta,L,t,biscuit\n")
    };
    for (label, radius) in BISCUITS {
        for _ in 0..per_label {
            let r = radius * (1.0 + rng.random_range(-spread..spread));
            let t = rng.random_range(5.0..60.0);
            let l = model.length(r, t).expect("valid");
            let last = if with_radius { format!("{r}") } else { label.to_string() };
            out.push_str(&format!("{},{},{},{l},{t},{last}\n", c.gamma, c.phi, c.eta));
        }
    }
    out
}

fn series_csv(radius: f64) -> String {
    let model = washburn();
    let mut out = String::from("t,L,dL\n");
    for i in 1..=12 {
        let t = i as f64 * 5.0;
        let l = CORRECTION * model.length(radius, t).expect("valid");
        out.push_str(&format!("{t},{l},{}\n", 0.03 * l));
    }
    out
}

fn measurements() -> Frame {
    read_measurements(trials_csv(100, 0.08, false, 1).as_bytes()).expect("parses")
}

fn microscopy() -> Frame {
    read_microscopy(trials_csv(20, 0.10, true, 2).as_bytes()).expect("parses")
}

fn series() -> Vec<(String, TimeSeries)> {
    BISCUITS
        .iter()
        .map(|&(label, r)| {
            let s = read_series(series_csv(r).as_bytes(), label).expect("parses");
            (label.to_string(), s)
        })
        .collect()
}

fn quick_config() -> AnalysisConfig {
    AnalysisConfig {
        mcmc: McmcConfig {
            chains: 4,
            tune: 400,
            draws: 400,
            ..McmcConfig::default()
        },
        nested: NestedConfig {
            live_points: 100,
            ..NestedConfig::default()
        },
        classifier: ClassifierConfig {
            folds: 3,
            features: vec![Feature::ImpliedRadius, Feature::Time],
            svm: SvmGrid {
                c: vec![1.0, 10.0],
                gamma: vec![0.5],
                ..SvmGrid::default()
            },
            forest: ForestGrid {
                n_trees: vec![25],
                max_depth: vec![None],
                min_samples_split: vec![2],
            },
            ..ClassifierConfig::default()
        },
        ..AnalysisConfig::default()
    }
}

#[test]
fn separable_labels_select_an_accurate_model() {
    let config = quick_config();
    let selection =
        select_best_model(&measurements(), &config.labels, &config.classifier).expect("fits");

    assert!(selection.test_report.f1 >= 0.95, "test f1 = {}", selection.test_report.f1);
    let best = selection
        .families
        .iter()
        .map(|f| f.best.cv_f1)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(selection.cv_f1, best);
    assert_eq!(selection.model.encoder().classes(), &["Digestive", "Hobnob", "Rich Tea"]);
    assert_eq!(selection.grid.len(), 3);
}

#[test]
fn analysis_produces_one_summary_per_series() {
    let inputs = AnalysisInputs {
        measurements: measurements(),
        microscopy: microscopy(),
        series: series(),
    };
    let report = analyze(&inputs, &quick_config()).expect("analysis runs");

    assert_eq!(report.microscopy_labels.len(), 60);
    assert_eq!(report.summaries.len(), 3);
    for ((label, radius), summary) in BISCUITS.iter().zip(&report.summaries) {
        assert_eq!(summary.label, *label);
        let rel = (summary.pore_radius_mean - radius).abs() / radius;
        assert!(rel < 0.15, "{label}: microscopy mean off by {rel}");

        // lengths scaled by a0 look like a radius a0² larger
        let expected = CORRECTION * CORRECTION * radius;
        let rel = (summary.mcmc_radius - expected).abs() / expected;
        assert!(rel < 0.05, "{label}: mcmc radius off by {rel}");

        assert!((summary.correction_mean - CORRECTION).abs() < 0.05);
        assert!(summary.bayes_factor > 0.0, "{label}: ln B = {}", summary.bayes_factor);
        assert!(summary.mse_corrected < summary.mse_uncorrected);
        assert!((0.0..=100.0).contains(&summary.tail_probability));
    }
}

#[test]
fn label_without_trials_or_series_does_not_stop_the_run() {
    let mut config = quick_config();
    config.labels.push("Ginger Nut".to_string());
    let inputs = AnalysisInputs {
        measurements: measurements(),
        microscopy: microscopy(),
        series: series().into_iter().take(2).collect(),
    };
    let report = analyze(&inputs, &config).expect("analysis runs");

    assert!(report.microscopy_labels.iter().all(|l| l != "Ginger Nut"));
    assert!(!report.distributions.contains_key("Ginger Nut"));
    assert_eq!(report.distributions.len(), 3);
    assert_eq!(report.summaries.len(), 2);
}

#[test]
fn missing_label_column_is_a_schema_error() {
    let text = "gamma,phi,eta,L,t,r\n0.0678,1.45,0.000993,0.01,10,4e-7\n";
    let frame = read_microscopy(text.as_bytes()).expect("parses");
    let config = quick_config();
    let err = select_best_model(&frame, &config.labels, &config.classifier).expect_err("no labels");
    assert!(matches!(err, dunk_analytics::Error::Schema { ref column, .. } if column == "biscuit"));
}

#[test]
fn runner_writes_both_tables() {
    let dir = std::env::temp_dir().join(format!("dunk-analytics-e2e-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir");
    let write = |name: &str, text: String| -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).expect("write input");
        path
    };

    let mut config = quick_config();
    config.paths.measurements = write("dunking-data.csv", trials_csv(100, 0.08, false, 1));
    config.paths.microscopy = write("microscopy-data.csv", trials_csv(20, 0.10, true, 2));
    config.paths.radius_table = dir.join("biscuit_radii.csv");
    config.paths.comparison_table = dir.join("bayes_factors.csv");
    config.series = BISCUITS
        .iter()
        .enumerate()
        .map(|(i, &(label, r))| SeriesAssignment {
            label: label.to_string(),
            path: write(&format!("tr-{}.csv", i + 1), series_csv(r)),
        })
        .collect();

    let report = run_analysis(&config).expect("runs");
    assert_eq!(report.summaries.len(), 3);

    let radii = fs::read_to_string(&config.paths.radius_table).expect("radius table");
    let mut lines = radii.lines();
    assert_eq!(lines.next(), Some(RADIUS_HEADER));
    assert_eq!(lines.count(), 3);

    let factors = fs::read_to_string(&config.paths.comparison_table).expect("comparison table");
    assert_eq!(factors.lines().next(), Some(COMPARISON_HEADER));
    assert!(factors.lines().nth(1).is_some_and(|l| l.starts_with("Digestive,")));

    fs::remove_dir_all(&dir).ok();
}
