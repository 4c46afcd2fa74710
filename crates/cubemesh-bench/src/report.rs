use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// One metric that got slower than the baseline allows.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub scene_name: String,
    /// "cpu" or "gpu".
    pub path: &'static str,
    pub pct_change: f64,
}

/// Load a baseline from a JSON file. Returns None if the file doesn't exist.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(baseline) => Some(baseline),
        Err(e) => {
            log::warn!("Ignoring malformed baseline {}: {e}", path.display());
            None
        }
    }
}

/// Save a baseline to a JSON file.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current mean frame times against a baseline. GPU timings are
/// compared only when both runs have them.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<Regression> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        else {
            continue;
        };

        let mut check = |path, now: f64, then: f64| {
            if then <= 0.0 {
                return;
            }
            let pct_change = (now - then) / then * 100.0;
            if pct_change > threshold_pct {
                regressions.push(Regression {
                    scene_name: result.scene_name.clone(),
                    path,
                    pct_change,
                });
            }
        };

        check("cpu", result.cpu_timings.mean_ms, base.cpu_timings.mean_ms);
        if let (Some(now), Some(then)) = (&result.gpu_timings, &base.gpu_timings) {
            check("gpu", now.mean_ms, then.mean_ms);
        }
    }

    regressions
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Blocks | Chunks | Faces | Culled | Triangles | CPU mean (ms) | CPU p95 (ms) | CPU p99 (ms) | GPU mean (ms) | GPU p95 (ms) |\n");
    out.push_str("|-------|--------|--------|-------|--------|-----------|---------------|--------------|--------------|---------------|--------------|\n");

    for r in results {
        let (gpu_mean, gpu_p95) = match &r.gpu_timings {
            Some(t) => (format!("{:.2}", t.mean_ms), format!("{:.2}", t.p95_ms)),
            None => ("-".to_string(), "-".to_string()),
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.2} | {} | {} |\n",
            r.scene_name,
            r.block_count,
            r.chunk_count,
            r.faces_emitted,
            r.faces_culled,
            r.triangles,
            r.cpu_timings.mean_ms,
            r.cpu_timings.p95_ms,
            r.cpu_timings.p99_ms,
            gpu_mean,
            gpu_p95,
        ));
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[Regression], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for r in regressions {
        out.push_str(&format!("  - {} ({}): +{:.1}%\n", r.scene_name, r.path, r.pct_change));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::compute_timings;

    fn result(name: &str, cpu_ms: f64, gpu_ms: Option<f64>) -> BenchmarkResult {
        BenchmarkResult {
            scene_name: name.to_string(),
            block_count: 64,
            chunk_count: 1,
            frame_count: 1,
            groups_emitted: 64,
            faces_emitted: 96,
            faces_culled: 288,
            triangles: 192,
            cpu_timings: compute_timings(&[cpu_ms]),
            gpu_timings: gpu_ms.map(|ms| compute_timings(&[ms])),
            gpu_groups: None,
        }
    }

    fn baseline(results: Vec<BenchmarkResult>) -> Baseline {
        Baseline {
            timestamp: "test".to_string(),
            results,
        }
    }

    #[test]
    fn test_compare_flags_slow_scenes() {
        let base = baseline(vec![result("a", 10.0, None), result("b", 10.0, None)]);
        let current = [result("a", 10.5, None), result("b", 12.0, None)];
        let regressions = compare(&current, &base, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].scene_name, "b");
        assert_eq!(regressions[0].path, "cpu");
        assert!((regressions[0].pct_change - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_gpu_only_when_both_present() {
        let base = baseline(vec![result("a", 10.0, Some(1.0))]);
        let slower_gpu = [result("a", 10.0, Some(2.0))];
        let regressions = compare(&slower_gpu, &base, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].path, "gpu");

        let no_gpu = [result("a", 10.0, None)];
        assert!(compare(&no_gpu, &base, 10.0).is_empty());
    }

    #[test]
    fn test_compare_ignores_unknown_scenes() {
        let base = baseline(vec![result("a", 10.0, None)]);
        assert!(compare(&[result("new", 100.0, None)], &base, 10.0).is_empty());
    }

    #[test]
    fn test_baseline_json_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("cubemesh-bench-{}", std::process::id()))
            .join("baseline.json");
        let saved = baseline(vec![result("a", 3.0, Some(1.5))]);
        save_baseline(&path, &saved).unwrap();
        let loaded = load_baseline(&path).unwrap();
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0].faces_emitted, 96);
        assert_eq!(loaded.results[0].gpu_timings.as_ref().unwrap().mean_ms, 1.5);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_baseline_without_gpu_fields_loads() {
        let json = r#"{"timestamp":"old","results":[{"scene_name":"a","block_count":1,
            "chunk_count":1,"frame_count":1,"groups_emitted":1,"faces_emitted":6,
            "faces_culled":0,"triangles":12,"cpu_timings":{"mean_ms":1.0,"median_ms":1.0,
            "p95_ms":1.0,"p99_ms":1.0,"min_ms":1.0,"max_ms":1.0}}]}"#;
        let baseline: Baseline = serde_json::from_str(json).unwrap();
        assert!(baseline.results[0].gpu_timings.is_none());
    }

    #[test]
    fn test_missing_baseline_is_none() {
        assert!(load_baseline(Path::new("/nonexistent/cubemesh/baseline.json")).is_none());
    }

    #[test]
    fn test_format_markdown_rows() {
        let md = format_markdown(&[result("a", 1.0, None), result("b", 2.0, Some(0.5))]);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("| a | 64 | 1 | 96 | 288 | 192 | 1.00"));
        assert!(lines[2].ends_with("| - | - |"));
        assert!(lines[3].contains("| 0.50 | 0.50 |"));
    }

    #[test]
    fn test_format_comparison() {
        assert!(format_comparison(&[], 10.0).contains("No regressions"));
        let text = format_comparison(
            &[Regression {
                scene_name: "a".to_string(),
                path: "gpu",
                pct_change: 12.34,
            }],
            10.0,
        );
        assert!(text.contains("a (gpu): +12.3%"));
    }
}
