use anyhow::{Context, Result};
use drive_decision_core::DecisionConfig;
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_SAFETY_TIME_MARGIN: &str = "DRIVE_SAFETY_TIME_MARGIN";
pub const ENV_SAFETY_DISTANCE_MARGIN: &str = "DRIVE_SAFETY_DISTANCE_MARGIN";
pub const ENV_NEAR_ZERO_SPEED: &str = "DRIVE_NEAR_ZERO_SPEED";
pub const ENV_SPEED_LIMIT: &str = "DRIVE_SPEED_LIMIT";
pub const ENV_SPEED_STEP: &str = "DRIVE_SPEED_STEP";
pub const ENV_SHARP_TURN_DEG: &str = "DRIVE_SHARP_TURN_DEG";
pub const ENV_LATERAL_PAD: &str = "DRIVE_LATERAL_PAD";
pub const ENV_PEDESTRIAN_STOP_DISTANCE: &str = "DRIVE_PEDESTRIAN_STOP_DISTANCE";

/// Loads a decision config: JSON file (or canonical defaults), then `DRIVE_*`
/// environment overrides, then validation.
pub fn load_decision_config(path: Option<&Path>) -> Result<DecisionConfig> {
    let base = match path {
        Some(path) => read_config_file(path)?,
        None => DecisionConfig::default(),
    };
    let cfg = apply_env_overrides(base, |name| env::var(name).ok());
    cfg.validate().with_context(|| match path {
        Some(path) => format!("config {} failed validation", path.display()),
        None => "environment overrides failed validation".to_string(),
    })?;
    Ok(cfg)
}

pub fn read_config_file(path: &Path) -> Result<DecisionConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing config {}", path.display()))
}

/// Applies overrides from `lookup`, which stands in for the process
/// environment so tests can drive it without touching global state.
pub fn apply_env_overrides<F>(mut cfg: DecisionConfig, lookup: F) -> DecisionConfig
where
    F: Fn(&str) -> Option<String>,
{
    let fields: [(&str, &mut f64); 8] = [
        (ENV_SAFETY_TIME_MARGIN, &mut cfg.safety_time_margin_s),
        (ENV_SAFETY_DISTANCE_MARGIN, &mut cfg.safety_distance_margin_m),
        (ENV_NEAR_ZERO_SPEED, &mut cfg.near_zero_speed_mps),
        (ENV_SPEED_LIMIT, &mut cfg.speed_limit_mps),
        (ENV_SPEED_STEP, &mut cfg.speed_step_mps),
        (ENV_SHARP_TURN_DEG, &mut cfg.sharp_turn_deg),
        (ENV_LATERAL_PAD, &mut cfg.lateral_safety_pad_m),
        (ENV_PEDESTRIAN_STOP_DISTANCE, &mut cfg.pedestrian_stop_distance_m),
    ];
    for (name, slot) in fields {
        if let Some(value) = read_env_f64(name, &lookup) {
            tracing::debug!(name, value, "config override");
            *slot = value;
        }
    }
    cfg
}

fn read_env_f64<F>(name: &str, lookup: &F) -> Option<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            tracing::warn!("{name}={raw:?} is not a finite number. Keeping the configured value.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let cfg = apply_env_overrides(
            DecisionConfig::default(),
            lookup_from(&[(ENV_SPEED_LIMIT, "8.5"), (ENV_LATERAL_PAD, " 0.4 ")]),
        );
        assert_eq!(cfg.speed_limit_mps, 8.5);
        assert_eq!(cfg.lateral_safety_pad_m, 0.4);
        assert_eq!(
            cfg.safety_time_margin_s,
            DecisionConfig::default().safety_time_margin_s
        );
    }

    #[test]
    fn unparsable_overrides_are_ignored() {
        let cfg = apply_env_overrides(
            DecisionConfig::default(),
            lookup_from(&[(ENV_SAFETY_TIME_MARGIN, "fast"), (ENV_SPEED_STEP, "inf")]),
        );
        assert_eq!(cfg, DecisionConfig::default());
    }

    #[test]
    fn config_file_round_trips_partial_fields() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"safety_time_margin_s": 3.0, "pedestrian_stop_distance_m": 3.0}"#)?;
        let cfg = read_config_file(&path)?;
        assert_eq!(cfg.safety_time_margin_s, 3.0);
        assert_eq!(cfg.pedestrian_stop_distance_m, 3.0);
        assert_eq!(cfg.speed_limit_mps, DecisionConfig::default().speed_limit_mps);
        Ok(())
    }

    #[test]
    fn invalid_config_file_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"speed_limit_mps": -2.0}"#)?;
        let err = load_decision_config(Some(&path)).expect_err("negative limit");
        assert!(format!("{err:#}").contains("speed_limit_mps"), "{err:#}");
        Ok(())
    }
}
