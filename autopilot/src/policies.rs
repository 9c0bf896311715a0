use crate::config::load_decision_config;
use crate::util::fingerprint;
use anyhow::{anyhow, Context, Result};
use drive_decision_core::{decide_with, Decision, DecisionConfig, DecisionError, SceneSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const CONFIGURED_POLICY_ID: &str = "configured";
pub const CONFIG_FILE_PREFIX: &str = "config:";

pub trait DrivingPolicy {
    fn id(&self) -> &str;
    fn description(&self) -> &str;
    fn family(&self) -> &'static str;
    /// Parameters the harness uses for speed stepping between ticks.
    fn config(&self) -> &DecisionConfig;
    fn decide(&self, scene: &SceneSnapshot) -> Result<Decision, DecisionError>;
}

#[derive(Clone, Debug, Serialize)]
pub struct PolicyManifestEntry {
    pub id: String,
    pub family: String,
    pub description: String,
    pub config_hash: String,
    pub config: serde_json::Value,
}

#[derive(Clone, Copy, Debug)]
struct PresetConfig {
    id: &'static str,
    description: &'static str,
    config: DecisionConfig,
}

fn preset_configs() -> [PresetConfig; 3] {
    let canonical = DecisionConfig::default();
    [
        PresetConfig {
            id: "canonical",
            description: "Reference hazard and traffic rules with the default margins.",
            config: canonical,
        },
        PresetConfig {
            id: "cautious",
            description: "Wider time margin and lateral pad, halts early for pedestrians.",
            config: DecisionConfig {
                safety_time_margin_s: 3.0,
                lateral_safety_pad_m: 0.5,
                pedestrian_stop_distance_m: 3.0,
                speed_limit_mps: 5.0,
                ..canonical
            },
        },
        PresetConfig {
            id: "brisk",
            description: "Tight margins and a higher speed cap.",
            config: DecisionConfig {
                safety_time_margin_s: 1.5,
                safety_distance_margin_m: 1.5,
                speed_limit_mps: 8.0,
                ..canonical
            },
        },
    ]
}

const CRUISE_ID: &str = "cruise";
const CRUISE_DESCRIPTION: &str =
    "Baseline that steers to the target and ignores actors and traffic controls.";

/// Full hazard/traffic arbitration under a fixed config.
#[derive(Clone, Debug)]
pub struct HazardPolicy {
    id: String,
    description: String,
    family: &'static str,
    cfg: DecisionConfig,
}

impl HazardPolicy {
    pub fn new(id: impl Into<String>, description: impl Into<String>, cfg: DecisionConfig) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            family: "hazard",
            cfg,
        }
    }

    fn configured(id: impl Into<String>, description: impl Into<String>, cfg: DecisionConfig) -> Self {
        Self {
            family: "configured",
            ..Self::new(id, description, cfg)
        }
    }
}

impl DrivingPolicy for HazardPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn family(&self) -> &'static str {
        self.family
    }

    fn config(&self) -> &DecisionConfig {
        &self.cfg
    }

    fn decide(&self, scene: &SceneSnapshot) -> Result<Decision, DecisionError> {
        decide_with(scene, &self.cfg)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CruisePolicy {
    cfg: DecisionConfig,
}

impl DrivingPolicy for CruisePolicy {
    fn id(&self) -> &str {
        CRUISE_ID
    }

    fn description(&self) -> &str {
        CRUISE_DESCRIPTION
    }

    fn family(&self) -> &'static str {
        "baseline"
    }

    fn config(&self) -> &DecisionConfig {
        &self.cfg
    }

    fn decide(&self, scene: &SceneSnapshot) -> Result<Decision, DecisionError> {
        // Reject the same inputs the real policies reject, then look only at
        // the target.
        scene.validate()?;
        let open_road = SceneSnapshot {
            actors: BTreeMap::new(),
            distance_to_red_light: None,
            distance_to_stop_sign: None,
            ..scene.clone()
        };
        decide_with(&open_road, &self.cfg)
    }
}

pub fn policy_ids() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = preset_configs().iter().map(|p| p.id).collect();
    ids.push(CONFIGURED_POLICY_ID);
    ids.push(CRUISE_ID);
    ids
}

pub fn describe_policies() -> Vec<(&'static str, &'static str)> {
    let mut out: Vec<(&'static str, &'static str)> = preset_configs()
        .iter()
        .map(|p| (p.id, p.description))
        .collect();
    out.push((
        CONFIGURED_POLICY_ID,
        "Canonical defaults with DRIVE_* environment overrides applied.",
    ));
    out.push((CRUISE_ID, CRUISE_DESCRIPTION));
    out
}

/// Builds a policy by roster id, or from a JSON config via `config:<path>`.
pub fn create_policy(id: &str) -> Result<Box<dyn DrivingPolicy>> {
    if let Some(path) = id.strip_prefix(CONFIG_FILE_PREFIX) {
        let path = Path::new(path);
        let cfg = load_decision_config(Some(path))?;
        return Ok(Box::new(HazardPolicy::configured(
            id,
            format!("Hazard rules configured from {}.", path.display()),
            cfg,
        )));
    }
    if id == CONFIGURED_POLICY_ID {
        let cfg = load_decision_config(None)?;
        return Ok(Box::new(HazardPolicy::configured(
            id,
            "Canonical defaults with DRIVE_* environment overrides applied.",
            cfg,
        )));
    }
    if let Some(preset) = preset_configs().iter().find(|p| p.id == id) {
        return Ok(Box::new(HazardPolicy::new(
            preset.id,
            preset.description,
            preset.config,
        )));
    }
    if id == CRUISE_ID {
        return Ok(Box::new(CruisePolicy::default()));
    }
    let available = policy_ids().join(", ");
    Err(anyhow!(
        "unknown policy '{id}'. available: {available}, {CONFIG_FILE_PREFIX}<path>"
    ))
}

/// Fingerprint over the id, family, and serialized config, so two roster
/// entries sharing a config still hash apart.
pub fn policy_fingerprint(policy: &dyn DrivingPolicy) -> Result<String> {
    Ok(manifest_entry(policy)?.config_hash)
}

pub fn manifest_entry(policy: &dyn DrivingPolicy) -> Result<PolicyManifestEntry> {
    let config = serde_json::to_value(policy.config())
        .with_context(|| format!("failed to serialize config for {}", policy.id()))?;
    let keyed = serde_json::json!({
        "id": policy.id(),
        "family": policy.family(),
        "config": &config,
    });
    let encoded = serde_json::to_vec(&keyed).context("failed to serialize manifest key")?;
    Ok(PolicyManifestEntry {
        id: policy.id().to_string(),
        family: policy.family().to_string(),
        description: policy.description().to_string(),
        config_hash: fingerprint(&encoded),
        config,
    })
}

pub fn policy_manifest_entries() -> Result<Vec<PolicyManifestEntry>> {
    policy_ids()
        .into_iter()
        .map(|id| create_policy(id).and_then(|policy| manifest_entry(policy.as_ref())))
        .collect()
}
