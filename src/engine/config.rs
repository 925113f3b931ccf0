use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use super::envelope::EnvTimes;
use super::params::{ElementKind, EngineParams};
use super::pitch::WheelMode;
use super::plugins::chain::{ControlValue, StageConfig};

/// Startup configuration: the knob defaults plus the effect-module list and
/// chain wiring table. Read once at boot, never written back.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub master_volume: f32,
  pub legato: bool,
  pub wheel_mode: WheelMode,
  pub element: ElementKind,
  pub additive_env: EnvTimes,
  pub organ_env: EnvTimes,
  pub drawbars: [u8; 9],
  /// Effect modules to load, in order.
  pub modules: Vec<String>,
  /// Chain wiring, applied in order after the modules are loaded.
  pub chain: Vec<StageConfig>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    let params = EngineParams::default();
    Self {
      master_volume: params.master_volume,
      legato: params.legato,
      wheel_mode: params.wheel_mode,
      element: params.element,
      additive_env: params.additive_env,
      organ_env: params.organ_env,
      drawbars: params.drawbars,
      modules: vec!["caps.so".into(), "lp4pole_1671.so".into()],
      chain: vec![
        // chorus
        StageConfig {
          unique_id: 2583,
          input_port: 0,
          output_port: 7,
          controls: vec![
            ControlValue { port: 1, value: 25.0 }, // delay ms
            ControlValue { port: 2, value: 7.0 },  // width
            ControlValue { port: 5, value: 0.5 },  // feedforward
            ControlValue { port: 6, value: 0.4 },  // feedback
          ],
        },
        // phaser
        StageConfig {
          unique_id: 2586,
          input_port: 0,
          output_port: 5,
          controls: vec![
            ControlValue { port: 1, value: 0.5 }, // rate
            ControlValue { port: 2, value: 0.5 }, // depth
            ControlValue { port: 3, value: 1.0 }, // spread
            ControlValue { port: 4, value: 0.2 }, // feedback
          ],
        },
        // four-pole low-pass
        StageConfig {
          unique_id: 1672,
          input_port: 2,
          output_port: 3,
          controls: vec![
            ControlValue { port: 0, value: 2000.0 }, // cutoff Hz
            ControlValue { port: 1, value: 0.1 },    // resonance
          ],
        },
      ],
    }
  }
}

impl EngineConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let text =
      fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
  }

  /// The knob set this configuration boots with.
  pub fn params(&self) -> EngineParams {
    EngineParams {
      master_volume: self.master_volume,
      legato: self.legato,
      wheel_mode: self.wheel_mode,
      pitch_bend: 0,
      element: self.element,
      additive_env: self.additive_env,
      organ_env: self.organ_env,
      drawbars: self.drawbars,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_wiring_matches_the_built_in_tables() {
    let config = EngineConfig::default();
    assert_eq!(config.modules.len(), 2);
    let ids: Vec<_> = config.chain.iter().map(|s| s.unique_id).collect();
    assert_eq!(ids, vec![2583, 2586, 1672]);
  }

  #[test]
  fn partial_json_falls_back_to_defaults() {
    let config: EngineConfig =
      serde_json::from_str(r#"{ "master_volume": 1.25, "legato": true }"#).unwrap();
    assert_eq!(config.master_volume, 1.25);
    assert!(config.legato);
    assert_eq!(config.chain.len(), 3);
    assert_eq!(config.element, ElementKind::Additive);
  }

  #[test]
  fn chain_wiring_parses_from_json() {
    let config: EngineConfig = serde_json::from_str(
      r#"{
        "modules": ["mod.so"],
        "chain": [
          { "unique_id": 7, "input_port": 0, "output_port": 1,
            "controls": [ { "port": 2, "value": 0.5 } ] },
          { "unique_id": 8, "input_port": 0, "output_port": 1 }
        ]
      }"#,
    )
    .unwrap();
    assert_eq!(config.chain.len(), 2);
    assert_eq!(config.chain[0].controls[0].port, 2);
    assert!(config.chain[1].controls.is_empty());
  }
}
