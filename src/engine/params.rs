use serde::Deserialize;

use super::envelope::EnvTimes;
use super::pitch::WheelMode;

/// Which waveform element is generating. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum ElementKind {
  Additive,
  DrawbarOrgan,
}

/// The global knob set. Owned by the render side; the event side only
/// reaches it through queued commands, never directly.
#[derive(Clone, Debug)]
pub struct EngineParams {
  pub master_volume: f32,
  pub legato: bool,
  pub wheel_mode: WheelMode,
  /// Current wheel position, -8192..8191.
  pub pitch_bend: i16,
  pub element: ElementKind,
  pub additive_env: EnvTimes,
  pub organ_env: EnvTimes,
  /// Stop levels 0..=8, one per drawbar.
  pub drawbars: [u8; 9],
}

impl Default for EngineParams {
  fn default() -> Self {
    Self {
      master_volume: 0.7,
      legato: false,
      wheel_mode: WheelMode::Traditional,
      pitch_bend: 0,
      element: ElementKind::Additive,
      additive_env: EnvTimes { attack: 0.02, decay: 0.1, release: 0.2 },
      // organ decay is unused by its three-stage curve
      organ_env: EnvTimes { attack: 0.005, decay: 0.0, release: 0.05 },
      drawbars: [8, 0, 6, 0, 0, 4, 0, 0, 2],
    }
  }
}
