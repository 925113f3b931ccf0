use super::params::EngineParams;

// Controller layout, one pot per drawbar plus the globals:
//   74 71 91 93 73 72 5 84 7   drawbar stops 1..9     linear 0..8
//   75                          master volume          linear 0.0..2.0
//   68                          legato switch          >= 64 is on
//   76 / 77                     additive attack/release log 1 ms..2 s
//   78 / 79                     organ attack/release    log 1 ms..2 s
// Controller 80 toggles output capture and is handled by the render engine.
const DRAWBAR_CCS: [u8; 9] = [74, 71, 91, 93, 73, 72, 5, 84, 7];

#[inline]
fn scale_pot(value: u8, low: f32, high: f32) -> f32 {
  (value as f32 / 127.0) * (high - low) + low
}

#[inline]
fn scale_pot_steps(value: u8, low: u32, high: u32) -> u32 {
  (value as u32 * (high - low)) / 127 + low
}

#[inline]
fn scale_pot_log(value: u8, low: f32, high: f32) -> f32 {
  low * (high / low).powf(value as f32 / 127.0)
}

/// Apply one controller move to the knob set. Unknown controllers are
/// logged and ignored; no state changes.
pub fn apply_control(params: &mut EngineParams, controller: u8, value: u8) {
  if let Some(i) = DRAWBAR_CCS.iter().position(|&cc| cc == controller) {
    params.drawbars[i] = scale_pot_steps(value, 0, 8) as u8;
    return;
  }
  match controller {
    75 => params.master_volume = scale_pot(value, 0.0, 2.0),
    68 => params.legato = value >= 64,
    76 => params.additive_env.attack = scale_pot_log(value, 0.001, 2.0),
    77 => params.additive_env.release = scale_pot_log(value, 0.001, 2.0),
    78 => params.organ_env.attack = scale_pot_log(value, 0.001, 2.0),
    79 => params.organ_env.release = scale_pot_log(value, 0.001, 2.0),
    _ => log::warn!("ignoring controller {} (value {})", controller, value),
  }
}
