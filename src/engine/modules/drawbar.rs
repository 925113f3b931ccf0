use std::f32::consts::TAU;

use crate::engine::envelope::{EnvCurve, EnvTimes, THREE_STAGE};
use crate::engine::modules::WaveformElement;
use crate::engine::params::EngineParams;
use crate::engine::voices::Voice;

/// Harmonic ratios of the nine drawbars against the fundamental: sub-octave
/// and sub-third, then the even footages up to the top octave.
const DRAWBAR_RATIOS: [f32; 9] = [0.5, 1.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0];

/// Drawbar organ element: each engaged stop contributes its ratio's sine at
/// stop/8 of full level, and the sum is divided by the number of engaged
/// stops so pulling more bars does not get louder.
pub struct DrawbarOrgan;

impl WaveformElement for DrawbarOrgan {
  fn curve(&self) -> &'static EnvCurve {
    &THREE_STAGE
  }

  fn times<'p>(&self, params: &'p EngineParams) -> &'p EnvTimes {
    &params.organ_env
  }

  fn generate(&self, voice: &mut Voice, params: &EngineParams, sample_rate: f32, out: &mut [f32]) {
    let inv_sr = 1.0 / sample_rate;
    let step = TAU * voice.pitch * inv_sr;
    let engaged = params.drawbars.iter().filter(|&&stop| stop > 0).count();
    let mut phase = voice.phase;
    for sample in out.iter_mut() {
      // the envelope keeps moving even with every stop pushed in, so a
      // released voice still decays to reapable silence
      let level = voice.adsr.advance(self.curve(), self.times(params), inv_sr);
      if engaged > 0 {
        let mut acc = 0.0f32;
        for (j, &stop) in params.drawbars.iter().enumerate() {
          if stop > 0 {
            acc += (stop as f32 / 8.0) * (phase * DRAWBAR_RATIOS[j]).sin();
          }
        }
        *sample += (acc / engaged as f32) * level;
      }
      phase += step;
      while phase >= TAU {
        phase -= TAU;
      }
    }
    voice.phase = phase;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::envelope::AdsrState;
  use crate::engine::params::ElementKind;

  fn voice_at(pitch: f32) -> Voice {
    Voice { note: 69, pitch, phase: 0.0, adsr: AdsrState::new(0.0) }
  }

  fn organ_params(drawbars: [u8; 9]) -> EngineParams {
    EngineParams { element: ElementKind::DrawbarOrgan, drawbars, ..EngineParams::default() }
  }

  #[test]
  fn all_stops_in_is_silence() {
    let params = organ_params([0; 9]);
    let mut voice = voice_at(440.0);
    let mut buf = vec![0.0f32; 256];
    DrawbarOrgan.generate(&mut voice, &params, 48000.0, &mut buf);
    assert!(buf.iter().all(|&s| s == 0.0));
    // the voice still ages toward reapability
    assert!(voice.adsr.level > 0.0);
  }

  #[test]
  fn engaging_more_stops_does_not_get_louder() {
    let one = {
      let params = organ_params([8, 0, 0, 0, 0, 0, 0, 0, 0]);
      let mut voice = voice_at(440.0);
      let mut buf = vec![0.0f32; 4096];
      DrawbarOrgan.generate(&mut voice, &params, 48000.0, &mut buf);
      buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    };
    let all = {
      let params = organ_params([8; 9]);
      let mut voice = voice_at(440.0);
      let mut buf = vec![0.0f32; 4096];
      DrawbarOrgan.generate(&mut voice, &params, 48000.0, &mut buf);
      buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    };
    assert!(all <= one * 1.5, "nine bars ({all}) much louder than one ({one})");
  }

  #[test]
  fn single_full_stop_is_a_pure_sine_of_its_ratio() {
    // only the 4' bar (ratio 2): the output must be sin(2 * phase) shaped
    let params = organ_params([0, 0, 0, 8, 0, 0, 0, 0, 0]);
    let mut voice = voice_at(100.0);
    voice.adsr.level = 1.0;
    voice.adsr.phase = crate::engine::envelope::EnvPhase::Sustain;
    let sr = 48000.0;
    let mut buf = vec![0.0f32; 64];
    DrawbarOrgan.generate(&mut voice, &params, sr, &mut buf);
    let step = TAU * 100.0 / sr;
    for (i, &s) in buf.iter().enumerate() {
      let expected = ((i as f32 * step) * 2.0).sin();
      assert!((s - expected).abs() < 1e-4, "sample {i}: {s} vs {expected}");
    }
  }

  #[test]
  fn leaves_existing_buffer_content_in_place() {
    // with every stop in, nothing is added, but nothing is erased either
    let params = organ_params([0; 9]);
    let mut voice = voice_at(440.0);
    let mut buf = vec![1.0f32; 16];
    DrawbarOrgan.generate(&mut voice, &params, 48000.0, &mut buf);
    assert!(buf.iter().all(|&s| s == 1.0));
  }
}
