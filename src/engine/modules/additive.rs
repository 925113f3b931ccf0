use std::f32::consts::{PI, TAU};

use crate::engine::envelope::{EnvCurve, EnvTimes, FOUR_STAGE};
use crate::engine::modules::WaveformElement;
use crate::engine::params::EngineParams;
use crate::engine::voices::Voice;

/// Hard ceiling on the harmonic series, whatever the pitch.
const MAX_HARMONICS: usize = 129;

/// Number of partials for a pitch at a given rate: everything below a third
/// of the sample rate, capped, and forced to the odd value just under it
/// when even (an even count introduces audible artifacts).
pub fn harmonic_count(sample_rate: f32, pitch: f32) -> usize {
  let n = ((sample_rate / (3.0 * pitch)) as usize).min(MAX_HARMONICS);
  if n == 0 {
    1
  } else if n % 2 == 0 {
    n - 1
  } else {
    n
  }
}

/// Band-limited additive element: partials k = 1..N at amplitude 1/k and
/// phase k*theta, a sawtooth-flavored tone with no energy past a third of
/// the sample rate.
pub struct Additive;

impl WaveformElement for Additive {
  fn curve(&self) -> &'static EnvCurve {
    &FOUR_STAGE
  }

  fn times<'p>(&self, params: &'p EngineParams) -> &'p EnvTimes {
    &params.additive_env
  }

  fn generate(&self, voice: &mut Voice, params: &EngineParams, sample_rate: f32, out: &mut [f32]) {
    let inv_sr = 1.0 / sample_rate;
    let step = TAU * voice.pitch * inv_sr;
    let n = harmonic_count(sample_rate, voice.pitch);
    // 2/pi puts the full sawtooth partial sum inside [-1, 1]
    let norm = 2.0 / PI;
    let mut phase = voice.phase;
    for sample in out.iter_mut() {
      let level = voice.adsr.advance(self.curve(), self.times(params), inv_sr);
      let mut acc = 0.0f32;
      for k in 1..=n {
        acc += (phase * k as f32).sin() / k as f32;
      }
      *sample += acc * norm * level;
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

  fn voice_at(pitch: f32) -> Voice {
    Voice { note: 69, pitch, phase: 0.0, adsr: AdsrState::new(0.0) }
  }

  #[test]
  fn harmonic_count_for_concert_a_at_48k() {
    // floor(48000 / (3 * 440)) = 36, forced odd
    assert_eq!(harmonic_count(48000.0, 440.0), 35);
  }

  #[test]
  fn harmonic_count_caps_at_129_for_low_pitches() {
    assert_eq!(harmonic_count(48000.0, 55.0), 129);
    assert_eq!(harmonic_count(48000.0, 20.0), 129);
  }

  #[test]
  fn harmonic_count_is_odd_unless_capped() {
    for sr in [44100.0f32, 48000.0] {
      for note in 0u8..=127 {
        let pitch = 440.0 * (2.0_f32).powf((note as f32 - 69.0) / 12.0);
        let n = harmonic_count(sr, pitch);
        assert!(n == MAX_HARMONICS || n % 2 == 1, "sr {sr} pitch {pitch} gave {n}");
        assert!(n >= 1);
      }
    }
  }

  #[test]
  fn phase_step_matches_the_fundamental() {
    let mut voice = voice_at(440.0);
    let mut buf = [0.0f32; 512];
    let params = EngineParams::default();
    Additive.generate(&mut voice, &params, 48000.0, &mut buf);
    let step = TAU * 440.0 / 48000.0;
    assert!((step - 0.05760).abs() < 1e-4);
    let expected = (512.0 * step) % TAU;
    assert!((voice.phase - expected).abs() < 1e-2, "phase {} vs {}", voice.phase, expected);
    assert!(voice.phase >= 0.0 && voice.phase < TAU);
  }

  #[test]
  fn accumulates_instead_of_overwriting() {
    let params = EngineParams::default();
    let mut a = voice_at(440.0);
    let mut buf = vec![0.0f32; 64];
    Additive.generate(&mut a, &params, 48000.0, &mut buf);
    let solo = buf.clone();
    // a second identical voice doubles the contribution
    let mut b = voice_at(440.0);
    Additive.generate(&mut b, &params, 48000.0, &mut buf);
    for (i, (&one, &two)) in solo.iter().zip(buf.iter()).enumerate() {
      assert!((two - 2.0 * one).abs() < 1e-5, "sample {i}");
    }
  }

  #[test]
  fn envelope_advances_while_generating() {
    let params = EngineParams::default();
    let mut voice = voice_at(440.0);
    let mut buf = vec![0.0f32; 256];
    Additive.generate(&mut voice, &params, 48000.0, &mut buf);
    assert!(voice.adsr.level > 0.0);
  }
}
