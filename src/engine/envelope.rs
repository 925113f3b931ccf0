use serde::Deserialize;

/// Amplitude envelope phase of one voice. Transitions are monotonic except
/// for the legato retrigger back to Attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvPhase {
  Attack,
  Decay,
  Sustain,
  Release,
}

/// Shape constants for one element's envelope. The two elements drive their
/// voices with structurally different curves and that difference is kept.
#[derive(Clone, Copy, Debug)]
pub struct EnvCurve {
  pub peak: f32,
  /// Decay target. `None` skips the decay stage entirely; attack lands
  /// straight on sustain at the peak.
  pub sustain: Option<f32>,
  /// Numerator of the release slope.
  pub release_target: f32,
}

/// Four-stage curve used by the additive element.
pub const FOUR_STAGE: EnvCurve = EnvCurve {
  peak: 1.0,
  sustain: Some(0.75),
  release_target: 0.75,
};

/// Three-stage curve used by the drawbar organ element; no decay stage.
pub const THREE_STAGE: EnvCurve = EnvCurve {
  peak: 1.0,
  sustain: None,
  release_target: 1.0,
};

/// Stage durations in seconds. Decay is ignored by the three-stage curve.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct EnvTimes {
  pub attack: f32,
  pub decay: f32,
  pub release: f32,
}

// Floor for configured durations so slopes stay finite.
const MIN_SECONDS: f32 = 1.0e-4;

/// Per-voice envelope state, advanced one sample at a time by the active
/// waveform element.
#[derive(Clone, Copy, Debug)]
pub struct AdsrState {
  pub phase: EnvPhase,
  pub level: f32,
}

impl AdsrState {
  pub fn new(level: f32) -> Self {
    Self { phase: EnvPhase::Attack, level: level.clamp(0.0, 1.0) }
  }

  /// NoteOff: release from wherever the level is now, no re-attack.
  pub fn note_off(&mut self) {
    self.phase = EnvPhase::Release;
  }

  /// Legato retrigger: back to Attack with the level kept.
  pub fn retrigger(&mut self) {
    self.phase = EnvPhase::Attack;
  }

  /// A fully released voice is eligible for reaping.
  pub fn finished(&self) -> bool {
    self.phase == EnvPhase::Release && self.level == 0.0
  }

  /// Advance one sample and return the new level. Level stays in [0, 1].
  pub fn advance(&mut self, curve: &EnvCurve, times: &EnvTimes, inv_sample_rate: f32) -> f32 {
    match self.phase {
      EnvPhase::Attack => {
        self.level += inv_sample_rate / times.attack.max(MIN_SECONDS);
        if self.level >= curve.peak {
          self.level = curve.peak;
          self.phase = if curve.sustain.is_some() { EnvPhase::Decay } else { EnvPhase::Sustain };
        }
      }
      EnvPhase::Decay => {
        let sustain = curve.sustain.unwrap_or(curve.peak);
        self.level -= (curve.peak - sustain) * inv_sample_rate / times.decay.max(MIN_SECONDS);
        if self.level <= sustain {
          self.level = sustain;
          self.phase = EnvPhase::Sustain;
        }
      }
      EnvPhase::Sustain => {}
      EnvPhase::Release => {
        self.level -= curve.release_target * inv_sample_rate / times.release.max(MIN_SECONDS);
        if self.level <= 0.0 {
          self.level = 0.0;
        }
      }
    }
    self.level
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // sr 1000 with 10 ms stages makes every stage about 10 samples long
  const TIMES: EnvTimes = EnvTimes { attack: 0.01, decay: 0.01, release: 0.01 };
  const INV_SR: f32 = 1.0 / 1000.0;

  fn run(adsr: &mut AdsrState, curve: &EnvCurve, samples: usize) {
    for _ in 0..samples {
      let level = adsr.advance(curve, &TIMES, INV_SR);
      assert!((0.0..=1.0).contains(&level), "level {level} out of bounds");
    }
  }

  // advance until the envelope reaches `phase`, returning the step count
  fn run_until(adsr: &mut AdsrState, curve: &EnvCurve, phase: EnvPhase) -> usize {
    for step in 1..=1000 {
      let level = adsr.advance(curve, &TIMES, INV_SR);
      assert!((0.0..=1.0).contains(&level), "level {level} out of bounds");
      if adsr.phase == phase {
        return step;
      }
    }
    panic!("never reached {phase:?}");
  }

  #[test]
  fn four_stage_walks_attack_decay_sustain() {
    let mut adsr = AdsrState::new(0.0);
    let attack = run_until(&mut adsr, &FOUR_STAGE, EnvPhase::Decay);
    assert!((9..=11).contains(&attack), "attack took {attack} steps");
    assert_eq!(adsr.level, 1.0, "attack clamps exactly to the peak");
    let decay = run_until(&mut adsr, &FOUR_STAGE, EnvPhase::Sustain);
    assert!((9..=11).contains(&decay), "decay took {decay} steps");
    assert_eq!(adsr.level, 0.75, "decay clamps exactly to the sustain level");
    // sustain holds
    run(&mut adsr, &FOUR_STAGE, 50);
    assert_eq!(adsr.level, 0.75);
    assert_eq!(adsr.phase, EnvPhase::Sustain);
  }

  #[test]
  fn three_stage_skips_decay() {
    let mut adsr = AdsrState::new(0.0);
    let attack = run_until(&mut adsr, &THREE_STAGE, EnvPhase::Sustain);
    assert!((9..=11).contains(&attack), "attack took {attack} steps");
    assert_eq!(adsr.level, 1.0);
  }

  #[test]
  fn release_reaches_zero_and_clamps() {
    let mut adsr = AdsrState::new(0.0);
    run_until(&mut adsr, &THREE_STAGE, EnvPhase::Sustain);
    adsr.note_off();
    assert_eq!(adsr.phase, EnvPhase::Release);
    run(&mut adsr, &THREE_STAGE, 12);
    assert_eq!(adsr.level, 0.0);
    assert!(adsr.finished());
    // further advances stay put
    run(&mut adsr, &THREE_STAGE, 5);
    assert_eq!(adsr.level, 0.0);
  }

  #[test]
  fn note_off_mid_attack_releases_from_current_level() {
    let mut adsr = AdsrState::new(0.0);
    run(&mut adsr, &FOUR_STAGE, 5);
    let level = adsr.level;
    assert!(level > 0.0 && level < 1.0);
    adsr.note_off();
    let after = adsr.advance(&FOUR_STAGE, &TIMES, INV_SR);
    assert!(after < level, "release must fall from the held level");
    assert!(after > 0.0);
  }

  #[test]
  fn retrigger_keeps_level() {
    let mut adsr = AdsrState::new(0.0);
    run(&mut adsr, &FOUR_STAGE, 8);
    adsr.note_off();
    run(&mut adsr, &FOUR_STAGE, 3);
    let level = adsr.level;
    assert!(level > 0.0);
    adsr.retrigger();
    assert_eq!(adsr.phase, EnvPhase::Attack);
    assert_eq!(adsr.level, level);
  }

  #[test]
  fn level_never_negative_over_full_lifetime() {
    let mut adsr = AdsrState::new(0.0);
    adsr.note_off();
    for _ in 0..100 {
      assert!(adsr.advance(&FOUR_STAGE, &TIMES, INV_SR) >= 0.0);
    }
  }
}
