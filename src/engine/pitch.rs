use serde::Deserialize;

/// Wheel-curve selection. The asymmetric modes give the wheel a short reach
/// upward and a long dive downward, like a hardware wheel with uneven travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum WheelMode {
  Traditional,
  AsymmetricWide,
  AsymmetricExtreme,
}

impl WheelMode {
  // (up, down) reach in semitones at full wheel deflection
  fn spans(self) -> (f32, f32) {
    match self {
      WheelMode::Traditional => (2.0, 2.0),
      WheelMode::AsymmetricWide => (2.0, 12.0),
      WheelMode::AsymmetricExtreme => (2.0, 36.0),
    }
  }
}

/// Piecewise-linear wheel map. Each side of the wheel scales independently,
/// 8192 counts per side.
pub fn bend_semitones(bend: i16, mode: WheelMode) -> f32 {
  let (up, down) = mode.spans();
  if bend >= 0 {
    bend as f32 * (up / 8192.0)
  } else {
    bend as f32 * (down / 8192.0)
  }
}

/// Equal-tempered pitch for a MIDI note with the wheel applied.
pub fn note_to_hz(note: u8, bend: i16, mode: WheelMode) -> f32 {
  let n = note as f32 + bend_semitones(bend, mode);
  440.0 * (2.0_f32).powf((n - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  const MODES: [WheelMode; 3] = [
    WheelMode::Traditional,
    WheelMode::AsymmetricWide,
    WheelMode::AsymmetricExtreme,
  ];

  #[test]
  fn concert_a_is_440() {
    for mode in MODES {
      assert!((note_to_hz(69, 0, mode) - 440.0).abs() < 1e-3);
    }
  }

  #[test]
  fn matches_formula_for_all_notes() {
    for mode in MODES {
      for note in 0u8..=127 {
        for bend in [-8192i16, -1234, 0, 777, 8191] {
          let expected =
            440.0 * (2.0_f32).powf((note as f32 + bend_semitones(bend, mode) - 69.0) / 12.0);
          let got = note_to_hz(note, bend, mode);
          assert!((got - expected).abs() < expected * 1e-6, "note {note} bend {bend}");
          assert!(got > 0.0);
        }
      }
    }
  }

  #[test]
  fn strictly_increasing_in_note() {
    for mode in MODES {
      for bend in [-8192i16, 0, 8191] {
        for note in 0u8..127 {
          assert!(note_to_hz(note + 1, bend, mode) > note_to_hz(note, bend, mode));
        }
      }
    }
  }

  #[test]
  fn wheel_reach_per_mode() {
    // Full positive deflection is just shy of the span (8191 of 8192 counts).
    assert!((bend_semitones(8191, WheelMode::Traditional) - 2.0).abs() < 1e-3);
    assert!((bend_semitones(-8192, WheelMode::Traditional) + 2.0).abs() < 1e-6);
    assert!((bend_semitones(8191, WheelMode::AsymmetricWide) - 2.0).abs() < 1e-3);
    assert!((bend_semitones(-8192, WheelMode::AsymmetricWide) + 12.0).abs() < 1e-6);
    assert!((bend_semitones(-8192, WheelMode::AsymmetricExtreme) + 36.0).abs() < 1e-6);
  }

  #[test]
  fn asymmetric_modes_dive_further_than_they_climb() {
    for mode in [WheelMode::AsymmetricWide, WheelMode::AsymmetricExtreme] {
      assert!(bend_semitones(-8192, mode).abs() > bend_semitones(8191, mode).abs());
    }
  }
}
