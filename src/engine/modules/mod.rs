pub mod additive;
pub mod drawbar;

use super::envelope::{EnvCurve, EnvTimes};
use super::params::{ElementKind, EngineParams};
use super::voices::Voice;

/// A tone-generation strategy. Implementations accumulate into the shared
/// voice-sum buffer (never overwrite: several voices share one buffer per
/// cycle) and advance the voice's envelope one sample at a time.
pub trait WaveformElement {
  /// The envelope transition table this element drives its voices with.
  fn curve(&self) -> &'static EnvCurve;
  /// This element's stage durations out of the knob set.
  fn times<'p>(&self, params: &'p EngineParams) -> &'p EnvTimes;
  fn generate(&self, voice: &mut Voice, params: &EngineParams, sample_rate: f32, out: &mut [f32]);
}

static ADDITIVE: additive::Additive = additive::Additive;
static DRAWBAR: drawbar::DrawbarOrgan = drawbar::DrawbarOrgan;

/// Look up the single active element for this cycle.
pub fn element(kind: ElementKind) -> &'static dyn WaveformElement {
  match kind {
    ElementKind::Additive => &ADDITIVE,
    ElementKind::DrawbarOrgan => &DRAWBAR,
  }
}
