use super::envelope::AdsrState;
use super::modules;
use super::params::EngineParams;
use super::pitch;

/// Hard cap on simultaneous voices, matching the event source's key count
/// assumptions. A NoteOn past the cap is warned about and dropped.
pub const MAX_VOICES: usize = 16;

/// One sounding note: oscillator phase plus envelope state. Pitch is cached
/// here and refreshed once per render cycle from the wheel, not per sample.
#[derive(Clone, Debug)]
pub struct Voice {
  pub note: u8,
  pub pitch: f32,
  /// Fundamental phase in radians, kept in [0, 2*pi).
  pub phase: f32,
  pub adsr: AdsrState,
}

/// The voice pool: a slot array with free-list reuse. Iteration follows
/// note-on order so renders are deterministic no matter which slots got
/// recycled along the way.
pub struct VoiceManager {
  slots: Vec<Option<Voice>>,
  order: Vec<usize>,
  free: Vec<usize>,
}

impl VoiceManager {
  pub fn new() -> Self {
    Self {
      slots: (0..MAX_VOICES).map(|_| None).collect(),
      order: Vec::with_capacity(MAX_VOICES),
      free: (0..MAX_VOICES).rev().collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  fn find_slot(&self, note: u8) -> Option<usize> {
    self
      .order
      .iter()
      .copied()
      .find(|&i| self.slots[i].as_ref().map_or(false, |v| v.note == note))
  }

  /// Start a voice for `note`. A repeat NoteOn for a note that still has a
  /// live voice is ignored, unless legato is on, in which case that voice is
  /// retriggered in place with its level kept. A fresh legato voice over a
  /// still-sounding pool picks up the loudest live level so the handover has
  /// no step.
  pub fn note_on(&mut self, note: u8, params: &EngineParams) {
    if let Some(i) = self.find_slot(note) {
      if params.legato {
        if let Some(v) = self.slots[i].as_mut() {
          v.adsr.retrigger();
        }
      }
      return;
    }
    let Some(slot) = self.free.pop() else {
      log::warn!("too many notes held, ignoring noteon");
      return;
    };
    let level = if params.legato && !self.order.is_empty() {
      self
        .order
        .iter()
        .filter_map(|&i| self.slots[i].as_ref())
        .map(|v| v.adsr.level)
        .fold(0.0, f32::max)
    } else {
      0.0
    };
    self.slots[slot] = Some(Voice {
      note,
      pitch: pitch::note_to_hz(note, params.pitch_bend, params.wheel_mode),
      phase: 0.0,
      adsr: AdsrState::new(level),
    });
    self.order.push(slot);
  }

  /// Put the matching voice into release. It keeps sounding (and occupying
  /// its slot) until the envelope has fully decayed.
  pub fn note_off(&mut self, note: u8) {
    if let Some(i) = self.find_slot(note) {
      if let Some(v) = self.slots[i].as_mut() {
        v.adsr.note_off();
      }
    }
  }

  /// Drop every fully released voice. Called once per cycle, before
  /// generation.
  pub fn reap(&mut self) {
    let slots = &mut self.slots;
    let free = &mut self.free;
    self.order.retain(|&i| {
      let done = slots[i].as_ref().map_or(true, |v| v.adsr.finished());
      if done {
        slots[i] = None;
        free.push(i);
      }
      !done
    });
  }

  /// Refresh each voice's cached pitch from the wheel, once per cycle.
  pub fn update_pitches(&mut self, params: &EngineParams) {
    for &i in &self.order {
      if let Some(v) = self.slots[i].as_mut() {
        v.pitch = pitch::note_to_hz(v.note, params.pitch_bend, params.wheel_mode);
      }
    }
  }

  /// Zero `out`, then accumulate every live voice through the active
  /// element.
  pub fn render_all(&mut self, params: &EngineParams, sample_rate: f32, out: &mut [f32]) {
    out.fill(0.0);
    let element = modules::element(params.element);
    for &i in &self.order {
      if let Some(v) = self.slots[i].as_mut() {
        element.generate(v, params, sample_rate, out);
      }
    }
  }

  /// Live voices in note-on order.
  pub fn voices(&self) -> impl ExactSizeIterator<Item = &Voice> + '_ {
    // Every index in `order` references a live (`Some`) slot: `reap` is the
    // only thing that clears a slot and it drops the index at the same time.
    self
      .order
      .iter()
      .map(move |&i| self.slots[i].as_ref().expect("order references a live slot"))
  }
}
