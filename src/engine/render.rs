use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use super::config::EngineConfig;
use super::control;
use super::messages::EngineMsg;
use super::params::{ElementKind, EngineParams};
use super::plugins::chain::EffectChain;
use super::plugins::loader::PluginRegistry;
use super::voices::{Voice, VoiceManager};

/// Wall-clock budget for one buffer of work. Overruns are logged and
/// nothing else: the next cycle proceeds, accepting a possible glitch.
pub struct DeadlineMonitor {
  sample_rate: f32,
}

impl DeadlineMonitor {
  pub fn new(sample_rate: f32) -> Self {
    Self { sample_rate }
  }

  pub fn budget_us(&self, frames: usize) -> u64 {
    frames as u64 * 1_000_000 / self.sample_rate as u64
  }

  pub fn check(&self, frames: usize, started: Instant) {
    let elapsed = started.elapsed().as_micros() as u64;
    let budget = self.budget_us(frames);
    if elapsed > budget {
      log::warn!("long frame: {} usec (budget {})", elapsed, budget);
    }
  }
}

/// Everything the render callback owns: knobs, voices, chain, buffers.
/// Built on the control thread, moved into the audio callback whole; the
/// only ways in afterwards are the command queue and the idle flag.
pub struct RenderEngine {
  sample_rate: f32,
  params: EngineParams,
  voices: VoiceManager,
  // chain before registry: stages must drop before their modules unload
  chain: EffectChain,
  registry: PluginRegistry,
  samples: Vec<f32>,
  backburner: Vec<f32>,
  rx: Receiver<EngineMsg>,
  idle: Arc<AtomicBool>,
  deadline: DeadlineMonitor,
  recording: bool,
  recorded: Vec<f32>,
  rec_tx: Sender<Vec<f32>>,
}

impl RenderEngine {
  pub fn new(
    config: &EngineConfig,
    sample_rate: f32,
    rx: Receiver<EngineMsg>,
    idle: Arc<AtomicBool>,
    rec_tx: Sender<Vec<f32>>,
  ) -> Self {
    let mut registry = PluginRegistry::new();
    for module in &config.modules {
      registry.open_module(Path::new(module));
    }
    let chain = EffectChain::build(&registry, &config.chain, sample_rate as u32);
    Self {
      sample_rate,
      params: config.params(),
      voices: VoiceManager::new(),
      chain,
      registry,
      samples: Vec::new(),
      backburner: Vec::new(),
      rx,
      idle,
      deadline: DeadlineMonitor::new(sample_rate),
      recording: false,
      recorded: Vec::new(),
      rec_tx,
    }
  }

  /// One buffer's worth of work: drain the queue, reap, render all voices,
  /// run the chain, convert to the sink's 16-bit format with hard clipping.
  pub fn render(&mut self, out: &mut [i16]) {
    let started = Instant::now();
    let frames = out.len();

    self.drain_commands();
    self.voices.reap();

    if self.samples.len() != frames {
      self.samples.resize(frames, 0.0);
      self.backburner.resize(frames, 0.0);
    }
    self.voices.update_pitches(&self.params);
    self.voices.render_all(&self.params, self.sample_rate, &mut self.samples);
    self.chain.run(&mut self.samples, &mut self.backburner, frames);

    let gain = self.params.master_volume;
    for (dst, &s) in out.iter_mut().zip(self.samples.iter()) {
      let v = s * gain * 32767.0;
      *dst = v.clamp(-32768.0, 32767.0) as i16;
    }
    if self.recording {
      self.recorded.extend(self.samples.iter().map(|&s| (s * gain).clamp(-1.0, 1.0)));
    }

    self.idle.store(self.voices.is_empty(), Ordering::Release);
    self.deadline.check(frames, started);
  }

  // The whole queue goes before any audio work; nothing applies mid-cycle.
  fn drain_commands(&mut self) {
    while let Ok(msg) = self.rx.try_recv() {
      self.apply(msg);
    }
  }

  fn apply(&mut self, msg: EngineMsg) {
    match msg {
      EngineMsg::NoteOn { note } => self.voices.note_on(note & 0x7F, &self.params),
      EngineMsg::NoteOff { note } => self.voices.note_off(note & 0x7F),
      // controller 80 is the capture switch; the rest move knobs
      EngineMsg::ControlChange { controller: 80, value } => {
        if value >= 64 {
          self.start_recording();
        } else {
          self.stop_recording();
        }
      }
      EngineMsg::ControlChange { controller, value } => {
        control::apply_control(&mut self.params, controller, value)
      }
      EngineMsg::ProgramChange { value } => match value {
        0 => self.params.element = ElementKind::Additive,
        1 => self.params.element = ElementKind::DrawbarOrgan,
        other => log::warn!("ignoring program change {}", other),
      },
      EngineMsg::PitchBend { value } => self.params.pitch_bend = value.clamp(-8192, 8191),
      EngineMsg::StartRecording => self.start_recording(),
      EngineMsg::StopRecording => self.stop_recording(),
    }
  }

  fn start_recording(&mut self) {
    self.recording = true;
    self.recorded.clear();
  }

  fn stop_recording(&mut self) {
    if !self.recording {
      return;
    }
    self.recording = false;
    if !self.recorded.is_empty() {
      // hand the capture to the control side; writing a file here would
      // block the cycle
      let _ = self.rec_tx.try_send(std::mem::take(&mut self.recorded));
    }
  }

  pub fn params(&self) -> &EngineParams {
    &self.params
  }

  pub fn voices(&self) -> impl ExactSizeIterator<Item = &Voice> + '_ {
    self.voices.voices()
  }

  pub fn chain_len(&self) -> usize {
    self.chain.len()
  }

  pub fn registry(&self) -> &PluginRegistry {
    &self.registry
  }

  pub fn sample_rate(&self) -> f32 {
    self.sample_rate
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn budget_for_a_512_frame_buffer_at_48k() {
    let monitor = DeadlineMonitor::new(48000.0);
    assert_eq!(monitor.budget_us(512), 10666);
    assert_eq!(monitor.budget_us(1024), 21333);
  }

  #[test]
  fn budget_scales_with_rate() {
    let monitor = DeadlineMonitor::new(44100.0);
    assert_eq!(monitor.budget_us(441), 10000);
  }
}
