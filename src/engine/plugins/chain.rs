use std::mem;
use std::os::raw::c_ulong;

use serde::Deserialize;

use super::api::{PluginData, PluginDescriptorRaw, PluginHandle};
use super::loader::PluginRegistry;

/// One entry of the chain wiring table: which unit, where its audio ports
/// are, and fixed values for its control ports.
#[derive(Clone, Debug, Deserialize)]
pub struct StageConfig {
  pub unique_id: u64,
  pub input_port: u64,
  pub output_port: u64,
  #[serde(default)]
  pub controls: Vec<ControlValue>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ControlValue {
  pub port: u64,
  pub value: f32,
}

/// One instantiated, activated unit in the chain.
pub struct PluginInstance {
  desc: *const PluginDescriptorRaw,
  handle: PluginHandle,
  pub unique_id: u64,
  pub name: String,
  pub input_port: u64,
  pub output_port: u64,
  pub inplace_broken: bool,
  // Control cells live on the heap so the addresses handed to the module
  // stay put when the instance moves into the chain.
  controls: Box<[ControlValue]>,
}

// Instances only touch descriptor memory owned by the registry, which
// travels to the render thread alongside the chain and outlives it.
unsafe impl Send for PluginInstance {}

impl PluginInstance {
  fn connect_audio(&mut self, input: *mut PluginData, output: *mut PluginData) {
    let d = unsafe { &*self.desc };
    if let Some(connect) = d.connect_port {
      unsafe {
        connect(self.handle, self.input_port as c_ulong, input);
        connect(self.handle, self.output_port as c_ulong, output);
      }
    }
  }

  fn run(&mut self, frames: usize) {
    let d = unsafe { &*self.desc };
    if let Some(run) = d.run {
      unsafe { run(self.handle, frames as c_ulong) }
    }
  }
}

impl Drop for PluginInstance {
  fn drop(&mut self) {
    let d = unsafe { &*self.desc };
    unsafe {
      if let Some(deactivate) = d.deactivate {
        deactivate(self.handle);
      }
      if let Some(cleanup) = d.cleanup {
        cleanup(self.handle);
      }
    }
  }
}

/// The ordered effect chain. Order is fixed once built; execution follows
/// the two-buffer role-swap protocol so no stage ever aliases its input and
/// output unless it declared that safe.
pub struct EffectChain {
  stages: Vec<PluginInstance>,
}

impl EffectChain {
  /// Instantiate, wire and activate one stage per table entry. A unit that
  /// is missing from the registry or refuses to instantiate is skipped with
  /// a warning; the chain just runs shorter. Never a hard failure.
  pub fn build(registry: &PluginRegistry, wiring: &[StageConfig], sample_rate: u32) -> Self {
    let mut stages = Vec::with_capacity(wiring.len());
    for cfg in wiring {
      let Some(record) = registry.find(cfg.unique_id) else {
        log::warn!("couldn't select plugin {}", cfg.unique_id);
        continue;
      };
      let d = unsafe { &*record.desc };
      let Some(instantiate) = d.instantiate else {
        log::warn!("plugin {} has no constructor", cfg.unique_id);
        continue;
      };
      let handle = unsafe { instantiate(record.desc, sample_rate as c_ulong) };
      if handle.is_null() {
        log::warn!("failed to instantiate plugin {}", cfg.unique_id);
        continue;
      }
      let mut instance = PluginInstance {
        desc: record.desc,
        handle,
        unique_id: record.unique_id,
        name: record.name.clone(),
        input_port: cfg.input_port,
        output_port: cfg.output_port,
        inplace_broken: record.inplace_broken,
        controls: cfg.controls.clone().into_boxed_slice(),
      };
      // control ports keep their cell addresses for the instance lifetime
      if let Some(connect) = d.connect_port {
        for control in instance.controls.iter_mut() {
          unsafe { connect(instance.handle, control.port as c_ulong, &mut control.value) };
        }
      }
      if let Some(activate) = d.activate {
        unsafe { activate(instance.handle) };
      }
      stages.push(instance);
    }
    log::info!("prepared plugin chain with {} stage(s)", stages.len());
    Self { stages }
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Run the chain over `frames` samples. `samples` holds the current audio
  /// on entry and the chain output on return; `backburner` is same-length
  /// scratch. A stage that cannot process in place gets the buffer roles
  /// swapped under it, so it reads the previous stage's output from
  /// `backburner` while writing fresh `samples`; its two ports never share
  /// memory. An in-place-capable stage reads and writes `samples` directly,
  /// skipping the copy.
  pub fn run(&mut self, samples: &mut Vec<f32>, backburner: &mut Vec<f32>, frames: usize) {
    debug_assert!(samples.len() >= frames && backburner.len() >= frames);
    for stage in &mut self.stages {
      if stage.inplace_broken {
        mem::swap(samples, backburner);
        stage.connect_audio(backburner.as_mut_ptr(), samples.as_mut_ptr());
      } else {
        stage.connect_audio(samples.as_mut_ptr(), samples.as_mut_ptr());
      }
      stage.run(frames);
    }
  }
}
