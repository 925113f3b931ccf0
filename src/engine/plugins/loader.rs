use std::path::Path;

use libloading::Library;

use super::api::{DescriptorFn, PluginDescriptorRaw, DESCRIPTOR_SYMBOL};

/// One discovered processing unit, read-only for the process lifetime.
pub struct PluginRecord {
  pub unique_id: u64,
  pub name: String,
  pub inplace_broken: bool,
  pub(crate) desc: *const PluginDescriptorRaw,
}

/// Loaded effect modules plus every descriptor they export, keyed by unique
/// ID. Descriptors borrow from the libraries, so the libraries stay here
/// for the registry's whole lifetime and unload last.
pub struct PluginRegistry {
  records: Vec<PluginRecord>,
  libraries: Vec<Library>,
}

// Descriptor pointers are only dereferenced while the owning Library sits
// in `libraries`; the registry moves to the render thread as one unit.
unsafe impl Send for PluginRegistry {}

impl PluginRegistry {
  pub fn new() -> Self {
    Self { records: Vec::new(), libraries: Vec::new() }
  }

  /// Load one module and stash everything it describes. A module that
  /// fails to load, or that exports no descriptor entry point, is warned
  /// about and skipped; the registry just stays smaller.
  pub fn open_module(&mut self, path: &Path) {
    let library = match unsafe { Library::new(path) } {
      Ok(library) => library,
      Err(e) => {
        log::warn!("couldn't load plugin {}: {}", path.display(), e);
        return;
      }
    };
    let descriptor_fn: DescriptorFn = match unsafe { library.get::<DescriptorFn>(DESCRIPTOR_SYMBOL) } {
      Ok(symbol) => *symbol,
      Err(e) => {
        log::warn!("couldn't describe plugin {}: {}", path.display(), e);
        return;
      }
    };
    let mut index: u64 = 0;
    loop {
      let desc = unsafe { descriptor_fn(index as _) };
      if desc.is_null() {
        break;
      }
      self.insert(desc);
      index += 1;
    }
    self.libraries.push(library);
  }

  /// Register one descriptor directly. The caller guarantees the memory
  /// behind `desc` outlives the registry; `open_module` satisfies that by
  /// keeping the library loaded.
  pub(crate) fn insert(&mut self, desc: *const PluginDescriptorRaw) {
    let d = unsafe { &*desc };
    let record = PluginRecord {
      unique_id: d.unique_id as u64,
      name: d.display_name(),
      inplace_broken: d.inplace_broken(),
      desc,
    };
    log::info!("loaded plugin {} ({})", record.name, record.unique_id);
    self.records.push(record);
  }

  pub fn find(&self, unique_id: u64) -> Option<&PluginRecord> {
    self.records.iter().find(|r| r.unique_id == unique_id)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
