//! The fixed binary contract effect modules are compiled against. Field
//! order and types are the external ABI; nothing here is ours to redesign.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_ulong, c_void};

/// Audio and control samples on the wire.
pub type PluginData = f32;

/// Opaque per-instance handle returned by `instantiate`.
pub type PluginHandle = *mut c_void;

/// Property bit: the unit cannot read and write the same buffer.
pub const PROPERTY_INPLACE_BROKEN: c_int = 0x4;

/// Exported entry point: index in, descriptor out, null past the end.
pub type DescriptorFn = unsafe extern "C" fn(c_ulong) -> *const PluginDescriptorRaw;

/// Symbol name of the descriptor entry point.
pub const DESCRIPTOR_SYMBOL: &[u8] = b"ladspa_descriptor\0";

#[repr(C)]
pub struct PortRangeHint {
  pub hint_descriptor: c_int,
  pub lower_bound: PluginData,
  pub upper_bound: PluginData,
}

#[repr(C)]
pub struct PluginDescriptorRaw {
  pub unique_id: c_ulong,
  pub label: *const c_char,
  pub properties: c_int,
  pub name: *const c_char,
  pub maker: *const c_char,
  pub copyright: *const c_char,
  pub port_count: c_ulong,
  pub port_descriptors: *const c_int,
  pub port_names: *const *const c_char,
  pub port_range_hints: *const PortRangeHint,
  pub implementation_data: *mut c_void,
  pub instantiate:
    Option<unsafe extern "C" fn(*const PluginDescriptorRaw, c_ulong) -> PluginHandle>,
  pub connect_port: Option<unsafe extern "C" fn(PluginHandle, c_ulong, *mut PluginData)>,
  pub activate: Option<unsafe extern "C" fn(PluginHandle)>,
  pub run: Option<unsafe extern "C" fn(PluginHandle, c_ulong)>,
  pub run_adding: Option<unsafe extern "C" fn(PluginHandle, c_ulong)>,
  pub set_run_adding_gain: Option<unsafe extern "C" fn(PluginHandle, PluginData)>,
  pub deactivate: Option<unsafe extern "C" fn(PluginHandle)>,
  pub cleanup: Option<unsafe extern "C" fn(PluginHandle)>,
}

impl PluginDescriptorRaw {
  pub fn inplace_broken(&self) -> bool {
    self.properties & PROPERTY_INPLACE_BROKEN != 0
  }

  /// Lossy view of the unit's display name.
  pub fn display_name(&self) -> String {
    if self.name.is_null() {
      return String::new();
    }
    unsafe { CStr::from_ptr(self.name) }.to_string_lossy().into_owned()
  }
}
