/// Commands crossing the event thread -> render callback boundary. The
/// render side drains the whole queue at the start of each cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMsg {
  NoteOn { note: u8 },
  NoteOff { note: u8 },
  ControlChange { controller: u8, value: u8 },
  ProgramChange { value: u8 },
  PitchBend { value: i16 },
  StartRecording,
  StopRecording,
}

impl EngineMsg {
  /// Decode one raw MIDI message. Returns None for anything the engine does
  /// not consume (clock, aftertouch, sysex, truncated reads).
  pub fn from_midi(bytes: &[u8]) -> Option<Self> {
    let status = *bytes.first()?;
    match status & 0xF0 {
      0x90 if bytes.len() >= 3 => {
        // running-status note-on with velocity 0 is a note-off
        if bytes[2] > 0 {
          Some(EngineMsg::NoteOn { note: bytes[1] & 0x7F })
        } else {
          Some(EngineMsg::NoteOff { note: bytes[1] & 0x7F })
        }
      }
      0x80 if bytes.len() >= 3 => Some(EngineMsg::NoteOff { note: bytes[1] & 0x7F }),
      0xB0 if bytes.len() >= 3 => Some(EngineMsg::ControlChange {
        controller: bytes[1] & 0x7F,
        value: bytes[2] & 0x7F,
      }),
      0xC0 if bytes.len() >= 2 => Some(EngineMsg::ProgramChange { value: bytes[1] & 0x7F }),
      0xE0 if bytes.len() >= 3 => {
        // 14-bit little-endian, de-biased to a signed wheel position
        let raw = (((bytes[2] & 0x7F) as i16) << 7) | (bytes[1] & 0x7F) as i16;
        Some(EngineMsg::PitchBend { value: raw - 8192 })
      }
      _ => None,
    }
  }
}
