use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use midir::{Ignore, MidiInput};

use calliope::engine::audio::{save_capture, AudioEngine};
use calliope::engine::config::EngineConfig;
use calliope::engine::messages::EngineMsg;

#[derive(Parser)]
#[command(name = "calliope", about = "Polyphonic additive/drawbar synthesizer")]
struct Cli {
  /// JSON engine configuration; built-in defaults are used when absent.
  #[arg(long)]
  config: Option<PathBuf>,

  /// MIDI input port index (see --list-ports).
  #[arg(long, default_value_t = 0)]
  port: usize,

  /// List MIDI input ports and exit.
  #[arg(long)]
  list_ports: bool,
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_target(false).init();
  tracing_log::LogTracer::init().ok();

  let cli = Cli::parse();

  if cli.list_ports {
    let input = MidiInput::new("calliope").map_err(|e| anyhow::anyhow!("{e}"))?;
    for (i, port) in input.ports().iter().enumerate() {
      println!("{}: {}", i, input.port_name(port).unwrap_or_default());
    }
    return Ok(());
  }

  let config = match &cli.config {
    Some(path) => EngineConfig::load(path)?,
    None => EngineConfig::default(),
  };

  // Both acquisitions below are the setup-fatal path: no sink or no event
  // source means there is nothing to run.
  let mut audio = AudioEngine::new(config);
  audio.start().context("audio sink setup")?;
  let tx = audio.sender();

  // Raw MIDI bytes hop from the midir callback to the polling loop over a
  // plain channel; the callback itself stays tiny.
  let (midi_tx, midi_rx) = mpsc::channel::<Vec<u8>>();
  let mut input = MidiInput::new("calliope").map_err(|e| anyhow::anyhow!("{e}"))?;
  input.ignore(Ignore::All);
  let ports = input.ports();
  let port = ports.get(cli.port).context("no such MIDI input port")?;
  let port_name = input.port_name(port).unwrap_or_else(|_| "unknown".into());
  let _connection = input
    .connect(
      port,
      "calliope-in",
      move |_stamp, bytes, _: &mut ()| {
        let _ = midi_tx.send(bytes.to_vec());
      },
      (),
    )
    .map_err(|e| anyhow::anyhow!("couldn't connect to {port_name}: {e}"))?;
  log::info!("listening on {port_name}");

  // Any line (or EOF) on stdin ends the session.
  let quit = Arc::new(AtomicBool::new(false));
  {
    let quit = quit.clone();
    thread::spawn(move || {
      let mut line = String::new();
      let _ = std::io::stdin().read_line(&mut line);
      quit.store(true, Ordering::Release);
    });
  }
  println!("press enter to quit");

  // One event per iteration, then the quit check.
  while !quit.load(Ordering::Acquire) {
    if let Ok(bytes) = midi_rx.recv_timeout(Duration::from_millis(2)) {
      match EngineMsg::from_midi(&bytes) {
        Some(msg) => {
          if matches!(msg, EngineMsg::NoteOn { .. }) {
            audio.resume();
          }
          if tx.try_send(msg).is_err() {
            log::warn!("command queue full, dropping event");
          }
        }
        None => log::warn!("ignoring event {:02x?}", bytes),
      }
    }
    if let Some(samples) = audio.poll_recording() {
      if let Err(e) = save_capture(&samples, audio.sample_rate) {
        log::warn!("couldn't save capture: {e}");
      }
    }
    audio.pause_if_idle();
  }

  audio.stop();
  Ok(())
}
