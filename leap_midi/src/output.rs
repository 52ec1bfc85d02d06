//! MIDI output through `midir`.
//!
//! [`open_output`] enumerates the system's output ports and picks one: the
//! first whose name contains the requested text (case-insensitive), else the
//! first port available.  With no ports, or when the connection fails, it
//! falls back to a [`NullSink`] with a warning so the controller still runs.

use midir::{MidiOutput, MidiOutputConnection};
use tracing::{info, warn};

use gesture_midi::{MidiMessage, MidiSink, NullSink, SendError};

const CLIENT_NAME: &str = "leap_midi";

// ════════════════════════════════════════════════════════════════════════════
// MidirSink
// ════════════════════════════════════════════════════════════════════════════

pub struct MidirSink {
    conn: MidiOutputConnection,
    port: String,
}

impl MidirSink {
    pub fn port_name(&self) -> &str { &self.port }
}

impl MidiSink for MidirSink {
    fn send(&mut self, msg: &MidiMessage) -> Result<(), SendError> {
        self.conn.send(&msg.to_bytes())
            .map_err(|e| SendError::Rejected(e.to_string()))
    }

    fn name(&self) -> &str { &self.port }
}

// ════════════════════════════════════════════════════════════════════════════
// Port selection
// ════════════════════════════════════════════════════════════════════════════

/// Index of the port to open: the first name containing `wanted`, otherwise
/// the first port.  `None` when there are no ports.
pub fn choose_port(names: &[String], wanted: Option<&str>) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let Some(wanted) = wanted.map(str::to_lowercase) else { return Some(0) };
    match names.iter().position(|n| n.to_lowercase().contains(&wanted)) {
        Some(i) => Some(i),
        None => {
            warn!(wanted = %wanted, "no MIDI port matches, using first port");
            Some(0)
        }
    }
}

/// Names of every MIDI output port currently visible.
pub fn list_ports() -> Vec<String> {
    let Ok(out) = MidiOutput::new(CLIENT_NAME) else { return Vec::new() };
    out.ports().iter()
        .map(|p| out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect()
}

/// Open the preferred output port, or a null sink if none can be opened.
pub fn open_output(wanted: Option<&str>) -> Box<dyn MidiSink> {
    let out = match MidiOutput::new(CLIENT_NAME) {
        Ok(m)  => m,
        Err(e) => {
            warn!(error = %e, "MIDI init failed, using null output");
            return Box::new(NullSink);
        }
    };

    let ports = out.ports();
    let names: Vec<String> = ports.iter()
        .map(|p| out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();

    let Some(idx) = choose_port(&names, wanted) else {
        warn!("no MIDI output ports found, using null output");
        return Box::new(NullSink);
    };

    let port = names[idx].clone();
    info!(%port, "opening MIDI port");
    match out.connect(&ports[idx], CLIENT_NAME) {
        Ok(conn) => Box::new(MidirSink { conn, port }),
        Err(e) => {
            warn!(%port, error = %e, "MIDI connect failed, using null output");
            Box::new(NullSink)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
