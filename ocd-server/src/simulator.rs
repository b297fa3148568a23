//! # Target Simulator
//!
//! A [`DebugServer`] backend that behaves like a debug server attached to a target whose
//! firmware carries the semihosting test interface:
//!
//! - after `reset run` with semihosting enabled, the firmware announces the address of its
//!   comm byte (`` `comm=<hex> ``) and stops at a breakpoint
//! - writing a command byte to that address with `mwb` makes the firmware answer with a
//!   semihosting message, e.g. its IP address for `a`
//!
//! Notifications are only sent after `tcl_notifications on`.
use std::collections::HashMap;

use ocd_protocol::firmware::{CMD_DFU, CMD_GET_IP, CMD_IDENTIFY, REPLY_MARKER};
use ocd_protocol::{Event, Payload, TARGET_EVENT, TARGET_STATE};

use crate::{DebugServer, Response};

const DEFAULT_COMM_ADDRESS: u32 = 0x2000_0400;
const DEFAULT_IP: &str = "192.168.1.5";

/// A simulated target behind a debug server.
#[derive(Debug, Clone)]
pub struct TargetSimulator {
    comm_address: u32,
    ip: String,
    state: Option<&'static str>,
    notifications: bool,
    semihosting: bool,
    memory: HashMap<u32, u8>,
}

impl Default for TargetSimulator {
    fn default() -> Self {
        TargetSimulator::new(DEFAULT_COMM_ADDRESS, DEFAULT_IP)
    }
}

fn target_state(state: &str) -> Event {
    let mut payload = Payload::new();
    payload.insert("state".to_string(), state.to_string());
    Event::new(TARGET_STATE, payload)
}

fn target_event(name: &str) -> Event {
    let mut payload = Payload::new();
    payload.insert("event".to_string(), name.to_string());
    Event::new(TARGET_EVENT, payload)
}

fn semihost_reply(message: &str) -> Event {
    let mut payload = Payload::new();
    payload.insert("message".to_string(), format!("{}{}", REPLY_MARKER, message));
    Event::new("semihost-message", payload)
}

fn parse_number(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl TargetSimulator {
    pub fn new(comm_address: u32, ip: impl Into<String>) -> TargetSimulator {
        TargetSimulator {
            comm_address,
            ip: ip.into(),
            state: None,
            notifications: false,
            semihosting: false,
            memory: HashMap::new(),
        }
    }

    pub fn state(&self) -> Option<&str> {
        self.state
    }

    pub fn read_byte(&self, address: u32) -> u8 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    fn transition(&mut self, state: &'static str, events: &mut Vec<Event>) {
        self.state = Some(state);
        events.push(target_state(state));
        match state {
            "halted" => events.push(target_event("halted")),
            "running" => events.push(target_event("resumed")),
            _ => {}
        }
    }

    fn reset(&mut self, run: bool, events: &mut Vec<Event>) {
        self.memory.clear();
        events.push(target_event("reset-start"));
        self.transition("reset", events);
        if !run {
            self.transition("halted", events);
            return;
        }
        self.transition("running", events);
        if self.semihosting {
            events.push(semihost_reply(&format!("comm={:x}", self.comm_address)));
            self.transition("halted", events);
        }
    }

    fn resume(&mut self, events: &mut Vec<Event>) -> String {
        if self.state == Some("running") {
            return "The target is not halted.".to_string();
        }
        self.transition("running", events);
        String::new()
    }

    fn write_byte(&mut self, args: &[&str], events: &mut Vec<Event>) -> String {
        let [address, value] = args else {
            return "mwb: wrong number of arguments".to_string();
        };
        let (Some(address), Some(value)) = (parse_number(address), parse_number(value)) else {
            return "mwb: invalid argument".to_string();
        };
        let Ok(value) = u8::try_from(value) else {
            return "mwb: value out of range".to_string();
        };
        self.memory.insert(address, value);
        if address == self.comm_address && value != 0 {
            self.run_test_command(value, events);
        }
        String::new()
    }

    /// The firmware polls its comm byte, answers and clears it.
    fn run_test_command(&mut self, command: u8, events: &mut Vec<Event>) {
        if !self.semihosting || self.state != Some("running") {
            return;
        }
        let answer = match command {
            CMD_IDENTIFY => Some("spark".to_string()),
            CMD_GET_IP => Some(self.ip.clone()),
            CMD_DFU => Some("ok".to_string()),
            _ => None,
        };
        match answer {
            Some(answer) => events.push(semihost_reply(&answer)),
            None => log::debug!("Firmware ignores command byte 0x{:02x}", command),
        }
        self.memory.insert(self.comm_address, 0);
    }

    fn read_byte_command(&self, args: &[&str]) -> String {
        match args {
            [address] => match parse_number(address) {
                Some(address) => format!("0x{:08x}: {:02x} ", address, self.read_byte(address)),
                None => "mdb: invalid argument".to_string(),
            },
            _ => "mdb: wrong number of arguments".to_string(),
        }
    }

    fn run(&mut self, command: &str, events: &mut Vec<Event>) -> String {
        if let Some(inner) = command
            .strip_prefix("capture \"")
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return self.run(inner, events);
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["tcl_notifications", "on"] => {
                self.notifications = true;
                String::new()
            }
            ["tcl_notifications", "off"] => {
                self.notifications = false;
                String::new()
            }
            ["arm", "semihosting", "enable"] => {
                self.semihosting = true;
                "semihosting is enabled".to_string()
            }
            ["arm", "semihosting", "disable"] => {
                self.semihosting = false;
                "semihosting is disabled".to_string()
            }
            ["reset"] | ["reset", "run"] => {
                self.reset(true, events);
                String::new()
            }
            ["reset", "halt"] | ["reset", "init"] => {
                self.reset(false, events);
                String::new()
            }
            ["halt"] => {
                if self.state != Some("halted") {
                    self.transition("halted", events);
                }
                String::new()
            }
            ["resume"] | ["continue"] => self.resume(events),
            ["mwb", args @ ..] => self.write_byte(args, events),
            ["mdb", args @ ..] => self.read_byte_command(args),
            [] => String::new(),
            [name, ..] => format!("invalid command name \"{}\"", name),
        }
    }
}

impl DebugServer for TargetSimulator {
    fn execute(&mut self, command: &str) -> Response {
        let mut events = Vec::new();
        let reply = self.run(command, &mut events);
        if !self.notifications {
            events.clear();
        }
        Response::reply(reply).with_events(events)
    }
}

#[cfg(test)]
mod test {
    use ocd_protocol::Event;

    use super::TargetSimulator;
    use crate::{DebugServer, Response};

    fn kinds(response: &Response) -> Vec<String> {
        response
            .events
            .iter()
            .map(|event| {
                let parsed = Event::parse(&event.to_line()).unwrap();
                match parsed.target_state() {
                    Some(state) => format!("state:{}", state),
                    None => parsed.kind().to_string(),
                }
            })
            .collect()
    }

    fn started() -> TargetSimulator {
        let mut target = TargetSimulator::new(0x2000_0100, "10.0.0.7");
        target.execute("tcl_notifications on");
        target.execute("capture \"arm semihosting enable\"");
        target
    }

    #[test]
    fn no_notifications_by_default() {
        let mut target = TargetSimulator::default();
        let response = target.execute("reset run");
        assert!(response.events.is_empty());
        assert_eq!(target.state(), Some("running"));
    }

    #[test]
    fn reset_run_announces_comm_address() {
        let mut target = started();
        let response = target.execute("reset run");
        assert_eq!(
            kinds(&response),
            [
                "reset-start",
                "state:reset",
                "state:running",
                "resumed",
                "semihost-message",
                "state:halted",
                "halted"
            ]
        );
        let link = &response.events[4];
        assert_eq!(link.payload().get("message").unwrap(), "`comm=20000100");
        assert_eq!(target.state(), Some("halted"));
    }

    #[test]
    fn comm_byte_triggers_semihost_reply() {
        let mut target = started();
        target.execute("reset run");
        target.execute("capture \"resume\"");

        let response = target.execute("capture \"mwb 0x20000100 97\"");
        assert_eq!(response.reply, "");
        assert_eq!(response.events.len(), 1);
        assert_eq!(
            response.events[0].payload().get("message").unwrap(),
            "`10.0.0.7"
        );
        assert_eq!(target.read_byte(0x2000_0100), 0);
    }

    #[test]
    fn halted_firmware_does_not_answer() {
        let mut target = started();
        target.execute("reset run");
        let response = target.execute("mwb 0x20000100 0x61");
        assert!(response.events.is_empty());
        assert_eq!(target.read_byte(0x2000_0100), 0x61);
        assert_eq!(
            target.execute("mdb 0x20000100").reply,
            "0x20000100: 61 "
        );
    }

    #[test]
    fn errors_are_reported_as_replies() {
        let mut target = started();
        assert_eq!(
            target.execute("flash banks").reply,
            "invalid command name \"flash\""
        );
        assert_eq!(
            target.execute("mwb 0x0 300").reply,
            "mwb: value out of range"
        );
        target.execute("reset run");
        target.execute("resume");
        assert_eq!(target.execute("continue").reply, "The target is not halted.");
    }
}
