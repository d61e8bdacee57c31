const IAC: u8 = 255;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250;
const SE: u8 = 240;

pub const MAX_LINE_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    /// Saw IAC.
    Command,
    /// Saw IAC WILL/WONT/DO/DONT, option byte follows.
    Option,
    /// Inside IAC SB ... IAC SE.
    Subneg,
    /// Saw IAC inside a subnegotiation.
    SubnegIac,
}

/// Incremental decoder turning raw Telnet bytes into text lines.
///
/// IAC sequences are stripped even when split across reads. Lines end at LF;
/// CR is dropped. Bytes past [`MAX_LINE_LEN`] are discarded until the next LF.
#[derive(Debug)]
pub struct LineDecoder {
    state: State,
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Data,
            buf: Vec::new(),
        }
    }

    /// Feed raw bytes; complete lines are appended to `lines`.
    pub fn feed(&mut self, data: &[u8], lines: &mut Vec<String>) {
        for &byte in data {
            self.state = match (self.state, byte) {
                (State::Data, IAC) => State::Command,
                (State::Data, b'\n') => {
                    lines.push(self.take_line());
                    State::Data
                }
                (State::Data, b'\r') => State::Data,
                (State::Data, b) => {
                    self.push(b);
                    State::Data
                }
                // Escaped IAC is a literal 255
                (State::Command, IAC) => {
                    self.push(IAC);
                    State::Data
                }
                (State::Command, WILL | WONT | DO | DONT) => State::Option,
                (State::Command, SB) => State::Subneg,
                (State::Command, _) => State::Data,
                (State::Option, _) => State::Data,
                (State::Subneg, IAC) => State::SubnegIac,
                (State::Subneg, _) => State::Subneg,
                (State::SubnegIac, SE) => State::Data,
                (State::SubnegIac, _) => State::Subneg,
            };
        }
    }

    fn push(&mut self, byte: u8) {
        if self.buf.len() < MAX_LINE_LEN {
            self.buf.push(byte);
        }
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.buf);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
