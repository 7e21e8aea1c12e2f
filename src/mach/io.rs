use std::collections::{BTreeMap, VecDeque};

/// ## Numbered character devices
///
/// Only the byte level is required; line input is built on
/// `read_char` unless a channel knows better.

pub trait Channel {
    /// Next input byte, `None` when nothing is left.
    fn read_char(&mut self) -> Option<u8>;
    /// Look at the next input byte without taking it.
    fn check_char(&mut self) -> Option<u8>;
    /// Input bytes ready to read.
    fn available(&mut self) -> usize;
    fn write_char(&mut self, c: u8);
    fn write_str(&mut self, s: &[u8]) {
        for c in s {
            self.write_char(*c);
        }
    }
    /// One line of input without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Option<Vec<u8>> {
        let mut line = vec![];
        loop {
            match self.read_char() {
                Some(b'\n') => return Some(line),
                Some(b'\r') => {}
                Some(c) => line.push(c),
                None if line.is_empty() => return None,
                None => return Some(line),
            }
        }
    }
}

/// Reads one line for `INPUT`; gets the pending prompt text.
pub type LineReader = Box<dyn FnMut(&str) -> Option<String>>;

/// Channel 1. Output collects until the host takes it.
/// Input comes from lines the host queued, then from the reader.
#[derive(Default)]
pub struct Console {
    output: String,
    input: VecDeque<u8>,
    reader: Option<LineReader>,
}

impl Console {
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn queue_input(&mut self, line: &str) {
        self.input.extend(line.bytes());
        self.input.push_back(b'\n');
    }

    pub fn set_reader(&mut self, reader: Option<LineReader>) {
        self.reader = reader;
    }

    fn pull_line(&mut self) -> bool {
        if !self.input.is_empty() {
            return true;
        }
        let prompt = self.take_output();
        let line = match self.reader.as_mut() {
            Some(reader) => reader(&prompt),
            None => None,
        };
        match line {
            Some(line) => {
                self.queue_input(&line);
                true
            }
            None => {
                self.output = prompt;
                false
            }
        }
    }
}

impl Channel for Console {
    fn read_char(&mut self) -> Option<u8> {
        if self.pull_line() {
            self.input.pop_front()
        } else {
            None
        }
    }
    fn check_char(&mut self) -> Option<u8> {
        self.input.front().copied()
    }
    fn available(&mut self) -> usize {
        self.input.len()
    }
    fn write_char(&mut self, c: u8) {
        self.output.push(c as char);
    }
    fn read_line(&mut self) -> Option<Vec<u8>> {
        if !self.pull_line() {
            return None;
        }
        let mut line = vec![];
        while let Some(c) = self.input.pop_front() {
            if c == b'\n' {
                break;
            }
            if c != b'\r' {
                line.push(c);
            }
        }
        Some(line)
    }
}

pub const CONSOLE: u8 = 1;

/// ## The channel table
///
/// Missing channels never raise; they set `error`, which
/// BASIC reads through `@S`.

#[derive(Default)]
pub struct Io {
    pub console: Console,
    channels: BTreeMap<u8, Box<dyn Channel>>,
    pub input: u8,
    pub output: u8,
    pub error: bool,
}

impl Io {
    pub fn new() -> Io {
        Io {
            input: CONSOLE,
            output: CONSOLE,
            ..Io::default()
        }
    }

    pub fn attach(&mut self, id: u8, channel: Box<dyn Channel>) -> Option<Box<dyn Channel>> {
        self.channels.insert(id, channel)
    }

    pub fn detach(&mut self, id: u8) -> Option<Box<dyn Channel>> {
        self.channels.remove(&id)
    }

    /// Back to the console, as after an error.
    pub fn reset(&mut self) {
        self.input = CONSOLE;
        self.output = CONSOLE;
    }

    pub fn exists(&self, id: u8) -> bool {
        id == CONSOLE || self.channels.contains_key(&id)
    }

    fn channel(&mut self, id: u8) -> Option<&mut dyn Channel> {
        if id == CONSOLE {
            return Some(&mut self.console);
        }
        match self.channels.get_mut(&id) {
            Some(c) => Some(c.as_mut()),
            None => {
                self.error = true;
                None
            }
        }
    }

    pub fn write_char(&mut self, c: u8) {
        let id = self.output;
        if let Some(ch) = self.channel(id) {
            ch.write_char(c);
        }
    }

    pub fn write_str(&mut self, s: &[u8]) {
        let id = self.output;
        if let Some(ch) = self.channel(id) {
            ch.write_str(s);
        }
    }

    pub fn newline(&mut self) {
        self.write_char(b'\n');
    }

    pub fn read_char(&mut self) -> Option<u8> {
        let id = self.input;
        self.channel(id)?.read_char()
    }

    pub fn available(&mut self, id: u8) -> usize {
        match self.channel(id) {
            Some(ch) => ch.available(),
            None => 0,
        }
    }

    pub fn read_line(&mut self) -> Option<Vec<u8>> {
        let id = self.input;
        self.channel(id)?.read_line()
    }

    /// Whether input comes from the console, where prompts make sense.
    pub fn interactive(&self) -> bool {
        self.input == CONSOLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Loopback(VecDeque<u8>);

    impl Channel for Loopback {
        fn read_char(&mut self) -> Option<u8> {
            self.0.pop_front()
        }
        fn check_char(&mut self) -> Option<u8> {
            self.0.front().copied()
        }
        fn available(&mut self) -> usize {
            self.0.len()
        }
        fn write_char(&mut self, c: u8) {
            self.0.push_back(c)
        }
    }

    #[test]
    fn test_console_queue() {
        let mut io = Io::new();
        io.console.queue_input("12,3");
        assert_eq!(io.available(CONSOLE), 5);
        assert_eq!(io.read_line(), Some(b"12,3".to_vec()));
        assert_eq!(io.read_line(), None);
    }

    #[test]
    fn test_console_reader_gets_prompt() {
        let mut io = Io::new();
        io.write_str(b"NAME? ");
        io.console.set_reader(Some(Box::new(|prompt: &str| {
            assert_eq!(prompt, "NAME? ");
            Some("BOB".to_string())
        })));
        assert_eq!(io.read_line(), Some(b"BOB".to_vec()));
        assert_eq!(io.console.take_output(), "");
    }

    #[test]
    fn test_missing_channel_sets_error() {
        let mut io = Io::new();
        io.output = 4;
        io.write_char(b'X');
        assert!(io.error);
        io.attach(4, Box::new(Loopback::default()));
        io.write_str(b"HI\n");
        io.input = 4;
        assert_eq!(io.read_line(), Some(b"HI".to_vec()));
    }
}
