use super::arena::Arena;
use super::config::Config;
use super::control::{CallFrame, ErrorHandler, EventSlot, LoopFrame, Timer};
use super::cursor::Source;
use super::exec::Flow;
use super::io::{Channel, Io, LineReader};
use super::memory::{Memory, Ram};
use super::stack::Stack;
use crate::error;
use crate::lang::{lex, Address, Error, LineNumber, Number, Token, Word};
use std::time::Instant;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, Error>;

/// ## Interpreter state
///
/// One `Runtime` owns its arena, its stacks and its channels.
/// The host feeds it lines with `enter` and drives it with `execute`,
/// handling the returned `Event` before calling again.

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Stopped,
    Running,
    Print(String),
    Errors(Vec<Error>),
    Load(String),
    Save(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Run,
}

const IMAGE_MAGIC: &[u8; 4] = b"BAS\x01";

/// A stored line number is a whole number from 1 to 65535.
pub(super) fn program_line(n: Number) -> Result<LineNumber> {
    if n < 1.0 || n > LineNumber::max_value() as Number || n.fract() != 0.0 {
        return Err(error!(Range));
    }
    Ok(n as LineNumber)
}

pub struct Runtime {
    pub(super) config: Config,
    pub(super) arena: Arena,
    pub(super) stack: Stack<Number>,
    pub(super) loops: Stack<LoopFrame>,
    pub(super) gosubs: Stack<CallFrame>,
    pub(super) io: Io,
    pub(super) direct: Vec<u8>,
    pub(super) last_line: Vec<u8>,
    pub(super) source: Source,
    pub(super) here: Address,
    pub(super) token_at: Address,
    pub(super) token: Token,
    pub(super) mode: Mode,
    pub(super) running: bool,
    pub(super) fn_depth: usize,
    pub(super) data: Option<Address>,
    pub(super) data_record: Number,
    pub(super) status: bool,
    pub(super) last_error: Number,
    pub(super) on_error: ErrorHandler,
    pub(super) after: Timer,
    pub(super) every: Timer,
    pub(super) events: Vec<EventSlot>,
    pub(super) events_enabled: bool,
    pub(super) next_event: usize,
    pub(super) seed: Number,
    pub(super) interrupted: bool,
    pub(super) pending: Option<Event>,
    pub(super) epoch: Instant,
    pub(super) delay_until: Option<Instant>,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(Config::default())
    }
}

impl Runtime {
    pub fn new(config: Config) -> Runtime {
        let ram = Ram::new(config.memsize());
        Runtime::with_memory(config, Box::new(ram))
    }

    /// A runtime on a caller supplied memory backend.
    pub fn with_memory(config: Config, memory: Box<dyn Memory>) -> Runtime {
        let arena = Arena::new(memory, config.line_cache);
        Runtime {
            stack: Stack::new(config.stack_size, error!(Stack), error!(Stack)),
            loops: Stack::new(config.for_depth, error!(Loop), error!(Loop)),
            gosubs: Stack::new(config.gosub_depth, error!(@Gosub), error!(@Return)),
            config,
            arena,
            io: Io::new(),
            direct: vec![],
            last_line: vec![],
            source: Source::Direct,
            here: 0,
            token_at: 0,
            token: Token::Eol,
            mode: Mode::Interactive,
            running: false,
            fn_depth: 0,
            data: None,
            data_record: 0.0,
            status: false,
            last_error: 0.0,
            on_error: ErrorHandler::Stop,
            after: Timer::default(),
            every: Timer::default(),
            events: vec![],
            events_enabled: true,
            next_event: 0,
            seed: 0.0,
            interrupted: false,
            pending: None,
            epoch: Instant::now(),
            delay_until: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tokenize `text` as the direct line and move to its first token.
    pub(super) fn set_direct(&mut self, text: &str) {
        self.direct.clear();
        for token in lex(text, self.config.case_fold) {
            token.encode(&mut self.direct);
        }
        self.source = Source::Direct;
        self.here = 0;
        self.mode = Mode::Interactive;
        self.next_token();
    }

    /// Store the statement tokens of a program line. No tokens deletes it.
    pub(super) fn store_tokens(&mut self, number: LineNumber, tokens: &[Token]) -> Result<()> {
        let mut body = vec![];
        for token in tokens {
            token.encode(&mut body);
        }
        self.arena.store_line(number, &body)?;
        self.data = None;
        Ok(())
    }

    /// Enter a line of text. A leading number stores it in the program,
    /// anything else runs at the next `execute`. Returns true when the
    /// line is worth keeping in a history.
    pub fn enter(&mut self, line: &str) -> bool {
        let tokens = lex(line, self.config.case_fold);
        match tokens.first() {
            None => false,
            Some(Token::Number(n)) => {
                let stored = program_line(*n).and_then(|number| self.store_tokens(number, &tokens[1..]));
                if let Err(error) = stored {
                    self.pending = Some(Event::Errors(vec![error]));
                }
                true
            }
            Some(_) => {
                self.last_line = line.trim_end_matches(&['\r', '\n'][..]).as_bytes().to_vec();
                self.set_direct(line);
                self.running = true;
                true
            }
        }
    }

    /// Run at most `cycles` statements. Console output is always
    /// handed out first, then any event a statement produced.
    pub fn execute(&mut self, cycles: usize) -> Event {
        if let Some(event) = self.flush() {
            return event;
        }
        if let Some(event) = self.pending.take() {
            return event;
        }
        if !self.running {
            self.interrupted = false;
            return Event::Stopped;
        }
        if let Some(until) = self.delay_until {
            if !self.interrupted && Instant::now() < until {
                return Event::Running;
            }
            self.delay_until = None;
        }
        for _ in 0..cycles {
            if self.poll_break() {
                break;
            }
            match self.step() {
                Ok(Flow::Next) => {}
                Ok(Flow::Stop) => self.halt(),
                Ok(Flow::Host(event)) => {
                    self.halt();
                    self.pending = Some(event);
                }
                Ok(Flow::Yield(event)) => self.pending = Some(event),
                Ok(Flow::Return) => self.pending = self.recover(error!(Function)),
                Err(error) => self.pending = self.recover(error),
            }
            self.poll_break();
            if !self.running || self.pending.is_some() || self.delay_until.is_some() {
                break;
            }
        }
        if let Some(event) = self.flush() {
            return event;
        }
        if let Some(event) = self.pending.take() {
            return event;
        }
        if self.running {
            Event::Running
        } else {
            Event::Stopped
        }
    }

    /// Stop on a pending interrupt. Returns true when it stopped.
    fn poll_break(&mut self) -> bool {
        if !self.interrupted {
            return false;
        }
        self.interrupted = false;
        if self.running {
            self.io.console.write_char(b'\n');
            self.halt();
        }
        true
    }

    fn flush(&mut self) -> Option<Event> {
        let s = self.io.console.take_output();
        if s.is_empty() {
            None
        } else {
            Some(Event::Print(s))
        }
    }

    /// One statement, then due timers and events when the cursor
    /// sits where a program can safely be left: a line start, `:` or NEXT.
    fn step(&mut self) -> Result<Flow> {
        let flow = self.statement()?;
        if flow != Flow::Next {
            return Ok(flow);
        }
        let safe = match &self.token {
            Token::LineNumber(_) | Token::Char(b':') => true,
            Token::Word(Word::Next) => true,
            _ => false,
        };
        if safe && !self.interrupted && self.mode == Mode::Run && self.fn_depth == 0 {
            self.service_timers()?;
        }
        Ok(Flow::Next)
    }

    fn halt(&mut self) {
        self.running = false;
        self.mode = Mode::Interactive;
        self.fn_depth = 0;
        self.delay_until = None;
        self.io.reset();
    }

    /// The top level error handler. Returns the event to report,
    /// or `None` when an armed handler took the error.
    fn recover(&mut self, error: Error) -> Option<Event> {
        self.stack.clear();
        self.loops.clear();
        self.gosubs.clear();
        self.after.armed = false;
        self.every.armed = false;
        self.fn_depth = 0;
        if error.word() == Some(Word::Break) {
            self.halt();
            return None;
        }
        self.last_error = error.number();
        let line = match (self.mode, self.source) {
            (Mode::Run, Source::Program) => Some(self.arena.line_of(self.here)),
            _ => None,
        };
        debug!(target: "basic::exec", "{} at line {:?}", error, line);
        let mut error = error;
        if self.mode == Mode::Run {
            match self.on_error {
                ErrorHandler::Goto(target) => {
                    self.on_error = ErrorHandler::Stop;
                    match self.jump(target as Number) {
                        Ok(()) => return None,
                        Err(e) => error = e,
                    }
                }
                ErrorHandler::Cont => {
                    self.skip_to_term();
                    return None;
                }
                ErrorHandler::Stop => {}
            }
        }
        self.halt();
        let error = match line {
            Some(line) if error.line_number().is_none() => error.in_line_number(line),
            _ => error,
        };
        Some(Event::Errors(vec![error]))
    }

    /// Stop the program after the current statement.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Mark the software event `id` as raised. Returns false
    /// when no `EVENT` statement armed it.
    pub fn raise_event(&mut self, id: i32) -> bool {
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(slot) => {
                slot.raised = true;
                true
            }
            None => false,
        }
    }

    /// A line for INPUT to read from the console.
    pub fn queue_input(&mut self, line: &str) {
        self.io.console.queue_input(line);
    }

    /// Where the console gets lines once the queue is empty.
    pub fn set_reader(&mut self, reader: Option<LineReader>) {
        self.io.console.set_reader(reader);
    }

    /// Attach a channel by number, returning the one it replaces.
    pub fn attach(&mut self, id: u8, channel: Box<dyn Channel>) -> Option<Box<dyn Channel>> {
        self.io.attach(id, channel)
    }

    /// Set the `RND` seed, also readable as `@R`.
    pub fn reseed(&mut self, seed: Number) {
        self.seed = seed;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Replace the program with a text listing. Every line must be numbered.
    pub fn load_listing(&mut self, text: &str) -> Result<()> {
        self.new_program();
        for line in text.lines() {
            let tokens = lex(line, self.config.case_fold);
            match tokens.first() {
                None => continue,
                Some(Token::Number(n)) => {
                    let number = program_line(*n)?;
                    self.store_tokens(number, &tokens[1..])?;
                }
                Some(_) => return Err(error!(Syntax; "UNNUMBERED LINE")),
            }
        }
        info!(target: "basic::program", "loaded {} bytes of program", self.arena.top());
        Ok(())
    }

    /// The program region as a binary image:
    /// ```text
    /// "BAS" 1, length (2 bytes LE), program bytes, CRC-32 (4 bytes LE)
    /// ```
    pub fn image(&self) -> Vec<u8> {
        let program = self.arena.program_bytes();
        let mut v = IMAGE_MAGIC.to_vec();
        v.extend_from_slice(&(program.len() as u16).to_le_bytes());
        v.extend_from_slice(&program);
        v.extend_from_slice(&crc::crc32::checksum_ieee(&program).to_le_bytes());
        v
    }

    pub fn load_image(&mut self, image: &[u8]) -> Result<()> {
        let header = IMAGE_MAGIC.len() + 2;
        if image.len() < header + 4 || &image[..IMAGE_MAGIC.len()] != IMAGE_MAGIC {
            return Err(error!(File; "NOT A PROGRAM IMAGE"));
        }
        let len = u16::from_le_bytes([image[4], image[5]]) as usize;
        if image.len() != header + len + 4 {
            return Err(error!(File; "TRUNCATED"));
        }
        let program = &image[header..header + len];
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&image[header + len..]);
        if crc::crc32::checksum_ieee(program) != u32::from_le_bytes(crc) {
            return Err(error!(File; "BAD CHECKSUM"));
        }
        self.new_program();
        self.arena.set_program_bytes(program)?;
        info!(target: "basic::program", "loaded image of {} bytes", len);
        Ok(())
    }
}
