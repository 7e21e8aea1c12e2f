use super::control::Timer;
use super::cursor::Source;
use super::runtime::{Event, Mode, Runtime};
use super::var::{to_address, Target};
use crate::error;
use crate::lang::code::ADDRSIZE;
use crate::lang::{format_number, lex, parse_number, Address, Error, Kind, LineNumber, Name};
use crate::lang::{Number, Token, Word};
use std::time::{Duration, Instant};

type Result<T> = std::result::Result<T, Error>;

/// Widest field PRINT pads to and the most spaces one TAB writes.
const MAX_WIDTH: usize = 255;

/// Longest DELAY in milliseconds, a little over a day.
const MAX_DELAY: Number = 86_400_000.0;

/// What the statement loop does after a statement.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Next,
    /// STOP, END, NEW and end of input.
    Stop,
    /// RETURN or FEND inside a user function.
    Return,
    /// Hand an event to the host and end the run.
    Host(Event),
    /// Hand an event to the host and keep running.
    Yield(Event),
}

/// One item of a DATA statement.
#[derive(Debug, Clone, PartialEq)]
enum Datum {
    Number(Number),
    Text(Vec<u8>),
}

/// A number typed in answer to INPUT: blanks, an optional sign,
/// then digits. A following comma is consumed.
fn scan_number(line: &[u8], mut at: usize) -> Option<(Number, usize)> {
    let blanks = |line: &[u8], mut at: usize| {
        while let Some(b' ') | Some(b'\t') = line.get(at) {
            at += 1;
        }
        at
    };
    at = blanks(line, at);
    let sign = if line.get(at) == Some(&b'-') {
        at += 1;
        -1.0
    } else {
        1.0
    };
    match line.get(at) {
        Some(c) if c.is_ascii_digit() || *c == b'.' => {}
        _ => return None,
    }
    let (n, len) = parse_number(&line[at..]);
    at = blanks(line, at + len);
    if line.get(at) == Some(&b',') {
        at += 1;
    }
    Some((n * sign, at))
}

impl Runtime {
    /// Execute the statement at the current token.
    pub(super) fn statement(&mut self) -> Result<Flow> {
        match self.token.clone() {
            Token::Char(b':') | Token::LineNumber(_) => {
                self.next_token();
            }
            Token::Variable(_) | Token::ArrayVar(_) | Token::StringVar(_) => self.assignment()?,
            Token::Word(word) => return self.keyword(word),
            Token::Eol => return Ok(Flow::Stop),
            _ => return Err(error!(Syntax)),
        }
        Ok(Flow::Next)
    }

    fn keyword(&mut self, word: Word) -> Result<Flow> {
        match word {
            Word::Print => self.print_statement()?,
            Word::Let => {
                self.next_token();
                self.assignment()?
            }
            Word::Input => return self.input_statement(),
            Word::Goto => self.goto_statement(false)?,
            Word::Gosub => self.goto_statement(true)?,
            Word::Return => return self.return_statement(),
            Word::If => self.if_statement()?,
            Word::Else => self.else_statement()?,
            Word::For => self.for_statement()?,
            Word::Next => self.next_statement()?,
            Word::While => self.while_statement()?,
            Word::Wend => self.wend_statement()?,
            Word::Repeat => self.repeat_statement()?,
            Word::Until => self.until_statement()?,
            Word::Break => self.break_statement()?,
            Word::Cont => self.cont_statement()?,
            Word::Switch => self.switch_statement()?,
            Word::Case => self.case_statement()?,
            Word::Swend | Word::Do | Word::Dend => {
                self.next_token();
            }
            Word::Stop | Word::End => return Ok(Flow::Stop),
            Word::New => {
                self.new_program();
                return Ok(Flow::Stop);
            }
            Word::Run => self.run_statement()?,
            Word::List => self.list_statement()?,
            Word::Rem => self.skip_line(false),
            Word::Dim => self.dim_statement()?,
            Word::Clr => self.clr_statement()?,
            Word::Tab => self.tab_statement()?,
            Word::Poke => self.poke_statement()?,
            Word::Cls => {
                self.io.write_char(12);
                self.next_token();
            }
            Word::Dump => self.dump_statement()?,
            Word::Save => {
                let name = self.file_name()?;
                return Ok(Flow::Yield(Event::Save(name)));
            }
            Word::Load => {
                let name = self.file_name()?;
                return Ok(Flow::Host(Event::Load(name)));
            }
            Word::Data => self.skip_to_term(),
            Word::Read => self.read_statement()?,
            Word::Restore => self.restore_statement()?,
            Word::Def => self.def_statement()?,
            Word::Fn => {
                self.call_function()?;
                self.pop()?;
                self.next_token();
            }
            Word::Fend => {
                if self.fn_depth == 0 {
                    return Err(error!(Function));
                }
                self.push(0.0)?;
                return Ok(Flow::Return);
            }
            Word::Eval => self.eval_statement()?,
            Word::Error => self.error_statement()?,
            Word::On => self.on_statement()?,
            Word::After => self.timer_statement(false)?,
            Word::Every => self.timer_statement(true)?,
            Word::Event => self.event_statement()?,
            Word::Get => self.get_statement()?,
            Word::Put => self.put_statement()?,
            Word::Delay => self.delay_statement()?,
            _ => return Err(error!(Syntax)),
        }
        Ok(Flow::Next)
    }

    /// Statements of a multi-line function up to its RETURN or FEND.
    pub(super) fn function_body(&mut self) -> Result<()> {
        loop {
            if self.token == Token::Eol {
                return Err(error!(Function));
            }
            match self.statement()? {
                Flow::Next => {}
                Flow::Return => return Ok(()),
                _ => return Err(error!(Function)),
            }
            if self.interrupted {
                return Err(error!(@Break));
            }
        }
    }

    fn print_statement(&mut self) -> Result<()> {
        let channel = self.io.output;
        let result = self.print_items();
        self.io.output = channel;
        result
    }

    fn print_items(&mut self) -> Result<()> {
        let mut form = 0;
        let mut newline = true;
        self.next_token();
        while !self.is_term() {
            newline = true;
            let mut modifier = false;
            if self.at_string() {
                let s = self.string_value()?.unwrap_or_default();
                self.io.write_str(&s);
                self.next_token();
            } else if self.token.is_word(Word::Tab) {
                self.tab_statement()?;
            } else if self.token.is_char(b'#') {
                form = self.expect_expression()? as i32;
                modifier = true;
            } else if self.token.is_char(b'&') {
                self.io.output = self.expect_expression()? as u8;
                modifier = true;
            } else if !self.token.is_char(b',') && !self.token.is_char(b';') {
                let n = self.evaluate()?;
                self.print_number(n, form);
            }
            if self.token.is_char(b',') || self.token.is_char(b';') {
                if self.token.is_char(b',') && !modifier {
                    self.io.write_char(b' ');
                }
                newline = false;
                self.next_token();
            }
        }
        if newline {
            self.io.newline();
        }
        Ok(())
    }

    /// Negative widths align right, positive widths align left.
    fn print_number(&mut self, n: Number, form: i32) {
        let s = format_number(n);
        let width = (form.unsigned_abs() as usize).min(MAX_WIDTH);
        let text = if form < 0 {
            format!("{:>1$}", s, width)
        } else {
            format!("{:<1$}", s, width)
        };
        self.io.write_str(text.as_bytes());
    }

    /// The target of LET, INPUT or READ. Stops on its last token.
    fn parse_lhs(&mut self) -> Result<Target> {
        match self.token.clone() {
            Token::Variable(name) => Ok(Target::Scalar(name)),
            Token::ArrayVar(name) => {
                let args = self.parse_subscripts()?.unwrap_or_default();
                let (i, j) = self.indices(&args)?;
                Ok(Target::Element(name, i, j))
            }
            Token::StringVar(name) => {
                let (from, to, slot, whole) = self.parse_string_var()?;
                Ok(Target::Text {
                    name,
                    from,
                    to,
                    slot,
                    whole,
                })
            }
            _ => Err(error!(Syntax)),
        }
    }

    fn assign_string(&mut self, target: Target, value: &[u8]) -> Result<()> {
        match target {
            Target::Text {
                name,
                from,
                to,
                slot,
                ..
            } => self.store_text(name, from, to, slot, value).map(|_| ()),
            _ => self.assign_number(target, value.first().copied().unwrap_or(0) as Number),
        }
    }

    fn assignment(&mut self) -> Result<()> {
        let target = self.parse_lhs()?;
        if !self.next_token().is_char(b'=') {
            return Err(error!(Syntax));
        }
        self.next_token();
        if let Target::Text { .. } = target {
            if self.at_string() {
                let mut s = self.string_value()?.unwrap_or_default();
                self.next_token();
                while self.token.is_char(b'+') {
                    self.next_token();
                    let more = self.string_value()?.ok_or_else(|| error!(Syntax))?;
                    s.extend_from_slice(&more);
                    self.next_token();
                }
                return self.assign_string(target, &s);
            }
        }
        let v = self.evaluate()?;
        self.assign_number(target, v)
    }

    fn input_statement(&mut self) -> Result<Flow> {
        let channel = self.io.input;
        let result = self.input_items();
        self.io.input = channel;
        result
    }

    fn input_items(&mut self) -> Result<Flow> {
        let mut prompt = true;
        self.next_token();
        if self.token.is_char(b'&') {
            self.io.input = self.expect_expression()? as u8;
            prompt = self.io.interactive();
            if !self.token.is_char(b',') {
                return Err(error!(Syntax));
            }
            self.next_token();
        }
        if self.token.is_char(b'#') {
            self.expect_expression()?;
            if !self.token.is_char(b',') {
                return Err(error!(Syntax));
            }
            self.next_token();
        }
        let mut buffer: Option<(Vec<u8>, Address)> = None;
        loop {
            if let Token::Str(s) = self.token.clone() {
                prompt = false;
                self.io.write_str(&s);
                self.next_token();
                if !self.token.is_char(b',') && !self.token.is_char(b';') {
                    return Err(error!(Syntax));
                }
                self.next_token();
            }
            let target = self.parse_lhs()?;
            match target {
                Target::Text { name, slot, .. } => {
                    if prompt {
                        self.io.write_str(b"? ");
                    }
                    let mut line = match self.io.read_line() {
                        Some(line) => line,
                        None => return Ok(Flow::Stop),
                    };
                    line.truncate(self.string_slot(name, slot)?.dim);
                    self.assign_string(target, &line)?;
                }
                _ => match self.input_number(&mut buffer, prompt)? {
                    Some(n) => self.assign_number(target, n)?,
                    None => return Ok(Flow::Stop),
                },
            }
            self.next_token();
            if !self.token.is_char(b',') && !self.token.is_char(b';') {
                break;
            }
            self.next_token();
        }
        Ok(Flow::Next)
    }

    /// The next number from the current input line, reading lines as needed.
    /// `None` at the end of input.
    fn input_number(
        &mut self,
        buffer: &mut Option<(Vec<u8>, Address)>,
        prompt: bool,
    ) -> Result<Option<Number>> {
        loop {
            let exhausted = match buffer {
                Some((line, at)) => *at >= line.len(),
                None => true,
            };
            if exhausted {
                if prompt {
                    self.io.write_str(b"? ");
                }
                match self.io.read_line() {
                    Some(line) => *buffer = Some((line, 0)),
                    None => return Ok(None),
                }
            }
            let (line, at) = match buffer.as_mut() {
                Some(b) => b,
                None => continue,
            };
            match scan_number(line, *at) {
                Some((n, next)) => {
                    *at = next;
                    return Ok(Some(n));
                }
                None if self.io.interactive() => {
                    self.io.write_str(format!("{}\n", error!(Number)).as_bytes());
                    *buffer = None;
                }
                None => {
                    *at = line.len();
                    self.status = true;
                    return Ok(Some(0.0));
                }
            }
        }
    }

    fn goto_statement(&mut self, gosub: bool) -> Result<()> {
        let line = self.expect_expression()?;
        if gosub {
            self.push_gosub(false)?;
        }
        self.jump(line)
    }

    fn return_statement(&mut self) -> Result<Flow> {
        if self.fn_depth > 0 {
            self.next_token();
            let v = if self.is_term() { 0.0 } else { self.evaluate()? };
            self.push(v)?;
            return Ok(Flow::Return);
        }
        let frame = self.gosubs.pop()?;
        self.resume(frame.pos);
        self.next_token();
        if frame.event {
            self.events_enabled = true;
        }
        Ok(Flow::Next)
    }

    fn line_after(&mut self) -> Option<Number> {
        match self.next_token() {
            Token::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn if_statement(&mut self) -> Result<()> {
        let condition = self.expect_expression()?;
        if let Token::LineNumber(_) = self.token {
            self.next_token();
        }
        if condition == 0.0 {
            if self.token.is_word(Word::Then) {
                self.next_token();
            }
            let mut nl = false;
            if let Token::LineNumber(_) = self.token {
                self.next_token();
                nl = true;
            }
            if self.token.is_word(Word::Do) {
                self.next_token();
                self.find_bracket(Word::Do, Word::Dend)?;
                self.next_token();
            } else if !nl {
                self.skip_line(true);
            }
            if let Token::LineNumber(_) = self.token {
                self.next_token();
            }
            if self.token.is_word(Word::Else) {
                if let Some(line) = self.line_after() {
                    return self.jump(line);
                }
            }
        }
        if self.token.is_word(Word::Then) {
            if let Some(line) = self.line_after() {
                return self.jump(line);
            }
        }
        Ok(())
    }

    /// An ELSE reached from a true IF skips its part.
    fn else_statement(&mut self) -> Result<()> {
        let mut nl = false;
        if let Token::LineNumber(_) = self.next_token() {
            self.next_token();
            nl = true;
        }
        if self.token.is_word(Word::Do) {
            self.next_token();
            self.find_bracket(Word::Do, Word::Dend)?;
        }
        if !nl {
            self.skip_line(false);
        }
        Ok(())
    }

    /// Everything a fresh RUN starts without.
    pub(super) fn clear_state(&mut self) {
        self.arena.clear_heap();
        self.arena.lines.clear();
        self.stack.clear();
        self.loops.clear();
        self.gosubs.clear();
        self.data = None;
        self.data_record = 0.0;
        self.status = false;
        self.io.error = false;
        self.fn_depth = 0;
        self.last_error = 0.0;
        self.after = Timer::default();
        self.every = Timer::default();
        self.events_enabled = true;
        self.on_error = super::control::ErrorHandler::Stop;
    }

    pub(super) fn new_program(&mut self) {
        self.arena.reset();
        self.clear_state();
        self.events.clear();
    }

    pub(super) fn start_program(&mut self) {
        self.source = Source::Program;
        self.here = 0;
        self.next_token();
        self.mode = Mode::Run;
    }

    fn run_statement(&mut self) -> Result<()> {
        self.next_token();
        let line = if self.is_term() {
            None
        } else {
            Some(self.evaluate()?)
        };
        self.clear_state();
        match line {
            Some(line) => self.jump(line),
            None => {
                self.start_program();
                Ok(())
            }
        }
    }

    fn list_statement(&mut self) -> Result<()> {
        self.next_token();
        let args = self.arguments()?;
        let (from, to) = match args.as_slice() {
            [] => (0.0, LineNumber::max_value() as Number),
            [a] => (*a, *a),
            [a, b] => (*a, *b),
            _ => return Err(error!(Args)),
        };
        let text = self.list_lines(from as LineNumber, to as LineNumber);
        self.io.write_str(text.as_bytes());
        Ok(())
    }

    fn dim_statement(&mut self) -> Result<()> {
        loop {
            match self.next_token().clone() {
                Token::ArrayVar(name) => {
                    let dims = self.dimensions()?;
                    if self.arena.find(Kind::Array, name).is_some() {
                        return Err(error!(Variable));
                    }
                    match dims.as_slice() {
                        [i] => self.create_array(name, *i, 1)?,
                        [i, j] => self.create_array(name, *i, *j)?,
                        _ => return Err(error!(Args)),
                    };
                }
                Token::StringVar(name) => {
                    let dims = self.dimensions()?;
                    if name.is_special() || self.arena.find(Kind::String, name).is_some() {
                        return Err(error!(Variable));
                    }
                    match dims.as_slice() {
                        [len] => self.create_string(name, *len, 1)?,
                        [len, slots] => self.create_string(name, *len, *slots)?,
                        _ => return Err(error!(Args)),
                    };
                }
                Token::Variable(name) if !name.is_special() => {
                    self.arena.alloc(Kind::Variable, name, 0)?;
                }
                _ => return Err(error!(Syntax)),
            }
            if !self.next_token().is_char(b',') {
                return Ok(());
            }
        }
    }

    fn dimensions(&mut self) -> Result<Vec<Address>> {
        let args = self.parse_subscripts()?.ok_or_else(|| error!(Args))?;
        let mut dims = vec![];
        for a in args {
            let d = to_address(a)?;
            if d < 1 {
                return Err(error!(Range));
            }
            dims.push(d);
        }
        Ok(dims)
    }

    fn clr_statement(&mut self) -> Result<()> {
        self.next_token();
        if self.is_term() {
            self.clear_state();
            return Ok(());
        }
        let freed = match self.token.clone() {
            Token::Word(Word::Gosub) => {
                self.gosubs.clear();
                true
            }
            Token::Word(Word::For) => {
                self.loops.clear();
                true
            }
            Token::Word(Word::Every) => {
                self.every = Timer::default();
                true
            }
            Token::Word(Word::After) => {
                self.after = Timer::default();
                true
            }
            Token::Variable(name) if name.is_special() => true,
            Token::Variable(name) => self.arena.free(Kind::Variable, name).is_some(),
            Token::ArrayVar(name) => {
                self.expect_char(b'(')?;
                self.expect_char(b')')?;
                self.arena.free(Kind::Array, name).is_some()
            }
            Token::StringVar(name) => {
                !name.is_special() && self.arena.free(Kind::String, name).is_some()
            }
            _ => {
                let n = self.evaluate()?;
                if self.arena.free(Kind::Buffer, Name::buffer(n as u16)).is_none() {
                    self.status = true;
                }
                return Ok(());
            }
        };
        if !freed {
            return Err(error!(Variable));
        }
        self.next_token();
        Ok(())
    }

    fn tab_statement(&mut self) -> Result<()> {
        let n = self.expect_expression()?;
        for _ in 0..(n.max(0.0) as usize).min(MAX_WIDTH) {
            self.io.write_char(b' ');
        }
        Ok(())
    }

    /// `&n,` in front of GET and PUT. Leaves the cursor on what follows.
    fn channel_prefix(&mut self) -> Result<Option<u8>> {
        if !self.next_token().is_char(b'&') {
            return Ok(None);
        }
        let id = self.expect_expression()? as u8;
        if !self.token.is_char(b',') {
            return Err(error!(Syntax));
        }
        self.next_token();
        Ok(Some(id))
    }

    /// One character if one is waiting, otherwise 0.
    fn get_statement(&mut self) -> Result<()> {
        let channel = self.io.input;
        let result = self.get_char();
        self.io.input = channel;
        result
    }

    fn get_char(&mut self) -> Result<()> {
        if let Some(id) = self.channel_prefix()? {
            self.io.input = id;
        }
        let target = self.parse_lhs()?;
        self.next_token();
        let id = self.io.input;
        let c = if self.io.available(id) > 0 {
            self.io.read_char().unwrap_or(0)
        } else {
            0
        };
        self.assign_number(target, c as Number)
    }

    /// Raw bytes, no newline.
    fn put_statement(&mut self) -> Result<()> {
        let channel = self.io.output;
        let result = self.put_bytes();
        self.io.output = channel;
        result
    }

    fn put_bytes(&mut self) -> Result<()> {
        if let Some(id) = self.channel_prefix()? {
            self.io.output = id;
        }
        let bytes = self.arguments()?.iter().map(|n| *n as u8).collect::<Vec<u8>>();
        self.io.write_str(&bytes);
        Ok(())
    }

    /// The program sleeps without blocking the host; `execute`
    /// keeps returning `Running` until the time is up.
    fn delay_statement(&mut self) -> Result<()> {
        let ms = self.expect_expression()?;
        if ms > 0.0 {
            let ms = ms.min(MAX_DELAY) as u64;
            self.delay_until = Some(Instant::now() + Duration::from_millis(ms));
        }
        Ok(())
    }

    fn poke_statement(&mut self) -> Result<()> {
        self.next_token();
        let args = self.arguments()?;
        if args.len() != 2 {
            return Err(error!(Args));
        }
        let a = to_address(args[0])?;
        if a > self.arena.memsize() {
            return Err(error!(Range));
        }
        self.arena.write(a, args[1] as u8);
        Ok(())
    }

    /// Eight bytes to a row, then the two region boundaries.
    fn dump_statement(&mut self) -> Result<()> {
        self.next_token();
        let args = self.arguments()?;
        let end = self.arena.memsize() + 1;
        let (from, count) = match args.as_slice() {
            [] => (0, end),
            [a] => (to_address(*a)?, end),
            [a, n] => (to_address(*a)?, to_address(*n)?),
            _ => return Err(error!(Args)),
        };
        let to = from.saturating_add(count).min(end);
        let mut text = String::new();
        for row in (from..to).step_by(8) {
            text.push_str(&format!("{:>5}:", row));
            for a in row..(row + 8).min(to) {
                text.push_str(&format!(" {:>3}", self.arena.read(a)));
            }
            text.push('\n');
        }
        text.push_str(&format!("top: {}\nhimem: {}\n", self.arena.top(), self.arena.himem()));
        self.io.write_str(text.as_bytes());
        Ok(())
    }

    fn file_name(&mut self) -> Result<String> {
        self.next_token();
        if self.is_term() {
            return Ok("file.bas".to_string());
        }
        let s = self.string_value()?.ok_or_else(|| error!(Syntax))?;
        self.next_token();
        Ok(String::from_utf8_lossy(&s).into_owned())
    }

    /// The address after the next DATA keyword at or after `at`, or `top`.
    fn find_data(&self, mut at: Address) -> Address {
        while at < self.arena.top() {
            let (token, next) = self.arena.token(at);
            at = next;
            if token.is_word(Word::Data) {
                break;
            }
        }
        at
    }

    fn data_start(&mut self) {
        self.data = Some(self.find_data(0));
        self.data_record = 1.0;
    }

    /// Read the next DATA item. `None` when all are used up.
    fn next_data(&mut self) -> Result<Option<Datum>> {
        let mut at = match self.data {
            Some(at) => at,
            None => {
                self.data_start();
                self.find_data(0)
            }
        };
        loop {
            if at >= self.arena.top() {
                self.data = Some(at);
                return Ok(None);
            }
            let (token, next) = self.arena.token(at);
            let (datum, next) = match token {
                Token::Number(n) => (Datum::Number(n), next),
                Token::Str(s) => (Datum::Text(s), next),
                Token::Char(b'-') => match self.arena.token(next) {
                    (Token::Number(n), next) => (Datum::Number(-n), next),
                    _ => return Err(error!(Syntax)),
                },
                Token::Char(b',') => {
                    at = next;
                    continue;
                }
                Token::Char(b':') | Token::LineNumber(_) | Token::Eol => {
                    at = self.find_data(next);
                    continue;
                }
                _ => return Err(error!(Syntax)),
            };
            self.data = Some(next);
            self.data_record += 1.0;
            return Ok(Some(datum));
        }
    }

    fn read_statement(&mut self) -> Result<()> {
        loop {
            self.next_token();
            let target = self.parse_lhs()?;
            self.next_token();
            if !self.is_term() && !self.token.is_char(b',') {
                return Err(error!(Syntax));
            }
            match self.next_data()? {
                Some(Datum::Number(n)) => self.assign_number(target, n)?,
                Some(Datum::Text(s)) => self.assign_string(target, &s)?,
                None => {
                    self.status = true;
                    self.assign_number(target, 0.0)?;
                }
            }
            if !self.token.is_char(b',') {
                return Ok(());
            }
        }
    }

    fn restore_statement(&mut self) -> Result<()> {
        self.next_token();
        if self.is_term() {
            self.data = None;
            self.data_record = 0.0;
            return Ok(());
        }
        let n = self.evaluate()?;
        self.data_start();
        while self.data_record < n {
            if self.next_data()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// `DEF FN f(x) = expr`, or a body up to FEND. The heap entry holds
    /// the body address, the parameter name and `=` for the one line form.
    fn def_statement(&mut self) -> Result<()> {
        if !self.next_token().is_word(Word::Fn) {
            return Err(error!(Syntax));
        }
        let name = match self.next_token() {
            Token::ArrayVar(name) => *name,
            _ => return Err(error!(Syntax)),
        };
        self.expect_char(b'(')?;
        let param = match self.next_token().clone() {
            Token::Char(b')') => Name::default(),
            Token::Variable(p) if !p.is_special() => {
                self.expect_char(b')')?;
                p
            }
            _ => return Err(error!(Syntax)),
        };
        if self.source == Source::Direct {
            return Err(error!(Function));
        }
        let after = self.here;
        self.next_token();
        let inline = self.token.is_char(b'=');
        let body = if inline { self.here } else { after };
        let entry = match self.arena.find(Kind::Function, name) {
            Some(entry) => entry,
            None => self.arena.alloc(Kind::Function, name, 0)?,
        };
        self.arena.set_address(entry, body);
        self.arena.write(entry + ADDRSIZE, param.c);
        self.arena.write(entry + ADDRSIZE + 1, param.d);
        self.arena.write(entry + ADDRSIZE + 2, if inline { b'=' } else { 0 });
        if inline {
            self.skip_to_term();
            return Ok(());
        }
        loop {
            match &self.token {
                Token::Word(Word::Fend) => break,
                Token::Word(Word::Def) | Token::Eol => return Err(error!(Function)),
                _ => {
                    self.next_token();
                }
            }
        }
        self.next_token();
        Ok(())
    }

    /// `EVAL line, "text"` stores a program line. A running program
    /// goes on at the line after the current one.
    fn eval_statement(&mut self) -> Result<()> {
        let number = super::runtime::program_line(self.expect_expression()?)?;
        if !self.token.is_char(b',') {
            return Err(error!(Args));
        }
        self.next_token();
        let text = self.string_value()?.ok_or_else(|| error!(Args))?;
        self.next_token();
        let current = match self.source {
            Source::Program => Some(self.arena.line_of(self.token_at)),
            Source::Direct => None,
        };
        let tokens = lex(&String::from_utf8_lossy(&text), self.config.case_fold);
        self.store_tokens(number, &tokens)?;
        if let Some(line) = current {
            let at = self.arena.find_line(line)?;
            self.here = self.arena.next_line(at);
            self.next_token();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_number() {
        assert_eq!(scan_number(b" 12, -3", 0), Some((12.0, 4)));
        assert_eq!(scan_number(b" 12, -3", 4), Some((-3.0, 7)));
        assert_eq!(scan_number(b"X", 0), None);
        assert_eq!(scan_number(b".5", 0), Some((0.5, 2)));
    }
}
