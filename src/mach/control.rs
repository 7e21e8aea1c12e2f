use super::cursor::{to_line_number, Position};
use super::eval::equal;
use super::runtime::{Mode, Runtime};
use crate::error;
use crate::lang::{Error, LineNumber, Name, Number, Token, Word};
use tracing::debug;

type Result<T> = std::result::Result<T, Error>;

/// ## Loops, blocks, timers and events
///
/// Closing keywords are found by scanning forward with
/// a nesting count; nothing is resolved ahead of time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    Repeat,
}

impl LoopKind {
    fn brackets(self) -> (Word, Word) {
        match self {
            LoopKind::For => (Word::For, Word::Next),
            LoopKind::While => (Word::While, Word::Wend),
            LoopKind::Repeat => (Word::Repeat, Word::Until),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopFrame {
    pub kind: LoopKind,
    pub var: Name,
    pub pos: Position,
    pub limit: Number,
    pub step: Number,
}

impl LoopFrame {
    fn block(kind: LoopKind, pos: Position) -> LoopFrame {
        LoopFrame {
            kind,
            var: Name::default(),
            pos,
            limit: 0.0,
            step: 0.0,
        }
    }
}

/// A GOSUB return point. `event` marks returns from an event handler,
/// which switch events back on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallFrame {
    pub pos: Position,
    pub event: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    pub interval: u64,
    pub last: u64,
    pub line: Option<LineNumber>,
    pub gosub: bool,
    pub armed: bool,
}

impl Timer {
    fn due(&self, now: u64) -> Option<LineNumber> {
        if self.armed && now.saturating_sub(self.last) >= self.interval {
            self.line
        } else {
            None
        }
    }
}

pub const EVENT_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSlot {
    pub id: i32,
    pub line: LineNumber,
    pub gosub: bool,
    pub raised: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorHandler {
    Stop,
    Goto(LineNumber),
    Cont,
}

impl Runtime {
    /// A loop entered again from its own start replaces the old frame
    /// and everything above it.
    fn push_loop(&mut self, frame: LoopFrame) -> Result<()> {
        let again = self.loops.iter().position(|f| match frame.kind {
            LoopKind::For => f.kind == LoopKind::For && f.var == frame.var,
            _ => f.kind == frame.kind && f.pos == frame.pos,
        });
        if let Some(index) = again {
            self.loops.truncate(index);
        }
        self.loops.push(frame)
    }

    fn skip_for_body(&mut self) -> Result<()> {
        self.find_bracket(Word::For, Word::Next)?;
        if let Token::Variable(_) = self.next_token() {
            self.next_token();
        }
        Ok(())
    }

    pub(super) fn for_statement(&mut self) -> Result<()> {
        let var = match self.next_token() {
            Token::Variable(name) => *name,
            _ => return Err(error!(Syntax)),
        };
        self.next_token();
        if self.token.is_char(b'=') {
            let v = self.expect_expression()?;
            self.set_var(var, v)?;
        }
        let mut limit = Number::MAX;
        let mut step = 1.0;
        if self.token.is_word(Word::To) {
            limit = self.expect_expression()?;
        }
        if self.token.is_word(Word::Step) {
            step = self.expect_expression()?;
        }
        if !self.is_term() {
            return Err(error!(Syntax));
        }
        self.push_loop(LoopFrame {
            kind: LoopKind::For,
            var,
            pos: self.position(),
            limit,
            step,
        })?;
        let v = self.get_var(var)?;
        if (step > 0.0 && v > limit) || (step < 0.0 && v < limit) {
            self.loops.pop()?;
            self.skip_for_body()?;
        }
        Ok(())
    }

    pub(super) fn next_statement(&mut self) -> Result<()> {
        let named = match self.next_token() {
            Token::Variable(name) => Some(*name),
            _ => None,
        };
        if named.is_some() {
            self.next_token();
        }
        if !self.is_term() {
            return Err(error!(Syntax));
        }
        let mut frame = self.loops.pop()?;
        loop {
            if frame.kind != LoopKind::For {
                return Err(error!(Loop));
            }
            match named {
                Some(name) if name != frame.var => frame = self.loops.pop()?,
                _ => break,
            }
        }
        let t = self.get_var(frame.var)? + frame.step;
        self.set_var(frame.var, t)?;
        let step = frame.step;
        if step == 0.0 || (step > 0.0 && t <= frame.limit) || (step < 0.0 && t >= frame.limit) {
            self.loops.push(frame)?;
            self.resume(frame.pos);
        }
        self.next_token();
        Ok(())
    }

    pub(super) fn while_statement(&mut self) -> Result<()> {
        let start = self.location();
        self.push_loop(LoopFrame::block(LoopKind::While, self.position()))?;
        if self.expect_expression()? == 0.0 {
            self.loops.pop()?;
            self.restore(start);
            self.next_token();
            self.find_bracket(Word::While, Word::Wend)?;
            self.next_token();
        }
        Ok(())
    }

    pub(super) fn wend_statement(&mut self) -> Result<()> {
        let after = self.location();
        let frame = self.loops.pop()?;
        if frame.kind != LoopKind::While {
            return Err(error!(@Wend));
        }
        self.resume(frame.pos);
        self.loops.push(frame)?;
        if self.expect_expression()? == 0.0 {
            self.loops.pop()?;
            self.restore(after);
            self.next_token();
        }
        Ok(())
    }

    pub(super) fn repeat_statement(&mut self) -> Result<()> {
        self.push_loop(LoopFrame::block(LoopKind::Repeat, self.position()))?;
        self.next_token();
        Ok(())
    }

    pub(super) fn until_statement(&mut self) -> Result<()> {
        let done = self.expect_expression()? != 0.0;
        let frame = self.loops.pop()?;
        if frame.kind != LoopKind::Repeat {
            return Err(error!(@Until));
        }
        if !done {
            self.loops.push(frame)?;
            self.resume(frame.pos);
        }
        self.next_token();
        Ok(())
    }

    pub(super) fn break_statement(&mut self) -> Result<()> {
        let frame = self.loops.pop()?;
        let (bra, ket) = frame.kind.brackets();
        match frame.kind {
            LoopKind::For => self.skip_for_body(),
            LoopKind::While => {
                self.find_bracket(bra, ket)?;
                self.next_token();
                Ok(())
            }
            LoopKind::Repeat => {
                self.find_bracket(bra, ket)?;
                self.next_token();
                self.skip_to_term();
                Ok(())
            }
        }
    }

    /// Inside a program, go on to the closing keyword of the innermost loop.
    /// Typed directly, continue the program where it starts or at a line.
    pub(super) fn cont_statement(&mut self) -> Result<()> {
        if self.mode == Mode::Run {
            let frame = *self.loops.last().ok_or_else(|| error!(Loop))?;
            let (bra, ket) = frame.kind.brackets();
            self.next_token();
            return self.find_bracket(bra, ket);
        }
        self.next_token();
        if self.is_term() {
            self.start_program();
            Ok(())
        } else {
            let line = self.evaluate()?;
            self.jump(line)
        }
    }

    pub(super) fn switch_statement(&mut self) -> Result<()> {
        let r = self.expect_expression()?;
        let start = self.location();
        loop {
            match &self.token {
                Token::Eol | Token::Word(Word::Swend) => break,
                Token::Word(Word::Switch) => {
                    self.next_token();
                    self.find_bracket(Word::Switch, Word::Swend)?;
                    self.next_token();
                }
                Token::Word(Word::Case) => {
                    self.next_token();
                    let values = self.arguments()?;
                    if values.is_empty() {
                        return Err(error!(@Case));
                    }
                    if values.iter().any(|v| equal(*v, r)) {
                        return Ok(());
                    }
                }
                _ => {
                    self.next_token();
                }
            }
        }
        self.restore(start);
        Ok(())
    }

    /// A CASE reached by running off the end of the previous case.
    pub(super) fn case_statement(&mut self) -> Result<()> {
        self.next_token();
        self.find_bracket(Word::Switch, Word::Swend)
    }

    fn goto_or_gosub(&self) -> Option<bool> {
        match &self.token {
            Token::Word(Word::Goto) => Some(false),
            Token::Word(Word::Gosub) => Some(true),
            _ => None,
        }
    }

    pub(super) fn millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn timer_mut(&mut self, every: bool) -> &mut Timer {
        if every {
            &mut self.every
        } else {
            &mut self.after
        }
    }

    /// `AFTER t GOTO|GOSUB l`, `EVERY t GOTO|GOSUB l`, or just `AFTER t`.
    pub(super) fn timer_statement(&mut self, every: bool) -> Result<()> {
        let interval = self.expect_expression()?;
        let now = self.millis();
        match self.goto_or_gosub() {
            Some(gosub) => {
                let line = to_line_number(self.expect_expression()?)?;
                *self.timer_mut(every) = Timer {
                    interval: interval.max(0.0) as u64,
                    last: now,
                    line: Some(line),
                    gosub,
                    armed: interval > 0.0,
                };
            }
            None if self.is_term() => {
                let timer = self.timer_mut(every);
                if interval <= 0.0 {
                    timer.armed = false;
                } else if timer.line.is_some() {
                    timer.interval = interval as u64;
                    timer.last = now;
                    timer.armed = true;
                } else {
                    return Err(error!(Args));
                }
            }
            None => return Err(error!(Syntax)),
        }
        Ok(())
    }

    pub(super) fn event_statement(&mut self) -> Result<()> {
        match self.next_token() {
            Token::Word(Word::Stop) => {
                self.events_enabled = false;
                self.next_token();
                return Ok(());
            }
            Token::Word(Word::Cont) => {
                self.events_enabled = true;
                self.next_token();
                return Ok(());
            }
            _ => {}
        }
        let id = self.evaluate()? as i32;
        match self.goto_or_gosub() {
            Some(gosub) => {
                let line = to_line_number(self.expect_expression()?)?;
                let slot = EventSlot {
                    id,
                    line,
                    gosub,
                    raised: false,
                };
                match self.events.iter().position(|e| e.id == id) {
                    Some(index) => self.events[index] = slot,
                    None if self.events.len() < EVENT_SLOTS => self.events.push(slot),
                    None => return Err(error!(Args)),
                }
            }
            None if self.is_term() => self.events.retain(|e| e.id != id),
            None => return Err(error!(Syntax)),
        }
        Ok(())
    }

    /// `ERROR GOTO l`, `ERROR CONT` or `ERROR STOP`.
    pub(super) fn error_statement(&mut self) -> Result<()> {
        match self.next_token() {
            Token::Word(Word::Goto) => {
                let line = to_line_number(self.expect_expression()?)?;
                self.on_error = ErrorHandler::Goto(line);
                return Ok(());
            }
            Token::Word(Word::Cont) => self.on_error = ErrorHandler::Cont,
            Token::Word(Word::Stop) => self.on_error = ErrorHandler::Stop,
            _ => return Err(error!(Args)),
        }
        self.next_token();
        Ok(())
    }

    /// `ON x GOTO|GOSUB l1, l2, ...`; out of range values fall through.
    pub(super) fn on_statement(&mut self) -> Result<()> {
        if self.next_token().is_word(Word::Error) {
            return self.error_statement();
        }
        let x = self.evaluate()?;
        let gosub = self.goto_or_gosub().ok_or_else(|| error!(Syntax))?;
        self.next_token();
        let targets = self.arguments()?;
        if x < 1.0 || x as usize > targets.len() {
            return Ok(());
        }
        if gosub {
            self.push_gosub(false)?;
        }
        self.jump(targets[x as usize - 1])
    }

    /// Save the current token for RETURN to read again.
    pub(super) fn push_gosub(&mut self, event: bool) -> Result<()> {
        if self.fn_depth > 0 && !event {
            return Err(error!(Function));
        }
        let pos = self.position_of_token();
        self.gosubs.push(CallFrame { pos, event })
    }

    /// Fire a due timer or a raised event. Only called between
    /// statements at a line boundary, `:` or NEXT.
    pub(super) fn service_timers(&mut self) -> Result<()> {
        let now = self.millis();
        if let Some(line) = self.after.due(now) {
            self.after.armed = false;
            debug!(target: "basic::exec", "AFTER fired, line {}", line);
            return self.fire(line, self.after.gosub, false);
        }
        if let Some(line) = self.every.due(now) {
            self.every.last = now;
            debug!(target: "basic::exec", "EVERY fired, line {}", line);
            return self.fire(line, self.every.gosub, false);
        }
        if !self.events_enabled || self.events.is_empty() {
            return Ok(());
        }
        let count = self.events.len();
        for k in 0..count {
            let index = (self.next_event + k) % count;
            if self.events[index].raised {
                let slot = self.events[index];
                self.events[index].raised = false;
                self.events_enabled = false;
                self.next_event = (index + 1) % count;
                debug!(target: "basic::exec", "EVENT {} fired, line {}", slot.id, slot.line);
                return self.fire(slot.line, slot.gosub, true);
            }
        }
        Ok(())
    }

    fn fire(&mut self, line: LineNumber, gosub: bool, event: bool) -> Result<()> {
        if gosub {
            let pos = self.position_of_token();
            self.gosubs.push(CallFrame { pos, event })?;
        }
        self.jump(line as Number)
    }
}
