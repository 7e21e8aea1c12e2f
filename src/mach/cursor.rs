use super::runtime::{Mode, Runtime};
use crate::error;
use crate::lang::code::ADDRSIZE;
use crate::lang::{Address, Error, LineNumber, Number, Token, Word};

type Result<T> = std::result::Result<T, Error>;

/// Where tokens are decoded from: the tokenized direct line
/// or the program region of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Direct,
    Program,
}

/// A place to come back to, as kept on the GOSUB and loop stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub source: Source,
    pub here: Address,
}

/// The full cursor, for look ahead and restore.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    source: Source,
    here: Address,
    token_at: Address,
    token: Token,
}

pub fn to_line_number(n: Number) -> Result<LineNumber> {
    if n < 0.0 || n > LineNumber::max_value() as Number {
        return Err(error!(UnknownLine));
    }
    Ok(n as LineNumber)
}

impl Runtime {
    fn byte(&self, at: Address) -> u8 {
        match self.source {
            Source::Direct => self.direct.get(at).copied().unwrap_or(0),
            Source::Program => self.arena.read(at),
        }
    }

    fn source_end(&self) -> Address {
        match self.source {
            Source::Direct => self.direct.len(),
            Source::Program => self.arena.top(),
        }
    }

    /// Advance to the next token. Stays on `Eol` at the end of the source.
    pub(super) fn next_token(&mut self) -> &Token {
        let (token, next) = Token::decode(|a| self.byte(a), self.here, self.source_end());
        self.token_at = self.here;
        self.here = next;
        self.token = token;
        &self.token
    }

    pub(super) fn location(&self) -> Location {
        Location {
            source: self.source,
            here: self.here,
            token_at: self.token_at,
            token: self.token.clone(),
        }
    }

    pub(super) fn restore(&mut self, location: Location) {
        self.source = location.source;
        self.here = location.here;
        self.token_at = location.token_at;
        self.token = location.token;
    }

    pub(super) fn position(&self) -> Position {
        Position {
            source: self.source,
            here: self.here,
        }
    }

    /// The start of the current token, so it is read again after a return.
    pub(super) fn position_of_token(&self) -> Position {
        Position {
            source: self.source,
            here: self.token_at,
        }
    }

    /// Continue reading at a saved position. The current token
    /// is stale until the next `next_token`.
    pub(super) fn resume(&mut self, position: Position) {
        self.source = position.source;
        self.here = position.here;
        if position.source == Source::Direct {
            self.mode = Mode::Interactive;
        }
    }

    /// Move to a program line. This is how a direct GOTO starts running.
    pub(super) fn jump(&mut self, line: Number) -> Result<()> {
        let number = to_line_number(line)?;
        let at = self.arena.find_line(number)?;
        self.source = Source::Program;
        self.here = at;
        self.token_at = at - 1 - ADDRSIZE;
        self.token = Token::LineNumber(number);
        self.mode = Mode::Run;
        Ok(())
    }

    /// Tokens that end a statement.
    pub(super) fn is_term(&self) -> bool {
        match &self.token {
            Token::Eol | Token::LineNumber(_) => true,
            Token::Char(b':') => true,
            Token::Word(Word::Else) => true,
            _ => false,
        }
    }

    pub(super) fn skip_to_term(&mut self) {
        while !self.is_term() {
            self.next_token();
        }
    }

    /// Skip to the end of the line, or to an ELSE when `stop_at_else`.
    pub(super) fn skip_line(&mut self, stop_at_else: bool) {
        loop {
            match &self.token {
                Token::Eol | Token::LineNumber(_) => return,
                Token::Word(Word::Else) if stop_at_else => return,
                _ => {}
            }
            self.next_token();
        }
    }

    /// Scan forward to the `ket` that balances the current level,
    /// counting nested `bra`. Stops on the `ket`.
    pub(super) fn find_bracket(&mut self, bra: Word, ket: Word) -> Result<()> {
        let mut depth = 0;
        loop {
            if self.token.is_word(ket) {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            if self.token.is_word(bra) {
                depth += 1;
            }
            if self.token == Token::Eol {
                return Err(Error::keyword(bra));
            }
            self.next_token();
        }
    }

    pub(super) fn expect_char(&mut self, c: u8) -> Result<()> {
        if self.next_token().is_char(c) {
            Ok(())
        } else {
            Err(error!(Syntax))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mach::Runtime;

    #[test]
    fn test_find_bracket_balances() {
        let mut r = Runtime::default();
        r.load_listing("10 WHILE 1: WHILE 0: WEND: PRINT 1: WEND: PRINT 2\n")
            .unwrap();
        r.jump(10.0).unwrap();
        r.next_token();
        r.next_token();
        r.find_bracket(crate::lang::Word::While, crate::lang::Word::Wend)
            .unwrap();
        r.next_token();
        r.next_token();
        assert!(r.token.is_word(crate::lang::Word::Print));
        assert_eq!(r.next_token().clone(), crate::lang::Token::Number(2.0));
    }

    #[test]
    fn test_jump_to_missing_line() {
        let mut r = Runtime::default();
        assert_eq!(r.jump(10.0), Err(crate::error!(UnknownLine)));
        assert_eq!(r.jump(-1.0), Err(crate::error!(UnknownLine)));
    }
}
