use super::arena::Arena;
use super::program::LineSpan;
use super::runtime::Runtime;
use crate::lang::{listing_number, LineNumber, Token, Word};

/// ## Program text from stored tokens
///
/// Spacing is put back the way LIST always showed it, so
/// the text lexes to the same tokens again.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Last {
    Start,
    LineNumber,
    Number,
    Variable,
    Other,
}

struct Writer {
    text: String,
    last: Last,
    space_after: bool,
    literal: bool,
}

impl Writer {
    fn new() -> Writer {
        Writer {
            text: String::new(),
            last: Last::Start,
            space_after: false,
            literal: false,
        }
    }

    fn space(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with(' ') {
            self.text.push(' ');
        }
    }

    fn after_operand(&self) -> bool {
        self.last == Last::Number || self.last == Last::Variable
    }

    fn token(&mut self, token: &Token) {
        match token {
            Token::LineNumber(_) => self.literal = false,
            Token::Word(Word::Rem) => self.literal = true,
            _ => {}
        }
        if self.space_after {
            match token {
                Token::Char(b'(') | Token::Char(b':') | Token::Char(b'$') => {}
                Token::LineNumber(_) | Token::Eol => {}
                _ => self.space(),
            }
            self.space_after = false;
        }
        let last = match token {
            Token::Eol => return,
            Token::Number(n) => {
                self.text.push_str(&listing_number(*n));
                Last::Number
            }
            Token::LineNumber(n) => {
                self.text.push_str(&format!("{} ", n));
                Last::LineNumber
            }
            Token::Variable(_) | Token::ArrayVar(_) | Token::StringVar(_) => {
                if self.last == Last::Number {
                    self.space();
                }
                self.text.push_str(&token.to_string());
                match token {
                    Token::Variable(_) => Last::Variable,
                    _ => Last::Other,
                }
            }
            Token::Str(_) => {
                self.text.push_str(&token.to_string());
                Last::Other
            }
            Token::GreaterEqual | Token::LesserEqual | Token::NotEqual => {
                if self.after_operand() {
                    self.space();
                }
                self.text.push_str(&token.to_string());
                Last::Other
            }
            Token::Word(word) => {
                let spaced = matches!(
                    word,
                    Word::Then
                        | Word::Else
                        | Word::To
                        | Word::Step
                        | Word::Goto
                        | Word::Gosub
                        | Word::Or
                        | Word::And
                );
                if (spaced && self.last != Last::LineNumber) || self.after_operand() {
                    self.space();
                }
                self.text.push_str(word.as_str());
                self.space_after = *word != Word::Rem && *word != Word::Fn;
                Last::Other
            }
            Token::Char(c) => {
                self.text.push(*c as char);
                if *c == b':' && !self.literal {
                    self.text.push(' ');
                }
                Last::Other
            }
        };
        self.last = last;
    }
}

fn line_text(arena: &Arena, span: &LineSpan) -> String {
    let mut w = Writer::new();
    let mut at = span.start;
    while at < span.end {
        let (token, next) = arena.token(at);
        w.token(&token);
        at = next;
    }
    w.text
}

impl Runtime {
    /// Lines `from..=to`, one per text line.
    pub(super) fn list_lines(&self, from: LineNumber, to: LineNumber) -> String {
        let mut s = String::new();
        for span in self.arena.lines() {
            if span.number >= from && span.number <= to {
                s.push_str(&line_text(&self.arena, &span));
                s.push('\n');
            }
        }
        s
    }

    /// The whole program as text.
    pub fn listing(&self) -> String {
        self.list_lines(0, LineNumber::max_value())
    }
}

#[cfg(test)]
mod tests {
    use crate::mach::Runtime;

    fn relist(s: &str) -> String {
        let mut r = Runtime::default();
        r.load_listing(s).unwrap();
        r.listing()
    }

    #[test]
    fn test_listing_spacing() {
        let s = "10 FOR I=1 TO 3 STEP 2: PRINT I: NEXT I\n";
        assert_eq!(relist(s), s);
        let s = "20 IF A >=2 AND B$=\"X\" THEN GOSUB 100 ELSE END\n";
        assert_eq!(relist(s), s);
    }

    #[test]
    fn test_listing_normalises_case_and_space() {
        assert_eq!(relist("10 print  a ; \"x\"\n"), "10 PRINT A;\"x\"\n");
    }

    #[test]
    fn test_remark_kept_literally() {
        let s = "10 REM a: b\n";
        assert_eq!(relist(s), s);
    }

    #[test]
    fn test_listing_round_trip() {
        let s = "10 DEF FNF(X)=X*2\n20 A$(2,3)=LEFT$(B$,1)\n30 WHILE X<3: X=X+1: WEND\n";
        let once = relist(s);
        assert_eq!(relist(&once), once);
        assert_eq!(once, s);
    }
}
