use super::{parse_number, Name, Token, Word};
use tracing::trace;

/// Tokenize one line of text.
pub fn lex(s: &str, case_fold: bool) -> Vec<Token> {
    let tokens: Vec<Token> = Lexer::new(s.as_bytes(), case_fold).collect();
    trace!(target: "basic::lex", "{} tokens from {:?}", tokens.len(), s);
    tokens
}

fn is_basic_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

fn is_basic_eol(c: u8) -> bool {
    c == b'\r' || c == b'\n' || c == 0
}

fn is_basic_letter(c: u8) -> bool {
    (b'@'..=b'Z').contains(&c)
}

/// Produces tokens up to the end of the line, then stops.
/// There are no lexical errors; nonsense is rejected when executed.
pub struct Lexer<'a> {
    s: &'a [u8],
    pos: usize,
    case_fold: bool,
    remark: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(s: &'a [u8], case_fold: bool) -> Lexer<'a> {
        Lexer {
            s,
            pos: 0,
            case_fold,
            remark: false,
        }
    }

    fn peek(&self) -> Option<u8> {
        match self.s.get(self.pos) {
            Some(c) if !is_basic_eol(*c) => Some(*c),
            _ => None,
        }
    }

    fn peek_folded(&self, at: usize) -> Option<u8> {
        let c = *self.s.get(at)?;
        if self.case_fold && c.is_ascii_lowercase() {
            Some(c.to_ascii_uppercase())
        } else {
            Some(c)
        }
    }

    fn whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !is_basic_whitespace(c) {
                break;
            }
            self.pos += 1;
        }
    }

    fn number(&mut self) -> Token {
        let (n, len) = parse_number(&self.s[self.pos..]);
        self.pos += len;
        Token::Number(n)
    }

    fn string(&mut self) -> Token {
        self.pos += 1;
        let mut s = vec![];
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == b'"' {
                break;
            }
            s.push(c);
        }
        Token::Str(s)
    }

    fn relation(&mut self, first: u8) -> Token {
        self.pos += 1;
        self.whitespace();
        let second = self.peek();
        let token = match (first, second) {
            (b'=', Some(b'>')) | (b'>', Some(b'=')) => Token::GreaterEqual,
            (b'=', Some(b'<')) | (b'<', Some(b'=')) => Token::LesserEqual,
            (b'<', Some(b'>')) => Token::NotEqual,
            _ => return Token::Char(first),
        };
        self.pos += 1;
        token
    }

    fn alphabetic(&mut self) -> Token {
        let mut word = vec![];
        while let Some(c) = self.peek_folded(self.pos + word.len()) {
            if !is_basic_letter(c) {
                break;
            }
            word.push(c);
        }
        if let Some(w) = Word::longest_prefix(&word) {
            self.pos += w.as_str().len();
            if w == Word::Rem {
                self.remark = true;
            }
            return Token::Word(w);
        }
        if word.len() > 2 {
            self.pos += 1;
            return Token::Char(word[0]);
        }
        let c = word[0];
        self.pos += 1;
        let mut d = 0;
        if let Some(n) = self.peek_folded(self.pos) {
            if n.is_ascii_digit() || n.is_ascii_uppercase() {
                d = n;
                self.pos += 1;
            }
        }
        let name = Name::new(c, d);
        if self.peek() == Some(b'$') {
            self.pos += 1;
            return Token::StringVar(name);
        }
        self.whitespace();
        if self.peek() == Some(b'(') {
            return Token::ArrayVar(name);
        }
        Token::Variable(name)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.remark {
            let c = self.peek()?;
            self.pos += 1;
            return Some(Token::Char(if c.is_ascii() { c } else { b'?' }));
        }
        self.whitespace();
        let c = self.peek()?;
        if c.is_ascii_digit() || c == b'.' {
            return Some(self.number());
        }
        if c == b'"' {
            return Some(self.string());
        }
        if b"+-*/%\\:,()".contains(&c) {
            self.pos += 1;
            return Some(Token::Char(c));
        }
        if c == b'=' || c == b'<' || c == b'>' {
            return Some(self.relation(c));
        }
        if c == b'?' {
            self.pos += 1;
            return Some(Token::Word(Word::Print));
        }
        let folded = self.peek_folded(self.pos).unwrap_or(c);
        if is_basic_letter(folded) {
            return Some(self.alphabetic());
        }
        self.pos += 1;
        Some(Token::Char(if c.is_ascii() { c } else { b'?' }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(s: &str) -> Name {
        let b = s.as_bytes();
        Name::new(b[0], *b.get(1).unwrap_or(&0))
    }

    #[test]
    fn test_line_number_and_print() {
        let t = lex("10 PRINT 1", true);
        assert_eq!(
            t,
            vec![
                Token::Number(10.0),
                Token::Word(Word::Print),
                Token::Number(1.0)
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_splits_word() {
        let t = lex("fori=1to3", true);
        assert_eq!(
            t,
            vec![
                Token::Word(Word::For),
                Token::Variable(var("I")),
                Token::Char(b'='),
                Token::Number(1.0),
                Token::Word(Word::To),
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_variables() {
        let t = lex("A1$ B ( C7", true);
        assert_eq!(
            t,
            vec![
                Token::StringVar(var("A1")),
                Token::ArrayVar(var("B")),
                Token::Char(b'('),
                Token::Variable(var("C7")),
            ]
        );
    }

    #[test]
    fn test_unknown_word_yields_first_char() {
        let t = lex("XYZ", true);
        assert_eq!(t[0], Token::Char(b'X'));
        assert_eq!(t[1], Token::Variable(var("YZ")));
    }

    #[test]
    fn test_relations() {
        assert_eq!(lex("= >", true), vec![Token::GreaterEqual]);
        assert_eq!(lex("=<", true), vec![Token::LesserEqual]);
        assert_eq!(lex("<>", true), vec![Token::NotEqual]);
        assert_eq!(lex("> =", true), vec![Token::GreaterEqual]);
        let t = lex("A<1", true);
        assert_eq!(t[1], Token::Char(b'<'));
    }

    #[test]
    fn test_string_to_eol() {
        let t = lex("PRINT \"HELLO", true);
        assert_eq!(t[1], Token::Str(b"HELLO".to_vec()));
    }

    #[test]
    fn test_remark_literal() {
        let t = lex("REM a b", true);
        assert_eq!(
            t,
            vec![
                Token::Word(Word::Rem),
                Token::Char(b' '),
                Token::Char(b'a'),
                Token::Char(b' '),
                Token::Char(b'b'),
            ]
        );
    }

    #[test]
    fn test_no_fold() {
        let t = lex("print", false);
        assert_eq!(t[0], Token::Char(b'p'));
    }

    #[test]
    fn test_question_mark_prints() {
        assert_eq!(lex("?", true), vec![Token::Word(Word::Print)]);
    }
}
