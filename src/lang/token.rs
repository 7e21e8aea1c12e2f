use super::{Address, LineNumber, Name, Number};

/// Byte codes of the tokens that carry a payload in the arena.
/// Plain characters keep their ASCII value, keywords start at `BASEKEYWORD`.
pub mod code {
    pub const NUMBER: u8 = 0x81;
    pub const LINENUMBER: u8 = 0x82;
    pub const STRING: u8 = 0x83;
    pub const VARIABLE: u8 = 0x84;
    pub const STRINGVAR: u8 = 0x85;
    pub const ARRAYVAR: u8 = 0x86;
    pub const GREATEREQUAL: u8 = 0x87;
    pub const LESSEREQUAL: u8 = 0x88;
    pub const NOTEQUAL: u8 = 0x89;
    pub const BASEKEYWORD: u8 = 0x8A;
    pub const BUFFER: u8 = 0xFE;

    pub const NUMSIZE: usize = 8;
    pub const ADDRSIZE: usize = 2;
}

use code::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eol,
    Number(Number),
    LineNumber(LineNumber),
    Str(Vec<u8>),
    Variable(Name),
    StringVar(Name),
    ArrayVar(Name),
    GreaterEqual,
    LesserEqual,
    NotEqual,
    Word(Word),
    Char(u8),
}

impl Token {
    pub fn is_char(&self, ch: u8) -> bool {
        matches!(self, Token::Char(c) if *c == ch)
    }

    pub fn is_word(&self, word: Word) -> bool {
        matches!(self, Token::Word(w) if *w == word)
    }

    /// The one byte this token starts with in the arena.
    pub fn code(&self) -> u8 {
        match self {
            Token::Eol => 0,
            Token::Number(_) => NUMBER,
            Token::LineNumber(_) => LINENUMBER,
            Token::Str(_) => STRING,
            Token::Variable(_) => VARIABLE,
            Token::StringVar(_) => STRINGVAR,
            Token::ArrayVar(_) => ARRAYVAR,
            Token::GreaterEqual => GREATEREQUAL,
            Token::LesserEqual => LESSEREQUAL,
            Token::NotEqual => NOTEQUAL,
            Token::Word(w) => w.code(),
            Token::Char(c) => *c,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Token::Eol => {}
            Token::Number(n) => {
                out.push(NUMBER);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Token::LineNumber(l) => {
                out.push(LINENUMBER);
                out.extend_from_slice(&l.to_le_bytes());
            }
            Token::Str(s) => {
                let len = s.len().min(u8::max_value() as usize);
                out.push(STRING);
                out.push(len as u8);
                out.extend_from_slice(&s[..len]);
            }
            Token::Variable(n) | Token::StringVar(n) | Token::ArrayVar(n) => {
                out.push(self.code());
                out.push(n.c);
                out.push(n.d);
            }
            _ => out.push(self.code()),
        }
    }

    /// Read one token at `at` through `byte`, stopping at `end`.
    /// Returns the token and the address after it.
    pub fn decode<F>(byte: F, at: Address, end: Address) -> (Token, Address)
    where
        F: Fn(Address) -> u8,
    {
        if at >= end {
            return (Token::Eol, at);
        }
        let c = byte(at);
        let token = match c {
            NUMBER => {
                let mut bytes = [0u8; NUMSIZE];
                for (i, b) in bytes.iter_mut().enumerate() {
                    *b = byte(at + 1 + i);
                }
                return (Token::Number(Number::from_le_bytes(bytes)), at + 1 + NUMSIZE);
            }
            LINENUMBER => {
                let l = byte(at + 1) as LineNumber | (byte(at + 2) as LineNumber) << 8;
                return (Token::LineNumber(l), at + 1 + ADDRSIZE);
            }
            STRING => {
                let len = byte(at + 1) as usize;
                let s = (0..len).map(|i| byte(at + 2 + i)).collect();
                return (Token::Str(s), at + 2 + len);
            }
            VARIABLE | STRINGVAR | ARRAYVAR => {
                let name = Name::new(byte(at + 1), byte(at + 2));
                let token = match c {
                    VARIABLE => Token::Variable(name),
                    STRINGVAR => Token::StringVar(name),
                    _ => Token::ArrayVar(name),
                };
                return (token, at + 3);
            }
            GREATEREQUAL => Token::GreaterEqual,
            LESSEREQUAL => Token::LesserEqual,
            NOTEQUAL => Token::NotEqual,
            c => match Word::from_code(c) {
                Some(w) => Token::Word(w),
                None => Token::Char(c),
            },
        };
        (token, at + 1)
    }

    /// Size in the arena of the token starting with `code`, without decoding the payload.
    pub fn stored_len<F>(byte: F, at: Address) -> usize
    where
        F: Fn(Address) -> u8,
    {
        match byte(at) {
            NUMBER => 1 + NUMSIZE,
            LINENUMBER => 1 + ADDRSIZE,
            STRING => 2 + byte(at + 1) as usize,
            VARIABLE | STRINGVAR | ARRAYVAR => 3,
            _ => 1,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Token::*;
        match self {
            Eol => Ok(()),
            Number(n) => write!(f, "{}", super::listing_number(*n)),
            LineNumber(l) => write!(f, "{}", l),
            Str(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
            Variable(n) | ArrayVar(n) => write!(f, "{}", n),
            StringVar(n) => write!(f, "{}$", n),
            GreaterEqual => write!(f, ">="),
            LesserEqual => write!(f, "<="),
            NotEqual => write!(f, "<>"),
            Word(w) => write!(f, "{}", w),
            Char(c) => write!(f, "{}", *c as char),
        }
    }
}

macro_rules! words {
    ($($word:ident => $text:expr,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Word {
            $($word,)*
        }

        const WORDS: &[(Word, &str)] = &[$((Word::$word, $text),)*];
    };
}

words! {
    Print => "PRINT",
    Let => "LET",
    Input => "INPUT",
    Goto => "GOTO",
    Gosub => "GOSUB",
    Return => "RETURN",
    If => "IF",
    For => "FOR",
    To => "TO",
    Step => "STEP",
    Next => "NEXT",
    Stop => "STOP",
    List => "LIST",
    New => "NEW",
    Run => "RUN",
    Abs => "ABS",
    Rnd => "RND",
    Size => "SIZE",
    Rem => "REM",
    Not => "NOT",
    And => "AND",
    Or => "OR",
    Len => "LEN",
    Sgn => "SGN",
    Peek => "PEEK",
    Dim => "DIM",
    Clr => "CLR",
    Himem => "HIMEM",
    Tab => "TAB",
    Then => "THEN",
    End => "END",
    Poke => "POKE",
    Cont => "CONT",
    Sqr => "SQR",
    Pow => "POW",
    Map => "MAP",
    Dump => "DUMP",
    Break => "BREAK",
    Save => "SAVE",
    Load => "LOAD",
    Cls => "CLS",
    Else => "ELSE",
    Sin => "SIN",
    Cos => "COS",
    Tan => "TAN",
    Atan => "ATAN",
    Log => "LOG",
    Exp => "EXP",
    Int => "INT",
    Data => "DATA",
    Read => "READ",
    Restore => "RESTORE",
    Def => "DEF",
    Fn => "FN",
    On => "ON",
    Malloc => "MALLOC",
    Find => "FIND",
    Eval => "EVAL",
    Error => "ERROR",
    Avail => "AVAIL",
    Str => "STR",
    Instr => "INSTR",
    Val => "VAL",
    After => "AFTER",
    Every => "EVERY",
    Event => "EVENT",
    While => "WHILE",
    Wend => "WEND",
    Repeat => "REPEAT",
    Until => "UNTIL",
    Switch => "SWITCH",
    Case => "CASE",
    Swend => "SWEND",
    Do => "DO",
    Dend => "DEND",
    Fend => "FEND",
    Asc => "ASC",
    Chr => "CHR",
    Right => "RIGHT",
    Left => "LEFT",
    Mid => "MID",
    Get => "GET",
    Put => "PUT",
    Delay => "DELAY",
    Millis => "MILLIS",
}

impl Word {
    pub fn code(self) -> u8 {
        BASEKEYWORD + self as u8
    }

    pub fn from_code(code: u8) -> Option<Word> {
        let index = code.checked_sub(BASEKEYWORD)? as usize;
        WORDS.get(index).map(|(w, _)| *w)
    }

    pub fn as_str(self) -> &'static str {
        WORDS[self as usize].1
    }

    /// The longest keyword that `word` starts with.
    pub fn longest_prefix(word: &[u8]) -> Option<Word> {
        WORDS
            .iter()
            .filter(|(_, text)| word.starts_with(text.as_bytes()))
            .max_by_key(|(_, text)| text.len())
            .map(|(w, _)| *w)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_codes_roundtrip() {
        for (w, _) in WORDS {
            assert_eq!(Word::from_code(w.code()), Some(*w));
            assert!(w.code() < BUFFER);
        }
        assert_eq!(Word::from_code(b'A'), None);
    }

    #[test]
    fn test_longest_prefix() {
        assert_eq!(Word::longest_prefix(b"FORI"), Some(Word::For));
        assert_eq!(Word::longest_prefix(b"INSTR"), Some(Word::Instr));
        assert_eq!(Word::longest_prefix(b"INT"), Some(Word::Int));
        assert_eq!(Word::longest_prefix(b"PICKLES"), None);
    }

    #[test]
    fn test_decode_string() {
        let mut bytes = vec![];
        Token::Str(b"HI".to_vec()).encode(&mut bytes);
        Token::Word(Word::Print).encode(&mut bytes);
        let (t, next) = Token::decode(|a| bytes[a], 0, bytes.len());
        assert_eq!(t, Token::Str(b"HI".to_vec()));
        let (t, next) = Token::decode(|a| bytes[a], next, bytes.len());
        assert_eq!(t, Token::Word(Word::Print));
        assert_eq!(Token::decode(|a| bytes[a], next, bytes.len()).0, Token::Eol);
    }
}
