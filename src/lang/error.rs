use super::{LineNumber, Number, Word};

#[derive(Clone, PartialEq)]
pub struct Error {
    code: u16,
    word: Option<Word>,
    line_number: Option<LineNumber>,
    message: &'static str,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    (@$word:ident) => {
        $crate::lang::Error::keyword($crate::lang::Word::$word)
    };
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident, $line:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).in_line_number($line)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
    ($err:ident, $line:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_line_number($line)
            .message($msg)
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code: code as u16,
            word: None,
            line_number: None,
            message: "",
        }
    }

    /// Errors named after the statement that failed, like an unmatched `RETURN`.
    pub fn keyword(word: Word) -> Error {
        Error {
            code: ErrorCode::General as u16,
            word: Some(word),
            line_number: None,
            message: "",
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn word(&self) -> Option<Word> {
        self.word
    }

    pub fn line_number(&self) -> Option<LineNumber> {
        self.line_number
    }

    pub fn is_direct(&self) -> bool {
        self.line_number.is_none()
    }

    /// The value `ERROR` yields inside a handler. Keyword errors
    /// report the negative token code.
    pub fn number(&self) -> Number {
        match self.word {
            Some(word) => (word.code() as i8) as Number,
            None => self.code as Number,
        }
    }

    pub fn in_line_number(&self, line: LineNumber) -> Error {
        debug_assert!(self.line_number.is_none());
        Error {
            line_number: Some(line),
            ..self.clone()
        }
    }

    pub fn message(&self, message: &'static str) -> Error {
        debug_assert_eq!(self.message.len(), 0);
        Error {
            message,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    General = 9,
    Syntax = 10,
    Number = 11,
    DivByZero = 12,
    UnknownLine = 13,
    OutOfMemory = 14,
    Stack = 15,
    Range = 16,
    String = 17,
    Variable = 18,
    Loop = 19,
    File = 20,
    Function = 21,
    Args = 22,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let code_str = match self.code {
            9 => "Error",
            10 => "Syntax",
            11 => "Number",
            12 => "Div by 0",
            13 => "Unknown Line",
            14 => "Memory",
            15 => "Stack",
            16 => "Range",
            17 => "String",
            18 => "Variable",
            19 => "Loop",
            20 => "File",
            21 => "Function",
            22 => "Args",
            _ => "",
        };
        if let Some(line_number) = self.line_number {
            write!(f, "{}: ", line_number)?;
        }
        match self.word {
            Some(word) => write!(f, "{} Error", word)?,
            None if code_str.is_empty() => write!(f, "Error {}", self.code)?,
            None => write!(f, "{} Error", code_str)?,
        }
        if !self.message.is_empty() {
            write!(f, "; {}", self.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_error() {
        assert_eq!(error!(DivByZero).to_string(), "Div by 0 Error");
    }

    #[test]
    fn test_error_in_line() {
        assert_eq!(error!(UnknownLine, 20).to_string(), "20: Unknown Line Error");
    }

    #[test]
    fn test_keyword_error() {
        let e = error!(@Return);
        assert_eq!(e.to_string(), "RETURN Error");
        assert!(e.number() < 0.0);
    }

    #[test]
    fn test_error_message() {
        let e = error!(OutOfMemory; "HEAP");
        assert_eq!(e.to_string(), "Memory Error; HEAP");
        assert_eq!(e.number(), 14.0);
    }
}
