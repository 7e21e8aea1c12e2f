use super::code::*;
use super::Word;

/// A two byte variable name: a letter or `@`, then an optional letter or digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Name {
    pub c: u8,
    pub d: u8,
}

impl Name {
    pub const fn new(c: u8, d: u8) -> Name {
        Name { c, d }
    }

    /// Raw buffers are named by the two bytes of their number.
    pub fn buffer(n: u16) -> Name {
        Name {
            c: (n % 256) as u8,
            d: (n / 256) as u8,
        }
    }

    pub fn is_special(&self) -> bool {
        self.c == b'@'
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.c as char)?;
        if self.d != 0 {
            write!(f, "{}", self.d as char)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Variable,
    Array,
    String,
    Function,
    Buffer,
}

impl Kind {
    /// The byte stored in a heap header.
    pub fn tag(self) -> u8 {
        match self {
            Kind::Variable => VARIABLE,
            Kind::Array => ARRAYVAR,
            Kind::String => STRINGVAR,
            Kind::Function => Word::Fn.code(),
            Kind::Buffer => BUFFER,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Kind> {
        Some(match tag {
            VARIABLE => Kind::Variable,
            ARRAYVAR => Kind::Array,
            STRINGVAR => Kind::String,
            BUFFER => Kind::Buffer,
            t if t == Word::Fn.code() => Kind::Function,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_display() {
        assert_eq!(Name::new(b'A', 0).to_string(), "A");
        assert_eq!(Name::new(b'B', b'7').to_string(), "B7");
    }

    #[test]
    fn test_kind_tags() {
        for k in &[Kind::Variable, Kind::Array, Kind::String, Kind::Function, Kind::Buffer] {
            assert_eq!(Kind::from_tag(k.tag()), Some(*k));
        }
        assert_eq!(Kind::from_tag(0), None);
    }

    #[test]
    fn test_buffer_name() {
        assert_eq!(Name::buffer(258), Name::new(2, 1));
    }
}
