use super::arena::Arena;
use crate::error;
use crate::lang::code::{ADDRSIZE, LINENUMBER};
use crate::lang::{Address, Error, LineNumber, Token};
use tracing::trace;

type Result<T> = std::result::Result<T, Error>;

/// ## Recently resolved line numbers
///
/// Filled round robin. Lookup stops at the first empty slot.

#[derive(Debug)]
pub struct LineCache {
    entries: Vec<Option<(LineNumber, Address)>>,
    next: usize,
}

impl LineCache {
    pub fn new(capacity: usize) -> LineCache {
        LineCache {
            entries: vec![None; capacity],
            next: 0,
        }
    }

    pub fn clear(&mut self) {
        for e in self.entries.iter_mut() {
            *e = None;
        }
        self.next = 0;
    }

    fn get(&self, number: LineNumber) -> Option<Address> {
        for entry in &self.entries {
            match entry {
                Some((n, a)) if *n == number => return Some(*a),
                Some(_) => continue,
                None => break,
            }
        }
        None
    }

    fn insert(&mut self, number: LineNumber, address: Address) {
        if self.entries.is_empty() {
            return;
        }
        self.entries[self.next] = Some((number, address));
        self.next = (self.next + 1) % self.entries.len();
    }
}

/// One stored line: its number and the span from its LineNumber
/// token to the start of the next line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSpan {
    pub number: LineNumber,
    pub start: Address,
    pub end: Address,
}

impl Arena {
    fn skip_token(&self, at: Address) -> Address {
        at + Token::stored_len(|a| self.read(a), at)
    }

    /// The first LineNumber token at or after `at`, or `top`.
    fn line_start(&self, mut at: Address) -> Address {
        while at < self.top && self.read(at) != LINENUMBER {
            at = self.skip_token(at);
        }
        at.min(self.top)
    }

    fn span_at(&self, start: Address) -> LineSpan {
        LineSpan {
            number: self.address(start + 1) as LineNumber,
            start,
            end: self.line_start(start + 1 + ADDRSIZE),
        }
    }

    /// Every stored line in ascending order.
    pub fn lines(&self) -> Vec<LineSpan> {
        let mut v = vec![];
        let mut at = self.line_start(0);
        while at < self.top {
            let span = self.span_at(at);
            at = span.end;
            v.push(span);
        }
        v
    }

    /// Insert, replace or delete a line. `body` holds the encoded
    /// statement tokens; an empty body deletes the line.
    pub fn store_line(&mut self, number: LineNumber, body: &[u8]) -> Result<()> {
        let mut start = self.line_start(0);
        let mut old_len = 0;
        while start < self.top {
            let span = self.span_at(start);
            if span.number == number {
                old_len = span.end - span.start;
                break;
            }
            if span.number > number {
                break;
            }
            start = span.end;
        }
        let mut line = vec![];
        if !body.is_empty() {
            Token::LineNumber(number).encode(&mut line);
            line.extend_from_slice(body);
        }
        if old_len == 0 && line.is_empty() {
            return Ok(());
        }
        let new_top = self.top - old_len + line.len();
        if new_top > self.himem {
            return Err(error!(OutOfMemory));
        }
        let tail = start + old_len;
        self.move_block(tail, self.top - tail, start + line.len())?;
        if new_top < self.top {
            self.zero_block(new_top, self.top - new_top)?;
        }
        for (i, b) in line.iter().enumerate() {
            self.write(start + i, *b);
        }
        self.top = new_top;
        self.lines.clear();
        trace!(target: "basic::program", "line {} stored, top {}", number, self.top);
        Ok(())
    }

    /// The address right after the LineNumber token of `number`.
    pub fn find_line(&mut self, number: LineNumber) -> Result<Address> {
        if let Some(a) = self.lines.get(number) {
            return Ok(a);
        }
        let mut at = self.line_start(0);
        while at < self.top {
            if self.address(at + 1) as LineNumber == number {
                let a = at + 1 + ADDRSIZE;
                self.lines.insert(number, a);
                return Ok(a);
            }
            at = self.line_start(at + 1 + ADDRSIZE);
        }
        Err(error!(UnknownLine))
    }

    /// The start of the line after the one containing `at`, or `top`.
    pub fn next_line(&self, at: Address) -> Address {
        let mut at = at;
        while at < self.top && self.read(at) == LINENUMBER {
            at = self.skip_token(at);
        }
        self.line_start(at)
    }

    /// Number of the line a cursor at `here` is in. A cursor just past
    /// a LineNumber token still belongs to the line before.
    pub fn line_of(&self, here: Address) -> LineNumber {
        let mut line = 0;
        let mut previous = 0;
        let mut at = 0;
        let mut last_was_line = false;
        while at < self.top {
            let next = self.skip_token(at);
            last_was_line = self.read(at) == LINENUMBER;
            if last_was_line {
                previous = line;
                line = self.address(at + 1) as LineNumber;
            }
            at = next;
            if at >= here {
                break;
            }
        }
        if last_was_line {
            previous
        } else {
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{lex, Word};
    use crate::mach::Ram;

    fn arena() -> Arena {
        Arena::new(Box::new(Ram::new(512)), 4)
    }

    fn body(s: &str) -> Vec<u8> {
        let mut v = vec![];
        for t in lex(s, true) {
            t.encode(&mut v);
        }
        v
    }

    fn numbers(a: &Arena) -> Vec<LineNumber> {
        a.lines().iter().map(|s| s.number).collect()
    }

    #[test]
    fn test_lines_are_kept_in_order() {
        let mut a = arena();
        a.store_line(30, &body("END")).unwrap();
        a.store_line(10, &body("PRINT 1")).unwrap();
        a.store_line(20, &body("PRINT 2")).unwrap();
        assert_eq!(numbers(&a), vec![10, 20, 30]);
    }

    #[test]
    fn test_replace_and_delete() {
        let mut a = arena();
        a.store_line(10, &body("PRINT 1")).unwrap();
        a.store_line(20, &body("END")).unwrap();
        let top = a.top();
        a.store_line(10, &body("PRINT \"LONGER\"")).unwrap();
        assert_eq!(numbers(&a), vec![10, 20]);
        a.store_line(10, &[]).unwrap();
        assert_eq!(numbers(&a), vec![20]);
        assert!(a.top() < top);
        assert_eq!(a.read(a.top()), 0);
        a.store_line(15, &[]).unwrap();
        assert_eq!(numbers(&a), vec![20]);
    }

    #[test]
    fn test_find_line() {
        let mut a = arena();
        a.store_line(10, &body("STOP")).unwrap();
        a.store_line(20, &body("END")).unwrap();
        let at = a.find_line(20).unwrap();
        assert_eq!(a.token(at).0, Token::Word(Word::End));
        assert_eq!(a.find_line(20), Ok(at));
        assert_eq!(a.find_line(15), Err(error!(UnknownLine)));
    }

    #[test]
    fn test_find_line_after_lines_move() {
        let mut a = arena();
        a.store_line(10, &body("STOP")).unwrap();
        a.store_line(20, &body("END")).unwrap();
        let old = a.find_line(20).unwrap();
        a.store_line(15, &body("PRINT 15")).unwrap();
        let moved = a.find_line(20).unwrap();
        assert!(moved > old);
        assert_eq!(a.token(moved).0, Token::Word(Word::End));
        a.store_line(10, &[]).unwrap();
        let back = a.find_line(20).unwrap();
        assert!(back < moved);
        assert_eq!(a.token(back).0, Token::Word(Word::End));
        assert_eq!(a.find_line(10), Err(error!(UnknownLine)));
    }

    #[test]
    fn test_next_line_and_line_of() {
        let mut a = arena();
        a.store_line(10, &body("STOP")).unwrap();
        a.store_line(20, &body("END")).unwrap();
        let ten = a.find_line(10).unwrap();
        let twenty = a.next_line(ten);
        assert_eq!(a.token(twenty).0, Token::LineNumber(20));
        assert_eq!(a.next_line(twenty), a.top());
        assert_eq!(a.line_of(ten + 1), 10);
        assert_eq!(a.line_of(twenty + 3), 10);
        assert_eq!(a.line_of(twenty + 4), 20);
    }

    #[test]
    fn test_store_out_of_memory() {
        let mut a = arena();
        a.himem = 8;
        let before = a.top();
        assert_eq!(a.store_line(10, &body("PRINT 1")), Err(error!(OutOfMemory)));
        assert_eq!(a.top(), before);
    }
}
