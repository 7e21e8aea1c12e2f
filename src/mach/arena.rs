use super::heap::HeapEntry;
use super::memory::Memory;
use super::program::LineCache;
use crate::error;
use crate::lang::code::NUMSIZE;
use crate::lang::{Address, Error, Number, Token};

type Result<T> = std::result::Result<T, Error>;

/// ## One flat byte space for program and heap
///
/// Tokenized program lines grow up from 0 to `top`.
/// Heap objects grow down from `memsize`; `himem` is the
/// highest free byte. Whatever lies between is free memory.

pub struct Arena {
    mem: Box<dyn Memory>,
    memsize: Address,
    pub(super) top: Address,
    pub(super) himem: Address,
    pub(super) heap_cache: Option<HeapEntry>,
    pub(super) lines: LineCache,
}

impl Arena {
    pub fn new(mem: Box<dyn Memory>, line_cache: usize) -> Arena {
        let memsize = mem.len().min(super::config::MAX_MEMSIZE).saturating_sub(1);
        let mut arena = Arena {
            mem,
            memsize,
            top: 0,
            himem: memsize,
            heap_cache: None,
            lines: LineCache::new(line_cache),
        };
        arena.reset();
        arena
    }

    /// Zero everything, the NEW command.
    pub fn reset(&mut self) {
        for a in 0..=self.memsize {
            self.mem.write(a, 0);
        }
        self.top = 0;
        self.himem = self.memsize;
        self.heap_cache = None;
        self.lines.clear();
    }

    pub fn memsize(&self) -> Address {
        self.memsize
    }

    pub fn top(&self) -> Address {
        self.top
    }

    pub fn himem(&self) -> Address {
        self.himem
    }

    /// Bytes between the program and the heap.
    pub fn gap(&self) -> Address {
        self.himem - self.top
    }

    pub fn read(&self, at: Address) -> u8 {
        self.mem.read(at)
    }

    pub fn write(&mut self, at: Address, value: u8) {
        self.mem.write(at, value)
    }

    pub fn address(&self, at: Address) -> Address {
        self.read(at) as Address | (self.read(at + 1) as Address) << 8
    }

    pub fn set_address(&mut self, at: Address, value: Address) {
        self.write(at, (value & 0xff) as u8);
        self.write(at + 1, ((value >> 8) & 0xff) as u8);
    }

    pub fn number(&self, at: Address) -> Number {
        let mut bytes = [0u8; NUMSIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = self.read(at + i);
        }
        Number::from_le_bytes(bytes)
    }

    pub fn set_number(&mut self, at: Address, value: Number) {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.write(at + i, *b);
        }
    }

    /// Decode the program token at `at`.
    pub fn token(&self, at: Address) -> (Token, Address) {
        Token::decode(|a| self.read(a), at, self.top)
    }

    /// Copy `len` bytes from `src` to `dst`; the regions may overlap.
    pub fn move_block(&mut self, src: Address, len: Address, dst: Address) -> Result<()> {
        if dst + len > self.himem {
            return Err(error!(OutOfMemory));
        }
        if dst < src {
            for i in 0..len {
                let b = self.read(src + i);
                self.write(dst + i, b);
            }
        } else {
            for i in (0..len).rev() {
                let b = self.read(src + i);
                self.write(dst + i, b);
            }
        }
        Ok(())
    }

    pub fn zero_block(&mut self, at: Address, len: Address) -> Result<()> {
        if at + len > self.himem {
            return Err(error!(OutOfMemory));
        }
        for a in at..at + len {
            self.write(a, 0);
        }
        Ok(())
    }

    /// Raw bytes of the program region.
    pub fn program_bytes(&self) -> Vec<u8> {
        (0..self.top).map(|a| self.read(a)).collect()
    }

    /// Replace the program region with `bytes`, dropping all heap objects.
    pub fn set_program_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.memsize {
            return Err(error!(OutOfMemory));
        }
        self.reset();
        for (a, b) in bytes.iter().enumerate() {
            self.write(a, *b);
        }
        self.top = bytes.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Ram;

    fn arena() -> Arena {
        Arena::new(Box::new(Ram::new(256)), 4)
    }

    #[test]
    fn test_words() {
        let mut a = arena();
        a.set_address(10, 0x1234);
        assert_eq!(a.read(10), 0x34);
        assert_eq!(a.address(10), 0x1234);
        a.set_number(20, -2.5);
        assert_eq!(a.number(20), -2.5);
        assert_eq!(a.memsize(), 255);
        assert_eq!(a.himem(), 255);
        assert_eq!(a.gap(), 255);
    }

    #[test]
    fn test_move_block_overlapping() {
        let mut a = arena();
        for i in 0..5 {
            a.write(i, i as u8 + 1);
        }
        a.move_block(0, 5, 2).unwrap();
        assert_eq!((0..7).map(|i| a.read(i)).collect::<Vec<_>>(), vec![1, 2, 1, 2, 3, 4, 5]);
        a.move_block(2, 5, 0).unwrap();
        assert_eq!((0..5).map(|i| a.read(i)).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_blocks_stop_at_himem() {
        let mut a = arena();
        a.himem = 100;
        assert_eq!(a.move_block(0, 10, 95), Err(error!(OutOfMemory)));
        assert_eq!(a.zero_block(95, 6), Err(error!(OutOfMemory)));
        assert!(a.zero_block(95, 5).is_ok());
    }
}
