use crate::lang::Address;

/// ## Byte addressable storage behind the arena
///
/// Reads outside the backend yield 0 and writes outside it are dropped;
/// the arena never addresses past `len() - 1`.

pub trait Memory {
    fn read(&self, addr: Address) -> u8;
    fn write(&mut self, addr: Address, value: u8);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plain heap allocated RAM.
#[derive(Debug, Clone)]
pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    pub fn new(len: usize) -> Ram {
        Ram {
            bytes: vec![0; len],
        }
    }
}

impl Memory for Ram {
    fn read(&self, addr: Address) -> u8 {
        self.bytes.get(addr).copied().unwrap_or(0)
    }
    fn write(&mut self, addr: Address, value: u8) {
        if let Some(b) = self.bytes.get_mut(addr) {
            *b = value;
        }
    }
    fn len(&self) -> usize {
        self.bytes.len()
    }
}
