use super::arena::Arena;
use crate::error;
use crate::lang::code::{ADDRSIZE, NUMSIZE};
use crate::lang::{Address, Error, Kind, Name};
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, Error>;

/// ## Named objects at the top of the arena
///
/// Every object is a header followed by its payload:
/// ```text
/// kind, name.c, name.d, [size word], payload...
/// ```
/// Scalars have no size word. Objects are appended downward
/// from `himem`, so the most recent one is always lowest.
/// Freeing an object frees everything allocated after it.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapEntry {
    kind: Kind,
    name: Name,
    address: Address,
    size: Address,
}

fn payload_size(kind: Kind, size: Address) -> Option<Address> {
    match kind {
        Kind::Variable => Some(NUMSIZE),
        Kind::Array => size.checked_mul(NUMSIZE)?.checked_add(ADDRSIZE),
        Kind::Function => Some(ADDRSIZE + 3),
        Kind::String | Kind::Buffer => Some(size),
    }
}

impl Arena {
    /// Create an object and return the address of its payload.
    /// `size` is an element count for arrays and a byte count for
    /// strings and buffers; it is ignored for scalars and functions.
    pub fn alloc(&mut self, kind: Kind, name: Name, size: Address) -> Result<Address> {
        let header = match kind {
            Kind::Variable => 3,
            _ => 3 + ADDRSIZE,
        };
        let sized = payload_size(kind, size).and_then(|p| Some((p, p.checked_add(header)?)));
        let (payload, total) = match sized {
            Some(sizes) => sizes,
            None => {
                debug!(target: "basic::heap", "{:?} {} of {} elements cannot be sized", kind, name, size);
                return Err(error!(OutOfMemory));
            }
        };
        if self.gap() < total {
            debug!(target: "basic::heap", "out of memory for {} bytes", total);
            return Err(error!(OutOfMemory));
        }
        let address = self.himem - payload + 1;
        let mut b = address;
        if kind != Kind::Variable {
            b -= ADDRSIZE;
            self.set_address(b, payload);
        }
        self.write(b - 1, name.d);
        self.write(b - 2, name.c);
        self.write(b - 3, kind.tag());
        self.himem = b - 4;
        trace!(target: "basic::heap", "alloc {:?} {} at {} size {}", kind, name, address, payload);
        self.heap_cache = Some(HeapEntry {
            kind,
            name,
            address,
            size: payload,
        });
        Ok(address)
    }

    fn lookup(&mut self, kind: Kind, name: Name) -> Option<HeapEntry> {
        if self.himem == self.memsize() {
            return None;
        }
        if let Some(entry) = self.heap_cache {
            if entry.kind == kind && entry.name == name {
                return Some(entry);
            }
        }
        let mut b = self.himem + 1;
        while b <= self.memsize() {
            let tag = self.read(b);
            let entry_name = Name::new(self.read(b + 1), self.read(b + 2));
            b += 3;
            let entry_kind = Kind::from_tag(tag)?;
            let size = match entry_kind {
                Kind::Variable => NUMSIZE,
                _ => {
                    let z = self.address(b);
                    b += ADDRSIZE;
                    z
                }
            };
            if entry_kind == kind && entry_name == name {
                let entry = HeapEntry {
                    kind,
                    name,
                    address: b,
                    size,
                };
                self.heap_cache = Some(entry);
                return Some(entry);
            }
            b += size;
        }
        self.heap_cache = None;
        None
    }

    /// Payload address of an object.
    pub fn find(&mut self, kind: Kind, name: Name) -> Option<Address> {
        self.lookup(kind, name).map(|e| e.address)
    }

    /// Payload size of an object.
    pub fn length(&mut self, kind: Kind, name: Name) -> Option<Address> {
        self.lookup(kind, name).map(|e| e.size)
    }

    /// Free an object and, with it, every younger object.
    /// Returns the payload address it had.
    pub fn free(&mut self, kind: Kind, name: Name) -> Option<Address> {
        let entry = self.lookup(kind, name)?;
        let end = entry.address + entry.size - 1;
        for a in self.himem..=end {
            self.write(a, 0);
        }
        self.himem = end;
        self.heap_cache = None;
        trace!(target: "basic::heap", "free {:?} {} himem {}", kind, name, self.himem);
        Some(entry.address)
    }

    /// Drop every object.
    pub fn clear_heap(&mut self) {
        for a in self.himem..=self.memsize() {
            self.write(a, 0);
        }
        self.himem = self.memsize();
        self.heap_cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Ram;

    fn arena() -> Arena {
        Arena::new(Box::new(Ram::new(1024)), 4)
    }

    const A: Name = Name::new(b'A', 0);
    const B: Name = Name::new(b'B', 0);
    const C: Name = Name::new(b'C', b'1');

    #[test]
    fn test_alloc_and_find() {
        let mut h = arena();
        let a = h.alloc(Kind::Variable, A, 0).unwrap();
        assert_eq!(a, 1023 - 7);
        assert_eq!(h.himem(), 1023 - 11);
        let b = h.alloc(Kind::Array, B, 3).unwrap();
        h.heap_cache = None;
        assert_eq!(h.find(Kind::Variable, A), Some(a));
        assert_eq!(h.find(Kind::Array, B), Some(b));
        assert_eq!(h.length(Kind::Array, B), Some(26));
        assert_eq!(h.find(Kind::String, A), None);
        assert_eq!(h.find(Kind::Variable, B), None);
    }

    #[test]
    fn test_free_is_stack_discipline() {
        let mut h = arena();
        h.alloc(Kind::Variable, A, 0).unwrap();
        let himem = h.himem();
        h.alloc(Kind::String, B, 20).unwrap();
        h.alloc(Kind::Buffer, C, 5).unwrap();
        assert!(h.free(Kind::String, B).is_some());
        assert_eq!(h.himem(), himem);
        assert_eq!(h.gap(), himem);
        assert_eq!(h.find(Kind::Buffer, C), None);
        assert!(h.find(Kind::Variable, A).is_some());
        assert_eq!(h.free(Kind::String, B), None);
    }

    #[test]
    fn test_out_of_memory() {
        let mut h = arena();
        h.top = 1000;
        assert_eq!(h.alloc(Kind::Buffer, A, 100), Err(error!(OutOfMemory)));
        assert_eq!(h.himem(), 1023);
    }

    #[test]
    fn test_oversized_array_is_out_of_memory() {
        let mut h = arena();
        assert_eq!(h.alloc(Kind::Array, A, usize::MAX / 4), Err(error!(OutOfMemory)));
        assert_eq!(h.alloc(Kind::Buffer, B, usize::MAX), Err(error!(OutOfMemory)));
        assert_eq!(h.himem(), 1023);
    }

    #[test]
    fn test_clear_heap() {
        let mut h = arena();
        h.alloc(Kind::Function, A, 0).unwrap();
        h.clear_heap();
        assert_eq!(h.himem(), h.memsize());
        assert_eq!(h.find(Kind::Function, A), None);
    }
}
