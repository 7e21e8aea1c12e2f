use super::runtime::Runtime;
use crate::error;
use crate::lang::code::{ADDRSIZE, NUMSIZE};
use crate::lang::{Address, Error, Kind, Name, Number};
use chrono::Local;

type Result<T> = std::result::Result<T, Error>;

/// ## Variables, arrays and strings on the heap
///
/// Everything is created on first use. Arrays get
/// `array_default` elements and strings `string_default`
/// characters unless dimensioned first.
///
/// Names starting with `@` reach the interpreter itself:
/// `@S` status, `@I`/`@O` channels, `@C` one character,
/// `@A` characters available, `@R` the random seed and
/// `@` the free memory counted in numbers.

pub fn to_address(n: Number) -> Result<Address> {
    if n < 0.0 || !n.is_finite() {
        return Err(error!(Range));
    }
    Ok(n as Address)
}

/// One slot of a string variable: a length word, then `dim` bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrSlot {
    pub base: Address,
    pub dim: Address,
    pub length: Address,
}

impl StrSlot {
    pub fn payload(&self) -> Address {
        self.base + ADDRSIZE
    }
}

/// The left hand side of an assignment, READ or INPUT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Scalar(Name),
    Element(Name, Address, Address),
    /// Characters `from..=to` of a string slot. `to` is 0 when open ended;
    /// `whole` when no substring was given.
    Text {
        name: Name,
        from: Address,
        to: Address,
        slot: Address,
        whole: bool,
    },
}

impl Runtime {
    fn free_numbers(&self) -> Number {
        (self.arena.gap() / NUMSIZE) as Number
    }

    fn scalar_address(&mut self, name: Name) -> Result<Address> {
        match self.arena.find(Kind::Variable, name) {
            Some(a) => Ok(a),
            None => self.arena.alloc(Kind::Variable, name, 0),
        }
    }

    pub(super) fn get_var(&mut self, name: Name) -> Result<Number> {
        if name.is_special() {
            match name.d {
                b'A' => return Ok(self.io.available(self.io.input) as Number),
                b'S' => return Ok((self.status || self.io.error) as i32 as Number),
                b'I' => return Ok(self.io.input as Number),
                b'O' => return Ok(self.io.output as Number),
                b'C' => {
                    let id = self.io.input;
                    if self.io.available(id) > 0 {
                        return Ok(self.io.read_char().unwrap_or(0) as Number);
                    }
                    return Ok(0.0);
                }
                b'E' | 0 => return Ok(self.free_numbers()),
                b'R' => return Ok(self.seed),
                _ => {}
            }
        }
        let a = self.scalar_address(name)?;
        Ok(self.arena.number(a))
    }

    pub(super) fn set_var(&mut self, name: Name, value: Number) -> Result<()> {
        if name.is_special() {
            match name.d {
                b'S' => {
                    self.status = value != 0.0;
                    self.io.error = value != 0.0;
                    return Ok(());
                }
                b'I' => {
                    self.io.input = value as u8;
                    return Ok(());
                }
                b'O' => {
                    self.io.output = value as u8;
                    return Ok(());
                }
                b'C' => {
                    self.io.write_char(value as u8);
                    return Ok(());
                }
                b'R' => {
                    self.seed = value;
                    return Ok(());
                }
                b'A' | b'E' | 0 => return Ok(()),
                _ => {}
            }
        }
        let a = self.scalar_address(name)?;
        self.arena.set_number(a, value);
        Ok(())
    }

    pub(super) fn create_array(&mut self, name: Name, i: Address, j: Address) -> Result<Address> {
        let count = i.checked_mul(j).ok_or_else(|| error!(OutOfMemory))?;
        let a = self.arena.alloc(Kind::Array, name, count)?;
        self.arena.set_address(a + count * NUMSIZE, j);
        Ok(a)
    }

    fn element_address(&mut self, name: Name, i: Address, j: Address) -> Result<Address> {
        if name.is_special() {
            let h = (self.arena.himem() - self.arena.top()) / NUMSIZE;
            if i < 1 || i > h {
                return Err(error!(Range));
            }
            return Ok(self.arena.himem() - NUMSIZE * i + 1);
        }
        let a = match self.arena.find(Kind::Array, name) {
            Some(a) => a,
            None => self.create_array(name, self.config.array_default, 1)?,
        };
        let size = self.arena.length(Kind::Array, name).unwrap_or(ADDRSIZE);
        let dim = self.arena.address(a + size - ADDRSIZE).max(1);
        let h = (size - ADDRSIZE) / NUMSIZE;
        let base = self.config.array_base;
        if j < base || j >= dim + base || i < base || i >= h / dim + base {
            return Err(error!(Range));
        }
        Ok(a + ((i - base) * dim + (j - base)) * NUMSIZE)
    }

    pub(super) fn get_array(&mut self, name: Name, i: Address, j: Address) -> Result<Number> {
        let a = self.element_address(name, i, j)?;
        Ok(self.arena.number(a))
    }

    pub(super) fn set_array(&mut self, name: Name, i: Address, j: Address, v: Number) -> Result<()> {
        let a = self.element_address(name, i, j)?;
        self.arena.set_number(a, v);
        Ok(())
    }

    /// A string of `slots` strings with room for `len` characters each.
    pub(super) fn create_string(&mut self, name: Name, len: Address, slots: Address) -> Result<Address> {
        let stride = len.checked_add(ADDRSIZE).ok_or_else(|| error!(OutOfMemory))?;
        let size = slots
            .checked_mul(stride)
            .and_then(|z| z.checked_add(ADDRSIZE))
            .ok_or_else(|| error!(OutOfMemory))?;
        let a = self.arena.alloc(Kind::String, name, size)?;
        self.arena.set_address(a + slots * stride, slots);
        Ok(a)
    }

    pub(super) fn string_slot(&mut self, name: Name, j: Address) -> Result<StrSlot> {
        if name.is_special() {
            return Err(error!(Variable));
        }
        let a = match self.arena.find(Kind::String, name) {
            Some(a) => a,
            None => self.create_string(name, self.config.string_default, 1)?,
        };
        let size = self.arena.length(Kind::String, name).unwrap_or(ADDRSIZE);
        let slots = self.arena.address(a + size - ADDRSIZE).max(1);
        let base = self.config.array_base;
        if j < base || j >= slots + base {
            return Err(error!(Range));
        }
        let dim = ((size - ADDRSIZE) / slots).saturating_sub(ADDRSIZE);
        let at = a + (j - base) * (dim + ADDRSIZE);
        Ok(StrSlot {
            base: at,
            dim,
            length: self.arena.address(at),
        })
    }

    pub(super) fn set_string_length(&mut self, slot: &StrSlot, length: Address) {
        self.arena.set_address(slot.base, length.min(slot.dim));
    }

    /// `@$` is the last direct line, `@T$` the wall clock.
    fn special_string(&self, name: Name) -> Result<Vec<u8>> {
        match name.d {
            0 => Ok(self.last_line.clone()),
            b'T' => Ok(Local::now()
                .format("%H:%M:%S %d/%m/%Y")
                .to_string()
                .into_bytes()),
            _ => Err(error!(Variable)),
        }
    }

    /// Characters `lower..=upper` of a string slot; `upper` 0 means to the end.
    pub(super) fn string_bytes(
        &mut self,
        name: Name,
        lower: Address,
        upper: Address,
        j: Address,
    ) -> Result<Vec<u8>> {
        let (bytes, dim, length) = if name.is_special() {
            let s = self.special_string(name)?;
            let (dim, length) = (s.len().max(1), s.len());
            (s, dim, length)
        } else {
            let slot = self.string_slot(name, j)?;
            let bytes = (0..slot.dim)
                .map(|k| self.arena.read(slot.payload() + k))
                .collect::<Vec<u8>>();
            (bytes, slot.dim, slot.length.min(slot.dim))
        };
        if lower < 1 || lower > dim {
            return Err(error!(Range));
        }
        let upper = if upper == 0 { length } else { upper.min(bytes.len()) };
        if upper < lower {
            return Ok(vec![]);
        }
        Ok(bytes[lower - 1..upper].to_vec())
    }

    /// Copy `value` into characters `from..` of a string slot, extending it.
    /// Returns the count of characters copied.
    pub(super) fn store_text(
        &mut self,
        name: Name,
        from: Address,
        to: Address,
        j: Address,
        value: &[u8],
    ) -> Result<Address> {
        let slot = self.string_slot(name, j)?;
        if from < 1 || from > slot.dim {
            return Err(error!(Range));
        }
        if to == 0 && from + value.len() - 1 > slot.dim {
            return Err(error!(Range));
        }
        if to != 0 && to > slot.dim {
            return Err(error!(Range));
        }
        let copy = if to > 0 {
            (to + 1).saturating_sub(from).min(value.len())
        } else {
            value.len()
        };
        for (k, c) in value[..copy].iter().enumerate() {
            self.arena.write(slot.payload() + from - 1 + k, *c);
        }
        let length = if to == 0 {
            from + value.len() - 1
        } else if from + copy > slot.length {
            from + copy - 1
        } else {
            slot.length
        };
        self.set_string_length(&slot, length);
        Ok(copy)
    }

    pub(super) fn assign_number(&mut self, target: Target, value: Number) -> Result<()> {
        match target {
            Target::Scalar(name) => self.set_var(name, value),
            Target::Element(name, i, j) => self.set_array(name, i, j, value),
            Target::Text {
                name,
                from,
                slot,
                whole,
                ..
            } => {
                let s = self.string_slot(name, slot)?;
                if from < 1 || from > s.dim {
                    return Err(error!(Range));
                }
                self.arena.write(s.payload() + from - 1, value as u8);
                if whole {
                    self.set_string_length(&s, 1);
                } else if s.length < from {
                    self.set_string_length(&s, from);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Name = Name::new(b'A', 0);

    #[test]
    fn test_scalar_autocreate() {
        let mut r = Runtime::default();
        assert_eq!(r.get_var(A), Ok(0.0));
        r.set_var(A, 4.5).unwrap();
        assert_eq!(r.get_var(A), Ok(4.5));
    }

    #[test]
    fn test_array_bounds() {
        let mut r = Runtime::default();
        r.set_array(A, 10, 1, 7.0).unwrap();
        assert_eq!(r.get_array(A, 10, 1), Ok(7.0));
        assert_eq!(r.get_array(A, 11, 1), Err(error!(Range)));
        assert_eq!(r.get_array(A, 0, 1), Err(error!(Range)));
        r.create_array(Name::new(b'B', 0), 2, 3).unwrap();
        let b = Name::new(b'B', 0);
        r.set_array(b, 2, 3, 1.0).unwrap();
        assert_eq!(r.get_array(b, 2, 3), Ok(1.0));
        assert_eq!(r.get_array(b, 2, 4), Err(error!(Range)));
        assert_eq!(r.get_array(b, 3, 1), Err(error!(Range)));
    }

    #[test]
    fn test_string_slots() {
        let mut r = Runtime::default();
        r.create_string(A, 5, 2).unwrap();
        assert_eq!(r.store_text(A, 1, 0, 2, b"HELLO"), Ok(5));
        assert_eq!(r.string_bytes(A, 1, 0, 2), Ok(b"HELLO".to_vec()));
        assert_eq!(r.string_bytes(A, 1, 0, 1), Ok(vec![]));
        assert_eq!(r.string_bytes(A, 2, 3, 2), Ok(b"EL".to_vec()));
        assert_eq!(r.store_text(A, 2, 0, 1, b"TOOLONG"), Err(error!(Range)));
        assert_eq!(r.string_slot(A, 3), Err(error!(Range)));
    }

    #[test]
    fn test_free_memory_array() {
        let mut r = Runtime::default();
        let at = Name::new(b'@', 0);
        r.set_array(at, 1, 1, 3.0).unwrap();
        assert_eq!(r.get_array(at, 1, 1), Ok(3.0));
        assert_eq!(r.get_array(at, 0, 1), Err(error!(Range)));
    }
}
