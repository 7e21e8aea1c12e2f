use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Stack enforced and size limited vector
///
/// Each stack carries the error it raises when full and when empty,
/// so the GOSUB stack reports `GOSUB` and `RETURN` while the
/// operand stack reports a plain stack error.

pub struct Stack<T> {
    limit: usize,
    overflow: Error,
    underflow: Error,
    vec: Vec<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.vec)
    }
}

impl<T> Stack<T> {
    pub fn new(limit: usize, overflow: Error, underflow: Error) -> Stack<T> {
        Stack {
            limit,
            overflow,
            underflow,
            vec: Vec::with_capacity(limit.min(256)),
        }
    }
    pub fn clear(&mut self) {
        self.vec.clear()
    }
    pub fn truncate(&mut self, len: usize) {
        self.vec.truncate(len)
    }
    pub fn len(&self) -> usize {
        self.vec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
    pub fn last(&self) -> Option<&T> {
        self.vec.last()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }
    pub fn push(&mut self, val: T) -> Result<()> {
        if self.vec.len() >= self.limit {
            return Err(self.overflow.clone());
        }
        self.vec.push(val);
        Ok(())
    }
    pub fn pop(&mut self) -> Result<T> {
        match self.vec.pop() {
            Some(v) => Ok(v),
            None => Err(self.underflow.clone()),
        }
    }
    pub fn pop_n(&mut self, len: usize) -> Result<Vec<T>> {
        if len > self.vec.len() {
            Err(self.underflow.clone())
        } else {
            let range = (self.vec.len() - len)..;
            Ok(self.vec.drain(range).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;

    #[test]
    fn test_limit() {
        let mut s: Stack<u8> = Stack::new(2, error!(@Gosub), error!(@Return));
        assert!(s.push(1).is_ok());
        assert!(s.push(2).is_ok());
        assert_eq!(s.push(3), Err(error!(@Gosub)));
        assert_eq!(s.len(), 2);
        assert_eq!(s.pop_n(2), Ok(vec![1, 2]));
        assert_eq!(s.pop(), Err(error!(@Return)));
    }
}
