use super::config::Boolean;
use super::cursor::Source;
use super::runtime::Runtime;
use super::var::to_address;
use crate::error;
use crate::lang::code::ADDRSIZE;
use crate::lang::{format_number, parse_number, Address, Error, Kind, Name, Number, Token, Word};

type Result<T> = std::result::Result<T, Error>;

/// ## Recursive descent over the token stream
///
/// Every level leaves its value on the operand stack.
/// `factor` stops on the last token of what it read;
/// the levels above it stop on the first token they could not use.

type Level = fn(&mut Runtime) -> Result<()>;

pub(super) fn equal(x: Number, y: Number) -> bool {
    x == y || (x - y).abs() <= Number::EPSILON * x.abs().max(y.abs())
}

fn power_of(x: Number, y: Number) -> Number {
    if y.fract() == 0.0 && y.abs() <= 1024.0 {
        let mut r = 1.0;
        for _ in 0..(y.abs() as u32) {
            r *= x;
        }
        if y < 0.0 {
            1.0 / r
        } else {
            r
        }
    } else {
        x.powf(y)
    }
}

fn map(a: &[Number]) -> Result<Number> {
    let v: Vec<i64> = a.iter().map(|n| *n as i64).collect();
    let span = v[2].wrapping_sub(v[1]);
    if span == 0 {
        return Err(error!(DivByZero));
    }
    let scaled = v[0].wrapping_sub(v[1]).wrapping_mul(v[4].wrapping_sub(v[3]));
    Ok((scaled / span).wrapping_add(v[3]) as Number)
}

impl Runtime {
    pub(super) fn push(&mut self, n: Number) -> Result<()> {
        self.stack.push(n)
    }

    pub(super) fn pop(&mut self) -> Result<Number> {
        self.stack.pop()
    }

    pub(super) fn truth(&self, b: bool) -> Number {
        if b {
            self.config.boolean.truth()
        } else {
            0.0
        }
    }

    /// Evaluate starting at the current token.
    pub(super) fn evaluate(&mut self) -> Result<Number> {
        self.expression()?;
        self.pop()
    }

    /// Evaluate starting at the token after the current one.
    pub(super) fn expect_expression(&mut self) -> Result<Number> {
        self.next_token();
        self.evaluate()
    }

    /// The right operand, with at most one unary minus in front.
    fn parse_operator(&mut self, f: Level) -> Result<(Number, Number)> {
        let mut sign = 1.0;
        if self.next_token().is_char(b'-') {
            sign = -1.0;
            self.next_token();
        }
        f(self)?;
        let y = self.pop()? * sign;
        let x = self.pop()?;
        Ok((x, y))
    }

    pub(super) fn expression(&mut self) -> Result<()> {
        self.and_expression()?;
        if self.token.is_word(Word::Or) {
            let (x, y) = self.parse_operator(Runtime::expression)?;
            let v = match self.config.boolean {
                Boolean::AllBits => ((x as i32) | (y as i32)) as Number,
                Boolean::Legacy => self.truth(x != 0.0 || y != 0.0),
            };
            self.push(v)?;
        }
        Ok(())
    }

    fn and_expression(&mut self) -> Result<()> {
        self.not_expression()?;
        if self.token.is_word(Word::And) {
            let (x, y) = self.parse_operator(Runtime::expression)?;
            let v = match self.config.boolean {
                Boolean::AllBits => ((x as i32) & (y as i32)) as Number,
                Boolean::Legacy => self.truth(x != 0.0 && y != 0.0),
            };
            self.push(v)?;
        }
        Ok(())
    }

    fn not_expression(&mut self) -> Result<()> {
        if !self.token.is_word(Word::Not) {
            return self.comp_expression();
        }
        self.next_token();
        self.expression()?;
        let x = self.pop()?;
        let v = match self.config.boolean {
            Boolean::AllBits => !(x as i32) as Number,
            Boolean::Legacy => self.truth(x == 0.0),
        };
        self.push(v)
    }

    fn comp_expression(&mut self) -> Result<()> {
        self.add_expression()?;
        let test: fn(Number, Number) -> bool = match &self.token {
            Token::Char(b'=') => |x, y| equal(x, y),
            Token::NotEqual => |x, y| !equal(x, y),
            Token::Char(b'>') => |x, y| x > y,
            Token::Char(b'<') => |x, y| x < y,
            Token::GreaterEqual => |x, y| x >= y,
            Token::LesserEqual => |x, y| x <= y,
            _ => return Ok(()),
        };
        let (x, y) = self.parse_operator(Runtime::comp_expression)?;
        let v = self.truth(test(x, y));
        self.push(v)
    }

    fn add_expression(&mut self) -> Result<()> {
        if self.token.is_char(b'+') || self.token.is_char(b'-') {
            self.push(0.0)?;
        } else {
            self.term()?;
        }
        loop {
            let plus = match &self.token {
                Token::Char(b'+') => true,
                Token::Char(b'-') => false,
                _ => return Ok(()),
            };
            let (x, y) = self.parse_operator(Runtime::term)?;
            self.push(if plus { x + y } else { x - y })?;
        }
    }

    fn term(&mut self) -> Result<()> {
        self.power()?;
        loop {
            let op = match &self.token {
                Token::Char(c) if b"*/%".contains(c) => *c,
                _ => return Ok(()),
            };
            let (x, y) = self.parse_operator(Runtime::power)?;
            let v = match op {
                b'*' => x * y,
                b'/' if y == 0.0 => return Err(error!(DivByZero)),
                b'/' => x / y,
                _ => {
                    let (a, b) = (x as i64, y as i64);
                    if b == 0 {
                        return Err(error!(DivByZero));
                    }
                    a.wrapping_rem(b) as Number
                }
            };
            self.push(v)?;
        }
    }

    fn power(&mut self) -> Result<()> {
        self.factor()?;
        self.next_token();
        while self.token.is_char(b'^') {
            if self.config.power_right_to_left {
                let (x, y) = self.parse_operator(Runtime::power)?;
                self.push(power_of(x, y))?;
            } else {
                let (x, y) = self.parse_operator(Runtime::factor)?;
                self.push(power_of(x, y))?;
                self.next_token();
            }
        }
        Ok(())
    }

    fn factor(&mut self) -> Result<()> {
        let v = match self.token.clone() {
            Token::Number(n) => n,
            Token::Variable(name) => self.get_var(name)?,
            Token::ArrayVar(name) => {
                let args = self.parse_subscripts()?.unwrap_or_default();
                let (i, j) = self.indices(&args)?;
                self.get_array(name, i, j)?
            }
            Token::Char(b'(') => {
                self.next_token();
                self.expression()?;
                if !self.token.is_char(b')') {
                    return Err(error!(Args));
                }
                self.pop()?
            }
            Token::Str(_) | Token::StringVar(_) => return self.string_factor(),
            Token::Word(w) => return self.function(w),
            _ => return Err(error!(Syntax)),
        };
        self.push(v)
    }

    fn function(&mut self, w: Word) -> Result<()> {
        let v = match w {
            Word::Abs => self.function_args(1)?[0].abs(),
            Word::Sgn => {
                let x = self.function_args(1)?[0];
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Word::Int => self.function_args(1)?[0].floor(),
            Word::Sqr => self.function_args(1)?[0].sqrt(),
            Word::Sin => self.function_args(1)?[0].sin(),
            Word::Cos => self.function_args(1)?[0].cos(),
            Word::Tan => self.function_args(1)?[0].tan(),
            Word::Atan => self.function_args(1)?[0].atan(),
            Word::Log => self.function_args(1)?[0].ln(),
            Word::Exp => self.function_args(1)?[0].exp(),
            Word::Pow => {
                let a = self.function_args(2)?;
                power_of(a[0], a[1])
            }
            Word::Map => map(&self.function_args(5)?)?,
            Word::Rnd => {
                let n = self.function_args(1)?[0];
                self.random(n)
            }
            Word::Peek => {
                let a = to_address(self.function_args(1)?[0])?;
                if a > self.arena.memsize() {
                    return Err(error!(Range));
                }
                self.arena.read(a) as Number
            }
            Word::Avail => {
                let id = self.function_args(1)?[0] as u8;
                self.io.available(id) as Number
            }
            Word::Malloc => {
                let a = self.function_args(2)?;
                let name = Name::buffer(a[0] as u16);
                let size = to_address(a[1])?;
                self.arena.alloc(Kind::Buffer, name, size)? as Number
            }
            Word::Size => (self.arena.himem() - self.arena.top()) as Number,
            Word::Himem => self.arena.himem() as Number,
            Word::Millis => {
                let a = self.function_args(1)?;
                if a[0] == 0.0 {
                    return Err(error!(DivByZero));
                }
                (self.millis() as Number / a[0]).trunc()
            }
            Word::Error => self.last_error,
            Word::Data => self.data_record,
            Word::Len => self.length_of()?,
            Word::Val => self.value_of()?,
            Word::Instr => self.instr()?,
            Word::Asc => self.asc()?,
            Word::Find => self.find_object()?,
            Word::Fn => return self.call_function(),
            Word::Str | Word::Chr | Word::Left | Word::Right | Word::Mid => {
                return self.string_factor()
            }
            _ => return Err(error!(Syntax)),
        };
        self.push(v)
    }

    /// glibc style congruence; negative ranges are shifted by one.
    fn random(&mut self, n: Number) -> Number {
        const M: u64 = 1 << 31;
        let seed = (self.seed.abs() as u64)
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12345)
            % M;
        self.seed = seed as Number;
        let r = (seed as Number * n / M as Number).trunc();
        if n < 0.0 {
            r + 1.0
        } else {
            r
        }
    }

    /// Look ahead for `( args )`. Leaves the `)` current, or restores
    /// the cursor and returns `None` when no `(` follows.
    pub(super) fn parse_subscripts(&mut self) -> Result<Option<Vec<Number>>> {
        let saved = self.location();
        if !self.next_token().is_char(b'(') {
            self.restore(saved);
            return Ok(None);
        }
        self.next_token();
        if self.token.is_char(b')') {
            return Ok(Some(vec![]));
        }
        let args = self.arguments()?;
        if !self.token.is_char(b')') {
            return Err(error!(Args));
        }
        Ok(Some(args))
    }

    /// Comma separated expressions up to the end of the statement.
    pub(super) fn arguments(&mut self) -> Result<Vec<Number>> {
        let mut n = 0;
        if !self.is_term() {
            loop {
                self.expression()?;
                n += 1;
                if !self.token.is_char(b',') {
                    break;
                }
                self.next_token();
            }
        }
        self.stack.pop_n(n)
    }

    fn function_args(&mut self, arity: usize) -> Result<Vec<Number>> {
        match self.parse_subscripts()? {
            Some(args) if args.len() == arity => Ok(args),
            _ => Err(error!(Args)),
        }
    }

    pub(super) fn indices(&self, args: &[Number]) -> Result<(Address, Address)> {
        match args {
            [i] => Ok((to_address(*i)?, self.config.array_base)),
            [i, j] => Ok((to_address(*i)?, to_address(*j)?)),
            _ => Err(error!(Args)),
        }
    }

    fn open_paren(&mut self) -> Result<()> {
        if self.next_token().is_char(b'(') {
            self.next_token();
            Ok(())
        } else {
            Err(error!(Args))
        }
    }

    fn close_paren(&mut self) -> Result<()> {
        if self.token.is_char(b')') {
            Ok(())
        } else {
            Err(error!(Args))
        }
    }

    fn length_of(&mut self) -> Result<Number> {
        self.open_paren()?;
        let n = match self.string_value()? {
            Some(s) => {
                self.next_token();
                s.len()
            }
            None => {
                let n = self.evaluate()?;
                self.arena
                    .length(Kind::Buffer, Name::buffer(n as u16))
                    .unwrap_or(0)
            }
        };
        self.close_paren()?;
        Ok(n as Number)
    }

    /// `VAL` sets the status when no digits were found.
    fn value_of(&mut self) -> Result<Number> {
        self.open_paren()?;
        let s = self.string_value()?.ok_or_else(|| error!(Args))?;
        self.next_token();
        self.close_paren()?;
        let mut at = s.iter().take_while(|c| **c == b' ' || **c == b'\t').count();
        let sign = if s.get(at) == Some(&b'-') {
            at += 1;
            -1.0
        } else {
            1.0
        };
        let (n, len) = parse_number(&s[at..]);
        self.status = len == 0;
        Ok(n * sign)
    }

    fn instr(&mut self) -> Result<Number> {
        self.open_paren()?;
        let c = self.evaluate()? as u8;
        if !self.token.is_char(b',') {
            return Err(error!(Args));
        }
        self.next_token();
        let s = self.string_value()?.ok_or_else(|| error!(Args))?;
        self.next_token();
        self.close_paren()?;
        Ok(match s.iter().position(|x| *x == c) {
            Some(p) => (p + 1) as Number,
            None => 0.0,
        })
    }

    fn asc(&mut self) -> Result<Number> {
        self.open_paren()?;
        let s = self.string_value()?.ok_or_else(|| error!(Args))?;
        self.next_token();
        self.close_paren()?;
        Ok(s.first().copied().unwrap_or(0) as Number)
    }

    /// Payload address of a heap object, or 0.
    fn find_object(&mut self) -> Result<Number> {
        self.open_paren()?;
        let found = match self.token.clone() {
            Token::Variable(name) => {
                self.next_token();
                self.arena.find(Kind::Variable, name)
            }
            Token::StringVar(name) => {
                self.next_token();
                self.arena.find(Kind::String, name)
            }
            Token::ArrayVar(name) => {
                self.expect_char(b'(')?;
                self.expect_char(b')')?;
                self.next_token();
                self.arena.find(Kind::Array, name)
            }
            Token::Word(Word::Fn) => {
                let name = match self.next_token().clone() {
                    Token::ArrayVar(name) => name,
                    _ => return Err(error!(Syntax)),
                };
                self.expect_char(b'(')?;
                self.expect_char(b')')?;
                self.next_token();
                self.arena.find(Kind::Function, name)
            }
            _ => {
                let n = self.evaluate()?;
                self.arena.find(Kind::Buffer, Name::buffer(n as u16))
            }
        };
        self.close_paren()?;
        Ok(found.unwrap_or(0) as Number)
    }

    /// Whether the current token begins a string value.
    pub(super) fn at_string(&self) -> bool {
        match &self.token {
            Token::Str(_) | Token::StringVar(_) => true,
            Token::Word(w) => matches!(
                w,
                Word::Str | Word::Chr | Word::Left | Word::Right | Word::Mid
            ),
            _ => false,
        }
    }

    /// The bytes of the string value at the current token, or `None` when
    /// there is none. Stops on the last token of the value.
    pub(super) fn string_value(&mut self) -> Result<Option<Vec<u8>>> {
        let s = match self.token.clone() {
            Token::Str(s) => s,
            Token::StringVar(name) => {
                let (from, to, slot, _) = self.parse_string_var()?;
                self.string_bytes(name, from, to, slot)?
            }
            Token::Word(w) if self.at_string() => self.string_function(w)?,
            _ => return Ok(None),
        };
        Ok(Some(s))
    }

    /// Subscripts after a string variable: `(from[,to])` then `(slot)`.
    /// Returns from, to (0 is open ended), slot and whether it is the whole string.
    pub(super) fn parse_string_var(&mut self) -> Result<(Address, Address, Address, bool)> {
        let mut slot = self.config.array_base;
        let (mut from, mut to, mut whole) = (1, 0, true);
        if let Some(args) = self.parse_subscripts()? {
            match args.as_slice() {
                [] => {}
                [a] => {
                    from = to_address(*a)?;
                    whole = false;
                }
                [a, b] => {
                    from = to_address(*a)?;
                    to = to_address(*b)?;
                    whole = false;
                }
                _ => return Err(error!(Args)),
            }
            if let Some(args) = self.parse_subscripts()? {
                match args.as_slice() {
                    [k] => slot = to_address(*k)?,
                    _ => return Err(error!(Args)),
                }
            }
        }
        Ok((from, to, slot, whole))
    }

    fn string_function(&mut self, w: Word) -> Result<Vec<u8>> {
        if self.next_token().is_char(b'$') {
            self.next_token();
        }
        if !self.token.is_char(b'(') {
            return Err(error!(Args));
        }
        self.next_token();
        let s = match w {
            Word::Str => format_number(self.evaluate()?).into_bytes(),
            Word::Chr => vec![self.evaluate()? as u8],
            _ => {
                let s = self.string_value()?.ok_or_else(|| error!(Args))?;
                if !self.next_token().is_char(b',') {
                    return Err(error!(Args));
                }
                let n = self.expect_expression()?;
                match w {
                    Word::Left => s[..to_address(n)?.min(s.len())].to_vec(),
                    Word::Right => {
                        let n = to_address(n)?.min(s.len());
                        s[s.len() - n..].to_vec()
                    }
                    _ => {
                        let from = (to_address(n)?.max(1) - 1).min(s.len());
                        let count = if self.token.is_char(b',') {
                            to_address(self.expect_expression()?)?
                        } else {
                            s.len()
                        };
                        s[from..from.saturating_add(count).min(s.len())].to_vec()
                    }
                }
            }
        };
        self.close_paren()?;
        Ok(s)
    }

    /// A string in a numeric place: compared when `=` or `<>` follows,
    /// otherwise the code of its first character.
    fn string_factor(&mut self) -> Result<()> {
        let s = self.string_value()?.ok_or_else(|| error!(Syntax))?;
        let saved = self.location();
        let relation = match self.next_token() {
            Token::Char(b'=') => Some(true),
            Token::NotEqual => Some(false),
            _ => None,
        };
        let equal = match relation {
            Some(equal) => equal,
            None => {
                self.restore(saved);
                return self.push(s.first().copied().unwrap_or(0) as Number);
            }
        };
        self.next_token();
        let t = self.string_value()?.ok_or_else(|| error!(Syntax))?;
        let v = self.truth((s == t) == equal);
        self.push(v)
    }

    /// Call `FN f(x)` with `FN` current. Leaves the result pushed and `)` current.
    pub(super) fn call_function(&mut self) -> Result<()> {
        let name = match self.next_token().clone() {
            Token::ArrayVar(name) => name,
            _ => return Err(error!(Syntax)),
        };
        let entry = self
            .arena
            .find(Kind::Function, name)
            .ok_or_else(|| error!(Syntax))?;
        self.expect_char(b'(')?;
        self.next_token();
        let arg = if self.token.is_char(b')') {
            0.0
        } else {
            let v = self.evaluate()?;
            self.close_paren()?;
            v
        };
        if self.fn_depth >= self.config.recursion_limit {
            return Err(error!(Function));
        }
        let body = self.arena.address(entry);
        let param = Name::new(
            self.arena.read(entry + ADDRSIZE),
            self.arena.read(entry + ADDRSIZE + 1),
        );
        let inline = self.arena.read(entry + ADDRSIZE + 2) == b'=';
        let saved = self.location();
        let mode = self.mode;
        if param.c != 0 {
            self.arena.alloc(Kind::Variable, param, 0)?;
            self.set_var(param, arg)?;
        }
        self.source = Source::Program;
        self.here = body;
        self.fn_depth += 1;
        let result = if inline {
            self.next_token();
            self.expression()
        } else {
            self.next_token();
            self.function_body()
        };
        self.fn_depth -= 1;
        result?;
        self.restore(saved);
        self.mode = mode;
        if param.c != 0 {
            self.arena.free(Kind::Variable, param);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::{Boolean, Config};

    fn eval(r: &mut Runtime, s: &str) -> Result<Number> {
        r.set_direct(s);
        r.evaluate()
    }

    #[test]
    fn test_precedence() {
        let mut r = Runtime::default();
        assert_eq!(eval(&mut r, "2+3*4"), Ok(14.0));
        assert_eq!(eval(&mut r, "(2+3)*4"), Ok(20.0));
        assert_eq!(eval(&mut r, "-2*3"), Ok(-6.0));
        assert_eq!(eval(&mut r, "10-2-3"), Ok(5.0));
        assert_eq!(eval(&mut r, "7%3"), Ok(1.0));
        assert_eq!(eval(&mut r, "3*-2"), Ok(-6.0));
    }

    #[test]
    fn test_power_associativity() {
        let mut r = Runtime::default();
        assert_eq!(eval(&mut r, "2^3^2"), Ok(64.0));
        assert_eq!(eval(&mut r, "2^-1"), Ok(0.5));
        let config = Config {
            power_right_to_left: true,
            ..Config::default()
        };
        let mut r = Runtime::new(config);
        assert_eq!(eval(&mut r, "2^3^2"), Ok(512.0));
    }

    #[test]
    fn test_division_by_zero() {
        let mut r = Runtime::default();
        assert_eq!(eval(&mut r, "1/0"), Err(error!(DivByZero)));
        assert_eq!(eval(&mut r, "1%0"), Err(error!(DivByZero)));
    }

    #[test]
    fn test_comparisons_and_logic() {
        let mut r = Runtime::default();
        assert_eq!(eval(&mut r, "1=1"), Ok(-1.0));
        assert_eq!(eval(&mut r, "0.1+0.2=0.3"), Ok(-1.0));
        assert_eq!(eval(&mut r, "2<1"), Ok(0.0));
        assert_eq!(eval(&mut r, "2>=2 AND 1<>2"), Ok(-1.0));
        assert_eq!(eval(&mut r, "NOT 0"), Ok(-1.0));
        assert_eq!(eval(&mut r, "6 AND 3"), Ok(2.0));
        let config = Config {
            boolean: Boolean::Legacy,
            ..Config::default()
        };
        let mut r = Runtime::new(config);
        assert_eq!(eval(&mut r, "1=1"), Ok(1.0));
        assert_eq!(eval(&mut r, "6 AND 3"), Ok(1.0));
        assert_eq!(eval(&mut r, "NOT 5"), Ok(0.0));
    }

    #[test]
    fn test_functions() {
        let mut r = Runtime::default();
        assert_eq!(eval(&mut r, "ABS(-3)+SGN(-9)"), Ok(2.0));
        assert_eq!(eval(&mut r, "INT(-2.5)"), Ok(-3.0));
        assert_eq!(eval(&mut r, "POW(2,10)"), Ok(1024.0));
        assert_eq!(eval(&mut r, "MAP(5,0,10,0,100)"), Ok(50.0));
        assert_eq!(eval(&mut r, "ABS(1,2)"), Err(error!(Args)));
        assert_eq!(eval(&mut r, "PEEK(70000)"), Err(error!(Range)));
    }

    #[test]
    fn test_strings_in_expressions() {
        let mut r = Runtime::default();
        assert_eq!(eval(&mut r, "\"AB\"=\"AB\""), Ok(-1.0));
        assert_eq!(eval(&mut r, "\"AB\"<>\"AB\""), Ok(0.0));
        assert_eq!(eval(&mut r, "\"A\""), Ok(65.0));
        assert_eq!(eval(&mut r, "LEN(\"HELLO\")"), Ok(5.0));
        assert_eq!(eval(&mut r, "VAL(\" -12.5\")"), Ok(-12.5));
        assert_eq!(eval(&mut r, "INSTR(76,\"HELLO\")"), Ok(3.0));
        assert_eq!(eval(&mut r, "ASC(MID$(\"HELLO\",2,1))"), Ok(69.0));
        assert_eq!(eval(&mut r, "LEFT$(\"HELLO\",2)=\"HE\""), Ok(-1.0));
        assert_eq!(eval(&mut r, "RIGHT$(\"HELLO\",9)=\"HELLO\""), Ok(-1.0));
        assert_eq!(eval(&mut r, "STR$(12)=\"12\""), Ok(-1.0));
    }

    #[test]
    fn test_random_range() {
        let mut r = Runtime::default();
        for _ in 0..50 {
            let n = eval(&mut r, "RND(10)").unwrap();
            assert!(n >= 0.0 && n < 10.0);
        }
    }
}
