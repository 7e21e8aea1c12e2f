/// The value NOT, AND, OR and the relations yield for true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boolean {
    /// True is -1 and the logical operators are bitwise.
    AllBits,
    /// True is 1 and the logical operators are logical.
    Legacy,
}

impl Boolean {
    pub fn truth(self) -> f64 {
        match self {
            Boolean::AllBits => -1.0,
            Boolean::Legacy => 1.0,
        }
    }
}

/// ## Interpreter limits and dialect switches

#[derive(Debug, Clone)]
pub struct Config {
    pub memsize: usize,
    pub stack_size: usize,
    pub for_depth: usize,
    pub gosub_depth: usize,
    pub line_cache: usize,
    pub recursion_limit: usize,
    pub array_default: usize,
    pub string_default: usize,
    pub array_base: usize,
    pub boolean: Boolean,
    pub case_fold: bool,
    pub power_right_to_left: bool,
}

/// Addresses are stored in two bytes.
pub const MAX_MEMSIZE: usize = 65535;

impl Default for Config {
    fn default() -> Config {
        Config {
            memsize: 32768,
            stack_size: 256,
            for_depth: 64,
            gosub_depth: 64,
            line_cache: 64,
            recursion_limit: 64,
            array_default: 10,
            string_default: 32,
            array_base: 1,
            boolean: Boolean::AllBits,
            case_fold: true,
            power_right_to_left: false,
        }
    }
}

impl Config {
    pub fn memsize(&self) -> usize {
        self.memsize.min(MAX_MEMSIZE)
    }
}
