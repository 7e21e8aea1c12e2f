use super::Number;

/// Largest magnitude printed without a fraction or exponent.
const MAX_INTEGRAL: Number = 9_007_199_254_740_992.0;

/// Scan an unsigned decimal number: digits, an optional fraction and an
/// optional exponent. Returns the value and the count of bytes consumed.
/// A lone `.` is zero.
pub fn parse_number(s: &[u8]) -> (Number, usize) {
    let digits = |from: usize| s[from..].iter().take_while(|c| c.is_ascii_digit()).count();
    let mut len = digits(0);
    if s.get(len) == Some(&b'.') {
        len += 1;
        len += digits(len);
    }
    if let Some(b'E') | Some(b'e') = s.get(len) {
        let mut exp = len + 1;
        if let Some(b'+') | Some(b'-') = s.get(exp) {
            exp += 1;
        }
        let n = digits(exp);
        if n > 0 {
            len = exp + n;
        }
    }
    let text = String::from_utf8_lossy(&s[..len]);
    (text.parse::<Number>().unwrap_or(0.0), len)
}

/// The text `PRINT` shows for a number.
pub fn format_number(n: Number) -> String {
    if !n.is_finite() {
        return "*".to_string();
    }
    if n.floor() == n && n.abs() < MAX_INTEGRAL {
        return format!("{}", n as i64);
    }
    let mut f = n;
    let mut exponent = 0;
    while f.abs() < 1.0 {
        f *= 10.0;
        exponent -= 1;
    }
    while f.abs() >= 10.0 - 0.00001 {
        f /= 10.0;
        exponent += 1;
    }
    if exponent > -2 && exponent < 7 {
        trim_fraction(format!("{:.5}", n))
    } else {
        format!("{}E{}", trim_fraction(format!("{:.5}", f)), exponent)
    }
}

/// The shortest text that scans back to exactly `n`, for program listings.
pub fn listing_number(n: Number) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "1E999" } else { "-1E999" }.to_string();
    }
    if n.floor() == n && n.abs() < MAX_INTEGRAL {
        return format!("{}", n as i64);
    }
    let plain = format!("{}", n);
    let exponent = format!("{:E}", n);
    if plain.len() <= exponent.len() {
        plain
    } else {
        exponent
    }
}

fn trim_fraction(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}
