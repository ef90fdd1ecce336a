/// What the usage modal shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageDisplay {
    Loading,
    Amount(String),
}

impl UsageDisplay {
    /// `usage` is the month's spend in cents, as reported by the billing endpoint
    pub fn from_usage(usage: Option<f64>) -> Self {
        match usage {
            Some(cents) if cents.is_finite() => UsageDisplay::Amount(format_cents(cents)),
            _ => UsageDisplay::Loading,
        }
    }
}

/// Round to whole cents and render as dollars without trailing zeros
///
/// 1050 -> `$10.5`, 1000 -> `$10`, 1234 -> `$12.34`
pub fn format_cents(cents: f64) -> String {
    let cents = cents.round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = cents / 100;
    let fraction = cents % 100;

    if fraction == 0 {
        format!("{}${}", sign, dollars)
    } else if fraction % 10 == 0 {
        format!("{}${}.{}", sign, dollars, fraction / 10)
    } else {
        format!("{}${}.{:02}", sign, dollars, fraction)
    }
}
