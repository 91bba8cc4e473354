//! Display strings for candidate lists. Amounts use the 万 (1e4) / 亿 (1e8) notation the
//! market quotes in.

const WAN: f64 = 10_000.0;
const YI: f64 = 100_000_000.0;
const MISSING: &str = "-";

pub fn price(value: f64) -> String {
    if value > 0.0 {
        format!("{value:.2}")
    } else {
        MISSING.to_string()
    }
}

pub fn change_pct(value: f64) -> String {
    format!("{value:+.2}%")
}

pub fn percent(value: f64, dp: usize) -> String {
    format!("{value:.dp$}%")
}

/// Volume in lots, shown in units of 10k lots.
pub fn volume_lots(lots: f64) -> String {
    format!("{:.1}万手", lots / WAN)
}

pub fn traded_value(amount: f64) -> String {
    if amount <= 0.0 {
        MISSING.to_string()
    } else if amount >= YI {
        format!("{:.2}亿", amount / YI)
    } else if amount >= WAN {
        format!("{:.0}万", amount / WAN)
    } else {
        format!("{amount}")
    }
}

pub fn market_cap(cap: f64) -> String {
    if cap >= YI {
        format!("{:.0}亿", cap / YI)
    } else {
        MISSING.to_string()
    }
}
