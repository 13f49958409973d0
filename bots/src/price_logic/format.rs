//! Text rendering of quote records for Telegram (legacy Markdown).

use lib_common::markets::coinmarketcap::QuoteRecord;

pub fn format_number(num: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, num)
}

/// Two decimals from one dollar up, eight below.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format_number(price, 2)
    } else {
        format_number(price, 8)
    }
}

pub fn format_percent_change(change: f64) -> String {
    let sign = if change > 0.0 {
        "📈 +"
    } else if change < 0.0 {
        "📉 "
    } else {
        ""
    };
    format!("{}{}%", sign, format_number(change, 2))
}

pub fn format_market_cap(market_cap: f64) -> String {
    if market_cap >= 1e12 {
        format!("{}T", format_number(market_cap / 1e12, 2))
    } else if market_cap >= 1e9 {
        format!("{}B", format_number(market_cap / 1e9, 2))
    } else if market_cap >= 1e6 {
        format!("{}M", format_number(market_cap / 1e6, 2))
    } else {
        format_number(market_cap, 2)
    }
}

pub fn format_volume(volume: f64) -> String {
    if volume >= 1e9 {
        format!("{}B", format_number(volume / 1e9, 2))
    } else if volume >= 1e6 {
        format!("{}M", format_number(volume / 1e6, 2))
    } else {
        format_number(volume, 2)
    }
}

/// Characters legacy Markdown treats as entity delimiters.
const MARKDOWN_SPECIALS: [char; 4] = ['_', '*', '`', '['];

/// Bold text for legacy Markdown.
///
/// Escapes are only honoured outside entities, so each delimiter character is
/// emitted escaped between bold runs: `Wrapped_BTC` becomes
/// `*Wrapped*\_*BTC*`.
pub fn bold_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut run = String::new();
    for ch in text.chars() {
        if MARKDOWN_SPECIALS.contains(&ch) {
            if !run.is_empty() {
                out.push_str(&format!("*{}*", run));
                run.clear();
            }
            out.push('\\');
            out.push(ch);
        } else {
            run.push(ch);
        }
    }
    if !run.is_empty() {
        out.push_str(&format!("*{}*", run));
    }
    out
}

/// Detail view for a single record.
pub fn format_single(record: &QuoteRecord) -> String {
    format!(
        "💰 {}\n\n💵 Price: ${}\n📊 24h change: {}\n📈 Market cap: ${}\n💹 24h volume: ${}",
        bold_markdown(&format!("{} ({})", record.name, record.symbol)),
        format_price(record.price),
        format_percent_change(record.percent_change_24h),
        format_market_cap(record.market_cap),
        format_volume(record.volume_24h),
    )
}

/// One line per record.
pub fn format_multiple(records: &[QuoteRecord]) -> String {
    let mut response = String::from("💰 *Cryptocurrency quotes:*\n\n");
    for record in records {
        response.push_str(&format!(
            "• {} - ${} ({})\n",
            bold_markdown(&record.symbol),
            format_price(record.price),
            format_percent_change(record.percent_change_24h)
        ));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> QuoteRecord {
        QuoteRecord {
            id: 1,
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            price: 65432.1,
            percent_change_24h: 2.346,
            market_cap: 1.29e12,
            volume_24h: 3.1e10,
            last_updated: "2024-05-01T12:30:45Z".to_string(),
        }
    }

    #[test]
    fn test_price_precision() {
        assert_eq!(format_price(65432.1), "65432.10");
        assert_eq!(format_price(1.0), "1.00");
        assert_eq!(format_price(0.000123), "0.00012300");
    }

    #[test]
    fn test_percent_change_markers() {
        assert_eq!(format_percent_change(2.346), "📈 +2.35%");
        assert_eq!(format_percent_change(-1.5), "📉 -1.50%");
        assert_eq!(format_percent_change(0.0), "0.00%");
    }

    #[test]
    fn test_unit_suffixes() {
        assert_eq!(format_market_cap(1.29e12), "1.29T");
        assert_eq!(format_market_cap(4.5e9), "4.50B");
        assert_eq!(format_market_cap(7.25e6), "7.25M");
        assert_eq!(format_market_cap(999.0), "999.00");
        assert_eq!(format_volume(3.1e10), "31.00B");
        assert_eq!(format_volume(2.0e6), "2.00M");
        assert_eq!(format_volume(12.5), "12.50");
    }

    #[test]
    fn test_single_detail_view() {
        let text = format_single(&btc());
        assert!(text.starts_with("💰 *Bitcoin (BTC)*"));
        assert!(text.contains("Price: $65432.10"));
        assert!(text.contains("Market cap: $1.29T"));
        assert!(text.contains("24h volume: $31.00B"));
    }

    #[test]
    fn test_multiple_one_line_each() {
        let mut eth = btc();
        eth.symbol = "ETH".to_string();
        eth.price = 3000.0;
        eth.percent_change_24h = -0.5;

        let text = format_multiple(&[btc(), eth]);
        let lines: Vec<&str> = text.lines().filter(|l| l.starts_with('•')).collect();
        assert_eq!(lines, vec!["• *BTC* - $65432.10 (📈 +2.35%)", "• *ETH* - $3000.00 (📉 -0.50%)"]);
    }

    #[test]
    fn test_bold_keeps_escapes_outside_entities() {
        assert_eq!(bold_markdown("Bitcoin (BTC)"), "*Bitcoin (BTC)*");
        assert_eq!(bold_markdown("Wrapped_BTC [old]"), "*Wrapped*\\_*BTC *\\[*old]*");
        assert_eq!(bold_markdown("_X_"), "\\_*X*\\_");
        assert_eq!(bold_markdown(""), "");
    }

    #[test]
    fn test_single_view_with_underscore_name() {
        let mut wbtc = btc();
        wbtc.name = "Wrapped_BTC".to_string();
        wbtc.symbol = "W_BTC".to_string();
        let text = format_single(&wbtc);
        assert!(text.starts_with("💰 *Wrapped*\\_*BTC (W*\\_*BTC)*\n"), "{}", text);
        assert_eq!(format_multiple(&[wbtc]).lines().nth(2), Some("• *W*\\_*BTC* - $65432.10 (📈 +2.35%)"));
    }
}
