//! Number and text formatting shared by the text summary and the image

/// Product names wrap at this many characters in the rendered report
pub const NAME_WRAP_WIDTH: usize = 60;

/// Format with thousands separators and no decimals: `1234567.4` -> `1,234,567`
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{value:.0}");
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

/// Format points with one decimal place: `25` -> `25.0`
pub fn format_points(value: f64) -> String {
    format!("{value:.1}")
}

/// Format a plain catalog number without a trailing `.0` for whole values
pub fn format_plain(value: f64) -> String {
    format!("{value}")
}

/// Word-wrap a product name for the report table.
///
/// Always yields at least one line so every row occupies space.
pub fn wrap_name(name: &str) -> Vec<String> {
    let lines: Vec<String> = textwrap::wrap(name, NAME_WRAP_WIDTH)
        .into_iter()
        .map(std::borrow::Cow::into_owned)
        .collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

/// Escape text embedded in HTML parse-mode messages
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
