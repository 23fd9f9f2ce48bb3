use unicode_width::UnicodeWidthStr;

/// Countdown display, e.g. `01 : 05 : 09`
pub fn format_hms(total_secs: u32) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hrs:02} : {mins:02} : {secs:02}")
}

/// Time taken on the results screen, e.g. `12:04`
pub fn format_mm_ss(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Marks without a trailing `.0` for whole numbers
pub fn format_marks(marks: f64) -> String {
    if (marks - marks.round()).abs() < f64::EPSILON {
        format!("{}", marks.round())
    } else {
        format!("{marks:.2}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Cut `text` to at most `max_width` display columns, marking the cut with `…`
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}
