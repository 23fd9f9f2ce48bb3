use mocktest::scoring::SectionScore;

/// Bars for the per-section chart on the results screen: label and percentage
/// clamped to `0..=100` (negative marking can push a section below zero).
pub fn section_bars(sections: &[SectionScore], label_width: usize) -> Vec<(String, u64)> {
    sections
        .iter()
        .map(|s| {
            let label: String = s.name.chars().take(label_width.max(1)).collect();
            (label, s.percentage().clamp(0.0, 100.0).round() as u64)
        })
        .collect()
}

/// Width of each bar so that `count` bars with one-column gaps fill `width`.
pub fn bar_width(width: u16, count: usize) -> u16 {
    if count == 0 {
        return 1;
    }
    let count = count as u16;
    (width.saturating_sub(count - 1) / count).clamp(1, 16)
}

/// Format a percentage label consistently
pub fn format_percent(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}%", val.round())
    } else {
        format!("{val:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, score: f64, max_score: f64) -> SectionScore {
        SectionScore {
            section_id: name.to_lowercase(),
            name: name.to_string(),
            score,
            max_score,
            correct: 0,
            incorrect: 0,
            unattempted: 0,
        }
    }

    #[test]
    fn test_section_bars_clamp_negative() {
        let bars = section_bars(
            &[section("Quantitative", 3.0, 6.0), section("Reasoning", -1.0, 4.0)],
            5,
        );
        assert_eq!(bars, vec![("Quant".to_string(), 50), ("Reaso".to_string(), 0)]);
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar_width(20, 0), 1);
        assert_eq!(bar_width(20, 3), 6);
        assert_eq!(bar_width(200, 2), 16);
        assert_eq!(bar_width(2, 5), 1);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(50.0), "50%");
        assert_eq!(format_percent(37.5), "37.5%");
    }
}
