use crate::config::LayoutConfig;

use super::TextBlock;

/// Sizes a multi-line node label with the per-character width table.
pub(super) fn measure_label(lines: &[String], config: &LayoutConfig) -> TextBlock {
    let mut lines: Vec<String> = lines.iter().flat_map(|line| split_lines(line)).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    let font_size = config.font_size;
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

pub(super) fn char_width_factor(ch: char) -> f32 {
    // Widths relative to the font size for a common sans-serif stack.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        '$' => 0.556,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'f' => 0.340,
        'i' => 0.235,
        'j' => 0.227,
        'l' => 0.239,
        'm' => 0.867,
        'r' => 0.364,
        't' => 0.305,
        'w' => 0.811,
        '1' => 0.396,
        '0' | '2'..='9' => 0.605,
        '@' | '#' | '%' | '&' => 0.946,
        'a'..='z' => 0.570,
        _ => 0.568,
    }
}

pub(super) fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(|line| line.trim().to_string()).collect()
}

pub(super) fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn newline_in_atom_label_splits_into_trimmed_lines() {
        let config = LayoutConfig::default();
        let block = measure_label(&label(&["Cell\n  0  ", "(root)"]), &config);
        assert_eq!(block.lines, vec!["Cell", "0", "(root)"]);
        let line = config.font_size * config.label_line_height;
        assert!((block.height - 3.0 * line).abs() < 1e-3);
    }

    #[test]
    fn node_label_is_as_wide_as_its_widest_line() {
        let config = LayoutConfig::default();
        let block = measure_label(&label(&["L0", "(root)", "next: L0"]), &config);
        let widest = text_width("next: L0", config.font_size);
        assert!((block.width - widest).abs() < 1e-3);
        assert!(block.width > text_width("(root)", config.font_size));
    }

    #[test]
    fn label_box_scales_with_configured_font_size() {
        let small = LayoutConfig::default();
        let large = LayoutConfig {
            font_size: small.font_size * 2.0,
            ..LayoutConfig::default()
        };
        let lines = label(&["Node$0", "next: Node$1"]);
        let a = measure_label(&lines, &small);
        let b = measure_label(&lines, &large);
        assert!((b.width - a.width * 2.0).abs() < 1e-2);
        assert!((b.height - a.height * 2.0).abs() < 1e-2);
    }

    #[test]
    fn narrow_glyphs_measure_narrower_than_wide_ones() {
        assert!(text_width("lll", 14.0) < text_width("MMM", 14.0));
        assert!(char_width_factor('\u{4e2d}') > 0.0);
    }

    #[test]
    fn empty_label_keeps_one_line_of_height() {
        let config = LayoutConfig::default();
        let block = measure_label(&[], &config);
        assert_eq!(block.lines, vec![String::new()]);
        assert_eq!(block.width, 0.0);
        assert!(block.height > 0.0);
    }
}
