// Horizontal bar charts for answer distributions.

use std::fmt::Write as _;

use crate::analyze::Distribution;

/// Default bar length, in characters, of the most frequent label.
pub const DEFAULT_BAR_WIDTH: usize = 40;

/// Widths above this are clamped.
pub const MAX_BAR_WIDTH: usize = 500;

/// Render `dist` as a text bar chart. The longest bar is `width` characters
/// (within `1..=MAX_BAR_WIDTH`); every non-zero count gets at least one.
pub fn bar_chart(dist: &Distribution, width: usize) -> String {
    let width = width.clamp(1, MAX_BAR_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} responses)", dist.field, dist.respondents);

    if dist.counts.is_empty() {
        out.push_str("  (no answers)\n");
        return out;
    }

    let label_width = dist
        .counts
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let max_count = dist.counts.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1);

    for (label, count) in &dist.counts {
        let bar = (count.saturating_mul(width).saturating_add(max_count / 2) / max_count).max(1);
        let pad = label_width - label.chars().count();
        let _ = writeln!(
            out,
            "  {label}{:pad$} {} {count} ({:.1}%)",
            "",
            "#".repeat(bar),
            dist.share(*count),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge() -> Distribution {
        Distribution {
            field: "Conhecimento_PrEP".into(),
            respondents: 4,
            counts: vec![
                ("Sim, conheço bem".into(), 2),
                ("Não conheço".into(), 1),
                ("Conheço parcialmente".into(), 1),
            ],
        }
    }

    #[test]
    fn renders_bars_scaled_to_largest_count() {
        insta::assert_snapshot!(bar_chart(&knowledge(), 10), @r"
Conhecimento_PrEP (4 responses)
  Sim, conheço bem     ########## 2 (50.0%)
  Não conheço          ##### 1 (25.0%)
  Conheço parcialmente ##### 1 (25.0%)
");
    }

    #[test]
    fn small_counts_keep_a_visible_bar() {
        let dist = Distribution {
            field: "Genero".into(),
            respondents: 101,
            counts: vec![("Outro".into(), 100), ("Agênero".into(), 1)],
        };
        let chart = bar_chart(&dist, 10);
        let last = chart.lines().last().unwrap();
        assert!(last.contains(" # 1 "));
    }

    #[test]
    fn width_is_clamped() {
        let longest = |width| {
            bar_chart(&knowledge(), width)
                .lines()
                .nth(1)
                .map(|l| l.matches('#').count())
        };
        assert_eq!(longest(usize::MAX), Some(MAX_BAR_WIDTH));
        assert_eq!(longest(0), Some(1));
    }

    #[test]
    fn empty_distribution() {
        let dist = Distribution {
            field: "Comentarios".into(),
            respondents: 0,
            counts: Vec::new(),
        };
        assert_eq!(bar_chart(&dist, 10), "Comentarios (0 responses)\n  (no answers)\n");
    }
}
