// Answer distributions: the counts behind the charts.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::AnalyzeError;
use crate::questionnaire::{self, AnswerKind};
use crate::types::{ResponseRecord, TIMESTAMP_FIELD, is_base_field};

/// Label counts for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub field: String,
    /// Records that answered the field.
    pub respondents: usize,
    /// `(label, count)`, most frequent first; ties keep first-seen order.
    pub counts: Vec<(String, usize)>,
}

impl Distribution {
    /// Percentage of respondents that picked `count` answers.
    #[allow(clippy::cast_precision_loss)]
    pub fn share(&self, count: usize) -> f64 {
        if self.respondents == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.respondents as f64
        }
    }

    pub fn count_of(&self, label: &str) -> usize {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map_or(0, |(_, c)| *c)
    }
}

fn tally<'a>(field: &str, values: impl Iterator<Item = Vec<&'a str>>) -> Distribution {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut respondents = 0;

    for labels in values {
        respondents += 1;
        for label in labels {
            let slot = *index.entry(label).or_insert_with(|| {
                order.push((label.to_string(), 0));
                order.len() - 1
            });
            order[slot].1 += 1;
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| b.1.cmp(&a.1));
    Distribution {
        field: field.to_string(),
        respondents,
        counts: order,
    }
}

/// Count each distinct value of `field`. Records without the field are skipped.
pub fn value_counts(records: &[ResponseRecord], field: &str) -> Distribution {
    tally(
        field,
        records.iter().filter_map(|r| r.get(field)).map(|v| vec![v]),
    )
}

/// Count each label of a multi-select `field`; one record may add to several.
pub fn multi_value_counts(records: &[ResponseRecord], field: &str) -> Distribution {
    tally(
        field,
        records
            .iter()
            .filter_map(|r| r.get(field))
            .map(questionnaire::split_multi),
    )
}

/// Distribution of `field`, splitting multi-select questions.
///
/// Fails only for a field no record carries and the questionnaire does not
/// know.
pub fn distribution_for(
    records: &[ResponseRecord],
    field: &str,
) -> Result<Distribution, AnalyzeError> {
    let question = questionnaire::question(field);
    let known = question.is_some()
        || is_base_field(field)
        || field == TIMESTAMP_FIELD
        || records.iter().any(|r| r.get(field).is_some());
    if !known {
        return Err(AnalyzeError::UnknownField(field.to_string()));
    }

    Ok(match question.map(|q| q.kind) {
        Some(AnswerKind::Multi) => multi_value_counts(records, field),
        _ => value_counts(records, field),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Answers;

    fn record(pairs: &[(&str, &str)]) -> ResponseRecord {
        ResponseRecord {
            timestamp: "2024-01-01 00:00:00".into(),
            answers: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<Answers>(),
        }
    }

    #[test]
    fn counts_sorted_by_frequency_then_first_seen() {
        let records = vec![
            record(&[("Conhecimento_PrEP", "Não conheço")]),
            record(&[("Conhecimento_PrEP", "Sim, conheço bem")]),
            record(&[("Conhecimento_PrEP", "Sim, conheço bem")]),
            record(&[("Conhecimento_PrEP", "Conheço parcialmente")]),
        ];
        let dist = value_counts(&records, "Conhecimento_PrEP");
        assert_eq!(dist.respondents, 4);
        assert_eq!(
            dist.counts,
            vec![
                ("Sim, conheço bem".to_string(), 2),
                ("Não conheço".to_string(), 1),
                ("Conheço parcialmente".to_string(), 1),
            ]
        );
        assert!((dist.share(2) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absent_values_are_skipped() {
        let records = vec![
            record(&[("Comentarios", "ok")]),
            record(&[]),
        ];
        let dist = value_counts(&records, "Comentarios");
        assert_eq!(dist.respondents, 1);
        assert_eq!(dist.count_of("ok"), 1);
        assert_eq!(dist.count_of("missing"), 0);
    }

    #[test]
    fn multi_select_is_split() {
        let records = vec![
            record(&[("Metodos_prevencao", "PrEP, Camisinha masculina")]),
            record(&[("Metodos_prevencao", "PrEP")]),
            record(&[("Metodos_prevencao", "")]),
        ];
        let dist = distribution_for(&records, "Metodos_prevencao").unwrap();
        assert_eq!(dist.respondents, 3);
        assert_eq!(dist.count_of("PrEP"), 2);
        assert_eq!(dist.count_of("Camisinha masculina"), 1);
        assert_eq!(dist.counts.len(), 2);
    }

    #[test]
    fn unknown_field_is_an_error_but_known_empty_is_not() {
        let records = vec![record(&[("Genero", "Outro")])];
        assert!(matches!(
            distribution_for(&records, "Nada"),
            Err(AnalyzeError::UnknownField(_))
        ));
        let dist = distribution_for(&records, "Comentarios").unwrap();
        assert_eq!(dist.respondents, 0);
        assert!(dist.counts.is_empty());
        assert!(dist.share(0).abs() < f64::EPSILON);
    }
}
