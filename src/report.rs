//! Report rendering for alpha runs.

use serde::Serialize;

use crate::compute::AlphaRun;
use crate::mapping::MappingSource;

/// Krippendorff's suggested reliability thresholds.
pub const RELIABLE_THRESHOLD: f64 = 0.800;
pub const TENTATIVE_THRESHOLD: f64 = 0.667;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Reliable,
    Tentative,
    Unreliable,
}

impl Interpretation {
    pub fn for_alpha(alpha: f64) -> Self {
        if alpha >= RELIABLE_THRESHOLD {
            Interpretation::Reliable
        } else if alpha >= TENTATIVE_THRESHOLD {
            Interpretation::Tentative
        } else {
            Interpretation::Unreliable
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Interpretation::Reliable => "reliable (alpha >= 0.800)",
            Interpretation::Tentative => "tentative conclusions only (0.667 <= alpha < 0.800)",
            Interpretation::Unreliable => "unreliable (alpha < 0.667)",
        }
    }
}

pub fn render_report_markdown(run: &AlphaRun) -> String {
    let result = &run.result;
    let mut out = String::new();
    out.push_str("# Krippendorff's Alpha Report\n\n");
    out.push_str(&format!("- Data type: {}\n", run.data_type));
    out.push_str(&format!("- Annotators: {}\n", run.annotators.join(", ")));
    out.push_str(&format!(
        "- Units: {} ({} with at least two values)\n",
        run.units, run.contributing_units
    ));
    out.push_str(&format!("- Pairable values: {}\n", run.pairable_values));
    if let Some(source) = &run.mapping_source {
        let described = match source {
            MappingSource::Sorted => "sorted label order".to_string(),
            MappingSource::CanonicalScale(name) => format!("scale `{name}`"),
            MappingSource::ExplicitScale => "explicit scale".to_string(),
        };
        out.push_str(&format!("- Label order: {described}\n"));
    }

    out.push_str("\n## Result\n\n");
    out.push_str("| alpha | observed disagreement | expected disagreement |\n");
    out.push_str("|---|---|---|\n");
    out.push_str(&format!(
        "| {} | {} | {} |\n",
        result.alpha, result.observed_disagreement, result.expected_disagreement
    ));
    out.push_str(&format!(
        "\nInterpretation: {}\n",
        Interpretation::for_alpha(result.alpha).describe()
    ));

    if let Some(scores) = &result.per_category_scores {
        out.push_str("\n## Per-category disagreement\n\n");
        out.push_str("| category | observed | expected |\n");
        out.push_str("|---|---|---|\n");
        for (label, score) in scores {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                label, score.observed_disagreement, score.expected_disagreement
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::alpha::{AlphaResult, CategoryScore};
    use crate::schema::DataType;

    fn run(per_category: Option<BTreeMap<String, CategoryScore>>) -> AlphaRun {
        AlphaRun {
            result: AlphaResult {
                alpha: 0.7,
                observed_disagreement: 0.15,
                expected_disagreement: 0.5,
                per_category_scores: per_category,
            },
            data_type: DataType::Nominal,
            annotators: vec!["a1".into(), "a2".into(), "a3".into()],
            units: 4,
            contributing_units: 4,
            pairable_values: 12,
            mapping_source: Some(MappingSource::Sorted),
        }
    }

    #[test]
    fn interpretation_bands() {
        assert_eq!(Interpretation::for_alpha(0.8), Interpretation::Reliable);
        assert_eq!(Interpretation::for_alpha(0.667), Interpretation::Tentative);
        assert_eq!(Interpretation::for_alpha(0.5), Interpretation::Unreliable);
        assert_eq!(Interpretation::for_alpha(-0.2), Interpretation::Unreliable);
    }

    #[test]
    fn markdown_includes_category_table_when_present() {
        let mut scores = BTreeMap::new();
        scores.insert(
            "pos".to_string(),
            CategoryScore {
                observed_disagreement: 0.1,
                expected_disagreement: 0.25,
            },
        );
        let md = render_report_markdown(&run(Some(scores)));
        assert!(md.contains("| 0.7 | 0.15 | 0.5 |"));
        assert!(md.contains("tentative"));
        assert!(md.contains("| pos | 0.1 | 0.25 |"));
    }

    #[test]
    fn markdown_omits_category_table_when_absent() {
        let md = render_report_markdown(&run(None));
        assert!(!md.contains("Per-category"));
    }
}
