//! Short, deterministic summary statements for a series.
//!
//! Insights are produced in a fixed priority order and cut to the configured
//! maximum. A category without qualifying data is skipped.

use magpie_core::{SeriesAnalysisResult, SeriesConfig};

/// Generates the `insights` list of a series result.
#[derive(Debug, Clone)]
pub struct InsightGenerator {
    max_insights: usize,
    min_before_coverage: usize,
}

impl InsightGenerator {
    pub fn new(config: &SeriesConfig) -> Self {
        Self {
            max_insights: config.max_insights,
            min_before_coverage: config.min_insights_before_coverage,
        }
    }

    /// Insights for a fully built result.
    ///
    /// `average_entities` is the mean number of distinct entities per video.
    pub fn generate(&self, result: &SeriesAnalysisResult, average_entities: f32) -> Vec<String> {
        let mut insights = Vec::new();
        let total = result.video_count;

        if let Some(top) = result.top_entities.first() {
            let presence = if total == 0 {
                0.0
            } else {
                top.video_count as f64 / total as f64 * 100.0
            };
            insights.push(format!(
                "{} appeared in {}/{} videos ({:.0}% presence) with {} total mentions",
                top.name, top.video_count, total, presence, top.mentions
            ));
        }

        if let Some(rel) = result.recurring_relationships.first() {
            insights.push(format!(
                "'{}' relationship confirmed in {} videos ({} mentions)",
                rel.key,
                rel.videos.len(),
                rel.count
            ));
        }

        // Earliest-starting significant trend; names break ties.
        let trend = result
            .topic_trends
            .iter()
            .filter(|(_, t)| t.significant)
            .filter_map(|(name, t)| {
                let start = t.points.first()?.video_index;
                Some((start, name, t.note.as_deref()?))
            })
            .min_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        if let Some((_, _, note)) = trend {
            insights.push(note.to_string());
        }

        if result.unique_entity_count > 0 {
            insights.push(format!(
                "Videos mention {:.1} unique entities on average ({} across the series)",
                average_entities, result.unique_entity_count
            ));
        }

        if insights.len() < self.min_before_coverage {
            insights.push(format!(
                "Analyzed {} videos: {} unique entities, {} recurring relationships, {} topic trends",
                total,
                result.unique_entity_count,
                result.recurring_relationships.len(),
                result.topic_trends.len()
            ));
        }

        insights.truncate(self.max_insights);
        insights
    }
}
