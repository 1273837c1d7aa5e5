//! Topic relevance trends across a series.

use std::collections::BTreeMap;

use magpie_core::{ConsolidatedVideoResult, Discard, TopicPoint, TopicTrend, TrendDirection};

/// Build a trend for every topic present in at least two videos.
///
/// A topic listed twice in one video counts once, at its highest relevance.
pub fn topic_trends(
    videos: &[ConsolidatedVideoResult],
    threshold: f32,
) -> (BTreeMap<String, TopicTrend>, Vec<Discard>) {
    let mut series: BTreeMap<String, BTreeMap<usize, f32>> = BTreeMap::new();
    let mut discarded = Vec::new();

    for (video_index, video) in videos.iter().enumerate() {
        for topic in &video.topics {
            let name = topic.name.trim();
            if name.is_empty() {
                discarded.push(Discard::topic(
                    format!("{}#topic", video.video_id),
                    "missing topic name",
                ));
                continue;
            }
            if !topic.relevance.is_finite() {
                discarded.push(Discard::topic(name, "relevance is not a number"));
                continue;
            }
            series
                .entry(name.to_string())
                .or_default()
                .entry(video_index)
                .and_modify(|r| *r = r.max(topic.relevance))
                .or_insert(topic.relevance);
        }
    }

    let trends = series
        .into_iter()
        .filter(|(_, per_video)| per_video.len() >= 2)
        .map(|(name, per_video)| {
            let points: Vec<TopicPoint> = per_video
                .into_iter()
                .map(|(video_index, relevance)| TopicPoint {
                    video_index,
                    relevance,
                })
                .collect();
            let trend = build_trend(&name, points, threshold);
            (name, trend)
        })
        .collect();

    (trends, discarded)
}

fn build_trend(name: &str, points: Vec<TopicPoint>, threshold: f32) -> TopicTrend {
    let first = points.first().map(|p| p.relevance).unwrap_or(0.0);
    let last = points.last().map(|p| p.relevance).unwrap_or(0.0);

    // Relative change is undefined from zero.
    let change = (first > 0.0).then(|| (last - first) / first);
    let direction = if last > first {
        TrendDirection::Increased
    } else if last < first {
        TrendDirection::Decreased
    } else {
        TrendDirection::Stable
    };
    let significant = change.map_or(false, |c| c.abs() > threshold);

    let note = match change {
        Some(c) if significant => Some(format!(
            "'{}' relevance {} by {:.0}% across the series ({:.2} -> {:.2})",
            name,
            direction,
            c.abs() * 100.0,
            first,
            last
        )),
        _ => None,
    };

    TopicTrend {
        points,
        change,
        direction,
        significant,
        note,
    }
}
