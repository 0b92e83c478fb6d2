// Report aggregations over scored articles.
//
// Everything here is a pure function over a slice of articles so the
// terminal report and the tests share one code path.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::stats::mean;
use crate::db::models::Article;

/// Which articles a report covers. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub sources: Vec<String>,
    pub topics: Vec<i64>,
}

impl ReportFilter {
    pub fn matches(&self, article: &Article) -> bool {
        let source_ok = self.sources.is_empty()
            || self
                .sources
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&article.source));
        let topic_ok =
            self.topics.is_empty() || self.topics.contains(&article.topic_or_unclustered());
        source_ok && topic_ok
    }
}

/// Bias distribution of one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDistribution {
    pub source: String,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Average sentiment of one source on one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSentiment {
    pub topic: i64,
    pub source: String,
    pub count: usize,
    pub avg_sentiment: f64,
}

/// Average sentiment of the articles published on one day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub count: usize,
    pub avg_sentiment: f64,
}

/// Articles with the largest |bias_score|, highest first. Ties by id.
pub fn top_flagged<'a>(
    articles: &'a [Article],
    filter: &ReportFilter,
    limit: usize,
) -> Vec<&'a Article> {
    let mut flagged: Vec<&Article> = articles
        .iter()
        .filter(|a| a.bias_score.is_some() && filter.matches(a))
        .collect();
    flagged.sort_by(|a, b| {
        let a_abs = a.bias_score.unwrap_or(0.0).abs();
        let b_abs = b.bias_score.unwrap_or(0.0).abs();
        b_abs.total_cmp(&a_abs).then_with(|| a.id.cmp(&b.id))
    });
    flagged.truncate(limit);
    flagged
}

/// Count, mean, min and max of bias_score per source, sorted by source.
pub fn source_distribution(articles: &[Article], filter: &ReportFilter) -> Vec<SourceDistribution> {
    let mut by_source: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for article in articles.iter().filter(|a| filter.matches(a)) {
        if let Some(score) = article.bias_score {
            by_source.entry(article.source.as_str()).or_default().push(score);
        }
    }

    by_source
        .into_iter()
        .filter_map(|(source, scores)| {
            Some(SourceDistribution {
                source: source.to_string(),
                count: scores.len(),
                mean: mean(&scores)?,
                min: scores.iter().copied().fold(f64::INFINITY, f64::min),
                max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        })
        .collect()
}

/// Average sentiment per (topic, source), ordered by topic then source.
pub fn topic_sentiment_by_source(
    articles: &[Article],
    filter: &ReportFilter,
) -> Vec<TopicSentiment> {
    let mut groups: BTreeMap<(i64, &str), Vec<f64>> = BTreeMap::new();
    for article in articles.iter().filter(|a| filter.matches(a)) {
        if let Some(sentiment) = article.sentiment {
            groups
                .entry((article.topic_or_unclustered(), article.source.as_str()))
                .or_default()
                .push(sentiment);
        }
    }

    groups
        .into_iter()
        .filter_map(|((topic, source), values)| {
            Some(TopicSentiment {
                topic,
                source: source.to_string(),
                count: values.len(),
                avg_sentiment: mean(&values)?,
            })
        })
        .collect()
}

/// Mean sentiment per publication day, oldest first. Undated articles and
/// articles without sentiment are left out.
pub fn sentiment_trend(articles: &[Article], filter: &ReportFilter) -> Vec<DailySentiment> {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for article in articles.iter().filter(|a| filter.matches(a)) {
        if let (Some(published), Some(sentiment)) = (article.published, article.sentiment) {
            by_day.entry(published.date_naive()).or_default().push(sentiment);
        }
    }

    by_day
        .into_iter()
        .filter_map(|(date, values)| {
            Some(DailySentiment {
                date,
                count: values.len(),
                avg_sentiment: mean(&values)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(id: i64, source: &str, topic: Option<i64>, sentiment: f64, bias: Option<f64>) -> Article {
        Article {
            id,
            url: format!("https://news.example/{id}"),
            source: source.to_string(),
            title: format!("Story {id}"),
            published: None,
            text: String::new(),
            sentiment: Some(sentiment),
            subjectivity: None,
            emotive_score: None,
            embedding: None,
            topic,
            bias_score: bias,
        }
    }

    fn sample() -> Vec<Article> {
        vec![
            article(1, "Herald", Some(0), 0.8, Some(1.2)),
            article(2, "Herald", Some(1), 0.4, Some(-0.3)),
            article(3, "Courier", Some(0), -0.6, Some(-2.5)),
            article(4, "Courier", None, 0.1, None),
        ]
    }

    #[test]
    fn test_top_flagged_by_magnitude() {
        let articles = sample();
        let top = top_flagged(&articles, &ReportFilter::default(), 2);
        let ids: Vec<i64> = top.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_filter_by_source_is_case_insensitive() {
        let articles = sample();
        let filter = ReportFilter {
            sources: vec!["herald".to_string()],
            topics: vec![],
        };
        let top = top_flagged(&articles, &filter, 10);
        assert!(top.iter().all(|a| a.source == "Herald"));
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_filter_by_unclustered_topic() {
        let articles = sample();
        let filter = ReportFilter {
            sources: vec![],
            topics: vec![-1],
        };
        let rows = topic_sentiment_by_source(&articles, &filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].topic, -1);
        assert_eq!(rows[0].source, "Courier");
    }

    #[test]
    fn test_source_distribution() {
        let articles = sample();
        let dist = source_distribution(&articles, &ReportFilter::default());
        assert_eq!(dist.len(), 2);
        let herald = dist.iter().find(|d| d.source == "Herald").unwrap();
        assert_eq!(herald.count, 2);
        assert!((herald.mean - 0.45).abs() < 1e-12);
        assert_eq!(herald.min, -0.3);
        assert_eq!(herald.max, 1.2);
        // Unscored article does not count
        let courier = dist.iter().find(|d| d.source == "Courier").unwrap();
        assert_eq!(courier.count, 1);
    }

    #[test]
    fn test_topic_sentiment_ordering() {
        let articles = sample();
        let rows = topic_sentiment_by_source(&articles, &ReportFilter::default());
        let keys: Vec<(i64, &str)> = rows.iter().map(|r| (r.topic, r.source.as_str())).collect();
        assert_eq!(
            keys,
            vec![(-1, "Courier"), (0, "Courier"), (0, "Herald"), (1, "Herald")]
        );
    }

    #[test]
    fn test_sentiment_trend_groups_by_day() {
        let mut articles = sample();
        articles[0].published = Some(Utc.with_ymd_and_hms(2024, 5, 2, 23, 30, 0).unwrap());
        articles[1].published = Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        articles[2].published = Some(Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap());
        // articles[3] stays undated

        let trend = sentiment_trend(&articles, &ReportFilter::default());
        let days: Vec<(String, usize)> = trend
            .iter()
            .map(|d| (d.date.to_string(), d.count))
            .collect();
        assert_eq!(
            days,
            vec![("2024-05-01".to_string(), 1), ("2024-05-02".to_string(), 2)]
        );
        assert!((trend[0].avg_sentiment - 0.4).abs() < 1e-12);
        assert!((trend[1].avg_sentiment - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_trend_honours_filter() {
        let mut articles = sample();
        for a in &mut articles {
            a.published = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        }
        let filter = ReportFilter {
            sources: vec!["Courier".to_string()],
            topics: vec![0],
        };
        let trend = sentiment_trend(&articles, &filter);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].count, 1);
        assert!((trend[0].avg_sentiment + 0.6).abs() < 1e-12);
    }
}
