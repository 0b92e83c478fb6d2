// Colored terminal output for bias reports and pipeline summaries.
//
// This module handles all terminal-specific formatting: colors, tables,
// status lines. The main.rs command handlers delegate here.

use colored::Colorize;

use crate::db::models::{Article, UNCLUSTERED_TOPIC};
use crate::ingest::IngestOutcome;
use crate::pipeline::{RunSummary, StepStatus};
use crate::scoring::summary::{DailySentiment, SourceDistribution, TopicSentiment};
use crate::scoring::BiasOutcome;
use crate::topics::ClusterOutcome;

/// Display the articles with the strongest relative bias.
pub fn display_flagged_articles(articles: &[&Article]) {
    if articles.is_empty() {
        println!("No articles scored yet. Run `slant run` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Most Slanted Articles ({}) ===", articles.len()).bold()
    );
    println!();

    println!(
        "  {:>4}  {:>6}  {:>6}  {:<18} {:>5}  {}",
        "Rank".dimmed(),
        "Id".dimmed(),
        "Bias".dimmed(),
        "Source".dimmed(),
        "Topic".dimmed(),
        "Title".dimmed(),
    );
    println!("  {}", "-".repeat(86).dimmed());

    for (i, article) in articles.iter().enumerate() {
        let score = article.bias_score.unwrap_or(0.0);
        let title = if article.title.is_empty() {
            &article.url
        } else {
            &article.title
        };
        println!(
            "  {:>4}. {:>6}  {}  {:<18} {:>5}  {}",
            i + 1,
            article.id,
            colorize_bias(score),
            super::truncate_chars(&article.source, 18),
            topic_label(article.topic_or_unclustered()),
            super::truncate_chars(title, 60),
        );
    }
    println!();
}

/// Display per-source bias distribution.
pub fn display_source_distribution(rows: &[SourceDistribution]) {
    if rows.is_empty() {
        return;
    }

    println!("{}", "=== Bias by Source ===".bold());
    println!();
    println!(
        "  {:<24} {:>5}  {:>6}  {:>6}  {:>6}",
        "Source".dimmed(),
        "N".dimmed(),
        "Mean".dimmed(),
        "Min".dimmed(),
        "Max".dimmed(),
    );
    println!("  {}", "-".repeat(56).dimmed());

    for row in rows {
        println!(
            "  {:<24} {:>5}  {}  {:>6.2}  {:>6.2}",
            super::truncate_chars(&row.source, 24),
            row.count,
            colorize_bias(row.mean),
            row.min,
            row.max,
        );
    }
    println!();
}

/// Display average sentiment per topic, broken down by source.
pub fn display_topic_sentiment(rows: &[TopicSentiment]) {
    if rows.is_empty() {
        return;
    }

    println!("{}", "=== Sentiment by Topic and Source ===".bold());

    let mut current: Option<i64> = None;
    for row in rows {
        if current != Some(row.topic) {
            println!("\n  {}", topic_heading(row.topic).bold());
            current = Some(row.topic);
        }
        let sentiment = format!("{:+.2}", row.avg_sentiment);
        let sentiment = if row.avg_sentiment > 0.2 {
            sentiment.green()
        } else if row.avg_sentiment < -0.2 {
            sentiment.red()
        } else {
            sentiment.normal()
        };
        println!(
            "    {:<24} {}  ({} articles)",
            super::truncate_chars(&row.source, 24),
            sentiment,
            row.count
        );
    }
    println!();
}

/// Display mean sentiment per publication day.
pub fn display_sentiment_trend(rows: &[DailySentiment]) {
    if rows.is_empty() {
        return;
    }

    println!("{}", "=== Sentiment over Time ===".bold());
    println!();
    for row in rows {
        // One block per 0.1 of sentiment, left for negative, right for positive
        let blocks = (row.avg_sentiment.abs() * 10.0).round() as usize;
        let bar = "#".repeat(blocks.min(10));
        let bar = if row.avg_sentiment < 0.0 {
            format!("{bar:>10}|{:10}", "").red()
        } else {
            format!("{:>10}|{bar:<10}", "").green()
        };
        println!(
            "  {}  {}  {:+.2}  ({} articles)",
            row.date, bar, row.avg_sentiment, row.count
        );
    }
    println!();
}

/// Display one article with its features and bias score.
pub fn display_article(article: &Article) {
    let mut lines = article_detail_lines(article).into_iter();
    if let Some(heading) = lines.next() {
        println!("\n{}", heading.bold());
    }
    for line in lines {
        println!("{line}");
    }
    println!();
}

/// Plain-text lines for `display_article`: heading, metadata, scores, text.
pub fn article_detail_lines(article: &Article) -> Vec<String> {
    let title = if article.title.is_empty() {
        article.url.as_str()
    } else {
        article.title.as_str()
    };
    let published = article
        .published
        .map(|p| p.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "undated".to_string());

    vec![
        format!("#{} {}", article.id, title),
        format!(
            "  {} | {} | topic {}",
            article.source,
            published,
            topic_label(article.topic_or_unclustered())
        ),
        format!("  {}", article.url),
        format!(
            "  Sentiment: {} | Subjectivity: {} | Emotive ratio: {} | Bias score: {}",
            feature_value(article.sentiment),
            feature_value(article.subjectivity),
            feature_value(article.emotive_score),
            feature_value(article.bias_score),
        ),
        String::new(),
        super::truncate_chars(&article.text, ARTICLE_TEXT_CHARS),
    ]
}

const ARTICLE_TEXT_CHARS: usize = 10_000;

fn feature_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

/// Print one status line per pipeline step.
pub fn display_run_summary(summary: &RunSummary) {
    println!("\n{}", "=== Pipeline Run ===".bold());

    let features = step_line(&summary.features, |o| {
        format!(
            "{} pending, {} complete, {} partial, {} failed",
            o.candidates, o.complete, o.partial, o.failed
        )
    });
    println!("  Features:   {features}");
    println!("  Clustering: {}", step_line(&summary.clustering, cluster_detail));
    println!("  Bias:       {}", step_line(&summary.bias, bias_detail));

    let elapsed = summary.finished_at - summary.started_at;
    let label = match summary.status_label() {
        "ok" => "ok".green().bold(),
        other => other.yellow().bold(),
    };
    println!(
        "\n  Status: {}  ({:.1}s)",
        label,
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}

pub fn display_cluster_outcome(outcome: &ClusterOutcome) {
    println!("Clustering: {}", cluster_detail(outcome));
}

pub fn display_bias_outcome(outcome: &BiasOutcome) {
    println!("Bias: {}", bias_detail(outcome));
}

pub fn display_ingest_outcome(outcome: &IngestOutcome) {
    println!(
        "Ingested {} new articles ({} duplicates, {} invalid)",
        outcome.inserted.to_string().green(),
        outcome.duplicates,
        if outcome.invalid > 0 {
            outcome.invalid.to_string().yellow()
        } else {
            outcome.invalid.to_string().normal()
        }
    );
}

fn cluster_detail(o: &ClusterOutcome) -> String {
    let mut line = format!("{} articles into {} topics", o.processed, o.clusters);
    if o.update_failures > 0 {
        line.push_str(&format!(", {} updates failed", o.update_failures));
    }
    line
}

fn bias_detail(o: &BiasOutcome) -> String {
    let mut line = format!(
        "{} articles scored across {} topics, {} missing features",
        o.scored, o.topics, o.unscored
    );
    if o.update_failures > 0 {
        line.push_str(&format!(", {} updates failed", o.update_failures));
    }
    line
}

fn step_line<T>(status: &StepStatus<T>, detail: impl Fn(&T) -> String) -> String {
    match status {
        StepStatus::Completed(value) => format!("{} {}", "done".green(), detail(value)),
        StepStatus::Skipped(reason) => format!("{} ({})", "skipped".dimmed(), reason),
        StepStatus::Failed(error) => format!("{} {}", "failed".red().bold(), error),
    }
}

fn topic_label(topic: i64) -> String {
    if topic == UNCLUSTERED_TOPIC {
        "-".to_string()
    } else {
        topic.to_string()
    }
}

fn topic_heading(topic: i64) -> String {
    if topic == UNCLUSTERED_TOPIC {
        "Unclustered".to_string()
    } else {
        format!("Topic {topic}")
    }
}

/// Colorize a bias score by magnitude.
fn colorize_bias(score: f64) -> colored::ColoredString {
    let text = format!("{score:>+6.2}");
    match score.abs() {
        a if a >= 2.0 => text.red().bold(),
        a if a >= 1.0 => text.bright_red(),
        a if a >= 0.5 => text.yellow(),
        _ => text.normal(),
    }
}
