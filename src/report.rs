use std::time::Duration;

use crate::db::RunRow;
use crate::evaluate::{Band, EvaluationSummary};
use crate::review::ListingMetadata;

const TOP_TERMS: usize = 10;

pub fn print_summary(metadata: &ListingMetadata, summary: &EvaluationSummary, dropped: usize) {
    println!("Product:        {}", metadata.item_name);
    println!("Average rating: {}", metadata.aggregate_rating);
    println!(
        "Scored:         {} reviews ({} dropped without a usable rating)",
        summary.total, dropped
    );
    println!(
        "Accuracy:       {:.2}% ({} of {} match)",
        summary.accuracy_percent, summary.matches, summary.total
    );

    println!("\n--- Confusion matrix (rows: actual, columns: predicted) ---");
    print!("{:>8}", "");
    for label in summary.labels {
        print!(" {:>6}", label);
    }
    println!();
    for (label, row) in summary.labels.iter().zip(summary.confusion_matrix.iter()) {
        print!("{:>8}", label);
        for count in row {
            print!(" {:>6}", count);
        }
        println!();
    }

    println!("\n--- Rating distribution ---");
    println!("{:>5} | {:>7} | {:>9}", "Stars", "Actual", "Predicted");
    println!("{}", "-".repeat(27));
    for (i, label) in summary.labels.iter().enumerate() {
        println!(
            "{:>5} | {:>7} | {:>9}",
            label, summary.declared_histogram[i], summary.predicted_histogram[i]
        );
    }

    println!("\n--- Frequent terms ---");
    for band in Band::ALL {
        let terms = summary.groups.top_terms(band, TOP_TERMS);
        if terms.is_empty() {
            println!("  {}: (no reviews)", band.label());
            continue;
        }
        let list: Vec<String> = terms.iter().map(|(t, n)| format!("{} ({})", t, n)).collect();
        println!("  {}: {}", band.label(), list.join(", "));
    }
}

pub fn print_history(rows: &[RunRow]) {
    println!(
        "{:>4} | {:<28} | {:>6} | {:>5} | {:>7} | {:>8} | {:<9} | {:<20}",
        "#", "Product", "Rating", "Pages", "Reviews", "Accuracy", "Scheme", "Started"
    );
    println!("{}", "-".repeat(108));
    for r in rows {
        println!(
            "{:>4} | {:<28} | {:>6} | {:>5} | {:>7} | {:>7.2}% | {:<9} | {:<20}",
            r.id,
            truncate(&r.item_name, 28),
            truncate(&r.aggregate_rating, 6),
            r.pages_visited,
            format!("{}/{}", r.scored_reviews, r.total_reviews),
            r.accuracy,
            r.scheme,
            truncate(&r.started_at, 19),
        );
    }
    for r in rows {
        println!("  #{}: {} ({})", r.id, r.url, r.stop_reason);
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("Kettle", 10), "Kettle");
        assert_eq!(truncate("Stainless Steel Kettle", 10), "Stainl...");
        assert_eq!(truncate("Käsekuchen-Form", 8).chars().count(), 8);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
