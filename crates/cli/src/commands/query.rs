//! Query command - show insights for a subreddit

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use subreddit_insights_domain::timeline::TimelineRange;
use subreddit_insights_domain::usecases::{DateWindow, InsightQuery, RangeFilter, aggregate_by_topic};
use subreddit_insights_domain::{InsightsResponse, MappedInsight, SystemClock};

use super::open_store;
use crate::args::{InsightView, QueryArgs};
use crate::config::AppConfig;

pub async fn execute(args: QueryArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    // No range flags means every insight is shown
    let window = if args.range.is_some() || args.start.is_some() || args.end.is_some() {
        Some(
            DateWindow::parse(
                args.range.as_deref(),
                args.start.as_deref(),
                args.end.as_deref(),
            )
            .context("Invalid date range")?,
        )
    } else {
        None
    };

    let store = open_store(&config).await?;
    let query = InsightQuery::new(store, config.query_config());
    let mut response = query
        .resolve(args.subreddit.as_deref(), args.id.as_deref())
        .await?;

    if let Some(window) = &window {
        let filter = RangeFilter::new(Arc::new(SystemClock));
        response.raw_insights = narrow(&filter, &response.raw_insights, window);
        response.filtered_insights = narrow(&filter, &response.filtered_insights, window);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_listing(&response, &args, window.as_ref());
    Ok(())
}

fn narrow(
    filter: &RangeFilter<SystemClock>,
    insights: &[MappedInsight],
    window: &DateWindow,
) -> Vec<MappedInsight> {
    filter
        .filter(insights, window)
        .into_iter()
        .cloned()
        .collect()
}

fn print_listing(response: &InsightsResponse, args: &QueryArgs, window: Option<&DateWindow>) {
    let (view, insights) = match args.view {
        InsightView::Raw => ("raw", &response.raw_insights),
        InsightView::Filtered => ("filtered", &response.filtered_insights),
    };

    println!("Subreddit:   {}", response.subreddit);
    println!("Resolved id: {}", response.resolved_id);
    if let Some(fallback) = &response.fallback {
        println!("Fallback:    {}", fallback.reason);
    }
    match window {
        Some(window) => println!("View:        {} ({})", view, window.label()),
        None => println!("View:        {}", view),
    }
    println!();

    if insights.is_empty() {
        println!("No insights.");
        return;
    }

    for insight in insights {
        let timeline = TimelineRange::parse_label(&insight.timeline)
            .map(|range| range.display_label())
            .unwrap_or_else(|| insight.timeline.clone());
        println!(
            "  {:<25} {:>5}  {}",
            timeline, insight.mentions, insight.topic
        );
    }

    if let Some(top) = args.top {
        println!();
        println!("Top topics:");
        for total in aggregate_by_topic(insights, top) {
            println!("  {:>5}  {}", total.mentions, total.topic);
        }
    }
}
