//! Terminal rendering of store snapshots.

use colored::Colorize;
use reachboard_state::projection::{
    average_engagement, average_growth, classify_delta, consistency_band, format_magnitude,
    share_label, summary_cards, Band, DeltaClass,
};
use reachboard_state::{AuthState, Domain, FetchOutcome, Gate, RootState};

pub fn dashboard(state: &RootState) {
    println!();
    println!("{}", "Analytics Dashboard".bold());
    println!(
        "{}",
        "Comprehensive view of audience metrics across all channels".bright_black()
    );
    for d in Domain::ALL {
        domain(state, d);
    }
}

/// One domain's section, with its inline error if it has one.
pub fn domain(state: &RootState, domain: Domain) {
    println!();
    println!("{}", heading(domain).bright_cyan().bold());

    let view = state.view(domain);
    if let Some(error) = view.error {
        println!("  {} {}", "!".red().bold(), error.red());
        // Stale data stays visible below the error.
        if !view.has_data {
            return;
        }
    }
    if !view.has_data {
        let note = if view.is_loading { "loading..." } else { "no data" };
        println!("  {}", note.bright_black());
        return;
    }

    match domain {
        Domain::Summary => summary(state),
        Domain::ChannelMetrics => channels(state),
        Domain::AudienceMetrics => audience(state),
        Domain::ContentMetrics => content(state),
        Domain::TrendSeries => trends(state),
    }
}

fn heading(domain: Domain) -> &'static str {
    match domain {
        Domain::Summary => "Overview",
        Domain::ChannelMetrics => "Channel Performance",
        Domain::AudienceMetrics => "Audience Distribution",
        Domain::ContentMetrics => "Content Performance",
        Domain::TrendSeries => "Audience Trends",
    }
}

fn arrow(delta: DeltaClass) -> colored::ColoredString {
    match delta {
        DeltaClass::Positive => "▲".green(),
        DeltaClass::Negative | DeltaClass::Zero => "▼".red(),
    }
}

fn summary(state: &RootState) {
    let Some(data) = state.summary().data() else {
        return;
    };
    for card in summary_cards(data) {
        let change = if card.delta.is_positive() {
            card.change.green()
        } else {
            card.change.red()
        };
        println!(
            "  {:<22}{:>12}  {} {}",
            card.title,
            card.value.bold(),
            arrow(card.delta),
            change
        );
    }

    let band = match consistency_band(data.content_consistency) {
        Band::Good => "good".green(),
        Band::Fair => "fair".yellow(),
        Band::Poor => "poor".red(),
    };
    println!("  {:<22}{:>12}", "Consistency band", band);
}

fn channels(state: &RootState) {
    let Some(rows) = state.channels().data() else {
        return;
    };
    println!(
        "  {:<20}{:>10}{:>13}{:>13}",
        "Channel".bright_black(),
        "Reach".bright_black(),
        "Engagement".bright_black(),
        "Conversion".bright_black()
    );
    for row in rows {
        println!(
            "  {:<20}{:>10}{:>12}%{:>12}%",
            row.name,
            format_magnitude(row.reach),
            row.engagement,
            row.conversion
        );
    }
}

fn audience(state: &RootState) {
    let Some(rows) = state.audience().data() else {
        return;
    };
    for row in rows {
        println!(
            "  {:<20}{:>10}{:>8}",
            row.platform,
            format_magnitude(row.value),
            share_label(row.percentage)
        );
    }
}

fn content(state: &RootState) {
    let Some(rows) = state.content().data() else {
        return;
    };
    for row in rows {
        let growth = format!("{}%", row.growth);
        let growth = match classify_delta(row.growth) {
            DeltaClass::Positive => growth.green(),
            DeltaClass::Negative | DeltaClass::Zero => growth.red(),
        };
        println!(
            "  {:<20}{:>10}{:>12}%{:>10}",
            row.kind,
            format_magnitude(row.reach),
            row.engagement,
            growth
        );
    }

    let percent = |value: Option<f64>| match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    };
    println!(
        "  {} {}   {} {}",
        "Avg engagement".bright_black(),
        percent(average_engagement(rows)),
        "Avg growth".bright_black(),
        percent(average_growth(rows))
    );
}

fn trends(state: &RootState) {
    let Some(points) = state.trends().data() else {
        return;
    };
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        println!("  {}", "no periods".bright_black());
        return;
    };

    for (name, value) in last.channels() {
        println!("  {:<20}{:>10}", name, format_magnitude(value));
    }
    println!(
        "  {:<20}{:>10}  ({} to {}, from {})",
        "Total".bold(),
        format_magnitude(last.total()).bold(),
        first.month,
        last.month,
        format_magnitude(first.total())
    );
}

pub fn outcome(domain: Domain, seq: u64, outcome: &FetchOutcome) {
    let status = match outcome {
        FetchOutcome::Applied => "applied".green(),
        FetchOutcome::Discarded => "discarded (superseded)".yellow(),
        FetchOutcome::Failed(message) => format!("failed: {}", message).red(),
        FetchOutcome::Aborted => "aborted".red(),
    };
    println!("  {:<10} #{:<3} {}", domain.as_str(), seq, status);
}

pub fn auth(auth: &AuthState, gate: Gate) {
    match (gate, auth.current_user()) {
        (Gate::Dashboard, Some(user)) => println!(
            "{} {} <{}>",
            "Signed in as".green(),
            user.name.bold(),
            user.email
        ),
        _ => println!("{}", "Not signed in.".yellow()),
    }
    if let Some(error) = auth.error() {
        println!("  {} {}", "!".red().bold(), error.red());
    }
}
