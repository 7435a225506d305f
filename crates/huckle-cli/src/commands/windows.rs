use chrono::{DateTime, Local, NaiveTime, Utc};
use clap::Args;
use huckle_core::{
    format_signed_hm, Config, FeedEntry, FeedingRecord, TimerEngine, TimerReading, Volume,
};

#[derive(Args)]
pub struct WindowsArgs {
    /// Feeding time (RFC 3339, or HH:MM today in local time)
    #[arg(long)]
    pub fed_at: String,
    /// Evaluate at this time instead of now
    #[arg(long)]
    pub now: Option<String>,
    /// Print the reading as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: WindowsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let fed_at = parse_time(&args.fed_at)?;
    let now = match args.now.as_deref() {
        Some(input) => parse_time(input)?,
        None => Utc::now(),
    };

    // Only the timestamp matters for the windows.
    let record = FeedingRecord::remote(FeedEntry {
        timestamp: fed_at,
        volume: Volume {
            amount: 0,
            unit: config.display.default_unit,
        },
    });
    let reading = TimerEngine::new(config.window_config()).compute(Some(&record), now);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
    } else {
        print!("{}", table(&reading));
    }
    Ok(())
}

fn table(reading: &TimerReading) -> String {
    let mut out = String::new();
    if let Some(elapsed) = reading.elapsed {
        out.push_str(&format!("{:<11} {}\n", "elapsed", format_signed_hm(elapsed)));
    }
    for w in &reading.windows {
        let window = &w.window;
        let (Some(upper), Some(offset), Some(half)) = (
            window.upper,
            window.offset_from_midpoint(reading.computed_at),
            window.half_width(),
        ) else {
            continue;
        };
        out.push_str(&format!(
            "{:<11} {}-{}  {:<12} {}±{}\n",
            window.kind.label(),
            window.lower.with_timezone(&Local).format("%H:%M"),
            upper.with_timezone(&Local).format("%H:%M"),
            w.status.label(),
            format_signed_hm(offset),
            half.num_minutes()
        ));
    }
    out
}

fn parse_time(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Ok(t.with_timezone(&Utc));
    }
    let time = NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|_| format!("invalid time '{input}': expected RFC 3339 or HH:MM"))?;
    Local::now()
        .date_naive()
        .and_time(time)
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| format!("{input} does not exist in the local timezone today"))
}
