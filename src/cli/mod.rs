//! CLI definition and entry point
//!
//! Flag parsing and validation happen here, before any repository is
//! touched; everything that survives validation is handed to the importer
//! as one immutable config value.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use console::style;

use crate::importer::{Identity, Importer};

/// Exit code for usage and validation errors.
const EXIT_USAGE: i32 = 2;
/// Exit code for a run that failed after validation.
const EXIT_FAILURE: i32 = 1;

/// Find commits by a git author in one repository and recreate them as
/// empty commits by a new author in another repository.
#[derive(Parser, Debug)]
#[command(name = "gh-activity-importer")]
#[command(
    version,
    about = "Transfer git commit activity between repositories without transferring content",
    after_help = "\
Examples:
  gh-activity-importer --source-repo ~/work/big-project --dest-repo ~/activity \\
      --source-author-email you@corp.example \\
      --dest-author-name 'Jane Doe' --dest-author-email jane@example.com \\
      --start-date 2024/1/1 --end-date 2024/6/30

Dates use the slash-delimited form year/month/day. The start date is
inclusive from midnight UTC; the end date covers the whole given day."
)]
pub struct Cli {
    /// Path or URL of the git repository commits are read from
    #[arg(long, value_name = "LOCATOR")]
    pub source_repo: String,

    /// Path or URL of the git repository empty commits are saved to
    #[arg(long, value_name = "LOCATOR")]
    pub dest_repo: String,

    /// Name of the author to find commits for in the source repo.
    /// At least one of --source-author-name and --source-author-email is required.
    #[arg(long, default_value = "")]
    pub source_author_name: String,

    /// Email of the author to find commits for in the source repo.
    /// At least one of --source-author-name and --source-author-email is required.
    #[arg(long, default_value = "")]
    pub source_author_email: String,

    /// Author name for the saved commits (defaults to --source-author-name)
    #[arg(long)]
    pub dest_author_name: Option<String>,

    /// Author email for the saved commits (defaults to --source-author-email)
    #[arg(long)]
    pub dest_author_email: Option<String>,

    /// Only consider source commits on or after this date (year/month/day)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<String>,

    /// Only consider source commits up to and including this date (year/month/day, default: today)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

/// Validate flags, run the importer, and map the outcome to an exit code.
pub fn run(cli: Cli) -> i32 {
    if cli.source_author_name.is_empty() && cli.source_author_email.is_empty() {
        println!("at least one of 'source-author-name' and 'source-author-email' is required");
        return EXIT_USAGE;
    }

    let start = match &cli.start_date {
        Some(value) => match parse_date(value, Bound::Lower) {
            Ok(instant) => instant,
            Err(err) => {
                println!("failed to parse start-date: {err:#}");
                return EXIT_USAGE;
            }
        },
        None => DateTime::UNIX_EPOCH,
    };

    let end_value = cli.end_date.clone().unwrap_or_else(today);
    let end = match parse_date(&end_value, Bound::Upper) {
        Ok(instant) => instant,
        Err(err) => {
            println!("failed to parse end-date: {err:#}");
            return EXIT_USAGE;
        }
    };

    if start > end {
        println!("start-date must be before end-date");
        return EXIT_USAGE;
    }

    let source_author = Identity {
        name: cli.source_author_name,
        email: cli.source_author_email,
    };
    let dest_author = Identity {
        name: cli
            .dest_author_name
            .unwrap_or_else(|| source_author.name.clone()),
        email: cli
            .dest_author_email
            .unwrap_or_else(|| source_author.email.clone()),
    };

    let importer = Importer {
        source_repo: cli.source_repo,
        dest_repo: cli.dest_repo,
        source_author,
        dest_author,
        start,
        end,
    };

    match importer.run() {
        Ok(count) => {
            println!(
                "{} transferred {} commits from '{}' to '{}'",
                style("successfully").green().bold(),
                count,
                importer.source_repo,
                importer.dest_repo
            );
            println!(
                "Verify the destination history (with something like `git log`). \
                 If it looks good, push to the remote, wait a few minutes, then check your profile!"
            );
            0
        }
        Err(err) => {
            println!("gh-activity-importer encountered an error: {err}");
            EXIT_FAILURE
        }
    }
}

/// Whether a parsed date is the start or the end of the search window.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

/// Parse a slash-delimited `year/month/day` string into a UTC instant.
///
/// A lower bound becomes midnight at the start of the given day; an upper
/// bound becomes midnight at the start of the *following* day, keeping the
/// window end exclusive while covering the whole named day.
fn parse_date(value: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let parts: Vec<&str> = value.split('/').collect();
    if parts.len() != 3 {
        bail!("expected slash-delimited format 'year/month/day', got '{value}'");
    }

    let year: i32 = parts[0]
        .parse()
        .with_context(|| format!("failed to parse year '{}'", parts[0]))?;
    let month: u32 = parts[1]
        .parse()
        .with_context(|| format!("failed to parse month '{}'", parts[1]))?;
    if !(1..=12).contains(&month) {
        bail!("invalid month '{month}': outside valid range 1-12");
    }
    let day: u32 = parts[2]
        .parse()
        .with_context(|| format!("failed to parse day '{}'", parts[2]))?;
    if !(1..=31).contains(&day) {
        bail!("invalid day '{day}': outside valid range 1-31");
    }

    // Days past the end of a shorter month roll into the next one (April 31
    // parses as May 1). Historical behavior, kept as-is.
    let date = match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => {
            NaiveDate::from_ymd_opt(year, month, 1)
                .with_context(|| format!("invalid date '{value}'"))?
                + Duration::days(i64::from(day) - 1)
        }
    };

    let date = match bound {
        Bound::Lower => date,
        Bound::Upper => date + Duration::days(1),
    };

    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Default for --end-date: today's UTC date.
fn today() -> String {
    let now = Utc::now();
    format!("{}/{}/{}", now.year(), now.month(), now.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_lower_bound_is_start_of_day() {
        assert_eq!(parse_date("2024/3/5", Bound::Lower).unwrap(), utc(2024, 3, 5));
    }

    #[test]
    fn test_upper_bound_is_start_of_next_day() {
        assert_eq!(parse_date("2024/3/5", Bound::Upper).unwrap(), utc(2024, 3, 6));
    }

    #[test]
    fn test_upper_bound_rolls_over_month_end() {
        assert_eq!(
            parse_date("2024/3/31", Bound::Upper).unwrap(),
            utc(2024, 4, 1)
        );
    }

    #[test]
    fn test_day_overflow_rolls_into_next_month() {
        // April has 30 days; day 31 normalizes to May 1 rather than erroring
        assert_eq!(
            parse_date("2024/4/31", Bound::Lower).unwrap(),
            utc(2024, 5, 1)
        );
    }

    #[test]
    fn test_rejects_wrong_part_count() {
        assert!(parse_date("2024/3", Bound::Lower).is_err());
        assert!(parse_date("2024/3/5/1", Bound::Lower).is_err());
        assert!(parse_date("2024-03-05", Bound::Lower).is_err());
    }

    #[test]
    fn test_rejects_non_numeric_parts() {
        assert!(parse_date("year/3/5", Bound::Lower).is_err());
        assert!(parse_date("2024/march/5", Bound::Lower).is_err());
        assert!(parse_date("2024/3/five", Bound::Lower).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_parts() {
        assert!(parse_date("2024/0/5", Bound::Lower).is_err());
        assert!(parse_date("2024/13/5", Bound::Lower).is_err());
        assert!(parse_date("2024/3/0", Bound::Lower).is_err());
        assert!(parse_date("2024/3/32", Bound::Lower).is_err());
    }

    #[test]
    fn test_cli_parses_minimal_flags() {
        let cli = Cli::try_parse_from([
            "gh-activity-importer",
            "--source-repo",
            "/tmp/src",
            "--dest-repo",
            "/tmp/dest",
            "--source-author-email",
            "me@example.com",
        ])
        .unwrap();
        assert_eq!(cli.source_author_name, "");
        assert_eq!(cli.source_author_email, "me@example.com");
        assert!(cli.dest_author_name.is_none());
    }
}
