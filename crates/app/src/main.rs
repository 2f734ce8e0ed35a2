use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use progress_core::SortOrder;
use progress_core::model::{CollectionId, EntityId};
use services::{Clock, HttpTransport, ReportConfig, ReportService, ReportView};
use storage::InMemoryReportRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

const COURSE_VAR: &str = "PROGRESS_COURSE_ID";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidOrder { raw: String },
    InvalidId { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidOrder { raw } => write!(f, "invalid --order value: {raw}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_id(value: String, flag: &'static str) -> Result<String, ArgsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err(ArgsError::InvalidId { flag, raw: value });
    }
    Ok(trimmed.to_owned())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  progress-report report  --course <id> [--out <dir>] [--order asc|desc]");
    eprintln!("  progress-report roster  --course <id>");
    eprintln!("  progress-report groups  --course <id> --student <id>");
    eprintln!("  progress-report course  --course <id>");
    eprintln!();
    eprintln!("Defaults for report:");
    eprintln!("  --out .");
    eprintln!("  --order asc");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_PLATFORM_URL, PROGRESS_API_TOKEN (required)");
    eprintln!("  PROGRESS_COURSE_ID, PROGRESS_CONCURRENCY, PROGRESS_EXCLUDED_GROUPS,");
    eprintln!("  PROGRESS_COLUMN_PREFIX, PROGRESS_REQUEST_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Report,
    Roster,
    Groups,
    Course,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "report" => Some(Self::Report),
            "roster" => Some(Self::Roster),
            "groups" => Some(Self::Groups),
            "course" => Some(Self::Course),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    course: CollectionId,
    student: Option<EntityId>,
    out_dir: PathBuf,
    order: SortOrder,
}

impl Args {
    /// `Ok(None)` when usage was requested.
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut course = std::env::var(COURSE_VAR)
            .ok()
            .and_then(|value| require_id(value, "--course").ok());
        let mut student = None;
        let mut out_dir = PathBuf::from(".");
        let mut order = SortOrder::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--course" => {
                    course = Some(require_id(require_value(args, "--course")?, "--course")?);
                }
                "--student" if cmd == Command::Groups => {
                    student = Some(require_id(require_value(args, "--student")?, "--student")?);
                }
                "--out" if cmd == Command::Report => {
                    out_dir = PathBuf::from(require_value(args, "--out")?);
                }
                "--order" if cmd == Command::Report => {
                    let value = require_value(args, "--order")?;
                    order = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidOrder { raw: value.clone() })?;
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let course = course.ok_or(ArgsError::MissingFlag { flag: "--course" })?;
        if cmd == Command::Groups && student.is_none() {
            return Err(ArgsError::MissingFlag { flag: "--student" });
        }

        Ok(Some(Self {
            course: CollectionId::new(course),
            student: student.map(EntityId::new),
            out_dir,
            order,
        }))
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Some(parsed) = parsed else {
        print_usage();
        return Ok(());
    };

    let config = ReportConfig::from_env()?;
    let transport = Arc::new(HttpTransport::new(&config.api));
    let reports = Arc::new(InMemoryReportRepository::new());
    let service = ReportService::new(transport, reports, config, Clock::system());

    match cmd {
        Command::Report => write_report(&service, &parsed).await,
        Command::Roster => {
            let entities = service.list_entities(&parsed.course).await?;
            println!("{}", serde_json::to_string_pretty(&entities)?);
            Ok(())
        }
        Command::Groups => {
            let Some(student) = parsed.student.as_ref() else {
                return Err(ArgsError::MissingFlag { flag: "--student" }.into());
            };
            let groups = service.fetch_groups(&parsed.course, student).await?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
            Ok(())
        }
        Command::Course => {
            let details = service.collection_details(&parsed.course).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(())
        }
    }
}

async fn write_report(
    service: &ReportService,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = service.report(&args.course).await?;
    std::fs::create_dir_all(&args.out_dir)?;

    for (view, file) in [
        (ReportView::Summary, "summary.json"),
        (ReportView::Detail, "detail.json"),
        (ReportView::Csv, "progreso.csv"),
    ] {
        let Some(payload) = service.view(&args.course, view, args.order).await? else {
            continue;
        };
        let path = args.out_dir.join(file);
        write_file(&path, payload.body())?;
        info!(view = %view, path = %path.display(), "view written");
    }

    for failure in snapshot.failures() {
        eprintln!(
            "warning: no progress for {} ({}): {}",
            failure.display_name, failure.entity_id, failure.reason
        );
    }
    eprintln!(
        "{} students, {} modules, {} summary rows written to {}",
        snapshot.entity_count(),
        snapshot.pivot().column_count(),
        snapshot.summary().len(),
        args.out_dir.display()
    );
    Ok(())
}

fn write_file(path: &Path, body: &str) -> std::io::Result<()> {
    std::fs::write(path, body.as_bytes())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Option<Args>, ArgsError> {
        let mut iter = args.iter().map(|arg| (*arg).to_owned());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn help_returns_no_args() {
        assert!(parse(Command::Report, &["--help"]).unwrap().is_none());
        assert!(parse(Command::Groups, &["--course", "7", "-h"]).unwrap().is_none());
    }

    #[test]
    fn report_flags_are_parsed() {
        let args = parse(Command::Report, &["--course", " 7 ", "--order", "desc", "--out", "out"])
            .unwrap()
            .unwrap();
        assert_eq!(args.course, CollectionId::from(7));
        assert_eq!(args.order, SortOrder::Descending);
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert!(args.student.is_none());
    }

    #[test]
    fn groups_requires_a_student() {
        let err = parse(Command::Groups, &["--course", "7"]).unwrap_err();
        assert!(matches!(err, ArgsError::MissingFlag { flag: "--student" }));

        let args = parse(Command::Groups, &["--course", "7", "--student", "12"]).unwrap().unwrap();
        assert_eq!(args.student, Some(EntityId::from(12)));
    }

    #[test]
    fn flags_outside_their_command_are_rejected() {
        let err = parse(Command::Roster, &["--course", "7", "--order", "asc"]).unwrap_err();
        assert!(matches!(err, ArgsError::UnknownArg(arg) if arg == "--order"));

        let err = parse(Command::Report, &["--course", "a/b"]).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidId { flag: "--course", .. }));
    }
}
