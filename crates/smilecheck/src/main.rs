//! `smilecheck` - CLI for the smilecheck attendance store
//!
//! This binary registers users, records attendance from face captures and
//! reports on the stored records.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::error::Error as StdError;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use smilecheck::camera::{read_face_file, ReplaySource};
use smilecheck::cli::{
    AttendanceCommand, Cli, Command, ConfigCommand, DashboardCommand, OutputFormat,
    RegisterCommand, ScanCommand, UsersCommand,
};
use smilecheck::report::{self, ProfileSummary};
use smilecheck::{
    init_logging, run_scan, AttendanceRecord, AttendanceRecorder, Config, Error, RecordStore,
    Registration, ScanHandle, ScanOutcome, SqliteStore, SystemClock, UserProfile, UserUpdate,
    Zone,
};

type CliResult = Result<(), Box<dyn StdError>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_line(e.as_ref()));
            ExitCode::from(exit_status(e.as_ref()))
        }
    }
}

/// The one line shown to the user for a failed command.
fn error_line(err: &(dyn StdError + 'static)) -> String {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_camera_error() => format!("Camera error: {e}"),
        _ => format!("Error: {err}"),
    }
}

/// 2 for rejected input the user can correct, 1 for everything else.
fn exit_status(err: &(dyn StdError + 'static)) -> u8 {
    if err
        .downcast_ref::<Error>()
        .is_some_and(Error::is_validation_error)
    {
        2
    } else {
        1
    }
}

fn run(cli: Cli) -> CliResult {
    let config = Config::load_from(cli.config)?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        command => {
            let mut store = open_store(&config)?;
            match command {
                Command::Register(cmd) => handle_register(&mut store, cmd),
                Command::Users(cmd) => handle_users(&mut store, cmd),
                Command::Mark(cmd) => {
                    let Some(record) = store.mark_attendance(&cmd.user_id, cmd.status.into())?
                    else {
                        return Err(format!("no user with id {}", cmd.user_id).into());
                    };
                    println!(
                        "Marked {} {} at {}",
                        cmd.user_id,
                        record.status,
                        format_timestamp(store.zone(), &record)
                    );
                    Ok(())
                }
                Command::Identify(cmd) => {
                    let payload = read_face_file(&cmd.face)?;
                    match store.find_user_by_face(&payload) {
                        Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
                        None => println!("No matching user."),
                    }
                    Ok(())
                }
                Command::Scan(cmd) => handle_scan(&config, &mut store, cmd),
                Command::Attendance(cmd) => handle_attendance(&store, &cmd),
                Command::Dashboard(cmd) => handle_dashboard(&store, &cmd),
                Command::Config(_) | Command::Status(_) => Ok(()),
            }
        }
    }
}

fn open_store(config: &Config) -> Result<RecordStore, Box<dyn StdError>> {
    let backend = SqliteStore::open(config.database_path())?;
    Ok(RecordStore::with_clock(
        backend,
        Arc::new(SystemClock),
        config.zone()?,
    ))
}

fn format_timestamp(zone: Zone, record: &AttendanceRecord) -> String {
    zone.localize(record.timestamp)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn handle_register(store: &mut RecordStore, cmd: RegisterCommand) -> CliResult {
    let face = read_face_file(&cmd.face)?;
    let profile = smilecheck::register(
        store,
        Registration {
            name: cmd.name,
            email: cmd.email,
            department: cmd.department,
            face: Some(face),
        },
    )?;
    println!("Registered {} ({})", profile.name, profile.id);
    Ok(())
}

fn handle_users(store: &mut RecordStore, cmd: UsersCommand) -> CliResult {
    match cmd {
        UsersCommand::List { format } => print_users(&store.list_users(), format)?,
        UsersCommand::Show { id, json } => {
            let Some(user) = store.get_user(&id) else {
                return Err(format!("no user with id {id}").into());
            };
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ProfileSummary::from(&user))?
                );
            } else {
                println!("Id:          {}", user.id);
                println!("Name:        {}", user.name);
                println!("Email:       {}", user.email);
                println!("Department:  {}", user.department);
                println!("Registered:  {}", user.created_at.to_rfc3339());
                println!("Face:        {} bytes ({})", user.face.len(), user.face.short_fingerprint());
            }
        }
        UsersCommand::Update {
            id,
            name,
            email,
            department,
            face,
        } => {
            if let Some(email) = &email {
                if store
                    .find_user_by_email(email)
                    .is_some_and(|other| other.id != id)
                {
                    return Err(Error::DuplicateEmail {
                        email: email.clone(),
                    }
                    .into());
                }
            }
            let update = UserUpdate {
                name,
                email,
                department,
                face: face.as_deref().map(read_face_file).transpose()?,
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            match store.update_user(&id, update)? {
                Some(user) => println!("Updated {} ({})", user.name, user.id),
                None => return Err(format!("no user with id {id}").into()),
            }
        }
        UsersCommand::Delete { id } => {
            if store.delete_user(&id)? {
                println!("Deleted {id} and their attendance records.");
            } else {
                return Err(format!("no user with id {id}").into());
            }
        }
    }
    Ok(())
}

fn print_users(users: &[UserProfile], format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => {
            let summaries: Vec<ProfileSummary> = users.iter().map(ProfileSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Plain => {
            for user in users {
                println!("{}\t{}\t{}\t{}", user.id, user.name, user.email, user.department);
            }
        }
        OutputFormat::Table => {
            println!("{:<36}  {:<24}  {:<28}  DEPARTMENT", "ID", "NAME", "EMAIL");
            for user in users {
                println!(
                    "{:<36}  {:<24}  {:<28}  {}",
                    user.id, user.name, user.email, user.department
                );
            }
            println!();
            println!("{} user(s)", users.len());
        }
    }
    Ok(())
}

fn handle_scan(config: &Config, store: &mut RecordStore, cmd: ScanCommand) -> CliResult {
    let mut source = ReplaySource::from_files(cmd.frames);
    let mut recorder = AttendanceRecorder::new();
    let options = config.scan_options(cmd.simulate);
    let handle = ScanHandle::new();

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(async {
        let stopper = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stopper.stop();
            }
        });
        run_scan(store, &mut recorder, &mut source, &options, &handle).await
    });

    match outcome {
        Ok(ScanOutcome::Recognized { user, record }) => {
            println!("Recognized {} ({})", user.name, user.department);
            if let Some(record) = record {
                println!(
                    "Attendance marked {} at {}",
                    record.status,
                    format_timestamp(store.zone(), &record)
                );
            }
        }
        Ok(ScanOutcome::NoUsersRegistered) => {
            println!("No users found. Register at least one user before scanning.");
        }
        Ok(ScanOutcome::Cancelled) => println!("Scan cancelled."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn handle_attendance(store: &RecordStore, cmd: &AttendanceCommand) -> CliResult {
    let records = report::attendance_listing(store, cmd.user.as_deref(), cmd.date);

    let name_of = |user_id: &str| {
        store
            .get_user(user_id)
            .map_or_else(|| "Unknown User".to_string(), |u| u.name)
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Plain => {
            for record in &records {
                println!(
                    "{}\t{}\t{}\t{}",
                    format_timestamp(store.zone(), record),
                    record.user_id,
                    name_of(&record.user_id),
                    record.status
                );
            }
        }
        OutputFormat::Table => {
            println!("{:<19}  {:<24}  STATUS", "TIME", "NAME");
            for record in &records {
                println!(
                    "{:<19}  {:<24}  {}",
                    format_timestamp(store.zone(), record),
                    name_of(&record.user_id),
                    record.status
                );
            }
            println!();
            println!("{} record(s)", records.len());
        }
    }
    Ok(())
}

fn handle_dashboard(store: &RecordStore, cmd: &DashboardCommand) -> CliResult {
    let Some(board) = report::dashboard(store, &cmd.user_id, cmd.days) else {
        return Err(format!("no user with id {}", cmd.user_id).into());
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    println!("{} <{}>, {}", board.user.name, board.user.email, board.user.department);
    println!("-------------------------");
    println!("Present:          {}", board.summary.present);
    println!("Absent:           {}", board.summary.absent);
    println!("Late:             {}", board.summary.late);
    println!("Attendance rate:  {}", board.summary.rate_display());
    match &board.last_attendance {
        Some(record) => println!(
            "Last attendance:  {} ({})",
            format_timestamp(store.zone(), record),
            record.status
        ),
        None => println!("Last attendance:  none"),
    }
    println!();
    if cmd.days == 0 {
        println!("All records:");
    } else {
        println!("Last {} days:", cmd.days);
    }
    if board.records.is_empty() {
        println!("  No attendance records found.");
    }
    for record in &board.records {
        println!("  {}  {}", format_timestamp(store.zone(), record), record.status);
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> CliResult {
    let database_path = config.database_path();
    let backend = SqliteStore::open(&database_path)?;
    let size_bytes = backend.size_bytes();
    let zone = config.zone()?;
    let store = RecordStore::with_clock(backend, Arc::new(SystemClock), zone);
    let stats = store.stats();

    if json {
        let status = serde_json::json!({
            "database_path": database_path,
            "database_size_bytes": size_bytes,
            "zone": zone.to_string(),
            "today": store.today(),
            "total_users": stats.total_users,
            "total_records": stats.total_records,
            "oldest_record": stats.oldest_record,
            "newest_record": stats.newest_record,
            "present_today": store.attendance_on_date(store.today()).len(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("smilecheck status");
        println!("-----------------");
        println!("Database:       {}", database_path.display());
        println!("Size:           {size_bytes} bytes");
        println!("Time zone:      {zone}");
        println!("Users:          {}", stats.total_users);
        println!("Records:        {}", stats.total_records);
        println!(
            "Marked today:   {}",
            store.attendance_on_date(store.today()).len()
        );
        if let Some(newest) = stats.newest_record {
            println!("Newest record:  {}", zone.localize(newest).format("%Y-%m-%d %H:%M:%S"));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:        {}", config.database_path().display());
                println!();
                println!("[Scan]");
                println!("  Capture interval:     {} ms", config.scan.capture_interval_ms);
                println!("  Simulate recognition: {}", config.scan.simulate_recognition);
                println!(
                    "  Simulation delay:     {} ms",
                    config.scan.simulated_recognition_delay_ms
                );
                println!();
                println!("[Clock]");
                println!(
                    "  UTC offset:           {}",
                    config.clock.utc_offset.as_deref().unwrap_or("local")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            validate_config_file(&path)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn validate_config_file(path: &Path) -> Result<Config, Error> {
    Config::load_from(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(err: Error) -> Box<dyn StdError> {
        err.into()
    }

    #[test]
    fn test_camera_error_reported_once_with_retry_hint() {
        let err = boxed(Error::camera_unavailable("replay", "no frames to replay"));
        let line = error_line(err.as_ref());

        assert!(line.starts_with("Camera error: "));
        assert_eq!(line.matches("Check permissions and try again").count(), 1);
        assert_eq!(exit_status(err.as_ref()), 1);
    }

    #[test]
    fn test_validation_errors_exit_with_2() {
        let err = boxed(Error::DuplicateEmail {
            email: "ada@example.com".to_string(),
        });
        assert_eq!(exit_status(err.as_ref()), 2);
        assert_eq!(error_line(err.as_ref()), "Error: email already registered: ada@example.com");

        let other: Box<dyn StdError> = "no user with id x".into();
        assert_eq!(exit_status(other.as_ref()), 1);
        assert_eq!(error_line(other.as_ref()), "Error: no user with id x");
    }

    #[test]
    fn test_validate_config_file_reports_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "smilecheck_validate_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[clock]\nutc_offset = \"+1é1\"\n").unwrap();
        let err = validate_config_file(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        std::fs::write(&path, "[scan]\ncapture_interval_ms = 500\n").unwrap();
        assert!(validate_config_file(&path).is_ok());

        let _ = std::fs::remove_file(&path);
    }
}
