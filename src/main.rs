use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use photosheet::collection::{AccidentTag, ImageId, TextField};
use photosheet::config::Config;
use photosheet::export::{ExportFormat, ExportOutcome};
use photosheet::import::codec::RasterCodec;
use photosheet::import::metadata::ExifExtractor;
use photosheet::import::{ImportError, SourceFile};
use photosheet::logging;
use photosheet::manifest::{Manifest, PhotoEntry};
use photosheet::session::{AutoConfirm, Prompt, Session, StdinPrompt};

const UNEXPECTED_ERROR: &str = "發生了意外錯誤。請重新執行並重試。";

enum Command {
    Build(BuildArgs),
    Tags,
    Config,
}

struct BuildArgs {
    manifest: PathBuf,
    formats: Vec<ExportFormat>,
    out_dir: Option<PathBuf>,
    yes: bool,
    no_open: bool,
}

fn parse_args() -> (Command, Option<PathBuf>) {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut command = None;
    let mut manifest = None;
    let mut formats = Vec::new();
    let mut out_dir = None;
    let mut yes = false;
    let mut no_open = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photosheet {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(value_of(&args, i, "--config")));
                i += 1;
            }
            "--out" | "-o" => {
                out_dir = Some(PathBuf::from(value_of(&args, i, "--out")));
                i += 1;
            }
            "--docx" | "--print" | "--zip" => {
                let format = match args[i].as_str() {
                    "--docx" => ExportFormat::Docx,
                    "--print" => ExportFormat::Print,
                    _ => ExportFormat::Zip,
                };
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
            "--yes" | "-y" => yes = true,
            "--no-open" => no_open = true,
            "build" | "tags" | "config" if command.is_none() => {
                command = Some(args[i].clone());
            }
            arg if command.as_deref() == Some("build")
                && manifest.is_none()
                && !arg.starts_with('-') =>
            {
                manifest = Some(PathBuf::from(arg));
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let command = match command.as_deref() {
        Some("build") => {
            let Some(manifest) = manifest else {
                eprintln!("Error: build requires a manifest path");
                std::process::exit(1);
            };
            if formats.is_empty() {
                formats.push(ExportFormat::Docx);
            }
            Command::Build(BuildArgs {
                manifest,
                formats,
                out_dir,
                yes,
                no_open,
            })
        }
        Some("tags") => Command::Tags,
        Some("config") => Command::Config,
        _ => {
            print_help();
            std::process::exit(1);
        }
    };

    (command, config_path)
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a path argument", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"photosheet - criminal-case and traffic-accident photo sheets

USAGE:
    photosheet build <MANIFEST> [OPTIONS]
    photosheet tags
    photosheet config

COMMANDS:
    build               Import the manifest's photos and write the sheets
    tags                List the accident checklist ids
    config              Print the effective configuration

BUILD OPTIONS:
    --docx              Write a Word document (default when no format is given)
    --print             Write printable HTML and open it
    --zip               Bundle the photos into a zip archive
    --out, -o DIR       Output directory (overrides export.output_dir)
    --yes, -y           Answer every confirmation with yes
    --no-open           Do not open the printable HTML

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTOSHEET_CONFIG   Path to config file (overrides default location)
    PHOTOSHEET_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photosheet/config.toml"#
    );
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Unexpected panic");
        eprintln!("{}", UNEXPECTED_ERROR);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    let (command, config_path) = parse_args();

    let _ = logging::init(None);
    install_panic_hook();

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    match command {
        Command::Tags => {
            for tag in AccidentTag::ALL {
                println!("{:<20} {}", tag.id(), tag.label());
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Build(args) => {
            if args.yes {
                build(&config, args, AutoConfirm(true)).await
            } else {
                build(&config, args, StdinPrompt).await
            }
        }
    }
}

async fn build<P: Prompt>(config: &Config, args: BuildArgs, prompt: P) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;

    let mut entries = manifest.photos.clone();
    entries.extend(
        manifest
            .discovered_photos(&config.import.image_extensions)?
            .into_iter()
            .map(|path| PhotoEntry {
                path,
                ..Default::default()
            }),
    );

    let mut session = Session::new(
        config,
        Arc::new(RasterCodec::new(config.import.heic_converter.clone())),
        Arc::new(ExifExtractor),
        prompt,
    );
    session.set_form(manifest.form.resolve(&config.form));

    // Unreadable files are reported with the import failures
    let mut read_failures = Vec::new();
    let mut read_entries = Vec::new();
    let mut files = Vec::new();
    for entry in &entries {
        let path = manifest.resolve_path(&entry.path);
        match SourceFile::read(&path) {
            Ok(file) => {
                files.push(file);
                read_entries.push(entry);
            }
            Err(source) => read_failures.push(ImportError::Read {
                name: display_name(&path),
                source,
            }),
        }
    }

    let report = session.import(files).await;
    for failure in read_failures.iter().chain(&report.failures) {
        tracing::warn!(file = failure.file_name(), error = %failure, "Import failed");
    }
    if let Some(alert) = report.alert() {
        eprintln!("{}", alert);
    }
    for failure in &read_failures {
        eprintln!("{}", failure.user_message());
    }

    let placed: Vec<(ImageId, &PhotoEntry)> = report
        .slots
        .iter()
        .zip(read_entries)
        .filter_map(|(slot, entry)| slot.map(|id| (id, entry)))
        .collect();

    for (id, entry) in &placed {
        annotate(&mut session, *id, entry).await;
    }
    for (id, entry) in &placed {
        if let Some(position) = entry.position {
            session.move_to(*id, position - 1);
        }
    }
    for (id, entry) in &placed {
        if entry.remove {
            session.remove(*id).await;
        }
    }

    println!(
        "{} 張照片 ({})",
        session.collection().len(),
        session.form().format.title()
    );

    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| config.export.output_dir.clone());
    let now = Local::now().naive_local();

    for format in &args.formats {
        session.wait_export_idle().await;

        match session.export(*format, now).await {
            Ok(ExportOutcome::Completed(artifact)) => {
                let path = artifact
                    .write_to(&out_dir)
                    .with_context(|| format!("failed to write {}", artifact.file_name))?;
                println!("{}", path.display());

                if *format == ExportFormat::Print && config.export.open_print && !args.no_open {
                    if let Err(e) = open_file(&path, config.export.print_opener.as_deref()) {
                        tracing::warn!(error = %e, "Could not open print output");
                        eprintln!("{}", e);
                    }
                }
            }
            Ok(ExportOutcome::Skipped) => {
                tracing::info!(format = format.name(), "Export skipped");
            }
            Err(e) => {
                tracing::error!(format = format.name(), error = ?e, "Export failed");
                eprintln!("{}", e.user_message());
            }
        }
    }

    Ok(())
}

async fn annotate<P: Prompt>(session: &mut Session<P>, id: ImageId, entry: &PhotoEntry) {
    if let Some(description) = &entry.description {
        session.set_text(TextField::Description, id, description.as_str());
    }
    if let Some(date) = &entry.date {
        session.set_text(TextField::CustomDate, id, date.as_str());
    }
    if let Some(address) = &entry.address {
        session.set_text(TextField::CustomAddress, id, address.as_str());
    }
    if entry.has_tags() {
        let tags = entry.accident_tags();
        for tag in AccidentTag::ALL {
            if tags.is_checked(tag) {
                session.set_accident_tag(id, tag, true);
            }
        }
        if !tags.other_text.is_empty() {
            session.set_other_text(id, tags.other_text);
        }
    }
    if entry.rotate != 0 {
        if let Err(e) = session.rotate(id, entry.rotate).await {
            tracing::warn!(%id, error = %e, "Rotation failed");
            eprintln!("處理圖片時發生錯誤");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_file(path: &Path, opener: Option<&str>) -> Result<()> {
    let mut command = match opener {
        Some(program) => std::process::Command::new(program),
        None => platform_opener(),
    };
    command
        .arg(path)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to open file: {}", e))?;
    Ok(())
}

fn platform_opener() -> std::process::Command {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
    }
    #[cfg(target_os = "windows")]
    {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::process::Command::new("xdg-open")
    }
}
