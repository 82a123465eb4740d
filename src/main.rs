//! ansiview CLI
//!
//! Thin glue over the library's four entry points: render a file, show its
//! SAUCE metadata, print the CP437 table, or run the screensaver. Exactly
//! one mode is resolved from the arguments and dispatched once.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ansiview::render::{CancelToken, RenderOptions};
use ansiview::{codepage, render, sauce, screensaver};

/// The four mutually exclusive things the tool can do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Render(PathBuf),
    Sauce(PathBuf),
    Codepage,
    Screensaver(PathBuf),
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if !utf8_locale() {
        eprintln!("ansiview: your terminal doesn't support UTF-8");
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (mode, options, json) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(ArgError::Usage) => {
            print_usage();
            return ExitCode::FAILURE;
        }
        Err(ArgError::Help) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(ArgError::Invalid(message)) => {
            eprintln!("ansiview: {message}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(err) = ctrlc::set_handler(move || cancel.cancel()) {
            tracing::warn!("Could not install interrupt handler: {}", err);
        }
    }

    let result = match mode {
        Mode::Render(path) => render::render_art(&path, &options, &cancel).err().map(|e| e.to_string()),
        Mode::Screensaver(path) => {
            screensaver::screensaver(&path, &options, &cancel).err().map(|e| e.to_string())
        }
        Mode::Sauce(path) => show_sauce(&path, json).err().map(|e| e.to_string()),
        Mode::Codepage => {
            print_codepage();
            None
        }
    };

    match result {
        None => ExitCode::SUCCESS,
        Some(message) => {
            eprintln!("ansiview: {message}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum ArgError {
    Usage,
    Help,
    Invalid(String),
}

/// Resolve the argument list to one mode plus options.
fn parse_args(args: &[String]) -> Result<(Mode, RenderOptions, bool), ArgError> {
    let mut options = RenderOptions::default();
    let mut mode: Option<Mode> = None;
    let mut json = false;

    fn set_mode(current: &mut Option<Mode>, new: Mode) -> Result<(), ArgError> {
        if current.is_some() {
            return Err(ArgError::Invalid(
                "only one of --sauce, --cp437, --ssaver, or a file may be given".into(),
            ));
        }
        *current = Some(new);
        Ok(())
    }

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--speed" => {
                i += 1;
                let value = args.get(i).ok_or(ArgError::Usage)?;
                options.speed_bps = value
                    .parse()
                    .map_err(|_| ArgError::Invalid(format!("invalid speed '{value}'")))?;
            }
            "--width" => {
                i += 1;
                let value = args.get(i).ok_or(ArgError::Usage)?;
                options.width = value
                    .parse()
                    .map_err(|_| ArgError::Invalid(format!("invalid width '{value}'")))?;
            }
            "--sauce" => {
                i += 1;
                let value = args.get(i).ok_or(ArgError::Usage)?;
                set_mode(&mut mode, Mode::Sauce(PathBuf::from(value)))?;
            }
            "--ssaver" | "-s" => {
                i += 1;
                let value = args.get(i).ok_or(ArgError::Usage)?;
                set_mode(&mut mode, Mode::Screensaver(PathBuf::from(value)))?;
            }
            "--cp437" => {
                set_mode(&mut mode, Mode::Codepage)?;
            }
            "--json" => {
                json = true;
            }
            "-h" | "--help" => {
                return Err(ArgError::Help);
            }
            arg if arg.starts_with('-') => {
                return Err(ArgError::Usage);
            }
            file => {
                set_mode(&mut mode, Mode::Render(PathBuf::from(file)))?;
            }
        }
        i += 1;
    }

    let mode = mode.ok_or(ArgError::Usage)?;
    Ok((mode, options, json))
}

/// A UTF-8 charmap is required; the glyph table is useless without one.
fn utf8_locale() -> bool {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .any(|value| {
            let upper = value.to_ascii_uppercase();
            upper.contains("UTF-8") || upper.contains("UTF8")
        })
}

/// Print decoded SAUCE metadata, human-readable or as JSON.
fn show_sauce(path: &std::path::Path, json: bool) -> Result<(), sauce::SauceError> {
    let record = sauce::show_metadata(path)?;

    if json {
        match serde_json::to_string_pretty(&record) {
            Ok(encoded) => println!("{encoded}"),
            Err(err) => eprintln!("ansiview: failed to encode metadata: {err}"),
        }
        return Ok(());
    }

    println!("Title:    {}", record.title);
    println!("Author:   {}", record.author);
    println!("Group:    {}", record.group);
    println!("Date:     {}", record.date);
    println!("Type:     {} / {}", record.data_type_name(), record.file_type_name());
    if let (Some(cols), Some(rows)) = (record.columns(), record.rows()) {
        println!("Size:     {cols} x {rows}");
    }
    println!("Ice:      {}", if record.ice_colors() { "yes" } else { "no" });
    if !record.tinfo_s.is_empty() {
        println!("Font:     {}", record.tinfo_s);
    }
    if !record.comments.is_empty() {
        println!("Comments:");
        for line in &record.comments {
            println!("  {line}");
        }
    }
    Ok(())
}

/// Print the full CP437 table as a 16x16 grid with hex gutters.
fn print_codepage() {
    println!("    0 1 2 3 4 5 6 7 8 9 A B C D E F");
    for row in 0..16u16 {
        let mut line = format!("{:02X}  ", row * 16);
        for col in 0..16u16 {
            line.push(codepage::map((row * 16 + col) as u8));
            line.push(' ');
        }
        println!("{}", line.trim_end());
    }
}

fn print_usage() {
    println!("ansiview - render CP437 ANSI art on a UTF-8 terminal");
    println!();
    println!("Usage: ansiview [OPTIONS] <FILE>");
    println!();
    println!("Options:");
    println!("      --speed <BPS>    Emulated line rate in bits per second");
    println!("                       (default: 110, 0 = unlimited)");
    println!("      --width <COLS>   Terminal width, at least 80 (default: 80)");
    println!("      --sauce <FILE>   Show the file's SAUCE metadata and exit");
    println!("      --json           With --sauce, emit JSON");
    println!("      --cp437          Print the CP437 glyph table and exit");
    println!("  -s, --ssaver <PATH>  Screensaver: cycle a file or directory");
    println!("                       until interrupted");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Examples:");
    println!("  ansiview artwork.ans");
    println!("  ansiview --speed 9600 artwork.ans");
    println!("  ansiview --sauce artwork.ans");
    println!("  ansiview -s ~/ansi/ --speed 0");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_render_mode() {
        let (mode, options, _) = parse_args(&strings(&["art.ans"])).unwrap();
        assert_eq!(mode, Mode::Render(PathBuf::from("art.ans")));
        assert_eq!(options, RenderOptions::default());
    }

    #[test]
    fn test_parse_speed_and_width() {
        let (_, options, _) =
            parse_args(&strings(&["--speed", "9600", "--width", "132", "art.ans"])).unwrap();
        assert_eq!(options.speed_bps, 9600);
        assert_eq!(options.width, 132);
    }

    #[test]
    fn test_parse_sauce_mode() {
        let (mode, _, json) = parse_args(&strings(&["--sauce", "art.ans", "--json"])).unwrap();
        assert_eq!(mode, Mode::Sauce(PathBuf::from("art.ans")));
        assert!(json);
    }

    #[test]
    fn test_parse_screensaver_short_flag() {
        let (mode, _, _) = parse_args(&strings(&["-s", "/art"])).unwrap();
        assert_eq!(mode, Mode::Screensaver(PathBuf::from("/art")));
    }

    #[test]
    fn test_parse_rejects_two_modes() {
        let result = parse_args(&strings(&["--cp437", "art.ans"]));
        assert!(matches!(result, Err(ArgError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_bad_speed() {
        let result = parse_args(&strings(&["--speed", "fast", "art.ans"]));
        assert!(matches!(result, Err(ArgError::Invalid(_))));
    }

    #[test]
    fn test_parse_no_args_is_usage() {
        let result = parse_args(&[]);
        assert!(matches!(result, Err(ArgError::Usage)));
    }

    #[test]
    fn test_parse_unknown_flag_is_usage() {
        let result = parse_args(&strings(&["--frobnicate"]));
        assert!(matches!(result, Err(ArgError::Usage)));
    }
}
