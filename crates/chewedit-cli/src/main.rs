// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use chewedit_app::{AppState, KEYBIND_ACTIONS};
use chewedit_db::Catalog;
use chewedit_tui::{AppRuntime, UiOptions};
use config::Config;
use runtime::DictionaryRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `chewedit --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let user_dir = config.user_dir()?;
    let _log_guard = logging::init(&config.log_filter(), &logging::log_dir(&user_dir))?;
    let catalog = Catalog::new(config.system_dir(), user_dir);
    info!(
        system_dir = %catalog.system_dir().display(),
        user_dir = %catalog.user_dir().display(),
        "starting chewedit"
    );

    let mut runtime = DictionaryRuntime::new(catalog);
    if options.check_only {
        let count = runtime.check().with_context(|| {
            format!(
                "startup check failed -- set [storage] dirs in {} or CHEWEDIT_USER_DIR",
                options.config_path.display()
            )
        })?;
        println!("ok: {count} dictionaries");
        return Ok(());
    }

    if let Some(command) = options.command {
        return run_command(&mut runtime, command);
    }

    chewedit_tui::run_app(
        &mut AppState::default(),
        &mut runtime,
        UiOptions {
            status_clear: config.status_clear(),
        },
    )
}

/// Work that runs without the TUI and exits.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    Import(PathBuf),
    Export(PathBuf),
    ImportConfig(PathBuf),
    ExportConfig(PathBuf),
    SetKeybind { action: String, key: String },
}

fn run_command<R: AppRuntime>(runtime: &mut R, command: Command) -> Result<()> {
    match command {
        Command::List => {
            for resource in runtime.explore()? {
                println!(
                    "{}\t{}\t{}",
                    resource.category.as_str(),
                    resource.name,
                    resource.path.display()
                );
            }
        }
        Command::Import(path) => {
            let summary = runtime.import_dictionary(&path)?;
            println!(
                "imported {} entries from {} ({} skipped)",
                summary.imported,
                path.display(),
                summary.skipped
            );
        }
        Command::Export(path) => {
            let count = runtime.export_dictionary(&path)?;
            println!("exported {count} entries to {}", path.display());
        }
        Command::ImportConfig(path) => {
            let config = runtime.import_config(&path)?;
            runtime.save_config(&config)?;
            println!("imported settings from {}", path.display());
        }
        Command::ExportConfig(path) => {
            let config = runtime.load_config()?;
            runtime.export_config(&path, &config)?;
            println!("exported settings to {}", path.display());
        }
        Command::SetKeybind { action, key } => {
            if !KEYBIND_ACTIONS.contains(&action.as_str()) {
                bail!(
                    "unknown keybinding action {action:?}; expected one of {}",
                    KEYBIND_ACTIONS.join(", ")
                );
            }
            let mut config = runtime.load_config()?;
            config.set_keybind(&action, &key);
            runtime.save_config(&config)?;
            println!("{action} = {key}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let flag = arg.as_ref();
        let command = match flag {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
                None
            }
            "--print-config-path" => {
                options.print_config_path = true;
                None
            }
            "--print-example-config" => {
                options.print_example = true;
                None
            }
            "--check" => {
                options.check_only = true;
                None
            }
            "--help" | "-h" => {
                options.show_help = true;
                None
            }
            "--list" => Some(Command::List),
            "--import" | "--export" | "--import-config" | "--export-config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("{flag} requires a file path"))?;
                let path = PathBuf::from(value.as_ref());
                Some(match flag {
                    "--import" => Command::Import(path),
                    "--export" => Command::Export(path),
                    "--import-config" => Command::ImportConfig(path),
                    _ => Command::ExportConfig(path),
                })
            }
            "--set-keybind" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--set-keybind requires ACTION=KEY"))?;
                let (action, key) = value
                    .as_ref()
                    .split_once('=')
                    .filter(|(action, _)| !action.trim().is_empty())
                    .ok_or_else(|| {
                        anyhow!(
                            "--set-keybind expects ACTION=KEY, got {:?}",
                            value.as_ref()
                        )
                    })?;
                Some(Command::SetKeybind {
                    action: action.trim().to_owned(),
                    key: key.trim().to_owned(),
                })
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        };

        if let Some(command) = command {
            if options.command.is_some() {
                bail!(
                    "only one of --list, --import, --export, --import-config, \
                     --export-config or --set-keybind may be given"
                );
            }
            options.command = Some(command);
        }
    }

    Ok(options)
}

fn print_help() {
    println!("chewedit -- chewing dictionary and IME settings editor");
    println!("  --config <path>           Use a specific config path");
    println!("  --print-config-path       Print resolved config path");
    println!("  --print-example-config    Print a config template");
    println!("  --check                   Validate config, dictionaries and IME settings");
    println!("  --list                    List system, extension and personal dictionaries");
    println!("  --import <file>           Replace the personal dictionary from CSV or sqlite3");
    println!("  --export <file>           Write the personal dictionary as CSV");
    println!("  --import-config <file>    Load IME settings from a TOML file and save them");
    println!("  --export-config <file>    Write current IME settings to a TOML file");
    println!("  --set-keybind ACTION=KEY  Bind a key; actions: {}", KEYBIND_ACTIONS.join(", "));
    println!("  --help                    Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Command, parse_cli_args, run_command};
    use crate::runtime::DictionaryRuntime;
    use anyhow::Result;
    use chewedit_db::Catalog;
    use chewedit_testkit::{Dirs, chinese_records};
    use chewedit_tui::AppRuntime;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/chewedit-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                command: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--export"], default_options_path())
            .expect_err("missing export path should fail");
        assert!(error.to_string().contains("--export requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        assert_eq!(options.command, None);
        Ok(())
    }

    #[test]
    fn parse_cli_args_reads_commands() -> Result<()> {
        let options = parse_cli_args(vec!["--import", "words.csv"], default_options_path())?;
        assert_eq!(
            options.command,
            Some(Command::Import(PathBuf::from("words.csv")))
        );

        let options = parse_cli_args(
            vec!["--set-keybind", "toggle_hsu_keyboard = Ctrl+H"],
            default_options_path(),
        )?;
        assert_eq!(
            options.command,
            Some(Command::SetKeybind {
                action: "toggle_hsu_keyboard".to_owned(),
                key: "Ctrl+H".to_owned(),
            })
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_second_command() {
        let error = parse_cli_args(vec!["--list", "--export", "out.csv"], default_options_path())
            .expect_err("two commands should fail");
        assert!(error.to_string().contains("only one of"));
    }

    #[test]
    fn parse_cli_args_rejects_keybind_without_action() {
        for value in ["Ctrl+H", "=Ctrl+H"] {
            let error = parse_cli_args(vec!["--set-keybind", value], default_options_path())
                .expect_err("malformed keybinding should fail");
            assert!(error.to_string().contains("ACTION=KEY"));
        }
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn set_keybind_command_saves_and_rejects_unknown_actions() -> Result<()> {
        let dirs = Dirs::new()?;
        let mut runtime = DictionaryRuntime::new(Catalog::new(&dirs.system, &dirs.user));
        run_command(
            &mut runtime,
            Command::SetKeybind {
                action: "toggle_hsu_keyboard".to_owned(),
                key: "Ctrl+H".to_owned(),
            },
        )?;
        assert_eq!(
            runtime.load_config()?.keybind_for("toggle_hsu_keyboard"),
            "Ctrl+H"
        );

        let error = run_command(
            &mut runtime,
            Command::SetKeybind {
                action: "launch_rockets".to_owned(),
                key: "F1".to_owned(),
            },
        )
        .expect_err("unknown action should fail");
        assert!(error.to_string().contains("unknown keybinding action"));
        Ok(())
    }

    #[test]
    fn export_command_writes_personal_dictionary() -> Result<()> {
        let dirs = Dirs::new()?;
        let mut runtime = DictionaryRuntime::new(Catalog::new(&dirs.system, &dirs.user));
        runtime
            .catalog()
            .ensure_personal()?
            .replace_entries(&chinese_records())?;
        let dest = dirs.file("out.csv");
        run_command(&mut runtime, Command::Export(dest.clone()))?;
        let (records, skipped) = chewedit_db::read_csv(&dest)?;
        assert_eq!(records, chinese_records());
        assert_eq!(skipped, 0);
        Ok(())
    }
}
