// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! exram-cli entry point.
//!
//! ## CLI Subcommands
//!
//! - `exram-cli plan` - Page table overhead for a virtual address space
//! - `exram-cli config` - Show, list defaults or validate configuration
//! - `exram-cli demo` - Run the allocate/free/reuse scenario on the configured heap

use std::path::PathBuf;
use std::process::ExitCode;

use exram::cli::{config_cmd, flag_value, has_flag, run_demo, run_plan};
use exram::telemetry::init_logging;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");
    let rest = args.get(2..).unwrap_or_default();
    let file = flag_value(rest, "--file").map(PathBuf::from);
    let json = has_flag(rest, "--json");

    match command {
        "plan" => exit_code(run_plan(rest)),
        "config" => {
            let subcommand = rest.first().map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => exit_code(config_cmd::run_show(file.as_deref(), json)),
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => exit_code(config_cmd::run_validate(file.as_deref())),
                other => {
                    eprintln!("Unknown config subcommand: {}", other);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "demo" => {
            let config = match config_cmd::resolve(file.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(2);
                }
            };
            if let Err(e) = init_logging(&config.log) {
                eprintln!("Logging disabled: {}", e);
            }
            exit_code(run_demo(&config, json))
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("exram {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "exram - external memory allocator, cache layer and shadowed pointers v{}

USAGE:
    exram-cli [COMMAND] [OPTIONS]

COMMANDS:
    plan         Page table overhead for a virtual address space
    config       Manage configuration (show, defaults, validate)
    demo         Run the allocate/free/reuse scenario on the configured heap
    version      Show version information
    help         Show this help message

OPTIONS:
    -h, --help     Show help for command
    -V, --version  Show version information
    --file PATH    Read configuration from a TOML file instead of the environment
    --json         Print machine-readable output

EXAMPLES:
    exram-cli plan --address-bits 17 --page-size 256
    exram-cli config show --json
    exram-cli config validate --file exram.toml
    EXRAM_ALLOCATOR=bump exram-cli demo

ENVIRONMENT:
    EXRAM_ARENA_SIZE     Arena size in bytes (default: 131072)
    EXRAM_ALLOCATOR      free-list or bump (default: free-list)
    EXRAM_CACHE          on or off (default: on)
    EXRAM_BACKING_FILE   Memory-mapped file holding the arena
    EXRAM_LOG_LEVEL      tracing filter (default: warn)
    EXRAM_LOG_FORMAT     pretty or json (default: pretty)

EXIT CODES:
    0  Success
    1  Failure / configuration warnings
    2  Configuration could not be loaded
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "plan" => eprintln!(
            "exram-cli plan - Page table overhead for a virtual address space

USAGE:
    exram-cli plan --address-bits N --page-size N [--json]

OPTIONS:
    --address-bits N  Width of the virtual address (1-32)
    --page-size N     Page size in bytes, a power of two
    --json            Print the plan as JSON"
        ),
        "config" => eprintln!(
            "exram-cli config - Manage configuration

USAGE:
    exram-cli config [show|defaults|validate] [--file PATH] [--json]

SUBCOMMANDS:
    show      Print the effective configuration (default)
    defaults  Print built-in defaults
    validate  Check the configuration, exit 1 on warnings"
        ),
        "demo" => eprintln!(
            "exram-cli demo - Run the allocate/free/reuse scenario

USAGE:
    exram-cli demo [--file PATH] [--json]

Allocates two 100-byte blocks, frees the second and allocates again, then
stores a value through a shadowed pointer. Prints addresses, free bytes and
device access counts."
        ),
        other => {
            eprintln!("No help for unknown command: {}", other);
            print_usage();
        }
    }
}
