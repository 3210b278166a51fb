// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! `plan` subcommand: page table overhead for a virtual address space.

use super::{flag_value, has_flag};
use crate::planner::PagingPlan;

const USAGE: &str = "Usage: exram-cli plan --address-bits N --page-size N [--json]";

/// Run the planner. Returns the process exit code.
pub fn run_plan(args: &[String]) -> i32 {
    let Some(address_bits) = parse_number::<u32>(args, "--address-bits") else {
        return 1;
    };
    let Some(page_size) = parse_number::<u64>(args, "--page-size") else {
        return 1;
    };

    let plan = match PagingPlan::calculate(address_bits, page_size) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if has_flag(args, "--json") {
        match serde_json::to_string_pretty(&plan) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else {
        println!("{}", plan);
    }
    0
}

fn parse_number<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let Some(raw) = flag_value(args, flag) else {
        eprintln!("Missing value for {}", flag);
        eprintln!("{}", USAGE);
        return None;
    };
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("Invalid value for {}: {}", flag, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_succeeds() {
        assert_eq!(run_plan(&args(&["--address-bits", "17", "--page-size", "256"])), 0);
        assert_eq!(run_plan(&args(&["--address-bits=16", "--page-size=16", "--json"])), 0);
    }

    #[test]
    fn test_plan_rejects_missing_and_invalid() {
        assert_eq!(run_plan(&args(&["--page-size", "256"])), 1);
        assert_eq!(run_plan(&args(&["--address-bits", "x", "--page-size", "256"])), 1);
        assert_eq!(run_plan(&args(&["--address-bits", "8", "--page-size", "256"])), 1);
    }
}
