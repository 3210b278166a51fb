// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subcommands of the `exram-cli` binary.
//!
//! ## Usage
//!
//! ```bash
//! exram-cli plan --address-bits 17 --page-size 256   # Page table overhead
//! exram-cli config show                              # Effective configuration
//! exram-cli demo                                     # Run the allocator scenario
//! ```

pub mod config_cmd;
pub mod demo_cmd;
pub mod plan_cmd;

pub use demo_cmd::{run_demo, DemoReport};
pub use plan_cmd::run_plan;

/// Value following `flag` in `args`, if present.
///
/// Accepts both `--flag VALUE` and `--flag=VALUE`.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let prefix = format!("{flag}=");
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().map(String::as_str);
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value);
        }
    }
    None
}

/// True if `flag` appears in `args`.
pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_value_forms() {
        let a = args(&["--page-size", "256", "--address-bits=17"]);
        assert_eq!(flag_value(&a, "--page-size"), Some("256"));
        assert_eq!(flag_value(&a, "--address-bits"), Some("17"));
        assert_eq!(flag_value(&a, "--json"), None);
    }

    #[test]
    fn test_flag_value_missing_value() {
        let a = args(&["--page-size"]);
        assert_eq!(flag_value(&a, "--page-size"), None);
    }

    #[test]
    fn test_has_flag() {
        let a = args(&["plan", "--json"]);
        assert!(has_flag(&a, "--json"));
        assert!(!has_flag(&a, "--pretty"));
    }
}
