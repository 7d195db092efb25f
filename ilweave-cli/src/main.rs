use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ilweave_il::{Body, parse_listing};
use ilweave_patch::{HookId, MemoryTargets, Patcher, TargetId};

mod plan;

use plan::Plan;

#[derive(Parser)]
#[command(
    name = "ilweave",
    about = "Dry-run method-body patch plans against instruction listings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a listing file and print it back normalized
    Show {
        /// Path to the .il listing
        input: PathBuf,
    },
    /// Apply a YAML patch plan to a listing and print the patched result
    Apply {
        /// Path to the .il listing
        input: PathBuf,
        /// Path to the patch plan
        #[arg(short, long)]
        plan: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Show { input } => cmd_show(&input),
        Commands::Apply { input, plan } => cmd_apply(&input, &plan),
    }
}

fn read_listing(path: &Path) -> Body {
    let src = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    match parse_listing(&src) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_show(input: &Path) {
    print!("{}", read_listing(input));
}

fn cmd_apply(input: &Path, plan_path: &Path) {
    let body = read_listing(input);

    let plan_src = match fs::read_to_string(plan_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", plan_path.display());
            std::process::exit(1);
        }
    };
    let plan = match Plan::from_yaml(&plan_src) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: invalid plan: {e}");
            std::process::exit(1);
        }
    };

    // The listing stands in for every target the plan names.
    let mut targets = MemoryTargets::new();
    for hook in &plan.hooks {
        targets.define(hook.target.as_str(), body.clone());
    }
    let mut patcher = Patcher::new(Box::new(targets));

    let mut names: HashMap<HookId, String> = HashMap::new();
    for hook in &plan.hooks {
        for (i, edit) in hook.edits.iter().enumerate() {
            let compiled = match edit.compile() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}: edit {}: {e}", hook.target, i + 1);
                    std::process::exit(1);
                }
            };
            let id = patcher.hook(hook.target.as_str(), compiled);
            names.insert(id, format!("{} edit {}", hook.target, i + 1));
        }
    }

    let report = patcher.load();
    for (id, err) in &report.skipped {
        let name = names.get(id).map(String::as_str).unwrap_or("?");
        eprintln!("skipped: {name}: {err}");
    }

    let mut seen = Vec::new();
    for hook in &plan.hooks {
        if seen.contains(&hook.target) {
            continue;
        }
        seen.push(hook.target.clone());
        let target = TargetId::new(hook.target.as_str());
        match patcher.targets().fetch_body(&target) {
            Ok(patched) => {
                println!("=== {} ===", hook.target);
                print!("{patched}");
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    if !report.all_applied() {
        std::process::exit(2);
    }
}
