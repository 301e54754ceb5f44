use std::{
    env,
    io::{self, Read},
    path::PathBuf,
    process,
};

use colored::Colorize;
use settle_core::{
    config::{Config, ConfigManager},
    init,
    ledger::{Group, TransactionRequest},
    netting::{ConsolidationStatus, SettlementMode},
    utils::{self, build_info, persistence},
};

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let command = args.next().unwrap_or_else(|| usage_and_exit());

    match command.as_str() {
        "new" => {
            let target = args.next().unwrap_or_else(|| usage_and_exit());
            let path = resolve_group_path(&target);
            let names: Vec<String> = args.collect();
            let group = if is_file_path(&target) {
                Group::new(names)?
            } else {
                Group::named(target.as_str(), names)?
            };
            persistence::save_group_to_file(&group, &path)?;

            let manager = ConfigManager::new()?;
            let mut config = manager.load()?;
            config.last_opened_group = Some(group.name().to_string());
            manager.save(&config)?;

            println!(
                "Created group of {} at {}",
                group.names().len(),
                path.display()
            );
        }
        "record" => {
            let path = next_path(&mut args);
            let mut group = persistence::load_group_from_file(&path)?;
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            let request: TransactionRequest = serde_json::from_str(&buffer)?;
            let id = group.record_transaction(request)?;
            persistence::save_group_to_file(&group, &path)?;
            println!("Recorded transaction {id}");
        }
        "balance" => {
            let path = next_path(&mut args);
            let name = args.next().unwrap_or_else(|| usage_and_exit());
            let group = persistence::load_group_from_file(&path)?;
            let config = load_config()?;
            let debt = group.get_balance(&name)?;
            let amount = settle_core::currency::format_currency_value(
                debt.abs(),
                &config.currency_code(),
                &config.locale_config(),
                &config.format_options(),
            );
            if debt > 0.0 {
                println!("{name} owes {amount}");
            } else {
                println!("{name} is owed {amount}");
            }
        }
        "simplify" | "greedy" => {
            let path = next_path(&mut args);
            let group = persistence::load_group_from_file(&path)?;
            let config = load_config()?;
            let mode = match (command.as_str(), args.next()) {
                ("greedy", _) => SettlementMode::Greedy,
                (_, Some(bank)) => SettlementMode::Bank(bank),
                (_, None) => SettlementMode::PeerToPeer,
            };
            let report = group.simplify_with(mode, &config.netting_options())?;
            println!("{}", format!("=== Settlement: {} ===", report.mode).bold());
            if report.payments.is_empty() {
                println!("Everyone is square.");
            } else {
                println!(
                    "{}",
                    report.render(
                        &config.currency_code(),
                        &config.locale_config(),
                        &config.format_options(),
                    )
                );
            }
            if let Some(ConsolidationStatus::CeilingReached { rotations }) = report.consolidation {
                eprintln!(
                    "{}",
                    format!("warning: consolidation stopped after {rotations} rotations").yellow()
                );
            }
        }
        "version" => {
            println!("{}", build_info::current().summary());
        }
        _ => usage_and_exit(),
    }

    Ok(())
}

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    Ok(ConfigManager::new()?.load()?)
}

fn next_path(args: &mut impl Iterator<Item = String>) -> PathBuf {
    args.next()
        .map(|target| resolve_group_path(&target))
        .unwrap_or_else(|| usage_and_exit())
}

/// Bare names live in the application's groups directory.
fn resolve_group_path(target: &str) -> PathBuf {
    if is_file_path(target) {
        PathBuf::from(target)
    } else {
        utils::group_file(target)
    }
}

fn is_file_path(target: &str) -> bool {
    target.ends_with(".json") || target.contains(['/', '\\'])
}

fn usage_and_exit() -> ! {
    // <group> is either a path to a .json file or a bare group name.
    eprintln!(
        "Usage: settle_core_cli <command>\n\
         Commands:\n  \
         new <group> <name> <name> [...]\n  \
         record <group> < transaction.json\n  \
         balance <group> <name>\n  \
         simplify <group> [bank]\n  \
         greedy <group>\n  \
         version"
    );
    process::exit(1);
}
