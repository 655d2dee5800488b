//! spellcast - headless spell-casting skirmish runner
//!
//! Loads a scenario, runs it to completion and prints the outcome.

use spellcast::cli;
use spellcast::headless::{run_headless_match, MatchResult};

fn print_summary(result: &MatchResult) {
    match result.winner {
        Some(faction) => println!("Faction {} wins after {:.1}s", faction, result.match_time),
        None => println!("Draw after {:.1}s", result.match_time),
    }
    for combatant in &result.combatants {
        println!(
            "  [{}] {:<28} {:>6.0}/{:<6.0} dealt {:>6.0} taken {:>6.0} healed {:>6.0}{}",
            combatant.faction,
            combatant.name,
            combatant.final_health,
            combatant.max_health,
            combatant.damage_dealt,
            combatant.damage_taken,
            combatant.healing_done,
            if combatant.survived { "" } else { "  (dead)" },
        );
    }
    if let Some(path) = &result.log_path {
        println!("Log saved to: {}", path);
    }
}

fn main() {
    let args = cli::parse_args();

    let result = args.load_scenario().and_then(run_headless_match);
    match result {
        Ok(result) => print_summary(&result),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
