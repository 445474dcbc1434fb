//! Debug console commands over a running engine.
//!
//! ```text
//! feat_list
//! feat_add <feat> [amount]
//! feat_set <feat> <amount>
//! feat_unlock <feat>
//! feat_unlock_all
//! doctrine_acquire <doctrine>
//! ```
//!
//! A feat token may be the full key, the part after the last `.`, or a
//! unique suffix of a key; the last two ignore case.
use std::fmt::Write as _;

use crate::engine::DoctrineEngine;
use crate::error::CommandError;
use crate::ledger::ResourceLedger;

pub const COMMANDS: &[&str] = &[
    "feat_list",
    "feat_add",
    "feat_set",
    "feat_unlock",
    "feat_unlock_all",
    "doctrine_acquire",
];

/// Run one console line and return the text to print.
///
/// # Errors
///
/// Returns an error for unknown commands, bad arguments or unresolvable feats.
pub fn run_command(
    engine: &mut DoctrineEngine,
    ledger: &mut dyn ResourceLedger,
    line: &str,
) -> Result<String, CommandError> {
    let mut parts = line.split_whitespace();
    let command = parts.next().ok_or(CommandError::Empty)?;
    let args: Vec<&str> = parts.collect();
    engine.build_catalog();

    match command {
        "feat_list" => Ok(feat_list(engine)),
        "feat_add" => {
            let token = args
                .first()
                .ok_or(CommandError::Usage("feat_add <feat> [amount]"))?;
            let key = resolve_feat(engine, token)?;
            let amount = args.get(1).map_or(Ok(1), |raw| parse_amount(raw))?;
            let after = engine.advance_feat(&key, amount);
            Ok(format!(
                "{} advanced by {amount}. Now {after}/{}.",
                short_name(&key),
                engine.get_feat_target(&key)
            ))
        }
        "feat_set" => {
            let (Some(token), Some(raw)) = (args.first(), args.get(1)) else {
                return Err(CommandError::Usage("feat_set <feat> <amount>"));
            };
            let key = resolve_feat(engine, token)?;
            let amount = parse_amount(raw)?;
            engine.set_feat_progress(&key, amount);
            Ok(format!(
                "{} set to {}/{}{}.",
                short_name(&key),
                engine.get_feat_progress(&key),
                engine.get_feat_target(&key),
                done_marker(engine.is_feat_complete(&key))
            ))
        }
        "feat_unlock" => {
            let token = args
                .first()
                .ok_or(CommandError::Usage("feat_unlock <feat>"))?;
            let key = resolve_feat(engine, token)?;
            complete_feat(engine, &key);
            Ok(format!("{} marked complete.", short_name(&key)))
        }
        "feat_unlock_all" => {
            let keys: Vec<String> = all_feat_keys(engine);
            for key in &keys {
                complete_feat(engine, key);
            }
            Ok(format!("Completed {} feats.", keys.len()))
        }
        "doctrine_acquire" => {
            let key = args
                .first()
                .ok_or(CommandError::Usage("doctrine_acquire <doctrine>"))?;
            Ok(match engine.try_acquire(key, ledger) {
                Ok(()) => format!("{key} unlocked."),
                Err(err) => format!("{key} not acquired: {err}."),
            })
        }
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn feat_list(engine: &DoctrineEngine) -> String {
    let doctrines = engine.all_doctrines();
    if doctrines.is_empty() {
        return "No doctrines discovered.".to_string();
    }
    let mut out = String::new();
    for doctrine in doctrines {
        let _ = writeln!(
            out,
            "[{}] {} - {}",
            doctrine.key,
            doctrine.name,
            engine.get_status(&doctrine.key)
        );
        if doctrine.feats.is_empty() {
            out.push_str("  (no feats)\n");
            continue;
        }
        for feat in &doctrine.feats {
            let _ = writeln!(
                out,
                "  - {} : {}/{}{} - {}",
                short_name(&feat.key),
                engine.get_feat_progress(&feat.key),
                engine.get_feat_target(&feat.key),
                done_marker(engine.is_feat_complete(&feat.key)),
                feat.description
            );
        }
    }
    out
}

fn complete_feat(engine: &mut DoctrineEngine, key: &str) {
    let target = engine.get_feat_target(key);
    engine.set_feat_progress(key, target);
}

fn all_feat_keys(engine: &DoctrineEngine) -> Vec<String> {
    engine
        .all_doctrines()
        .iter()
        .flat_map(|doctrine| doctrine.feat_keys())
        .map(str::to_string)
        .collect()
}

/// Resolve a console token to a catalog feat key.
///
/// # Errors
///
/// Returns an error when nothing matches or a short name or suffix matches
/// more than one feat.
pub fn resolve_feat(engine: &DoctrineEngine, token: &str) -> Result<String, CommandError> {
    let keys = all_feat_keys(engine);
    if keys.iter().any(|key| key == token) {
        return Ok(token.to_string());
    }

    let by_short: Vec<&String> = keys
        .iter()
        .filter(|key| short_name(key).eq_ignore_ascii_case(token))
        .collect();
    if let Some(key) = unique(token, &by_short)? {
        return Ok(key);
    }

    let lowered = token.to_ascii_lowercase();
    let by_suffix: Vec<&String> = keys
        .iter()
        .filter(|key| key.to_ascii_lowercase().ends_with(&lowered))
        .collect();
    unique(token, &by_suffix)?.ok_or_else(|| CommandError::UnknownFeat(token.to_string()))
}

fn unique(token: &str, matches: &[&String]) -> Result<Option<String>, CommandError> {
    match matches {
        [] => Ok(None),
        [key] => Ok(Some((*key).clone())),
        _ => Err(CommandError::AmbiguousFeat {
            token: token.to_string(),
            candidates: matches.iter().map(|key| (*key).clone()).collect(),
        }),
    }
}

fn short_name(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

fn parse_amount(raw: &str) -> Result<i32, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidAmount(raw.to_string()))
}

const fn done_marker(done: bool) -> &'static str {
    if done { " [DONE]" } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Purse;
    use crate::registry::DoctrineRegistry;

    const CATALOG: &str = r#"{
        "doctrines": [
            { "key": "lions_share", "name": "Lion's Share", "column": 0, "row": 0, "gold_cost": 100,
              "feats": [
                { "id": "personal_kills", "description": "Kill 25.", "target": 25,
                  "rule": { "kind": "kills" } },
                { "id": "days", "description": "Wait.", "target": 3, "rule": { "kind": "days_elapsed" } }
              ] },
            { "key": "ironclad", "name": "Ironclad", "column": 1, "row": 0,
              "feats": [
                { "id": "days", "description": "Wait longer.", "target": 5, "rule": { "kind": "days_elapsed" } }
              ] }
        ]
    }"#;

    fn engine() -> DoctrineEngine {
        DoctrineEngine::new(DoctrineRegistry::from_json(CATALOG).expect("catalog"))
    }

    #[test]
    fn feat_tokens_resolve_by_key_short_name_or_suffix() {
        let mut engine = engine();
        engine.build_catalog();
        assert_eq!(
            resolve_feat(&engine, "lions_share.days").unwrap(),
            "lions_share.days"
        );
        assert_eq!(
            resolve_feat(&engine, "PERSONAL_KILLS").unwrap(),
            "lions_share.personal_kills"
        );
        assert_eq!(
            resolve_feat(&engine, "onal_kills").unwrap(),
            "lions_share.personal_kills"
        );
        assert!(matches!(
            resolve_feat(&engine, "days"),
            Err(CommandError::AmbiguousFeat { .. })
        ));
        assert_eq!(
            resolve_feat(&engine, "nothing"),
            Err(CommandError::UnknownFeat("nothing".into()))
        );
    }

    #[test]
    fn commands_drive_progress_and_acquisition() {
        let mut engine = engine();
        let mut purse = Purse::new(150, 0);

        let out = run_command(&mut engine, &mut purse, "feat_add personal_kills 10").unwrap();
        assert_eq!(out, "personal_kills advanced by 10. Now 10/25.");

        let out = run_command(&mut engine, &mut purse, "feat_set personal_kills 30").unwrap();
        assert_eq!(out, "personal_kills set to 25/25 [DONE].");

        let out = run_command(&mut engine, &mut purse, "doctrine_acquire lions_share").unwrap();
        assert_eq!(out, "lions_share not acquired: feats incomplete.");

        run_command(&mut engine, &mut purse, "feat_unlock lions_share.days").unwrap();
        let out = run_command(&mut engine, &mut purse, "doctrine_acquire lions_share").unwrap();
        assert_eq!(out, "lions_share unlocked.");
        assert_eq!(purse.gold, 50);

        let listing = run_command(&mut engine, &mut purse, "feat_list").unwrap();
        assert!(listing.contains("[lions_share] Lion's Share - unlocked"));
        assert!(listing.contains("  - days : 0/5 - Wait longer."));
    }

    #[test]
    fn bad_input_is_reported() {
        let mut engine = engine();
        let mut purse = Purse::default();
        assert_eq!(
            run_command(&mut engine, &mut purse, "   "),
            Err(CommandError::Empty)
        );
        assert_eq!(
            run_command(&mut engine, &mut purse, "feat_set days"),
            Err(CommandError::Usage("feat_set <feat> <amount>"))
        );
        assert_eq!(
            run_command(&mut engine, &mut purse, "feat_add personal_kills lots"),
            Err(CommandError::InvalidAmount("lots".into()))
        );
        assert!(matches!(
            run_command(&mut engine, &mut purse, "teleport"),
            Err(CommandError::UnknownCommand(_))
        ));
        assert_eq!(
            run_command(&mut engine, &mut purse, "feat_unlock_all").unwrap(),
            "Completed 3 feats."
        );
    }
}
