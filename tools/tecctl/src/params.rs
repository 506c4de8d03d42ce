//! Parameter catalog listing and name resolution

use anyhow::{anyhow, bail, Result};
use colored::*;
use mecom::ValueKind;
use meer_tec::parameters::{self, PARAMETERS};
use meer_tec::Access;

use crate::Output;

/// Parameter ID for a catalog name or any decimal ID
pub fn resolve_id(name_or_id: &str) -> Result<u16> {
    if let Some(spec) = parameters::resolve(name_or_id) {
        return Ok(spec.id);
    }
    name_or_id
        .trim()
        .parse::<u16>()
        .map_err(|_| anyhow!("Unknown parameter: {}", name_or_id))
}

/// Parameter ID and value kind
///
/// Catalog entries bring their own kind and an explicit `kind` must agree with it;
/// IDs outside the catalog need `kind`.
pub fn resolve_target(name_or_id: &str, kind: Option<ValueKind>) -> Result<(u16, ValueKind)> {
    if let Some(spec) = parameters::resolve(name_or_id) {
        if let Some(kind) = kind {
            if kind != spec.kind {
                bail!("{} is a {} parameter, not {}", spec.name, spec.kind, kind);
            }
        }
        return Ok((spec.id, spec.kind));
    }

    let id = resolve_id(name_or_id)?;
    match kind {
        Some(kind) => Ok((id, kind)),
        None => bail!("Parameter {} is not in the catalog, pass --kind float|int", id),
    }
}

pub fn list(output: Output) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(PARAMETERS)?);
        return Ok(());
    }

    println!(
        "{:>5}  {:<34} {:<5} {:<2}  {}",
        "ID".bold(),
        "NAME".bold(),
        "KIND".bold(),
        "RW".bold(),
        "DESCRIPTION".bold()
    );
    for spec in PARAMETERS {
        let access = match spec.access {
            Access::ReadWrite => spec.access.to_string().green(),
            Access::ReadOnly => spec.access.to_string().normal(),
        };
        println!(
            "{:>5}  {:<34} {:<5} {:<2}  {}",
            spec.id,
            spec.name,
            spec.kind.to_string(),
            access,
            spec.description
        );
    }
    Ok(())
}
