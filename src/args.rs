//! Parsers for mode and owner arguments.

use cascade_ops::operators::ChmodSpec;
use color_eyre::eyre::{Result, bail, eyre};

const WHO_USER: u32 = 0o4700;
const WHO_GROUP: u32 = 0o2070;
const WHO_OTHER: u32 = 0o1007;
const WHO_ALL: u32 = 0o7777;

/// Parse an octal mode (`755`) or a comma separated list of symbolic
/// clauses (`u+x,go-w`, `a=r`).
pub fn parse_mode(s: &str) -> Result<ChmodSpec> {
    let s = s.trim();
    if s.is_empty() {
        bail!("Empty mode");
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let mode = u32::from_str_radix(s, 8).map_err(|_| eyre!("Invalid octal mode: {s}"))?;
        if mode > 0o7777 {
            bail!("Octal mode out of range: {s}");
        }
        return Ok(ChmodSpec::absolute(mode));
    }

    let mut spec = ChmodSpec::default();
    for clause in s.split(',') {
        apply_clause(&mut spec, clause).map_err(|err| eyre!("Invalid mode '{s}': {err}"))?;
    }
    Ok(spec)
}

fn apply_clause(spec: &mut ChmodSpec, clause: &str) -> Result<()> {
    let op_at = clause
        .find(['+', '-', '='])
        .ok_or_else(|| eyre!("missing operator in '{clause}'"))?;
    let (who, rest) = clause.split_at(op_at);

    let mut mask = 0;
    for c in who.chars() {
        mask |= match c {
            'u' => WHO_USER,
            'g' => WHO_GROUP,
            'o' => WHO_OTHER,
            'a' => WHO_ALL,
            _ => bail!("unknown class '{c}'"),
        };
    }
    if mask == 0 {
        mask = WHO_ALL;
    }

    let mut chars = rest.chars();
    let op = chars.next().unwrap_or('+');
    let mut bits = 0;
    for c in chars {
        bits |= match c {
            'r' => 0o444,
            'w' => 0o222,
            'x' => 0o111,
            's' => 0o6000,
            't' => 0o1000,
            _ => bail!("unknown permission '{c}'"),
        };
    }
    let bits = bits & mask;

    match op {
        '+' => {
            spec.set |= bits;
            spec.clear &= !bits;
        }
        '-' => {
            spec.clear |= bits;
            spec.set &= !bits;
        }
        _ => {
            spec.clear |= mask;
            spec.set = (spec.set & !mask) | bits;
        }
    }
    Ok(())
}

/// Parse `UID`, `UID:GID` or `:GID`.
pub fn parse_owner(s: &str) -> Result<(Option<u32>, Option<u32>)> {
    let (user, group) = match s.split_once(':') {
        Some((user, group)) => (user, Some(group)),
        None => (s, None),
    };

    let parse = |part: &str| -> Result<Option<u32>> {
        if part.is_empty() {
            return Ok(None);
        }
        part.parse()
            .map(Some)
            .map_err(|_| eyre!("Expected a numeric id, got '{part}'"))
    };

    let uid = parse(user)?;
    let gid = match group {
        Some(group) => parse(group)?,
        None => None,
    };
    if uid.is_none() && gid.is_none() {
        bail!("Nothing to change in '{s}'");
    }
    Ok((uid, gid))
}
