//! Human-readable descriptions of Marcduino commands.
//!
//! Display sugar for operator front-ends. Nothing in the transport path
//! calls this; it is an ordered rule list where the first match wins.

/// One description rule.
type Rule = fn(&str) -> Option<String>;

const RULES: &[Rule] = &[panels, holos_all, holo_single, holo_effects, logics, sounds];

/// Returns a description of `cmd`, or `None` if no rule recognises it.
#[must_use]
pub fn describe(cmd: &str) -> Option<String> {
    RULES.iter().find_map(|rule| rule(cmd))
}

/// Returns `"<description> (<cmd>)"` or just `cmd` when unknown.
#[must_use]
pub fn annotate(cmd: &str) -> String {
    match describe(cmd) {
        Some(text) => format!("{text} ({cmd})"),
        None => cmd.to_string(),
    }
}

/// Splits `cmd` into the text after `prefix` if that rest is exactly two
/// ASCII digits.
fn two_digits<'a>(cmd: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = cmd.strip_prefix(prefix)?;
    (rest.len() == 2 && rest.bytes().all(|b| b.is_ascii_digit())).then_some(rest)
}

/// Matches `prefix` followed by `0` and a holo id `1..=3`.
fn holo_id<'a>(cmd: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = cmd.strip_prefix(prefix)?.strip_prefix('0')?;
    matches!(rest, "1" | "2" | "3").then_some(rest)
}

fn holo_name(id: &str) -> &'static str {
    match id {
        "1" => "front holo",
        "2" => "rear holo",
        "3" => "top holo",
        _ => "holo",
    }
}

fn logic_target(id: &str) -> &'static str {
    match id {
        "0" => "all logic displays",
        "1" => "front logic display",
        "2" => "rear logic display",
        _ => "logic display",
    }
}

fn psi_target(id: &str) -> &'static str {
    match id {
        "0" => "both PSI indicators",
        "1" => "front PSI indicator",
        "2" => "rear PSI indicator",
        _ => "PSI indicator",
    }
}

fn panels(cmd: &str) -> Option<String> {
    match cmd {
        ":OP00" => return Some("Open all dome panels".into()),
        ":CL00" => return Some("Close all dome panels".into()),
        ":OF00" => return Some("Flutter all dome panels".into()),
        _ => {}
    }
    if let Some(n) = two_digits(cmd, ":OP") {
        return Some(format!("Open panel/group {n}"));
    }
    if let Some(n) = two_digits(cmd, ":CL") {
        return Some(format!("Close panel/group {n}"));
    }
    if let Some(n) = two_digits(cmd, ":OF") {
        return Some(format!("Flutter panel/group {n}"));
    }
    two_digits(cmd, ":SE").map(|n| format!("Run sequence {n}"))
}

fn holos_all(cmd: &str) -> Option<String> {
    let text = match cmd {
        "*ON00" => "Turn all holo lights on",
        "*OF00" => "Turn all holo lights off",
        "*ST00" => "Reset all holos to default state",
        _ => return None,
    };
    Some(text.into())
}

fn holo_single(cmd: &str) -> Option<String> {
    if let Some(id) = holo_id(cmd, "*ON") {
        return Some(format!("Turn {} light on", holo_name(id)));
    }
    if let Some(id) = holo_id(cmd, "*OF") {
        return Some(format!("Turn {} light off", holo_name(id)));
    }
    if cmd == "*OF04" {
        return Some("Turn radar eye light off".into());
    }
    if let Some(id) = holo_id(cmd, "*RD") {
        return Some(format!("Random servo movement for {}", holo_name(id)));
    }
    if let Some(id) = holo_id(cmd, "*HW") {
        return Some(format!("Wag movement for {}", holo_name(id)));
    }
    holo_id(cmd, "*HN").map(|id| format!("Nod movement for {}", holo_name(id)))
}

fn holo_effects(cmd: &str) -> Option<String> {
    if let Some(id) = holo_id(cmd, "*HPS3").or_else(|| holo_id(cmd, "*HPS6")) {
        return Some(format!("LED effect for {}", holo_name(id)));
    }
    let radar = match cmd {
        "*HRS3" => Some("Radar eye pulse effect"),
        "*HRSR" => Some("Radar eye red pulse effect"),
        "*HRS6" => Some("Radar eye rainbow effect"),
        "*HRS4" => Some("Radar eye color-cycle effect"),
        _ => None,
    };
    if let Some(text) = radar {
        return Some(text.into());
    }
    // *HP<preset 0-8>0<holo 1-3>
    let rest = cmd.strip_prefix("*HP")?;
    let mut chars = rest.chars();
    let (Some(preset), Some('0'), Some(id), None) =
        (chars.next(), chars.next(), chars.next(), chars.next())
    else {
        return None;
    };
    if !('0'..='8').contains(&preset) || !('1'..='3').contains(&id) {
        return None;
    }
    Some(format!(
        "Set {} position preset {preset}",
        holo_name(&id.to_string())
    ))
}

fn logics(cmd: &str) -> Option<String> {
    let rest = cmd.strip_prefix('@')?;
    let mut chars = rest.chars();
    let target = chars.next()?;
    let op = chars.next()?;
    let arg = chars.as_str();
    let target_str = target.to_string();
    match op {
        'T' if ('0'..='2').contains(&target)
            && (1..=2).contains(&arg.len())
            && arg.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(format!(
                "Set sequence {arg} on {}",
                logic_target(&target_str)
            ))
        }
        'P' if ('0'..='2').contains(&target)
            && matches!(arg, "1" | "2" | "3" | "4" | "5" | "6" | "11") =>
        {
            Some(format!(
                "Set PSI mode {arg} on {}",
                psi_target(&target_str)
            ))
        }
        'M' if ('1'..='3').contains(&target) => Some("Send scroll text to logic display".into()),
        _ => None,
    }
}

fn sounds(cmd: &str) -> Option<String> {
    let text = match cmd {
        "$R" => "Play random sound",
        "$S" => "Play scream sound",
        "$L" => "Play Leia sound",
        "$C" => "Play cantina sound",
        "$c" => "Play beep-cantina sound",
        "$W" => "Play Star Wars sound",
        "$M" => "Play march sound",
        "$D" => "Play disco sound",
        "$F" => "Play faint sound",
        "$s" => "Stop currently playing sound",
        "$O" => "Mute audio output",
        "$-" => "Decrease volume",
        "$m" => "Set volume to medium",
        "$+" => "Increase volume",
        "$f" => "Set volume to maximum",
        "$p" => "Set volume to minimum",
        _ => return None,
    };
    Some(text.into())
}
