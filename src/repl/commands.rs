use std::path::PathBuf;

/// Refers to a variant by its 1-based number, optionally in a specific message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRef {
    pub index: usize,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Image(Option<PathBuf>),
    Preview(VariantRef),
    Apply(VariantRef),
    Unpreview,
    Copy(VariantRef),
    Speak,
    Talk,
    Send,
    Reset,
    Help,
    Quit,
}

/// Capability a command needs before it is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Needs {
    Nothing,
    Synthesis,
    Recognition,
}

const COMMANDS: &[(&str, &str, Needs)] = &[
    ("/image [path]", "attach an image to the next prompt (no path clears it)", Needs::Nothing),
    ("/preview <n> [id]", "preview variant n of the latest (or given) reply", Needs::Nothing),
    ("/apply <n> [id]", "write variant n into the document", Needs::Nothing),
    ("/unpreview", "forget the previewed variant", Needs::Nothing),
    ("/copy <n> [id]", "copy variant n to the clipboard", Needs::Nothing),
    ("/speak", "read the latest reply aloud", Needs::Synthesis),
    ("/talk", "dictate a prompt into the input", Needs::Recognition),
    ("/send", "send the current input", Needs::Nothing),
    ("/reset", "start the conversation over", Needs::Nothing),
    ("/help", "show this help", Needs::Nothing),
    ("/quit", "exit", Needs::Nothing),
];

/// Help text listing only the commands this machine can run.
pub fn help(synthesis: bool, recognition: bool) -> String {
    let mut out = String::from("Type a description to generate UI. Commands:");
    for (usage, summary, needs) in COMMANDS {
        let offered = match needs {
            Needs::Nothing => true,
            Needs::Synthesis => synthesis,
            Needs::Recognition => recognition,
        };
        if offered {
            out.push_str(&format!("\n  {usage:<20} {summary}"));
        }
    }
    out
}

fn variant_ref(command: &str, args: &[&str]) -> Result<VariantRef, String> {
    let raw = args.first().ok_or_else(|| format!("Usage: {command} <n> [message id]"))?;
    let number: usize = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a variant number"))?;
    if number == 0 {
        return Err("Variants are numbered from 1".to_string());
    }
    Ok(VariantRef {
        index: number - 1,
        message_id: args.get(1).map(|s| s.to_string()),
    })
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Some(Command::Prompt(line.trim_end_matches(['\r', '\n']).to_string())));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match name {
        "image" => {
            let path = rest[name.len()..].trim();
            Command::Image((!path.is_empty()).then(|| PathBuf::from(path)))
        }
        "preview" => Command::Preview(variant_ref("/preview", &args)?),
        "apply" => Command::Apply(variant_ref("/apply", &args)?),
        "copy" => Command::Copy(variant_ref("/copy", &args)?),
        "unpreview" => Command::Unpreview,
        "speak" => Command::Speak,
        "talk" => Command::Talk,
        "send" => Command::Send,
        "reset" => Command::Reset,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command /{other}; try /help")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            parse("make a card with {braces}\n").unwrap(),
            Some(Command::Prompt("make a card with {braces}".into()))
        );
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn variant_numbers_are_one_based() {
        assert_eq!(
            parse("/preview 2").unwrap(),
            Some(Command::Preview(VariantRef { index: 1, message_id: None }))
        );
        assert_eq!(
            parse("/apply 1 abc-123").unwrap(),
            Some(Command::Apply(VariantRef { index: 0, message_id: Some("abc-123".into()) }))
        );
        assert!(parse("/copy 0").is_err());
        assert!(parse("/copy two").is_err());
        assert!(parse("/apply").is_err());
    }

    #[test]
    fn image_path_may_contain_spaces() {
        assert_eq!(
            parse("/image ~/Desktop/my shot.png").unwrap(),
            Some(Command::Image(Some(PathBuf::from("~/Desktop/my shot.png"))))
        );
        assert_eq!(parse("/image").unwrap(), Some(Command::Image(None)));
    }

    #[test]
    fn help_hides_unavailable_speech_commands() {
        let text = help(false, false);
        assert!(text.contains("/apply <n> [id]"));
        assert!(!text.contains("/speak"));
        assert!(!text.contains("/talk"));

        let text = help(true, false);
        assert!(text.contains("/speak"));
        assert!(!text.contains("/talk"));

        assert!(help(true, true).contains("/talk"));
    }

    #[test]
    fn send_submits_pending_input() {
        assert_eq!(parse("/send").unwrap(), Some(Command::Send));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(parse("/frobnicate").is_err());
        assert_eq!(parse("/exit").unwrap(), Some(Command::Quit));
    }
}
