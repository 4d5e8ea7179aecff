#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Super,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Super => "super",
        }
    }

    fn parse(input: &str) -> Result<Self, String> {
        match input.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Ok(Self::Ctrl),
            "alt" | "option" => Ok(Self::Alt),
            "shift" => Ok(Self::Shift),
            "super" | "win" | "windows" | "meta" | "cmd" => Ok(Self::Super),
            _ => Err(format!(
                "unsupported modifier '{input}'; use ctrl, alt, shift or super"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: Vec<Modifier>,
    pub key: String,
}

impl Hotkey {
    /// Lower-case `mod+mod+key` form stored in the config file.
    pub fn canonical(&self) -> String {
        let mut parts: Vec<&str> = self.modifiers.iter().map(|m| m.as_str()).collect();
        parts.push(&self.key);
        parts.join("+")
    }
}

pub fn parse_hotkey(input: &str) -> Result<Hotkey, String> {
    let parts: Vec<&str> = input
        .split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 2 {
        return Err("hotkey needs at least one modifier and a key".into());
    }

    let mut modifiers = Vec::new();
    for part in &parts[..parts.len() - 1] {
        let modifier = Modifier::parse(part)?;
        if !modifiers.contains(&modifier) {
            modifiers.push(modifier);
        }
    }
    modifiers.sort();

    let key = normalize_key(parts[parts.len() - 1])?;
    Ok(Hotkey { modifiers, key })
}

fn normalize_key(input: &str) -> Result<String, String> {
    let lower = input.to_ascii_lowercase();
    if matches!(lower.as_str(), "space" | "enter" | "tab" | "escape" | "esc") {
        return Ok(if lower == "esc" { "escape".into() } else { lower });
    }

    if let Some(number) = lower.strip_prefix('f') {
        if let Ok(parsed) = number.parse::<u8>() {
            if (1..=24).contains(&parsed) {
                return Ok(format!("f{parsed}"));
            }
            return Err("function key must be between F1 and F24".into());
        }
    }

    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Ok(c.to_string());
        }
    }

    Err(format!("unsupported key '{input}'"))
}
