use anyhow::{Result, anyhow};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};

use murmur_core::HotkeyBinding;

/// Resolves the persisted binding into a registrable hotkey.
pub fn hotkey_from_binding(binding: &HotkeyBinding) -> Result<HotKey> {
    let modifiers = parse_modifiers(&binding.modifiers)?;
    let code = parse_key(&binding.key)?;
    Ok(HotKey::new(Some(modifiers), code))
}

fn parse_modifiers(names: &[String]) -> Result<Modifiers> {
    let mut result = Modifiers::empty();
    for name in names {
        match name.as_str() {
            "Control" | "Ctrl" => result |= Modifiers::CONTROL,
            "Option" | "Alt" => result |= Modifiers::ALT,
            "Command" | "Super" => result |= Modifiers::SUPER,
            "Shift" => result |= Modifiers::SHIFT,
            other => return Err(anyhow!("unknown modifier: {other}")),
        }
    }
    Ok(result)
}

fn parse_key(key: &str) -> Result<Code> {
    let code = match key {
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "Escape" => Code::Escape,
        "Space" => Code::Space,
        other => return Err(anyhow!("unsupported key: {other}")),
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binding_parses() {
        let hotkey = hotkey_from_binding(&HotkeyBinding::default()).unwrap();
        assert_eq!(hotkey, HotKey::new(Some(Modifiers::CONTROL), Code::KeyD));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let binding = HotkeyBinding {
            modifiers: vec!["Control".into()],
            key: "F13".into(),
        };
        assert!(hotkey_from_binding(&binding).is_err());

        let binding = HotkeyBinding {
            modifiers: vec!["Hyper".into()],
            key: "D".into(),
        };
        assert!(hotkey_from_binding(&binding).is_err());
    }
}
