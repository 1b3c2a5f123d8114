//! Default values for attributes the editor left out.
//!
//! Applied by the loader so that generation never sees an unset field.

use super::{BlockKind, Branch, PinLevel};

pub const DEFAULT_PIN: u32 = 0;
pub const DEFAULT_PIN_LEVEL: PinLevel = PinLevel::Low;
pub const DEFAULT_SLEEP_LENGTH: u64 = 0;

/// A block of the given tag with every attribute at its default.
///
/// Branch arms start out `Missing`; only an explicit `children` entry can
/// fill them. Returns `None` for an unrecognized tag.
pub fn default_kind(tag: &str) -> Option<BlockKind> {
    let kind = match tag {
        "start" => BlockKind::Start,
        "loop" => BlockKind::Loop {
            condition: String::new(),
            child: None,
        },
        "conditional" => BlockKind::Conditional {
            condition: String::new(),
            if_true: Branch::Missing,
            if_false: Branch::Missing,
        },
        "read" | "pin_read" => BlockKind::Read {
            variable: String::new(),
            pin: DEFAULT_PIN,
        },
        "write" | "pin_write" => BlockKind::Write {
            pin: DEFAULT_PIN,
            value: DEFAULT_PIN_LEVEL,
        },
        "sleep" => BlockKind::Sleep {
            length: DEFAULT_SLEEP_LENGTH,
        },
        "code" => BlockKind::Code { code: String::new() },
        "variable" => BlockKind::Variable { name: String::new() },
        _ => return None,
    };
    Some(kind)
}
