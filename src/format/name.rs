//! Entry name decoding and sanitizing.

use super::{flags, host};

/// Code page 437, upper half.
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

/// Decodes bytes as code page 437.
pub fn decode_cp437(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP437_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

fn utf8_or_cp437(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => decode_cp437(bytes),
    }
}

/// Decodes a raw entry name.
///
/// The name ends at the first NUL. UTF-8 is used when the language
/// encoding flag is set or the producer was a Unix host; old DOS-family
/// producers get CP437. Anything else is UTF-8 when it validates.
pub fn decode_name(raw: &[u8], general_flags: u16, version_made_by: u16) -> String {
    let raw = match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => raw,
    };
    let host_system = (version_made_by >> 8) as u8;
    let version = version_made_by & 0xFF;

    if general_flags & flags::UTF8 != 0 || host_system == host::UNIX {
        return utf8_or_cp437(raw);
    }
    if matches!(host_system, host::FAT | host::HPFS | host::NTFS) && (version <= 20 || version >= 25)
    {
        return decode_cp437(raw);
    }
    utf8_or_cp437(raw)
}

/// A name made safe for the local file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    /// `/`-separated relative path without a trailing separator.
    pub path: String,
    /// The raw name ended with a separator.
    pub trailing_separator: bool,
}

fn is_forbidden(c: char) -> bool {
    (c as u32) < 0x20 || matches!(c, '*' | '?' | '<' | '>' | '|' | '"' | ':')
}

fn sanitize_component(component: &str) -> String {
    let leading = component.len() - component.trim_start_matches(' ').len();
    let trailing = component.len() - component.trim_end_matches(' ').len();
    let mut out = String::with_capacity(component.len());
    if leading == component.len() {
        out.extend(std::iter::repeat_n('_', leading));
        return out;
    }
    out.extend(std::iter::repeat_n('_', leading));
    for c in component[leading..component.len() - trailing].chars() {
        out.push(if is_forbidden(c) { '_' } else { c });
    }
    out.extend(std::iter::repeat_n('_', trailing));
    out
}

/// Normalizes separators and replaces characters no file system accepts.
///
/// `..` components are kept; rejecting them is left to path resolution so
/// the error names the entry.
pub fn sanitize_name(name: &str) -> SanitizedName {
    let unified = name.replace('\\', "/");
    let trailing_separator = unified.ends_with('/');
    let path = unified
        .split('/')
        .filter(|c| !c.is_empty())
        .map(sanitize_component)
        .collect::<Vec<_>>()
        .join("/");
    SanitizedName {
        path,
        trailing_separator,
    }
}
