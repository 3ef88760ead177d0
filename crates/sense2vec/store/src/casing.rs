//! Case variants used when guessing a word's best sense.
//!
//! Cased characters are uppercase, lowercase or titlecase letters such as
//! `ǅ`, which is neither upper nor lower.

fn is_titlecase(c: char) -> bool {
    !c.is_uppercase() && !c.is_lowercase() && c.to_lowercase().ne(std::iter::once(c))
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase() || is_titlecase(c)
}

/// Titlecase mapping where it differs from the uppercase one.
fn titlecase_exception(c: char) -> Option<char> {
    let title = match c {
        'Ǆ' | 'ǅ' | 'ǆ' => 'ǅ',
        'Ǉ' | 'ǈ' | 'ǉ' => 'ǈ',
        'Ǌ' | 'ǋ' | 'ǌ' => 'ǋ',
        'Ǳ' | 'ǲ' | 'ǳ' => 'ǲ',
        'ᾳ' | 'ᾼ' => 'ᾼ',
        'ῃ' | 'ῌ' => 'ῌ',
        'ῳ' | 'ῼ' => 'ῼ',
        // Greek with ypogegrammeni: the lowercase half of each block of 16
        // maps to the titlecase half.
        '\u{1F80}'..='\u{1FAF}' => {
            let code = u32::from(c);
            char::from_u32(code | 0x8)?
        }
        _ => return None,
    };
    Some(title)
}

fn push_title(out: &mut String, c: char) {
    match (c, titlecase_exception(c)) {
        (_, Some(title)) => out.push(title),
        ('ß', None) => out.push_str("Ss"),
        (c, None) => out.extend(c.to_uppercase()),
    }
}

/// True when the word has at least one cased character and every cased
/// character is lowercase.
pub fn is_lower(word: &str) -> bool {
    let mut cased = false;
    for c in word.chars() {
        if c.is_uppercase() || is_titlecase(c) {
            return false;
        }
        cased |= c.is_lowercase();
    }
    cased
}

/// Titlecase the first cased character of every cased run, lowercase the
/// rest.
///
/// `"new_york"` becomes `"New_York"`, `"o'neil"` becomes `"O'Neil"`.
pub fn title(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut previous_cased = false;
    for c in word.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            push_title(&mut out, c);
        }
        previous_cased = is_cased(c);
    }
    out
}
