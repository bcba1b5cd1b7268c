//! Product-name decomposition: `"Camiseta (Azul (M))"` → (`"Camiseta"`, `"Azul (M)"`).

/// A product name split into its base name and trailing parenthesized qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductName {
    /// Name with the qualifier group removed, re-trimmed.
    pub base: String,
    /// Text inside the matched parentheses; `None` when there was no balanced group.
    pub characteristic: Option<String>,
}

/// Split `raw` on its last parenthesized group, honoring nesting.
///
/// The last `)` anywhere in the name is matched to its opening `(` by walking backwards with a
/// depth counter. Everything between the pair is the characteristic. The text before and after
/// it, joined by a single space, is the base name, so `"Boné (Vermelho) Infantil"` has base
/// `"Boné Infantil"`. Without a `)`, or when the last `)` has no matching `(`, the trimmed name
/// is returned unchanged.
///
/// A group that is empty (or only whitespace) yields no characteristic.
pub fn split_characteristic(raw: &str) -> ProductName {
    let s = raw.trim();
    let unchanged = || ProductName {
        base: s.to_string(),
        characteristic: None,
    };

    let Some(end) = s.rfind(')') else {
        return unchanged();
    };

    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in s[..=end].char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    start = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(start) = start else {
        return unchanged();
    };

    let inner = s[start + 1..end].trim();
    let before = s[..start].trim_end();
    let after = s[end + 1..].trim_start();
    let base = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{before} {after}"),
        (false, true) => before.to_string(),
        (true, _) => after.to_string(),
    };
    ProductName {
        base,
        characteristic: (!inner.is_empty()).then(|| inner.to_string()),
    }
}
