//! Identifier recasing and small name helpers shared by filters and profiles

/// Convert `snake_case` to `camelCase`
///
/// Components after the first are title-cased (first letter upper, rest
/// lower), and the first letter of the result is lowered:
/// `card_reader_id` -> `cardReaderId`, `PIN_code` -> `pINCode`.
pub fn to_camel_case(s: &str) -> String {
    let mut components = s.split('_');
    let mut combined = components.next().unwrap_or_default().to_string();
    for component in components {
        combined.push_str(&title_case(component));
    }
    lowercase_first_letter(&combined)
}

/// Convert `PascalCase` or `camelCase` to `snake_case`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            // Underscore before an uppercase letter that starts a new word;
            // a run of capitals followed by lowercase splits before the last
            // capital (HTTPServer -> http_server)
            let should_add_underscore = i > 0
                && (chars[i - 1].is_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || (i + 1 < chars.len() && chars[i + 1].is_lowercase()));

            if should_add_underscore && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else if ch == '-' || ch == ' ' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
        } else {
            result.push(ch);
        }
    }

    result
}

pub fn lowercase_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Last segment of a dotted name: `.payments.Charge` -> `Charge`
pub fn remove_package(s: &str) -> &str {
    s.rsplit('.').next().unwrap_or(s)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("card_reader_id"), "cardReaderId");
        assert_eq!(to_camel_case("amount"), "amount");
        assert_eq!(to_camel_case("Amount"), "amount");
        assert_eq!(to_camel_case("PIN_code"), "pINCode");
        assert_eq!(to_camel_case("double__underscore"), "doubleUnderscore");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Payment"), "payment");
        assert_eq!(to_snake_case("CardReader"), "card_reader");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("cardReaderId"), "card_reader_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_lowercase_first_letter() {
        assert_eq!(lowercase_first_letter("Payment"), "payment");
        assert_eq!(lowercase_first_letter("X"), "x");
        assert_eq!(lowercase_first_letter(""), "");
    }

    #[test]
    fn test_remove_package() {
        assert_eq!(remove_package(".payments.ChargeCompleted"), "ChargeCompleted");
        assert_eq!(remove_package("Charge"), "Charge");
    }
}
