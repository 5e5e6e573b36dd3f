//! Identifier case conversion for reflected table names.

/// Convert a snake_case table name to a PascalCase entity name.
/// e.g. "user_accounts" -> "UserAccounts", "orders" -> "Orders"
pub fn to_pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
