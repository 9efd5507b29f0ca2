/// PascalCase a name, keeping only ASCII alphanumerics.
///
/// Words are split on any non-alphanumeric character; the first letter of
/// each word is upper-cased and the rest is kept as written, so
/// `log-analysis` becomes `LogAnalysis` and `FailedLogins` stays as is.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    out
}

/// Logical resource id built from name parts, e.g.
/// `logical_id(&["log-analysis", "FailedLogins", "Alarm"])` is
/// `LogAnalysisFailedLoginsAlarm`.
pub fn logical_id(parts: &[&str]) -> String {
    parts.iter().map(|p| pascal_case(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("log-analysis"), "LogAnalysis");
        assert_eq!(pascal_case("FailedLogins"), "FailedLogins");
        assert_eq!(pascal_case("api_gateway.5xx"), "ApiGateway5xx");
        assert_eq!(pascal_case("--"), "");
    }

    #[test]
    fn test_logical_id() {
        assert_eq!(
            logical_id(&["log-analysis", "FailedLogins", "Alarm"]),
            "LogAnalysisFailedLoginsAlarm"
        );
    }
}
