use std::ascii;

/// Renders a byte slice as printable ASCII, escaping everything else.
pub fn bytes_to_human_str(input: &[u8]) -> String {
    String::from_utf8(
        input
            .iter()
            .flat_map(|&c| ascii::escape_default(c))
            .collect::<Vec<u8>>(),
    )
    .unwrap_or_default()
}

/// Renders a YAML scalar the way beanstalkd's own stats output shows it.
/// Non-scalar values (which a conforming server never sends) fall back to
/// their YAML serialisation.
pub fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_owned(),
    }
}
