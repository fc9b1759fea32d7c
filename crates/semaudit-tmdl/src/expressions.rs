//! Shared expression files (`expressions.tmdl`)
//!
//! Only parameters are kept: expressions whose value is a single quoted
//! literal, e.g. `expression Region = "West" meta [IsParameterQuery=true]`.
//! Queries (`let ... in`) are not model parameters.

use semaudit_core::Parameter;
use crate::relationships::clean_identifier;

/// Parse all parameters declared in an expression file
pub fn parse_parameters(content: &str) -> Vec<Parameter> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("expression"))
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .filter_map(parse_declaration)
        .collect()
}

fn parse_declaration(rest: &str) -> Option<Parameter> {
    let (name, value) = rest.split_once('=')?;
    let name = clean_identifier(name);
    if name.is_empty() {
        return None;
    }

    let value = strip_meta(value).replace("```", "");
    let value = value.trim();

    literal_value(value).map(|literal| Parameter::new(name, literal))
}

/// Drop a trailing `meta [...]` record
fn strip_meta(value: &str) -> &str {
    let mut in_string = false;
    for (idx, ch) in value.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            'm' if !in_string
                && value[idx..].starts_with("meta")
                && value[..idx].ends_with(char::is_whitespace) =>
            {
                return &value[..idx];
            }
            _ => {}
        }
    }
    value
}

/// Unquote a double-quoted M text literal (`""` is an escaped quote)
fn literal_value(value: &str) -> Option<String> {
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') || value.contains("let") {
        return None;
    }
    Some(value[1..value.len() - 1].replace("\"\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_parameters_only() {
        let content = "\
expression Region = \"West\" meta [IsParameterQuery=true, Type=\"Text\", IsParameterQueryRequired=true]
\tlineageTag: 1234

expression 'Server Name' = \"sql01.corp.local\" meta [IsParameterQuery=true]

expression Calendar =
\t\tlet
\t\t    Source = List.Dates(#date(2020,1,1), 365, #duration(1,0,0,0))
\t\tin
\t\t    Source

expression Quoted = \"say \"\"hi\"\"\"
";
        let params = parse_parameters(content);

        assert_eq!(
            params,
            vec![
                Parameter::new("Region", "West"),
                Parameter::new("Server Name", "sql01.corp.local"),
                Parameter::new("Quoted", "say \"hi\""),
            ]
        );
    }

    #[test]
    fn literal_containing_let_is_not_a_parameter() {
        let params = parse_parameters("expression Note = \"let it be\"");
        assert!(params.is_empty());
    }

    #[test]
    fn meta_inside_string_is_kept() {
        let params = parse_parameters("expression Tag = \"metadata meta\" meta [IsParameterQuery=true]");
        assert_eq!(params, vec![Parameter::new("Tag", "metadata meta")]);
    }
}
