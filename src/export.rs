// Author: Dustin Pilgrim
// License: MIT

use serde_json::json;

use crate::access::KeyPath;
use crate::ast::{Document, Node, Number, Tag, Value};
use crate::parser::resolve_plain;
use crate::CompileError;

/// Longest flow collection written on the same line as its tag.
const FLOW_WIDTH: usize = 80;

/// Render a document as block-style YAML.
///
/// Mappings and sequences are written in block style with two-space
/// indentation, in stored order. Tagged functions use the short form
/// (`!Ref Bucket`) and keep short payloads on one line:
/// - comments are written back where the loader found them
/// - strings are quoted only when they would otherwise read back as a
///   different value
/// - multi-line strings use literal block scalars
pub fn to_yaml_string(doc: &Document) -> String {
    let mut out = String::new();

    for comment in &doc.root.comments.leading {
        push_comment(&mut out, 0, comment);
    }

    match &doc.root.value {
        Value::Mapping(entries) if !entries.is_empty() => {
            if let Some(trailing) = &doc.root.comments.trailing {
                push_comment(&mut out, 0, trailing);
            }
            write_mapping(&mut out, entries, 0, false);
        }
        Value::Sequence(items) if !items.is_empty() => {
            if let Some(trailing) = &doc.root.comments.trailing {
                push_comment(&mut out, 0, trailing);
            }
            write_sequence(&mut out, items, 0, false);
        }
        value => {
            let mut line = String::new();
            write_value(&mut line, value, doc.root.comments.trailing.as_deref(), 0);
            out.push_str(line.trim_start_matches(' '));
        }
    }

    for comment in &doc.trailing_comments {
        push_comment(&mut out, 0, comment);
    }
    out
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push(' ');
    }
}

fn push_comment(out: &mut String, indent: usize, text: &str) {
    push_indent(out, indent);
    out.push('#');
    out.push_str(text);
    out.push('\n');
}

fn push_trailing(out: &mut String, trailing: Option<&str>) {
    if let Some(text) = trailing {
        out.push_str(" #");
        out.push_str(text);
    }
    out.push('\n');
}

fn write_mapping(out: &mut String, entries: &[(String, Node)], indent: usize, first_inline: bool) {
    for (i, (key, node)) in entries.iter().enumerate() {
        let inline = first_inline && i == 0;
        if !inline {
            for comment in &node.comments.leading {
                push_comment(out, indent, comment);
            }
            push_indent(out, indent);
        }
        out.push_str(&scalar_key(key));
        out.push(':');
        write_value(out, &node.value, node.comments.trailing.as_deref(), indent);
    }
}

fn write_sequence(out: &mut String, items: &[Node], indent: usize, first_inline: bool) {
    for (i, node) in items.iter().enumerate() {
        let inline = first_inline && i == 0;
        if !inline {
            for comment in &node.comments.leading {
                push_comment(out, indent, comment);
            }
            push_indent(out, indent);
        }
        out.push('-');
        write_item(out, node, indent);
    }
}

/// Write a sequence item after its `-`, using the compact `- key: value`
/// and `- - item` forms when no comment would be lost by doing so.
fn write_item(out: &mut String, node: &Node, indent: usize) {
    let trailing = node.comments.trailing.as_deref();
    match &node.value {
        Value::Mapping(entries) if !entries.is_empty() => {
            if trailing.is_none() && entries[0].1.comments.leading.is_empty() {
                out.push(' ');
                write_mapping(out, entries, indent + 2, true);
            } else {
                push_trailing(out, trailing);
                write_mapping(out, entries, indent + 2, false);
            }
        }
        Value::Sequence(items) if !items.is_empty() => {
            if trailing.is_none() && items[0].comments.leading.is_empty() {
                out.push(' ');
                write_sequence(out, items, indent + 2, true);
            } else {
                push_trailing(out, trailing);
                write_sequence(out, items, indent + 2, false);
            }
        }
        value => write_value(out, value, trailing, indent),
    }
}

/// Write a value after `key:` or `-`. `indent` is the column of the key or
/// dash that introduced it.
fn write_value(out: &mut String, value: &Value, trailing: Option<&str>, indent: usize) {
    match value {
        Value::Mapping(entries) if !entries.is_empty() => {
            push_trailing(out, trailing);
            write_mapping(out, entries, indent + 2, false);
        }
        Value::Sequence(items) if !items.is_empty() => {
            push_trailing(out, trailing);
            write_sequence(out, items, indent + 2, false);
        }
        Value::Tagged(tag, payload) => {
            out.push_str(" !");
            out.push_str(tag.name());
            // a tag's own end-of-line comment wins over one left on the payload
            let trailing = trailing.or(payload.comments.trailing.as_deref());
            let flow = match &payload.value {
                Value::Mapping(_) | Value::Sequence(_) => flow_string(payload)
                    .filter(|s| s.len() + indent + tag.name().len() < FLOW_WIDTH),
                _ => None,
            };
            match flow {
                Some(text) => {
                    out.push(' ');
                    out.push_str(&text);
                    push_trailing(out, trailing);
                }
                None => write_value(out, &payload.value, trailing, indent),
            }
        }
        Value::String(s) if block_literal_fits(s) => {
            out.push_str(if s.ends_with('\n') { " |" } else { " |-" });
            push_trailing(out, trailing);
            for line in s.trim_end_matches('\n').split('\n') {
                if !line.is_empty() {
                    push_indent(out, indent + 2);
                    out.push_str(line);
                }
                out.push('\n');
            }
        }
        scalar => {
            out.push(' ');
            out.push_str(&scalar_string(scalar, false));
            push_trailing(out, trailing);
        }
    }
}

/// Render a node in flow style, or `None` if that would drop comments.
fn flow_string(node: &Node) -> Option<String> {
    if !node.comments.is_empty() {
        return None;
    }
    match &node.value {
        Value::Mapping(entries) => {
            let mut parts = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                parts.push(format!("{}: {}", scalar_string(&Value::String(key.clone()), true), flow_string(value)?));
            }
            Some(format!("{{{}}}", parts.join(", ")))
        }
        Value::Sequence(items) => {
            let parts = items.iter().map(flow_string).collect::<Option<Vec<_>>>()?;
            Some(format!("[{}]", parts.join(", ")))
        }
        Value::Tagged(tag, payload) => Some(format!("{} {}", tag, flow_string(payload)?)),
        scalar => Some(scalar_string(scalar, true)),
    }
}

fn block_literal_fits(s: &str) -> bool {
    let body = match s.strip_suffix('\n') {
        Some(body) => body,
        None => s,
    };
    body.contains('\n')
        && !body.ends_with('\n')
        && !body.starts_with([' ', '\t', '\n'])
        && !body.contains('\r')
        && body
            .split('\n')
            .all(|line| line.is_empty() || !line.trim().is_empty())
}

fn scalar_key(key: &str) -> String {
    scalar_string(&Value::String(key.to_string()), false)
}

fn scalar_string(value: &Value, in_flow: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if plain_is_safe(s, in_flow) => s.clone(),
        Value::String(s) => quote(s),
        Value::Mapping(entries) if entries.is_empty() => "{}".to_string(),
        Value::Sequence(items) if items.is_empty() => "[]".to_string(),
        other => flow_string(&Node::new(other.clone())).unwrap_or_default(),
    }
}

/// Whether `s` reads back as the same string when written without quotes.
fn plain_is_safe(s: &str, in_flow: bool) -> bool {
    let first = match s.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if !matches!(resolve_plain(s), Value::String(_)) {
        return false;
    }
    // YAML 1.1 readers treat these as booleans
    if matches!(
        s.to_ascii_lowercase().as_str(),
        "y" | "n" | "yes" | "no" | "on" | "off"
    ) {
        return false;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) || first.is_whitespace() {
        return false;
    }
    if s.starts_with("...") || s.ends_with(|c: char| c.is_whitespace() || c == ':') {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.contains("\t#") {
        return false;
    }
    if s.chars().any(|c| c.is_control()) {
        return false;
    }
    if in_flow && s.contains([',', '[', ']', '{', '}']) {
        return false;
    }
    true
}

fn quote(s: &str) -> String {
    if !s.chars().any(|c| c.is_control()) {
        return format!("'{}'", s.replace('\'', "''"));
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Convert a node into JSON, writing tagged functions in their long form
/// (`{"Fn::Sub": ...}`, `{"Ref": ...}`). Comments have no JSON form and are
/// dropped.
pub fn to_json_value(node: &Node) -> Result<serde_json::Value, CompileError> {
    value_to_json(node, &mut KeyPath::root())
}

fn value_to_json(node: &Node, path: &mut KeyPath) -> Result<serde_json::Value, CompileError> {
    use crate::access::Segment;

    Ok(match &node.value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::String(s) => json!(s),
        Value::Number(n) => number_to_json(n, path)?,
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(Segment::Index(i));
                out.push(value_to_json(item, path)?);
                path.pop();
            }
            serde_json::Value::Array(out)
        }
        Value::Mapping(entries) => {
            let mut map = serde_json::Map::new();
            for (key, value) in entries {
                path.push(Segment::Key(key.clone()));
                map.insert(key.clone(), value_to_json(value, path)?);
                path.pop();
            }
            serde_json::Value::Object(map)
        }
        Value::Tagged(Tag::GetAtt, payload) if payload.as_str().is_some() => {
            let text = payload.as_str().unwrap_or_default();
            let parts: Vec<&str> = text.splitn(2, '.').collect();
            json!({ "Fn::GetAtt": parts })
        }
        Value::Tagged(tag, payload) => {
            let mut map = serde_json::Map::new();
            map.insert(tag.long_form(), value_to_json(payload, path)?);
            serde_json::Value::Object(map)
        }
    })
}

fn number_to_json(n: &Number, path: &KeyPath) -> Result<serde_json::Value, CompileError> {
    if let Some(i) = n.as_i64() {
        return Ok(json!(i));
    }
    serde_json::Number::from_f64(n.as_f64())
        .map(serde_json::Value::Number)
        .ok_or_else(|| CompileError::type_mismatch(path, "a finite number", n.as_str()))
}

/// Render a document as pretty-printed JSON.
pub fn to_json_string(doc: &Document) -> Result<String, CompileError> {
    let value = to_json_value(&doc.root).map_err(|e| e.with_optional_document(doc.source.as_deref()))?;
    let mut text = serde_json::to_string_pretty(&value)
        .map_err(|e| CompileError::type_mismatch("", "serializable document", e.to_string()))?;
    text.push('\n');
    Ok(text)
}

/// Build a node from JSON. Single-key objects naming a recognized intrinsic
/// function in long form (`{"Ref": "Topic"}`) become tagged nodes.
pub fn from_json_value(value: &serde_json::Value) -> Node {
    match value {
        serde_json::Value::Null => Node::null(),
        serde_json::Value::Bool(b) => Node::bool(*b),
        serde_json::Value::Number(n) => match Number::parse(&n.to_string()) {
            Some(number) => Node::new(Value::Number(number)),
            None => Node::string(n.to_string()),
        },
        serde_json::Value::String(s) => Node::string(s.clone()),
        serde_json::Value::Array(items) => Node::sequence(items.iter().map(from_json_value).collect()),
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some((key, inner)) = map.iter().next() {
                    if let Some(tag) = Tag::from_long_form(key) {
                        let payload = from_json_value(inner);
                        if tag.check_payload(&payload.value).is_ok() {
                            return Node::tagged(tag, payload);
                        }
                    }
                }
            }
            Node::mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), from_json_value(v)))
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_str;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r#"# Analysis API stack
AWSTemplateFormatVersion: 2010-09-09
Description: 'yes'
Parameters:
  Debug:
    Type: String
    AllowedValues: [true, false]
Resources:
  # Public gateway
  Api:
    Type: AWS::Serverless::Api # gateway
    Properties:
      StageName: v1
      DefinitionBody: api/analysis.yml
      Variables:
        Arn: !Sub arn:aws:lambda:${AWS::Region}:${AWS::AccountId}:function:analysis
      Tags:
        - Key: team
          Value: panther
        - - nested
          - list
  Function:
    Type: AWS::Serverless::Function
    Properties:
      InlineCode: |
        exports.handler = async () => {
          return 'ok';
        };
      Environment: !If [IsDebug, {Variables: {DEBUG: '1'}}, !Ref AWS::NoValue]
      Role: !GetAtt Role.Arn
      Timeout: 1.50
Outputs: {}
# trailing note
"#;

    #[test]
    fn test_yaml_round_trip_is_structural_identity() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let dumped = to_yaml_string(&doc);
        let reloaded = load_str(&dumped).expect("Failed to reload dumped template");
        assert_eq!(reloaded.root, doc.root);
    }

    #[test]
    fn test_yaml_dump_is_stable() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let once = to_yaml_string(&doc);
        let twice = to_yaml_string(&load_str(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_comments_survive_round_trip() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let reloaded = load_str(&to_yaml_string(&doc)).unwrap();

        let api = reloaded.node("Resources.Api").unwrap();
        assert_eq!(api.comments.leading, vec![" Public gateway".to_string()]);
        let ty = reloaded.node("Resources.Api.Type").unwrap();
        assert_eq!(ty.comments.trailing.as_deref(), Some(" gateway"));
        let version = reloaded.node("AWSTemplateFormatVersion").unwrap();
        assert_eq!(version.comments.leading, vec![" Analysis API stack".to_string()]);
        assert_eq!(reloaded.trailing_comments, vec![" trailing note".to_string()]);
    }

    #[test]
    fn test_yaml_layout() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let dumped = to_yaml_string(&doc);

        assert!(dumped.starts_with("# Analysis API stack\nAWSTemplateFormatVersion: 2010-09-09\n"));
        assert!(dumped.contains("Description: 'yes'\n"));
        assert!(dumped.contains("        - Key: team\n          Value: panther\n"));
        assert!(dumped.contains("        - - nested\n          - list\n"));
        assert!(dumped.contains("      Role: !GetAtt Role.Arn\n"));
        assert!(dumped.contains("      Timeout: 1.50\n"));
        assert!(dumped.contains("      InlineCode: |\n        exports.handler = async () => {\n"));
        assert!(dumped.contains("Outputs: {}\n"));
    }

    #[test]
    fn test_strings_that_look_like_other_types_are_quoted() {
        let doc = Document::new(Node::mapping(vec![
            ("a".into(), Node::string("123")),
            ("b".into(), Node::string("true")),
            ("c".into(), Node::string("")),
            ("d".into(), Node::string("key: value")),
            ("e".into(), Node::string("it's")),
            ("f".into(), Node::string("tab\there\n")),
            ("g".into(), Node::string("- item")),
        ]));

        let dumped = to_yaml_string(&doc);
        assert!(dumped.contains("a: '123'\n"));
        assert!(dumped.contains("b: 'true'\n"));
        assert!(dumped.contains("c: ''\n"));
        assert!(dumped.contains("d: 'key: value'\n"));
        assert!(dumped.contains("e: it's\n"));
        assert!(dumped.contains("f: \"tab\\there\\n\"\n"));
        assert!(dumped.contains("g: '- item'\n"));
        assert_eq!(load_str(&dumped).unwrap().root, doc.root);
    }

    #[test]
    fn test_json_uses_long_form_functions() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let value = to_json_value(&doc.root).expect("Failed to convert to JSON");

        let props = &value["Resources"]["Function"]["Properties"];
        assert_eq!(props["Role"], json!({"Fn::GetAtt": ["Role", "Arn"]}));
        assert_eq!(
            props["Environment"],
            json!({"Fn::If": ["IsDebug", {"Variables": {"DEBUG": "1"}}, {"Ref": "AWS::NoValue"}]})
        );
        assert_eq!(props["Timeout"], json!(1.5));
        assert_eq!(value["AWSTemplateFormatVersion"], json!("2010-09-09"));

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["AWSTemplateFormatVersion", "Description", "Parameters", "Resources", "Outputs"]);
    }

    #[test]
    fn test_special_numbers() {
        let doc = load_str("Mask: 0x1F\nMode: 0o755\nCeiling: .inf\nText: '0x1F'\n").expect("Failed to load numbers");
        assert_eq!(doc.node("Mask").unwrap().value, Value::Number(Number::from_u64(31)));
        assert_eq!(doc.node("Text").unwrap().as_str(), Some("0x1F"));

        let dumped = to_yaml_string(&doc);
        assert_eq!(dumped, "Mask: 0x1F\nMode: 0o755\nCeiling: .inf\nText: '0x1F'\n");

        let err = to_json_value(&doc.root).unwrap_err();
        match err {
            CompileError::TypeMismatch { key_path, found, .. } => {
                assert_eq!(key_path, "Ceiling");
                assert_eq!(found, ".inf");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }

        let finite = load_str("Mask: 0x1F\nMode: 0o755\n").unwrap();
        let value = to_json_value(&finite.root).expect("Failed to convert to JSON");
        assert_eq!(value, json!({"Mask": 31, "Mode": 493}));
    }

    #[test]
    fn test_json_output_reloads() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let text = to_json_string(&doc).expect("Failed to render JSON");
        let reloaded = load_str(&text).expect("Failed to load rendered JSON");
        assert_eq!(
            reloaded.node("Resources.Api.Properties.StageName").unwrap().as_str(),
            Some("v1")
        );
    }

    #[test]
    fn test_from_json_restores_functions() {
        let node = from_json_value(&json!({
            "AlarmActions": [{"Ref": "Topic"}],
            "Custom": {"Fn::Base64": "x"},
            "Count": 3
        }));

        let actions = node.get_key("AlarmActions").unwrap().as_sequence().unwrap();
        assert_eq!(actions[0], Node::tagged(Tag::Ref, Node::string("Topic")));
        assert!(matches!(node.get_key("Custom").unwrap().value, Value::Mapping(_)));
        assert_eq!(node.get_key("Count").unwrap().value, Value::Number(Number::from_u64(3)));
    }
}

#[cfg(test)]
mod proptests {
    use std::collections::HashSet;

    use super::*;
    use crate::ast::Comments;
    use crate::load_str;
    use proptest::prelude::*;

    // -- Strategy helpers --

    fn arb_text() -> impl Strategy<Value = String> {
        prop_oneof![
            "[ -~]{0,12}",
            "[a-z]{1,6}(\n[a-z #:-]{0,6}){1,3}\n?",
            prop::sample::select(vec![
                "", "yes", "true", "~", "null", "1.50", "0x1F", "0o17", ".inf", "-.nan", "- item",
                "key: value", "a #b", "'quoted'", "it's", "#hash", "!Ref", "[a, b]", "{a: 1}",
                "...", "tab\there", "rocket 🚀", "café", "a:b", "line\n",
            ])
            .prop_map(str::to_string),
        ]
    }

    fn arb_key() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => "[A-Za-z][A-Za-z0-9 _./:-]{0,10}",
            1 => prop::sample::select(vec![
                "", "true", "1", "- a", "a: b", "#x", "x #y", "it's", "!Ref", "é", "tab\tkey", "line\nbreak",
            ])
            .prop_map(str::to_string),
        ]
    }

    fn arb_number() -> impl Strategy<Value = Number> {
        prop::sample::select(vec!["0", "-3", "42", "1.50", "2.5e3", "0x1F", "0o17", ".inf", "-.inf", ".nan"])
            .prop_map(|text| Number::parse(text).expect("Failed to parse number fixture"))
    }

    fn arb_leaf() -> impl Strategy<Value = Node> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            arb_number().prop_map(Value::Number),
            arb_text().prop_map(Value::String),
        ]
        .prop_map(Node::new)
    }

    fn arb_comments() -> impl Strategy<Value = Comments> {
        (
            prop::collection::vec("( [ -~]{0,10})?", 0..2),
            prop::option::of(" [ -~]{0,10}"),
        )
            .prop_map(|(leading, trailing)| Comments { leading, trailing })
    }

    fn with_comments(node: impl Strategy<Value = Node>) -> impl Strategy<Value = Node> {
        (node, arb_comments()).prop_map(|(mut node, comments)| {
            node.comments = comments;
            node
        })
    }

    fn unique_keys(entries: Vec<(String, Node)>) -> Vec<(String, Node)> {
        let mut seen = HashSet::new();
        entries.into_iter().filter(|(key, _)| seen.insert(key.clone())).collect()
    }

    fn tagged_sequence(tag: Tag, len: usize, inner: BoxedStrategy<Node>) -> impl Strategy<Value = Node> {
        prop::collection::vec(inner, len).prop_map(move |items| Node::tagged(tag.clone(), Node::sequence(items)))
    }

    /// Every short-form function with a payload it accepts.
    fn arb_tagged(inner: BoxedStrategy<Node>) -> impl Strategy<Value = Node> {
        let string = || arb_text().prop_map(Node::string);
        let scalar_payloads = prop_oneof![
            string().prop_map(|s| Node::tagged(Tag::Sub, s)),
            string().prop_map(|s| Node::tagged(Tag::Ref, s)),
            "[A-Za-z]{1,6}\\.[A-Za-z]{1,6}".prop_map(|s| Node::tagged(Tag::GetAtt, Node::string(s))),
            string().prop_map(|s| Node::tagged(Tag::ImportValue, s)),
            string().prop_map(|s| Node::tagged(Tag::ImportValue, Node::tagged(Tag::Sub, s))),
            (string(), prop::collection::vec((arb_key(), inner.clone()), 0..3)).prop_map(|(text, vars)| {
                Node::tagged(Tag::Sub, Node::sequence(vec![text, Node::mapping(unique_keys(vars))]))
            }),
            (prop::sample::select(vec!["Base64", "Cidr", "GetAZs", "Select"]), inner.clone())
                .prop_map(|(name, payload)| Node::tagged(Tag::Other(name.to_string()), payload)),
        ];
        let sequence_payloads = prop_oneof![
            tagged_sequence(Tag::GetAtt, 2, inner.clone()),
            tagged_sequence(Tag::If, 3, inner.clone()),
            tagged_sequence(Tag::Join, 2, inner.clone()),
            tagged_sequence(Tag::Split, 2, inner.clone()),
            tagged_sequence(Tag::Equals, 2, inner.clone()),
            tagged_sequence(Tag::Not, 1, inner),
        ];
        prop_oneof![scalar_payloads, sequence_payloads]
    }

    fn arb_node() -> impl Strategy<Value = Node> {
        arb_leaf().prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(with_comments(inner.clone()), 0..4).prop_map(Node::sequence),
                prop::collection::vec((arb_key(), with_comments(inner.clone())), 0..4)
                    .prop_map(|entries| Node::mapping(unique_keys(entries))),
                arb_tagged(inner),
            ]
        })
    }

    fn arb_document() -> impl Strategy<Value = Document> {
        prop::collection::vec((arb_key(), with_comments(arb_node())), 1..5)
            .prop_map(|entries| Document::new(Node::mapping(unique_keys(entries))))
    }

    proptest! {
        #[test]
        fn test_yaml_round_trip_preserves_values(doc in arb_document()) {
            let text = to_yaml_string(&doc);
            let reloaded = load_str(&text);
            prop_assert!(reloaded.is_ok(), "failed to reload {:?}:\n{}", reloaded.as_ref().err(), text);
            let reloaded = reloaded.unwrap();
            prop_assert_eq!(&reloaded.root, &doc.root, "dumped as:\n{}", text);
        }
    }
}
