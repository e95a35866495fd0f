#[cfg(test)]
mod tests {
    use crate::{CfgParser, Entry, Error, Level, SourceKind};

    fn parse(text: &str) -> CfgParser {
        let mut p = CfgParser::new();
        p.parse(text, SourceKind::String, false).unwrap();
        p
    }

    fn parse_err(text: &str) -> (CfgParser, Error) {
        let mut p = CfgParser::new();
        let err = p.parse(text, SourceKind::String, false).unwrap_err();
        (p, err)
    }

    fn names(entry: &Entry) -> Vec<(&str, &str)> {
        entry.iter().map(|e| (e.name(), e.value())).collect()
    }

    #[test]
    fn entries_and_nested_sections() {
        let p = parse(
            r#"
            # a comment
            Files {
                Keys = "~/.app/keys"   /* trailing */
                Menu = "~/.app/menu"
            }
            Screen {
                Edge = "Top" {
                    Size = "2"
                }
                Workspaces = "4"
            }
            "#,
        );
        let root = p.entry_root();
        assert_eq!(names(root), vec![("Files", ""), ("Screen", "")]);
        let files = root.find_section("files", None).unwrap();
        assert_eq!(
            names(files),
            vec![("Keys", "~/.app/keys"), ("Menu", "~/.app/menu")]
        );
        let screen = root.find_section("Screen", None).unwrap();
        let edge = screen.find_section("Edge", Some("Top")).unwrap();
        assert_eq!(edge.find_entry("size", false, None).unwrap().value(), "2");
        assert_eq!(
            screen.find_entry("WORKSPACES", false, None).unwrap().value(),
            "4"
        );
        assert!(p.diagnostics().is_empty());
    }

    #[test]
    fn lines_and_source_names() {
        let p = parse("a = \"1\"\n\nb = \"2\" {\n  c = \"3\"\n}\n");
        let root = p.entry_root();
        let a = root.find_entry("a", false, None).unwrap();
        assert_eq!((a.line(), a.source_name()), (1, "<string>"));
        let b = root.find_entry("b", true, None).unwrap();
        assert_eq!(b.line(), 3);
        let c = b.section().unwrap().find_entry("c", false, None).unwrap();
        assert_eq!(c.line(), 4);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let p = parse("key = \"v\"");
        for name in ["KEY", "key", "Key"] {
            assert_eq!(
                p.entry_root().find_entry(name, false, None).unwrap().value(),
                "v"
            );
        }
        assert_eq!(p.entry_root().iter().next().unwrap().name(), "key");
    }

    #[test]
    fn find_entry_section_filter_and_value() {
        let p = parse("Key = \"a\" { x = \"1\" }\nKey = \"b\"\n");
        let root = p.entry_root();
        assert_eq!(root.find_entry("key", false, None).unwrap().value(), "b");
        assert_eq!(root.find_entry("key", true, None).unwrap().value(), "a");
        assert_eq!(
            root.find_entry("key", true, Some("b")).unwrap().line(),
            2
        );
        assert!(root.find_entry("key", true, Some("B")).is_none());
        assert!(root.find_section("key", Some("b")).is_none());
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "a = \"1\"; b = two\nS = \"x\" { c = \"3\" d { e = \"4\" } }\n";
        let one = parse(text);
        let two = parse(text);
        assert_eq!(one.entry_root(), two.entry_root());
    }

    #[test]
    fn separators_and_unquoted_values() {
        let p = parse("a = 1; b = /usr/bin;c=x#y");
        assert_eq!(
            names(p.entry_root()),
            vec![("a", "1"), ("b", "/usr/bin"), ("c", "x#y")]
        );
    }

    #[test]
    fn quoted_escapes_and_multiline() {
        let p = parse("a = \"say \\\"hi\\\"\"\nb = \"one\ntwo\"\nc = \"back\\\\slash\"\nd = \"x\\\ny\"");
        let root = p.entry_root();
        assert_eq!(root.find_entry("a", false, None).unwrap().value(), "say \"hi\"");
        assert_eq!(root.find_entry("b", false, None).unwrap().value(), "one\ntwo");
        assert_eq!(root.find_entry("c", false, None).unwrap().value(), "back\\slash");
        assert_eq!(root.find_entry("d", false, None).unwrap().value(), "xy");
        assert_eq!(root.find_entry("d", false, None).unwrap().line(), 5);
    }

    #[test]
    fn section_brace_on_next_line() {
        let p = parse("Menu = \"Main\"\n# about to open\n{\n  Entry = \"x\"\n}\n");
        let menu = p.entry_root().find_section("Menu", Some("Main")).unwrap();
        assert_eq!(names(menu), vec![("Entry", "x")]);
    }

    #[test]
    fn display_round_trips() {
        let text = "a = \"q\\\"uote $$\"\nS = \"v\" { b = \"1\" T { c = \"\\\\\" } }\n";
        let first = parse(text);
        let rendered = first.entry_root().to_string();
        let second = parse(&rendered);
        assert_eq!(
            first.entry_root().to_string(),
            second.entry_root().to_string()
        );
        assert_eq!(
            second.entry_root().find_entry("a", false, None).unwrap().value(),
            "q\"uote $$"
        );
    }

    #[test]
    fn unmatched_close_brace() {
        let (p, err) = parse_err("a = \"1\"\n}\n");
        assert!(matches!(err, Error::Structure { line: 2, .. }));
        assert_eq!(err.message(), "unmatched '}'");
        assert_eq!(p.diagnostics().len(), 1);
        assert_eq!(p.diagnostics()[0].level, Level::Error);
        assert_eq!(p.diagnostics()[0].line, 2);
        assert_eq!(p.diagnostics()[0].source_name, "<string>");
    }

    #[test]
    fn unterminated_section_keeps_partial_tree() {
        let (p, err) = parse_err("a = \"1\"\nS {\n  b = \"2\"\n");
        assert!(matches!(err, Error::Structure { line: 2, .. }));
        assert!(err.pretty().starts_with("Structure error at <string>:2"));
        let root = p.entry_root();
        assert_eq!(root.find_entry("a", false, None).unwrap().value(), "1");
        let s = root.find_section("S", None).unwrap();
        assert_eq!(s.find_entry("b", false, None).unwrap().value(), "2");
    }

    #[test]
    fn malformed_statements() {
        let (_, err) = parse_err("a \"1\"");
        assert_eq!(err.message(), "missing '=' after 'a'");
        let (_, err) = parse_err("a = ");
        assert_eq!(err.message(), "missing value for 'a'");
        let (_, err) = parse_err("= \"1\"");
        assert_eq!(err.message(), "expected a name");
        let (_, err) = parse_err("a = \"open");
        assert!(matches!(err, Error::Lex { line: 1, .. }));
        let (_, err) = parse_err("/* never closed");
        assert!(matches!(err, Error::Lex { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let mut p = CfgParser::new();
        let err = p
            .parse("/nonexistent/cfgtree/config", SourceKind::File, false)
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert_eq!(p.diagnostics().len(), 1);
        assert!(p.entry_root().is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut p = parse("$X = \"1\"\nDefine = \"T\" { a = \"1\" }\nk = \"v\"");
        assert_eq!(p.defines().count(), 1);
        p.clear();
        assert!(p.entry_root().is_empty());
        assert_eq!(p.get_var("X"), None);
        assert!(p.define("T").is_none());
        assert!(p.diagnostics().is_empty());
    }

    #[test]
    fn entry_root_is_mutable() {
        let mut p = parse("a = \"1\"");
        p.entry_root_mut()
            .find_entry_mut("a", false, None)
            .unwrap()
            .set_value("2");
        assert_eq!(
            p.entry_root().find_entry("a", false, None).unwrap().value(),
            "2"
        );
    }
}
