#[cfg(test)]
mod tests {
    use std::env;

    use crate::{CfgParser, Error, Level, ParserOptions, SourceKind};

    fn value(p: &CfgParser, name: &str) -> String {
        p.entry_root()
            .find_entry(name, false, None)
            .unwrap()
            .value()
            .to_string()
    }

    fn parse(text: &str) -> CfgParser {
        let mut p = CfgParser::new();
        p.parse(text, SourceKind::String, false).unwrap();
        p
    }

    #[test]
    fn substitution_in_values() {
        let p = parse("$X = \"foo\"\nkey = \"$X-bar\"\nmissing = \"[$Y]\"");
        assert_eq!(value(&p, "key"), "foo-bar");
        assert_eq!(value(&p, "missing"), "[]");
        assert_eq!(p.get_var("$X"), Some("foo"));
        assert_eq!(p.get_var("X"), Some("foo"));
        assert_eq!(p.entry_root().len(), 2);
    }

    #[test]
    fn greeting() {
        let p = parse("$GREETING = \"hi\"\nmsg = \"$GREETING there\"");
        assert_eq!(value(&p, "msg"), "hi there");
    }

    #[test]
    fn definitions_expand_once() {
        let p = parse("$Y = \"1\"\n$X = \"$Y\"\n$Y = \"2\"\nk = \"$X\"");
        assert_eq!(value(&p, "k"), "1");

        let mut p = CfgParser::new();
        p.set_var("X", "$Y");
        p.set_var("Y", "boom");
        p.parse("k = \"$X\"", SourceKind::String, false).unwrap();
        assert_eq!(value(&p, "k"), "$Y");
    }

    #[test]
    fn variables_persist_across_parses() {
        let mut p = CfgParser::new();
        p.set_var("$THEME", "dark");
        p.parse("$SIZE = \"12\"", SourceKind::String, false).unwrap();
        p.parse("t = \"$THEME/$SIZE\"", SourceKind::String, false)
            .unwrap();
        assert_eq!(value(&p, "t"), "dark/12");
        assert_eq!(p.variables().len(), 2);
    }

    #[test]
    fn escaped_dollar_and_braces() {
        let p = parse("$A = \"x\"\nk = \"\\$A ${A}y $\"");
        assert_eq!(value(&p, "k"), "$A xy $");
    }

    #[test]
    fn escaped_backslash_before_variable() {
        let p = parse("$X = \"foo\"\nk = \"C:\\\\$X\"\nlit = \"C:\\\\\\$X\"\nbare = C:\\\\$X");
        assert_eq!(value(&p, "k"), "C:\\foo");
        assert_eq!(value(&p, "lit"), "C:\\$X");
        assert_eq!(value(&p, "bare"), "C:\\foo");
    }

    #[test]
    fn environment_fallback_honours_option() {
        let home = env::var("HOME").unwrap_or_default();
        let p = parse("h = \"$_HOME\"");
        assert_eq!(value(&p, "h"), home);

        let mut p = CfgParser::with_options(ParserOptions {
            environment: false,
            ..ParserOptions::default()
        });
        p.parse("h = \"$_HOME\"", SourceKind::String, false).unwrap();
        assert_eq!(value(&p, "h"), "");
    }

    #[test]
    fn command_substitution_marks_dynamic() {
        let p = parse("k = \"a-$(echo b)-c\"");
        assert_eq!(value(&p, "k"), "a-b-c");
        assert!(p.is_dynamic_content());

        let p = parse("k = \"plain\"");
        assert!(!p.is_dynamic_content());
    }

    #[test]
    fn unquoted_command_substitution_with_spaces() {
        let p = parse("k = $(echo hi there)\nnext = \"n\"");
        assert_eq!(value(&p, "k"), "hi there");
        assert_eq!(value(&p, "next"), "n");
        assert!(p.is_dynamic_content());
    }

    #[test]
    fn failing_substitution_warns() {
        let p = parse("k = \"$(echo out; exit 3)\"");
        assert_eq!(value(&p, "k"), "out");
        assert_eq!(p.diagnostics().len(), 1);
        assert_eq!(p.diagnostics()[0].level, Level::Warning);
        assert!(p.diagnostics()[0].message.contains("status 3"));
    }

    #[test]
    fn variable_errors() {
        let mut p = CfgParser::new();
        let err = p
            .parse("$V { a = \"1\" }", SourceKind::String, false)
            .unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        let err = p
            .parse("$V = \"1\" { a = \"1\" }", SourceKind::String, false)
            .unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        let err = p
            .parse("k = \"${OPEN\"", SourceKind::String, false)
            .unwrap_err();
        assert!(matches!(err, Error::Lex { line: 1, .. }));
    }
}
