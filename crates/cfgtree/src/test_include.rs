#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use tempfile::TempDir;

    use crate::{CfgParser, Entry, Error, Level, ParserOptions, SourceKind};

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    fn pairs(entry: &Entry) -> Vec<(String, String)> {
        entry
            .iter()
            .map(|e| (e.name().to_string(), e.value().to_string()))
            .collect()
    }

    #[test]
    fn include_is_positionally_transparent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "INCLUDE = \"b\"\nk = \"v\"\n");
        write(dir.path(), "b", "k2 = \"v2\"\n");
        let mut p = CfgParser::new();
        p.parse_file(dir.path().join("a"), false).unwrap();
        assert_eq!(
            pairs(p.entry_root()),
            vec![
                ("k2".to_string(), "v2".to_string()),
                ("k".to_string(), "v".to_string())
            ]
        );
        let k2 = p.entry_root().find_entry("k2", false, None).unwrap();
        assert!(k2.source_name().ends_with("b"));
        assert_eq!(p.cfg_files().files().len(), 2);
    }

    #[test]
    fn include_inside_section() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(
            dir.path(),
            "main",
            "Menu = \"Root\" {\n  include = \"sub/items\"\n  Last = \"z\"\n}\n",
        );
        write(&dir.path().join("sub"), "items", "Entry = \"a\"\nINCLUDE = \"more\"\n");
        write(&dir.path().join("sub"), "more", "Entry = \"b\"\n");
        let mut p = CfgParser::new();
        p.parse_file(dir.path().join("main"), false).unwrap();
        let menu = p.entry_root().find_section("menu", Some("Root")).unwrap();
        let names: Vec<&str> = menu.iter().map(|e| e.value()).collect();
        assert_eq!(names, vec!["a", "b", "z"]);
    }

    #[test]
    fn include_path_from_variable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "inc", "x = \"1\"\n");
        let mut p = CfgParser::new();
        p.set_var("DIR", dir.path().display().to_string());
        p.parse("INCLUDE = \"$DIR/inc\"", SourceKind::String, false)
            .unwrap();
        assert_eq!(
            p.entry_root().find_entry("x", false, None).unwrap().value(),
            "1"
        );
    }

    #[test]
    fn self_inclusion_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "k = \"1\"\nINCLUDE = \"a\"\n");
        let mut p = CfgParser::new();
        let err = p.parse_file(dir.path().join("a"), false).unwrap_err();
        assert!(matches!(err, Error::Structure { line: 2, .. }));
        assert!(err.message().contains("recursive inclusion"));
        assert_eq!(p.entry_root().len(), 1);
    }

    #[test]
    fn transitive_inclusion_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "INCLUDE = \"b\"\n");
        write(dir.path(), "b", "INCLUDE = \"c\"\n");
        write(dir.path(), "c", "INCLUDE = \"./a\"\n");
        let mut p = CfgParser::new();
        let err = p.parse_file(dir.path().join("a"), false).unwrap_err();
        assert!(err.message().contains("recursive inclusion"));
        assert!(err.source_name().ends_with("c"));
    }

    #[test]
    fn repeated_non_nested_include_is_allowed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "INCLUDE = \"b\"\nINCLUDE = \"b\"\n");
        write(dir.path(), "b", "k = \"v\"\n");
        let mut p = CfgParser::new();
        p.parse_file(dir.path().join("a"), false).unwrap();
        assert_eq!(p.entry_root().len(), 2);
        assert_eq!(p.cfg_files().files().len(), 2);
    }

    #[test]
    fn missing_include_is_reference_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "k = \"1\"\nINCLUDE = \"nope\"\n");
        let mut p = CfgParser::new();
        let err = p.parse_file(dir.path().join("a"), false).unwrap_err();
        assert!(matches!(err, Error::Reference { line: 2, .. }));
        assert_eq!(p.entry_root().len(), 1);
    }

    #[test]
    fn braces_must_balance_per_source() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "S {\nINCLUDE = \"b\"\n");
        write(dir.path(), "b", "}\n");
        let mut p = CfgParser::new();
        let err = p.parse_file(dir.path().join("a"), false).unwrap_err();
        assert_eq!(err.message(), "unmatched '}'");
        assert!(err.source_name().ends_with("b"));

        write(dir.path(), "a", "INCLUDE = \"b\"\n}\n");
        write(dir.path(), "b", "S {\n");
        let err = p.parse_file(dir.path().join("a"), false).unwrap_err();
        assert!(matches!(err, Error::Structure { line: 1, .. }));
        assert!(err.source_name().ends_with("b"));
    }

    #[test]
    fn depth_limit() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "INCLUDE = \"b\"\n");
        write(dir.path(), "b", "INCLUDE = \"c\"\n");
        write(dir.path(), "c", "k = \"v\"\n");
        let mut p = CfgParser::with_options(ParserOptions {
            max_depth: 2,
            ..ParserOptions::default()
        });
        let err = p.parse_file(dir.path().join("a"), false).unwrap_err();
        assert!(err.message().contains("nested deeper than 2"));
    }

    #[test]
    fn command_directive() {
        let mut p = CfgParser::new();
        p.parse(
            "before = \"1\"\nCOMMAND = \"echo 'gen = \\\"2\\\"'\"\nafter = \"3\"",
            SourceKind::String,
            false,
        )
        .unwrap();
        let values: Vec<&str> = p.entry_root().iter().map(|e| e.value()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
        assert!(p.is_dynamic_content());
        let generated = p.entry_root().find_entry("gen", false, None).unwrap();
        assert_eq!(generated.source_name(), "echo 'gen = \"2\"'");
    }

    #[test]
    fn command_source_top_level() {
        let mut p = CfgParser::new();
        p.parse("printf 'a = \"1\"'; exit 2", SourceKind::Command, false)
            .unwrap();
        assert!(p.is_dynamic_content());
        assert!(p.cfg_files().files().is_empty());
        assert_eq!(
            p.entry_root().find_entry("a", false, None).unwrap().value(),
            "1"
        );
        assert_eq!(p.diagnostics().len(), 1);
        assert_eq!(p.diagnostics()[0].level, Level::Warning);
    }

    #[test]
    fn dynamic_flag_resets_per_parse() {
        let mut p = CfgParser::new();
        p.parse("COMMAND = \"echo x = 1\"", SourceKind::String, false)
            .unwrap();
        assert!(p.is_dynamic_content());
        p.parse("y = \"2\"", SourceKind::String, false).unwrap();
        assert!(!p.is_dynamic_content());
        assert_eq!(p.entry_root().len(), 2);
    }
}
