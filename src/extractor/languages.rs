use tree_sitter::Language;

/// Concrete-syntax node kinds the declaration walker looks for.
pub struct NodeKinds {
    pub functions: &'static [&'static str],
    pub type_declaration: &'static str,
    pub type_spec: &'static str,
    pub struct_type: &'static str,
    pub const_declaration: &'static str,
    pub const_spec: &'static str,
    pub var_declaration: &'static str,
    pub var_spec: &'static str,
    /// Wrapper nodes around parenthesised spec groups.
    pub spec_lists: &'static [&'static str],
}

/// The single source grammar the extractor targets.
pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    pub test_suffixes: &'static [&'static str],
    pub generated_suffixes: &'static [&'static str],
    pub generated_prefixes: &'static [&'static str],
    pub excluded_dirs: &'static [&'static str],
    pub kinds: NodeKinds,
}

impl LanguageConfig {
    pub fn go() -> LanguageConfig {
        LanguageConfig {
            name: "go",
            language: tree_sitter_go::LANGUAGE.into(),
            extensions: &["go"],
            test_suffixes: &["_test.go"],
            generated_suffixes: &[".pb.go", ".pb.gw.go", "_gen.go", "_generated.go"],
            generated_prefixes: &["zz_generated"],
            excluded_dirs: &["vendor", "testdata"],
            kinds: NodeKinds {
                functions: &["function_declaration", "method_declaration"],
                type_declaration: "type_declaration",
                type_spec: "type_spec",
                struct_type: "struct_type",
                const_declaration: "const_declaration",
                const_spec: "const_spec",
                var_declaration: "var_declaration",
                var_spec: "var_spec",
                spec_lists: &["var_spec_list", "const_spec_list"],
            },
        }
    }

    /// Whether a diff path names a hand-written, non-test source file.
    ///
    /// Pure predicate on the path string.
    pub fn is_source_path(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        let file_name = path.rsplit('/').next().unwrap_or(&path);

        let has_extension = file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| self.extensions.contains(&ext));
        if !has_extension {
            return false;
        }

        if self.test_suffixes.iter().any(|s| file_name.ends_with(s))
            || self.generated_suffixes.iter().any(|s| file_name.ends_with(s))
            || self.generated_prefixes.iter().any(|p| file_name.starts_with(p))
        {
            return false;
        }

        let mut dirs = path.split('/').rev().skip(1);
        !dirs.any(|d| self.excluded_dirs.contains(&d))
    }
}
