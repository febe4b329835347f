use tree_sitter::{Node, Parser};

use super::ExtractError;
use super::languages::{LanguageConfig, NodeKinds};
use crate::model::{Hunk, SymbolKind};

/// Inclusive 1-based line span of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    fn of(node: Node) -> Self {
        Self {
            start: node.start_position().row + 1,
            end: node.end_position().row + 1,
        }
    }

    /// True when any hunk adds or keeps a line in `start..=end`.
    pub fn overlaps(&self, hunks: &[Hunk]) -> bool {
        hunks.iter().any(|h| h.touches(self.start, self.end))
    }
}

/// A top-level declaration of a parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Function {
        name: String,
        span: LineSpan,
        code: String,
    },
    /// A named struct type.
    TypeDecl {
        name: String,
        span: LineSpan,
        code: String,
    },
    /// A whole `const` declaration; every bound name shares the group's code.
    ConstGroup {
        names: Vec<String>,
        span: LineSpan,
        code: String,
    },
    VarGroup {
        names: Vec<String>,
        span: LineSpan,
        code: String,
    },
}

impl Declaration {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Declaration::Function { .. } => SymbolKind::Function,
            Declaration::TypeDecl { .. } => SymbolKind::TypeDecl,
            Declaration::ConstGroup { .. } => SymbolKind::Const,
            Declaration::VarGroup { .. } => SymbolKind::Var,
        }
    }

    pub fn names(&self) -> &[String] {
        match self {
            Declaration::Function { name, .. } | Declaration::TypeDecl { name, .. } => {
                std::slice::from_ref(name)
            }
            Declaration::ConstGroup { names, .. } | Declaration::VarGroup { names, .. } => names,
        }
    }

    pub fn span(&self) -> LineSpan {
        match self {
            Declaration::Function { span, .. }
            | Declaration::TypeDecl { span, .. }
            | Declaration::ConstGroup { span, .. }
            | Declaration::VarGroup { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Declaration::Function { code, .. }
            | Declaration::TypeDecl { code, .. }
            | Declaration::ConstGroup { code, .. }
            | Declaration::VarGroup { code, .. } => code,
        }
    }

    pub fn declares(&self, name: &str, kind: SymbolKind) -> bool {
        self.kind() == kind && self.names().iter().any(|n| n == name)
    }
}

/// Find the declaration binding `name` with the given kind.
pub fn find<'d>(decls: &'d [Declaration], name: &str, kind: SymbolKind) -> Option<&'d Declaration> {
    decls.iter().find(|d| d.declares(name, kind))
}

/// Parses source text into its list of top-level declarations.
pub struct DeclarationParser {
    parser: Parser,
    config: LanguageConfig,
}

impl DeclarationParser {
    pub fn new(config: LanguageConfig) -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&config.language)
            .map_err(|e| ExtractError::Language(e.to_string()))?;
        Ok(Self { parser, config })
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    /// Parse `source` and list its declarations in source order.
    ///
    /// A tree with any syntax error is rejected as a whole.
    pub fn parse(&mut self, path: &str, source: &str) -> Result<Vec<Declaration>, ExtractError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::Parse {
                path: path.to_string(),
                line: 0,
            })?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ExtractError::Parse {
                path: path.to_string(),
                line: first_error_line(root).unwrap_or(0),
            });
        }

        let kinds = &self.config.kinds;
        let mut decls = Vec::new();
        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            let kind = node.kind();
            if kinds.functions.contains(&kind) {
                if let Some(name) = field_text(node, "name", source) {
                    decls.push(Declaration::Function {
                        name,
                        span: LineSpan::of(node),
                        code: node_text(node, source),
                    });
                }
            } else if kind == kinds.type_declaration {
                collect_struct_types(node, source, kinds, &mut decls);
            } else if kind == kinds.const_declaration {
                let names = bound_names(node, kinds.const_spec, kinds, source);
                if !names.is_empty() {
                    decls.push(Declaration::ConstGroup {
                        names,
                        span: LineSpan::of(node),
                        code: node_text(node, source),
                    });
                }
            } else if kind == kinds.var_declaration {
                let names = bound_names(node, kinds.var_spec, kinds, source);
                if !names.is_empty() {
                    decls.push(Declaration::VarGroup {
                        names,
                        span: LineSpan::of(node),
                        code: node_text(node, source),
                    });
                }
            }
        }

        Ok(decls)
    }
}

fn collect_struct_types(node: Node, source: &str, kinds: &NodeKinds, out: &mut Vec<Declaration>) {
    let specs = specs_of(node, kinds.type_spec, kinds);
    // A lone spec reports the whole declaration, `type` keyword included.
    let single = specs.len() == 1;
    for spec in specs {
        let is_struct = spec
            .child_by_field_name("type")
            .is_some_and(|t| t.kind() == kinds.struct_type);
        if !is_struct {
            continue;
        }
        let Some(name) = field_text(spec, "name", source) else {
            continue;
        };
        let outer = if single { node } else { spec };
        out.push(Declaration::TypeDecl {
            name,
            span: LineSpan::of(outer),
            code: node_text(outer, source),
        });
    }
}

fn specs_of<'t>(node: Node<'t>, spec_kind: &str, kinds: &NodeKinds) -> Vec<Node<'t>> {
    let mut specs = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == spec_kind {
            specs.push(child);
        } else if kinds.spec_lists.contains(&child.kind()) {
            specs.extend(specs_of(child, spec_kind, kinds));
        }
    }
    specs
}

fn bound_names(node: Node, spec_kind: &str, kinds: &NodeKinds, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for spec in specs_of(node, spec_kind, kinds) {
        let mut cursor = spec.walk();
        for ident in spec.children_by_field_name("name", &mut cursor) {
            if !ident.is_named() {
                continue;
            }
            let name = node_text(ident, source);
            if name != "_" && !name.is_empty() {
                names.push(name);
            }
        }
    }
    names
}

fn field_text(node: Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source))
        .filter(|s| !s.is_empty())
}

fn node_text(node: Node, source: &str) -> String {
    source
        .get(node.byte_range())
        .unwrap_or_default()
        .to_string()
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Declaration> {
        let mut parser = DeclarationParser::new(LanguageConfig::go()).expect("go grammar");
        parser.parse("test.go", source).expect("parse")
    }

    #[test]
    fn test_top_level_declarations() {
        let source = r#"package shop

import "fmt"

// Order is a customer order.
type Order struct {
	ID     string
	Amount float64
}

type Shipper interface {
	Ship(o Order) error
}

const (
	FreeShippingThreshold = 1000.0
	StandardShippingFee   = 50.0
)

var defaultRegion, fallbackRegion = "eu", "us"

func CalculateShipping(amount float64) float64 {
	const local = 1
	if amount >= FreeShippingThreshold {
		return 0
	}
	return StandardShippingFee
}

func (o Order) Describe() string {
	return fmt.Sprintf("%s %.2f", o.ID, o.Amount)
}
"#;
        let decls = parse(source);
        let summary: Vec<(SymbolKind, Vec<String>)> = decls
            .iter()
            .map(|d| (d.kind(), d.names().to_vec()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (SymbolKind::TypeDecl, vec!["Order".to_string()]),
                (
                    SymbolKind::Const,
                    vec![
                        "FreeShippingThreshold".to_string(),
                        "StandardShippingFee".to_string()
                    ]
                ),
                (
                    SymbolKind::Var,
                    vec!["defaultRegion".to_string(), "fallbackRegion".to_string()]
                ),
                (SymbolKind::Function, vec!["CalculateShipping".to_string()]),
                (SymbolKind::Function, vec!["Describe".to_string()]),
            ]
        );

        let order = find(&decls, "Order", SymbolKind::TypeDecl).unwrap();
        assert_eq!(order.span(), LineSpan { start: 6, end: 9 });
        assert!(order.code().starts_with("type Order struct"));

        let consts = find(&decls, "StandardShippingFee", SymbolKind::Const).unwrap();
        assert_eq!(consts.span(), LineSpan { start: 15, end: 18 });
        assert!(consts.code().contains("FreeShippingThreshold = 1000.0"));
        assert!(find(&decls, "local", SymbolKind::Const).is_none());
    }

    #[test]
    fn test_grouped_var_block() {
        let source = "package p\n\nvar (\n\tA = 1\n\tB, C = 2, 3\n\t_ = 4\n)\n";
        let decls = parse(source);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].names(), ["A", "B", "C"]);
        assert_eq!(decls[0].span(), LineSpan { start: 3, end: 7 });
    }

    #[test]
    fn test_grouped_type_block_uses_spec_spans() {
        let source = "package p\n\ntype (\n\tA struct{ X int }\n\tB int\n\tC struct {\n\t\tY string\n\t}\n)\n";
        let decls = parse(source);
        let names: Vec<&str> = decls.iter().map(|d| d.names()[0].as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(decls[1].span(), LineSpan { start: 6, end: 8 });
        assert!(decls[1].code().starts_with("C struct"));
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        let mut parser = DeclarationParser::new(LanguageConfig::go()).unwrap();
        let err = parser
            .parse("broken.go", "package p\n\nfunc Broken( {\n")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { ref path, .. } if path == "broken.go"));
    }

    #[test]
    fn test_span_overlap_is_inclusive() {
        let span = LineSpan { start: 5, end: 9 };
        let hunk = |new_start, new_count| Hunk {
            old_start: new_start,
            old_count: 1,
            new_start,
            new_count,
        };
        assert!(span.overlaps(&[hunk(9, 1)]));
        assert!(span.overlaps(&[hunk(1, 5)]));
        assert!(!span.overlaps(&[hunk(4, 1), hunk(10, 3)]));
        assert!(!span.overlaps(&[hunk(6, 0)]));
        assert!(!span.overlaps(&[]));
        // Huge counts are checked arithmetically, not line by line.
        assert!(span.overlaps(&[hunk(1, usize::MAX - 1)]));
    }
}
