//! A filtering decorator over a [`TypeProvider`] (§6): restricts which
//! fields of one message type are visible according to a set of
//! field-path masks (`"a.b.c"`, `*` meaning "all fields"), and can
//! promote its top-level masked fields to variable declarations.

use cel_diagnostic::{Diagnostic, ErrorCode, IssueCollector};
use cel_ir::Span;

use crate::check::{FieldType, TypeProvider};
use crate::env::Env;
use crate::pool::Pool;

/// One parsed field-path mask: `"a.b.c"` becomes `["a", "b", "c"]`,
/// `"*"` becomes the single wildcard segment.
#[derive(Clone, Debug)]
struct Mask {
    segments: Vec<String>,
}

impl Mask {
    fn is_wildcard(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == "*"
    }
}

/// Wraps `inner` and hides every field of `struct_name` not named by one
/// of `masks`. Fields on any other struct pass through unchanged, since
/// a mask describes the shape of one root message, not the whole
/// schema.
pub struct MaskingTypeProvider<P> {
    inner: P,
    struct_name: String,
    masks: Vec<Mask>,
}

impl<P: TypeProvider> MaskingTypeProvider<P> {
    /// Parses `raw_masks` against `struct_name`. An empty path or a path
    /// with an empty segment (`"a..b"`, `"."`) is invalid; it's pushed to
    /// `issues` as `E5003` and dropped from the filter rather than
    /// causing a panic.
    pub fn new(inner: P, struct_name: impl Into<String>, raw_masks: &[&str], issues: &mut IssueCollector) -> Self {
        let mut masks = Vec::new();
        for raw in raw_masks {
            if raw.is_empty() {
                issues.push(Diagnostic::error(ErrorCode::E5003, "field mask path is empty".to_string(), Span::DUMMY));
                continue;
            }
            let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
            if segments.iter().any(String::is_empty) {
                issues.push(Diagnostic::error(
                    ErrorCode::E5003,
                    format!("field mask `{raw}` has an empty path segment"),
                    Span::DUMMY,
                ));
                continue;
            }
            masks.push(Mask { segments });
        }
        Self { inner, struct_name: struct_name.into(), masks }
    }

    fn top_level_field_visible(&self, field: &str) -> bool {
        self.masks.iter().any(|mask| mask.is_wildcard() || mask.segments.first().map(String::as_str) == Some(field))
    }

    /// Every top-level field named exactly (not via `*`) by a mask,
    /// promoted into `env` as a variable declaration (§6: "may promote
    /// top-level masked fields to variable declarations"), using the
    /// inner provider's field type. Unknown fields and `*` are skipped.
    pub fn declare_masked_variables(&self, pool: &mut Pool, env: &mut Env) {
        for mask in &self.masks {
            if mask.is_wildcard() {
                continue;
            }
            let Some(field_name) = mask.segments.first() else { continue };
            if let Some(FieldType { ty, wrapper }) = self.inner.lookup_field_type(pool, &self.struct_name, field_name) {
                let declared_ty = if wrapper { pool.nullable_of(ty) } else { ty };
                env.declare_var(field_name.clone(), declared_ty);
            }
        }
    }
}

impl<P: TypeProvider> TypeProvider for MaskingTypeProvider<P> {
    fn has_type(&self, name: &str) -> bool {
        self.inner.has_type(name)
    }

    fn lookup_field_type(&self, pool: &mut Pool, struct_name: &str, field: &str) -> Option<FieldType> {
        if struct_name == self.struct_name && !self.top_level_field_visible(field) {
            return None;
        }
        self.inner.lookup_field_type(pool, struct_name, field)
    }

    fn lookup_enum_value(&self, name: &str) -> Option<i64> {
        self.inner.lookup_enum_value(name)
    }

    fn find_type(&self, pool: &mut Pool, name: &str) -> Option<crate::ty::TypeId> {
        self.inner.find_type(pool, name)
    }

    fn types(&self) -> Vec<String> {
        self.inner.types()
    }

    fn lookup_field_names(&self, struct_name: &str) -> Option<Vec<String>> {
        let known = self.inner.lookup_field_names(struct_name)?;
        if struct_name != self.struct_name {
            return Some(known);
        }
        Some(known.into_iter().filter(|name| self.top_level_field_visible(name)).collect())
    }

    fn lookup_extension_type(&self, pool: &mut Pool, fq_extension_name: &str) -> Option<crate::check::ExtensionType> {
        self.inner.lookup_extension_type(pool, fq_extension_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::EmptyTypeProvider;

    struct OneField;

    impl TypeProvider for OneField {
        fn has_type(&self, name: &str) -> bool {
            name == "M"
        }

        fn lookup_field_type(&self, _pool: &mut Pool, struct_name: &str, field: &str) -> Option<FieldType> {
            if struct_name == "M" && (field == "a" || field == "b") {
                Some(FieldType { ty: crate::ty::TypeId::INT, wrapper: false })
            } else {
                None
            }
        }

        fn lookup_enum_value(&self, _name: &str) -> Option<i64> {
            None
        }

        fn lookup_field_names(&self, struct_name: &str) -> Option<Vec<String>> {
            if struct_name == "M" {
                Some(vec!["a".to_string(), "b".to_string()])
            } else {
                None
            }
        }
    }

    #[test]
    fn masked_field_is_hidden_and_unmasked_field_passes_through() {
        let mut pool = Pool::new();
        let mut issues = IssueCollector::new();
        let masking = MaskingTypeProvider::new(OneField, "M", &["a"], &mut issues);
        assert!(issues.is_empty());
        assert!(masking.lookup_field_type(&mut pool, "M", "a").is_some());
        assert!(masking.lookup_field_type(&mut pool, "M", "b").is_none());
    }

    #[test]
    fn wildcard_mask_exposes_every_field() {
        let mut pool = Pool::new();
        let mut issues = IssueCollector::new();
        let masking = MaskingTypeProvider::new(OneField, "M", &["*"], &mut issues);
        assert!(issues.is_empty());
        assert!(masking.lookup_field_type(&mut pool, "M", "a").is_some());
        assert!(masking.lookup_field_type(&mut pool, "M", "b").is_some());
    }

    #[test]
    fn fields_of_other_structs_are_unaffected_by_the_mask() {
        let mut pool = Pool::new();
        let mut issues = IssueCollector::new();
        let masking = MaskingTypeProvider::new(OneField, "M", &["a"], &mut issues);
        assert!(masking.lookup_field_type(&mut pool, "Other", "whatever").is_none());
    }

    #[test]
    fn empty_mask_path_is_e5003() {
        let mut issues = IssueCollector::new();
        MaskingTypeProvider::new(EmptyTypeProvider, "M", &[""], &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.all()[0].code, ErrorCode::E5003);
    }

    #[test]
    fn mask_with_empty_segment_is_e5003() {
        let mut issues = IssueCollector::new();
        MaskingTypeProvider::new(EmptyTypeProvider, "M", &["a..b"], &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.all()[0].code, ErrorCode::E5003);
    }

    #[test]
    fn declaring_masked_variables_promotes_named_top_level_fields() {
        let mut pool = Pool::new();
        let mut env = Env::new();
        let mut issues = IssueCollector::new();
        let masking = MaskingTypeProvider::new(OneField, "M", &["a"], &mut issues);
        masking.declare_masked_variables(&mut pool, &mut env);
        assert_eq!(env.resolve_var("a"), Some(("a".to_string(), crate::ty::TypeId::INT)));
        assert_eq!(env.resolve_var("b"), None);
    }
}
