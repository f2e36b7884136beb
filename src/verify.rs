//! Static validation of a [`ServicePrototype`] without instantiating
//! anything.
//!
//! `VerifyPrototype` lets a consumer catch misconfiguration — an
//! uninstantiable class, a required injectable property with an unnameable
//! type, a required constructor parameter with no possible source — at
//! startup rather than on first resolution.

use crate::id::ClassId;
use crate::prototype::ServicePrototype;
use std::collections::HashMap;
use std::fmt;

/// One static defect found in a prototype.
#[derive(Debug, Clone)]
pub struct Violation {
    pub class: ClassId,
    pub member: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}: {}", self.class, self.member, self.reason)
    }
}

/// Validates prototypes against the same resolvability rules the resolver
/// will later enforce at resolution time, so the two never silently drift
/// apart. Holds no state of its own — unlike the analyzer/cache pair, there
/// is nothing here worth memoizing, since `validate` does not perform any
/// reflection, only consults the prototype it is given.
#[derive(Default)]
pub struct VerifyPrototype;

impl VerifyPrototype {
    pub fn new() -> Self {
        Self
    }

    /// Validate a single prototype, returning every violation found (empty
    /// if the prototype is sound).
    pub fn validate(&self, prototype: &ServicePrototype) -> Vec<Violation> {
        let mut violations = Vec::new();

        if !prototype.is_instantiable {
            violations.push(Violation {
                class: prototype.class,
                member: "<class>".to_string(),
                reason: "class is marked non-instantiable".to_string(),
            });
            return violations;
        }

        let Some(constructor) = &prototype.constructor else {
            violations.push(Violation {
                class: prototype.class,
                member: "<constructor>".to_string(),
                reason: "instantiable class has no constructor prototype".to_string(),
            });
            return violations;
        }

        for param in &constructor.parameters {
            if param.required() && param.type_name.is_none() {
                violations.push(Violation {
                    class: prototype.class,
                    member: param.name.clone(),
                    reason: "required parameter has no resolvable type, default, or null allowance"
                        .to_string(),
                });
            }
        }

        for property in &prototype.injected_properties {
            if property.is_required
                && property.type_name.is_none()
                && property.explicit_abstract.is_none()
                && !property.has_default
            {
                violations.push(Violation {
                    class: prototype.class,
                    member: property.name.clone(),
                    reason: "required injected property has no resolvable source".to_string(),
                });
            }
        }

        for method in &prototype.injected_methods {
            for param in &method.parameters {
                if param.required() && param.type_name.is_none() {
                    violations.push(Violation {
                        class: prototype.class,
                        member: format!("{}::{}", method.name, param.name),
                        reason: "required method parameter has no resolvable type".to_string(),
                    });
                }
            }
        }

        violations
    }

    /// Validate many prototypes at once, sorting each into `valid` or
    /// `invalid` rather than flattening every violation into one list — a
    /// caller needs to know *which* classes failed, not just how many
    /// things went wrong in total.
    pub fn validate_batch<'a>(
        &self,
        prototypes: impl IntoIterator<Item = &'a ServicePrototype>,
    ) -> BatchReport {
        let mut valid = Vec::new();
        let mut invalid = HashMap::new();

        for prototype in prototypes {
            let violations = self.validate(prototype);
            if violations.is_empty() {
                valid.push(prototype.class);
            } else {
                let reason = violations
                    .iter()
                    .map(|v| format!("{}: {}", v.member, v.reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                invalid.insert(prototype.class, reason);
            }
        }

        let summary = BatchSummary {
            total: valid.len() + invalid.len(),
            valid: valid.len(),
            invalid: invalid.len(),
        };
        BatchReport { valid, invalid, summary }
    }
}

/// The outcome of [`VerifyPrototype::validate_batch`]: which classes passed,
/// which failed and why, and aggregate counts over both.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub valid: Vec<ClassId>,
    pub invalid: HashMap<ClassId, String>,
    pub summary: BatchSummary,
}

/// Aggregate counts over a [`BatchReport`]. `total` is always `valid +
/// invalid`; kept as its own field so a consumer can report it without
/// re-deriving it from the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prototype::{MethodPrototype, ParameterPrototype, PropertyPrototype};

    #[test]
    fn trivial_prototype_has_no_violations() {
        let verifier = VerifyPrototype::new();
        let prototype = ServicePrototype::trivial(ClassId("Leaf"));
        assert!(verifier.validate(&prototype).is_empty());
    }

    #[test]
    fn uninstantiable_class_is_flagged() {
        let verifier = VerifyPrototype::new();
        let prototype = ServicePrototype::uninstantiable(ClassId("Interface"));
        let violations = verifier.validate(&prototype);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn required_parameter_without_type_is_flagged() {
        let verifier = VerifyPrototype::new();
        let mut prototype = ServicePrototype::trivial(ClassId("Widget"));
        prototype.constructor = Some(MethodPrototype::new(
            "new",
            vec![ParameterPrototype::required_named("db", "Database").untyped()],
        ));
        let violations = verifier.validate(&prototype);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].member, "db");
    }

    #[test]
    fn required_property_without_source_is_flagged() {
        let verifier = VerifyPrototype::new();
        let mut prototype = ServicePrototype::trivial(ClassId("Widget"));
        prototype.injected_properties.push(PropertyPrototype {
            name: "logger".to_string(),
            type_name: None,
            is_required: true,
            has_default: false,
            default: None,
            explicit_abstract: None,
        });
        assert_eq!(verifier.validate(&prototype).len(), 1);
    }

    #[test]
    fn validate_batch_sorts_valid_and_invalid() {
        let verifier = VerifyPrototype::new();
        let sound = ServicePrototype::trivial(ClassId("Leaf"));
        let unsound = ServicePrototype::uninstantiable(ClassId("Interface"));
        let report = verifier.validate_batch([&sound, &unsound]);

        assert_eq!(report.valid, vec![ClassId("Leaf")]);
        assert_eq!(report.invalid.len(), 1);
        assert!(report.invalid.contains_key(&ClassId("Interface")));
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.valid, 1);
        assert_eq!(report.summary.invalid, 1);
    }
}
