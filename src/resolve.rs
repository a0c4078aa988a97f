//! Type descriptor resolution.
//!
//! Resolution turns a declared member type, which may mention the enclosing
//! definition's generic parameters, into a concrete [`TypeRef`] plus the
//! parameter bindings that apply to that type's own members.

use crate::error::FixtureError;
use fixture_core::{TypeBindings, TypeCatalog, TypeRef};

/// A concrete type together with the bindings its members see.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub ty: TypeRef,
    pub bindings: TypeBindings,
}

/// Resolve `ty` in a context where `inherited` binds the enclosing parameters.
pub fn resolve(
    catalog: &TypeCatalog,
    ty: &TypeRef,
    inherited: &TypeBindings,
) -> Result<ResolvedType, FixtureError> {
    let concrete = substitute(catalog, ty, inherited)?;
    let bindings = own_bindings(catalog, &concrete);
    Ok(ResolvedType {
        ty: concrete,
        bindings,
    })
}

fn substitute(
    catalog: &TypeCatalog,
    ty: &TypeRef,
    bindings: &TypeBindings,
) -> Result<TypeRef, FixtureError> {
    let resolved = match ty {
        TypeRef::Leaf(_) => ty.clone(),
        TypeRef::Seq { kind, element } => TypeRef::Seq {
            kind: *kind,
            element: Box::new(substitute(catalog, element, bindings)?),
        },
        TypeRef::Map { key, value } => TypeRef::map(
            substitute(catalog, key, bindings)?,
            substitute(catalog, value, bindings)?,
        ),
        TypeRef::Option(inner) => TypeRef::option(substitute(catalog, inner, bindings)?),
        TypeRef::Named { name, args } => {
            let def = catalog.get(name).ok_or_else(|| FixtureError::TypeResolution {
                type_name: ty.to_string(),
                reason: format!("type '{name}' is not defined"),
            })?;
            if args.is_empty() && !def.params.is_empty() {
                return Err(FixtureError::TypeResolution {
                    type_name: ty.to_string(),
                    reason: format!(
                        "raw use of generic type; expected parameters <{}>",
                        def.params.join(", ")
                    ),
                });
            }
            if args.len() != def.params.len() {
                return Err(FixtureError::TypeResolution {
                    type_name: ty.to_string(),
                    reason: format!(
                        "expected {} type argument(s), got {}",
                        def.params.len(),
                        args.len()
                    ),
                });
            }
            let args = args
                .iter()
                .map(|arg| substitute(catalog, arg, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            TypeRef::named(name.clone(), args)
        }
        TypeRef::Param(name) => {
            bindings
                .get(name)
                .cloned()
                .ok_or_else(|| FixtureError::TypeResolution {
                    type_name: name.clone(),
                    reason: "unbound type parameter".to_string(),
                })?
        }
        TypeRef::Wildcard { bound } => match bound {
            Some(bound) => substitute(catalog, bound, bindings)?,
            None => {
                return Err(FixtureError::TypeResolution {
                    type_name: ty.to_string(),
                    reason: "wildcard has no bound to infer from".to_string(),
                })
            }
        },
    };
    Ok(resolved)
}

/// Bindings for the members of an already concrete type.
fn own_bindings(catalog: &TypeCatalog, ty: &TypeRef) -> TypeBindings {
    let mut bindings = TypeBindings::new();
    match ty {
        TypeRef::Seq { element, .. } => {
            bindings.insert("E".to_string(), (**element).clone());
        }
        TypeRef::Map { key, value } => {
            bindings.insert("K".to_string(), (**key).clone());
            bindings.insert("V".to_string(), (**value).clone());
        }
        TypeRef::Option(inner) => {
            bindings.insert("T".to_string(), (**inner).clone());
        }
        TypeRef::Named { name, args } => {
            if let Some(def) = catalog.get(name) {
                bindings.extend(def.params.iter().cloned().zip(args.iter().cloned()));
            }
        }
        TypeRef::Leaf(_) | TypeRef::Param(_) | TypeRef::Wildcard { .. } => {}
    }
    bindings
}
