//! Exported identifier translation

/// PascalCase / camelCase to snake_case.
///
/// An underscore goes before every uppercase letter except the first
/// character, then everything is lowercased. Existing underscores are kept.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Final segment of a qualified name, without generic arguments
pub(crate) fn last_segment(qualified: &str) -> &str {
    let base = match qualified.find('<') {
        Some(pos) => &qualified[..pos],
        None => qualified,
    };
    let base = base.trim_end_matches("::");
    let tail = base.rsplit("::").next().unwrap_or(base);
    let tail = tail.rsplit('.').next().unwrap_or(tail);
    if tail == "{{closure}}" {
        "closure"
    } else {
        tail
    }
}

/// Item a closure is defined in, when `qualified` names a closure.
fn closure_owner(qualified: &str) -> Option<&str> {
    let mut rest = qualified.strip_suffix("::{{closure}}")?;
    while let Some(outer) = rest.strip_suffix("::{{closure}}") {
        rest = outer;
    }
    Some(last_segment(rest)).filter(|owner| !owner.is_empty())
}

/// Runtime-visible name of an exported item
pub(crate) fn exposed_name(declared: &str) -> String {
    to_snake_case(last_segment(declared))
}

/// Runtime-visible name for an export called `name`, falling back to the
/// compiler name `declared` when `name` is empty.
///
/// Unnamed closures become `<owner>_closure_<n>` with the lowest `n` that
/// `taken` does not report.
pub(crate) fn derive_exposed(name: &str, declared: &str, taken: impl Fn(&str) -> bool) -> String {
    if !name.is_empty() {
        return exposed_name(name);
    }
    let base = match closure_owner(declared) {
        Some(owner) => format!("{}_closure", to_snake_case(owner)),
        None if declared.ends_with("{{closure}}") => "closure".to_string(),
        None => return exposed_name(declared),
    };
    (0..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("X"), "x");
        assert_eq!(to_snake_case("Point"), "point");
        assert_eq!(to_snake_case("MoveBy"), "move_by");
        assert_eq!(to_snake_case("area"), "area");
        assert_eq!(to_snake_case("HTTPServer"), "h_t_t_p_server");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("geometry::shapes::make_point"), "make_point");
        assert_eq!(last_segment("pkg.Sum"), "Sum");
        assert_eq!(last_segment("Vec<alloc::string::String>"), "Vec");
        assert_eq!(last_segment("tests::build::{{closure}}"), "closure");
        assert_eq!(last_segment("plain"), "plain");
    }

    #[test]
    fn test_exposed_name() {
        assert_eq!(exposed_name("crate::math::AddAll"), "add_all");
        assert_eq!(exposed_name("main.NewPoint"), "new_point");
    }

    #[test]
    fn test_closure_owner() {
        assert_eq!(closure_owner("tests::build::{{closure}}"), Some("build"));
        assert_eq!(closure_owner("app::Setup::{{closure}}::{{closure}}"), Some("Setup"));
        assert_eq!(closure_owner("app::wrap<i32>::{{closure}}"), Some("wrap"));
        assert_eq!(closure_owner("app::build"), None);
    }

    #[test]
    fn test_derive_exposed() {
        let never = |_: &str| false;
        assert_eq!(derive_exposed("AddAll", "app::other", never), "add_all");
        assert_eq!(derive_exposed("", "app::math::AddAll", never), "add_all");
        assert_eq!(derive_exposed("", "app::Setup::{{closure}}", never), "setup_closure_0");

        let taken = |n: &str| n == "build_closure_0" || n == "build_closure_1";
        assert_eq!(derive_exposed("", "app::build::{{closure}}", taken), "build_closure_2");
    }
}
