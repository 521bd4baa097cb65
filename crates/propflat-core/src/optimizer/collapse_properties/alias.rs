use crate::namespace::NameForest;

/// Flat name for property `prop` of the name flattened to `root`.
///
/// A `$` inside the property is written as `$0`; `0` can't start an
/// identifier segment, so the escape never reads as a separator. When the
/// result is already a name in the forest, `$1`, `$2`, ... is appended
/// until it is not.
pub fn append_prop_for_alias(forest: &NameForest, root: &str, prop: &str) -> String {
    let prop = if prop.contains('$') {
        prop.replace('$', "$0")
    } else {
        prop.to_string()
    };
    let mut result = format!("{}${}", root, prop);
    let mut id = 1;
    while forest.contains(&result) {
        result = format!("{}${}${}", root, prop, id);
        id += 1;
    }
    result
}
