use proptest::prelude::*;
use propflat_core::optimizer::collapse_properties::append_prop_for_alias;
use propflat_core::NameForest;

fn escaped(prop: &str) -> String {
    prop.replace('$', "$0")
}

#[test]
fn prop_plain_properties_join_with_separator() {
    proptest!(|(root in "[a-z][a-z0-9]{0,6}", prop in "[a-zA-Z_][a-zA-Z0-9_]{0,6}")| {
        let forest = NameForest::new();
        prop_assert_eq!(append_prop_for_alias(&forest, &root, &prop), format!("{}${}", root, prop));
    });
}

#[test]
fn prop_escaped_suffix_recovers_property() {
    proptest!(|(root in "[a-z][a-z0-9$]{0,6}", prop in "[a-zA-Z0-9_$]{1,8}")| {
        let forest = NameForest::new();
        let alias = append_prop_for_alias(&forest, &root, &prop);

        let prefix = format!("{}$", root);
        prop_assert!(alias.starts_with(&prefix));
        let suffix = &alias[prefix.len()..];
        prop_assert_eq!(suffix.replace("$0", "$"), prop);
    });
}

#[test]
fn prop_aliases_skip_taken_names() {
    proptest!(|(root in "[a-z]{1,4}", prop in "[a-z$]{1,4}", taken in 0usize..5)| {
        let mut forest = NameForest::new();
        let base = format!("{}${}", root, escaped(&prop));
        if taken > 0 {
            forest.get_or_create(&base);
        }
        for id in 1..taken {
            forest.get_or_create(&format!("{}${}", base, id));
        }

        let alias = append_prop_for_alias(&forest, &root, &prop);

        prop_assert!(!forest.contains(&alias));
        if taken == 0 {
            prop_assert_eq!(alias, base);
        } else {
            prop_assert_eq!(alias, format!("{}${}", base, taken));
        }
    });
}

#[test]
fn test_collision_with_escaped_form() {
    let mut forest = NameForest::new();
    forest.get_or_create("a$$0el");

    assert_eq!(append_prop_for_alias(&forest, "a", "$el"), "a$$0el$1");
}
