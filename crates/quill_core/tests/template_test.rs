use quill_core::{Act, OutlineTemplate, TemplateLibrary, validate_acts};
use strum::IntoEnumIterator;

fn assert_levels_sum_to_one(acts: &[Act]) {
    let sum: f64 = acts.iter().map(|a| a.fraction).sum();
    assert!((sum - 1.0).abs() <= 1e-3, "level sums to {sum}");
    for act in acts {
        if !act.children.is_empty() {
            assert_levels_sum_to_one(&act.children);
        }
    }
}

#[test]
fn every_builtin_template_validates() {
    for template in OutlineTemplate::iter() {
        let acts = template.acts();
        assert!(validate_acts(&acts).is_ok(), "{template} failed validation");
        assert_levels_sum_to_one(&acts);
    }
}

#[test]
fn builtin_positions_follow_order() {
    for template in OutlineTemplate::iter() {
        for (idx, act) in template.acts().iter().enumerate() {
            assert_eq!(act.position as usize, idx);
        }
    }
}

#[test]
fn retrievals_are_independent() {
    let library = TemplateLibrary::new();
    let mut first = library.get("heros_journey").unwrap();
    first[1].children[0].fraction = 0.9;
    first.pop();

    let second = library.get("heros_journey").unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(second[1].children[0].fraction, 0.25);
}

#[test]
fn custom_templates_are_cloned_on_retrieval() {
    let mut library = TemplateLibrary::new();
    library
        .register(
            "two_part",
            vec![Act::new("Before", "", 0.4), Act::new("After", "", 0.6)],
        )
        .unwrap();

    let mut copy = library.get("two_part").unwrap();
    copy[0].title = "Changed".to_string();

    let fresh = library.get("two_part").unwrap();
    assert_eq!(fresh[0].title, "Before");
    assert_eq!(fresh[1].position, 1);
    assert!(library.names().contains(&"two_part".to_string()));
}

#[test]
fn invalid_custom_template_is_rejected() {
    let mut library = TemplateLibrary::new();
    let result = library.register("broken", vec![Act::new("Only", "", 0.5)]);
    assert!(result.is_err());
    assert!(library.get("broken").is_none());
}

#[test]
fn unknown_template_is_none() {
    assert!(TemplateLibrary::new().get("five_act_opera").is_none());
}
