use quill_core::{SceneSequel, SceneTransition, Story, classify, transitions};

fn scene(number: u32, pov: &str, location: &str, time_hours: f64) -> SceneSequel {
    SceneSequel {
        number,
        title: format!("Scene {number}"),
        content: "Words on the page.".to_string(),
        pov_character: pov.to_string(),
        location: location.to_string(),
        time_hours,
    }
}

#[test]
fn office_to_warehouse_sequence() {
    let story = Story::new(vec![
        scene(1, "Alice", "Office", 0.0),
        scene(2, "Bob", "Office", 0.5),
        scene(3, "Bob", "Warehouse", 1.0),
        scene(4, "Bob", "Warehouse", 5.0),
    ]);

    assert_eq!(
        transitions(&story),
        vec![
            SceneTransition::Ornamental,
            SceneTransition::Whitespace,
            SceneTransition::Whitespace,
        ]
    );
}

#[test]
fn pov_change_is_always_ornamental() {
    let locations = ["Office", "Warehouse"];
    let times = [0.0, 1.0, 2.0, 2.5, -10.0];
    for prev_location in locations {
        for next_location in locations {
            for prev_time in times {
                for next_time in times {
                    let prev = scene(1, "Alice", prev_location, prev_time);
                    let next = scene(2, "Bob", next_location, next_time);
                    assert_eq!(classify(&prev, &next), SceneTransition::Ornamental);
                }
            }
        }
    }
}

#[test]
fn classification_is_deterministic() {
    let prev = scene(1, "Alice", "Office", 0.0);
    let next = scene(2, "Alice", "Office", 2.0);
    let first = classify(&prev, &next);
    for _ in 0..10 {
        assert_eq!(classify(&prev, &next), first);
    }
    // Exactly two hours is not a gap.
    assert_eq!(first, SceneTransition::None);
}

#[test]
fn time_may_run_backwards() {
    let prev = scene(1, "Alice", "Office", 30.0);
    let next = scene(2, "Alice", "Office", 1.0);
    assert_eq!(classify(&prev, &next), SceneTransition::Whitespace);
}
