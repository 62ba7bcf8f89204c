//! Integration test: request skills -> tick -> serialize -> replay
//!
//! Validates the session contract end to end: recorded actions rebuild the
//! same state, failures roll back, and historical queries never leak into
//! the live session.

use proptest::prelude::*;
use rotation_core::prelude::*;
use rotation_core::config::ResourceOverride;
use rotation_core::types::EPSILON;
use std::sync::Arc;

const MINI_JOB: &str = r#"
[job]
id = "mini"
name = "Mini"

[[resources]]
name = "buff"
timeout = 15.0

[[resources]]
name = "charge"
timeout = 1.0

[[skills]]
name = "buff_up"
kind = "ability"
recast_time = 5.0
on_confirm = [{ type = "gain_status", resource = "buff" }]

[[skills]]
name = "charge_up"
kind = "ability"
recast_time = 1.0
on_confirm = [{ type = "gain_status", resource = "charge" }]

[[skills]]
name = "charged_bolt"
kind = "spell"
cast_time = 2.5
potency = 300
application_delay = 0.5
requirements = [{ type = "has_resource", resource = "charge" }]

[[skills]]
name = "jab"
kind = "weaponskill"
potency = 100
application_delay = 0.3

[[skills]]
name = "hit_a"
kind = "ability"
recast_time = 10.0
animation_lock = 0.0
potency = 100
application_delay = 0.5

[[skills]]
name = "hit_b"
kind = "ability"
recast_time = 10.0
animation_lock = 0.0
potency = 200
application_delay = 0.5
"#;

/// Demo-job session with default stats
fn demo_session(config: SessionConfig) -> Session {
    let catalog = Arc::new(JobCatalog::demo().unwrap());
    Session::new(catalog, "demo", config).unwrap()
}

fn mini_session() -> Session {
    let catalog = Arc::new(JobCatalog::from_toml(MINI_JOB).unwrap());
    Session::new(catalog, "mini", SessionConfig::default()).unwrap()
}

/// A short opener touching hardcasts, instants, procs and a dot
fn opener(session: &mut Session) {
    for skill in ["ignite", "bolt", "swiftcast", "surge", "fury", "bolt", "double_tap", "blaze"] {
        let _ = session.use_skill_asap(skill).unwrap();
    }
    session.tick(12.0).unwrap();
}

fn skill_order(session: &Session) -> Vec<(String, Option<usize>)> {
    session
        .engine()
        .potency_table()
        .iter()
        .map(|p| (p.description.clone(), p.node))
        .collect()
}

#[test]
fn test_exact_replay_is_deterministic() {
    let config = SessionConfig {
        proc_mode: ProcMode::Rng,
        random_seed: 42,
        ..Default::default()
    };
    let mut live = demo_session(config);
    opener(&mut live);
    let saved = live.serialize();

    let catalog = Arc::clone(live.catalog());
    let (first, _) = Session::load(Arc::clone(&catalog), "demo", saved.clone()).unwrap();
    let (second, _) = Session::load(catalog, "demo", saved).unwrap();

    assert_eq!(
        first.engine().snapshot().unwrap(),
        second.engine().snapshot().unwrap()
    );
    assert_eq!(first.record(), second.record());
    assert_eq!(skill_order(&first), skill_order(&live));
}

#[test]
fn test_json_round_trip() {
    let mut live = demo_session(SessionConfig::default());
    opener(&mut live);
    live.toggle_resource("ley_lines").unwrap();
    live.jump_to_timestamp(30.0).unwrap();

    let saved = live.serialize();
    let json = saved.to_json().unwrap();
    let parsed = SerializedRecord::from_json(&json).unwrap();
    assert_eq!(parsed, saved);

    let (reloaded, failure) = Session::load(Arc::clone(live.catalog()), "demo", parsed).unwrap();
    assert!(failure.is_none());
    assert_eq!(reloaded.serialize(), saved);
}

#[test]
fn test_hardcast_lands_after_snapshot_window() {
    let config = SessionConfig {
        spell_speed: 420.0,
        slidecast: SlidecastMode::Constant { window: 0.5 },
        ..Default::default()
    };
    let mut s = demo_session(config);
    let requested_at = s.engine().display_time();
    assert!(s.request_skill("surge").unwrap().is_ready());
    s.tick(5.0).unwrap();

    let applied = &s.engine().potency_table().entries()[0];
    let snapshot = applied.snapshot_time.unwrap();
    assert!((snapshot - (requested_at + 1.5)).abs() < EPSILON);
    assert!((applied.application_time.unwrap() - (requested_at + 1.5 + 0.6)).abs() < EPSILON);
}

#[test]
fn test_buff_refresh_restarts_timer() {
    let mut s = mini_session();
    let buff = s.catalog().resource_key("mini", "buff").unwrap();

    assert!(s.request_skill("buff_up").unwrap().is_ready());
    s.tick(10.0).unwrap();
    assert!((s.engine().time_till_ready(&buff).unwrap() - 5.0).abs() < 1e-6);

    assert!(s.request_skill("buff_up").unwrap().is_ready());
    assert!((s.engine().time_till_ready(&buff).unwrap() - 15.0).abs() < EPSILON);
}

#[test]
fn test_insufficient_mana_appends_nothing() {
    let config = SessionConfig {
        initial_resource_overrides: vec![ResourceOverride {
            resource: "mana".to_string(),
            stacks: 300.0,
            timer: None,
            enabled: true,
        }],
        ..Default::default()
    };
    let mut s = demo_session(config);
    let availability = s.request_skill("bolt").unwrap();
    match availability.status {
        SkillStatus::InsufficientResource { needed, available, .. } => {
            assert!((needed - 400.0).abs() < EPSILON);
            assert!((available - 300.0).abs() < EPSILON);
        }
        other => panic!("expected InsufficientResource, got {:?}", other),
    }
    assert!(s.record().is_empty());
}

#[test]
fn test_interrupted_cast_rolls_back() {
    let mut s = mini_session();
    assert!(s.request_skill("charge_up").unwrap().is_ready());
    s.tick(0.7).unwrap();
    assert!(s.request_skill("charged_bolt").unwrap().is_ready());
    assert_eq!(s.record().len(), 3);

    let err = s.tick(3.0).unwrap_err();
    let EngineError::Interrupted(interruption) = err else {
        panic!("expected an interruption, got {:?}", err);
    };
    assert_eq!(interruption.node, 2);
    assert_eq!(interruption.skill.name, "charged_bolt");
    assert!(interruption.to_string().contains("charge"));

    assert_eq!(s.record().len(), 2);
    assert!((s.engine().time() - 0.7).abs() < EPSILON);
    assert!(s.engine().potency_table().is_empty());
    assert!(s.engine().derived().get(2).is_none());
}

#[test]
fn test_try_add_line_rolls_back_on_failure() {
    let mut s = mini_session();
    s.request_skill("jab").unwrap();
    s.tick(1.0).unwrap();
    let before = s.serialize();
    let time_before = s.engine().time();

    let failure = s
        .try_add_line(&[ActionNode::skill("jab"), ActionNode::skill("charged_bolt")])
        .unwrap_err();
    assert_eq!(failure.node, ActionNode::skill("charged_bolt"));
    assert!(failure.reason.contains("charge"));

    assert_eq!(s.serialize(), before);
    assert!((s.engine().time() - time_before).abs() < EPSILON);
}

#[test]
fn test_try_add_line_selects_added_actions() {
    let mut s = mini_session();
    s.request_skill("jab").unwrap();
    let SkillStatus::Blocked { time_till_available: gcd } = s.skill_availability("jab").unwrap().status else {
        panic!("jab should be on the GCD right after use");
    };
    let line = [ActionNode::wait(100.0), ActionNode::skill("jab"), ActionNode::skill("jab")];
    s.try_add_line(&line).unwrap();

    let selection = s.record().selection().unwrap();
    assert_eq!(selection.start, 1);
    assert_eq!(selection.end, s.record().len());

    // Tight replay drops recorded waits and inserts exactly the blocked time
    let actions = s.record().actions();
    assert_eq!(actions.len(), 5);
    for (i, action) in actions.iter().enumerate() {
        match (i % 2, action) {
            (0, ActionNode::Skill { skill }) => assert_eq!(skill, "jab"),
            (1, ActionNode::Wait { duration }) => assert!((duration - gcd).abs() < EPSILON),
            _ => panic!("unexpected action {} at {}", action, i),
        }
    }

    // Each jab starts exactly one GCD after the previous one
    let start = |node: usize| s.engine().derived().get(node).unwrap().start_lock_time;
    assert!((start(2) - start(0) - gcd).abs() < EPSILON);
    assert!((start(4) - start(2) - gcd).abs() < EPSILON);
    assert!((s.engine().time() - 2.0 * gcd).abs() < EPSILON);
}

#[test]
fn test_same_instant_events_keep_enqueue_order() {
    let mut one_step = mini_session();
    let mut many_steps = mini_session();
    for s in [&mut one_step, &mut many_steps] {
        assert!(s.request_skill("hit_a").unwrap().is_ready());
        assert!(s.request_skill("hit_b").unwrap().is_ready());
    }

    one_step.tick(1.0).unwrap();
    for _ in 0..10 {
        many_steps.tick(0.1).unwrap();
    }

    let expected = vec![("hit_a".to_string(), Some(0)), ("hit_b".to_string(), Some(1))];
    assert_eq!(skill_order(&one_step), expected);
    assert_eq!(skill_order(&many_steps), expected);
}

#[test]
fn test_historical_state_is_idempotent_and_isolated() {
    let mut s = demo_session(SessionConfig::default());
    s.request_skill("lunge").unwrap();
    s.tick(10.0).unwrap();
    let live_before = s.engine().snapshot().unwrap();

    // lunge was used at display time -5 and lands 0.5s later
    let early = s.historical_state(-4.7).unwrap();
    assert!((early.display_time + 4.7).abs() < 1e-9);
    assert!(early.potencies.is_empty());
    assert_eq!(early.pending.len(), 1);

    let late = s.historical_state(-4.4).unwrap();
    assert_eq!(late.potencies.len(), 1);
    assert!(late.pending.is_empty());

    assert_eq!(s.historical_state(-4.7).unwrap(), early);
    assert_eq!(s.engine().snapshot().unwrap(), live_before);
}

#[test]
fn test_load_reports_failing_action() {
    let saved = SerializedRecord {
        config: SessionConfig::default(),
        actions: vec![ActionNode::skill("bolt"), ActionNode::skill("surge")],
        buff_markers: Vec::new(),
    };
    let catalog = Arc::new(JobCatalog::demo().unwrap());
    let (session, failure) = Session::load(catalog, "demo", saved).unwrap();
    let failure = failure.expect("surge is still blocked by bolt's cast");
    assert_eq!(failure.index, 1);
    assert_eq!(failure.node, ActionNode::skill("surge"));
    assert_eq!(session.record().actions(), &[ActionNode::skill("bolt")]);
}

#[test]
fn test_load_keeps_actions_before_the_failure() {
    let saved = SerializedRecord {
        config: SessionConfig::default(),
        actions: vec![
            ActionNode::skill("lunge"),
            ActionNode::wait(3.0),
            ActionNode::skill("blaze"),
            ActionNode::skill("lunge"),
        ],
        buff_markers: Vec::new(),
    };
    let catalog = Arc::new(JobCatalog::demo().unwrap());
    let (session, failure) = Session::load(catalog, "demo", saved).unwrap();

    let failure = failure.expect("blaze needs firestarter");
    assert_eq!(failure.index, 2);
    assert_eq!(failure.node, ActionNode::skill("blaze"));
    assert!(failure.reason.contains("firestarter"));

    assert_eq!(
        session.record().actions(),
        &[ActionNode::skill("lunge"), ActionNode::wait(3.0)]
    );
    assert!((session.engine().time() - 3.0).abs() < EPSILON);
    assert_eq!(session.damage_summary().by_skill["lunge"].hits, 1);
}

#[test]
fn test_wait_for_mana_replays_to_the_same_tick() {
    let mut live = demo_session(SessionConfig::default());
    live.request_skill("bolt").unwrap();
    live.wait_for_mana().unwrap();
    live.wait_for_mana().unwrap();
    let saved = live.serialize();
    assert_eq!(saved.actions.last(), Some(&ActionNode::WaitForMana));

    let (loaded, failure) = Session::load(Arc::clone(live.catalog()), "demo", saved).unwrap();
    assert!(failure.is_none());
    assert!((loaded.engine().time() - live.engine().time()).abs() < EPSILON);
    assert_eq!(loaded.engine().snapshot().unwrap(), live.engine().snapshot().unwrap());
}

#[test]
fn test_party_buff_raises_reported_damage() {
    let mut plain = demo_session(SessionConfig::default());
    let mut buffed = demo_session(SessionConfig::default());
    buffed.add_buff_marker(BuffMarker {
        name: "divination".to_string(),
        start_time: -10.0,
        duration: 20.0,
        modifier: rotation_core::ModifierKind::Multiplier { factor: 1.06 },
    });

    for s in [&mut plain, &mut buffed] {
        s.request_skill("lunge").unwrap();
        s.tick(1.0).unwrap();
    }
    let plain_total = plain.damage_summary().total_applied;
    let buffed_total = buffed.damage_summary().total_applied;
    assert!((buffed_total - plain_total * 1.06).abs() < 1e-6);

    let applied: Vec<f64> = buffed
        .drain_reports()
        .into_iter()
        .filter_map(|r| match r {
            SimReport::DamageApplied { potency, .. } => Some(potency),
            _ => None,
        })
        .collect();
    assert_eq!(applied.len(), 1);
    assert!((applied[0] - buffed_total).abs() < 1e-9);
}

#[derive(Debug, Clone)]
enum Op {
    Tick(f64),
    Use(usize),
    Toggle,
}

const DEMO_SKILLS: [&str; 13] = [
    "bolt", "surge", "ignite", "flare", "blaze", "lunge", "swiftcast", "fury", "focus",
    "ley_lines", "double_tap", "finisher", "manafont",
];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.0f64..6.0).prop_map(Op::Tick),
        5 => (0..DEMO_SKILLS.len()).prop_map(Op::Use),
        1 => Just(Op::Toggle),
    ]
}

fn run_ops(s: &mut Session, ops: &[Op]) -> f64 {
    let mut requested = 0.0;
    for op in ops {
        match op {
            Op::Tick(delta) => {
                requested += delta;
                s.tick(*delta).unwrap();
            }
            Op::Use(i) => {
                s.request_skill(DEMO_SKILLS[*i]).unwrap();
            }
            Op::Toggle => {
                s.toggle_resource("ley_lines").unwrap();
            }
        }
    }
    requested
}

fn rng_config(seed: u64) -> SessionConfig {
    SessionConfig {
        proc_mode: ProcMode::Rng,
        random_seed: seed,
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn prop_time_is_monotonic_and_bounded(
        ops in prop::collection::vec(op_strategy(), 1..40),
        seed in any::<u64>(),
    ) {
        let mut s = demo_session(rng_config(seed));
        let mut requested = 0.0;
        let mut last = s.engine().time();
        for op in &ops {
            requested += run_ops(&mut s, std::slice::from_ref(op));
            let now = s.engine().time();
            prop_assert!(now + EPSILON >= last);
            prop_assert!(now <= requested + 1e-6);
            last = now;
        }
    }

    #[test]
    fn prop_resources_stay_in_bounds(
        ops in prop::collection::vec(op_strategy(), 1..40),
        seed in any::<u64>(),
    ) {
        let mut s = demo_session(rng_config(seed));
        for op in &ops {
            run_ops(&mut s, std::slice::from_ref(op));
            for rsc in s.engine().resources().iter() {
                prop_assert!(rsc.current_value() >= -EPSILON, "{} below zero", rsc.key);
                prop_assert!(rsc.current_value() <= rsc.max_value() + EPSILON, "{} above max", rsc.key);
            }
        }
    }

    #[test]
    fn prop_replay_is_deterministic(
        ops in prop::collection::vec(op_strategy(), 1..30),
        seed in any::<u64>(),
    ) {
        let mut live = demo_session(rng_config(seed));
        run_ops(&mut live, &ops);
        let saved = live.serialize();

        let json = saved.to_json().unwrap();
        prop_assert_eq!(&SerializedRecord::from_json(&json).unwrap(), &saved);

        let catalog = Arc::clone(live.catalog());
        let (a, _) = Session::load(Arc::clone(&catalog), "demo", saved.clone()).unwrap();
        let (b, _) = Session::load(catalog, "demo", saved).unwrap();
        prop_assert_eq!(a.engine().snapshot().unwrap(), b.engine().snapshot().unwrap());
    }
}
