//! 端到端场景：谱系网、选择、并发、循环截断、界限与事件上限，
//! 以及对每个产出前缀统一检查的结构不变量。
use petgraph::algo::is_cyclic_directed;
use rustc_hash::FxHashMap;

use pt_unfolding::net::{Idx, IndexVec, Marking, Net, Place, PlaceId, Transition, TransitionId};
use pt_unfolding::unfolding::{BpNode, Termination, Unfolding, UnfoldingSetup};

/// a -> T -> b -> U -> c
fn sequence_net() -> Net {
    let mut net = Net::empty();
    let a = net.add_place(Place::with_tokens("a", 1));
    let b = net.add_place(Place::new("b"));
    let c = net.add_place(Place::new("c"));
    let t = net.add_transition(Transition::new("T"));
    let u = net.add_transition(Transition::new("U"));
    net.set_input_weight(a, t, 1);
    net.set_output_weight(b, t, 1);
    net.set_input_weight(b, u, 1);
    net.set_output_weight(c, u, 1);
    net
}

/// a -> T -> b, a -> U -> c
fn choice_net() -> Net {
    let mut net = Net::empty();
    let a = net.add_place(Place::with_tokens("a", 1));
    let b = net.add_place(Place::new("b"));
    let c = net.add_place(Place::new("c"));
    let t = net.add_transition(Transition::new("T"));
    let u = net.add_transition(Transition::new("U"));
    net.set_input_weight(a, t, 1);
    net.set_output_weight(b, t, 1);
    net.set_input_weight(a, u, 1);
    net.set_output_weight(c, u, 1);
    net
}

/// a -> T -> {b, c}, b -> U -> d, c -> V -> e
fn fork_net() -> Net {
    let mut net = Net::empty();
    let a = net.add_place(Place::with_tokens("a", 1));
    let b = net.add_place(Place::new("b"));
    let c = net.add_place(Place::new("c"));
    let d = net.add_place(Place::new("d"));
    let e = net.add_place(Place::new("e"));
    let t = net.add_transition(Transition::new("T"));
    let u = net.add_transition(Transition::new("U"));
    let v = net.add_transition(Transition::new("V"));
    net.set_input_weight(a, t, 1);
    net.set_output_weight(b, t, 1);
    net.set_output_weight(c, t, 1);
    net.set_input_weight(b, u, 1);
    net.set_output_weight(d, u, 1);
    net.set_input_weight(c, v, 1);
    net.set_output_weight(e, v, 1);
    net
}

/// p -> T -> q, q -> U -> p （producer cycle）
fn cycle_net() -> Net {
    let mut net = Net::empty();
    let p = net.add_place(Place::with_tokens("p", 1));
    let q = net.add_place(Place::new("q"));
    let t = net.add_transition(Transition::new("T"));
    let u = net.add_transition(Transition::new("U"));
    net.set_input_weight(p, t, 1);
    net.set_output_weight(q, t, 1);
    net.set_input_weight(q, u, 1);
    net.set_output_weight(p, u, 1);
    net
}

/// p -> T -> {q, s}, q -> U -> p：每圈向 s 注入一个 token。
fn sink_cycle_net() -> Net {
    let mut net = Net::empty();
    let p = net.add_place(Place::with_tokens("p", 1));
    let q = net.add_place(Place::new("q"));
    let s = net.add_place(Place::new("s"));
    let t = net.add_transition(Transition::new("T"));
    let u = net.add_transition(Transition::new("U"));
    net.set_input_weight(p, t, 1);
    net.set_output_weight(q, t, 1);
    net.set_output_weight(s, t, 1);
    net.set_input_weight(q, u, 1);
    net.set_output_weight(p, u, 1);
    net
}

/// p -> T -> {p, s}：活而无界的生产者。
fn live_unbounded_net() -> Net {
    let mut net = Net::empty();
    let p = net.add_place(Place::with_tokens("p", 1));
    let s = net.add_place(Place::new("s"));
    let t = net.add_transition(Transition::new("T"));
    net.set_input_weight(p, t, 1);
    net.set_output_weight(p, t, 1);
    net.set_output_weight(s, t, 1);
    net
}

/// 对任意产出前缀都必须成立的结构不变量。
fn assert_prefix_invariants(net: &Net, unfolding: &Unfolding<'_>) {
    // acyclicity of the flow graph, checked on the projection
    let view = unfolding.occurrence_net();
    assert!(!is_cyclic_directed(view.graph()));

    // place fidelity of presets and postsets
    for event in unfolding.events() {
        let payload = unfolding.event(event);
        let mut pre_places: Vec<PlaceId> = payload
            .pre_conditions
            .iter()
            .map(|c| unfolding.condition(c).place)
            .collect();
        pre_places.sort_unstable();
        assert_eq!(pre_places, net.preset(payload.transition).to_vec());

        let mut post_places: Vec<PlaceId> = payload
            .post_conditions
            .iter()
            .map(|c| unfolding.condition(c).place)
            .collect();
        post_places.sort_unstable();
        assert_eq!(post_places, net.postset(payload.transition).to_vec());
    }

    // every non-initial condition is a post-condition of its pre-event, and
    // post-events back-reference their presets
    for condition in unfolding.conditions() {
        let payload = unfolding.condition(condition);
        if let Some(event) = payload.pre_event {
            assert!(unfolding.event(event).post_conditions.contains(condition));
        }
        for &event in &payload.post_events {
            assert!(unfolding.event(event).pre_conditions.contains(condition));
        }
    }

    // no two events share transition and preset
    let mut seen = std::collections::HashSet::new();
    for event in unfolding.events() {
        let payload = unfolding.event(event);
        let key = (
            payload.transition,
            payload.pre_conditions.iter().collect::<Vec<_>>(),
        );
        assert!(seen.insert(key), "duplicate event detected");
    }

    // relations partition every node pair
    let nodes: Vec<BpNode> = unfolding
        .conditions()
        .map(BpNode::from)
        .chain(unfolding.events().map(BpNode::from))
        .collect();
    for &n1 in &nodes {
        for &n2 in &nodes {
            if n1 == n2 {
                assert!(unfolding.are_concurrent(n1, n2));
                continue;
            }
            let held = [
                unfolding.are_causal(n1, n2),
                unfolding.are_inverse_causal(n1, n2),
                unfolding.are_concurrent(n1, n2),
                unfolding.are_in_conflict(n1, n2),
            ];
            assert_eq!(held.iter().filter(|flag| **flag).count(), 1);
        }
    }

    // cutoff monotonicity
    for cutoff in unfolding.cutoff_events() {
        let corresponding = unfolding.corresponding_event(cutoff).unwrap();
        assert_eq!(
            unfolding.reached_marking(cutoff),
            unfolding.reached_marking(corresponding)
        );
        assert!(unfolding.setup().order.is_smaller(
            unfolding.local_configuration(corresponding),
            unfolding.local_configuration(cutoff),
        ));
    }
}

/// 每个割的库所多重集必须等于原网的某个可达标识。
fn assert_cuts_reachable(net: &Net, unfolding: &Unfolding<'_>, state_limit: Option<usize>) {
    let graph = net.reachability_graph(state_limit);
    for cut in unfolding.cuts() {
        let mut tokens = vec![0u64; net.places_len()];
        for condition in cut.iter() {
            tokens[unfolding.condition(condition).place.index()] += 1;
        }
        let marking = Marking::new(IndexVec::from(tokens));
        assert!(
            graph.contains_marking(&marking),
            "cut marking {:?} is not reachable",
            marking
        );
    }
}

fn both_variants(net: &Net) -> Vec<Unfolding<'_>> {
    vec![
        Unfolding::build(net, UnfoldingSetup::default()),
        Unfolding::build(net, UnfoldingSetup::default().with_safe_optimization(true)),
    ]
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn sequence_scenario() {
    init_logging();
    let net = sequence_net();
    for unfolding in both_variants(&net) {
        assert!(unfolding.is_complete());
        assert_eq!(unfolding.num_conditions(), 3);
        assert_eq!(unfolding.num_events(), 2);
        assert_eq!(unfolding.cutoff_events().count(), 0);
        assert_prefix_invariants(&net, &unfolding);
    }
    assert_cuts_reachable(&net, &Unfolding::build(&net, UnfoldingSetup::default()), None);
}

#[test]
fn choice_scenario() {
    let net = choice_net();
    for unfolding in both_variants(&net) {
        assert!(unfolding.is_complete());
        assert_eq!(unfolding.num_conditions(), 3);
        assert_eq!(unfolding.num_events(), 2);

        let t0 = unfolding.events_of_transition(TransitionId::new(0))[0];
        let u0 = unfolding.events_of_transition(TransitionId::new(1))[0];
        let b0 = unfolding.conditions_of_place(PlaceId::new(1))[0];
        let c0 = unfolding.conditions_of_place(PlaceId::new(2))[0];
        assert!(unfolding.are_in_conflict(t0, u0));
        assert!(unfolding.are_in_conflict(b0, c0));
        assert!(unfolding.are_in_conflict(b0, u0));
        assert!(unfolding.are_in_conflict(c0, t0));
        assert_prefix_invariants(&net, &unfolding);
    }
    assert_cuts_reachable(&net, &Unfolding::build(&net, UnfoldingSetup::default()), None);
}

#[test]
fn concurrency_scenario() {
    let net = fork_net();
    for unfolding in both_variants(&net) {
        assert!(unfolding.is_complete());
        assert_eq!(unfolding.num_events(), 3);

        let u0 = unfolding.events_of_transition(TransitionId::new(1))[0];
        let v0 = unfolding.events_of_transition(TransitionId::new(2))[0];
        let b0 = unfolding.conditions_of_place(PlaceId::new(1))[0];
        let c0 = unfolding.conditions_of_place(PlaceId::new(2))[0];
        let d0 = unfolding.conditions_of_place(PlaceId::new(3))[0];
        let e0 = unfolding.conditions_of_place(PlaceId::new(4))[0];
        assert!(unfolding.are_concurrent(u0, v0));
        assert!(unfolding.are_concurrent(b0, c0));
        assert!(unfolding.are_concurrent(d0, e0));
        assert_prefix_invariants(&net, &unfolding);
    }
    assert_cuts_reachable(&net, &Unfolding::build(&net, UnfoldingSetup::default()), None);
}

#[test]
fn producer_cycle_cutoff_scenario() {
    let net = cycle_net();
    for unfolding in both_variants(&net) {
        assert!(unfolding.is_complete());
        assert_eq!(unfolding.num_events(), 3);

        let t_occurrences = unfolding.events_of_transition(TransitionId::new(0));
        assert_eq!(t_occurrences.len(), 2);
        assert!(unfolding.is_cutoff(t_occurrences[1]));
        assert_eq!(
            unfolding.corresponding_event(t_occurrences[1]),
            Some(t_occurrences[0])
        );
        assert_prefix_invariants(&net, &unfolding);
    }
    assert_cuts_reachable(&net, &Unfolding::build(&net, UnfoldingSetup::default()), None);
}

#[test]
fn bound_limit_scenario() {
    let net = sink_cycle_net();
    let unfolding = Unfolding::build(&net, UnfoldingSetup::default().with_max_bound(2));

    let sink = PlaceId::new(2);
    assert_eq!(unfolding.termination(), Termination::BoundExceeded(sink));

    // every admitted cut respects the bound
    for cut in unfolding.cuts() {
        let mut per_place: FxHashMap<PlaceId, u64> = FxHashMap::default();
        for condition in cut.iter() {
            *per_place
                .entry(unfolding.condition(condition).place)
                .or_insert(0) += 1;
        }
        assert!(per_place.values().all(|count| *count <= 2));
    }

    assert_prefix_invariants(&net, &unfolding);
    assert_cuts_reachable(&net, &unfolding, Some(64));
}

#[test]
fn event_cap_scenario() {
    let net = live_unbounded_net();
    let unfolding = Unfolding::build(
        &net,
        UnfoldingSetup::default()
            .with_safe_optimization(true)
            .with_max_events(10),
    );

    assert_eq!(unfolding.termination(), Termination::EventLimitReached);
    assert_eq!(unfolding.num_events(), 10);
    assert_eq!(unfolding.cutoff_events().count(), 0);
    assert_prefix_invariants(&net, &unfolding);
}

#[test]
fn blank_initial_marking_gives_empty_prefix() {
    let mut net = Net::empty();
    let a = net.add_place(Place::new("a"));
    let b = net.add_place(Place::new("b"));
    let t = net.add_transition(Transition::new("T"));
    net.set_input_weight(a, t, 1);
    net.set_output_weight(b, t, 1);

    for unfolding in both_variants(&net) {
        assert_eq!(unfolding.termination(), Termination::InvalidInput);
        assert_eq!(unfolding.num_conditions(), 0);
        assert_eq!(unfolding.num_events(), 0);
    }
}

#[test]
fn relation_laws_hold() {
    let net = fork_net();
    let unfolding = Unfolding::build(&net, UnfoldingSetup::default());
    let nodes: Vec<BpNode> = unfolding
        .conditions()
        .map(BpNode::from)
        .chain(unfolding.events().map(BpNode::from))
        .collect();

    for &n1 in &nodes {
        for &n2 in &nodes {
            assert_eq!(
                unfolding.are_concurrent(n1, n2),
                unfolding.are_concurrent(n2, n1)
            );
            assert_eq!(
                unfolding.are_in_conflict(n1, n2),
                unfolding.are_in_conflict(n2, n1)
            );
            assert_eq!(
                unfolding.are_causal(n1, n2),
                unfolding.are_inverse_causal(n2, n1)
            );
            // memoized queries stay stable
            assert_eq!(
                unfolding.are_concurrent(n1, n2),
                unfolding.are_concurrent(n1, n2)
            );
        }
    }
}

#[test]
fn occurrence_net_round_trip() {
    let net = cycle_net();
    let unfolding = Unfolding::build(&net, UnfoldingSetup::default());
    let view = unfolding.occurrence_net();

    let mut place_labels: Vec<&str> = unfolding
        .conditions()
        .map(|c| net.place(unfolding.condition(c).place).name.as_str())
        .collect();
    place_labels.sort_unstable();

    let mut view_labels: Vec<&str> = view
        .graph()
        .node_indices()
        .filter(|n| view.condition_of_node(*n).is_some())
        .map(|n| view.graph()[n].label())
        .collect();
    view_labels.sort_unstable();

    assert_eq!(place_labels, view_labels);
    assert_eq!(
        view.graph().node_count(),
        unfolding.num_conditions() + unfolding.num_events()
    );
}
