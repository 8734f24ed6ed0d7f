use super::test_prelude::*;

fn leaf(heap: &Heap, gen: usize, value: usize) -> ObjectReference {
    alloc_closure(heap, gen, constr_info("Leaf", 0, 1), &[], &[value])
}

#[test]
fn entries_stay_only_while_they_point_younger() {
    let heap = test_heap(3);
    let mut caps = single_cap(&heap);
    let pair = constr_info("Pair", 1, 0);

    // Generation 2 variable to a nursery object: still young afterwards, retained.
    let v2 = alloc_mut_var(&heap, 2, ObjectReference::NULL);
    memory_manager::mut_var_write(&mut caps[0], v2, leaf(&heap, 0, 1));
    // Generation 1 variable to a nursery object: promoted into generation 1, dropped.
    let v1 = alloc_mut_var(&heap, 1, ObjectReference::NULL);
    memory_manager::mut_var_write(&mut caps[0], v1, leaf(&heap, 0, 2));
    // An immutable object is promoted eagerly, so it is dropped too.
    let k2 = alloc_closure(&heap, 2, pair, &[leaf(&heap, 0, 3)], &[]);
    caps[0].record_mutable(k2);
    assert_eq!(kind_of(v2), ClosureKind::MutVarDirty);

    let stats = collect_n(&heap, 0, &mut [], &mut caps, 1);

    assert_eq!(stats.mut_list_entries, 3);
    assert_eq!(stats.mut_list_retained, 1);
    assert_eq!(caps[0].mut_list(2).as_slice(), &[v2]);
    assert!(caps[0].mut_list(1).is_empty());
    assert_eq!(kind_of(v2), ClosureKind::MutVarDirty);
    assert_eq!(kind_of(v1), ClosureKind::MutVarClean);
    assert_eq!(heap.generation_of(field_ref(v2, 0)), 1);
    assert_eq!(heap.generation_of(field_ref(v1, 0)), 1);
    assert_eq!(heap.generation_of(field_ref(k2, 0)), 2);
    assert_eq!(field_word(field_ref(k2, 0), 0), 3);

    // Collecting generation 1 moves the referent of v2 up, and the entry goes away.
    let stats = collect_n(&heap, 1, &mut [], &mut caps, 1);

    assert_eq!(stats.mut_list_entries, 1);
    assert_eq!(stats.mut_list_retained, 0);
    assert!(caps[0].mut_list(2).is_empty());
    assert_eq!(kind_of(v2), ClosureKind::MutVarClean);
    assert_eq!(heap.generation_of(field_ref(v2, 0)), 2);
    assert_eq!(field_word(field_ref(v2, 0), 0), 1);
}

#[test]
fn collected_generations_lose_their_remembered_sets() {
    let heap = test_heap(3);
    let mut caps = single_cap(&heap);
    let v1 = alloc_mut_var(&heap, 1, ObjectReference::NULL);
    memory_manager::mut_var_write(&mut caps[0], v1, leaf(&heap, 0, 1));
    let mut roots = [v1];

    let stats = collect_n(&heap, 1, &mut roots, &mut caps, 1);

    assert_eq!(stats.mut_list_entries, 0);
    assert!(caps[0].mut_list(1).is_empty());
    // The copy lands in generation 2 but its referent, traced without eager promotion, only
    // reaches generation 1: the copy is remembered afresh.
    let v1 = roots[0];
    assert_eq!(heap.generation_of(v1), 2);
    assert_eq!(heap.generation_of(field_ref(v1, 0)), 1);
    assert_eq!(kind_of(v1), ClosureKind::MutVarDirty);
    assert_eq!(caps[0].mut_list(2).as_slice(), &[v1]);
    memory_manager::verify_heap(&heap);
}

#[test]
fn every_capability_is_traced() {
    let heap = test_heap(2);
    let mut caps: Vec<Capability> = (0..3).map(|no| Capability::new(no, 2)).collect();
    let vars: Vec<ObjectReference> = (0..3)
        .map(|i| {
            let var = alloc_mut_var(&heap, 1, ObjectReference::NULL);
            memory_manager::mut_var_write(&mut caps[i], var, leaf(&heap, 0, i));
            var
        })
        .collect();

    let stats = collect_n(&heap, 0, &mut [], &mut caps, 1);

    assert_eq!(stats.mut_list_entries, 3);
    for (i, var) in vars.into_iter().enumerate() {
        assert_eq!(field_word(field_ref(var, 0), 0), i);
        assert!(caps[i].mut_list(1).is_empty());
    }
}

#[test]
fn scavenge_one_reports_young_pointers() {
    let heap = test_heap(3);
    let pair = constr_info("Pair", 1, 0);
    let young = leaf(&heap, 0, 1);
    let holder = alloc_closure(&heap, 2, pair, &[young], &[]);
    let mut caps = single_cap(&heap);

    let collection = Collection::prepare(&heap, 0, &mut caps);
    let mut cx = collection.context();
    let retained = cx.scavenge_mutable_list(&[holder], 2);
    assert!(retained.is_empty());
    assert_eq!(heap.generation_of(field_ref(holder, 0)), 2);
    cx.set_evac_gen(2);
    // Forwarded into generation 2 already.
    assert!(!cx.scavenge_one(holder));
    cx.scavenge_loop();
    let remnant = cx.into_remnant();
    collection.finish(vec![remnant], &mut caps);
}
