use super::test_prelude::*;

fn card_options(generations: usize) -> crate::Options {
    let mut options = test_options(generations);
    // Four elements per card.
    options.card_bits = 2;
    options
}

/// An old array of 40 young elements, as if stored before the last collection without the
/// barrier. Elements 9 and 29 are then written through the barrier, marking cards 2 and 7.
fn array_with_two_marked_cards(heap: &Heap, cap: &mut Capability, array_gen: usize) -> (ObjectReference, Vec<usize>) {
    let leaf = constr_info("Leaf", 0, 1);
    let elements: Vec<ObjectReference> = (0..40).map(|i| alloc_closure(heap, 0, leaf, &[], &[i])).collect();
    let array = alloc_mut_arr(heap, array_gen, &elements);
    let marked = |i: usize| alloc_closure(heap, 0, leaf, &[], &[1000 + i]);
    memory_manager::mut_arr_write(heap, cap, array, 9, marked(9));
    memory_manager::mut_arr_write(heap, cap, array, 29, marked(29));
    let raw = (0..40)
        .map(|i| closure::read_word(MutArrPtrs::new(array, 2).element(i)))
        .collect();
    (array, raw)
}

#[test]
fn only_marked_cards_are_traced() {
    let heap = Heap::new(card_options(2));
    let mut caps = single_cap(&heap);
    let (array, before) = array_with_two_marked_cards(&heap, &mut caps[0], 1);
    let arr = MutArrPtrs::new(array, 2);
    assert_eq!(arr.cards(), 10);
    assert!(arr.is_card_dirty(2) && arr.is_card_dirty(7));
    assert!(caps[0].mut_list(1).contains(array));
    assert_eq!(kind_of(array), ClosureKind::MutArrPtrsDirty);

    let stats = collect_n(&heap, 0, &mut [], &mut caps, 1);

    assert_eq!(stats.cards_scanned, 2);
    assert_eq!(stats.cards_skipped, 8);
    for card in 0..arr.cards() {
        let traced = card == 2 || card == 7;
        for i in arr.card_elements(card) {
            let element = closure::read_ref(arr.element(i));
            if traced {
                assert_eq!(heap.generation_of(element), 1, "element {}", i);
                let expected = if i == 9 || i == 29 { 1000 + i } else { i };
                assert_eq!(field_word(element, 0), expected);
            } else {
                assert_eq!(element.value(), before[i], "element {} of a clean card moved", i);
            }
        }
        assert!(!arr.is_card_dirty(card));
    }
    assert_eq!(stats.objects_copied, 8);
    assert_eq!(kind_of(array), ClosureKind::MutArrPtrsClean);
    assert!(!caps[0].is_remembered(array));
}

#[test]
fn cards_with_young_pointers_stay_marked() {
    let heap = Heap::new(card_options(3));
    let mut caps = single_cap(&heap);
    let (array, _) = array_with_two_marked_cards(&heap, &mut caps[0], 2);
    let arr = MutArrPtrs::new(array, 2);

    let stats = collect_n(&heap, 0, &mut [], &mut caps, 1);

    // Arrays are traced without eager promotion, so the elements only reach generation 1.
    for i in arr.card_elements(2).chain(arr.card_elements(7)) {
        assert_eq!(heap.generation_of(closure::read_ref(arr.element(i))), 1);
    }
    for card in 0..arr.cards() {
        assert_eq!(arr.is_card_dirty(card), card == 2 || card == 7, "card {}", card);
    }
    assert_eq!(kind_of(array), ClosureKind::MutArrPtrsDirty);
    assert!(caps[0].mut_list(2).contains(array));
    assert_eq!(stats.mut_list_retained, 1);
}

#[test]
fn copied_arrays_have_every_card_traced() {
    let heap = Heap::new(card_options(2));
    let leaf = constr_info("Leaf", 0, 1);
    let elements: Vec<ObjectReference> = (0..10).map(|i| alloc_closure(&heap, 0, leaf, &[], &[i])).collect();
    let array = alloc_mut_arr(&heap, 0, &elements);
    let mut roots = [array];
    let mut caps = single_cap(&heap);

    let stats = collect_n(&heap, 0, &mut roots, &mut caps, 1);

    let arr = MutArrPtrs::new(roots[0], 2);
    assert_eq!(stats.cards_scanned, 3);
    assert_eq!(stats.cards_skipped, 0);
    for i in 0..10 {
        let element = closure::read_ref(arr.element(i));
        assert_eq!(field_word(element, 0), i);
    }
    assert_eq!(memory_manager::verify_heap(&heap), 11);
}

#[test]
fn scan_returns_the_end_of_the_array() {
    let heap = Heap::new(card_options(2));
    let mut caps = single_cap(&heap);
    let (array, _) = array_with_two_marked_cards(&heap, &mut caps[0], 1);

    let collection = Collection::prepare(&heap, 0, &mut caps);
    let mut cx = collection.context();
    cx.set_evac_gen(1);
    let end = cx.scavenge_mut_arr_ptrs(array);
    assert_eq!(end, array.to_raw_address().word(MutArrPtrs::words_for(40, 2)));
    assert!(!cx.failed_to_evac());
    assert_eq!(cx.stats().cards_scanned, 2);
    cx.scavenge_loop();
    let remnant = cx.into_remnant();
    collection.finish(vec![remnant], &mut caps);
}

#[test]
fn barrier_marks_one_card_per_write() {
    let heap = Heap::new(card_options(2));
    let mut caps = single_cap(&heap);
    let leaf = constr_info("Leaf", 0, 1);
    let old = alloc_closure(&heap, 1, leaf, &[], &[0]);
    let array = alloc_mut_arr(&heap, 1, &[old; 13]);
    let young = alloc_closure(&heap, 0, leaf, &[], &[1]);

    memory_manager::mut_arr_write(&heap, &mut caps[0], array, 12, young);
    memory_manager::mut_arr_write(&heap, &mut caps[0], array, 12, young);

    let arr = MutArrPtrs::new(array, 2);
    assert_eq!(arr.cards(), 4);
    assert_eq!((0..4).filter(|c| arr.is_card_dirty(*c)).collect::<Vec<_>>(), vec![3]);
    assert_eq!(caps[0].mut_list(1).len(), 1);
}
