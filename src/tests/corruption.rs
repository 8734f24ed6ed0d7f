use super::test_prelude::*;

#[test]
#[should_panic(expected = "heap corruption")]
fn garbage_header_is_fatal() {
    let heap = test_heap(2);
    let object = alloc_object(&heap, 0, constr_info("Leaf", 0, 1), &[0]);
    // Aligned, but not an info table.
    let bogus = Box::leak(Box::new([0usize; 8]));
    closure::write_word(object.to_raw_address(), bogus.as_ptr() as usize);
    let mut caps = single_cap(&heap);
    collect_n(&heap, 0, &mut [object], &mut caps, 1);
}

#[test]
#[should_panic(expected = "UPDATE_FRAME")]
fn frame_as_heap_object_is_fatal() {
    let heap = test_heap(2);
    let frame = alloc_object(&heap, 0, &builtin::UPDATE_FRAME, &[0]);
    let mut caps = single_cap(&heap);
    collect_n(&heap, 0, &mut [frame], &mut caps, 1);
}

#[test]
#[should_panic(expected = "heap corruption")]
fn static_kind_in_a_heap_block_is_fatal() {
    let heap = test_heap(2);
    let info = static_info(ClosureKind::ConstrStatic, "Misplaced", 0);
    let object = alloc_object(&heap, 0, info, &[0]);
    let mut caps = single_cap(&heap);
    collect_n(&heap, 0, &mut [object], &mut caps, 1);
}

#[test]
#[should_panic(expected = "applies")]
fn application_of_a_constructor_is_fatal() {
    let heap = test_heap(2);
    let not_a_fun = alloc_closure(&heap, 0, constr_info("Leaf", 0, 1), &[], &[0]);
    let pap = alloc_pap(&heap, 0, not_a_fun, &[1]);
    let mut caps = single_cap(&heap);
    collect_n(&heap, 0, &mut [pap], &mut caps, 1);
}

#[test]
#[should_panic(expected = "heap corruption")]
fn scanning_a_frame_kind_is_fatal() {
    let heap = test_heap(2);
    let frame = alloc_object(&heap, 1, &builtin::STOP_FRAME, &[]);
    let mut caps = single_cap(&heap);
    let collection = Collection::prepare(&heap, 0, &mut caps);
    let mut cx = collection.context();
    cx.scavenge_object(frame);
}

#[test]
#[should_panic(expected = "outside the live heap")]
fn dangling_reference_fails_verification() {
    let heap = test_heap(2);
    let leaf = constr_info("Leaf", 0, 1);
    let pair = constr_info("Pair", 1, 0);
    let young = alloc_closure(&heap, 0, leaf, &[], &[0]);
    // An old object pointing at the nursery without being remembered.
    let _old = alloc_closure(&heap, 1, pair, &[young], &[]);
    let mut caps = single_cap(&heap);
    collect_n(&heap, 0, &mut [], &mut caps, 1);
    memory_manager::verify_heap(&heap);
}
