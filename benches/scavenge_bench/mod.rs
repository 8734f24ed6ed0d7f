pub mod graph;
pub mod mut_list;

pub use criterion::Criterion;

pub fn bench(c: &mut Criterion) {
    graph::bench(c);
    mut_list::bench(c);
}
