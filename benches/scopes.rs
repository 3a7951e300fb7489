use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fiscope::{DuplicateAttributeVerifier, PrefixTable, ScopeDriver, ValueTable};

static PREFIXES: &'static [&'static str] = &["env", "wsa", "wsse", "wsu", "ds", "xenc", "app"];

fn prefix_table(c: &mut Criterion) {
	let mut group = c.benchmark_group("prefix table");

	group.bench_function("push/pop nested", |b| {
		let mut t = PrefixTable::new();
		let slots: Vec<usize> = PREFIXES
			.iter()
			.map(|p| t.intern_prefix(p).unwrap())
			.collect();
		b.iter(|| {
			for depth in 0..32 {
				t.start_declarations();
				let slot = slots[depth % slots.len()];
				t.push_scope(slot, Some(depth)).unwrap();
			}
			for depth in (0..32).rev() {
				t.pop_scope(slots[depth % slots.len()]);
			}
		});
	});

	group.bench_function("lookup", |b| {
		let mut t = PrefixTable::new();
		for p in PREFIXES.iter() {
			let slot = t.intern_prefix(p).unwrap();
			t.push_scope_with_binding(p, format!("urn:{}", p).as_str().into(), slot, Some(slot))
				.unwrap();
		}
		b.iter(|| {
			for p in PREFIXES.iter() {
				black_box(t.namespace_for_prefix(black_box(p)));
			}
		});
	});
}

fn duplicate_attributes(c: &mut Criterion) {
	c.bench_function("duplicate attribute check, 16 attributes", |b| {
		let mut v = DuplicateAttributeVerifier::new();
		b.iter(|| {
			v.start_element();
			for i in 0..16u64 {
				v.check_and_record(i as u32, black_box(i)).unwrap();
			}
		});
	});
}

fn value_table(c: &mut Criterion) {
	c.bench_function("value table add 1024", |b| {
		let values: Vec<String> = (0..1024).map(|i| format!("value-{}", i)).collect();
		b.iter(|| {
			let mut t = ValueTable::new();
			for v in values.iter() {
				t.add(black_box(v)).unwrap();
			}
			t
		});
	});
}

fn driver(c: &mut Criterion) {
	c.bench_function("driver element with declarations", |b| {
		let mut d = ScopeDriver::new();
		b.iter(|| {
			d.start_element();
			for p in PREFIXES.iter() {
				d.declare(p, "urn:bench").unwrap();
			}
			d.check_attribute(0, 0, 1).unwrap();
			black_box(d.end_element());
		});
	});
}

criterion_group!{
	name = benches;
	config = Criterion::default().sample_size(300);
	targets = prefix_table, duplicate_attributes, value_table, driver
}
criterion_main!(benches);
